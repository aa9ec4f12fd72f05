use crate::tables::LookupTable;
use std::fmt::Write;

pub const HTML_HEADER: &str = r#"<!DOCTYPE html>
<meta charset="utf-8">
<html>
<head>
<style>
body {
    background: black;
    color: green;
}
table {
    font-size: 13px !important;
}
</style>
</head>
<body>"#;

pub const HTML_FOOTER: &str = "</body></html>";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TableFormat {
    #[default]
    Text,
    Html,
}

pub fn render(table: &LookupTable, format: TableFormat) -> String {
    match format {
        TableFormat::Text => render_text(table),
        TableFormat::Html => render_html(table),
    }
}

fn hex_code(c: char) -> String {
    format!("{:#x}", c as u32)
}

/// One row per key: hex code, the key, then its sources. Columns are
/// centered and space padded, without borders or a header row.
pub fn render_text(table: &LookupTable) -> String {
    let columns = table.widest() + 2;
    let rows: Vec<Vec<String>> = table
        .iter()
        .map(|(key, sources)| {
            let mut row = Vec::with_capacity(columns);
            row.push(hex_code(key));
            row.push(key.to_string());
            row.extend(sources.iter().map(char::to_string));
            row.resize(columns, String::new());
            row
        })
        .collect();

    let mut widths = vec![0usize; columns];
    for row in &rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let mut out = String::new();
    for row in &rows {
        let mut line = String::new();
        for (cell, &width) in row.iter().zip(&widths) {
            let _ = write!(line, " {cell:^width$} ");
        }
        out.push_str(line.trim_end());
        out.push('\n');
    }
    out
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#x27;"),
            other => escaped.push(other),
        }
    }
    escaped
}

/// A full HTML document with the table transposed: one column per key,
/// headed by its hex code, with the key itself in the first row.
pub fn render_html(table: &LookupTable) -> String {
    let mut out = String::new();
    out.push_str(HTML_HEADER);
    out.push('\n');
    out.push_str("<table>\n    <thead>\n        <tr>\n");
    for (key, _) in table.iter() {
        let _ = writeln!(out, "            <th>{}</th>", hex_code(key));
    }
    out.push_str("        </tr>\n    </thead>\n    <tbody>\n");

    for depth in 0..=table.widest() {
        out.push_str("        <tr>\n");
        for (key, sources) in table.iter() {
            let cell = if depth == 0 {
                Some(key)
            } else {
                sources.get(depth - 1).copied()
            };
            let text = cell.map(|c| escape_html(&c.to_string())).unwrap_or_default();
            let _ = writeln!(out, "            <td>{text}</td>");
        }
        out.push_str("        </tr>\n");
    }
    out.push_str("    </tbody>\n</table>\n");
    out.push_str(HTML_FOOTER);
    out.push('\n');
    out
}
