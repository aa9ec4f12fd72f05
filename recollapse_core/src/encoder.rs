use crate::config::ConfigError;
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use serde::Deserialize;
use std::fmt::{self, Write};
use std::str::FromStr;

/// Characters left untouched by URL quoting: alphanumerics plus `_.-~/`.
const URL_QUOTE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'_')
    .remove(b'.')
    .remove(b'-')
    .remove(b'~')
    .remove(b'/');

/// Values the raw encoding never emits: LF, VT, FF and ESC.
const RAW_SKIPPED: [u32; 4] = [10, 11, 12, 27];

/// Renders a tuple of integer values as a text fragment.
///
/// Returning `None` discards the candidate built from this tuple.
pub trait FragmentEncoder: Send + Sync {
    fn name(&self) -> &'static str;
    fn render(&self, values: &[u32]) -> Option<String>;
}

/// `%xx` for byte values, percent-encoded UTF-8 above that. Lowercase hex.
#[derive(Debug, Default, Clone, Copy)]
pub struct UrlEncoder;

/// The literal characters, minus line breaks and escape.
#[derive(Debug, Default, Clone, Copy)]
pub struct RawEncoder;

/// `\uXXXX` escapes, never surrogate-paired.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnicodeEncoder;

/// The URL fragment, percent-encoded a second time.
#[derive(Debug, Default, Clone, Copy)]
pub struct DoubleUrlEncoder;

fn push_url_value(out: &mut String, value: u32) -> Option<()> {
    if value <= 0xFF {
        let _ = write!(out, "%{value:02x}");
    } else {
        let c = char::from_u32(value)?;
        let mut buf = [0u8; 4];
        out.extend(utf8_percent_encode(c.encode_utf8(&mut buf), URL_QUOTE_SET));
    }
    Some(())
}

impl FragmentEncoder for UrlEncoder {
    fn name(&self) -> &'static str {
        "url"
    }

    fn render(&self, values: &[u32]) -> Option<String> {
        let mut fragment = String::with_capacity(values.len() * 3);
        for &value in values {
            push_url_value(&mut fragment, value)?;
        }
        fragment.make_ascii_lowercase();
        Some(fragment)
    }
}

impl FragmentEncoder for RawEncoder {
    fn name(&self) -> &'static str {
        "raw"
    }

    fn render(&self, values: &[u32]) -> Option<String> {
        let mut fragment = String::with_capacity(values.len());
        for &value in values {
            if RAW_SKIPPED.contains(&value) {
                continue;
            }
            fragment.push(char::from_u32(value)?);
        }
        Some(fragment)
    }
}

impl FragmentEncoder for UnicodeEncoder {
    fn name(&self) -> &'static str {
        "unicode"
    }

    fn render(&self, values: &[u32]) -> Option<String> {
        let mut fragment = String::with_capacity(values.len() * 6);
        for &value in values {
            let _ = write!(fragment, "\\u{value:04x}");
        }
        Some(fragment)
    }
}

impl FragmentEncoder for DoubleUrlEncoder {
    fn name(&self) -> &'static str {
        "double-url"
    }

    fn render(&self, values: &[u32]) -> Option<String> {
        let mut inner = String::with_capacity(values.len() * 3);
        for &value in values {
            push_url_value(&mut inner, value)?;
        }
        let mut fragment = utf8_percent_encode(&inner, URL_QUOTE_SET).to_string();
        fragment.make_ascii_lowercase();
        Some(fragment)
    }
}

/// The closed set of output encodings.
#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "kebab-case")]
pub enum Encoding {
    Url,
    Unicode,
    #[default]
    Raw,
    DoubleUrl,
}

impl Encoding {
    pub const ALL: [Encoding; 4] = [
        Encoding::Url,
        Encoding::Unicode,
        Encoding::Raw,
        Encoding::DoubleUrl,
    ];

    /// Maps the numeric codes used on the command line (1-4).
    pub fn from_code(code: u32) -> Result<Self, ConfigError> {
        match code {
            1 => Ok(Encoding::Url),
            2 => Ok(Encoding::Unicode),
            3 => Ok(Encoding::Raw),
            4 => Ok(Encoding::DoubleUrl),
            other => Err(ConfigError::UnknownEncoding(other.to_string())),
        }
    }

    pub fn encoder(&self) -> &'static dyn FragmentEncoder {
        match self {
            Encoding::Url => &UrlEncoder,
            Encoding::Unicode => &UnicodeEncoder,
            Encoding::Raw => &RawEncoder,
            Encoding::DoubleUrl => &DoubleUrlEncoder,
        }
    }

    pub fn render(&self, values: &[u32]) -> Option<String> {
        self.encoder().render(values)
    }
}

impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.encoder().name())
    }
}

impl FromStr for Encoding {
    type Err = ConfigError;

    /// Accepts either the numeric code or the encoding name.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Ok(code) = s.parse::<u32>() {
            return Encoding::from_code(code);
        }
        Encoding::ALL
            .into_iter()
            .find(|encoding| encoding.encoder().name().eq_ignore_ascii_case(s))
            .ok_or_else(|| ConfigError::UnknownEncoding(s.to_string()))
    }
}

/// How a fragment is placed into the input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Splice {
    /// `s[..i] + fragment + s[i..]`
    Insert,
    /// `s[..i] + fragment + s[i + 1..]`
    Replace,
}

/// Places `fragment` at character position `index` of `chars`.
pub fn splice(chars: &[char], index: usize, fragment: &str, how: Splice) -> String {
    let index = index.min(chars.len());
    let tail = match how {
        Splice::Insert => index,
        Splice::Replace => (index + 1).min(chars.len()),
    };
    let mut out = String::with_capacity(chars.len() + fragment.len());
    out.extend(&chars[..index]);
    out.push_str(fragment);
    out.extend(&chars[tail..]);
    out
}
