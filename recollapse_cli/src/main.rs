use recollapse_core::config::{ByteRange, GeneratorConfig, GeneratorSettings, RecollapseConfig};
use recollapse_core::encoder::Encoding;
use recollapse_core::generator::{ModeSet, VariantGenerator};
use recollapse_core::input::InputSource;
use recollapse_core::render::{TableFormat, render};
use recollapse_core::tables::{LookupTables, TableKind};

use clap::{CommandFactory, Parser};
use std::io::{self, BufWriter, IsTerminal, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;

const DEFAULT_CONFIG_FILE: &str = "recollapse.toml";

/// Helper for black-box regex fuzzing: generates variants of an input to
/// bypass validations and discover normalizations.
#[derive(Parser, Debug)]
#[command(name = "recollapse", version, about, long_about = None)]
struct Cli {
    /// Original input
    input: Option<String>,

    /// TOML configuration file (defaults to ./recollapse.toml when present)
    #[arg(short, long, value_parser)]
    config_file: Option<PathBuf>,

    /// Variation modes, e.g. 1,2,3,4,5,6,7. 1: starting, 2: separator,
    /// 3: normalization, 4: termination, 5: regex metacharacters,
    /// 6: case folding/upper/lower, 7: byte truncation
    #[arg(short, long, visible_alias = "positions", short_alias = 'p')]
    modes: Option<ModeSet>,

    /// 1: URL-encoded, 2: Unicode, 3: raw, 4: double URL-encoded
    #[arg(short, long)]
    encoding: Option<Encoding>,

    /// Range of values for fuzzing, e.g. 0,0xff or 10-20
    #[arg(short, long)]
    range: Option<ByteRange>,

    /// Number of fuzzing values per insertion
    #[arg(short, long)]
    size: Option<usize>,

    /// Read input from the first line of a file
    #[arg(short, long)]
    file: Option<PathBuf>,

    /// Include alphanumeric values in the fuzzing range
    #[arg(short, long)]
    alphanum: bool,

    /// Maximum number of normalizations per character
    #[arg(long, visible_alias = "maxnorm")]
    max_norm: Option<usize>,

    /// Maximum number of truncations per character
    #[arg(long, visible_alias = "maxtrunc")]
    max_trunc: Option<usize>,

    /// Print the normalization table
    #[arg(long, group = "table")]
    normtable: bool,

    /// Print the truncation table
    #[arg(long, group = "table")]
    trunctable: bool,

    /// Print the case table
    #[arg(long, group = "table")]
    casetable: bool,

    /// Output tables in HTML format
    #[arg(long)]
    html: bool,
}

impl Cli {
    fn apply_overrides(&self, settings: &mut GeneratorSettings) {
        if let Some(modes) = &self.modes {
            settings.modes = modes.clone();
        }
        if let Some(encoding) = self.encoding {
            settings.encoding = encoding;
        }
        if let Some(range) = self.range {
            settings.range = range;
        }
        if let Some(size) = self.size {
            settings.size = size;
        }
        if self.alphanum {
            settings.alphanum = true;
        }
        if let Some(max_norm) = self.max_norm {
            settings.max_norm = max_norm;
        }
        if let Some(max_trunc) = self.max_trunc {
            settings.max_trunc = max_trunc;
        }
    }

    fn table_kind(&self) -> Option<TableKind> {
        if self.normtable {
            Some(TableKind::Normalization)
        } else if self.trunctable {
            Some(TableKind::Truncation)
        } else if self.casetable {
            Some(TableKind::CaseFold)
        } else {
            None
        }
    }

    fn input_source(&self, stdin_is_terminal: bool) -> Option<InputSource> {
        if let Some(input) = self.input.as_deref().filter(|input| !input.is_empty()) {
            Some(InputSource::Literal(input.to_string()))
        } else if let Some(path) = &self.file {
            Some(InputSource::File(path.clone()))
        } else if !stdin_is_terminal {
            Some(InputSource::Stdin)
        } else {
            None
        }
    }
}

fn load_config(config_file: Option<&Path>) -> Result<RecollapseConfig, anyhow::Error> {
    match config_file {
        Some(config_path) => {
            log::info!("Loading configuration from specified path: {config_path:?}");
            RecollapseConfig::load_from_file(config_path)
        }
        None => {
            let default_config_path = Path::new(DEFAULT_CONFIG_FILE);
            if default_config_path.exists() {
                log::info!(
                    "No config file specified via CLI, loading default: {default_config_path:?}"
                );
                RecollapseConfig::load_from_file(default_config_path)
            } else {
                log::debug!("No config file found, using built-in defaults");
                Ok(RecollapseConfig::default())
            }
        }
    }
}

fn main() -> Result<(), anyhow::Error> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();

    let mut config = load_config(cli.config_file.as_deref())?;
    cli.apply_overrides(&mut config.generator);
    log::debug!("Effective configuration: {config:#?}");

    let tables = LookupTables::global();
    let mut out = BufWriter::new(io::stdout().lock());

    if let Some(kind) = cli.table_kind() {
        let format = if cli.html {
            TableFormat::Html
        } else {
            TableFormat::Text
        };
        write!(out, "{}", render(tables.get(kind), format))?;
        out.flush()?;
        return Ok(());
    }

    let generator_config = GeneratorConfig::try_from(&config.generator)?;

    let Some(source) = cli.input_source(io::stdin().is_terminal()) else {
        Cli::command().print_help()?;
        std::process::exit(1);
    };
    let inputs = source.load()?;

    if config.tables.prebuild {
        tables.prebuild();
    }

    let start_time = Instant::now();
    let generator = VariantGenerator::new(generator_config, tables);
    let variants = generator.generate_all(inputs.iter().map(String::as_str));
    log::info!(
        "Generated {} variants from {} inputs in {:.2?}",
        variants.len(),
        inputs.len(),
        start_time.elapsed()
    );

    for variant in &variants {
        writeln!(out, "{variant}")?;
    }
    out.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use recollapse_core::generator::Mode;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("recollapse").chain(args.iter().copied()))
            .expect("arguments should parse")
    }

    fn effective(cli: &Cli) -> GeneratorSettings {
        let mut settings = GeneratorSettings::default();
        cli.apply_overrides(&mut settings);
        settings
    }

    #[test]
    fn command_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn defaults_match_the_command_line_tool() {
        let cli = parse(&["test_input"]);
        assert_eq!(cli.input.as_deref(), Some("test_input"));
        let settings = effective(&cli);
        assert_eq!(settings.modes, ModeSet::all());
        assert_eq!(settings.encoding, Encoding::Url);
        assert_eq!(settings.range, ByteRange::new(0, 255).unwrap());
        assert_eq!(settings.size, 1);
        assert!(!settings.alphanum);
        assert_eq!(settings.max_norm, 3);
        assert_eq!(settings.max_trunc, 3);
        assert_eq!(cli.table_kind(), None);
        assert!(!cli.html);
    }

    #[test]
    fn options_override_settings() {
        let cli = parse(&[
            "test_input", "-m", "1,2,3", "-e", "2", "-r", "10-20", "-s", "2", "-a", "--maxnorm",
            "5", "--max-trunc", "1", "--html",
        ]);
        let settings = effective(&cli);
        assert_eq!(
            settings.modes,
            [Mode::Start, Mode::Sep, Mode::Norm].into_iter().collect()
        );
        assert_eq!(settings.encoding, Encoding::Unicode);
        assert_eq!(settings.range, ByteRange::new(10, 20).unwrap());
        assert_eq!(settings.size, 2);
        assert!(settings.alphanum);
        assert_eq!(settings.max_norm, 5);
        assert_eq!(settings.max_trunc, 1);
        assert!(cli.html);
    }

    #[test]
    fn positions_is_an_alias_for_modes() {
        let settings = effective(&parse(&["x", "-p", "7"]));
        assert_eq!(settings.modes, [Mode::Trunc].into_iter().collect());
        let settings = effective(&parse(&["x", "--positions", "4"]));
        assert_eq!(settings.modes, [Mode::Term].into_iter().collect());
    }

    #[test]
    fn range_forms() {
        let hex = effective(&parse(&["test", "-r", "0x10,0x20"]));
        assert_eq!(hex.range, ByteRange::new(16, 32).unwrap());
        let single = effective(&parse(&["test", "-r", "10"]));
        assert_eq!(single.range, ByteRange::new(10, 11).unwrap());
    }

    #[test]
    fn invalid_values_are_rejected() {
        for args in [
            &["test", "-m", "invalid"][..],
            &["test", "-m", "1,8"],
            &["test", "-e", "5"],
            &["test", "-r", "1,2,3"],
            &["test", "-r", "0,0x110000"],
            &["--normtable", "--casetable"],
        ] {
            let argv = std::iter::once("recollapse").chain(args.iter().copied());
            assert!(Cli::try_parse_from(argv).is_err(), "{args:?} should fail");
        }
    }

    #[test]
    fn table_flags_select_a_table() {
        assert_eq!(parse(&["--normtable"]).table_kind(), Some(TableKind::Normalization));
        assert_eq!(parse(&["--trunctable"]).table_kind(), Some(TableKind::Truncation));
        assert_eq!(parse(&["--casetable", "--html"]).table_kind(), Some(TableKind::CaseFold));
    }

    #[test]
    fn input_source_precedence() {
        let cli = parse(&["literal", "-f", "input.txt"]);
        assert_eq!(
            cli.input_source(true),
            Some(InputSource::Literal("literal".to_string()))
        );
        let cli = parse(&["-f", "input.txt"]);
        assert_eq!(
            cli.input_source(true),
            Some(InputSource::File(PathBuf::from("input.txt")))
        );
        let cli = parse(&[]);
        assert_eq!(cli.input_source(false), Some(InputSource::Stdin));
        assert_eq!(cli.input_source(true), None);
    }

    #[test]
    fn empty_input_falls_through_to_other_sources() {
        let cli = parse(&["", "-f", "input.txt"]);
        assert_eq!(
            cli.input_source(true),
            Some(InputSource::File(PathBuf::from("input.txt")))
        );
        let cli = parse(&[""]);
        assert_eq!(cli.input_source(false), Some(InputSource::Stdin));
        assert_eq!(cli.input_source(true), None);
    }

    #[test]
    fn explicit_config_file_is_loaded() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[generator]\nencoding = \"raw\"\nmax-norm = 9").unwrap();
        let config = load_config(Some(file.path())).unwrap();
        assert_eq!(config.generator.encoding, Encoding::Raw);
        assert_eq!(config.generator.max_norm, 9);

        let cli = parse(&["x", "-e", "4"]);
        let mut settings = config.generator.clone();
        cli.apply_overrides(&mut settings);
        assert_eq!(settings.encoding, Encoding::DoubleUrl);
        assert_eq!(settings.max_norm, 9);
    }

    #[test]
    fn missing_config_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_config(Some(&dir.path().join("absent.toml"))).is_err());
    }
}
