use crate::encoder::Encoding;
use crate::generator::ModeSet;
use crate::tables::MAX_CODE_POINT;
use serde::Deserialize;
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

/// Rejected caller input. Generation itself never produces these.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Tuple size must be at least 1")]
    ZeroSize,
    #[error("Value {0:#x} is above the highest code point 0x10ffff")]
    CodePointOutOfRange(u32),
    #[error("Malformed range specification: {0:?}")]
    MalformedRange(String),
    #[error("Invalid modes provided: {0:?}")]
    InvalidModes(String),
    #[error("Unknown mode {0}, expected a value between 1 and 7")]
    UnknownMode(u32),
    #[error("Unknown encoding {0:?}, expected 1-4 or url, unicode, raw, double-url")]
    UnknownEncoding(String),
}

/// Inclusive interval of values tried by the insertion modes.
///
/// `lo > hi` is accepted and simply describes an empty range.
#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(try_from = "RangeSpec")]
pub struct ByteRange {
    lo: u32,
    hi: u32,
}

impl ByteRange {
    pub fn new(lo: u32, hi: u32) -> Result<Self, ConfigError> {
        for bound in [lo, hi] {
            if bound > MAX_CODE_POINT {
                return Err(ConfigError::CodePointOutOfRange(bound));
            }
        }
        Ok(Self { lo, hi })
    }

    pub fn values(&self) -> std::ops::RangeInclusive<u32> {
        self.lo..=self.hi
    }
}

impl Default for ByteRange {
    fn default() -> Self {
        Self { lo: 0, hi: 0xFF }
    }
}

impl fmt::Display for ByteRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x},{:#x}", self.lo, self.hi)
    }
}

fn parse_bound(text: &str, hex: bool, spec: &str) -> Result<u32, ConfigError> {
    let text = text.trim();
    let parsed = if hex {
        let digits = text
            .strip_prefix("0x")
            .or_else(|| text.strip_prefix("0X"))
            .unwrap_or(text);
        u32::from_str_radix(digits, 16).ok()
    } else {
        parse_prefixed(text)
    };
    parsed.ok_or_else(|| ConfigError::MalformedRange(spec.to_string()))
}

/// Integer literal with an optional `0x`/`0o`/`0b` radix prefix. Decimal
/// literals may not carry leading zeros.
fn parse_prefixed(text: &str) -> Option<u32> {
    let radix = match text.get(..2) {
        Some("0x" | "0X") => 16,
        Some("0o" | "0O") => 8,
        Some("0b" | "0B") => 2,
        _ => {
            if text.len() > 1 && text.starts_with('0') && text.bytes().any(|b| b != b'0') {
                return None;
            }
            return text.parse().ok();
        }
    };
    u32::from_str_radix(&text[2..], radix).ok()
}

impl FromStr for ByteRange {
    type Err = ConfigError;

    /// Parses `lo,hi` or `lo-hi`. Any `0x` switches every bound to hex,
    /// otherwise each bound may carry its own radix prefix. A single value
    /// `v` stands for `v,v+1`.
    fn from_str(spec: &str) -> Result<Self, Self::Err> {
        let hex = spec.contains("0x");
        let separator = if spec.contains('-') { '-' } else { ',' };
        let bounds = spec
            .split(separator)
            .map(|part| parse_bound(part, hex, spec))
            .collect::<Result<Vec<u32>, _>>()?;

        match bounds.as_slice() {
            [single] => ByteRange::new(*single, single.saturating_add(1)),
            [lo, hi] => ByteRange::new(*lo, *hi),
            _ => Err(ConfigError::MalformedRange(spec.to_string())),
        }
    }
}

/// Accepted TOML shapes for `range`.
#[derive(Deserialize)]
#[serde(untagged)]
enum RangeSpec {
    Text(String),
    Bounds([u32; 2]),
}

impl TryFrom<RangeSpec> for ByteRange {
    type Error = ConfigError;

    fn try_from(spec: RangeSpec) -> Result<Self, Self::Error> {
        match spec {
            RangeSpec::Text(text) => text.parse(),
            RangeSpec::Bounds([lo, hi]) => ByteRange::new(lo, hi),
        }
    }
}

pub const DEFAULT_SIZE: usize = 1;
pub const DEFAULT_MAX_NORM: usize = 3;
pub const DEFAULT_MAX_TRUNC: usize = 3;

/// Validated generator configuration.
///
/// Fields are private so that every instance went through [`GeneratorConfig::new`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratorConfig {
    size: usize,
    encoding: Encoding,
    range: ByteRange,
    modes: ModeSet,
    alphanum: bool,
    max_norm: usize,
    max_trunc: usize,
}

impl GeneratorConfig {
    pub fn new(
        size: usize,
        encoding: Encoding,
        range: ByteRange,
        modes: ModeSet,
    ) -> Result<Self, ConfigError> {
        if size == 0 {
            return Err(ConfigError::ZeroSize);
        }
        Ok(Self {
            size,
            encoding,
            range,
            modes,
            alphanum: false,
            max_norm: DEFAULT_MAX_NORM,
            max_trunc: DEFAULT_MAX_TRUNC,
        })
    }

    /// Keeps ASCII letters and digits in the insertion range.
    pub fn with_alphanum(mut self, alphanum: bool) -> Self {
        self.alphanum = alphanum;
        self
    }

    pub fn with_max_norm(mut self, max_norm: usize) -> Self {
        self.max_norm = max_norm;
        self
    }

    pub fn with_max_trunc(mut self, max_trunc: usize) -> Self {
        self.max_trunc = max_trunc;
        self
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn encoding(&self) -> Encoding {
        self.encoding
    }

    pub fn range(&self) -> ByteRange {
        self.range
    }

    pub fn modes(&self) -> &ModeSet {
        &self.modes
    }

    pub fn alphanum(&self) -> bool {
        self.alphanum
    }

    pub fn max_norm(&self) -> usize {
        self.max_norm
    }

    pub fn max_trunc(&self) -> usize {
        self.max_trunc
    }

    /// The values inserted by modes 1, 2, 4 and 5.
    pub fn fuzz_values(&self) -> Vec<u32> {
        self.range
            .values()
            .filter(|value| self.alphanum || !is_ascii_alphanumeric(*value))
            .collect()
    }
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            size: DEFAULT_SIZE,
            encoding: Encoding::default(),
            range: ByteRange::default(),
            modes: ModeSet::all(),
            alphanum: false,
            max_norm: DEFAULT_MAX_NORM,
            max_trunc: DEFAULT_MAX_TRUNC,
        }
    }
}

fn is_ascii_alphanumeric(value: u32) -> bool {
    char::from_u32(value).is_some_and(|c| c.is_ascii_alphanumeric())
}

/// The `[generator]` section, before validation.
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
#[serde(deny_unknown_fields)]
pub struct GeneratorSettings {
    #[serde(default = "default_size")]
    pub size: usize,
    #[serde(default = "default_encoding")]
    pub encoding: Encoding,
    #[serde(default)]
    pub range: ByteRange,
    #[serde(default = "ModeSet::all")]
    pub modes: ModeSet,
    #[serde(default)]
    pub alphanum: bool,
    #[serde(default = "default_max_norm")]
    pub max_norm: usize,
    #[serde(default = "default_max_trunc")]
    pub max_trunc: usize,
}

fn default_size() -> usize {
    DEFAULT_SIZE
}

/// The command line defaults to URL encoding, unlike the library.
pub fn default_encoding() -> Encoding {
    Encoding::Url
}

fn default_max_norm() -> usize {
    DEFAULT_MAX_NORM
}

fn default_max_trunc() -> usize {
    DEFAULT_MAX_TRUNC
}

impl Default for GeneratorSettings {
    fn default() -> Self {
        Self {
            size: default_size(),
            encoding: default_encoding(),
            range: ByteRange::default(),
            modes: ModeSet::all(),
            alphanum: false,
            max_norm: default_max_norm(),
            max_trunc: default_max_trunc(),
        }
    }
}

impl TryFrom<&GeneratorSettings> for GeneratorConfig {
    type Error = ConfigError;

    fn try_from(settings: &GeneratorSettings) -> Result<Self, Self::Error> {
        Ok(GeneratorConfig::new(
            settings.size,
            settings.encoding,
            settings.range,
            settings.modes.clone(),
        )?
        .with_alphanum(settings.alphanum)
        .with_max_norm(settings.max_norm)
        .with_max_trunc(settings.max_trunc))
    }
}

#[derive(Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
#[serde(deny_unknown_fields)]
pub struct TableSettings {
    /// Build all lookup tables up front instead of on first use.
    #[serde(default)]
    pub prebuild: bool,
}

#[derive(Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
#[serde(deny_unknown_fields)]
pub struct RecollapseConfig {
    #[serde(default)]
    pub generator: GeneratorSettings,
    #[serde(default)]
    pub tables: TableSettings,
}

impl RecollapseConfig {
    pub fn load_from_file(path: &Path) -> Result<Self, anyhow::Error> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Failed to read config file at {:?}: {}", path, e))?;

        Self::from_toml(&content).map_err(|e| {
            anyhow::anyhow!("Failed to parse TOML from config file {:?}: {}", path, e)
        })
    }

    pub fn from_toml(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }
}
