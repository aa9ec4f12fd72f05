use crate::config::{ConfigError, GeneratorConfig};
use crate::encoder::{Splice, splice};
use crate::tables::{LookupTable, LookupTables};
use itertools::Itertools;
use serde::Deserialize;
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// Characters with special meaning in common regex dialects.
pub const REGEX_METACHARS: &str = ".^$*+-?()[]{}\\|";

/// Above this many insertion tuples a warning is logged before generating.
const LARGE_PRODUCT_WARNING: u128 = 1_000_000;

/// One of the seven variant generation strategies.
///
/// Modes 1, 2, 4 and 5 insert (or, for 5, substitute) encoded tuples drawn
/// from the fuzz range. Modes 3, 6 and 7 substitute characters taken from a
/// lookup table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Mode {
    /// Insert at the start of the input.
    Start,
    /// Insert before and after every ASCII punctuation character.
    Sep,
    /// Replace characters with ones that transliterate back to them.
    Norm,
    /// Insert at the end of the input.
    Term,
    /// Replace regex metacharacters.
    ReMeta,
    /// Replace characters with their case variants.
    Case,
    /// Replace characters with wider ones sharing the same low byte.
    Trunc,
}

impl Mode {
    pub const ALL: [Mode; 7] = [
        Mode::Start,
        Mode::Sep,
        Mode::Norm,
        Mode::Term,
        Mode::ReMeta,
        Mode::Case,
        Mode::Trunc,
    ];

    pub fn from_code(code: u32) -> Result<Self, ConfigError> {
        match code {
            1..=7 => Ok(Mode::ALL[code as usize - 1]),
            other => Err(ConfigError::UnknownMode(other)),
        }
    }

    pub fn code(&self) -> u32 {
        *self as u32 + 1
    }

    pub fn name(&self) -> &'static str {
        match self {
            Mode::Start => "start",
            Mode::Sep => "separator",
            Mode::Norm => "normalization",
            Mode::Term => "termination",
            Mode::ReMeta => "regex-metacharacters",
            Mode::Case => "case",
            Mode::Trunc => "truncation",
        }
    }

    pub fn is_table_driven(&self) -> bool {
        matches!(self, Mode::Norm | Mode::Case | Mode::Trunc)
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.code(), self.name())
    }
}

/// A set of distinct modes, iterated in code order.
#[derive(Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(try_from = "Vec<u32>")]
pub struct ModeSet(BTreeSet<Mode>);

impl ModeSet {
    pub fn all() -> Self {
        Mode::ALL.into_iter().collect()
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn iter(&self) -> impl Iterator<Item = Mode> + '_ {
        self.0.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<Mode> for ModeSet {
    fn from_iter<T: IntoIterator<Item = Mode>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl TryFrom<Vec<u32>> for ModeSet {
    type Error = ConfigError;

    fn try_from(codes: Vec<u32>) -> Result<Self, Self::Error> {
        codes.into_iter().map(Mode::from_code).collect()
    }
}

impl FromStr for ModeSet {
    type Err = ConfigError;

    /// Parses a comma separated list of mode codes such as `1,2,7`.
    fn from_str(spec: &str) -> Result<Self, Self::Err> {
        spec.split(',')
            .map(|part| {
                let code = part
                    .trim()
                    .parse::<u32>()
                    .map_err(|_| ConfigError::InvalidModes(spec.to_string()))?;
                Mode::from_code(code)
            })
            .collect()
    }
}

impl fmt::Display for ModeSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.iter().map(|mode| mode.code()).join(","))
    }
}

/// Produces the sorted, duplicate free set of variants of an input.
///
/// Table-driven modes read from the injected [`LookupTables`]; each table is
/// built the first time a mode needs it.
#[derive(Debug, Clone)]
pub struct VariantGenerator<'t> {
    config: GeneratorConfig,
    tables: &'t LookupTables,
}

impl<'t> VariantGenerator<'t> {
    pub fn new(config: GeneratorConfig, tables: &'t LookupTables) -> Self {
        Self { config, tables }
    }

    pub fn generate(&self, input: &str) -> Vec<String> {
        self.generate_all([input])
    }

    /// Generates variants for several inputs and merges them into one
    /// sorted set.
    pub fn generate_all<'a, I>(&self, inputs: I) -> Vec<String>
    where
        I: IntoIterator<Item = &'a str>,
    {
        if self.config.modes().is_empty() {
            return Vec::new();
        }
        let mut variants = BTreeSet::new();

        let fragments = if self.config.modes().iter().any(|m| !m.is_table_driven()) {
            self.insertion_fragments()
        } else {
            Vec::new()
        };

        for input in inputs {
            let chars: Vec<char> = input.chars().collect();
            for mode in self.config.modes().iter() {
                self.apply_mode(mode, &chars, &fragments, &mut variants);
            }
        }
        variants.into_iter().collect()
    }

    fn apply_mode(
        &self,
        mode: Mode,
        chars: &[char],
        fragments: &[String],
        out: &mut BTreeSet<String>,
    ) {
        match mode {
            Mode::Start => splice_all(chars, 0, fragments, Splice::Insert, out),
            Mode::Sep => {
                for (i, c) in chars.iter().enumerate() {
                    if c.is_ascii_punctuation() {
                        splice_all(chars, i, fragments, Splice::Insert, out);
                        splice_all(chars, i + 1, fragments, Splice::Insert, out);
                    }
                }
            }
            Mode::Norm => {
                self.substitute(chars, self.tables.normalization(), self.config.max_norm(), out)
            }
            Mode::Term => splice_all(chars, chars.len(), fragments, Splice::Insert, out),
            Mode::ReMeta => {
                for (i, c) in chars.iter().enumerate() {
                    if REGEX_METACHARS.contains(*c) {
                        splice_all(chars, i, fragments, Splice::Replace, out);
                    }
                }
            }
            Mode::Case => self.substitute(chars, self.tables.case_fold(), usize::MAX, out),
            Mode::Trunc => {
                self.substitute(chars, self.tables.truncation(), self.config.max_trunc(), out)
            }
        }
    }

    /// Encodes every tuple of the Cartesian product of the fuzz values.
    ///
    /// The fragment for a tuple does not depend on where it is spliced, so it
    /// is rendered once and reused by every insertion mode and position.
    fn insertion_fragments(&self) -> Vec<String> {
        let values = self.config.fuzz_values();
        let size = self.config.size();
        let encoding = self.config.encoding();

        let tuples = (values.len() as u128).saturating_pow(size as u32);
        if tuples > LARGE_PRODUCT_WARNING {
            log::warn!(
                "Generating {tuples} tuples ({} values, size {size}); output will be large",
                values.len()
            );
        } else {
            log::debug!("Generating {tuples} {encoding} tuples");
        }

        std::iter::repeat_n(values.iter().copied(), size)
            .multi_cartesian_product()
            .filter_map(|tuple| encoding.render(&tuple))
            .collect()
    }

    fn substitute(
        &self,
        chars: &[char],
        table: &LookupTable,
        limit: usize,
        out: &mut BTreeSet<String>,
    ) {
        let encoding = self.config.encoding();
        for (i, c) in chars.iter().enumerate() {
            let Some(sources) = table.get(*c) else {
                continue;
            };
            for source in sources.iter().take(limit) {
                if let Some(fragment) = encoding.render(&[*source as u32]) {
                    out.insert(splice(chars, i, &fragment, Splice::Replace));
                }
            }
        }
    }
}

fn splice_all(
    chars: &[char],
    index: usize,
    fragments: &[String],
    how: Splice,
    out: &mut BTreeSet<String>,
) {
    for fragment in fragments {
        out.insert(splice(chars, index, fragment, how));
    }
}
