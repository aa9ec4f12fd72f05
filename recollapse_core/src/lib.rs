pub mod config;
pub mod encoder;
pub mod generator;
pub mod input;
pub mod render;
pub mod tables;

pub use config::{ByteRange, ConfigError, GeneratorConfig, GeneratorSettings, RecollapseConfig};
pub use encoder::{Encoding, FragmentEncoder, Splice, splice};
pub use generator::{Mode, ModeSet, REGEX_METACHARS, VariantGenerator};
pub use input::{InputError, InputSource};
pub use render::{TableFormat, render, render_html, render_text};
pub use tables::{LookupTable, LookupTables, TableKind};
