use std::fs;
use std::io::{self, Read};
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum InputError {
    #[error("Failed to read input file {path:?}: {source}")]
    File {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Failed to read input from stdin: {0}")]
    Stdin(#[from] io::Error),
}

/// Where the values to mutate come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputSource {
    /// Given directly; every `\n` separated line is one input.
    Literal(String),
    /// Only the first line of the file, trailing whitespace trimmed.
    File(PathBuf),
    /// Everything piped in, trailing whitespace trimmed, one input per line.
    Stdin,
}

impl InputSource {
    /// Reads the source and splits it into inputs. Empty text yields none.
    pub fn load(&self) -> Result<Vec<String>, InputError> {
        let text = match self {
            InputSource::Literal(text) => text.clone(),
            InputSource::File(path) => {
                let content = fs::read_to_string(path).map_err(|source| InputError::File {
                    path: path.clone(),
                    source,
                })?;
                first_line(&content).to_string()
            }
            InputSource::Stdin => read_piped(io::stdin().lock())?,
        };
        Ok(split_inputs(&text))
    }
}

/// Reads a whole stream and trims trailing whitespace.
pub fn read_piped<R: Read>(mut reader: R) -> Result<String, io::Error> {
    let mut text = String::new();
    reader.read_to_string(&mut text)?;
    text.truncate(text.trim_end().len());
    Ok(text)
}

fn first_line(content: &str) -> &str {
    content.lines().next().unwrap_or("").trim_end()
}

fn split_inputs(text: &str) -> Vec<String> {
    if text.is_empty() {
        return Vec::new();
    }
    text.split('\n').map(String::from).collect()
}
