//! @ai:module:intent Parse input:output pairs and expand directory pairs into file pairs
//! @ai:module:layer application
//! @ai:module:public_api FilePair
//! @ai:module:depends_on language, error

use crate::error::{Error, Result};
use crate::language::is_supported_file;
use std::path::PathBuf;
use std::str::FromStr;
use walkdir::WalkDir;

/// @ai:intent One source file and the path its rewritten form is written to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilePair {
    pub input: PathBuf,
    pub output: PathBuf,
}

impl FilePair {
    pub fn new(input: impl Into<PathBuf>, output: impl Into<PathBuf>) -> Self {
        Self {
            input: input.into(),
            output: output.into(),
        }
    }

    /// @ai:intent Parse `input:output`, splitting at the first colon
    /// @ai:example ("src/a.c:build/a.c") -> FilePair { input: "src/a.c", output: "build/a.c" }
    /// @ai:effects pure
    pub fn parse(pair: &str) -> Result<Self> {
        match pair.split_once(':') {
            Some((input, output)) if !input.is_empty() && !output.is_empty() => {
                Ok(Self::new(input, output))
            }
            _ => Err(Error::InvalidPair(pair.to_string())),
        }
    }

    /// @ai:intent Expand a directory pair into one pair per C-family file beneath it
    /// @ai:post file pairs are returned unchanged; directory entries come sorted by path
    /// @ai:effects fs:read
    pub fn expand(&self) -> Vec<FilePair> {
        if !self.input.is_dir() {
            return vec![self.clone()];
        }

        WalkDir::new(&self.input)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|entry| match entry {
                Ok(entry) => Some(entry),
                Err(e) => {
                    tracing::warn!("Skipping unreadable entry under {}: {}", self.input.display(), e);
                    None
                }
            })
            .filter(|entry| entry.file_type().is_file() && is_supported_file(entry.path()))
            .filter_map(|entry| {
                let relative = entry.path().strip_prefix(&self.input).ok()?;
                Some(FilePair::new(entry.path(), self.output.join(relative)))
            })
            .collect()
    }
}

impl FromStr for FilePair {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}
