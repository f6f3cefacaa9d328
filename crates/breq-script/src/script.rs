//! Script definition
//!
//! A Script is the immutable text of a `.breq` file split into lines. Each
//! run works on its own copy, so editing the source while a run is in
//! flight has no effect on that run.

use crate::error::ScriptError;
use crate::instruction::{classify, Instruction};
use std::path::Path;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Script {
    /// Display name, usually the file stem
    name: Option<String>,
    lines: Arc<[String]>,
}

impl Script {
    /// Split `text` into lines; `\r\n` endings are accepted
    pub fn parse(text: &str) -> Self {
        Self {
            name: None,
            lines: text.lines().map(str::to_string).collect(),
        }
    }

    /// Parse with a display name
    pub fn named(name: impl Into<String>, text: &str) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::parse(text)
        }
    }

    /// Read a UTF-8 script file, named after its stem
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ScriptError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ScriptError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let script = match path.file_stem() {
            Some(stem) => Self::named(stem.to_string_lossy(), &text),
            None => Self::parse(&text),
        };
        Ok(script)
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn line(&self, index: usize) -> Option<&str> {
        self.lines.get(index).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Every line with its index and classification
    pub fn instructions(&self) -> impl Iterator<Item = (usize, Instruction)> + '_ {
        self.lines
            .iter()
            .enumerate()
            .map(|(index, line)| (index, classify(line)))
    }

    /// Number of lines that do something when run
    pub fn executable_count(&self) -> usize {
        self.instructions()
            .filter(|(_, instruction)| instruction.is_executable())
            .count()
    }

    /// Index of the last line that does something when run
    pub fn last_executable(&self) -> Option<usize> {
        self.lines
            .iter()
            .rposition(|line| classify(line).is_executable())
    }
}
