//! User-defined memo substitution table.

use std::path::Path;

use anyhow::{Context, Result};

/// Ordered `from=to` replacements applied to every memo.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct SubstTable {
    entries: Vec<(String, String)>,
}

impl SubstTable {
    /// Reads the table; its encoding is detected like the configuration
    /// file's.
    pub fn from_path(path: &Path) -> Result<Self> {
        let bytes =
            std::fs::read(path).with_context(|| format!("opening {:?} for reading", path))?;
        let text =
            crate::encoding::decode(&bytes, None).with_context(|| format!("decoding {:?}", path))?;
        Ok(Self::parse(&text))
    }

    /// Lines starting with `#` and lines without `=` are ignored.
    pub fn parse(text: &str) -> Self {
        let entries = text
            .lines()
            .filter(|line| !line.starts_with('#'))
            .filter_map(|line| line.trim().split_once('='))
            .filter(|(from, _)| !from.is_empty())
            .map(|(from, to)| (from.to_string(), to.to_string()))
            .collect();
        Self { entries }
    }

    pub fn apply(&self, memo: &str) -> String {
        self.entries
            .iter()
            .fold(memo.to_string(), |memo, (from, to)| memo.replace(from, to))
    }
}
