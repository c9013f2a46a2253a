//! Loading of the issuer configuration file.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use encoding_rs::Encoding;
use tracing::{debug, warn};

pub mod cmd;
mod error;
mod ini;
mod layout;
mod profile;
mod resolve;

pub use error::ConfigError;
pub use ini::Section;
pub use layout::{AmountColumns, Field};
pub use profile::{AccountType, Profile};

use crate::encoding;
use ini::Document;
use resolve::Resolver;

/// Encoding assumed for CSV files when the configuration names none.
pub const DEFAULT_CSV_ENCODING: &str = "cp932";
pub const DEFAULT_TIMEZONE: &str = "JST-9";

const CONF_FILE_NAME: &str = "csv2ofx.ini";

/// The configuration file location used when none is given.
pub fn default_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(CONF_FILE_NAME))
}

/// Values beneath the file's own `[DEFAULT]` section.
fn builtin_defaults() -> Section {
    vec![
        (profile::ENCODING_KEY, DEFAULT_CSV_ENCODING),
        (profile::TIMEZONE_KEY, DEFAULT_TIMEZONE),
        (profile::TYPE_KEY, "credit"),
        (profile::CARDNUMBER_KEY, ""),
        (profile::CARDNAME_KEY, ""),
    ]
    .into_iter()
    .collect()
}

/// A parsed configuration. Immutable once loaded.
#[derive(Debug)]
pub struct Config {
    doc: Document,
    defaults: Section,
}

impl Config {
    pub fn from_path(path: &Path, file_encoding: Option<&'static Encoding>) -> Result<Self> {
        let bytes =
            std::fs::read(path).with_context(|| format!("opening {:?} for reading", path))?;
        let text = encoding::decode(&bytes, file_encoding)
            .with_context(|| format!("decoding {:?}", path))?;
        Self::parse(&text).with_context(|| format!("parsing {:?}", path))
    }

    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        let doc = Document::parse(text)?;
        for notice in doc.notices() {
            warn!("{}", notice);
        }
        let mut defaults = builtin_defaults();
        defaults.merge_from(doc.defaults());
        Ok(Self { doc, defaults })
    }

    /// Issuer section names in file order.
    pub fn issuers(&self) -> impl Iterator<Item = &str> {
        self.doc.section_names()
    }

    /// Flattened key/value pairs of `issuer`.
    pub fn resolve(&self, issuer: &str) -> Result<Section, ConfigError> {
        Resolver::new(&self.doc, &self.defaults).resolve(issuer)
    }

    pub fn profile(&self, issuer: &str) -> Result<Profile, ConfigError> {
        let resolved = self.resolve(issuer)?;
        let profile = Profile::from_resolved(issuer, &resolved)?;
        debug!(issuer, ?profile, "resolved profile");
        Ok(profile)
    }

    #[cfg(test)]
    pub fn notices(&self) -> &[ConfigError] {
        self.doc.notices()
    }
}
