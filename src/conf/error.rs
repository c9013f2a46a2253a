use thiserror::Error;

/// Errors raised while loading or resolving an issuer configuration.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum ConfigError {
    #[error("line {line}: {reason}")]
    Syntax { line: usize, reason: String },
    #[error("issuer [{section}] not found")]
    SectionNotFound { section: String },
    #[error("[{section}] {key}: unresolved include of [{target}]")]
    UnresolvedInclude {
        section: String,
        key: String,
        target: String,
    },
    #[error("[{section}] {key}: include cycle {}", chain.join(" -> "))]
    IncludeCycle {
        section: String,
        key: String,
        chain: Vec<String>,
    },
    #[error("[{section}] {key}: invalid column layout: {reason}")]
    InvalidColumnLayout {
        section: String,
        key: String,
        reason: String,
    },
    #[error("[{section}] {key}: unsupported encoding {label:?}")]
    UnsupportedEncoding {
        section: String,
        key: String,
        label: String,
    },
    #[error("[{section}] {key}: invalid value {value:?}")]
    InvalidValue {
        section: String,
        key: String,
        value: String,
    },
    /// Informational only; the later value is kept.
    #[error("[{section}] {key}: duplicate key, line {line} overrides the earlier value")]
    DuplicateKeyConflict {
        section: String,
        key: String,
        line: usize,
    },
}

impl ConfigError {
    pub fn invalid_layout<S: Into<String>>(section: &str, key: &str, reason: S) -> Self {
        ConfigError::InvalidColumnLayout {
            section: section.to_string(),
            key: key.to_string(),
            reason: reason.into(),
        }
    }

    pub fn syntax<S: Into<String>>(line: usize, reason: S) -> Self {
        ConfigError::Syntax {
            line,
            reason: reason.into(),
        }
    }
}
