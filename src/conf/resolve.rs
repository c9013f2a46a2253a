//! Flattens `[DEFAULT]`, `include=` targets and local keys into one section.

use tracing::debug;

use crate::conf::error::ConfigError;
use crate::conf::ini::{Document, Section};

pub const INCLUDE_KEY: &str = "include";

/// Resolves sections of `doc` on top of an explicit set of defaults.
pub struct Resolver<'a> {
    doc: &'a Document,
    defaults: &'a Section,
}

impl<'a> Resolver<'a> {
    pub fn new(doc: &'a Document, defaults: &'a Section) -> Self {
        Self { doc, defaults }
    }

    /// Returns the merged keys of `name`, with precedence
    /// local > included > defaults. The `include` key itself is dropped.
    pub fn resolve(&self, name: &str) -> Result<Section, ConfigError> {
        let local = self
            .doc
            .section(name)
            .ok_or_else(|| ConfigError::SectionNotFound {
                section: name.to_string(),
            })?;
        let mut chain = vec![name.to_string()];
        self.resolve_section(name, local, &mut chain)
    }

    fn resolve_section(
        &self,
        name: &str,
        local: &Section,
        chain: &mut Vec<String>,
    ) -> Result<Section, ConfigError> {
        let mut resolved = self.defaults.clone();

        if let Some(target) = local.get(INCLUDE_KEY).and_then(include_target) {
            if chain.iter().any(|seen| seen == target) {
                let mut cycle = chain.clone();
                cycle.push(target.to_string());
                return Err(ConfigError::IncludeCycle {
                    section: name.to_string(),
                    key: INCLUDE_KEY.to_string(),
                    chain: cycle,
                });
            }
            let included =
                self.doc
                    .section(target)
                    .ok_or_else(|| ConfigError::UnresolvedInclude {
                        section: name.to_string(),
                        key: INCLUDE_KEY.to_string(),
                        target: target.to_string(),
                    })?;
            debug!(section = name, include = target, "resolving include");

            chain.push(target.to_string());
            let included = self.resolve_section(target, included, chain)?;
            chain.pop();

            resolved.merge_from(&included);
        }

        resolved.merge_from(local);
        resolved.remove(INCLUDE_KEY);
        Ok(resolved)
    }
}

/// Extracts the section name from `[name]` (brackets optional). An empty
/// value means no include.
fn include_target(value: &str) -> Option<&str> {
    let target = value
        .trim()
        .trim_start_matches('[')
        .trim_end_matches(']')
        .trim();
    if target.is_empty() {
        None
    } else {
        Some(target)
    }
}
