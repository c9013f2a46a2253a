//! Parses the INI-style issuer configuration text into ordered sections.

use crate::conf::error::ConfigError;

/// Name of the section whose keys every other section inherits.
pub const DEFAULT_SECTION: &str = "DEFAULT";

/// An ordered set of key/value pairs. Keys are unique; setting an existing
/// key replaces its value in place.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Section {
    entries: Vec<(String, String)>,
}

impl Section {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Sets `key` to `value`, returning the value it replaced.
    pub fn set<K: Into<String>, V: Into<String>>(&mut self, key: K, value: V) -> Option<String> {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, existing)) => Some(std::mem::replace(existing, value)),
            None => {
                self.entries.push((key, value));
                None
            }
        }
    }

    pub fn remove(&mut self, key: &str) -> Option<String> {
        let idx = self.entries.iter().position(|(k, _)| k == key)?;
        Some(self.entries.remove(idx).1)
    }

    /// Overlays `other` on top of `self`; values in `other` win.
    pub fn merge_from(&mut self, other: &Section) {
        for (k, v) in other.iter() {
            self.set(k, v);
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Section {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut section = Section::new();
        for (k, v) in iter {
            section.set(k, v);
        }
        section
    }
}

/// The parsed, unresolved configuration file.
#[derive(Clone, Debug, Default)]
pub struct Document {
    defaults: Section,
    sections: Vec<(String, Section)>,
    notices: Vec<ConfigError>,
}

enum Cursor {
    Nowhere,
    Defaults,
    Section(usize),
}

impl Document {
    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        let text = text.strip_prefix('\u{feff}').unwrap_or(text);

        let mut doc = Document::default();
        let mut cursor = Cursor::Nowhere;
        let mut last_key: Option<String> = None;

        for (idx, raw_line) in text.lines().enumerate() {
            let line_no = idx + 1;
            let line = raw_line.trim();

            if line.is_empty() {
                last_key = None;
                continue;
            }
            if line.starts_with('#') || line.starts_with(';') {
                continue;
            }

            // Indented lines continue the value of the previous key.
            if raw_line.starts_with(char::is_whitespace) {
                if let Some(key) = &last_key {
                    let section = doc.section_at_mut(&cursor);
                    let mut value = section.get(key).unwrap_or_default().to_string();
                    value.push('\n');
                    value.push_str(line);
                    section.set(key.as_str(), value);
                    continue;
                }
            }

            if let Some(header) = line.strip_prefix('[') {
                let name = header
                    .strip_suffix(']')
                    .ok_or_else(|| ConfigError::syntax(line_no, "unterminated section header"))?
                    .trim();
                if name.is_empty() {
                    return Err(ConfigError::syntax(line_no, "empty section name"));
                }
                cursor = doc.open_section(name);
                last_key = None;
                continue;
            }

            let split_at = line
                .find(|c: char| c == '=' || c == ':')
                .ok_or_else(|| ConfigError::syntax(line_no, "expected key=value"))?;
            let key = line[..split_at].trim().to_lowercase();
            let value = line[split_at + 1..].trim();
            if key.is_empty() {
                return Err(ConfigError::syntax(line_no, "empty key"));
            }
            if let Cursor::Nowhere = cursor {
                return Err(ConfigError::syntax(
                    line_no,
                    format!("key {:?} outside of any section", key),
                ));
            }

            let section_name = doc.section_name_at(&cursor).to_string();
            if doc
                .section_at_mut(&cursor)
                .set(key.as_str(), value)
                .is_some()
            {
                doc.notices.push(ConfigError::DuplicateKeyConflict {
                    section: section_name,
                    key: key.clone(),
                    line: line_no,
                });
            }
            last_key = Some(key);
        }

        Ok(doc)
    }

    fn open_section(&mut self, name: &str) -> Cursor {
        if name == DEFAULT_SECTION {
            return Cursor::Defaults;
        }
        // A repeated header reopens the earlier section.
        match self.sections.iter().position(|(n, _)| n == name) {
            Some(idx) => Cursor::Section(idx),
            None => {
                self.sections.push((name.to_string(), Section::new()));
                Cursor::Section(self.sections.len() - 1)
            }
        }
    }

    fn section_at_mut(&mut self, cursor: &Cursor) -> &mut Section {
        match cursor {
            Cursor::Section(idx) => &mut self.sections[*idx].1,
            Cursor::Defaults | Cursor::Nowhere => &mut self.defaults,
        }
    }

    fn section_name_at(&self, cursor: &Cursor) -> &str {
        match cursor {
            Cursor::Section(idx) => &self.sections[*idx].0,
            Cursor::Defaults | Cursor::Nowhere => DEFAULT_SECTION,
        }
    }

    /// The `[DEFAULT]` section (empty if the file has none).
    pub fn defaults(&self) -> &Section {
        &self.defaults
    }

    pub fn section(&self, name: &str) -> Option<&Section> {
        self.sections
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, section)| section)
    }

    /// Names of all sections other than `[DEFAULT]`, in file order.
    pub fn section_names(&self) -> impl Iterator<Item = &str> {
        self.sections.iter().map(|(n, _)| n.as_str())
    }

    /// Non-fatal findings, such as keys assigned twice.
    pub fn notices(&self) -> &[ConfigError] {
        &self.notices
    }
}
