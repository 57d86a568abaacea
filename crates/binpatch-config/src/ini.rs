//! Minimal INI document: sections, `key=value` pairs and `;` comments.
//!
//! Comments are attached to the section or key that follows them and are
//! written back on save. Values are stored raw; expansion happens in
//! [`crate::resolve`].

use std::fmt;

use binpatch_core::{Error, Result};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IniKey {
    pub name: String,
    pub value: String,
    pub comments: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IniSection {
    pub name: String,
    pub comments: Vec<String>,
    keys: Vec<IniKey>,
}

impl IniSection {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn keys(&self) -> &[IniKey] {
        &self.keys
    }

    pub fn key(&self, name: &str) -> Option<&IniKey> {
        self.keys.iter().find(|k| k.name == name)
    }

    pub fn has_key(&self, name: &str) -> bool {
        self.key(name).is_some()
    }

    /// Get a key, appending an empty one if absent.
    pub fn key_or_create(&mut self, name: &str) -> &mut IniKey {
        let idx = match self.keys.iter().position(|k| k.name == name) {
            Some(idx) => idx,
            None => {
                self.keys.push(IniKey {
                    name: name.to_string(),
                    ..Default::default()
                });
                self.keys.len() - 1
            }
        };
        &mut self.keys[idx]
    }

    pub fn comment(&mut self, lines: &[&str]) -> &mut Self {
        self.comments.extend(lines.iter().map(|l| l.to_string()));
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IniDocument {
    sections: Vec<IniSection>,
    /// Comments after the last key of the file.
    trailing: Vec<String>,
}

impl IniDocument {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn parse(text: &str) -> Result<Self> {
        let mut doc = Self::new();
        let mut pending: Vec<String> = Vec::new();
        let mut current: Option<usize> = None;

        for (idx, raw) in text.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() {
                continue;
            }

            if let Some(comment) = line.strip_prefix(';') {
                pending.push(comment.strip_prefix(' ').unwrap_or(comment).to_string());
                continue;
            }

            if let Some(header) = line.strip_prefix('[') {
                let name = header.strip_suffix(']').ok_or_else(|| Error::ConfigParse {
                    line: idx + 1,
                    reason: format!("unterminated section header '{line}'"),
                })?;
                let section = doc.section_index_or_create(name.trim());
                doc.sections[section].comments.append(&mut pending);
                current = Some(section);
                continue;
            }

            let Some((key, value)) = line.split_once('=') else {
                return Err(Error::ConfigParse {
                    line: idx + 1,
                    reason: format!("expected 'key=value', found '{line}'"),
                });
            };
            let section = current.ok_or_else(|| Error::ConfigParse {
                line: idx + 1,
                reason: format!("key '{}' appears before any section", key.trim()),
            })?;

            let entry = doc.sections[section].key_or_create(key.trim());
            entry.value = value.trim().to_string();
            entry.comments.append(&mut pending);
        }

        doc.trailing = pending;
        Ok(doc)
    }

    pub fn sections(&self) -> &[IniSection] {
        &self.sections
    }

    pub fn section(&self, name: &str) -> Option<&IniSection> {
        self.sections.iter().find(|s| s.name == name)
    }

    /// Get a section, appending an empty one if absent.
    pub fn section_or_create(&mut self, name: &str) -> &mut IniSection {
        let idx = self.section_index_or_create(name);
        &mut self.sections[idx]
    }

    fn section_index_or_create(&mut self, name: &str) -> usize {
        match self.sections.iter().position(|s| s.name == name) {
            Some(idx) => idx,
            None => {
                self.sections.push(IniSection::new(name));
                self.sections.len() - 1
            }
        }
    }

    /// Raw value of `section.key`, if present.
    pub fn get(&self, section: &str, key: &str) -> Option<&str> {
        self.section(section)?.key(key).map(|k| k.value.as_str())
    }

    pub fn set(&mut self, section: &str, key: &str, value: impl Into<String>) {
        self.section_or_create(section).key_or_create(key).value = value.into();
    }

    /// Set `section.key` only if it is missing or empty.
    pub fn set_if_empty(&mut self, section: &str, key: &str, value: impl Into<String>) {
        let entry = self.section_or_create(section).key_or_create(key);
        if entry.value.is_empty() {
            entry.value = value.into();
        }
    }

    /// Every comment in the document, in file order.
    pub fn comments(&self) -> impl Iterator<Item = &str> {
        self.sections
            .iter()
            .flat_map(|s| {
                s.comments
                    .iter()
                    .chain(s.keys.iter().flat_map(|k| k.comments.iter()))
            })
            .chain(self.trailing.iter())
            .map(|c| c.as_str())
    }
}

impl fmt::Display for IniDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, section) in self.sections.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            for c in &section.comments {
                writeln!(f, ";{c}")?;
            }
            writeln!(f, "[{}]", section.name)?;
            for key in &section.keys {
                for c in &key.comments {
                    writeln!(f, ";{c}")?;
                }
                writeln!(f, "{}={}", key.name, key.value)?;
            }
        }
        if !self.trailing.is_empty() {
            writeln!(f)?;
            for c in &self.trailing {
                writeln!(f, ";{c}")?;
            }
        }
        Ok(())
    }
}
