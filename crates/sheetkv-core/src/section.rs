//! Section extraction
//!
//! A section pairs a vertical range of key cells with a vertical range of
//! value cells. Extraction walks both ranges in lock step and collects one
//! [`KeyValueEntry`] per non-blank key.

use std::collections::HashSet;

use log::debug;

use crate::cell::{CellAddress, CellRange};
use crate::error::{Error, Result};
use crate::number_format::NumberFormatter;
use crate::resolve::ValueResolver;
use crate::source::{CellFactSource, SheetId};

/// One configured section
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionConfig {
    /// Section name, unique within an extractor
    pub name: String,
    /// Range text of the key cells, e.g. `A2:A10`
    pub key_range: String,
    /// Range text of the value cells, e.g. `B2:B10`
    pub value_range: String,
}

impl SectionConfig {
    pub fn new<N, K, V>(name: N, key_range: K, value_range: V) -> Self
    where
        N: Into<String>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            name: name.into(),
            key_range: key_range.into(),
            value_range: value_range.into(),
        }
    }
}

/// A key/value pair read from a section
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct KeyValueEntry {
    #[cfg_attr(feature = "serde", serde(rename = "KeyCell"))]
    pub key_cell: String,
    #[cfg_attr(feature = "serde", serde(rename = "Key"))]
    pub key: String,
    #[cfg_attr(feature = "serde", serde(rename = "ValueCell"))]
    pub value_cell: String,
    #[cfg_attr(feature = "serde", serde(rename = "Value"))]
    pub value: Option<String>,
    #[cfg_attr(feature = "serde", serde(rename = "Formula"))]
    pub formula: String,
}

/// Extracted entries per section, in configuration order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SectionMap {
    sections: Vec<(String, Vec<KeyValueEntry>)>,
}

impl SectionMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind entries to a section name, replacing an earlier binding
    pub fn insert<S: Into<String>>(&mut self, name: S, entries: Vec<KeyValueEntry>) {
        let name = name.into();
        match self.sections.iter_mut().find(|(n, _)| *n == name) {
            Some((_, existing)) => *existing = entries,
            None => self.sections.push((name, entries)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&[KeyValueEntry]> {
        self.sections
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, entries)| entries.as_slice())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.sections.iter().map(|(n, _)| n.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[KeyValueEntry])> {
        self.sections
            .iter()
            .map(|(n, entries)| (n.as_str(), entries.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.sections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for SectionMap {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_map(self.sections.iter().map(|(n, e)| (n, e)))
    }
}

/// Reads configured sections out of a document
#[derive(Debug, Clone)]
pub struct SectionExtractor {
    sections: Vec<SectionConfig>,
    resolver: ValueResolver,
}

impl SectionExtractor {
    /// Create an extractor, rejecting repeated section names
    pub fn new(sections: Vec<SectionConfig>) -> Result<Self> {
        let mut seen = HashSet::new();
        for section in &sections {
            if !seen.insert(section.name.as_str()) {
                return Err(Error::DuplicateSection(section.name.clone()));
            }
        }
        Ok(Self {
            sections,
            resolver: ValueResolver::default(),
        })
    }

    /// Use a custom number formatter
    pub fn with_formatter(mut self, formatter: NumberFormatter) -> Self {
        self.resolver = ValueResolver::new(formatter);
        self
    }

    pub fn sections(&self) -> &[SectionConfig] {
        &self.sections
    }

    /// Extract every configured section from one sheet
    pub fn extract<S>(&self, source: &S, sheet: SheetId) -> Result<SectionMap>
    where
        S: CellFactSource + ?Sized,
    {
        let mut map = SectionMap::new();
        for section in &self.sections {
            let entries = self.extract_section(source, sheet, section)?;
            map.insert(section.name.clone(), entries);
        }
        Ok(map)
    }

    /// Extract a single section
    pub fn extract_section<S>(
        &self,
        source: &S,
        sheet: SheetId,
        section: &SectionConfig,
    ) -> Result<Vec<KeyValueEntry>>
    where
        S: CellFactSource + ?Sized,
    {
        let keys = expand_in_section(section, &section.key_range)?;
        let values = expand_in_section(section, &section.value_range)?;

        if keys.len() != values.len() {
            debug!(
                "section '{}': key range {} has {} cells, value range {} has {}; reading {}",
                section.name,
                section.key_range,
                keys.len(),
                section.value_range,
                values.len(),
                keys.len().min(values.len())
            );
        }

        let mut entries = Vec::new();
        for (key_addr, value_addr) in keys.into_iter().zip(values) {
            let key = self.resolver.resolve_display(source, sheet, key_addr)?;
            let key = key.trim();
            if key.is_empty() {
                continue;
            }

            let value = self.resolver.resolve(source, sheet, value_addr)?;
            entries.push(KeyValueEntry {
                key_cell: key_addr.to_a1_string(),
                key: key.to_string(),
                value_cell: value_addr.to_a1_string(),
                value: Some(value.display.trim().to_string()),
                formula: value.formula,
            });
        }

        debug!("section '{}': {} entries", section.name, entries.len());
        Ok(entries)
    }
}

fn expand_in_section(section: &SectionConfig, range: &str) -> Result<Vec<CellAddress>> {
    CellRange::parse(range)
        .map(|r| r.cells().collect())
        .map_err(|e| e.in_section(section.name.clone(), range))
}
