// src/schema/mappings.rs

use anyhow::{Context, Result};
use regex::Regex;
use serde::Deserialize;
use std::{collections::BTreeMap, fs, path::Path};
use tracing::debug;

use super::FieldParser;

/// A regex substitution applied to institute names.
#[derive(Debug, Clone)]
pub struct InstituteFix {
    pub pattern: Regex,
    pub replacement: String,
}

/// Lookup tables steering header classification and cell cleanup.
///
/// These are plain values handed to each parse; nothing here is global.
#[derive(Debug, Clone)]
pub struct Mappings {
    /// Header text → canonical label.
    pub column_names: BTreeMap<String, String>,
    /// A label containing any of these is metadata rather than a party.
    pub meta_columns: Vec<String>,
    /// Party spelling → preferred name.
    pub party_names: BTreeMap<String, String>,
    pub institutes: Vec<InstituteFix>,
    /// Canonical label → dedicated parser.
    pub parsers: BTreeMap<String, FieldParser>,
}

/// On-disk shape of a mappings file. Every section is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MappingsFile {
    pub column_names: BTreeMap<String, String>,
    pub meta_columns: Vec<String>,
    pub party_names: BTreeMap<String, String>,
    pub institutes: Vec<InstituteFixEntry>,
    pub parsers: BTreeMap<String, FieldParser>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct InstituteFixEntry {
    pub pattern: String,
    pub replacement: String,
}

fn pairs(entries: &[(&str, &str)]) -> BTreeMap<String, String> {
    entries
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

impl Default for Mappings {
    fn default() -> Self {
        let institutes = vec![
            InstituteFix {
                pattern: Regex::new(r"(?m)Forschungs-\s*gruppe")
                    .expect("built-in institute pattern should be valid"),
                replacement: "Forschungsgruppe".to_string(),
            },
            InstituteFix {
                pattern: Regex::new(r"^dimap$").expect("built-in institute pattern should be valid"),
                replacement: "Infratest dimap".to_string(),
            },
        ];

        let parsers = [
            ("Befragte", FieldParser::Sample),
            ("Befragte Zeitraum", FieldParser::Sample),
            ("Datum", FieldParser::Date),
            ("institute", FieldParser::Institute),
            ("client", FieldParser::Client),
            ("election", FieldParser::Election),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect();

        Self {
            column_names: pairs(&[
                ("Quelle", "client"),
                ("Institut", "institute"),
                ("Auftraggeber", "client"),
                ("Auftrag- geber", "client"),
                ("Institut (Datum)", "institute"),
            ]),
            meta_columns: ["institute", "client", "Befragte", "Datum"]
                .into_iter()
                .map(String::from)
                .collect(),
            party_names: pairs(&[("Sonst.", "Sonstige")]),
            institutes,
            parsers,
        }
    }
}

impl Mappings {
    /// Defaults extended by the contents of a YAML mappings file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .with_context(|| format!("reading mappings file {}", path.display()))?;
        Self::from_yaml_str(&text).with_context(|| format!("parsing mappings file {}", path.display()))
    }

    pub fn from_yaml_str(text: &str) -> Result<Self> {
        let file: MappingsFile = serde_yaml::from_str(text)?;
        Self::default().merge(file)
    }

    /// Maps override by key, lists are appended.
    pub fn merge(mut self, file: MappingsFile) -> Result<Self> {
        debug!(
            column_names = file.column_names.len(),
            party_names = file.party_names.len(),
            institutes = file.institutes.len(),
            parsers = file.parsers.len(),
            "merging mappings"
        );
        self.column_names.extend(file.column_names);
        self.party_names.extend(file.party_names);
        self.parsers.extend(file.parsers);
        for label in file.meta_columns {
            if !self.meta_columns.contains(&label) {
                self.meta_columns.push(label);
            }
        }
        for entry in file.institutes {
            let pattern = Regex::new(&entry.pattern)
                .with_context(|| format!("invalid institute pattern {:?}", entry.pattern))?;
            self.institutes.push(InstituteFix {
                pattern,
                replacement: entry.replacement,
            });
        }
        Ok(self)
    }

    /// Canonical spelling of a header label.
    pub fn canonical_label(&self, label: &str) -> String {
        self.column_names
            .get(label)
            .cloned()
            .unwrap_or_else(|| label.to_string())
    }

    pub fn is_meta_label(&self, label: &str) -> bool {
        self.meta_columns.iter().any(|m| label.contains(m.as_str()))
    }

    pub fn parser_for(&self, label: &str) -> Option<FieldParser> {
        self.parsers.get(label).copied()
    }

    pub fn party_name(&self, raw: &str) -> String {
        let name = raw.trim();
        self.party_names
            .get(name)
            .cloned()
            .unwrap_or_else(|| name.to_string())
    }

    pub fn fix_institute(&self, name: &str) -> String {
        self.institutes
            .iter()
            .fold(name.to_string(), |acc, fix| {
                fix.pattern
                    .replace_all(&acc, fix.replacement.as_str())
                    .into_owned()
            })
    }
}
