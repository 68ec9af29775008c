// src/schema/types.rs

use serde::{Deserialize, Serialize};

/// Dedicated parser for a metadata column, keyed by canonical label.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy, Hash)]
#[serde(rename_all = "snake_case")]
pub enum FieldParser {
    /// Sample kind, size and fieldwork period, e.g. `T • 1.002 05.03.–08.03.` or `KW 12`.
    Sample,
    /// Publication date as `dd.mm.yyyy`.
    Date,
    /// `Name (dd.mm.yy)` with the date being optional.
    Institute,
    /// Commissioning client, stored verbatim.
    Client,
    /// First `dd.mm.yyyy` found anywhere in the cell.
    Election,
}

/// How every cell of a column is read. Resolved once per table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldKind {
    /// Unlabelled column; its cells only occupy a position.
    Spacer,
    /// Result column. The label doubles as the party name when a cell names none.
    Party(String),
    Meta(FieldParser),
    /// Unknown metadata, kept as raw text under its label.
    Passthrough(String),
}

/// A classified column of a result table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderField {
    pub label: Option<String>,
    pub is_party: bool,
    pub kind: FieldKind,
}

impl HeaderField {
    /// The synthetic leading column of an election row.
    pub fn election() -> Self {
        Self {
            label: Some("election".to_string()),
            is_party: false,
            kind: FieldKind::Meta(FieldParser::Election),
        }
    }
}
