// src/schema/mod.rs
pub mod header;
pub mod mappings;
pub mod types;

pub use header::{classify_cell, parse_header};
pub use mappings::{InstituteFix, Mappings, MappingsFile};
pub use types::{FieldKind, FieldParser, HeaderField};
