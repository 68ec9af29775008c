// src/lib.rs
pub mod fetch;
pub mod output;
pub mod process;
pub mod schema;

pub use fetch::Jurisdiction;
pub use process::{get_polls, FlatRecord, PollDocument, RawRecord, RecordKind};
pub use schema::Mappings;
