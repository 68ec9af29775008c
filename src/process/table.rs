// src/process/table.rs

use scraper::ElementRef;
use tracing::{debug, trace};

use super::fields::parse_field;
use super::record::{RawRecord, RecordKind};
use super::span::SpanCarry;
use super::text::{body_rows, cell_text, child_elements, is_header_cell, region_marker, span};
use crate::schema::{parse_header, HeaderField, Mappings};

/// What a body row turns out to be.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowAction {
    /// A lone `th` with an `id`: a new region starts.
    RegionMarker(String),
    /// Any other row led by a `th`; separates sub-tables.
    SkipSubheader,
    /// A past election result; its first cell spans `offset` header columns.
    BuildElection { offset: usize },
    BuildPoll,
}

/// Decide how to treat a row given the number of header columns it aligns with.
pub fn classify_row(cells: &[ElementRef<'_>], columns: usize) -> Option<RowAction> {
    let first = *cells.first()?;
    if let Some(region) = region_marker(cells) {
        return Some(RowAction::RegionMarker(region));
    }
    if is_header_cell(first) {
        return Some(RowAction::SkipSubheader);
    }
    let offset = span(first, "colspan");
    if offset > 1 || cells.len() < columns {
        Some(RowAction::BuildElection { offset })
    } else {
        Some(RowAction::BuildPoll)
    }
}

/// Lazily reconstructs the rows of one result table.
///
/// Owns the table's span-carry state and the current region; both die with
/// the iterator.
pub struct TableRows<'a, 'm> {
    jurisdiction: &'m str,
    mappings: &'m Mappings,
    header: Vec<HeaderField>,
    rows: std::vec::IntoIter<ElementRef<'a>>,
    carry: SpanCarry<ElementRef<'a>>,
    region: Option<String>,
}

impl<'a, 'm> TableRows<'a, 'm> {
    pub fn new(table: ElementRef<'a>, jurisdiction: &'m str, mappings: &'m Mappings) -> Self {
        let header = parse_header(table, mappings);
        let rows = body_rows(table);
        debug!(
            jurisdiction,
            columns = header.len(),
            rows = rows.len(),
            "reading poll table"
        );
        Self {
            jurisdiction,
            mappings,
            header,
            rows: rows.into_iter(),
            carry: SpanCarry::new(),
            region: None,
        }
    }

    pub fn header(&self) -> &[HeaderField] {
        &self.header
    }

    pub fn region(&self) -> Option<&str> {
        self.region.as_deref()
    }

    fn build(&mut self, cells: &[ElementRef<'a>], kind: RecordKind, offset: usize) -> RawRecord {
        let inherited = self.carry.take_row();
        let columns: Vec<usize> = (0..self.header.len())
            .filter(|i| !inherited.iter().any(|(c, _)| c == i))
            .collect();

        let mut record = RawRecord::new(kind);
        let mut physical = cells.iter().copied();
        let mut aligned: Vec<(usize, ElementRef<'a>)> = Vec::with_capacity(self.header.len());

        let skip = match kind {
            RecordKind::Election => {
                if let Some(first) = physical.next() {
                    let election = HeaderField::election();
                    if let Some(fragment) =
                        parse_field(&election.kind, &cell_text(first), self.mappings)
                    {
                        record.apply(fragment);
                    }
                }
                offset
            }
            RecordKind::Poll => 0,
        };

        for (&column, cell) in columns.iter().skip(skip).zip(physical) {
            let rowspan = span(cell, "rowspan");
            if rowspan > 1 {
                self.carry.record(column, rowspan, cell);
            }
            aligned.push((column, cell));
        }
        aligned.extend(inherited);
        aligned.sort_by_key(|(column, _)| *column);

        for (column, cell) in aligned {
            let field = &self.header[column];
            if let Some(fragment) = parse_field(&field.kind, &cell_text(cell), self.mappings) {
                record.apply(fragment);
            }
        }

        record.state = self
            .region
            .clone()
            .unwrap_or_else(|| self.jurisdiction.to_string());
        match kind {
            RecordKind::Poll => record.resolve_dates(),
            RecordKind::Election => {
                record.period = None;
                record.start = None;
                record.end = None;
            }
        }
        record.site_id = record.identity(self.jurisdiction);
        trace!(site_id = %record.site_id, results = record.results.len(), "row rebuilt");
        record
    }
}

impl<'a, 'm> Iterator for TableRows<'a, 'm> {
    type Item = RawRecord;

    fn next(&mut self) -> Option<RawRecord> {
        while let Some(row) = self.rows.next() {
            let cells: Vec<ElementRef<'a>> = child_elements(row).collect();
            let columns = self.header.len() - self.carry.covered();
            let Some(action) = classify_row(&cells, columns) else {
                continue;
            };
            match action {
                RowAction::RegionMarker(region) => {
                    debug!(region = %region, "entering region");
                    self.region = Some(region);
                    self.carry.reset();
                }
                RowAction::SkipSubheader => trace!("skipping sub-header row"),
                RowAction::BuildElection { offset } => {
                    return Some(self.build(&cells, RecordKind::Election, offset))
                }
                RowAction::BuildPoll => return Some(self.build(&cells, RecordKind::Poll, 0)),
            }
        }
        None
    }
}
