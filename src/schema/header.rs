// src/schema/header.rs

use scraper::{ElementRef, Selector};
use once_cell::sync::Lazy;
use tracing::{debug, trace};

use super::{FieldKind, HeaderField, Mappings};
use crate::process::text::{
    body_rows, cell_text, child_elements, children_named, is_header_cell, region_marker,
};

static TH: Lazy<Selector> = Lazy::new(|| Selector::parse("th").expect("th selector should parse"));

/// Classify every column of `table`, in column order.
///
/// Header cells come from `thead` when present. Otherwise the first body row
/// made only of `th` cells without `colspan` is taken as the header.
pub fn parse_header(table: ElementRef<'_>, mappings: &Mappings) -> Vec<HeaderField> {
    let fields: Vec<HeaderField> = header_cells(table)
        .into_iter()
        .map(|cell| classify_cell(cell, mappings))
        .collect();
    debug!(
        columns = fields.len(),
        parties = fields.iter().filter(|f| f.is_party).count(),
        "parsed table header"
    );
    fields
}

fn header_cells(table: ElementRef<'_>) -> Vec<ElementRef<'_>> {
    if let Some(thead) = children_named(table, "thead").next() {
        return thead.select(&TH).collect();
    }
    for row in body_rows(table) {
        let cells: Vec<_> = child_elements(row).collect();
        let all_plain_th = !cells.is_empty()
            && cells
                .iter()
                .all(|c| is_header_cell(*c) && c.value().attr("colspan").is_none());
        if all_plain_th && region_marker(&cells).is_none() {
            return cells;
        }
    }
    Vec::new()
}

fn is_party_cell(cell: ElementRef<'_>) -> bool {
    cell.value().classes().any(|c| c == "part")
        || child_elements(cell).any(|c| c.value().name() == "a")
}

/// One header cell → one column interpretation.
///
/// Labels that are neither marked as party nor recognised as metadata fall
/// back to party columns, so unknown party spellings still yield results.
pub fn classify_cell(cell: ElementRef<'_>, mappings: &Mappings) -> HeaderField {
    let text = cell_text(cell);
    let label = (!text.is_empty()).then(|| mappings.canonical_label(&text));
    let is_party = is_party_cell(cell)
        || label
            .as_deref()
            .is_some_and(|l| !mappings.is_meta_label(l));

    let kind = match &label {
        None => FieldKind::Spacer,
        Some(l) if is_party => FieldKind::Party(l.clone()),
        Some(l) => mappings
            .parser_for(l)
            .map(FieldKind::Meta)
            .unwrap_or_else(|| FieldKind::Passthrough(l.clone())),
    };
    trace!(label = ?label, is_party, kind = ?kind, "classified column");

    HeaderField {
        label,
        is_party,
        kind,
    }
}
