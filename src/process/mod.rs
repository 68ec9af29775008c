// src/process/mod.rs
pub mod date_parser;
pub mod fields;
pub mod record;
pub mod span;
pub mod table;
pub mod text;

use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};
use std::collections::HashSet;
use tracing::{debug, instrument};

use crate::schema::Mappings;
pub use record::{FlatRecord, RawRecord, RecordKind};
pub use table::TableRows;

static RESULT_TABLE: Lazy<Selector> =
    Lazy::new(|| Selector::parse("table.wilko").expect("result table selector should parse"));

/// One parsed poll page together with the lookup tables it is read with.
///
/// The HTML is parsed once up front; records are produced on demand and the
/// sequence can be abandoned at any point.
pub struct PollDocument {
    jurisdiction: String,
    html: Html,
    mappings: Mappings,
}

impl PollDocument {
    #[instrument(level = "debug", skip(text, mappings), fields(bytes = text.len()))]
    pub fn parse(jurisdiction: &str, text: &str, mappings: Mappings) -> Self {
        let html = Html::parse_document(text);
        debug!(errors = html.errors.len(), "parsed poll page");
        Self {
            jurisdiction: jurisdiction.to_string(),
            html,
            mappings,
        }
    }

    pub fn jurisdiction(&self) -> &str {
        &self.jurisdiction
    }

    pub fn tables(&self) -> impl Iterator<Item = ElementRef<'_>> + '_ {
        self.html.select(&RESULT_TABLE)
    }

    /// Every reconstructed row of every result table, undated and duplicate rows included.
    pub fn raw_records(&self) -> impl Iterator<Item = RawRecord> + '_ {
        self.tables()
            .flat_map(move |table| TableRows::new(table, &self.jurisdiction, &self.mappings))
    }

    /// The lazy, single-pass stream of flattened results.
    ///
    /// Rows without a date are dropped; a row whose `site_id` was already
    /// seen earlier in the document (in any table) is emitted only once.
    pub fn polls(&self) -> impl Iterator<Item = FlatRecord> + '_ {
        let mut seen = HashSet::new();
        self.raw_records()
            .filter(|record| {
                if record.date.is_none() {
                    debug!(site_id = %record.site_id, "dropping undated row");
                    return false;
                }
                true
            })
            .filter(move |record| {
                let fresh = seen.insert(record.site_id.clone());
                if !fresh {
                    debug!(site_id = %record.site_id, "duplicate row");
                }
                fresh
            })
            .flat_map(move |record| record.flatten(&self.jurisdiction))
    }
}

/// Parse a whole page and collect its flattened results.
pub fn get_polls(jurisdiction: &str, text: &str, mappings: Mappings) -> Vec<FlatRecord> {
    PollDocument::parse(jurisdiction, text, mappings)
        .polls()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use chrono::NaiveDate;
    use tracing_subscriber::{EnvFilter, FmtSubscriber};

    fn init_test_logging() {
        let subscriber = FmtSubscriber::builder()
            .with_env_filter(
                EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| EnvFilter::new("info,wahlscraper::process=debug")),
            )
            .with_test_writer()
            .finish();
        let _ = tracing::subscriber::set_global_default(subscriber);
    }

    fn page(tables: &[&str]) -> String {
        format!("<html><body>{}</body></html>", tables.join("\n"))
    }

    const FORSA_TABLE: &str = r#"
        <table class="wilko">
          <tr><th>Institut</th><th>CDU</th><th>SPD</th><th>Grüne</th></tr>
          <tr><td>Forsa (03.04.2021)</td><td>28%</td><td>25%</td><td>14%</td></tr>
        </table>"#;

    #[test]
    fn single_row_yields_one_record_per_party() -> Result<()> {
        init_test_logging();
        let records = get_polls("bund", &page(&[FORSA_TABLE]), Mappings::default());
        assert_eq!(records.len(), 3);

        let date = NaiveDate::from_ymd_opt(2021, 4, 3);
        for r in &records {
            assert_eq!(r.institute.as_deref(), Some("Forsa"));
            assert_eq!(r.date, date);
            assert_eq!(r.jurisdiction, "bund");
            assert_eq!(r.kind, RecordKind::Poll);
        }
        let pairs: Vec<_> = records
            .iter()
            .map(|r| (r.party.as_str(), r.percentage))
            .collect();
        assert_eq!(
            pairs,
            vec![("CDU", Some(28.0)), ("SPD", Some(25.0)), ("Grüne", Some(14.0))]
        );
        Ok(())
    }

    #[test]
    fn repeated_rows_are_emitted_once() {
        init_test_logging();
        let doc = PollDocument::parse("bund", &page(&[FORSA_TABLE, FORSA_TABLE]), Mappings::default());
        assert_eq!(doc.tables().count(), 2);
        assert_eq!(doc.raw_records().count(), 2);
        assert_eq!(doc.polls().count(), 3);
    }

    #[test]
    fn unknown_result_is_kept_as_null() {
        let html = page(&[r#"
            <table class="wilko">
              <thead><tr><th>Institut</th><th>Datum</th><th>CDU</th><th>AfD</th></tr></thead>
              <tbody><tr><td>INSA</td><td>12.05.2022</td><td>31 %</td><td>–</td></tr></tbody>
            </table>"#]);
        let records = get_polls("nrw", &html, Mappings::default());
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].party, "AfD");
        assert_eq!(records[1].percentage, None);
        assert_eq!(records[1].state, "nrw");
    }

    #[test]
    fn undated_rows_and_foreign_tables_are_ignored() {
        let html = page(&[
            r#"<table><tr><th>Institut</th><th>CDU</th></tr><tr><td>Forsa (01.01.2021)</td><td>1 %</td></tr></table>"#,
            r#"
            <table class="wilko">
              <thead><tr><th>Institut</th><th>Datum</th><th>CDU</th></tr></thead>
              <tbody>
                <tr><td>Forsa</td><td>Mai 2022</td><td>30 %</td></tr>
                <tr><td>Forsa</td><td>12.05.2022</td><td>31 %</td></tr>
              </tbody>
            </table>"#,
        ]);
        let doc = PollDocument::parse("hessen", &html, Mappings::default());
        assert_eq!(doc.raw_records().count(), 2);
        let records: Vec<_> = doc.polls().collect();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].percentage, Some(31.0));
    }

    #[test]
    fn elections_and_polls_share_the_stream() {
        let html = page(&[r#"
            <table class="wilko">
              <thead><tr><th>Institut</th><th>Auftraggeber</th><th>Datum</th><th>CDU</th><th>SPD</th><th>Befragte</th></tr></thead>
              <tbody>
                <tr><td>GMS</td><td>Sat.1</td><td>10.03.2021</td><td>24 %</td><td>12 %</td><td>O • 1.004 03.03.–09.03.</td></tr>
                <tr><td colspan="3">Landtagswahl 14.03.2021</td><td>24,1 %</td><td>11,0 %</td><td></td></tr>
              </tbody>
            </table>"#]);
        let records = get_polls("baden-wuerttemberg", &html, Mappings::default());
        assert_eq!(records.len(), 4);
        assert_eq!(records[0].client.as_deref(), Some("Sat.1"));
        assert_eq!(records[0].count, Some(1004));
        assert_eq!(records[0].method.as_deref(), Some("O"));
        assert_eq!(records[0].start, NaiveDate::from_ymd_opt(2021, 3, 3));
        assert_eq!(records[2].kind, RecordKind::Election);
        assert_eq!(records[2].site_id, "baden-wuerttemberg|election|2021-03-14|baden-wuerttemberg");
        assert_eq!(records[3].percentage, Some(11.0));
    }

    #[test]
    fn stream_can_stop_early() {
        let doc = PollDocument::parse("bund", &page(&[FORSA_TABLE]), Mappings::default());
        let first: Vec<_> = doc.polls().take(1).collect();
        assert_eq!(first.len(), 1);
        assert_eq!(first[0].party, "CDU");
        assert_eq!(doc.jurisdiction(), "bund");
    }
}
