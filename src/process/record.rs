// src/process/record.rs

use chrono::{Datelike, NaiveDate};
use serde::Serialize;
use std::collections::BTreeMap;

use super::date_parser::{fix_dates_before, week_to_range};
use super::fields::{Fragment, Period};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordKind {
    #[default]
    Poll,
    /// Result of a past election listed inside a poll table.
    Election,
}

impl RecordKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordKind::Poll => "poll",
            RecordKind::Election => "election",
        }
    }
}

/// One reconstructed table row, before flattening.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RawRecord {
    pub kind: RecordKind,
    pub state: String,
    /// `jurisdiction|institute-or-election|date|state`, unique within one document.
    pub site_id: String,
    pub institute: Option<String>,
    pub client: Option<String>,
    pub date: Option<NaiveDate>,
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
    pub count: Option<u32>,
    pub method: Option<String>,
    pub period: Option<Period>,
    /// Party → percentage, in column order.
    pub results: Vec<(String, Option<f64>)>,
    pub extra: BTreeMap<String, String>,
}

impl RawRecord {
    pub fn new(kind: RecordKind) -> Self {
        Self {
            kind,
            ..Self::default()
        }
    }

    pub fn apply(&mut self, fragment: Fragment) {
        match fragment {
            Fragment::Sample(sample) => {
                self.method = sample.method;
                self.count = sample.count;
                self.period = sample.period;
            }
            Fragment::Date(date) => self.date = date,
            Fragment::Institute { name, date } => {
                self.institute = Some(name);
                if date.is_some() {
                    self.date = date;
                }
            }
            Fragment::Client(client) => self.client = Some(client),
            Fragment::Results(results) => {
                for (party, percentage) in results {
                    self.set_result(party, percentage);
                }
            }
            Fragment::Text { label, value } => {
                self.extra.insert(label, value);
            }
        }
    }

    /// Later values for the same party replace earlier ones.
    pub fn set_result(&mut self, party: String, percentage: Option<f64>) {
        match self.results.iter_mut().find(|(p, _)| *p == party) {
            Some(entry) => entry.1 = percentage,
            None => self.results.push((party, percentage)),
        }
    }

    /// Turn the fieldwork period into absolute dates once the row's date is known.
    pub fn resolve_dates(&mut self) {
        let period = self.period.take();
        let Some(date) = self.date else {
            return;
        };
        match period {
            Some(Period::Days { start, end }) => {
                self.start = fix_dates_before(&start, date);
                self.end = end.and_then(|e| fix_dates_before(&e, date));
            }
            Some(Period::Week(week)) => {
                let range = week_to_range(week, date.year())
                    .filter(|(monday, _)| *monday <= date)
                    .or_else(|| week_to_range(week, date.year() - 1));
                if let Some((monday, sunday)) = range {
                    self.start = Some(monday);
                    self.end = Some(sunday);
                }
            }
            None => {}
        }
    }

    pub fn identity(&self, jurisdiction: &str) -> String {
        let who = match self.kind {
            RecordKind::Election => "election",
            RecordKind::Poll => self.institute.as_deref().unwrap_or_default(),
        };
        let date = self.date.map(|d| d.to_string()).unwrap_or_default();
        format!("{}|{}|{}|{}", jurisdiction, who, date, self.state)
    }

    /// One `FlatRecord` per party result, each an independent copy.
    pub fn flatten(self, jurisdiction: &str) -> impl Iterator<Item = FlatRecord> {
        let template = FlatRecord {
            jurisdiction: jurisdiction.to_string(),
            state: self.state,
            kind: self.kind,
            site_id: self.site_id,
            institute: self.institute,
            client: self.client,
            date: self.date,
            start: self.start,
            end: self.end,
            count: self.count,
            method: self.method,
            party: String::new(),
            percentage: None,
            extra: self.extra,
        };
        self.results.into_iter().map(move |(party, percentage)| FlatRecord {
            party,
            percentage,
            ..template.clone()
        })
    }
}

/// A single party result of a single poll or election.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlatRecord {
    pub jurisdiction: String,
    pub state: String,
    pub kind: RecordKind,
    pub site_id: String,
    pub institute: Option<String>,
    pub client: Option<String>,
    pub date: Option<NaiveDate>,
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
    pub count: Option<u32>,
    pub method: Option<String>,
    pub party: String,
    pub percentage: Option<f64>,
    /// Cells of unrecognised metadata columns, keyed by label.
    #[serde(flatten)]
    pub extra: BTreeMap<String, String>,
}

impl FlatRecord {
    pub const COLUMNS: [&'static str; 13] = [
        "jurisdiction",
        "state",
        "kind",
        "site_id",
        "institute",
        "client",
        "date",
        "start",
        "end",
        "count",
        "method",
        "party",
        "percentage",
    ];

    /// Text of a named column; `None` for unknown names, empty for null values.
    pub fn get(&self, column: &str) -> Option<String> {
        fn opt<T: ToString>(v: &Option<T>) -> String {
            v.as_ref().map(ToString::to_string).unwrap_or_default()
        }
        let value = match column {
            "jurisdiction" => self.jurisdiction.clone(),
            "state" => self.state.clone(),
            "kind" => self.kind.as_str().to_string(),
            "site_id" => self.site_id.clone(),
            "institute" => opt(&self.institute),
            "client" => opt(&self.client),
            "date" => opt(&self.date),
            "start" => opt(&self.start),
            "end" => opt(&self.end),
            "count" => opt(&self.count),
            "method" => opt(&self.method),
            "party" => self.party.clone(),
            "percentage" => opt(&self.percentage),
            other => return self.extra.get(other).cloned(),
        };
        Some(value)
    }
}
