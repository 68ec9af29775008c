// src/process/fields.rs
//
// Cell text → typed fragment. Nothing here fails: unreadable input becomes `None`.

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;

use super::date_parser::{parse_date, parse_short_or_long_date};
use crate::schema::{FieldKind, FieldParser, Mappings};

static SAMPLE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?x)
        ^(?P<kind>[TO])?
        \s*(?:•\s*)?
        (?:(?P<count>\d{1,3}(?:\.\d{3})+|\d+)(?:\s*•\s*|\s+))?
        (?:(?P<start>\d{1,2}\.\d{1,2}\.)\s*(?:[-–]\s*(?P<end>\d{1,2}\.\d{1,2}\.))?)?
        \s*(?:KW\s*(?P<week>\d+))?
        ",
    )
    .expect("sample regex should compile")
});

static PARTY_PERCENT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:(?P<party>[\w ]+\.?)\s+)?(?P<percent>[\d,]+)\s*%,?")
        .expect("party regex should compile")
});

static INSTITUTE_DATE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?P<name>[^(]+)\s+\(?(?P<date>\d+\.\d+\.\d+)\)?$")
        .expect("institute regex should compile")
});

static ANY_DATE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\d+\.\d+\.\d{4}").expect("date regex should compile"));

/// Fieldwork period of a poll, still relative to an unknown year.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Period {
    Days { start: String, end: Option<String> },
    Week(u32),
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Sample {
    /// `T` telephone, `O` online.
    pub method: Option<String>,
    pub count: Option<u32>,
    pub period: Option<Period>,
}

/// What a single cell contributes to its row.
#[derive(Debug, Clone, PartialEq)]
pub enum Fragment {
    Sample(Sample),
    Date(Option<NaiveDate>),
    Institute {
        name: String,
        date: Option<NaiveDate>,
    },
    Client(String),
    Results(Vec<(String, Option<f64>)>),
    Text {
        label: String,
        value: String,
    },
}

pub fn parse_sample(text: &str) -> Sample {
    let Some(caps) = SAMPLE_RE.captures(text) else {
        return Sample::default();
    };
    let count = caps
        .name("count")
        .and_then(|m| m.as_str().replace('.', "").parse().ok());
    let period = match (caps.name("start"), caps.name("week")) {
        (Some(start), _) => Some(Period::Days {
            start: start.as_str().to_string(),
            end: caps.name("end").map(|m| m.as_str().to_string()),
        }),
        (None, Some(week)) => week.as_str().parse().ok().map(Period::Week),
        (None, None) => None,
    };
    Sample {
        method: caps.name("kind").map(|m| m.as_str().to_string()),
        count,
        period,
    }
}

/// Splits `Name (dd.mm.yy[yy])`; a cell without a date is all name.
pub fn parse_institute(text: &str, mappings: &Mappings) -> (String, Option<NaiveDate>) {
    match INSTITUTE_DATE_RE.captures(text) {
        Some(caps) => (
            mappings.fix_institute(caps["name"].trim()),
            parse_short_or_long_date(&caps["date"]),
        ),
        None => (mappings.fix_institute(text.trim()), None),
    }
}

pub fn parse_election(text: &str) -> Option<NaiveDate> {
    ANY_DATE_RE.find(text).and_then(|m| parse_date(m.as_str()))
}

fn is_unknown(text: &str) -> bool {
    matches!(text.trim(), "" | "–" | "-" | "?")
}

/// `"32,5 %"` → `32.5`; dashes, `?` and blanks are unknown.
pub fn clean_percentage(text: &str) -> Option<f64> {
    if is_unknown(text) {
        return None;
    }
    text.replace(',', ".").replace('%', "").trim().parse().ok()
}

/// Every `(party?, percentage)` pair in a result cell. Pairs without a party
/// name belong to the column's own label.
pub fn parse_party(label: &str, text: &str, mappings: &Mappings) -> Vec<(String, Option<f64>)> {
    let results: Vec<_> = PARTY_PERCENT_RE
        .captures_iter(text)
        .map(|caps| {
            let party = caps.name("party").map_or(label, |m| m.as_str());
            (mappings.party_name(party), clean_percentage(&caps["percent"]))
        })
        .collect();
    if results.is_empty() && is_unknown(text) {
        return vec![(mappings.party_name(label), None)];
    }
    results
}

/// Run the parser a column was classified with. Spacer columns contribute nothing.
pub fn parse_field(kind: &FieldKind, text: &str, mappings: &Mappings) -> Option<Fragment> {
    let fragment = match kind {
        FieldKind::Spacer => return None,
        FieldKind::Party(label) => Fragment::Results(parse_party(label, text, mappings)),
        FieldKind::Meta(FieldParser::Sample) => Fragment::Sample(parse_sample(text)),
        FieldKind::Meta(FieldParser::Date) => Fragment::Date(parse_date(text)),
        FieldKind::Meta(FieldParser::Election) => Fragment::Date(parse_election(text)),
        FieldKind::Meta(FieldParser::Institute) => {
            let (name, date) = parse_institute(text, mappings);
            Fragment::Institute { name, date }
        }
        FieldKind::Meta(FieldParser::Client) => Fragment::Client(text.to_string()),
        FieldKind::Passthrough(label) => Fragment::Text {
            label: label.clone(),
            value: text.to_string(),
        },
    };
    Some(fragment)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn sample_with_everything() {
        let s = parse_sample("T • 1.002 05.03.–08.03.");
        assert_eq!(s.method.as_deref(), Some("T"));
        assert_eq!(s.count, Some(1002));
        assert_eq!(
            s.period,
            Some(Period::Days {
                start: "05.03.".into(),
                end: Some("08.03.".into())
            })
        );
    }

    #[test]
    fn sample_variants() {
        let s = parse_sample("O • 2.514 KW 12");
        assert_eq!(s.method.as_deref(), Some("O"));
        assert_eq!(s.count, Some(2514));
        assert_eq!(s.period, Some(Period::Week(12)));

        let s = parse_sample("05.03. - 08.03.");
        assert_eq!(s.count, None);
        assert_eq!(
            s.period,
            Some(Period::Days {
                start: "05.03.".into(),
                end: Some("08.03.".into())
            })
        );

        let s = parse_sample("1001 KW12");
        assert_eq!(s.count, Some(1001));
        assert_eq!(s.period, Some(Period::Week(12)));

        assert_eq!(parse_sample("?"), Sample::default());
    }

    #[test]
    fn institute_with_and_without_date() {
        let m = Mappings::default();
        assert_eq!(
            parse_institute("Forsa (03.04.2021)", &m),
            ("Forsa".to_string(), Some(ymd(2021, 4, 3)))
        );
        assert_eq!(
            parse_institute("Forschungs- gruppe Wahlen (03.04.21)", &m),
            ("Forschungsgruppe Wahlen".to_string(), Some(ymd(2021, 4, 3)))
        );
        assert_eq!(parse_institute("dimap", &m), ("Infratest dimap".to_string(), None));
    }

    #[test]
    fn election_date_anywhere_in_cell() {
        assert_eq!(parse_election("Landtagswahl 26.03.2017"), Some(ymd(2017, 3, 26)));
        assert_eq!(parse_election("Landtagswahl"), None);
    }

    #[test]
    fn percentages() {
        assert_eq!(clean_percentage("32,5%"), Some(32.5));
        assert_eq!(clean_percentage("28 %"), Some(28.0));
        assert_eq!(clean_percentage("–"), None);
        assert_eq!(clean_percentage("?"), None);
        assert_eq!(clean_percentage(""), None);
    }

    #[test]
    fn party_cells() {
        let m = Mappings::default();
        assert_eq!(parse_party("CDU", "28 %", &m), vec![("CDU".to_string(), Some(28.0))]);
        assert_eq!(parse_party("CDU", "–", &m), vec![("CDU".to_string(), None)]);
        assert_eq!(
            parse_party("Sonstige", "FW 4 % Sonst. 3,5 %", &m),
            vec![
                ("FW".to_string(), Some(4.0)),
                ("Sonstige".to_string(), Some(3.5)),
            ]
        );
        assert!(parse_party("CDU", "n/a", &m).is_empty());
    }

    #[test]
    fn dispatch_by_kind() {
        let m = Mappings::default();
        assert_eq!(parse_field(&FieldKind::Spacer, "x", &m), None);
        assert_eq!(
            parse_field(&FieldKind::Meta(FieldParser::Date), "01.02.2020", &m),
            Some(Fragment::Date(Some(ymd(2020, 2, 1))))
        );
        assert_eq!(
            parse_field(&FieldKind::Meta(FieldParser::Date), "Feb 2020", &m),
            Some(Fragment::Date(None))
        );
        assert_eq!(
            parse_field(&FieldKind::Passthrough("Bemerkung".into()), "neu", &m),
            Some(Fragment::Text {
                label: "Bemerkung".into(),
                value: "neu".into()
            })
        );
    }
}
