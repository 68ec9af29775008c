// src/process/date_parser.rs
use chrono::{Datelike, Duration, NaiveDate, Weekday};
use once_cell::sync::Lazy;
use regex::Regex;

static DOTTED_DATE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\d{1,2})\.(\d{1,2})\.(\d{4}|\d{2})$").expect("dotted date regex should compile")
});

static PARTIAL_DATE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{1,2})\.(\d{1,2})\.$").expect("partial date regex should compile"));

/// Strict `dd.mm.yyyy`; anything else is `None`.
pub fn parse_date(text: &str) -> Option<NaiveDate> {
    let caps = DOTTED_DATE_RE.captures(text.trim())?;
    if caps[3].len() != 4 {
        return None;
    }
    NaiveDate::from_ymd_opt(caps[3].parse().ok()?, caps[2].parse().ok()?, caps[1].parse().ok()?)
}

/// `dd.mm.yy` or `dd.mm.yyyy`; two-digit years are taken as 20yy.
pub fn parse_short_or_long_date(text: &str) -> Option<NaiveDate> {
    let caps = DOTTED_DATE_RE.captures(text.trim())?;
    let mut year: i32 = caps[3].parse().ok()?;
    if caps[3].len() == 2 {
        year += 2000;
    }
    NaiveDate::from_ymd_opt(year, caps[2].parse().ok()?, caps[1].parse().ok()?)
}

/// Resolve a `dd.mm.` fragment against `year`.
pub fn fix_dates(partial: &str, year: i32) -> Option<NaiveDate> {
    let caps = PARTIAL_DATE_RE.captures(partial.trim())?;
    NaiveDate::from_ymd_opt(year, caps[2].parse().ok()?, caps[1].parse().ok()?)
}

/// Resolve a `dd.mm.` fragment so that it does not fall after `published`.
/// Fieldwork that started in December of the previous year lands there.
pub fn fix_dates_before(partial: &str, published: NaiveDate) -> Option<NaiveDate> {
    let date = fix_dates(partial, published.year())?;
    if date > published {
        fix_dates(partial, published.year() - 1)
    } else {
        Some(date)
    }
}

/// Thursday of ISO week 1, i.e. the first Thursday of `year`.
pub fn first_thursday(year: i32) -> Option<NaiveDate> {
    let jan1 = NaiveDate::from_ymd_opt(year, 1, 1)?;
    let ahead = (7 + Weekday::Thu.num_days_from_monday() - jan1.weekday().num_days_from_monday()) % 7;
    Some(jan1 + Duration::days(i64::from(ahead)))
}

/// Monday and Sunday of ISO calendar week `week` of `year`.
///
/// Week 53 of a year with 52 weeks continues into the next year's week 1.
pub fn week_to_range(week: u32, year: i32) -> Option<(NaiveDate, NaiveDate)> {
    if !(1..=53).contains(&week) {
        return None;
    }
    let thursday = first_thursday(year)? + Duration::weeks(i64::from(week) - 1);
    Some((thursday - Duration::days(3), thursday + Duration::days(3)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn full_dates() {
        assert_eq!(parse_date("05.03.2021"), Some(ymd(2021, 3, 5)));
        assert_eq!(parse_date(" 5.3.2021 "), Some(ymd(2021, 3, 5)));
        assert_eq!(parse_date("05.03.21"), None);
        assert_eq!(parse_date("31.02.2021"), None);
        assert_eq!(parse_date("Bundestagswahl"), None);
        assert_eq!(parse_short_or_long_date("03.04.21"), Some(ymd(2021, 4, 3)));
        assert_eq!(parse_short_or_long_date("03.04.2021"), Some(ymd(2021, 4, 3)));
    }

    #[test]
    fn partial_dates() {
        assert_eq!(fix_dates("05.03.", 2021), Some(ymd(2021, 3, 5)));
        assert_eq!(fix_dates("29.02.", 2021), None);
        assert_eq!(fix_dates("05.03", 2021), None);
        assert_eq!(fix_dates_before("28.12.", ymd(2022, 1, 4)), Some(ymd(2021, 12, 28)));
        assert_eq!(fix_dates_before("02.01.", ymd(2022, 1, 4)), Some(ymd(2022, 1, 2)));
    }

    #[test]
    fn week_matches_iso_numbering() {
        for year in 1990..=2040 {
            for week in 1..=53u32 {
                let Some(monday) = NaiveDate::from_isoywd_opt(year, week, Weekday::Mon) else {
                    continue;
                };
                let (start, end) = week_to_range(week, year).unwrap();
                assert_eq!(start, monday, "week {} of {}", week, year);
                assert_eq!(start.weekday(), Weekday::Mon);
                assert_eq!(end.weekday(), Weekday::Sun);
                assert_eq!(end - start, Duration::days(6));
            }
        }
    }

    #[test]
    fn consecutive_weeks_are_contiguous() {
        for year in 1990..=2040 {
            for week in 1..53u32 {
                let (_, end) = week_to_range(week, year).unwrap();
                let (next_start, _) = week_to_range(week + 1, year).unwrap();
                assert_eq!(end + Duration::days(1), next_start);
            }
        }
    }

    #[test]
    fn week_one_may_start_in_december() {
        // 1 January 2015 is a Thursday
        assert_eq!(week_to_range(1, 2015), Some((ymd(2014, 12, 29), ymd(2015, 1, 4))));
        // 2021 starts on a Friday, so week 1 begins on 4 January
        assert_eq!(week_to_range(1, 2021), Some((ymd(2021, 1, 4), ymd(2021, 1, 10))));
        // 2020 has 53 weeks, the last one running into January
        assert_eq!(week_to_range(53, 2020), Some((ymd(2020, 12, 28), ymd(2021, 1, 3))));
    }

    #[test]
    fn out_of_range_weeks() {
        assert_eq!(week_to_range(0, 2021), None);
        assert_eq!(week_to_range(54, 2021), None);
    }
}
