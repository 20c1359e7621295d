//! Defines the ordering used for dated collections such as the blog's
//! `posts`. See [`by_date`] for the exact policy.

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use std::cmp::Ordering;

/// Something that may carry a `date` attribute. The date is kept as the raw
/// string from the source so that documents whose date fails to parse can
/// still be ordered (see [`by_date`]).
pub trait Dated {
    fn date(&self) -> Option<&str>;
}

/// Orders two possibly-missing documents by their `date` attribute, oldest
/// first. The absent document and the absent date are distinct cases and
/// tie-break in opposite directions:
///
/// 1. a missing document sorts *before* a present one;
/// 2. among present documents, one without a date sorts *after* one with a
///    date (it is treated as the least recent);
/// 3. otherwise both dates are parsed into numeric timestamps (see
///    [`parse_timestamp`]) and compared.
///
/// A date that fails to parse is treated as absent so the ordering remains
/// total. Callers that want newest-first presentation reverse the result.
pub fn by_date<D: Dated + ?Sized>(a: Option<&D>, b: Option<&D>) -> Ordering {
    let (a, b) = match (a, b) {
        (None, None) => return Ordering::Equal,
        (None, Some(_)) => return Ordering::Less,
        (Some(_), None) => return Ordering::Greater,
        (Some(a), Some(b)) => (a, b),
    };

    match (timestamp(a), timestamp(b)) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Greater,
        (Some(_), None) => Ordering::Less,
        (Some(a), Some(b)) => a.cmp(&b),
    }
}

fn timestamp<D: Dated + ?Sized>(d: &D) -> Option<i64> {
    d.date().and_then(parse_timestamp)
}

/// Parses a date string into milliseconds since the Unix epoch. Accepts
/// RFC 3339 (`2021-06-01T12:00:00+02:00`), YAML timestamps with a space
/// separated offset (`2014-01-12 10:00:00 -0800`), RFC 2822
/// (`Tue, 01 Jun 2021 10:00:00 +0000`), naive date-times
/// (`2021-06-01T12:00:00`, `2021-06-01 12:00:00`, with optional fractional
/// seconds) and bare dates (`2021-06-01`). Naive values are read as UTC.
pub fn parse_timestamp(input: &str) -> Option<i64> {
    // `%#z` also accepts an offset without minutes, such as `-05`.
    const OFFSET_FORMATS: &[&str] = &[
        "%Y-%m-%d %H:%M:%S%.f %#z",
        "%Y-%m-%d %H:%M:%S%.f%#z",
        "%Y-%m-%dT%H:%M:%S%.f %#z",
        "%Y-%m-%dT%H:%M:%S%.f%#z",
        "%Y-%m-%d %H:%M:%S %z",
        "%Y-%m-%d %H:%M:%S %:z",
        "%Y-%m-%d %H:%M:%S%.f %:z",
    ];
    const NAIVE_FORMATS: &[&str] = &[
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H:%M",
    ];

    let input = input.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(input) {
        return Some(dt.timestamp_millis());
    }
    for format in OFFSET_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(input, format) {
            return Some(dt.timestamp_millis());
        }
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(input) {
        return Some(dt.timestamp_millis());
    }
    for format in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(input, format) {
            return Some(Utc.from_utc_datetime(&naive).timestamp_millis());
        }
    }
    NaiveDate::parse_from_str(input, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| Utc.from_utc_datetime(&naive).timestamp_millis())
}
