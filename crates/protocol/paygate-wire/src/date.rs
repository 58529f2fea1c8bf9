//! Date-time normalization for canonicalization.
//!
//! The gateway serializes date values as ISO-8601 strings and re-reads any
//! string of that shape as a date before signing. Both sides therefore rewrite
//! date-looking strings into a single representation:
//!
//! ```text
//! yyyy-MM-ddTHH:mm:ss[.FFFFFFF](±HH:mm | Z)
//! ```
//!
//! Fraction digits are trimmed of trailing zeros (up to 7, i.e. 100ns ticks).
//! The zone suffix depends on [`DateNormalization`].

use std::fmt::Display;

use chrono::{DateTime, FixedOffset, Local, NaiveDateTime, TimeZone, Timelike, Utc};
use serde::{Deserialize, Serialize};

/// How date-time strings are normalized before signing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DateNormalization {
    /// Convert to the local time zone of this process (gateway compatible).
    ///
    /// Values without a zone are taken to already be local. Signer and
    /// verifier must agree on the local zone for signatures to match.
    #[default]
    Local,
    /// Convert to UTC. Values without a zone are taken to be UTC.
    Utc,
}

/// A date-time string as parsed, before zone conversion.
#[derive(Debug, Clone, Copy, PartialEq)]
enum ParsedDate {
    /// No zone designator.
    Unspecified(NaiveDateTime),
    /// `Z` or an explicit `±HH:mm` offset.
    Zoned(DateTime<FixedOffset>),
}

/// Rewrite `value` if it is a date-time string; `None` leaves it untouched.
///
/// Under [`DateNormalization::Local`], a zone-less value whose wall time does
/// not exist locally (skipped by a DST change) is also left untouched.
pub fn normalize_date_string(value: &str, policy: DateNormalization) -> Option<String> {
    let parsed = parse_date(value)?;
    let normalized = match policy {
        DateNormalization::Local => format_with_offset(&in_zone(parsed, &Local)?),
        DateNormalization::Utc => format_iso(&in_zone(parsed, &Utc)?, "Z"),
    };
    Some(normalized)
}

/// Place `parsed` in `tz`. Zone-less values are wall times in `tz`; an
/// ambiguous wall time takes the earlier instant and a skipped one has none.
fn in_zone<Tz: TimeZone>(parsed: ParsedDate, tz: &Tz) -> Option<DateTime<Tz>> {
    match parsed {
        ParsedDate::Unspecified(naive) => tz.from_local_datetime(&naive).earliest(),
        ParsedDate::Zoned(zoned) => Some(zoned.with_timezone(tz)),
    }
}

fn format_with_offset<Tz>(dt: &DateTime<Tz>) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    let offset = dt.format("%:z").to_string();
    format_iso(dt, &offset)
}

fn parse_date(value: &str) -> Option<ParsedDate> {
    let bytes = value.as_bytes();
    if bytes.len() < 19 || !value.is_ascii() {
        return None;
    }
    let shaped = bytes[..19].iter().enumerate().all(|(i, b)| match i {
        4 | 7 => *b == b'-',
        10 => *b == b'T',
        13 | 16 => *b == b':',
        _ => b.is_ascii_digit(),
    });
    if !shaped {
        return None;
    }

    let naive = NaiveDateTime::parse_from_str(&value[..19], "%Y-%m-%dT%H:%M:%S").ok()?;

    let rest = &value[19..];
    let (fraction, zone) = match rest.strip_prefix('.') {
        Some(tail) => {
            let digits = tail.bytes().take_while(u8::is_ascii_digit).count();
            if digits == 0 || digits > 7 {
                return None;
            }
            (&tail[..digits], &tail[digits..])
        }
        None => ("", rest),
    };

    let nanos = if fraction.is_empty() {
        0
    } else {
        format!("{:0<9}", fraction).parse::<u32>().ok()?
    };
    let naive = naive.with_nanosecond(nanos)?;

    match zone {
        "" => Some(ParsedDate::Unspecified(naive)),
        "Z" => Some(ParsedDate::Zoned(
            Utc.from_utc_datetime(&naive).with_timezone(&FixedOffset::east_opt(0)?),
        )),
        _ => {
            let offset = parse_offset(zone)?;
            let zoned = offset.from_local_datetime(&naive).single()?;
            Some(ParsedDate::Zoned(zoned))
        }
    }
}

/// Parse `±HH:mm`.
fn parse_offset(zone: &str) -> Option<FixedOffset> {
    let bytes = zone.as_bytes();
    if bytes.len() != 6 || bytes[3] != b':' {
        return None;
    }
    let sign = match bytes[0] {
        b'+' => 1,
        b'-' => -1,
        _ => return None,
    };
    let hours: i32 = zone[1..3].parse().ok()?;
    let minutes: i32 = zone[4..6].parse().ok()?;
    if hours > 14 || minutes > 59 {
        return None;
    }
    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
}

fn format_iso<Tz>(dt: &DateTime<Tz>, zone: &str) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    let mut out = dt.format("%Y-%m-%dT%H:%M:%S").to_string();
    let ticks = (dt.nanosecond() % 1_000_000_000) / 100;
    if ticks > 0 {
        let fraction = format!("{:07}", ticks);
        out.push('.');
        out.push_str(fraction.trim_end_matches('0'));
    }
    out.push_str(zone);
    out
}
