//! `If-Modified-Since` value normalization.
//!
//! Callers hand over a last-modified value in whatever shape they have it:
//! the raw header string stored in a sidecar, epoch seconds, or a calendar
//! time with or without a zone. [`normalize_last_modified`] turns every
//! variant into the single HTTP-date rendering the server compares against.

use chrono::{DateTime, FixedOffset, Local, NaiveDateTime, Utc};
use std::time::SystemTime;

/// IMF-fixdate, the preferred HTTP-date format (RFC 9110 §5.6.7).
pub const HTTP_DATE_FORMAT: &str = "%a, %d %b %Y %H:%M:%S GMT";

/// Obsolete HTTP-date forms servers may still send.
const RFC850_FORMAT: &str = "%A, %d-%b-%y %H:%M:%S GMT";
const ASCTIME_FORMAT: &str = "%a %b %e %H:%M:%S %Y";

/// A last-modified value in any of the accepted representations.
#[derive(Debug, Clone, PartialEq)]
pub enum LastModified {
    /// A header value as received from (or stored for) the server.
    Http(String),
    /// Whole seconds since the Unix epoch.
    EpochSeconds(i64),
    /// Seconds since the Unix epoch; the fraction is dropped.
    EpochSecondsF64(f64),
    /// A calendar time without a zone, taken to be UTC.
    Naive(NaiveDateTime),
    /// A calendar time with a known offset.
    Aware(DateTime<FixedOffset>),
}

impl From<&str> for LastModified {
    fn from(value: &str) -> Self {
        LastModified::Http(value.to_string())
    }
}

impl From<String> for LastModified {
    fn from(value: String) -> Self {
        LastModified::Http(value)
    }
}

impl From<i64> for LastModified {
    fn from(value: i64) -> Self {
        LastModified::EpochSeconds(value)
    }
}

impl From<f64> for LastModified {
    fn from(value: f64) -> Self {
        LastModified::EpochSecondsF64(value)
    }
}

impl From<NaiveDateTime> for LastModified {
    fn from(value: NaiveDateTime) -> Self {
        LastModified::Naive(value)
    }
}

impl From<DateTime<FixedOffset>> for LastModified {
    fn from(value: DateTime<FixedOffset>) -> Self {
        LastModified::Aware(value)
    }
}

impl From<DateTime<Utc>> for LastModified {
    fn from(value: DateTime<Utc>) -> Self {
        LastModified::Aware(value.fixed_offset())
    }
}

impl From<DateTime<Local>> for LastModified {
    fn from(value: DateTime<Local>) -> Self {
        LastModified::Aware(value.fixed_offset())
    }
}

impl From<SystemTime> for LastModified {
    fn from(value: SystemTime) -> Self {
        DateTime::<Utc>::from(value).into()
    }
}

/// Render `value` as an HTTP-date in UTC.
///
/// Returns `None` when the precondition should be omitted: empty strings,
/// non-finite floats, and instants outside the representable range.
/// Strings that are not recognisable HTTP-dates are passed through trimmed
/// but otherwise verbatim.
pub fn normalize_last_modified(value: &LastModified) -> Option<String> {
    let instant = match value {
        LastModified::Http(raw) => {
            let raw = raw.trim();
            if raw.is_empty() {
                return None;
            }
            match parse_http_date(raw) {
                Some(instant) => instant,
                None => {
                    log::debug!("Passing unrecognised Last-Modified value through: {raw:?}");
                    return Some(raw.to_string());
                }
            }
        }
        LastModified::EpochSeconds(secs) => DateTime::<Utc>::from_timestamp(*secs, 0)?,
        LastModified::EpochSecondsF64(secs) => {
            if !secs.is_finite() || *secs < i64::MIN as f64 || *secs >= i64::MAX as f64 {
                return None;
            }
            DateTime::<Utc>::from_timestamp(secs.floor() as i64, 0)?
        }
        LastModified::Naive(naive) => naive.and_utc(),
        LastModified::Aware(aware) => aware.with_timezone(&Utc),
    };

    Some(format_http_date(&instant))
}

/// Format an instant as IMF-fixdate.
pub fn format_http_date(instant: &DateTime<Utc>) -> String {
    instant.format(HTTP_DATE_FORMAT).to_string()
}

/// Parse any of the HTTP-date forms, plus RFC 2822 dates with numeric offsets.
pub fn parse_http_date(raw: &str) -> Option<DateTime<Utc>> {
    [HTTP_DATE_FORMAT, RFC850_FORMAT, ASCTIME_FORMAT]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
        .map(|naive| naive.and_utc())
        .or_else(|| {
            DateTime::parse_from_rfc2822(raw)
                .ok()
                .map(|aware| aware.with_timezone(&Utc))
        })
}
