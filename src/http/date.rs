//! HTTP date module
//!
//! Fixed RFC 1123 date grammar, always GMT, second precision.

use chrono::{DateTime, NaiveDateTime, SubsecRound, Utc};

const RFC1123: &str = "%a, %d %b %Y %H:%M:%S GMT";

/// Format a timestamp as an HTTP date, e.g. `Mon, 01 Jan 2024 00:00:00 GMT`
pub fn format_http_date(time: DateTime<Utc>) -> String {
    time.format(RFC1123).to_string()
}

/// Parse an HTTP date header value, `None` if it does not follow the grammar
pub fn parse_http_date(value: &str) -> Option<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(value.trim(), RFC1123)
        .ok()
        .map(|naive| naive.and_utc())
}

/// Drop sub-second precision so timestamps compare the way they travel on the wire
#[inline]
pub fn to_http_precision(time: DateTime<Utc>) -> DateTime<Utc> {
    time.trunc_subsecs(0)
}
