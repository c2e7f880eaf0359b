//! HTTP Range request module
//!
//! Range header handling for partial responses, compliant with RFC 7233
//! single-range requests in any unit a [`Ranger`] declares.
//!
//! Negotiation is deliberately asymmetric: a malformed header (bad syntax,
//! unknown unit, inverted span, multi-range) is ignored and the full resource
//! is served, while a well-formed range that cannot be satisfied is an error.

use std::fmt;

use super::conditional::if_range_satisfied;
use crate::error::Error;
use crate::resource::{Ranger, Resource};

/// Span requested by the `Range` header, before it is resolved against a size
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeSpec {
    /// `from-to`, both inclusive
    FromTo(u64, u64),
    /// `from-`, until the end
    From(u64),
    /// `-n`, the last n units
    Suffix(u64),
}

/// Parsed `Range` header
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RangeHeader {
    pub unit: String,
    pub spec: RangeSpec,
}

/// Concrete, in-bounds span handed to [`Ranger::range`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RangeRequest {
    pub unit: String,
    /// First unit, inclusive
    pub from: u64,
    /// Last unit, inclusive
    pub to: u64,
}

impl RangeRequest {
    /// Number of units covered
    #[inline]
    pub const fn len(&self) -> u64 {
        self.to - self.from + 1
    }

    #[inline]
    pub const fn is_empty(&self) -> bool {
        false
    }
}

/// Span actually returned, formatted as the `Content-Range` header
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentRange {
    pub unit: String,
    pub from: u64,
    pub to: u64,
    /// Total addressable size, `None` when the resource cannot report it
    pub total: Option<u64>,
}

impl ContentRange {
    /// Content range covering exactly `range` out of `total` units
    pub fn new(range: &RangeRequest, total: u64) -> Self {
        Self {
            unit: range.unit.clone(),
            from: range.from,
            to: range.to,
            total: Some(total),
        }
    }

    /// Content range for a resource of unknown size
    pub fn unknown_total(range: &RangeRequest) -> Self {
        Self {
            unit: range.unit.clone(),
            from: range.from,
            to: range.to,
            total: None,
        }
    }

    /// True when the span is the entire resource, i.e. the response is not partial
    pub fn is_complete(&self) -> bool {
        self.from == 0 && self.total.is_some_and(|total| total > 0 && self.to == total - 1)
    }
}

impl fmt::Display for ContentRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.total {
            Some(total) => write!(f, "{} {}-{}/{}", self.unit, self.from, self.to, total),
            None => write!(f, "{} {}-{}/*", self.unit, self.from, self.to),
        }
    }
}

/// Why a `Range` header was ignored
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RangeIgnored {
    Malformed,
    UnsupportedUnit,
    InvertedSpan,
}

/// Parse a `Range` header value (single range only)
///
/// Supported formats:
/// - `unit=start-end` - Specific range
/// - `unit=start-` - From start to end
/// - `unit=-suffix` - Last suffix units
///
/// # Examples
/// ```
/// use yarest::http::range::{parse_range_header, RangeSpec};
///
/// let rg = parse_range_header("bytes=0-99").unwrap();
/// assert_eq!(rg.unit, "bytes");
/// assert_eq!(rg.spec, RangeSpec::FromTo(0, 99));
///
/// assert!(parse_range_header("bytes=0-9,20-29").is_err());
/// ```
pub fn parse_range_header(header: &str) -> Result<RangeHeader, RangeIgnored> {
    let (unit, set) = header.trim().split_once('=').ok_or(RangeIgnored::Malformed)?;
    let unit = unit.trim();
    if unit.is_empty() || unit.contains(char::is_whitespace) {
        return Err(RangeIgnored::Malformed);
    }

    // Only support single range (not multi-range)
    if set.contains(',') {
        return Err(RangeIgnored::Malformed);
    }

    let (start_str, end_str) = set.split_once('-').ok_or(RangeIgnored::Malformed)?;
    let (start_str, end_str) = (start_str.trim(), end_str.trim());

    let spec = match (start_str.is_empty(), end_str.is_empty()) {
        (true, true) => return Err(RangeIgnored::Malformed),
        // Suffix range: "-500" means last 500 units
        (true, false) => RangeSpec::Suffix(parse_position(end_str)?),
        (false, true) => RangeSpec::From(parse_position(start_str)?),
        (false, false) => RangeSpec::FromTo(parse_position(start_str)?, parse_position(end_str)?),
    };

    Ok(RangeHeader {
        unit: unit.to_string(),
        spec,
    })
}

fn parse_position(s: &str) -> Result<u64, RangeIgnored> {
    // u64::from_str accepts a leading '+', the grammar does not
    if !s.bytes().all(|b| b.is_ascii_digit()) {
        return Err(RangeIgnored::Malformed);
    }
    s.parse().map_err(|_| RangeIgnored::Malformed)
}

impl RangeHeader {
    /// Check the range against the units a ranger declares
    ///
    /// Failures here are not errors for the client, the header is ignored.
    pub fn validate(&self, ranger: &dyn Ranger) -> Result<(), RangeIgnored> {
        if !ranger
            .units()
            .iter()
            .any(|u| u.eq_ignore_ascii_case(&self.unit))
        {
            return Err(RangeIgnored::UnsupportedUnit);
        }
        if let RangeSpec::FromTo(from, to) = self.spec {
            if from > to {
                return Err(RangeIgnored::InvertedSpan);
            }
        }
        Ok(())
    }

    /// Resolve open-ended and suffix forms against `count` available units
    ///
    /// Ends past the last unit are clamped. A start at or beyond `count`, a
    /// zero-length suffix or an empty resource cannot be satisfied.
    pub fn adjust(&self, count: u64) -> Result<RangeRequest, Error> {
        let unsatisfiable = || Error::RangeNotSatisfiable {
            unit: self.unit.clone(),
            count,
        };
        if count == 0 {
            return Err(unsatisfiable());
        }
        let last = count - 1;

        let (from, to) = match self.spec {
            RangeSpec::FromTo(from, to) => (from, to.min(last)),
            RangeSpec::From(from) => (from, last),
            RangeSpec::Suffix(0) => return Err(unsatisfiable()),
            // Suffix larger than the resource is valid, it covers all of it
            RangeSpec::Suffix(n) => (count.saturating_sub(n), last),
        };
        if from > last {
            return Err(unsatisfiable());
        }

        Ok(RangeRequest {
            unit: self.unit.clone(),
            from,
            to,
        })
    }
}

/// Range negotiation result
#[derive(Debug)]
pub enum RangeOutcome {
    /// Serve a partial response for this span
    Partial(RangeRequest),
    /// Ignore the `Range` header and serve the full resource
    Full,
    /// The range cannot be satisfied
    Unsatisfiable(Error),
}

/// Negotiate a `Range` header against a ranged resource
///
/// `if_range` is the raw `If-Range` header, if any; when its precondition
/// fails the range is ignored.
pub fn negotiate_range(
    range_header: &str,
    if_range: Option<&str>,
    resource: &dyn Resource,
    ranger: &dyn Ranger,
) -> RangeOutcome {
    let Ok(header) = parse_range_header(range_header) else {
        return RangeOutcome::Full;
    };
    if header.validate(ranger).is_err() {
        return RangeOutcome::Full;
    }

    if let Some(raw) = if_range.filter(|v| !v.is_empty()) {
        if !if_range_satisfied(resource, raw) {
            return RangeOutcome::Full;
        }
    }

    match header.adjust(ranger.count()) {
        Ok(range) => RangeOutcome::Partial(range),
        Err(e) => RangeOutcome::Unsatisfiable(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::fixtures::{at, Blob};

    fn blob() -> Blob {
        Blob::new("\"b1\"", at(2024, 1, 1), b"0123456789")
    }

    fn header(unit: &str, spec: RangeSpec) -> RangeHeader {
        RangeHeader {
            unit: unit.to_string(),
            spec,
        }
    }

    #[test]
    fn test_standard_range() {
        let rg = parse_range_header("bytes=0-9").unwrap();
        assert_eq!(rg, header("bytes", RangeSpec::FromTo(0, 9)));
    }

    #[test]
    fn test_open_and_suffix_range() {
        assert_eq!(parse_range_header("bytes=50-").unwrap().spec, RangeSpec::From(50));
        assert_eq!(parse_range_header("bytes=-20").unwrap().spec, RangeSpec::Suffix(20));
    }

    #[test]
    fn test_custom_unit() {
        let rg = parse_range_header("items=2-4").unwrap();
        assert_eq!(rg.unit, "items");
    }

    #[test]
    fn test_invalid_format() {
        for raw in [
            "bytes=a-b",
            "bytes=0-9,20-29",
            "bytes=-",
            "bytes 0-9",
            "=0-9",
            "bytes=+1-2",
            "bytes=1",
        ] {
            assert_eq!(parse_range_header(raw), Err(RangeIgnored::Malformed), "{raw}");
        }
    }

    #[test]
    fn test_validate() {
        let b = blob();
        assert!(header("bytes", RangeSpec::FromTo(0, 4)).validate(&b).is_ok());
        assert_eq!(
            header("items", RangeSpec::FromTo(0, 4)).validate(&b),
            Err(RangeIgnored::UnsupportedUnit)
        );
        assert_eq!(
            header("bytes", RangeSpec::FromTo(5, 4)).validate(&b),
            Err(RangeIgnored::InvertedSpan)
        );
    }

    #[test]
    fn test_adjust() {
        let adjust = |spec| header("bytes", spec).adjust(10).map(|r| (r.from, r.to));
        assert_eq!(adjust(RangeSpec::FromTo(0, 4)), Ok((0, 4)));
        assert_eq!(adjust(RangeSpec::FromTo(5, 500)), Ok((5, 9)));
        assert_eq!(adjust(RangeSpec::From(7)), Ok((7, 9)));
        assert_eq!(adjust(RangeSpec::Suffix(3)), Ok((7, 9)));
        assert_eq!(adjust(RangeSpec::Suffix(30)), Ok((0, 9)));
    }

    #[test]
    fn test_adjust_not_satisfiable() {
        let unsatisfiable = Err(Error::RangeNotSatisfiable {
            unit: "bytes".to_string(),
            count: 10,
        });
        assert_eq!(header("bytes", RangeSpec::From(10)).adjust(10), unsatisfiable);
        assert_eq!(header("bytes", RangeSpec::FromTo(20, 30)).adjust(10), unsatisfiable);
        assert_eq!(header("bytes", RangeSpec::Suffix(0)).adjust(10), unsatisfiable);
        assert!(header("bytes", RangeSpec::From(0)).adjust(0).is_err());
    }

    #[test]
    fn test_adjusted_span_in_bounds() {
        for count in 1..20u64 {
            for spec in [
                RangeSpec::FromTo(0, count + 3),
                RangeSpec::From(count - 1),
                RangeSpec::Suffix(count / 2 + 1),
            ] {
                let r = header("bytes", spec).adjust(count).unwrap();
                assert!(r.from <= r.to && r.to < count, "{spec:?} on {count}");
            }
        }
    }

    #[test]
    fn test_content_range_format() {
        let rg = RangeRequest {
            unit: "bytes".into(),
            from: 0,
            to: 4,
        };
        assert_eq!(ContentRange::new(&rg, 10).to_string(), "bytes 0-4/10");
        assert_eq!(ContentRange::unknown_total(&rg).to_string(), "bytes 0-4/*");
        assert_eq!(rg.len(), 5);
    }

    #[test]
    fn test_content_range_complete() {
        let whole = RangeRequest {
            unit: "bytes".into(),
            from: 0,
            to: 9,
        };
        assert!(ContentRange::new(&whole, 10).is_complete());
        assert!(!ContentRange::new(&whole, 11).is_complete());
        assert!(!ContentRange::unknown_total(&whole).is_complete());
    }

    #[test]
    fn test_negotiate_partial() {
        let b = blob();
        match negotiate_range("bytes=0-4", None, &b, &b) {
            RangeOutcome::Partial(r) => assert_eq!((r.from, r.to), (0, 4)),
            other => panic!("Expected Partial, got {other:?}"),
        }
    }

    #[test]
    fn test_negotiate_malformed_falls_back() {
        let b = blob();
        assert!(matches!(negotiate_range("bytes=x-", None, &b, &b), RangeOutcome::Full));
        assert!(matches!(negotiate_range("pages=0-1", None, &b, &b), RangeOutcome::Full));
        assert!(matches!(negotiate_range("bytes=6-2", None, &b, &b), RangeOutcome::Full));
    }

    #[test]
    fn test_negotiate_unsatisfiable_is_error() {
        let b = blob();
        assert!(matches!(
            negotiate_range("bytes=10-", None, &b, &b),
            RangeOutcome::Unsatisfiable(Error::RangeNotSatisfiable { count: 10, .. })
        ));
    }

    #[test]
    fn test_negotiate_if_range() {
        let b = blob();
        assert!(matches!(
            negotiate_range("bytes=0-4", Some("\"b1\""), &b, &b),
            RangeOutcome::Partial(_)
        ));
        assert!(matches!(
            negotiate_range("bytes=0-4", Some("Mon, 01 Jan 2024 00:00:00 GMT"), &b, &b),
            RangeOutcome::Partial(_)
        ));
        assert!(matches!(
            negotiate_range("bytes=0-4", Some("\"b0\""), &b, &b),
            RangeOutcome::Full
        ));
        assert!(matches!(
            negotiate_range("bytes=0-4", Some("Tue, 02 Jan 2024 00:00:00 GMT"), &b, &b),
            RangeOutcome::Full
        ));
    }
}
