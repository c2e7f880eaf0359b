//! Content negotiation module
//!
//! Selects the representation of a resource based on the `Accept` header and
//! encodes it with one of the registered encoders.

use hyper::body::Bytes;
use serde_json::Value;

use crate::error::Error;
use crate::logger;
use crate::resource::{Representation, Resource};

/// Registered representation encoders
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoder {
    Json,
    Toml,
}

impl Encoder {
    /// Media type produced by this encoder
    pub const fn media_type(self) -> &'static str {
        match self {
            Self::Json => "application/json",
            Self::Toml => "application/toml",
        }
    }

    /// Encoder producing `media_type`, if any
    pub fn from_media_type(media_type: &str) -> Option<Self> {
        match media_type.trim().to_ascii_lowercase().as_str() {
            "application/json" => Some(Self::Json),
            "application/toml" => Some(Self::Toml),
            _ => None,
        }
    }

    fn encode(self, value: &Value) -> Result<Bytes, String> {
        match self {
            Self::Json => serde_json::to_vec(value)
                .map(Bytes::from)
                .map_err(|e| e.to_string()),
            // TOML documents must be tables, other values fail here
            Self::Toml => toml::to_string(value)
                .map(Bytes::from)
                .map_err(|e| e.to_string()),
        }
    }
}

/// One entry of an `Accept` header
#[derive(Debug, Clone, PartialEq)]
pub struct MediaRange {
    pub media_type: String,
    pub quality: f32,
}

impl MediaRange {
    /// How specifically this range matches `media_type`: 2 exact, 1 `type/*`, 0 `*/*`
    fn specificity(&self, media_type: &str) -> Option<u8> {
        if self.media_type == "*/*" {
            return Some(0);
        }
        if self.media_type.eq_ignore_ascii_case(media_type) {
            return Some(2);
        }
        let (top, sub) = self.media_type.split_once('/')?;
        let (want_top, _) = media_type.split_once('/')?;
        (sub == "*" && top.eq_ignore_ascii_case(want_top)).then_some(1)
    }
}

/// Parse an `Accept` header into media ranges
///
/// Parameters other than `q` are dropped; a missing or unparsable `q` is 1.
pub fn parse_accept(accept: &str) -> Vec<MediaRange> {
    accept
        .split(',')
        .filter_map(|entry| {
            let mut parts = entry.split(';');
            let media_type = parts.next()?.trim();
            if media_type.is_empty() {
                return None;
            }
            let quality = parts
                .filter_map(|p| p.trim().strip_prefix("q="))
                .find_map(|q| q.trim().parse::<f32>().ok())
                .map_or(1.0, |q| q.clamp(0.0, 1.0));
            Some(MediaRange {
                media_type: media_type.to_ascii_lowercase(),
                quality,
            })
        })
        .collect()
}

/// Quality the client assigns to `media_type`, from its most specific match
fn quality_of(ranges: &[MediaRange], media_type: &str) -> f32 {
    ranges
        .iter()
        .filter_map(|r| r.specificity(media_type).map(|s| (s, r.quality)))
        .max_by_key(|(s, _)| *s)
        .map_or(0.0, |(_, q)| q)
}

/// Marshaler collaborator: negotiates and encodes resource representations
#[derive(Debug, Clone)]
pub struct Negotiator {
    encoders: Vec<Encoder>,
}

impl Default for Negotiator {
    fn default() -> Self {
        Self::new(vec![Encoder::Json, Encoder::Toml])
    }
}

impl Negotiator {
    /// Offer `encoders`, in order of server preference
    pub fn new(encoders: Vec<Encoder>) -> Self {
        if encoders.is_empty() {
            return Self::default();
        }
        Self { encoders }
    }

    /// Build from configured media types, skipping those without an encoder
    pub fn from_media_types(media_types: &[String]) -> Self {
        let encoders = media_types
            .iter()
            .filter_map(|m| {
                let encoder = Encoder::from_media_type(m);
                if encoder.is_none() {
                    logger::log_warning(&format!("No encoder for media type '{m}', skipping"));
                }
                encoder
            })
            .collect();
        Self::new(encoders)
    }

    /// Media types this negotiator can produce
    pub fn alternatives(&self) -> Vec<&'static str> {
        self.encoders.iter().map(|e| e.media_type()).collect()
    }

    /// Pick the encoder for an `Accept` header
    ///
    /// Missing or empty `Accept` selects the first offered encoder; ties go to
    /// the server's order.
    pub fn select(&self, accept: Option<&str>) -> Option<Encoder> {
        let ranges = match accept.map(parse_accept) {
            Some(ranges) if !ranges.is_empty() => ranges,
            _ => return self.encoders.first().copied(),
        };

        let mut best: Option<(Encoder, f32)> = None;
        for encoder in &self.encoders {
            let q = quality_of(&ranges, encoder.media_type());
            if q > 0.0 && best.map_or(true, |(_, bq)| q > bq) {
                best = Some((*encoder, q));
            }
        }
        best.map(|(e, _)| e)
    }

    /// Produce the bytes and content type of `resource` for an `Accept` header
    pub fn marshal(
        &self,
        resource: &dyn Resource,
        accept: Option<&str>,
    ) -> Result<Representation, Error> {
        if let Some(marshaler) = resource.as_marshaler() {
            return marshaler.marshal(accept);
        }

        let Some(value) = resource.to_value() else {
            return Err(self.not_acceptable());
        };
        let encoder = self.select(accept).ok_or_else(|| self.not_acceptable())?;
        match encoder.encode(&value) {
            Ok(body) => Ok(Representation::new(encoder.media_type(), body)),
            Err(e) => {
                logger::log_warning(&format!(
                    "Failed to encode resource as {}: {e}",
                    encoder.media_type()
                ));
                Err(self.not_acceptable())
            }
        }
    }

    fn not_acceptable(&self) -> Error {
        Error::NotAcceptable {
            alternatives: self.alternatives().into_iter().map(String::from).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::fixtures::{at, Blob, Item};

    #[test]
    fn test_parse_accept() {
        let ranges = parse_accept("text/html, application/json;q=0.8, */*;q=0.1");
        assert_eq!(ranges.len(), 3);
        assert_eq!(ranges[1].media_type, "application/json");
        assert!((ranges[1].quality - 0.8).abs() < f32::EPSILON);
        assert!(parse_accept("").is_empty());
    }

    #[test]
    fn test_select_default() {
        let n = Negotiator::default();
        assert_eq!(n.select(None), Some(Encoder::Json));
        assert_eq!(n.select(Some("")), Some(Encoder::Json));
        assert_eq!(n.select(Some("*/*")), Some(Encoder::Json));
    }

    #[test]
    fn test_select_by_quality() {
        let n = Negotiator::default();
        assert_eq!(n.select(Some("application/toml")), Some(Encoder::Toml));
        assert_eq!(
            n.select(Some("application/json;q=0.5, application/toml")),
            Some(Encoder::Toml)
        );
        assert_eq!(n.select(Some("application/*")), Some(Encoder::Json));
        assert_eq!(
            n.select(Some("application/json;q=0, */*")),
            Some(Encoder::Toml)
        );
        assert_eq!(n.select(Some("text/html")), None);
    }

    #[test]
    fn test_from_media_types() {
        let n = Negotiator::from_media_types(&["application/toml".into(), "text/csv".into()]);
        assert_eq!(n.alternatives(), vec!["application/toml"]);
        let n = Negotiator::from_media_types(&[]);
        assert_eq!(n.alternatives(), vec!["application/json", "application/toml"]);
    }

    #[test]
    fn test_marshal_json() {
        let item = Item::new("\"v1\"", at(2024, 1, 1));
        let repr = Negotiator::default().marshal(&item, None).unwrap();
        assert_eq!(repr.content_type, "application/json");
        let value: Value = serde_json::from_slice(&repr.body).unwrap();
        assert_eq!(value, item.value);
    }

    #[test]
    fn test_marshal_toml() {
        let item = Item::new("\"v1\"", at(2024, 1, 1));
        let repr = Negotiator::default()
            .marshal(&item, Some("application/toml"))
            .unwrap();
        assert_eq!(repr.content_type, "application/toml");
        assert!(std::str::from_utf8(&repr.body).unwrap().contains("name = "));
    }

    #[test]
    fn test_marshal_not_acceptable() {
        let item = Item::new("\"v1\"", at(2024, 1, 1));
        let err = Negotiator::default()
            .marshal(&item, Some("text/html"))
            .unwrap_err();
        assert_eq!(err.status(), 406);
    }

    #[test]
    fn test_resource_marshaler_wins() {
        let blob = Blob::new("\"b1\"", at(2024, 1, 1), b"raw bytes");
        let repr = Negotiator::default()
            .marshal(&blob, Some("application/json"))
            .unwrap();
        assert_eq!(repr.content_type, "text/plain");
        assert_eq!(&repr.body[..], b"raw bytes");
    }
}
