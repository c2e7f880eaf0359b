//! Response compression module
//!
//! Chooses a content coding from `Accept-Encoding` and applies it. gzip is
//! preferred over deflate; both use flate2 at its default level.

use std::io::Write;

use flate2::write::{DeflateEncoder, GzEncoder};
use hyper::body::Bytes;

/// Supported content codings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    Gzip,
    Deflate,
}

impl Encoding {
    /// `Content-Encoding` token
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Gzip => "gzip",
            Self::Deflate => "deflate",
        }
    }
}

/// When compression kicks in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompressionPolicy {
    pub enabled: bool,
    /// Bodies smaller than this are sent as is
    pub min_size: usize,
}

impl Default for CompressionPolicy {
    fn default() -> Self {
        Self {
            enabled: true,
            min_size: 1024,
        }
    }
}

impl CompressionPolicy {
    pub const fn disabled() -> Self {
        Self {
            enabled: false,
            min_size: 0,
        }
    }

    /// Pick the coding to apply to `body`, `None` to send it unencoded
    pub fn select(
        &self,
        body: &[u8],
        content_type: &str,
        accept_encoding: Option<&str>,
    ) -> Option<Encoding> {
        if !self.enabled || body.is_empty() || body.len() < self.min_size {
            return None;
        }
        if already_compressed(content_type) {
            return None;
        }
        select_encoding(accept_encoding?)
    }
}

/// Media that gains nothing from another compression pass
fn already_compressed(content_type: &str) -> bool {
    let media_type = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    media_type.starts_with("image/")
        || media_type.starts_with("video/")
        || media_type.starts_with("audio/")
        || matches!(
            media_type.as_str(),
            "application/zip" | "application/gzip" | "application/x-gzip"
        )
}

/// Pick the best supported coding from an `Accept-Encoding` header
///
/// Codings with `q=0` are refused; `*` stands for any coding not listed.
pub fn select_encoding(accept_encoding: &str) -> Option<Encoding> {
    let mut listed: Vec<(String, f32)> = Vec::new();
    for entry in accept_encoding.split(',') {
        let mut parts = entry.split(';');
        let Some(coding) = parts.next().map(|c| c.trim().to_ascii_lowercase()) else {
            continue;
        };
        if coding.is_empty() {
            continue;
        }
        let quality = parts
            .filter_map(|p| p.trim().strip_prefix("q="))
            .find_map(|q| q.trim().parse::<f32>().ok())
            .unwrap_or(1.0);
        listed.push((coding, quality));
    }

    let quality = |names: &[&str]| {
        listed
            .iter()
            .find(|(c, _)| names.contains(&c.as_str()))
            .or_else(|| listed.iter().find(|(c, _)| c == "*"))
            .map_or(0.0, |(_, q)| *q)
    };

    let gzip = quality(&["gzip", "x-gzip"]);
    let deflate = quality(&["deflate"]);
    if gzip > 0.0 && gzip >= deflate {
        Some(Encoding::Gzip)
    } else if deflate > 0.0 {
        Some(Encoding::Deflate)
    } else {
        None
    }
}

/// Compress `body` with `encoding`
pub fn compress(encoding: Encoding, body: &[u8]) -> std::io::Result<Bytes> {
    let compressed = match encoding {
        Encoding::Gzip => {
            let mut encoder = GzEncoder::new(Vec::new(), flate2::Compression::default());
            encoder.write_all(body)?;
            encoder.finish()?
        }
        Encoding::Deflate => {
            let mut encoder = DeflateEncoder::new(Vec::new(), flate2::Compression::default());
            encoder.write_all(body)?;
            encoder.finish()?
        }
    };
    Ok(Bytes::from(compressed))
}
