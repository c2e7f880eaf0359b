//! Route matching module
//!
//! Implements path pattern matching with `{var}` segments.

use std::fmt;

use crate::endpoint::RouteVars;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Var(String),
}

/// Parsed route pattern such as `/notes/{id}`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathPattern {
    segments: Vec<Segment>,
}

impl PathPattern {
    /// Parse a pattern; a segment wrapped in braces binds a variable
    pub fn parse(pattern: &str) -> Result<Self, String> {
        let mut segments = Vec::new();
        for part in split_path(pattern) {
            let segment = match part.strip_prefix('{').and_then(|p| p.strip_suffix('}')) {
                Some("") => return Err(format!("empty variable name in route {pattern}")),
                Some(name) => Segment::Var(name.to_string()),
                None if part.contains(['{', '}']) => {
                    return Err(format!("malformed segment {part:?} in route {pattern}"))
                }
                None => Segment::Literal(part.to_string()),
            };
            segments.push(segment);
        }
        Ok(Self { segments })
    }

    /// Match a request path, binding variables in pattern order
    pub fn matches(&self, path: &str) -> Option<RouteVars> {
        let mut vars = RouteVars::new();
        let mut parts = split_path(path);

        for segment in &self.segments {
            let part = parts.next()?;
            match segment {
                Segment::Literal(literal) if literal == part => {}
                Segment::Literal(_) => return None,
                Segment::Var(name) => vars.push(name.as_str(), part),
            }
        }

        // Every path segment must be consumed
        parts.next().is_none().then_some(vars)
    }
}

impl fmt::Display for PathPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.segments.is_empty() {
            return f.write_str("/");
        }
        for segment in &self.segments {
            match segment {
                Segment::Literal(literal) => write!(f, "/{literal}")?,
                Segment::Var(name) => write!(f, "/{{{name}}}")?,
            }
        }
        Ok(())
    }
}

/// Non-empty segments, so trailing and doubled slashes are ignored
fn split_path(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|s| !s.is_empty())
}
