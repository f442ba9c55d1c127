//! Path templates and placeholder substitution.
//!
//! Paths are `/`-separated strings like `"users/$/stores"`. A `$` marks a
//! variable segment whose concrete value is supplied at call time. Values are
//! consumed positionally: the first value fills the first `$`, and so on.
//!
//! Surplus values are ignored, so one variable list can be shared between
//! sibling calls that need fewer placeholders.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{ModelError, Result};

/// Separator between path segments.
pub const SEPARATOR: char = '/';

/// The key of a variable node, and the placeholder left in unresolved paths.
pub const VAR_KEY: &str = "$";

const PLACEHOLDER: char = '$';

static VALID_SEGMENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9_-]+$").expect("segment pattern is valid"));

/// Check if a string is a valid concrete path segment.
///
/// The empty string is not a valid segment.
pub fn segment_is_valid(segment: &str) -> bool {
    VALID_SEGMENT.is_match(segment)
}

/// Replace each `$` in `template`, left to right, with the next value from
/// `vars`.
///
/// Fails with [`ModelError::InvalidSegment`] if a placeholder has no value or
/// its value is not a valid segment.
pub fn resolve(template: &str, vars: &[&str]) -> Result<String> {
    let mut resolved = String::with_capacity(template.len());
    let mut next = 0;

    for ch in template.chars() {
        if ch != PLACEHOLDER {
            resolved.push(ch);
            continue;
        }
        let value = vars.get(next).copied();
        next += 1;
        match value {
            Some(v) if segment_is_valid(v) => resolved.push_str(v),
            _ => {
                return Err(ModelError::InvalidSegment {
                    index: next,
                    value: value.map(String::from),
                    template: template.to_string(),
                })
            }
        }
    }

    Ok(resolved)
}

/// A segment in a path template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    /// A fixed storage key
    Literal(String),
    /// A `$` placeholder filled at call time
    Variable,
}

/// A parsed node path that may contain `$` placeholders.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PathTemplate {
    /// The original path string
    raw: String,
    /// Non-empty segments split by '/'
    segments: Vec<Segment>,
}

impl PathTemplate {
    /// Parse a path string into segments.
    ///
    /// Empty segments (a leading `/`, or the empty root path) are skipped.
    pub fn new(path: &str) -> Self {
        let segments = path
            .split(SEPARATOR)
            .filter(|s| !s.is_empty())
            .map(|s| {
                if s == VAR_KEY {
                    Segment::Variable
                } else {
                    Segment::Literal(s.to_string())
                }
            })
            .collect();

        Self {
            raw: path.to_string(),
            segments,
        }
    }

    /// Get the raw path string.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Get the path segments.
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Number of `$` placeholders that [`resolve`](Self::resolve) will consume.
    pub fn placeholder_count(&self) -> usize {
        self.raw.matches(PLACEHOLDER).count()
    }

    /// True if the path resolves without any values.
    pub fn is_concrete(&self) -> bool {
        self.placeholder_count() == 0
    }

    /// Substitute `vars` into this template.
    pub fn resolve(&self, vars: &[&str]) -> Result<String> {
        resolve(&self.raw, vars)
    }

    /// Check if this path starts with a given prefix, segment by segment.
    ///
    /// Placeholders only match placeholders.
    pub fn starts_with(&self, prefix: &PathTemplate) -> bool {
        if prefix.segments.len() > self.segments.len() {
            return false;
        }
        self.segments
            .iter()
            .zip(prefix.segments.iter())
            .all(|(a, b)| a == b)
    }

    /// The part of this path below `ancestor`, resolved with `vars`.
    ///
    /// The ancestor's own segments are excluded and the result has no
    /// leading `/`. Placeholders in the remaining part consume `vars` from the
    /// start of the list.
    pub fn relative_to(&self, ancestor: &PathTemplate, vars: &[&str]) -> Result<String> {
        if !self.starts_with(ancestor) {
            return Err(ModelError::PathMismatch {
                parent: ancestor.raw.clone(),
                target: self.raw.clone(),
            });
        }

        let rest: Vec<&str> = self.segments[ancestor.segments.len()..]
            .iter()
            .map(|s| match s {
                Segment::Literal(lit) => lit.as_str(),
                Segment::Variable => VAR_KEY,
            })
            .collect();

        resolve(&rest.join("/"), vars)
    }
}

impl std::fmt::Display for PathTemplate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.raw)
    }
}

impl From<&str> for PathTemplate {
    fn from(s: &str) -> Self {
        PathTemplate::new(s)
    }
}

impl From<String> for PathTemplate {
    fn from(s: String) -> Self {
        PathTemplate::new(&s)
    }
}
