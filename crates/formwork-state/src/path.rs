//! Dot-notation paths for navigating nested value trees.
//!
//! Paths are sequences of segments. Each segment is either a key (for
//! objects) or an index (for arrays). The string form is dot-separated
//! (`user.emails.0`), with an all-digit segment parsing as an index and a
//! bracketed segment (`[a.b]`) parsing as a literal key that opts out of
//! nesting.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A single segment in a path.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Seg {
    /// Object key access.
    Key(String),
    /// Array index access.
    Index(usize),
}

impl Seg {
    /// Create a key segment.
    #[inline]
    pub fn key(k: impl Into<String>) -> Self {
        Seg::Key(k.into())
    }

    /// Create an index segment.
    #[inline]
    pub fn index(i: usize) -> Self {
        Seg::Index(i)
    }

    /// Returns true if this is a key segment.
    #[inline]
    pub fn is_key(&self) -> bool {
        matches!(self, Seg::Key(_))
    }

    /// Returns true if this is an index segment.
    #[inline]
    pub fn is_index(&self) -> bool {
        matches!(self, Seg::Index(_))
    }

    /// Get the key if this is a key segment.
    #[inline]
    pub fn as_key(&self) -> Option<&str> {
        match self {
            Seg::Key(k) => Some(k),
            Seg::Index(_) => None,
        }
    }

    /// Get the index if this is an index segment.
    #[inline]
    pub fn as_index(&self) -> Option<usize> {
        match self {
            Seg::Key(_) => None,
            Seg::Index(i) => Some(*i),
        }
    }
}

impl From<String> for Seg {
    fn from(s: String) -> Self {
        Seg::Key(s)
    }
}

impl From<&str> for Seg {
    fn from(s: &str) -> Self {
        Seg::Key(s.to_owned())
    }
}

impl From<usize> for Seg {
    fn from(i: usize) -> Self {
        Seg::Index(i)
    }
}

impl fmt::Display for Seg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            // Keys that would be re-parsed as something else are escaped.
            Seg::Key(k) if needs_escape(k) => write!(f, "[{}]", k),
            Seg::Key(k) => write!(f, "{}", k),
            Seg::Index(i) => write!(f, "{}", i),
        }
    }
}

fn needs_escape(key: &str) -> bool {
    key.is_empty()
        || key.contains(['.', '[', ']'])
        || key.bytes().all(|b| b.is_ascii_digit())
}

/// A complete path into a nested value tree.
///
/// # Examples
///
/// ```
/// use formwork_state::Path;
///
/// let path: Path = "users.0.name".parse().unwrap();
/// assert_eq!(path.len(), 3);
/// assert_eq!(path.to_string(), "users.0.name");
///
/// // Bracketed segments are literal keys, dots inside are opaque.
/// let literal: Path = "[a.b].c".parse().unwrap();
/// assert_eq!(literal.len(), 2);
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Path(Vec<Seg>);

impl Path {
    /// Create an empty path (root).
    #[inline]
    pub fn root() -> Self {
        Self(Vec::new())
    }

    /// Create a path from a vector of segments.
    #[inline]
    pub fn from_segments(segments: Vec<Seg>) -> Self {
        Self(segments)
    }

    /// Parse a dot-notation path string.
    ///
    /// Never fails: an unterminated bracket swallows the rest of the
    /// string as a literal key, matching the forgiving behavior form
    /// consumers expect from hand-typed paths.
    pub fn parse(s: &str) -> Self {
        if s.is_empty() {
            return Self::root();
        }

        let mut segs = Vec::new();
        let bytes = s.as_bytes();
        let mut i = 0;
        while i < bytes.len() {
            if bytes[i] == b'[' {
                let end = s[i + 1..]
                    .find(']')
                    .map(|off| i + 1 + off)
                    .unwrap_or(bytes.len());
                segs.push(Seg::Key(s[i + 1..end].to_owned()));
                // Skip the closing bracket and a following dot, if any.
                i = end + 1;
                if i < bytes.len() && bytes[i] == b'.' {
                    i += 1;
                }
            } else {
                let end = s[i..].find('.').map(|off| i + off).unwrap_or(bytes.len());
                let raw = &s[i..end];
                if !raw.is_empty() {
                    match raw.parse::<usize>() {
                        Ok(idx) if raw.bytes().all(|b| b.is_ascii_digit()) => {
                            segs.push(Seg::Index(idx));
                        }
                        _ => segs.push(Seg::Key(raw.to_owned())),
                    }
                }
                i = end + 1;
            }
        }
        Self(segs)
    }

    /// Append a key segment and return self (builder pattern).
    #[inline]
    pub fn key(mut self, k: impl Into<String>) -> Self {
        self.0.push(Seg::Key(k.into()));
        self
    }

    /// Append an index segment and return self (builder pattern).
    #[inline]
    pub fn index(mut self, i: usize) -> Self {
        self.0.push(Seg::Index(i));
        self
    }

    /// Push a segment onto the path (mutating).
    #[inline]
    pub fn push(&mut self, seg: Seg) {
        self.0.push(seg);
    }

    /// Pop the last segment from the path.
    #[inline]
    pub fn pop(&mut self) -> Option<Seg> {
        self.0.pop()
    }

    /// Get the segments of this path.
    #[inline]
    pub fn segments(&self) -> &[Seg] {
        &self.0
    }

    /// Check if this path is empty (root).
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Get the number of segments in this path.
    #[inline]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Get the last segment.
    #[inline]
    pub fn last(&self) -> Option<&Seg> {
        self.0.last()
    }

    /// Join this path with another path.
    #[inline]
    pub fn join(&self, other: &Path) -> Path {
        let mut result = self.clone();
        result.0.extend(other.0.iter().cloned());
        result
    }

    /// Get the parent path (path without the last segment).
    #[inline]
    pub fn parent(&self) -> Option<Path> {
        if self.0.is_empty() {
            None
        } else {
            let mut p = self.clone();
            p.pop();
            Some(p)
        }
    }

    /// Check if this path starts with another path.
    #[inline]
    pub fn starts_with(&self, prefix: &Path) -> bool {
        self.0.starts_with(&prefix.0)
    }

    /// Iterate over the segments.
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = &Seg> {
        self.0.iter()
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, seg) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ".")?;
            }
            write!(f, "{}", seg)?;
        }
        Ok(())
    }
}

impl FromStr for Path {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::parse(s))
    }
}

impl From<&str> for Path {
    fn from(s: &str) -> Self {
        Self::parse(s)
    }
}

impl FromIterator<Seg> for Path {
    fn from_iter<I: IntoIterator<Item = Seg>>(iter: I) -> Self {
        Path(iter.into_iter().collect())
    }
}

impl IntoIterator for Path {
    type Item = Seg;
    type IntoIter = std::vec::IntoIter<Seg>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a Path {
    type Item = &'a Seg;
    type IntoIter = std::slice::Iter<'a, Seg>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl std::ops::Index<usize> for Path {
    type Output = Seg;

    fn index(&self, index: usize) -> &Self::Output {
        &self.0[index]
    }
}

/// Construct a [`Path`] from a sequence of segments.
///
/// # Examples
///
/// ```
/// use formwork_state::path;
///
/// // String literals become Key segments, numbers become Index segments.
/// let p = path!("users", 0, "name");
/// assert_eq!(p.to_string(), "users.0.name");
/// ```
#[macro_export]
macro_rules! path {
    () => {
        $crate::Path::root()
    };
    ($($seg:expr),+ $(,)?) => {{
        let mut p = $crate::Path::root();
        $(
            p.push($crate::Seg::from($seg));
        )+
        p
    }};
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple() {
        let p = Path::parse("user.name");
        assert_eq!(p.segments(), &[Seg::key("user"), Seg::key("name")]);
    }

    #[test]
    fn test_parse_index_segment() {
        let p = Path::parse("users.0.name");
        assert_eq!(
            p.segments(),
            &[Seg::key("users"), Seg::index(0), Seg::key("name")]
        );
    }

    #[test]
    fn test_parse_escaped_literal() {
        let p = Path::parse("[a.b].c");
        assert_eq!(p.segments(), &[Seg::key("a.b"), Seg::key("c")]);
    }

    #[test]
    fn test_parse_escaped_digits_stay_key() {
        let p = Path::parse("[0]");
        assert_eq!(p.segments(), &[Seg::key("0")]);
    }

    #[test]
    fn test_parse_unterminated_bracket() {
        let p = Path::parse("[a.b");
        assert_eq!(p.segments(), &[Seg::key("a.b")]);
    }

    #[test]
    fn test_parse_empty_is_root() {
        assert!(Path::parse("").is_empty());
    }

    #[test]
    fn test_display_round_trip() {
        for raw in ["user.name", "users.0.name", "[a.b].c", "[7].x"] {
            let p = Path::parse(raw);
            assert_eq!(Path::parse(&p.to_string()), p, "round-trip for {raw}");
        }
    }

    #[test]
    fn test_display_escapes_dotted_key() {
        let p = Path::root().key("a.b").key("c");
        assert_eq!(p.to_string(), "[a.b].c");
    }

    #[test]
    fn test_path_macro() {
        let p = path!("users", 0, "name");
        assert_eq!(p.len(), 3);
        assert_eq!(p[1], Seg::Index(0));
    }

    #[test]
    fn test_join_and_parent() {
        let base = path!("group");
        let joined = base.join(&path!("field"));
        assert_eq!(joined.to_string(), "group.field");
        assert_eq!(joined.parent().unwrap(), base);
        assert!(joined.starts_with(&base));
    }

    #[test]
    fn test_path_serde() {
        let p = path!("users", 0);
        let json = serde_json::to_string(&p).unwrap();
        let parsed: Path = serde_json::from_str(&json).unwrap();
        assert_eq!(p, parsed);
    }
}
