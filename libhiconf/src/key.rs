//! Hierarchic keys: paths into a configuration tree.
//!
//! A key is an ordered list of segments, each a name or a list index, with a
//! canonical text encoding:
//!
//! - bare identifiers are joined with `.` (`global.videomode`),
//! - indices are bracketed (`players[2]`),
//! - anything else is bracket-quoted (`sys.folder["my games"]`).
//!
//! The encoding is the identity of a key: two keys are equal when they encode
//! to the same text, however they were built.

use std::borrow::Cow;
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;

static IDENTIFIER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_$][A-Za-z0-9_$]*$").expect("valid identifier regex"));

/// One step of a [`HierarchicKey`].
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Segment {
    /// A map key.
    Name(String),
    /// A list position.
    Index(usize),
}

impl Segment {
    /// Returns `true` if this segment addresses a list position.
    ///
    /// Purely numeric names count, since they encode identically.
    pub fn is_index(&self) -> bool {
        self.as_index().is_some()
    }

    /// Returns the list position this segment addresses, if any.
    pub fn as_index(&self) -> Option<usize> {
        match self {
            Segment::Index(i) => Some(*i),
            Segment::Name(s) if is_numeric(s) => s.parse().ok(),
            Segment::Name(_) => None,
        }
    }

    /// The string used when this segment keys a map.
    pub fn as_key(&self) -> Cow<'_, str> {
        match self {
            Segment::Name(s) => Cow::Borrowed(s),
            Segment::Index(i) => Cow::Owned(i.to_string()),
        }
    }

    fn write_encoded(&self, f: &mut fmt::Formatter<'_>, first: bool) -> fmt::Result {
        match self {
            Segment::Index(i) => write!(f, "[{}]", i),
            Segment::Name(s) if is_numeric(s) => write!(f, "[{}]", s),
            Segment::Name(s) if needs_quoting(s) => {
                f.write_str("[\"")?;
                for c in s.chars() {
                    if c == '"' || c == '\\' {
                        f.write_str("\\")?;
                    }
                    write!(f, "{}", c)?;
                }
                f.write_str("\"]")
            }
            Segment::Name(s) => {
                if !first {
                    f.write_str(".")?;
                }
                f.write_str(s)
            }
        }
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_key())
    }
}

impl From<&str> for Segment {
    fn from(s: &str) -> Self {
        Segment::Name(s.to_string())
    }
}

impl From<String> for Segment {
    fn from(s: String) -> Self {
        Segment::Name(s)
    }
}

impl From<usize> for Segment {
    fn from(i: usize) -> Self {
        Segment::Index(i)
    }
}

/// A path into a configuration tree.
#[derive(Clone, Default)]
pub struct HierarchicKey {
    segments: Vec<Segment>,
}

impl HierarchicKey {
    /// The empty key, addressing the root.
    pub fn root() -> Self {
        Self::default()
    }

    /// Build a key from explicit segments (no tokenizing).
    pub fn from_segments(segments: Vec<Segment>) -> Self {
        Self { segments }
    }

    /// Decode a key from its text form.
    ///
    /// ```
    /// use libhiconf::{HierarchicKey, Segment};
    ///
    /// let key = HierarchicKey::parse(r#"a.b[2]["odd key"]"#);
    /// assert_eq!(
    ///     key.segments(),
    ///     &[
    ///         Segment::Name("a".into()),
    ///         Segment::Name("b".into()),
    ///         Segment::Index(2),
    ///         Segment::Name("odd key".into()),
    ///     ]
    /// );
    /// ```
    pub fn parse(input: &str) -> Self {
        let mut segments = Vec::new();
        tokenize(input, &mut segments);
        Self { segments }
    }

    /// Decode and concatenate several encoded fragments.
    pub fn from_parts<I, S>(parts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut segments = Vec::new();
        for part in parts {
            tokenize(part.as_ref(), &mut segments);
        }
        Self { segments }
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// The key one level up, or `None` for the root.
    pub fn parent(&self) -> Option<HierarchicKey> {
        if self.segments.is_empty() {
            return None;
        }
        Some(Self {
            segments: self.segments[..self.segments.len() - 1].to_vec(),
        })
    }

    pub fn last(&self) -> Option<&Segment> {
        self.segments.last()
    }

    /// A new key with one more segment.
    pub fn child(&self, segment: impl Into<Segment>) -> HierarchicKey {
        let mut segments = self.segments.clone();
        segments.push(segment.into());
        Self { segments }
    }

    /// A new key with all of `other`'s segments appended.
    pub fn join(&self, other: &HierarchicKey) -> HierarchicKey {
        let mut segments = self.segments.clone();
        segments.extend(other.segments.iter().cloned());
        Self { segments }
    }

    pub fn push(&mut self, segment: impl Into<Segment>) {
        self.segments.push(segment.into());
    }
}

impl fmt::Display for HierarchicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.segments.iter().enumerate() {
            segment.write_encoded(f, i == 0)?;
        }
        Ok(())
    }
}

impl fmt::Debug for HierarchicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HierarchicKey({})", self)
    }
}

impl PartialEq for HierarchicKey {
    fn eq(&self, other: &Self) -> bool {
        self.to_string() == other.to_string()
    }
}

impl Eq for HierarchicKey {}

impl Hash for HierarchicKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.to_string().hash(state);
    }
}

impl PartialOrd for HierarchicKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for HierarchicKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.to_string().cmp(&other.to_string())
    }
}

impl FromStr for HierarchicKey {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::parse(s))
    }
}

impl From<&str> for HierarchicKey {
    fn from(s: &str) -> Self {
        Self::parse(s)
    }
}

impl From<Vec<Segment>> for HierarchicKey {
    fn from(segments: Vec<Segment>) -> Self {
        Self::from_segments(segments)
    }
}

impl FromIterator<Segment> for HierarchicKey {
    fn from_iter<T: IntoIterator<Item = Segment>>(iter: T) -> Self {
        Self::from_segments(iter.into_iter().collect())
    }
}

/// Digits in canonical form, so `007` stays a name.
fn is_numeric(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit()) && (s == "0" || !s.starts_with('0'))
}

/// A name needs bracket-quoting when the dotted form would not read back as
/// the same single segment.
fn needs_quoting(s: &str) -> bool {
    s.contains(['.', '/', ' ']) || !IDENTIFIER.is_match(s)
}

/// Split encoded text into segments: quoted runs first, then bare runs,
/// with bare all-digit runs becoming indices.
fn tokenize(input: &str, out: &mut Vec<Segment>) {
    let chars: Vec<char> = input.chars().collect();
    let mut i = 0;

    while i < chars.len() {
        match chars[i] {
            '.' | '[' | ']' => i += 1,
            '"' => {
                let (name, next) = read_quoted(&chars, i + 1);
                out.push(Segment::Name(name));
                i = next;
            }
            _ => {
                let start = i;
                while i < chars.len() && !matches!(chars[i], '.' | '[' | ']') {
                    i += 1;
                }
                let word: String = chars[start..i].iter().collect();
                match word.parse::<usize>() {
                    Ok(n) if is_numeric(&word) => out.push(Segment::Index(n)),
                    _ => out.push(Segment::Name(word)),
                }
            }
        }
    }
}

/// Read a double-quoted name starting just after the opening quote.
/// An unterminated quote takes the rest of the input.
fn read_quoted(chars: &[char], mut i: usize) -> (String, usize) {
    let mut name = String::new();
    while i < chars.len() {
        match chars[i] {
            '\\' if i + 1 < chars.len() => {
                name.push(chars[i + 1]);
                i += 2;
            }
            '"' => return (name, i + 1),
            c => {
                name.push(c);
                i += 1;
            }
        }
    }
    (name, i)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn name(s: &str) -> Segment {
        Segment::Name(s.to_string())
    }

    #[test]
    fn test_parse_mixed_forms() {
        let key = HierarchicKey::parse(r#"a.b[2]["odd key"]"#);
        assert_eq!(
            key.segments(),
            &[name("a"), name("b"), Segment::Index(2), name("odd key")]
        );
    }

    #[test]
    fn test_encode_quotes_when_needed() {
        let key = HierarchicKey::from_segments(vec![
            name("sys"),
            name("folder"),
            name("my games"),
            name("v1.2"),
            name("a/b"),
            name("scan-line"),
            Segment::Index(0),
            name("ok_name"),
        ]);
        assert_eq!(
            key.to_string(),
            r#"sys.folder["my games"]["v1.2"]["a/b"]["scan-line"][0].ok_name"#
        );
    }

    #[test]
    fn test_escaped_quote_round_trip() {
        let key = HierarchicKey::from_segments(vec![name(r#"say "hi""#), name(r"back\slash")]);
        let encoded = key.to_string();
        assert_eq!(encoded, r#"["say \"hi\""]["back\\slash"]"#);
        assert_eq!(HierarchicKey::parse(&encoded).segments(), key.segments());
    }

    #[test]
    fn test_round_trip() {
        let samples = vec![
            vec![name("global"), name("videomode")],
            vec![Segment::Index(3), name("x")],
            vec![name(""), name("a b"), Segment::Index(10)],
            vec![name("@+arr")],
            vec![name("$dollar"), name("_under")],
            vec![name("rom"), name("007")],
        ];
        for segments in samples {
            let key = HierarchicKey::from_segments(segments);
            let back = HierarchicKey::parse(&key.to_string());
            assert_eq!(back, key);
            assert_eq!(back.segments(), key.segments());
        }
    }

    #[test]
    fn test_numeric_name_equals_index() {
        let a = HierarchicKey::from_segments(vec![name("list"), name("2")]);
        let b = HierarchicKey::parse("list[2]");
        assert_eq!(a, b);
        assert_eq!(a.to_string(), "list[2]");
        assert!(a.last().unwrap().is_index());
    }

    #[test]
    fn test_from_parts_joins() {
        let key = HierarchicKey::from_parts(["a.b", "[1]", r#"["c d"].e"#]);
        assert_eq!(key.to_string(), r#"a.b[1]["c d"].e"#);
        assert_eq!(key.len(), 5);
    }

    #[test]
    fn test_parent_and_last() {
        let key = HierarchicKey::parse("a.b.c");
        assert_eq!(key.parent().unwrap().to_string(), "a.b");
        assert_eq!(key.last(), Some(&name("c")));
        assert_eq!(key.to_string(), "a.b.c");
        assert!(HierarchicKey::root().parent().is_none());
    }

    #[test]
    fn test_unterminated_quote_takes_rest() {
        let key = HierarchicKey::parse(r#"a["open.end"#);
        assert_eq!(key.segments(), &[name("a"), name("open.end")]);
    }
}
