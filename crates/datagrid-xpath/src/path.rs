use std::fmt;
use std::str::FromStr;

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum XPathError {
    #[error("empty path segment")]
    EmptySegment,
    #[error("unterminated index bracket")]
    UnterminatedBracket,
    #[error("invalid array index `{0}`")]
    InvalidIndex(String),
    #[error("bare bracket only allowed at path start")]
    MisplacedBracket,
}

/// One step of a schema path.
///
/// `Pending` is the parsed form of the `-1` index marker: the row is not
/// materialized yet, so the path cannot be resolved to a live position.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Segment {
    Field(String),
    Index(usize),
    Pending,
}

impl Segment {
    pub fn as_field(&self) -> Option<&str> {
        match self {
            Segment::Field(name) => Some(name),
            _ => None,
        }
    }

    pub fn as_index(&self) -> Option<usize> {
        match self {
            Segment::Index(idx) => Some(*idx),
            _ => None,
        }
    }
}

/// A parsed schema path: a sequence of field and index segments.
///
/// Parsing happens once per raw string; all navigation and comparison
/// work on the parsed form. `Display` reproduces the canonical text
/// form, so `XPath::parse(s)?.to_string() == s` for canonical inputs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct XPath {
    segments: Vec<Segment>,
}

impl XPath {
    pub fn root() -> Self {
        Self::default()
    }

    pub fn from_segments(segments: Vec<Segment>) -> Self {
        Self { segments }
    }

    /// Parses a dotted/bracketed schema path, e.g. `a.b[2].c[0]`.
    ///
    /// A leading bare bracket (`[0].name`) denotes a root-level
    /// repeated-entity view. `[-1]` parses to [`Segment::Pending`]; any
    /// other negative index is rejected.
    pub fn parse(input: &str) -> Result<Self, XPathError> {
        let mut segments = Vec::new();
        if input.is_empty() {
            return Ok(Self { segments });
        }
        for token in input.split('.') {
            parse_token(token, &mut segments)?;
        }
        Ok(Self { segments })
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn push(&mut self, segment: Segment) {
        self.segments.push(segment);
    }

    pub fn child(&self, segment: Segment) -> Self {
        let mut segments = self.segments.clone();
        segments.push(segment);
        Self { segments }
    }

    pub fn last(&self) -> Option<&Segment> {
        self.segments.last()
    }

    pub fn last_field(&self) -> Option<&str> {
        self.segments.last().and_then(Segment::as_field)
    }

    /// Everything but the last segment.
    pub fn parent(&self) -> Self {
        let mut segments = self.segments.clone();
        segments.pop();
        Self { segments }
    }

    /// Drops the final segment when it is a field name.
    ///
    /// Turns a leaf path like `orders.items[1].price` into the element
    /// prefix `orders.items[1]` that array elements are matched by.
    pub fn strip_trailing_field(&self) -> Self {
        match self.segments.last() {
            Some(Segment::Field(_)) => self.parent(),
            _ => self.clone(),
        }
    }

    /// Position of the last index segment, if the path crosses an array.
    pub fn last_index_position(&self) -> Option<usize> {
        self.segments
            .iter()
            .rposition(|seg| matches!(seg, Segment::Index(_) | Segment::Pending))
    }

    /// True when any segment is the `-1` not-yet-materialized marker.
    pub fn has_pending(&self) -> bool {
        self.segments.iter().any(|seg| matches!(seg, Segment::Pending))
    }

    /// True for the root-level repeated-entity form (`[0].name`).
    pub fn starts_with_index(&self) -> bool {
        matches!(
            self.segments.first(),
            Some(Segment::Index(_) | Segment::Pending)
        )
    }

    pub fn starts_with(&self, prefix: &XPath) -> bool {
        self.segments.len() >= prefix.segments.len()
            && self.segments[..prefix.segments.len()] == prefix.segments[..]
    }

    /// Sub-path over the given segment range.
    pub fn slice(&self, start: usize, end: usize) -> Self {
        Self {
            segments: self.segments[start..end].to_vec(),
        }
    }

    pub fn join(&self, other: &XPath) -> Self {
        let mut segments = self.segments.clone();
        segments.extend(other.segments.iter().cloned());
        Self { segments }
    }

    /// Dotted field-name projection with indices elided, the shape field
    /// metadata is keyed by: `orders.items[1].price` -> `orders.items.price`.
    pub fn field_names(&self) -> String {
        let mut out = String::new();
        for seg in &self.segments {
            if let Segment::Field(name) = seg {
                if !out.is_empty() {
                    out.push('.');
                }
                out.push_str(name);
            }
        }
        out
    }
}

fn parse_token(token: &str, segments: &mut Vec<Segment>) -> Result<(), XPathError> {
    let (name, mut rest) = match token.find('[') {
        Some(pos) => (&token[..pos], &token[pos..]),
        None => (token, ""),
    };
    if name.is_empty() && rest.is_empty() {
        return Err(XPathError::EmptySegment);
    }
    if name.is_empty() && !segments.is_empty() {
        return Err(XPathError::MisplacedBracket);
    }
    if !name.is_empty() {
        segments.push(Segment::Field(name.to_string()));
    }
    while !rest.is_empty() {
        let body = rest
            .strip_prefix('[')
            .ok_or_else(|| XPathError::InvalidIndex(rest.to_string()))?;
        let end = body.find(']').ok_or(XPathError::UnterminatedBracket)?;
        let raw = &body[..end];
        if raw == "-1" {
            segments.push(Segment::Pending);
        } else {
            let idx: usize = raw
                .parse()
                .map_err(|_| XPathError::InvalidIndex(raw.to_string()))?;
            segments.push(Segment::Index(idx));
        }
        rest = &body[end + 1..];
    }
    Ok(())
}

impl fmt::Display for XPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for seg in &self.segments {
            match seg {
                Segment::Field(name) => {
                    if !first {
                        f.write_str(".")?;
                    }
                    f.write_str(name)?;
                }
                Segment::Index(idx) => write!(f, "[{idx}]")?,
                Segment::Pending => f.write_str("[-1]")?,
            }
            first = false;
        }
        Ok(())
    }
}

impl FromStr for XPath {
    type Err = XPathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        XPath::parse(s)
    }
}
