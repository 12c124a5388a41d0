//! Path addressing.
//!
//! A [`Path`] names a sub-value by replaying key and index segments from the
//! document root. Its text form is `root.key[3,7].other`; keys that contain
//! path punctuation are written quoted, `root["a.b"]`.

use super::shape::{classify, ShapeKind};
use super::value::Value;
use crate::error::PathError;
use std::fmt;
use std::str::FromStr;

const ROOT: &str = "root";

/// One step of a path.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Segment {
    /// Mapping key or object field name.
    Key(String),
    /// One or more indices (multi-dimensional arrays take several at once).
    Index(Vec<usize>),
}

impl Segment {
    /// Label used for tree nodes and table headers.
    pub fn label(&self) -> String {
        match self {
            Segment::Key(key) => key.clone(),
            Segment::Index(_) => self.to_string(),
        }
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Segment::Key(key) if is_bare_key(key) => write!(f, ".{}", key),
            Segment::Key(key) => {
                write!(f, "[\"")?;
                for c in key.chars() {
                    if c == '"' || c == '\\' {
                        write!(f, "\\")?;
                    }
                    write!(f, "{}", c)?;
                }
                write!(f, "\"]")
            },
            Segment::Index(indices) => {
                write!(f, "[")?;
                for (i, index) in indices.iter().enumerate() {
                    if i > 0 {
                        write!(f, ",")?;
                    }
                    write!(f, "{}", index)?;
                }
                write!(f, "]")
            },
        }
    }
}

fn is_bare_key(key: &str) -> bool {
    !key.is_empty()
        && !key.starts_with(char::is_whitespace)
        && !key.ends_with(char::is_whitespace)
        && !key.contains(['.', '[', ']', '"', '\\'])
}

/// Immutable address of a sub-value relative to the document root.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Path {
    segments: Vec<Segment>,
}

impl Path {
    /// The empty path, addressing the root itself.
    pub fn root() -> Self {
        Self::default()
    }

    /// Build a path from segments.
    pub fn from_segments(segments: Vec<Segment>) -> Self {
        Self { segments }
    }

    /// Segments in order from the root.
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Number of segments.
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// Whether this is the root path.
    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    /// Last segment, if any.
    pub fn last(&self) -> Option<&Segment> {
        self.segments.last()
    }

    /// Path with one more segment.
    pub fn child(&self, segment: Segment) -> Self {
        let mut segments = Vec::with_capacity(self.segments.len() + 1);
        segments.extend_from_slice(&self.segments);
        segments.push(segment);
        Self { segments }
    }

    /// Path with a key segment appended.
    pub fn key(&self, key: impl Into<String>) -> Self {
        self.child(Segment::Key(key.into()))
    }

    /// Path with an index segment appended.
    pub fn index(&self, indices: &[usize]) -> Self {
        self.child(Segment::Index(indices.to_vec()))
    }

    /// Path without its last segment; the root is its own parent.
    pub fn parent(&self) -> Self {
        let keep = self.segments.len().saturating_sub(1);
        Self {
            segments: self.segments[..keep].to_vec(),
        }
    }

    /// Label of the addressed value: its last segment, or `root`.
    pub fn label(&self) -> String {
        self.last()
            .map(Segment::label)
            .unwrap_or_else(|| ROOT.to_string())
    }

    /// Parse the text form. The leading `root` is optional.
    pub fn parse(input: &str) -> Result<Self, PathError> {
        Parser::new(input).parse()
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", ROOT)?;
        for segment in &self.segments {
            write!(f, "{}", segment)?;
        }
        Ok(())
    }
}

impl FromStr for Path {
    type Err = PathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

struct Parser<'a> {
    input: &'a str,
    text: &'a str,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            input,
            text: input.trim(),
            pos: 0,
        }
    }

    fn error(&self, reason: &'static str) -> PathError {
        PathError::Syntax {
            input: self.input.to_string(),
            offset: self.pos,
            reason,
        }
    }

    fn peek(&self) -> Option<u8> {
        self.text.as_bytes().get(self.pos).copied()
    }

    fn parse(mut self) -> Result<Path, PathError> {
        let mut segments = Vec::new();

        let bytes = self.text.as_bytes();
        if self.text.starts_with(ROOT) && matches!(bytes.get(ROOT.len()), None | Some(b'.' | b'[')) {
            self.pos = ROOT.len();
        } else if !self.text.is_empty() && !matches!(bytes[0], b'.' | b'[') {
            segments.push(Segment::Key(self.bare_key()?));
        }

        while let Some(b) = self.peek() {
            match b {
                b'.' => {
                    self.pos += 1;
                    segments.push(Segment::Key(self.bare_key()?));
                },
                b'[' => {
                    self.pos += 1;
                    segments.push(self.bracket()?);
                },
                _ => return Err(self.error("expected '.' or '['")),
            }
        }
        Ok(Path { segments })
    }

    fn bare_key(&mut self) -> Result<String, PathError> {
        let rest = &self.text[self.pos..];
        let end = rest.find(['.', '[']).unwrap_or(rest.len());
        let key = &rest[..end];
        if key.is_empty() {
            return Err(self.error("empty key"));
        }
        if key.contains([']', '"']) {
            return Err(self.error("unexpected character in key"));
        }
        self.pos += end;
        Ok(key.to_string())
    }

    fn bracket(&mut self) -> Result<Segment, PathError> {
        if self.peek() == Some(b'"') {
            self.pos += 1;
            let key = self.quoted()?;
            if self.peek() != Some(b']') {
                return Err(self.error("expected ']' after quoted key"));
            }
            self.pos += 1;
            return Ok(Segment::Key(key));
        }

        let rest = &self.text[self.pos..];
        let Some(end) = rest.find(']') else {
            return Err(self.error("unclosed '['"));
        };
        let indices = rest[..end]
            .split(',')
            .map(|part| part.trim().parse::<usize>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|_| self.error("index must be a non-negative integer"))?;
        self.pos += end + 1;
        Ok(Segment::Index(indices))
    }

    fn quoted(&mut self) -> Result<String, PathError> {
        let mut key = String::new();
        let mut escaped = false;
        for (offset, c) in self.text[self.pos..].char_indices() {
            if escaped {
                key.push(c);
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                self.pos += offset + 1;
                return Ok(key);
            } else {
                key.push(c);
            }
        }
        Err(self.error("unterminated quoted key"))
    }
}

/// Resolve `path` against `root`, following at most `max_depth` segments.
pub fn resolve(root: &Value, path: &Path, max_depth: usize) -> Result<Value, PathError> {
    if path.len() > max_depth {
        return Err(PathError::TooDeep {
            depth: path.len(),
            max: max_depth,
        });
    }
    path.segments()
        .iter()
        .try_fold(root.clone(), |current, segment| step(&current, segment))
}

/// Apply one segment to a value according to its shape kind.
pub fn step(value: &Value, segment: &Segment) -> Result<Value, PathError> {
    let kind = classify(value);
    match (value, segment) {
        (Value::Map(map), Segment::Key(key)) => map
            .get(key)
            .cloned()
            .ok_or_else(|| PathError::MissingKey { key: key.clone() }),
        (Value::List(items), Segment::Index(indices)) => {
            let Some((&first, rest)) = indices.split_first() else {
                return Err(inapplicable(segment, kind));
            };
            let item = items.get(first).cloned().ok_or(PathError::OutOfRange {
                index: first,
                axis: 0,
                len: items.len(),
            })?;
            if rest.is_empty() {
                Ok(item)
            } else {
                step(&item, &Segment::Index(rest.to_vec()))
            }
        },
        (Value::Array(arr), Segment::Index(indices)) if kind == ShapeKind::NDArray => {
            if indices.is_empty() {
                return Err(inapplicable(segment, kind));
            }
            arr.index(indices)
        },
        (Value::Object(obj), Segment::Key(key)) => obj
            .field(key)
            .cloned()
            .ok_or_else(|| PathError::MissingKey { key: key.clone() }),
        _ => Err(inapplicable(segment, kind)),
    }
}

fn inapplicable(segment: &Segment, kind: ShapeKind) -> PathError {
    PathError::Inapplicable {
        segment: segment.to_string(),
        kind: kind.name(),
    }
}
