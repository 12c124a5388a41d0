//! Decoded documents and their metadata.

use super::value::{ShapeDisplay, Value};
use indexmap::IndexMap;
use std::fmt;
use std::path::PathBuf;

/// A metadata entry value.
#[derive(Debug, Clone, PartialEq)]
pub enum MetaValue {
    /// Free text.
    Text(String),
    /// Integer count or size.
    Int(i64),
    /// Floating point statistic.
    Float(f64),
    /// Flag.
    Bool(bool),
    /// Array shape.
    Shape(Vec<usize>),
    /// List of names.
    List(Vec<String>),
}

impl fmt::Display for MetaValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetaValue::Text(s) => f.write_str(s),
            MetaValue::Int(i) => write!(f, "{}", i),
            MetaValue::Float(v) => write!(f, "{}", v),
            MetaValue::Bool(b) => write!(f, "{}", b),
            MetaValue::Shape(shape) => write!(f, "{}", ShapeDisplay(shape)),
            MetaValue::List(items) => write!(f, "[{}]", items.join(", ")),
        }
    }
}

impl From<&str> for MetaValue {
    fn from(v: &str) -> Self {
        MetaValue::Text(v.to_string())
    }
}

impl From<String> for MetaValue {
    fn from(v: String) -> Self {
        MetaValue::Text(v)
    }
}

impl From<i64> for MetaValue {
    fn from(v: i64) -> Self {
        MetaValue::Int(v)
    }
}

impl From<usize> for MetaValue {
    fn from(v: usize) -> Self {
        MetaValue::Int(i64::try_from(v).unwrap_or(i64::MAX))
    }
}

impl From<u64> for MetaValue {
    fn from(v: u64) -> Self {
        MetaValue::Int(i64::try_from(v).unwrap_or(i64::MAX))
    }
}

impl From<f64> for MetaValue {
    fn from(v: f64) -> Self {
        MetaValue::Float(v)
    }
}

impl From<bool> for MetaValue {
    fn from(v: bool) -> Self {
        MetaValue::Bool(v)
    }
}

impl From<Vec<String>> for MetaValue {
    fn from(v: Vec<String>) -> Self {
        MetaValue::List(v)
    }
}

/// Insertion-ordered metadata.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Metadata {
    entries: IndexMap<String, MetaValue>,
}

impl Metadata {
    /// Create empty metadata.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace an entry. A replaced entry keeps its position.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<MetaValue>) {
        self.entries.insert(key.into(), value.into());
    }

    /// Builder-style insert.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<MetaValue>) -> Self {
        self.insert(key, value);
        self
    }

    /// Insert an array shape.
    pub fn insert_shape(&mut self, key: impl Into<String>, shape: &[usize]) {
        self.entries
            .insert(key.into(), MetaValue::Shape(shape.to_vec()));
    }

    /// Look up an entry.
    pub fn get(&self, key: &str) -> Option<&MetaValue> {
        self.entries.get(key)
    }

    /// Whether an entry exists.
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &MetaValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether there are no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// A successfully loaded file: its decoded value plus descriptive metadata.
///
/// Documents are replaced wholesale on the next load and never mutated.
#[derive(Debug, Clone)]
pub struct DecodedDocument {
    /// Path to the source file.
    pub file_path: PathBuf,
    /// Decoded payload.
    pub value: Value,
    /// Format name, shape, dtype, counts and so on.
    pub metadata: Metadata,
}

impl DecodedDocument {
    /// Create a new document.
    pub fn new(file_path: PathBuf, value: Value, metadata: Metadata) -> Self {
        Self {
            file_path,
            value,
            metadata,
        }
    }

    /// File name for titles.
    pub fn file_name(&self) -> String {
        self.file_path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "document".to_string())
    }
}
