//! Structural model: one closed classification for every decoded value.
//!
//! Components branch on [`ShapeKind`] instead of re-deriving "is this
//! array-like?" on their own.

use super::value::{ShapeDisplay, Value};
use std::fmt;
use thiserror::Error;

/// Characters kept when previewing a string.
const STRING_PREVIEW_CHARS: usize = 30;
/// Characters kept when printing a number.
const NUMBER_PREVIEW_CHARS: usize = 50;

/// Navigable shape of a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShapeKind {
    /// Ordered key/value mapping.
    Mapping,
    /// Ordered, index-addressed sequence.
    Sequence,
    /// Array with a shape of at least one dimension and a dtype.
    NDArray,
    /// Number, string, boolean, null.
    Scalar,
    /// Object with named fields.
    Opaque,
}

impl ShapeKind {
    /// Display name.
    pub fn name(self) -> &'static str {
        match self {
            ShapeKind::Mapping => "Mapping",
            ShapeKind::Sequence => "Sequence",
            ShapeKind::NDArray => "NDArray",
            ShapeKind::Scalar => "Scalar",
            ShapeKind::Opaque => "Opaque",
        }
    }

    /// Whether a value of this kind can be drilled into from a table cell.
    pub fn is_navigable(self) -> bool {
        matches!(
            self,
            ShapeKind::Mapping | ShapeKind::Sequence | ShapeKind::NDArray
        )
    }

    /// Whether the tree builder expands children of this kind.
    pub fn is_collection(self) -> bool {
        matches!(self, ShapeKind::Mapping | ShapeKind::Sequence)
    }
}

impl fmt::Display for ShapeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A value whose size or description cannot be computed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct DescribeError(pub String);

/// Classify a value. First match wins: NDArray, Mapping, Sequence, Opaque, Scalar.
pub fn classify(value: &Value) -> ShapeKind {
    match value {
        Value::Array(arr) if arr.ndim() >= 1 => ShapeKind::NDArray,
        Value::Map(_) => ShapeKind::Mapping,
        Value::List(_) => ShapeKind::Sequence,
        Value::Object(obj) if !obj.fields().is_empty() => ShapeKind::Opaque,
        _ => ShapeKind::Scalar,
    }
}

/// Number of directly addressable children, if the value has a length.
pub fn child_count(value: &Value) -> Option<usize> {
    match value {
        Value::Map(map) => Some(map.len()),
        Value::List(items) => Some(items.len()),
        Value::Array(arr) if arr.ndim() >= 1 => arr.shape().first().copied(),
        Value::Object(obj) => Some(obj.fields().len()),
        _ => None,
    }
}

/// Size summary: shape tuple for arrays, `length: N` for collections, empty otherwise.
pub fn size_descriptor(value: &Value) -> Result<String, DescribeError> {
    match value {
        Value::Unavailable { reason, .. } => Err(DescribeError(reason.clone())),
        Value::Array(arr) => Ok(ShapeDisplay(arr.shape()).to_string()),
        Value::Map(map) => Ok(format!("length: {}", map.len())),
        Value::List(items) => Ok(format!("length: {}", items.len())),
        _ => Ok(String::new()),
    }
}

/// One-line description of a value.
pub fn brief_description(value: &Value) -> Result<String, DescribeError> {
    Ok(match value {
        Value::Unavailable { reason, .. } => return Err(DescribeError(reason.clone())),
        Value::Array(arr) => arr.dtype().to_string(),
        Value::Str(s) => quote_preview(s, STRING_PREVIEW_CHARS),
        Value::Int(_) | Value::Float(_) | Value::Bool(_) => {
            truncate_chars(&scalar_literal(value), NUMBER_PREVIEW_CHARS)
        },
        Value::Bytes(bytes) => format!("{} bytes", bytes.len()),
        Value::List(items) => format!("{} items", items.len()),
        Value::Map(map) => format!("{} keys", map.len()),
        Value::Null | Value::Object(_) => String::new(),
    })
}

/// Literal text of a scalar, as a language REPL would print it.
pub fn scalar_literal(value: &Value) -> String {
    match value {
        Value::Null => "None".to_string(),
        Value::Bool(b) => if *b { "True" } else { "False" }.to_string(),
        Value::Int(i) => i.to_string(),
        Value::Float(f) => float_literal(*f),
        Value::Str(s) => s.clone(),
        Value::Bytes(bytes) => format!("<{} bytes>", bytes.len()),
        Value::Array(arr) => arr
            .scalar()
            .map(|v| scalar_literal(&v))
            .unwrap_or_else(|| format!("ndarray{}", ShapeDisplay(arr.shape()))),
        Value::Unavailable { type_name, .. } => format!("<unavailable {}>", type_name),
        Value::List(_) | Value::Map(_) | Value::Object(_) => value.type_name().to_string(),
    }
}

fn float_literal(v: f64) -> String {
    if v.is_nan() {
        "nan".to_string()
    } else if v.is_infinite() {
        if v > 0.0 { "inf" } else { "-inf" }.to_string()
    } else if v.fract() == 0.0 && v.abs() < 1e16 {
        format!("{:.1}", v)
    } else {
        v.to_string()
    }
}

/// `"text"` or `"first 30 chars..."`.
pub fn quote_preview(s: &str, max_chars: usize) -> String {
    if s.chars().count() > max_chars {
        let head: String = s.chars().take(max_chars).collect();
        format!("\"{}...\"", head)
    } else {
        format!("\"{}\"", s)
    }
}

/// Keep at most `max_chars` characters.
pub fn truncate_chars(s: &str, max_chars: usize) -> String {
    match s.char_indices().nth(max_chars) {
        Some((cut, _)) => s[..cut].to_string(),
        None => s.to_string(),
    }
}

/// Estimate the characters a full textual dump of `value` would take.
///
/// The walk stops as soon as the estimate reaches `budget`, and arrays are
/// sized from their shape, so the cost is bounded by the budget rather than
/// by the value.
pub fn text_size_estimate(value: &Value, budget: usize) -> usize {
    let mut total = 0;
    estimate_into(value, budget, &mut total);
    total
}

fn estimate_into(value: &Value, budget: usize, total: &mut usize) {
    if *total >= budget {
        return;
    }
    match value {
        Value::Null => *total += 4,
        Value::Bool(_) => *total += 5,
        Value::Int(i) => *total += i.to_string().len(),
        Value::Float(_) => *total += 10,
        Value::Str(s) => *total += s.len() + 2,
        Value::Bytes(b) => *total = total.saturating_add(b.len().saturating_mul(4) + 3),
        Value::List(items) => {
            *total += 2;
            for item in items.iter() {
                if *total >= budget {
                    return;
                }
                estimate_into(item, budget, total);
                *total += 2;
            }
        },
        Value::Map(map) => {
            *total += 2;
            for (key, item) in map.iter() {
                if *total >= budget {
                    return;
                }
                *total += key.len() + 4;
                estimate_into(item, budget, total);
            }
        },
        Value::Object(obj) => {
            *total += obj.type_name().len() + 2;
            for (name, item) in obj.fields() {
                if *total >= budget {
                    return;
                }
                *total += name.len() + 1;
                estimate_into(item, budget, total);
            }
        },
        Value::Array(arr) => {
            let per_element = arr.dtype().len().max(4) + 1;
            *total = total.saturating_add(arr.len().saturating_mul(per_element) + 2);
        },
        Value::Unavailable { reason, .. } => *total += reason.len(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::value::{Fields, NdArray, Object};

    #[test]
    fn classification_precedence() {
        let arr = Value::Array(NdArray::from_f64(&[2], vec![1.0, 2.0]).unwrap());
        assert_eq!(classify(&arr), ShapeKind::NDArray);
        assert_eq!(classify(&Value::map(Fields::new())), ShapeKind::Mapping);
        assert_eq!(classify(&Value::list(vec![])), ShapeKind::Sequence);
        assert_eq!(classify(&Value::from("abc")), ShapeKind::Scalar);

        let mut fields = Fields::new();
        fields.insert("x".into(), Value::Int(1));
        assert_eq!(classify(&Object::new("Point", fields).into()), ShapeKind::Opaque);
        assert_eq!(
            classify(&Object::new("Empty", Fields::new()).into()),
            ShapeKind::Scalar
        );
    }

    #[test]
    fn zero_dimensional_array_is_scalar() {
        let arr = NdArray::from_f64(&[], vec![4.5]).unwrap();
        assert_eq!(classify(&Value::Array(arr.clone())), ShapeKind::Scalar);
        assert_eq!(scalar_literal(&Value::Array(arr)), "4.5");
    }

    #[test]
    fn size_descriptors() {
        let arr = Value::Array(NdArray::from_f64(&[3, 4], vec![0.0; 12]).unwrap());
        assert_eq!(size_descriptor(&arr).unwrap(), "(3, 4)");
        assert_eq!(
            size_descriptor(&Value::list(vec![Value::Null; 3])).unwrap(),
            "length: 3"
        );
        assert_eq!(size_descriptor(&Value::Int(3)).unwrap(), "");
        assert!(size_descriptor(&Value::unavailable("char", "no decoder")).is_err());
    }

    #[test]
    fn descriptions() {
        let long = "x".repeat(40);
        assert_eq!(
            brief_description(&Value::from(long.as_str())).unwrap(),
            format!("\"{}...\"", "x".repeat(30))
        );
        assert_eq!(brief_description(&Value::from("hi")).unwrap(), "\"hi\"");
        assert_eq!(brief_description(&Value::Float(2.0)).unwrap(), "2.0");
        assert_eq!(
            brief_description(&Value::list(vec![Value::Null; 2])).unwrap(),
            "2 items"
        );
        assert_eq!(
            brief_description(&Value::map_from([("a", Value::Null)])).unwrap(),
            "1 keys"
        );
    }

    #[test]
    fn size_estimate_stops_at_budget() {
        let big = Value::list(vec![Value::from("abcdefgh"); 100_000]);
        let estimate = text_size_estimate(&big, 1_000);
        assert!(estimate >= 1_000);
        assert!(estimate < 1_100);
    }

    #[test]
    fn array_estimate_uses_shape() {
        let arr = Value::Array(NdArray::from_f64(&[1000, 1000], vec![0.0; 1_000_000]).unwrap());
        assert!(text_size_estimate(&arr, 10_000) > 10_000);
    }
}
