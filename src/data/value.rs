//! Decoded values.
//!
//! Every loader produces a [`Value`]. Containers are reference-counted so a
//! frame, a table cell or a tree node can hold a sub-value without copying
//! it, and arrays index into shared storage instead of slicing it out.

use crate::error::PathError;
use indexmap::IndexMap;
use ndarray::{ArrayD, IxDyn};
use std::fmt;
use std::sync::Arc;

/// Ordered named entries of a mapping or an object.
pub type Fields = IndexMap<String, Value>;

/// A decoded value of any shape.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Absent value (JSON `null`, YAML `~`, pickle `None`).
    Null,
    /// Boolean.
    Bool(bool),
    /// Signed integer.
    Int(i64),
    /// Floating point number.
    Float(f64),
    /// Text.
    Str(String),
    /// Raw bytes.
    Bytes(Arc<[u8]>),
    /// Ordered, index-addressed sequence.
    List(Arc<Vec<Value>>),
    /// Ordered key/value mapping with unique keys.
    Map(Arc<Fields>),
    /// N-dimensional array with a dtype.
    Array(NdArray),
    /// Object with declared named fields.
    Object(Object),
    /// An entry the decoder found but could not decode.
    Unavailable {
        /// What the entry would have been.
        type_name: String,
        /// Why it could not be decoded.
        reason: String,
    },
}

impl Value {
    /// Build a list value.
    pub fn list(items: Vec<Value>) -> Self {
        Value::List(Arc::new(items))
    }

    /// Build a mapping value.
    pub fn map(fields: Fields) -> Self {
        Value::Map(Arc::new(fields))
    }

    /// Build a mapping from `(key, value)` pairs, keeping their order.
    pub fn map_from<K, I>(entries: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, Value)>,
    {
        Value::map(entries.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    /// Build a placeholder for an entry that failed to decode.
    pub fn unavailable(type_name: impl Into<String>, reason: impl Into<String>) -> Self {
        Value::Unavailable {
            type_name: type_name.into(),
            reason: reason.into(),
        }
    }

    /// Runtime type name shown next to nodes.
    pub fn type_name(&self) -> &str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Str(_) => "str",
            Value::Bytes(_) => "bytes",
            Value::List(_) => "list",
            Value::Map(_) => "dict",
            Value::Array(_) => "ndarray",
            Value::Object(obj) => obj.type_name(),
            Value::Unavailable { type_name, .. } => type_name,
        }
    }

    /// Borrow as an array.
    pub fn as_array(&self) -> Option<&NdArray> {
        match self {
            Value::Array(arr) => Some(arr),
            _ => None,
        }
    }

    /// Borrow as a mapping.
    pub fn as_map(&self) -> Option<&Fields> {
        match self {
            Value::Map(map) => Some(map),
            _ => None,
        }
    }

    /// Borrow as a list.
    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    /// Borrow as a string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Str(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Str(v)
    }
}

impl From<NdArray> for Value {
    fn from(v: NdArray) -> Self {
        Value::Array(v)
    }
}

impl From<Object> for Value {
    fn from(v: Object) -> Self {
        Value::Object(v)
    }
}

/// An object exposing named fields (the opaque shape).
#[derive(Debug, Clone, PartialEq)]
pub struct Object {
    type_name: String,
    fields: Arc<Fields>,
}

impl Object {
    /// Create an object from its type name and declared fields.
    pub fn new(type_name: impl Into<String>, fields: Fields) -> Self {
        Self {
            type_name: type_name.into(),
            fields: Arc::new(fields),
        }
    }

    /// Type name of the object.
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Declared fields in declaration order.
    pub fn fields(&self) -> &Fields {
        &self.fields
    }

    /// Look up a field by name.
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }
}

/// Typed element storage behind an [`NdArray`].
#[derive(Debug, Clone, PartialEq)]
pub enum ArrayData {
    /// Boolean elements.
    Bool(ArrayD<bool>),
    /// Signed integer elements.
    Int(ArrayD<i64>),
    /// Unsigned integer elements.
    UInt(ArrayD<u64>),
    /// Floating point elements.
    Float(ArrayD<f64>),
    /// Text elements.
    Text(ArrayD<String>),
}

impl ArrayData {
    /// Shape of the whole storage.
    pub fn shape(&self) -> &[usize] {
        match self {
            ArrayData::Bool(a) => a.shape(),
            ArrayData::Int(a) => a.shape(),
            ArrayData::UInt(a) => a.shape(),
            ArrayData::Float(a) => a.shape(),
            ArrayData::Text(a) => a.shape(),
        }
    }

    /// Element at a full index, as a scalar value.
    pub fn get(&self, index: &[usize]) -> Option<Value> {
        let ix = IxDyn(index);
        match self {
            ArrayData::Bool(a) => a.get(ix).map(|v| Value::Bool(*v)),
            ArrayData::Int(a) => a.get(ix).map(|v| Value::Int(*v)),
            ArrayData::UInt(a) => a.get(ix).map(|&v| match i64::try_from(v) {
                Ok(i) => Value::Int(i),
                Err(_) => Value::Float(v as f64),
            }),
            ArrayData::Float(a) => a.get(ix).map(|v| Value::Float(*v)),
            ArrayData::Text(a) => a.get(ix).map(|v| Value::Str(v.clone())),
        }
    }

    /// Element at a full index, formatted for display.
    pub fn format(&self, index: &[usize]) -> Option<String> {
        let ix = IxDyn(index);
        match self {
            ArrayData::Bool(a) => a.get(ix).map(|v| if *v { "True" } else { "False" }.to_string()),
            ArrayData::Int(a) => a.get(ix).map(|v| v.to_string()),
            ArrayData::UInt(a) => a.get(ix).map(|v| v.to_string()),
            ArrayData::Float(a) => a.get(ix).map(|v| format_float(*v)),
            ArrayData::Text(a) => a.get(ix).map(|v| format!("'{}'", v)),
        }
    }

    /// Default dtype name for the storage kind.
    pub fn default_dtype(&self) -> &'static str {
        match self {
            ArrayData::Bool(_) => "bool",
            ArrayData::Int(_) => "int64",
            ArrayData::UInt(_) => "uint64",
            ArrayData::Float(_) => "float64",
            ArrayData::Text(_) => "object",
        }
    }
}

/// Format a float the way array printers do: integral values keep a trailing dot.
pub fn format_float(v: f64) -> String {
    if v.is_nan() {
        "nan".to_string()
    } else if v.is_infinite() {
        if v > 0.0 { "inf" } else { "-inf" }.to_string()
    } else if v.fract() == 0.0 && v.abs() < 1e16 {
        format!("{}.", v)
    } else {
        let abs = v.abs();
        if !(1e-4..1e16).contains(&abs) {
            format!("{:e}", v)
        } else {
            format!("{}", v)
        }
    }
}

/// An N-dimensional array: a dtype, shared storage and the index prefix of this view.
#[derive(Debug, Clone, PartialEq)]
pub struct NdArray {
    dtype: Arc<str>,
    data: Arc<ArrayData>,
    origin: Vec<usize>,
}

impl NdArray {
    /// Wrap storage with an explicit dtype name (e.g. `float32`, `<i4`).
    pub fn new(dtype: impl Into<Arc<str>>, data: ArrayData) -> Self {
        Self {
            dtype: dtype.into(),
            data: Arc::new(data),
            origin: Vec::new(),
        }
    }

    /// Wrap storage using the storage kind's default dtype name.
    pub fn from_data(data: ArrayData) -> Self {
        let dtype = data.default_dtype();
        Self::new(dtype, data)
    }

    /// Convenience constructor for float arrays.
    pub fn from_f64(shape: &[usize], values: Vec<f64>) -> Option<Self> {
        ArrayD::from_shape_vec(IxDyn(shape), values)
            .ok()
            .map(|a| Self::from_data(ArrayData::Float(a)))
    }

    /// Convenience constructor for integer arrays.
    pub fn from_i64(shape: &[usize], values: Vec<i64>) -> Option<Self> {
        ArrayD::from_shape_vec(IxDyn(shape), values)
            .ok()
            .map(|a| Self::from_data(ArrayData::Int(a)))
    }

    /// Element dtype name.
    pub fn dtype(&self) -> &str {
        &self.dtype
    }

    /// Shape of this view.
    pub fn shape(&self) -> &[usize] {
        &self.data.shape()[self.origin.len()..]
    }

    /// Number of dimensions of this view.
    pub fn ndim(&self) -> usize {
        self.shape().len()
    }

    /// Total number of elements in this view.
    pub fn len(&self) -> usize {
        self.shape().iter().product()
    }

    /// Whether the view has no elements.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Shared storage.
    pub fn data(&self) -> &ArrayData {
        &self.data
    }

    fn full_index(&self, index: &[usize]) -> Vec<usize> {
        let mut full = Vec::with_capacity(self.origin.len() + index.len());
        full.extend_from_slice(&self.origin);
        full.extend_from_slice(index);
        full
    }

    /// Element at an index relative to this view (one index per dimension).
    pub fn get(&self, index: &[usize]) -> Option<Value> {
        if index.len() != self.ndim() {
            return None;
        }
        self.data.get(&self.full_index(index))
    }

    /// Element text at an index relative to this view.
    pub fn format_at(&self, index: &[usize]) -> Option<String> {
        if index.len() != self.ndim() {
            return None;
        }
        self.data.format(&self.full_index(index))
    }

    /// The only element of a zero-dimensional view.
    pub fn scalar(&self) -> Option<Value> {
        self.get(&[])
    }

    /// Index into the array. A full index yields an element, a partial index a sub-array view.
    pub fn index(&self, indices: &[usize]) -> Result<Value, PathError> {
        let shape = self.shape();
        if indices.len() > shape.len() {
            return Err(PathError::TooManyIndices {
                given: indices.len(),
                ndim: shape.len(),
            });
        }
        for (axis, (&index, &len)) in indices.iter().zip(shape).enumerate() {
            if index >= len {
                return Err(PathError::OutOfRange { index, axis, len });
            }
        }

        let origin = self.full_index(indices);
        if indices.len() == shape.len() {
            // Bounds were checked above.
            return self.data.get(&origin).ok_or(PathError::OutOfRange {
                index: indices.last().copied().unwrap_or(0),
                axis: indices.len().saturating_sub(1),
                len: 0,
            });
        }
        Ok(Value::Array(Self {
            dtype: Arc::clone(&self.dtype),
            data: Arc::clone(&self.data),
            origin,
        }))
    }

    /// Whether elements are numeric.
    pub fn is_numeric(&self) -> bool {
        matches!(
            *self.data,
            ArrayData::Int(_) | ArrayData::UInt(_) | ArrayData::Float(_)
        )
    }

    /// Min, max and mean of the whole storage, skipped when it holds more than `max_elements`.
    pub fn summary(&self, max_elements: usize) -> Option<(f64, f64, f64)> {
        if !self.origin.is_empty() || self.len() == 0 || self.len() > max_elements {
            return None;
        }
        let values: Box<dyn Iterator<Item = f64> + '_> = match &*self.data {
            ArrayData::Int(a) => Box::new(a.iter().map(|&v| v as f64)),
            ArrayData::UInt(a) => Box::new(a.iter().map(|&v| v as f64)),
            ArrayData::Float(a) => Box::new(a.iter().copied()),
            ArrayData::Bool(_) | ArrayData::Text(_) => return None,
        };

        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;
        let mut sum = 0.0f64;
        let mut count = 0usize;
        for v in values.filter(|v| v.is_finite()) {
            min = min.min(v);
            max = max.max(v);
            sum += v;
            count += 1;
        }
        (count > 0).then(|| (min, max, sum / count as f64))
    }
}

/// Convert a flat position into a C-order multi-index for `shape`.
pub fn unravel(mut flat: usize, shape: &[usize]) -> Vec<usize> {
    let mut index = vec![0; shape.len()];
    for (slot, &len) in index.iter_mut().zip(shape).rev() {
        if len == 0 {
            continue;
        }
        *slot = flat % len;
        flat /= len;
    }
    index
}

/// Python-style shape tuple text: `(5,)`, `(3, 4)`, `()`.
pub struct ShapeDisplay<'a>(pub &'a [usize]);

impl fmt::Display for ShapeDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            [] => write!(f, "()"),
            [one] => write!(f, "({},)", one),
            dims => {
                write!(f, "(")?;
                for (i, d) in dims.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", d)?;
                }
                write!(f, ")")
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cube() -> NdArray {
        NdArray::from_i64(&[5, 5, 5], (0..125).collect()).unwrap()
    }

    #[test]
    fn partial_index_yields_shared_view() {
        let arr = cube();
        let sub = arr.index(&[2, 3]).unwrap();
        let sub = sub.as_array().unwrap();
        assert_eq!(sub.shape(), &[5]);
        assert_eq!(sub.get(&[0]), Some(Value::Int(65)));
        assert!(Arc::ptr_eq(&sub.data, &arr.data));
    }

    #[test]
    fn full_index_yields_element() {
        assert_eq!(cube().index(&[1, 2, 3]).unwrap(), Value::Int(38));
    }

    #[test]
    fn index_errors() {
        let arr = cube();
        assert_eq!(
            arr.index(&[5]),
            Err(PathError::OutOfRange { index: 5, axis: 0, len: 5 })
        );
        assert_eq!(
            arr.index(&[0, 0, 0, 0]),
            Err(PathError::TooManyIndices { given: 4, ndim: 3 })
        );
    }

    #[test]
    fn unravel_is_c_order() {
        assert_eq!(unravel(7, &[2, 3, 2]), vec![1, 0, 1]);
        assert_eq!(unravel(0, &[4]), vec![0]);
    }

    #[test]
    fn shape_display_matches_tuple_text() {
        assert_eq!(ShapeDisplay(&[5]).to_string(), "(5,)");
        assert_eq!(ShapeDisplay(&[5, 5, 5]).to_string(), "(5, 5, 5)");
        assert_eq!(ShapeDisplay(&[]).to_string(), "()");
    }

    #[test]
    fn summary_is_bounded() {
        let arr = NdArray::from_f64(&[4], vec![1.0, 2.0, f64::NAN, 3.0]).unwrap();
        assert_eq!(arr.summary(10), Some((1.0, 3.0, 2.0)));
        assert_eq!(arr.summary(3), None);
    }

    #[test]
    fn floats_format_like_array_printers() {
        assert_eq!(format_float(2.0), "2.");
        assert_eq!(format_float(0.5), "0.5");
        assert_eq!(format_float(f64::NAN), "nan");
    }
}
