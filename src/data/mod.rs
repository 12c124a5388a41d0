//! Decoded data and its structure.
//!
//! This module holds the value model every loader produces, the structural
//! classification used by every other component, and path addressing.

mod document;
pub mod path;
pub mod shape;
mod value;

pub use document::{DecodedDocument, MetaValue, Metadata};
pub use path::{resolve, Path, Segment};
pub use shape::{brief_description, classify, size_descriptor, DescribeError, ShapeKind};
pub use value::{format_float, unravel, ArrayData, Fields, NdArray, Object, ShapeDisplay, Value};
