//! NumPy `.npy` arrays and `.npz` archives.

use super::{decode_error, describe_array, Decoded};
use crate::data::{ArrayData, Fields, Metadata, NdArray, Value};
use crate::error::Result;
use crate::util::limits::LoaderConfig;
use ndarray::{ArrayD, IxDyn, ShapeBuilder};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use thiserror::Error;

const MAGIC: &[u8] = b"\x93NUMPY";

/// Why an `.npy` payload could not be decoded.
#[derive(Debug, Error)]
pub enum NpyError {
    #[error("not a NumPy file (bad magic string)")]
    BadMagic,

    #[error("unsupported .npy format version {0}.{1}")]
    Version(u8, u8),

    #[error("file is truncated")]
    Truncated,

    #[error("malformed header: {0}")]
    Header(String),

    #[error("object arrays cannot be decoded safely")]
    ObjectArray,

    #[error("unsupported dtype '{0}'")]
    UnsupportedDtype(String),
}

/// Parsed `.npy` header.
#[derive(Debug, Clone, PartialEq)]
struct NpyHeader {
    descr: String,
    fortran_order: bool,
    shape: Vec<usize>,
    data_offset: usize,
}

pub(super) fn load_npy(path: &Path, _config: &LoaderConfig) -> Result<Decoded> {
    let bytes = std::fs::read(path).map_err(decode_error(path))?;
    let array = parse_npy(&bytes).map_err(decode_error(path))?;

    let mut metadata = Metadata::new().with("type", "numpy_array");
    describe_array(&mut metadata, &array);
    Ok(Decoded::new(Value::Array(array), metadata))
}

pub(super) fn load_npz(path: &Path, _config: &LoaderConfig) -> Result<Decoded> {
    let file = File::open(path).map_err(decode_error(path))?;
    let mut archive = zip::ZipArchive::new(BufReader::new(file)).map_err(decode_error(path))?;

    let mut arrays = Fields::new();
    let mut metadata = Metadata::new().with("type", "numpy_archive");
    let mut details = Metadata::new();
    for i in 0..archive.len() {
        let mut entry = archive.by_index(i).map_err(decode_error(path))?;
        if entry.is_dir() {
            continue;
        }
        let name = entry.name().to_string();
        let key = name.strip_suffix(".npy").unwrap_or(&name).to_string();

        let mut bytes = Vec::with_capacity(entry.size() as usize);
        entry.read_to_end(&mut bytes).map_err(decode_error(path))?;
        let array = parse_npy(&bytes).map_err(|e| {
            crate::error::DeepviewError::decode(path, format!("array '{}': {}", key, e))
        })?;
        tracing::debug!("npz member {} shape {:?}", key, array.shape());
        details.insert_shape(format!("{}_shape", key), array.shape());
        details.insert(format!("{}_dtype", key), array.dtype());
        arrays.insert(key, Value::Array(array));
    }

    let names: Vec<String> = arrays.keys().cloned().collect();
    metadata.insert("arrays_count", names.len());
    metadata.insert("array_names", names);
    for (key, value) in details.iter() {
        metadata.insert(key, value.clone());
    }
    Ok(Decoded::new(Value::map(arrays), metadata))
}

/// Decode a complete `.npy` payload.
pub fn parse_npy(bytes: &[u8]) -> std::result::Result<NdArray, NpyError> {
    let header = parse_header(bytes)?;
    let dtype = Dtype::parse(&header.descr)?;
    let count = header
        .shape
        .iter()
        .try_fold(1usize, |acc, &dim| acc.checked_mul(dim))
        .ok_or_else(|| NpyError::Header("shape is too large".into()))?;

    let needed = count
        .checked_mul(dtype.item_size)
        .ok_or_else(|| NpyError::Header("shape is too large".into()))?;
    let data = bytes
        .get(header.data_offset..)
        .filter(|data| data.len() >= needed)
        .ok_or(NpyError::Truncated)?;

    let shape = IxDyn(&header.shape).set_f(header.fortran_order);
    let big = dtype.big_endian;

    macro_rules! numbers {
        ($ty:ty, $n:literal) => {
            elements::<$n, $ty>(data, count, |b| {
                if big {
                    <$ty>::from_be_bytes(b)
                } else {
                    <$ty>::from_le_bytes(b)
                }
            })
        };
    }

    let storage = match (dtype.kind, dtype.item_size) {
        ('b', 1) => ArrayData::Bool(build(shape, data[..count].iter().map(|&b| b != 0).collect())?),
        ('i', 1) => ArrayData::Int(build(shape, data[..count].iter().map(|&b| b as i8 as i64).collect())?),
        ('i', 2) => ArrayData::Int(build(shape, widen(numbers!(i16, 2)))?),
        ('i', 4) => ArrayData::Int(build(shape, widen(numbers!(i32, 4)))?),
        ('i', 8) => ArrayData::Int(build(shape, numbers!(i64, 8))?),
        ('u', 1) => ArrayData::UInt(build(shape, data[..count].iter().map(|&b| b as u64).collect())?),
        ('u', 2) => ArrayData::UInt(build(shape, widen(numbers!(u16, 2)))?),
        ('u', 4) => ArrayData::UInt(build(shape, widen(numbers!(u32, 4)))?),
        ('u', 8) => ArrayData::UInt(build(shape, numbers!(u64, 8))?),
        ('f', 2) => {
            let bits = numbers!(u16, 2);
            let values = bits.into_iter().map(|b| half::f16::from_bits(b).to_f64()).collect();
            ArrayData::Float(build(shape, values)?)
        },
        ('f', 4) => ArrayData::Float(build(shape, widen(numbers!(f32, 4)))?),
        ('f', 8) => ArrayData::Float(build(shape, numbers!(f64, 8))?),
        ('U', size) => {
            let chars = size / 4;
            let code_points = elements::<4, u32>(data, count * chars, |b| {
                if big {
                    u32::from_be_bytes(b)
                } else {
                    u32::from_le_bytes(b)
                }
            });
            let values = code_points
                .chunks(chars.max(1))
                .take(count)
                .map(|chunk| {
                    chunk
                        .iter()
                        .take_while(|&&c| c != 0)
                        .map(|&c| char::from_u32(c).unwrap_or(char::REPLACEMENT_CHARACTER))
                        .collect::<String>()
                })
                .collect();
            ArrayData::Text(build(shape, values)?)
        },
        ('S', size) => {
            let values = data
                .chunks(size.max(1))
                .take(count)
                .map(|chunk| {
                    let end = chunk.iter().position(|&b| b == 0).unwrap_or(chunk.len());
                    String::from_utf8_lossy(&chunk[..end]).into_owned()
                })
                .collect();
            ArrayData::Text(build(shape, values)?)
        },
        _ => return Err(NpyError::UnsupportedDtype(header.descr)),
    };

    Ok(NdArray::new(dtype.name(&header.descr), storage))
}

fn parse_header(bytes: &[u8]) -> std::result::Result<NpyHeader, NpyError> {
    if bytes.len() < 10 {
        return Err(if bytes.starts_with(MAGIC) || MAGIC.starts_with(bytes) {
            NpyError::Truncated
        } else {
            NpyError::BadMagic
        });
    }
    if &bytes[..6] != MAGIC {
        return Err(NpyError::BadMagic);
    }

    let (major, minor) = (bytes[6], bytes[7]);
    let (header_len, start) = match major {
        1 => (u16::from_le_bytes([bytes[8], bytes[9]]) as usize, 10),
        2 | 3 => {
            let raw = bytes.get(8..12).ok_or(NpyError::Truncated)?;
            (u32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]) as usize, 12)
        },
        _ => return Err(NpyError::Version(major, minor)),
    };

    let raw = bytes
        .get(start..start + header_len)
        .ok_or(NpyError::Truncated)?;
    let text = std::str::from_utf8(raw).map_err(|e| NpyError::Header(e.to_string()))?;

    let descr_field = dict_field(text, "descr")?;
    if descr_field.starts_with('[') {
        return Err(NpyError::UnsupportedDtype("structured".into()));
    }
    let descr = quoted(descr_field)?;

    let fortran_order = dict_field(text, "fortran_order")?.starts_with("True");

    let shape_field = dict_field(text, "shape")?;
    let close = shape_field
        .find(')')
        .ok_or_else(|| NpyError::Header("unterminated shape".into()))?;
    let shape = shape_field[..close]
        .trim_start_matches('(')
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| s.trim_end_matches('L').parse::<usize>())
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| NpyError::Header(format!("bad shape: {}", e)))?;

    Ok(NpyHeader {
        descr,
        fortran_order,
        shape,
        data_offset: start + header_len,
    })
}

/// Text following `'key':` in the header dict.
fn dict_field<'a>(text: &'a str, key: &str) -> std::result::Result<&'a str, NpyError> {
    [format!("'{}'", key), format!("\"{}\"", key)]
        .iter()
        .find_map(|needle| text.find(needle.as_str()).map(|at| at + needle.len()))
        .and_then(|after| {
            let rest = text[after..].trim_start();
            rest.strip_prefix(':').map(str::trim_start)
        })
        .ok_or_else(|| NpyError::Header(format!("missing '{}'", key)))
}

fn quoted(field: &str) -> std::result::Result<String, NpyError> {
    let quote = field
        .chars()
        .next()
        .filter(|c| *c == '\'' || *c == '"')
        .ok_or_else(|| NpyError::Header("descr is not a string".into()))?;
    let body = &field[1..];
    let end = body
        .find(quote)
        .ok_or_else(|| NpyError::Header("unterminated descr".into()))?;
    Ok(body[..end].to_string())
}

#[derive(Debug, Clone, Copy)]
struct Dtype {
    big_endian: bool,
    kind: char,
    item_size: usize,
}

impl Dtype {
    fn parse(descr: &str) -> std::result::Result<Self, NpyError> {
        let mut chars = descr.chars();
        let (order, kind) = match chars.next() {
            Some(c @ ('<' | '>' | '|' | '=')) => (c, chars.next()),
            other => ('=', other),
        };
        let kind = kind.ok_or_else(|| NpyError::UnsupportedDtype(descr.to_string()))?;
        if kind == 'O' {
            return Err(NpyError::ObjectArray);
        }
        let size: usize = chars
            .as_str()
            .parse()
            .map_err(|_| NpyError::UnsupportedDtype(descr.to_string()))?;
        let item_size = if kind == 'U' {
            size
                .checked_mul(4)
                .ok_or_else(|| NpyError::UnsupportedDtype(descr.to_string()))?
        } else {
            size
        };
        if item_size == 0 && kind != 'S' {
            return Err(NpyError::UnsupportedDtype(descr.to_string()));
        }
        Ok(Self {
            big_endian: order == '>',
            kind,
            item_size,
        })
    }

    fn name(&self, descr: &str) -> String {
        match self.kind {
            'b' => "bool".to_string(),
            'i' => format!("int{}", self.item_size * 8),
            'u' => format!("uint{}", self.item_size * 8),
            'f' => format!("float{}", self.item_size * 8),
            _ => descr.to_string(),
        }
    }
}

fn elements<const N: usize, T>(data: &[u8], count: usize, convert: impl Fn([u8; N]) -> T) -> Vec<T> {
    data.chunks_exact(N)
        .take(count)
        .map(|chunk| {
            let mut buf = [0u8; N];
            buf.copy_from_slice(chunk);
            convert(buf)
        })
        .collect()
}

fn widen<T, U: From<T>>(values: Vec<T>) -> Vec<U> {
    values.into_iter().map(U::from).collect()
}

fn build<T>(
    shape: ndarray::Shape<IxDyn>,
    values: Vec<T>,
) -> std::result::Result<ArrayD<T>, NpyError> {
    ArrayD::from_shape_vec(shape, values).map_err(|e| NpyError::Header(e.to_string()))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::io::Write;

    /// Build a version 1.0 `.npy` payload.
    pub(crate) fn npy_bytes(descr: &str, fortran: bool, shape: &[usize], data: &[u8]) -> Vec<u8> {
        let shape_text = match shape {
            [one] => format!("({},)", one),
            dims => format!(
                "({})",
                dims.iter().map(|d| d.to_string()).collect::<Vec<_>>().join(", ")
            ),
        };
        let mut header = format!(
            "{{'descr': '{}', 'fortran_order': {}, 'shape': {}, }}",
            descr,
            if fortran { "True" } else { "False" },
            shape_text
        );
        while (10 + header.len() + 1) % 64 != 0 {
            header.push(' ');
        }
        header.push('\n');

        let mut out = MAGIC.to_vec();
        out.extend_from_slice(&[1, 0]);
        out.extend_from_slice(&(header.len() as u16).to_le_bytes());
        out.extend_from_slice(header.as_bytes());
        out.extend_from_slice(data);
        out
    }

    fn f64_bytes(values: &[f64]) -> Vec<u8> {
        values.iter().flat_map(|v| v.to_le_bytes()).collect()
    }

    #[test]
    fn float_matrix() {
        let bytes = npy_bytes("<f8", false, &[2, 3], &f64_bytes(&[0., 1., 2., 3., 4., 5.]));
        let array = parse_npy(&bytes).unwrap();
        assert_eq!(array.shape(), &[2, 3]);
        assert_eq!(array.dtype(), "float64");
        assert_eq!(array.get(&[1, 0]), Some(Value::Float(3.0)));
    }

    #[test]
    fn fortran_order_is_respected() {
        // Column-major [[0, 1, 2], [3, 4, 5]] is stored as 0 3 1 4 2 5.
        let bytes = npy_bytes("<f8", true, &[2, 3], &f64_bytes(&[0., 3., 1., 4., 2., 5.]));
        let array = parse_npy(&bytes).unwrap();
        assert_eq!(array.get(&[0, 1]), Some(Value::Float(1.0)));
        assert_eq!(array.get(&[1, 2]), Some(Value::Float(5.0)));
    }

    #[test]
    fn big_endian_integers() {
        let data: Vec<u8> = [7i32, -2].iter().flat_map(|v| v.to_be_bytes()).collect();
        let array = parse_npy(&npy_bytes(">i4", false, &[2], &data)).unwrap();
        assert_eq!(array.dtype(), "int32");
        assert_eq!(array.get(&[1]), Some(Value::Int(-2)));
    }

    #[test]
    fn unicode_strings() {
        let mut data = Vec::new();
        for word in ["ab", "xyz"] {
            let mut chars: Vec<u32> = word.chars().map(|c| c as u32).collect();
            chars.resize(3, 0);
            data.extend(chars.iter().flat_map(|c| c.to_le_bytes()));
        }
        let array = parse_npy(&npy_bytes("<U3", false, &[2], &data)).unwrap();
        assert_eq!(array.dtype(), "<U3");
        assert_eq!(array.get(&[0]), Some(Value::from("ab")));
        assert_eq!(array.get(&[1]), Some(Value::from("xyz")));
    }

    #[test]
    fn object_arrays_are_refused() {
        let err = parse_npy(&npy_bytes("|O", false, &[1], &[0; 8])).unwrap_err();
        assert!(matches!(err, NpyError::ObjectArray));
    }

    #[test]
    fn truncated_payload() {
        let bytes = npy_bytes("<f8", false, &[4], &f64_bytes(&[1.0]));
        assert!(matches!(parse_npy(&bytes), Err(NpyError::Truncated)));
        assert!(matches!(parse_npy(b"hello world!"), Err(NpyError::BadMagic)));
    }

    #[test]
    fn oversized_shape_is_a_header_error() {
        let huge = 1usize << (usize::BITS / 2 + 8);
        let bytes = npy_bytes("<f8", false, &[huge, huge], &[]);
        assert!(matches!(parse_npy(&bytes), Err(NpyError::Header(_))));

        let wide = format!("<U{}", usize::MAX);
        let bytes = npy_bytes(&wide, false, &[1], &[]);
        assert!(matches!(parse_npy(&bytes), Err(NpyError::UnsupportedDtype(_))));
    }

    #[test]
    fn npz_members_become_mapping() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bundle.npz");
        {
            let file = File::create(&path).unwrap();
            let mut zip = zip::ZipWriter::new(file);
            let options = zip::write::SimpleFileOptions::default();
            zip.start_file("weights.npy", options).unwrap();
            zip.write_all(&npy_bytes("<f8", false, &[2], &f64_bytes(&[1.5, 2.5])))
                .unwrap();
            zip.start_file("labels.npy", options).unwrap();
            zip.write_all(&npy_bytes("|b1", false, &[3], &[1, 0, 1])).unwrap();
            zip.finish().unwrap();
        }

        let decoded = load_npz(&path, &LoaderConfig::default()).unwrap();
        let map = decoded.value.as_map().unwrap();
        assert_eq!(map.keys().collect::<Vec<_>>(), ["weights", "labels"]);
        assert_eq!(map["labels"].as_array().unwrap().get(&[2]), Some(Value::Bool(true)));
        assert_eq!(decoded.metadata.get("arrays_count").unwrap().to_string(), "2");
        assert_eq!(decoded.metadata.get("weights_shape").unwrap().to_string(), "(2,)");
        assert_eq!(decoded.metadata.get("labels_dtype").unwrap().to_string(), "bool");
    }

    #[test]
    fn npy_metadata_has_statistics() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.npy");
        std::fs::write(&path, npy_bytes("<f8", false, &[3], &f64_bytes(&[1.0, 2.0, 6.0]))).unwrap();
        let decoded = load_npy(&path, &LoaderConfig::default()).unwrap();
        assert_eq!(decoded.metadata.get("shape").unwrap().to_string(), "(3,)");
        assert_eq!(decoded.metadata.get("mean_value").unwrap().to_string(), "3");
    }
}
