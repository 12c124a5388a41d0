//! Delimited tables. Each column becomes a 1-D array with an inferred dtype.

use super::{decode_error, Decoded};
use crate::data::{ArrayData, Fields, Metadata, NdArray, Value};
use crate::error::Result;
use crate::util::limits::LoaderConfig;
use ndarray::{ArrayD, IxDyn};
use std::path::Path;

pub(super) fn load_csv(path: &Path, _config: &LoaderConfig) -> Result<Decoded> {
    read_table(path, b',', "csv")
}

pub(super) fn load_tsv(path: &Path, _config: &LoaderConfig) -> Result<Decoded> {
    read_table(path, b'\t', "tsv")
}

fn read_table(path: &Path, delimiter: u8, kind: &str) -> Result<Decoded> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .from_path(path)
        .map_err(decode_error(path))?;

    let headers = unique_headers(reader.headers().map_err(decode_error(path))?);
    let mut columns: Vec<Vec<String>> = vec![Vec::new(); headers.len()];
    for record in reader.records() {
        let record = record.map_err(decode_error(path))?;
        for (i, column) in columns.iter_mut().enumerate() {
            column.push(record.get(i).unwrap_or("").to_string());
        }
    }
    let rows = columns.first().map_or(0, Vec::len);

    let mut table = Fields::new();
    let mut dtypes = Vec::with_capacity(headers.len());
    for (name, cells) in headers.iter().zip(columns) {
        let array = infer_column(cells);
        dtypes.push(format!("{}: {}", name, array.dtype()));
        table.insert(name.clone(), Value::Array(array));
    }

    let mut metadata = Metadata::new().with("type", kind);
    metadata.insert_shape("shape", &[rows, headers.len()]);
    metadata.insert("columns", headers);
    metadata.insert("dtypes", dtypes);
    tracing::debug!("Read {} rows from {}", rows, path.display());
    Ok(Decoded::new(Value::map(table), metadata))
}

/// Header names with duplicates suffixed `.1`, `.2`, ...
fn unique_headers(record: &csv::StringRecord) -> Vec<String> {
    let mut seen: Vec<String> = Vec::with_capacity(record.len());
    for (i, raw) in record.iter().enumerate() {
        let base = if raw.is_empty() {
            format!("Unnamed: {}", i)
        } else {
            raw.to_string()
        };
        let mut name = base.clone();
        let mut n = 1;
        while seen.contains(&name) {
            name = format!("{}.{}", base, n);
            n += 1;
        }
        seen.push(name);
    }
    seen
}

/// Pick the narrowest dtype every cell fits: int64, float64, bool, then object.
///
/// Empty cells are missing values. They force an integer column to float64
/// (as NaN) and keep a text column as empty strings.
fn infer_column(cells: Vec<String>) -> NdArray {
    let shape = IxDyn(&[cells.len()]);
    let present = || cells.iter().map(|c| c.trim()).filter(|c| !c.is_empty());
    let has_missing = cells.iter().any(|c| c.trim().is_empty());

    if present().all(|c| c.parse::<i64>().is_ok()) && !has_missing && !cells.is_empty() {
        let values = cells.iter().map(|c| c.trim().parse().unwrap_or(0)).collect();
        if let Ok(array) = ArrayD::from_shape_vec(shape.clone(), values) {
            return NdArray::from_data(ArrayData::Int(array));
        }
    }
    if present().all(|c| c.parse::<f64>().is_ok()) {
        let values = cells
            .iter()
            .map(|c| c.trim().parse().unwrap_or(f64::NAN))
            .collect();
        if let Ok(array) = ArrayD::from_shape_vec(shape.clone(), values) {
            return NdArray::from_data(ArrayData::Float(array));
        }
    }
    if !has_missing && present().all(|c| parse_bool(c).is_some()) {
        let values = cells.iter().map(|c| parse_bool(c).unwrap_or(false)).collect();
        if let Ok(array) = ArrayD::from_shape_vec(shape.clone(), values) {
            return NdArray::from_data(ArrayData::Bool(array));
        }
    }

    let len = cells.len();
    let array = ArrayD::from_shape_vec(shape, cells)
        .unwrap_or_else(|_| ArrayD::from_elem(IxDyn(&[len]), String::new()));
    NdArray::from_data(ArrayData::Text(array))
}

fn parse_bool(cell: &str) -> Option<bool> {
    match cell.trim().to_ascii_lowercase().as_str() {
        "true" => Some(true),
        "false" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(name: &str, text: &str) -> (tempfile::TempDir, std::path::PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(name);
        std::fs::write(&path, text).unwrap();
        (dir, path)
    }

    #[test]
    fn columns_get_inferred_dtypes() {
        let (_dir, path) = write(
            "t.csv",
            "id,score,flag,name\n1,0.5,true,ann\n2,,False,bob\n3,2,true,\n",
        );
        let decoded = load_csv(&path, &LoaderConfig::default()).unwrap();
        let table = decoded.value.as_map().unwrap();

        assert_eq!(table["id"].as_array().unwrap().dtype(), "int64");
        assert_eq!(table["score"].as_array().unwrap().dtype(), "float64");
        assert_eq!(table["flag"].as_array().unwrap().dtype(), "bool");
        assert_eq!(table["name"].as_array().unwrap().dtype(), "object");

        let score = table["score"].as_array().unwrap();
        assert!(matches!(score.get(&[1]), Some(Value::Float(v)) if v.is_nan()));
        assert_eq!(decoded.metadata.get("shape").unwrap().to_string(), "(3, 4)");
        assert_eq!(decoded.metadata.get("type").unwrap().to_string(), "csv");
    }

    #[test]
    fn tsv_uses_tabs() {
        let (_dir, path) = write("t.tsv", "a\tb\n1\tx\n");
        let decoded = load_tsv(&path, &LoaderConfig::default()).unwrap();
        let table = decoded.value.as_map().unwrap();
        assert_eq!(table.keys().collect::<Vec<_>>(), ["a", "b"]);
        assert_eq!(table["b"].as_array().unwrap().get(&[0]), Some(Value::from("x")));
    }

    #[test]
    fn duplicate_headers_are_renamed() {
        let (_dir, path) = write("d.csv", "x,x,\n1,2,3\n");
        let decoded = load_csv(&path, &LoaderConfig::default()).unwrap();
        let keys: Vec<&String> = decoded.value.as_map().unwrap().keys().collect();
        assert_eq!(keys, ["x", "x.1", "Unnamed: 2"]);
    }
}
