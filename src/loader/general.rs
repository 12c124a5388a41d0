//! JSON and pickle documents.

use super::{decode_error, top_level_keys, Decoded};
use crate::data::{Fields, Metadata, Value};
use crate::error::{DeepviewError, Result};
use crate::util::limits::LoaderConfig;
use serde_pickle::{DeOptions, HashableValue, Value as PickleValue};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// Keys listed in the metadata of a top-level mapping.
const LISTED_KEYS: usize = 10;

pub(super) fn load_json(path: &Path, _config: &LoaderConfig) -> Result<Decoded> {
    let file = File::open(path).map_err(decode_error(path))?;
    let parsed: serde_json::Value =
        serde_json::from_reader(BufReader::new(file)).map_err(decode_error(path))?;
    let value = from_json(parsed);

    let mut metadata = Metadata::new().with("type", "json").with("encoding", "utf-8");
    describe_structure(&mut metadata, &value);
    Ok(Decoded::new(value, metadata))
}

pub(super) fn load_pickle(path: &Path, config: &LoaderConfig) -> Result<Decoded> {
    if !config.allow_pickle {
        tracing::warn!("Refusing to decode pickle {}", path.display());
        return Err(DeepviewError::decode(
            path,
            "pickle decoding is disabled; enable it with --allow-pickle",
        ));
    }

    let file = File::open(path).map_err(decode_error(path))?;
    let parsed = serde_pickle::value_from_reader(BufReader::new(file), DeOptions::new())
        .map_err(decode_error(path))?;
    let value = from_pickle(parsed);

    let mut metadata = Metadata::new().with("type", "pickle");
    metadata.insert("data_type", value.type_name().to_string());
    Ok(Decoded::new(value, metadata))
}

fn describe_structure(metadata: &mut Metadata, value: &Value) {
    if let Some((count, keys)) = top_level_keys(value, LISTED_KEYS) {
        metadata.insert("keys_count", count);
        metadata.insert("top_level_keys", keys);
    } else if let Some(items) = value.as_list() {
        metadata.insert("items_count", items.len());
        if let Some(first) = items.first() {
            metadata.insert("first_item_type", first.type_name().to_string());
        }
    }
}

pub(crate) fn from_json(value: serde_json::Value) -> Value {
    match value {
        serde_json::Value::Null => Value::Null,
        serde_json::Value::Bool(b) => Value::Bool(b),
        serde_json::Value::Number(n) => match n.as_i64() {
            Some(i) => Value::Int(i),
            None => Value::Float(n.as_f64().unwrap_or(f64::NAN)),
        },
        serde_json::Value::String(s) => Value::Str(s),
        serde_json::Value::Array(items) => Value::list(items.into_iter().map(from_json).collect()),
        serde_json::Value::Object(map) => Value::map(
            map.into_iter()
                .map(|(k, v)| (k, from_json(v)))
                .collect::<Fields>(),
        ),
    }
}

fn from_pickle(value: PickleValue) -> Value {
    match value {
        PickleValue::None => Value::Null,
        PickleValue::Bool(b) => Value::Bool(b),
        PickleValue::I64(i) => Value::Int(i),
        PickleValue::Int(big) => Value::Str(big.to_string()),
        PickleValue::F64(f) => Value::Float(f),
        PickleValue::Bytes(bytes) => Value::Bytes(bytes.into()),
        PickleValue::String(s) => Value::Str(s),
        PickleValue::List(items) | PickleValue::Tuple(items) => {
            Value::list(items.into_iter().map(from_pickle).collect())
        },
        PickleValue::Set(items) | PickleValue::FrozenSet(items) => {
            Value::list(items.into_iter().map(from_hashable).collect())
        },
        PickleValue::Dict(entries) => Value::map(
            entries
                .into_iter()
                .map(|(k, v)| (key_text(&k), from_pickle(v)))
                .collect::<Fields>(),
        ),
    }
}

fn from_hashable(value: HashableValue) -> Value {
    match value {
        HashableValue::None => Value::Null,
        HashableValue::Bool(b) => Value::Bool(b),
        HashableValue::I64(i) => Value::Int(i),
        HashableValue::Int(big) => Value::Str(big.to_string()),
        HashableValue::F64(f) => Value::Float(f),
        HashableValue::Bytes(bytes) => Value::Bytes(bytes.into()),
        HashableValue::String(s) => Value::Str(s),
        HashableValue::Tuple(items) => Value::list(items.into_iter().map(from_hashable).collect()),
        HashableValue::FrozenSet(items) => {
            Value::list(items.into_iter().map(from_hashable).collect())
        },
    }
}

/// Mapping keys must be text; non-string pickle keys use their literal form.
fn key_text(key: &HashableValue) -> String {
    match key {
        HashableValue::String(s) => s.clone(),
        HashableValue::None => "None".to_string(),
        HashableValue::Bool(b) => if *b { "True" } else { "False" }.to_string(),
        HashableValue::I64(i) => i.to_string(),
        HashableValue::Int(big) => big.to_string(),
        HashableValue::F64(f) => f.to_string(),
        HashableValue::Bytes(bytes) => format!("b'{}'", String::from_utf8_lossy(bytes)),
        HashableValue::Tuple(items) => {
            let parts: Vec<String> = items.iter().map(key_text).collect();
            format!("({})", parts.join(", "))
        },
        HashableValue::FrozenSet(items) => {
            let parts: Vec<String> = items.iter().map(key_text).collect();
            format!("frozenset({{{}}})", parts.join(", "))
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{classify, ShapeKind};
    use std::io::Write;

    #[test]
    fn json_keeps_key_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ordered.json");
        std::fs::write(&path, r#"{"zeta": 1, "alpha": [1, 2.5, null], "mid": {"x": true}}"#)
            .unwrap();

        let decoded = load_json(&path, &LoaderConfig::default()).unwrap();
        let keys: Vec<&str> = decoded
            .value
            .as_map()
            .unwrap()
            .keys()
            .map(String::as_str)
            .collect();
        assert_eq!(keys, ["zeta", "alpha", "mid"]);
        assert_eq!(decoded.metadata.get("keys_count").unwrap().to_string(), "3");
        assert_eq!(decoded.metadata.get("type").unwrap().to_string(), "json");
    }

    #[test]
    fn json_numbers() {
        let value = from_json(serde_json::json!([1, 2.5, -3]));
        let items = value.as_list().unwrap();
        assert_eq!(items[0], Value::Int(1));
        assert_eq!(items[1], Value::Float(2.5));
        assert_eq!(items[2], Value::Int(-3));
    }

    #[test]
    fn pickle_is_refused_by_default() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.pkl");
        std::fs::File::create(&path).unwrap().write_all(b"\x80\x03N.").unwrap();

        let err = load_pickle(&path, &LoaderConfig::default()).unwrap_err();
        assert_eq!(err.category(), "DecodeError");
        assert!(err.to_string().contains("--allow-pickle"));
    }

    #[test]
    fn pickle_dict_decodes_when_allowed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.pkl");
        let mut map = std::collections::BTreeMap::new();
        map.insert("a".to_string(), vec![1i64, 2, 3]);
        let bytes = serde_pickle::to_vec(&map, serde_pickle::SerOptions::new()).unwrap();
        std::fs::write(&path, bytes).unwrap();

        let config = LoaderConfig { allow_pickle: true };
        let decoded = load_pickle(&path, &config).unwrap();
        assert_eq!(classify(&decoded.value), ShapeKind::Mapping);
        let a = decoded.value.as_map().unwrap().get("a").unwrap();
        assert_eq!(a.as_list().unwrap().len(), 3);
        assert_eq!(decoded.metadata.get("data_type").unwrap().to_string(), "dict");
    }
}
