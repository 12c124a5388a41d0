//! YAML and TOML configuration documents.

use super::{decode_error, top_level_keys, Decoded};
use crate::data::{Fields, Metadata, Object, Value};
use crate::error::Result;
use crate::util::limits::LoaderConfig;
use serde::Deserialize;
use std::path::Path;

const LISTED_KEYS: usize = 10;

pub(super) fn load_yaml(path: &Path, _config: &LoaderConfig) -> Result<Decoded> {
    let text = std::fs::read_to_string(path).map_err(decode_error(path))?;

    let mut documents = Vec::new();
    for document in serde_yaml::Deserializer::from_str(&text) {
        let parsed = serde_yaml::Value::deserialize(document).map_err(decode_error(path))?;
        documents.push(from_yaml(parsed));
    }
    // A multi-document stream is presented as a sequence of documents.
    let value = match documents.len() {
        0 => Value::Null,
        1 => documents.pop().unwrap_or(Value::Null),
        _ => Value::list(documents),
    };

    let mut metadata = Metadata::new().with("type", "yaml").with("encoding", "utf-8");
    if let Some((count, keys)) = top_level_keys(&value, LISTED_KEYS) {
        metadata.insert("keys_count", count);
        metadata.insert("top_level_keys", keys);
    }
    Ok(Decoded::new(value, metadata))
}

pub(super) fn load_toml(path: &Path, _config: &LoaderConfig) -> Result<Decoded> {
    let text = std::fs::read_to_string(path).map_err(decode_error(path))?;
    let table: toml::Table = text.parse().map_err(decode_error(path))?;

    let sections: Vec<String> = table
        .iter()
        .filter(|(_, v)| v.is_table())
        .map(|(k, _)| k.clone())
        .collect();
    let value = Value::map(
        table
            .into_iter()
            .map(|(k, v)| (k, from_toml(v)))
            .collect::<Fields>(),
    );

    let mut metadata = Metadata::new().with("type", "toml").with("encoding", "utf-8");
    metadata.insert("sections", sections);
    Ok(Decoded::new(value, metadata))
}

fn from_yaml(value: serde_yaml::Value) -> Value {
    use serde_yaml::Value as Y;

    match value {
        Y::Null => Value::Null,
        Y::Bool(b) => Value::Bool(b),
        Y::Number(n) => match n.as_i64() {
            Some(i) => Value::Int(i),
            None => Value::Float(n.as_f64().unwrap_or(f64::NAN)),
        },
        Y::String(s) => Value::Str(s),
        Y::Sequence(items) => Value::list(items.into_iter().map(from_yaml).collect()),
        Y::Mapping(map) => Value::map(
            map.into_iter()
                .map(|(k, v)| (yaml_key(&k), from_yaml(v)))
                .collect::<Fields>(),
        ),
        Y::Tagged(tagged) => {
            let type_name = tagged.tag.to_string().trim_start_matches('!').to_string();
            let fields = match from_yaml(tagged.value) {
                Value::Map(map) => (*map).clone(),
                other => {
                    let mut fields = Fields::new();
                    fields.insert("value".to_string(), other);
                    fields
                },
            };
            Value::Object(Object::new(type_name, fields))
        },
    }
}

fn yaml_key(key: &serde_yaml::Value) -> String {
    use serde_yaml::Value as Y;

    match key {
        Y::String(s) => s.clone(),
        Y::Number(n) => n.to_string(),
        Y::Bool(b) => b.to_string(),
        Y::Null => "null".to_string(),
        other => serde_yaml::to_string(other)
            .map(|s| s.trim_end().to_string())
            .unwrap_or_else(|_| format!("{:?}", other)),
    }
}

fn from_toml(value: toml::Value) -> Value {
    match value {
        toml::Value::String(s) => Value::Str(s),
        toml::Value::Integer(i) => Value::Int(i),
        toml::Value::Float(f) => Value::Float(f),
        toml::Value::Boolean(b) => Value::Bool(b),
        toml::Value::Datetime(dt) => Value::Str(dt.to_string()),
        toml::Value::Array(items) => Value::list(items.into_iter().map(from_toml).collect()),
        toml::Value::Table(table) => Value::map(
            table
                .into_iter()
                .map(|(k, v)| (k, from_toml(v)))
                .collect::<Fields>(),
        ),
    }
}
