//! Change layers loaded from TOML
//!
//! A layer is a partial settings object. Layers read from TOML text or files
//! are converted to JSON values and applied through the normal `change`
//! path, so they go through the same fixup/validate pipeline as any other
//! input.

use serde_json::Value;
use std::fs;
use std::path::Path;

use crate::error::{Result, SettingsError};

/// Parse TOML text into a change layer.
pub fn parse_toml_layer(contents: &str) -> Result<Value> {
    let toml_value: toml::Value = toml::from_str(contents)
        .map_err(|e| SettingsError::Parse(format!("TOML parse error: {}", e)))?;
    Ok(toml_to_json(toml_value))
}

/// Read and parse a TOML file into a change layer.
pub fn load_toml_layer(path: &Path) -> Result<Value> {
    let bytes = fs::read(path)
        .map_err(|e| SettingsError::Io(format!("{}: {}", path.display(), e)))?;
    let contents = String::from_utf8(bytes).map_err(|e| {
        SettingsError::Parse(format!("{}: invalid UTF-8: {}", path.display(), e))
    })?;
    parse_toml_layer(&contents)
}

/// Convert TOML Value to JSON Value
fn toml_to_json(toml: toml::Value) -> Value {
    match toml {
        toml::Value::String(s) => Value::String(s),
        toml::Value::Integer(i) => Value::Number(i.into()),
        toml::Value::Float(f) => serde_json::Number::from_f64(f)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        toml::Value::Boolean(b) => Value::Bool(b),
        toml::Value::Datetime(dt) => Value::String(dt.to_string()),
        toml::Value::Array(arr) => Value::Array(arr.into_iter().map(toml_to_json).collect()),
        toml::Value::Table(table) => Value::Object(
            table
                .into_iter()
                .map(|(k, v)| (k, toml_to_json(v)))
                .collect(),
        ),
    }
}
