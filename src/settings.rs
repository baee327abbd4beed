//! Settings instance
//!
//! Owns the current data and metadata trees plus the snapshot taken at
//! construction. Every mutator builds complete new trees and only swaps them
//! in once resolution has succeeded, so a failed call leaves the instance
//! exactly as it was.

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use crate::error::{BoxError, Result, SettingsError};
use crate::layer::{load_toml_layer, parse_toml_layer};
use crate::merge::{initial_fields, merge_object, CurrentFields, MergedFields};
use crate::metadata::{Metadata, Source};
use crate::runner::{FixupInfo, OnFixupFn, Runner};
use crate::spec::{normalize, FieldSpec, Fields, Spec, PATH_SEPARATOR};

/// Options for [`Settings::create`].
#[derive(Clone, Default)]
pub struct SettingsOptions {
    spec: Spec,
    on_fixup: Option<OnFixupFn>,
}

impl SettingsOptions {
    pub fn new(spec: Spec) -> Self {
        Self {
            spec,
            on_fixup: None,
        }
    }

    /// Declare a top-level setting.
    pub fn field(mut self, name: impl Into<String>, spec: FieldSpec) -> Self {
        self.spec.insert(name.into(), spec);
        self
    }

    /// Replace the default fixup warning. The handler receives the default
    /// handler as its second argument and may call it to keep the warning.
    pub fn on_fixup<F>(mut self, f: F) -> Self
    where
        F: Fn(&FixupInfo, &dyn Fn(&FixupInfo)) -> std::result::Result<(), BoxError>
            + Send
            + Sync
            + 'static,
    {
        self.on_fixup = Some(Arc::new(f));
        self
    }
}

impl From<Spec> for SettingsOptions {
    fn from(spec: Spec) -> Self {
        Self::new(spec)
    }
}

/// A resolved settings tree.
///
/// ```
/// use serde_json::json;
/// use settings_tree::{FieldSpec, Settings, SettingsOptions};
///
/// let mut settings = Settings::create(
///     SettingsOptions::default()
///         .field("a", FieldSpec::namespace().field("b", FieldSpec::new().initial_value(1))),
/// )
/// .unwrap();
/// assert_eq!(settings.data(), &json!({"a": {"b": 1}}));
///
/// settings.change(json!({"a": {"b": 2}})).unwrap();
/// assert_eq!(settings.get_u64("a.b"), Some(2));
/// assert_eq!(settings.original(), &json!({"a": {"b": 1}}));
/// ```
pub struct Settings {
    fields: Fields,
    on_fixup: Option<OnFixupFn>,
    data: Value,
    metadata: BTreeMap<String, Metadata>,
    original: Value,
}

impl Settings {
    /// Normalize the spec and run the initial pass over every setting.
    pub fn create(options: impl Into<SettingsOptions>) -> Result<Self> {
        let options = options.into();
        let fields = normalize(&options.spec, "")?;
        let (values, metadata) =
            initial_fields(&Runner::new(options.on_fixup.as_ref()), "", &fields)?;
        let data = Value::Object(values);

        tracing::debug!(settings = fields.len(), "Created settings");

        Ok(Self {
            fields,
            on_fixup: options.on_fixup,
            original: data.clone(),
            data,
            metadata,
        })
    }

    /// Current data tree.
    pub fn data(&self) -> &Value {
        &self.data
    }

    /// Current metadata, keyed by top-level setting name.
    pub fn metadata(&self) -> &BTreeMap<String, Metadata> {
        &self.metadata
    }

    /// Data as it was right after construction. Not affected by `change` or
    /// `reset`.
    pub fn original(&self) -> &Value {
        &self.original
    }

    /// Deep-merge a partial update. On error nothing is committed.
    pub fn change(&mut self, input: Value) -> Result<&mut Self> {
        let (values, metadata) = self.merge(input, self.current())?;
        self.commit(values, metadata);
        Ok(self)
    }

    /// Apply several partial updates in order, last one winning per leaf.
    /// Either every layer applies or none does.
    pub fn apply_layers<I>(&mut self, layers: I) -> Result<&mut Self>
    where
        I: IntoIterator<Item = Value>,
    {
        let mut merged: Option<MergedFields> = None;
        for layer in layers {
            let current = match &merged {
                Some((values, metadata)) => CurrentFields {
                    values: Some(values),
                    metadata,
                },
                None => self.current(),
            };
            merged = Some(self.merge(layer, current)?);
        }
        if let Some((values, metadata)) = merged {
            self.commit(values, metadata);
        }
        Ok(self)
    }

    /// Apply a change layer written as TOML.
    pub fn change_from_toml(&mut self, contents: &str) -> Result<&mut Self> {
        let layer = parse_toml_layer(contents)?;
        self.change(layer)
    }

    /// Apply a change layer read from a TOML file.
    pub fn change_from_file(&mut self, path: &Path) -> Result<&mut Self> {
        let layer = load_toml_layer(path)?;
        self.change(layer)
    }

    /// Re-run every initializer and replace the current state. `original`
    /// is left untouched.
    pub fn reset(&mut self) -> Result<&mut Self> {
        let (values, metadata) =
            initial_fields(&Runner::new(self.on_fixup.as_ref()), "", &self.fields)?;
        tracing::debug!("Reset settings");
        self.data = Value::Object(values);
        self.metadata = metadata;
        Ok(self)
    }

    /// Get a data value by dotted path. Record entries are addressed by
    /// their key: `mounts.docs.path`.
    pub fn get(&self, path: &str) -> Option<&Value> {
        let mut current = &self.data;
        for part in path.split(PATH_SEPARATOR) {
            current = current.get(part)?;
        }
        Some(current)
    }

    pub fn get_u64(&self, path: &str) -> Option<u64> {
        self.get(path).and_then(|v| v.as_u64())
    }

    pub fn get_str(&self, path: &str) -> Option<&str> {
        self.get(path).and_then(|v| v.as_str())
    }

    pub fn get_bool(&self, path: &str) -> Option<bool> {
        self.get(path).and_then(|v| v.as_bool())
    }

    /// Get a metadata node by dotted path.
    pub fn metadata_at(&self, path: &str) -> Option<&Metadata> {
        let mut segments = path.split(PATH_SEPARATOR);
        let first = segments.next()?;
        self.metadata.get(first)?.lookup(segments)
    }

    /// Dotted paths of every leaf whose value was supplied through `change`.
    pub fn set_paths(&self) -> Vec<String> {
        let mut paths = Vec::new();
        for (name, node) in &self.metadata {
            node.collect_set_paths(name, &mut paths);
        }
        paths
    }

    /// Deserialize the current data into a typed struct.
    pub fn deserialize<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_value(self.data.clone())?)
    }

    fn current(&self) -> CurrentFields<'_> {
        CurrentFields {
            values: self.data.as_object(),
            metadata: &self.metadata,
        }
    }

    fn merge(&self, input: Value, current: CurrentFields<'_>) -> Result<MergedFields> {
        let input = match input {
            Value::Object(map) => map,
            other => return Err(SettingsError::InvalidChange { value: other }),
        };
        let keys: Vec<&String> = input.keys().collect();
        tracing::debug!(keys = ?keys, "Applying settings change");

        merge_object(
            &Runner::new(self.on_fixup.as_ref()),
            "",
            &self.fields,
            input,
            Source::Set,
            Some(current),
        )
    }

    fn commit(&mut self, values: Map<String, Value>, metadata: BTreeMap<String, Metadata>) {
        self.data = Value::Object(values);
        self.metadata = metadata;
    }
}

impl std::fmt::Debug for Settings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Settings")
            .field("data", &self.data)
            .field("metadata", &self.metadata)
            .field("original", &self.original)
            .finish_non_exhaustive()
    }
}
