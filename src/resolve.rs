//! Resolution engine
//!
//! Computes the value and metadata of one field, either from scratch
//! (`initial_field`) or from an input value (`resolve_field`). Value and
//! metadata always come out of the same call so the two trees cannot drift.
//!
//! Pipeline for a leaf that receives input through `change`:
//! fixup, then validate, then map_type. Values that come from an
//! initializer only go through map_type.

use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::error::{Result, SettingsError};
use crate::merge::{initial_fields, merge_input, CurrentFields};
use crate::metadata::{
    EntryMetadata, LeafMetadata, Metadata, NamespaceMetadata, RecordMetadata, RecordTag, Source,
};
use crate::runner::Runner;
use crate::spec::{join_path, FieldDescriptor, LeafDescriptor, NamespaceDescriptor, RecordDescriptor};

/// Value and metadata of one resolved field. `value` is `None` for a leaf
/// that has no value.
#[derive(Debug, Clone)]
pub(crate) struct Resolved {
    pub value: Option<Value>,
    pub metadata: Metadata,
}

impl Resolved {
    pub fn insert_into(
        self,
        name: &str,
        values: &mut Map<String, Value>,
        metadata: &mut BTreeMap<String, Metadata>,
    ) {
        if let Some(value) = self.value {
            values.insert(name.to_string(), value);
        }
        metadata.insert(name.to_string(), self.metadata);
    }
}

/// Existing state of one field.
#[derive(Clone, Copy)]
pub(crate) struct Current<'a> {
    pub value: Option<&'a Value>,
    pub metadata: &'a Metadata,
}

impl<'a> Current<'a> {
    fn fields(self) -> Option<CurrentFields<'a>> {
        let ns = self.metadata.as_namespace()?;
        Some(CurrentFields {
            values: self.value.and_then(Value::as_object),
            metadata: &ns.fields,
        })
    }
}

/// Initial pass: no input, run initializers.
pub(crate) fn initial_field(runner: &Runner<'_>, path: &str, descriptor: &FieldDescriptor) -> Result<Resolved> {
    match descriptor {
        FieldDescriptor::Leaf(leaf) => initial_leaf(runner, path, leaf),
        FieldDescriptor::Namespace(ns) => match &ns.initial {
            Some(f) => {
                let input = runner.initializer(path, f)?;
                resolve_namespace(runner, path, ns, input, Source::Initial, None)
            }
            None => {
                let (values, fields) = initial_fields(runner, path, &ns.fields)?;
                Ok(namespace(values, fields))
            }
        },
        FieldDescriptor::Record(record) => {
            let entries = match &record.initial {
                Some(f) => match runner.initializer(path, f)? {
                    Value::Object(entries) => entries,
                    other => {
                        return Err(SettingsError::Initializer {
                            name: path.to_string(),
                            source: format!(
                                "record initializer must produce an object keyed by entry, got {}",
                                other
                            )
                            .into(),
                        })
                    }
                },
                None => Map::new(),
            };
            resolve_record(runner, path, record, entries, Source::Initial, None)
        }
    }
}

/// Resolve a field against an input value. `source` is `Set` for values
/// supplied through `change` and `Initial` for values handed down by an
/// enclosing namespace or record initializer.
pub(crate) fn resolve_field(
    runner: &Runner<'_>,
    path: &str,
    descriptor: &FieldDescriptor,
    input: Value,
    source: Source,
    current: Option<Current<'_>>,
) -> Result<Resolved> {
    match descriptor {
        FieldDescriptor::Leaf(leaf) => match source {
            Source::Initial => from_initial(runner, path, leaf, Some(input)),
            Source::Set => set_leaf(runner, path, leaf, input, current),
        },
        FieldDescriptor::Namespace(ns) => resolve_namespace(runner, path, ns, input, source, current),
        FieldDescriptor::Record(record) => match input {
            Value::Object(entries) => resolve_record(runner, path, record, entries, source, current),
            other => Err(SettingsError::NotARecord {
                name: path.to_string(),
                value: other,
            }),
        },
    }
}

fn initial_leaf(runner: &Runner<'_>, path: &str, leaf: &LeafDescriptor) -> Result<Resolved> {
    let value = match &leaf.initial {
        Some(f) => Some(runner.initializer(path, f)?),
        None => None,
    };
    from_initial(runner, path, leaf, value)
}

fn from_initial(
    runner: &Runner<'_>,
    path: &str,
    leaf: &LeafDescriptor,
    value: Option<Value>,
) -> Result<Resolved> {
    let value = match (value, &leaf.map_type) {
        (Some(value), Some(f)) => Some(runner.map_type(path, f, value)?),
        (value, _) => value,
    };
    Ok(Resolved {
        value: value.clone(),
        metadata: Metadata::Leaf(LeafMetadata {
            value: value.clone(),
            from: Source::Initial,
            initial: value,
        }),
    })
}

fn set_leaf(
    runner: &Runner<'_>,
    path: &str,
    leaf: &LeafDescriptor,
    input: Value,
    current: Option<Current<'_>>,
) -> Result<Resolved> {
    if input.is_object() {
        return Err(SettingsError::NotANamespace {
            name: path.to_string(),
            value: input,
        });
    }

    let mut value = input;
    if let Some(f) = &leaf.fixup {
        value = runner.fixup(path, f, value)?;
    }
    if let Some(f) = &leaf.validate {
        runner.validate(path, f, &value)?;
    }
    if let Some(f) = &leaf.map_type {
        value = runner.map_type(path, f, value)?;
    }

    let initial = current
        .and_then(|c| c.metadata.as_leaf())
        .and_then(|m| m.initial.clone());
    Ok(Resolved {
        value: Some(value.clone()),
        metadata: Metadata::Leaf(LeafMetadata {
            value: Some(value),
            from: Source::Set,
            initial,
        }),
    })
}

fn resolve_namespace(
    runner: &Runner<'_>,
    path: &str,
    ns: &NamespaceDescriptor,
    input: Value,
    source: Source,
    current: Option<Current<'_>>,
) -> Result<Resolved> {
    let (values, fields) = merge_input(
        runner,
        path,
        &ns.fields,
        ns.shorthand.as_ref(),
        input,
        source,
        current.and_then(Current::fields),
    )?;
    Ok(namespace(values, fields))
}

fn namespace(values: Map<String, Value>, fields: BTreeMap<String, Metadata>) -> Resolved {
    Resolved {
        value: Some(Value::Object(values)),
        metadata: Metadata::Namespace(NamespaceMetadata { fields }),
    }
}

/// Merge `entries` into a record. Entries not named in `entries` keep their
/// current state; named ones are merged field by field, or created fresh.
fn resolve_record(
    runner: &Runner<'_>,
    path: &str,
    record: &RecordDescriptor,
    entries: Map<String, Value>,
    source: Source,
    current: Option<Current<'_>>,
) -> Result<Resolved> {
    let current_values = current.and_then(|c| c.value).and_then(Value::as_object);
    let current_metadata = current.and_then(|c| c.metadata.as_record());

    let mut values = current_values.cloned().unwrap_or_default();
    let mut entry_metadata: BTreeMap<String, EntryMetadata> = current_metadata
        .map(|m| m.value.clone())
        .unwrap_or_default();

    for (key, entry_input) in entries {
        let entry_path = join_path(path, &key);
        let existing = current_metadata
            .and_then(|m| m.value.get(&key))
            .map(|metadata| CurrentFields {
                values: current_values
                    .and_then(|v| v.get(&key))
                    .and_then(Value::as_object),
                metadata,
            });
        let (entry_values, entry_fields) = merge_input(
            runner,
            &entry_path,
            &record.entry_fields,
            record.entry_shorthand.as_ref(),
            entry_input,
            source,
            existing,
        )?;
        values.insert(key.clone(), Value::Object(entry_values));
        entry_metadata.insert(key, entry_fields);
    }

    let initial = match (current_metadata, source) {
        (Some(m), _) => Arc::clone(&m.initial),
        (None, Source::Initial) => Arc::new(entry_metadata.clone()),
        (None, Source::Set) => Arc::new(BTreeMap::new()),
    };
    Ok(Resolved {
        value: Some(Value::Object(values)),
        metadata: Metadata::Record(RecordMetadata {
            kind: RecordTag::Record,
            from: source,
            value: entry_metadata,
            initial,
        }),
    })
}
