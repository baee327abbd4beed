//! Merge engine
//!
//! Deep-merges object input into one level of fields (the root, a namespace
//! or a record entry). Merge semantics:
//! - Fields named in the input: resolved against their current state
//! - Fields not named: current state passed through unchanged
//! - Fields not named and with no current state: initial pass
//!
//! Whether a nested value is merged or replaced is decided by the field
//! descriptor, never by the shape of the data. Arrays and other leaf values
//! are always replaced wholesale.

use serde_json::{Map, Value};
use std::collections::BTreeMap;

use crate::error::{Result, SettingsError};
use crate::metadata::{Metadata, Source};
use crate::resolve::{initial_field, resolve_field, Current, Resolved};
use crate::runner::Runner;
use crate::spec::{join_path, Fields, ShorthandFn};

/// Existing state of one level of fields.
#[derive(Clone, Copy)]
pub(crate) struct CurrentFields<'a> {
    pub values: Option<&'a Map<String, Value>>,
    pub metadata: &'a BTreeMap<String, Metadata>,
}

impl<'a> CurrentFields<'a> {
    fn child(self, name: &str) -> Option<Current<'a>> {
        Some(Current {
            value: self.values.and_then(|v| v.get(name)),
            metadata: self.metadata.get(name)?,
        })
    }
}

/// Data and metadata of one level of fields.
pub(crate) type MergedFields = (Map<String, Value>, BTreeMap<String, Metadata>);

/// Run the initial pass for every field of one level.
pub(crate) fn initial_fields(runner: &Runner<'_>, prefix: &str, fields: &Fields) -> Result<MergedFields> {
    let mut values = Map::new();
    let mut metadata = BTreeMap::new();
    for (name, descriptor) in fields {
        initial_field(runner, &join_path(prefix, name), descriptor)?
            .insert_into(name, &mut values, &mut metadata);
    }
    Ok((values, metadata))
}

/// Merge input that may need shorthand expansion first.
pub(crate) fn merge_input(
    runner: &Runner<'_>,
    prefix: &str,
    fields: &Fields,
    shorthand: Option<&ShorthandFn>,
    input: Value,
    source: Source,
    current: Option<CurrentFields<'_>>,
) -> Result<MergedFields> {
    let input = match (input, shorthand) {
        (Value::Object(map), _) => map,
        (other, Some(f)) => runner.shorthand(prefix, f, other)?,
        (other, None) => {
            return Err(SettingsError::MissingShorthand {
                name: prefix.to_string(),
                value: other,
            })
        }
    };
    merge_object(runner, prefix, fields, input, source, current)
}

/// Merge object input into one level of fields.
pub(crate) fn merge_object(
    runner: &Runner<'_>,
    prefix: &str,
    fields: &Fields,
    mut input: Map<String, Value>,
    source: Source,
    current: Option<CurrentFields<'_>>,
) -> Result<MergedFields> {
    if let Some(unknown) = input.keys().find(|key| !fields.contains_key(key.as_str())) {
        return Err(SettingsError::UnknownSetting {
            name: join_path(prefix, unknown),
        });
    }

    let mut values = Map::new();
    let mut metadata = BTreeMap::new();
    for (name, descriptor) in fields {
        let path = join_path(prefix, name);
        let existing = current.and_then(|c| c.child(name));
        let resolved = match (input.remove(name), existing) {
            (Some(child_input), existing) => {
                resolve_field(runner, &path, descriptor, child_input, source, existing)?
            }
            (None, Some(existing)) => Resolved {
                value: existing.value.cloned(),
                metadata: existing.metadata.clone(),
            },
            (None, None) => initial_field(runner, &path, descriptor)?,
        };
        resolved.insert_into(name, &mut values, &mut metadata);
    }
    Ok((values, metadata))
}
