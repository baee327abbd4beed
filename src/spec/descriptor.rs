//! Normalized field descriptors
//!
//! Each [`FieldSpec`] is classified exactly once into a [`FieldDescriptor`].
//! Resolution code matches on the variant and never inspects the declaration
//! again.

use std::collections::BTreeMap;

use super::{FieldSpec, FixupFn, InitialFn, MapTypeFn, ShorthandFn, Spec, ValidateFn};
use crate::error::{Result, SettingsError};

/// Separator used when naming nested settings.
pub(crate) const PATH_SEPARATOR: char = '.';

pub(crate) type Fields = BTreeMap<String, FieldDescriptor>;

pub(crate) enum FieldDescriptor {
    Leaf(LeafDescriptor),
    Namespace(NamespaceDescriptor),
    Record(RecordDescriptor),
}

pub(crate) struct LeafDescriptor {
    pub initial: Option<InitialFn>,
    pub map_type: Option<MapTypeFn>,
    pub fixup: Option<FixupFn>,
    pub validate: Option<ValidateFn>,
}

pub(crate) struct NamespaceDescriptor {
    pub initial: Option<InitialFn>,
    pub fields: Fields,
    pub shorthand: Option<ShorthandFn>,
}

pub(crate) struct RecordDescriptor {
    pub initial: Option<InitialFn>,
    pub entry_fields: Fields,
    pub entry_shorthand: Option<ShorthandFn>,
}

/// Normalize a whole spec level. `prefix` is the dotted path of the
/// enclosing setting, empty at the root.
pub(crate) fn normalize(spec: &Spec, prefix: &str) -> Result<Fields> {
    spec.iter()
        .map(|(name, field)| {
            let path = join_path(prefix, name);
            if name.is_empty() || name.contains(PATH_SEPARATOR) {
                return Err(misconfigured(
                    &path,
                    format!("setting names must be non-empty and must not contain '{}'", PATH_SEPARATOR),
                ));
            }
            Ok((name.clone(), FieldDescriptor::from_spec(&path, field)?))
        })
        .collect()
}

impl FieldDescriptor {
    fn from_spec(path: &str, spec: &FieldSpec) -> Result<Self> {
        match (&spec.fields, &spec.entry_fields) {
            (Some(_), Some(_)) => Err(misconfigured(
                path,
                "declares both fields and entry_fields; a setting is either a namespace or a record",
            )),
            (Some(fields), None) => {
                reject_leaf_transforms(path, spec, "namespace")?;
                if spec.entry_shorthand.is_some() {
                    return Err(misconfigured(path, "entry_shorthand requires entry_fields"));
                }
                Ok(Self::Namespace(NamespaceDescriptor {
                    initial: spec.initial.clone(),
                    fields: normalize(fields, path)?,
                    shorthand: spec.shorthand.clone(),
                }))
            }
            (None, Some(entry_fields)) => {
                reject_leaf_transforms(path, spec, "record")?;
                if spec.shorthand.is_some() {
                    return Err(misconfigured(
                        path,
                        "shorthand is not supported on records; use entry_shorthand",
                    ));
                }
                Ok(Self::Record(RecordDescriptor {
                    initial: spec.initial.clone(),
                    entry_fields: normalize(entry_fields, path)?,
                    entry_shorthand: spec.entry_shorthand.clone(),
                }))
            }
            (None, None) => {
                if spec.shorthand.is_some() {
                    return Err(misconfigured(path, "shorthand requires fields"));
                }
                if spec.entry_shorthand.is_some() {
                    return Err(misconfigured(path, "entry_shorthand requires entry_fields"));
                }
                Ok(Self::Leaf(LeafDescriptor {
                    initial: spec.initial.clone(),
                    map_type: spec.map_type.clone(),
                    fixup: spec.fixup.clone(),
                    validate: spec.validate.clone(),
                }))
            }
        }
    }
}

fn reject_leaf_transforms(path: &str, spec: &FieldSpec, kind: &str) -> Result<()> {
    let declared = [
        ("map_type", spec.map_type.is_some()),
        ("fixup", spec.fixup.is_some()),
        ("validate", spec.validate.is_some()),
    ];
    match declared.iter().find(|(_, present)| *present) {
        Some((slot, _)) => Err(misconfigured(
            path,
            format!("{} is only supported on leaf settings, but this setting is a {}", slot, kind),
        )),
        None => Ok(()),
    }
}

fn misconfigured(path: &str, reason: impl Into<String>) -> SettingsError {
    SettingsError::Configuration {
        name: path.to_string(),
        reason: reason.into(),
    }
}

pub(crate) fn join_path(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{}{}{}", prefix, PATH_SEPARATOR, name)
    }
}
