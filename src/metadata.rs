//! Provenance metadata
//!
//! The metadata tree mirrors the shape of the spec and is produced by the
//! same recursive pass that produces the data tree.

use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::spec::join_path;

/// Where a value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    /// Produced by an initializer (or absent with no initializer).
    Initial,
    /// Supplied through `change`.
    Set,
}

/// Metadata for one record entry: field name to metadata.
pub type EntryMetadata = BTreeMap<String, Metadata>;

/// Metadata node, one per declared setting.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Metadata {
    Leaf(LeafMetadata),
    Namespace(NamespaceMetadata),
    Record(RecordMetadata),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LeafMetadata {
    /// Current value; `None` when the leaf has no value.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
    pub from: Source,
    /// Value resolved when the leaf was first created. Never updated by
    /// later changes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub initial: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NamespaceMetadata {
    pub fields: BTreeMap<String, Metadata>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordTag {
    Record,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecordMetadata {
    #[serde(rename = "type")]
    pub kind: RecordTag,
    pub from: Source,
    pub value: BTreeMap<String, EntryMetadata>,
    /// Entries as resolved at construction, shared by every later snapshot.
    pub initial: Arc<BTreeMap<String, EntryMetadata>>,
}

impl Metadata {
    pub fn as_leaf(&self) -> Option<&LeafMetadata> {
        match self {
            Self::Leaf(leaf) => Some(leaf),
            _ => None,
        }
    }

    pub fn as_namespace(&self) -> Option<&NamespaceMetadata> {
        match self {
            Self::Namespace(ns) => Some(ns),
            _ => None,
        }
    }

    pub fn as_record(&self) -> Option<&RecordMetadata> {
        match self {
            Self::Record(record) => Some(record),
            _ => None,
        }
    }

    /// Child node for one path segment: a namespace field, a record entry
    /// key followed by an entry field, or nothing for leaves.
    pub(crate) fn lookup<'s, I>(&self, mut segments: I) -> Option<&Metadata>
    where
        I: Iterator<Item = &'s str>,
    {
        match segments.next() {
            None => Some(self),
            Some(segment) => match self {
                Self::Leaf(_) => None,
                Self::Namespace(ns) => ns.fields.get(segment)?.lookup(segments),
                Self::Record(record) => {
                    let entry = record.value.get(segment)?;
                    let field = segments.next()?;
                    entry.get(field)?.lookup(segments)
                }
            },
        }
    }

    /// Push the dotted path of every leaf whose provenance is `set`.
    pub(crate) fn collect_set_paths(&self, path: &str, out: &mut Vec<String>) {
        match self {
            Self::Leaf(leaf) => {
                if leaf.from == Source::Set {
                    out.push(path.to_string());
                }
            }
            Self::Namespace(ns) => {
                for (name, child) in &ns.fields {
                    child.collect_set_paths(&join_path(path, name), out);
                }
            }
            Self::Record(record) => {
                for (key, entry) in &record.value {
                    for (name, child) in entry {
                        child.collect_set_paths(&join_path(&join_path(path, key), name), out);
                    }
                }
            }
        }
    }
}
