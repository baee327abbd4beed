//! Settings Tree - declarative settings with provenance
//!
//! An application declares a tree of settings (leaves, namespaces and
//! records), gets a fully resolved data tree from the initializers, and
//! applies partial updates over time. Every leaf carries metadata recording
//! its current value, whether it came from an initializer or a change, and
//! the value it was first resolved to.

mod error;
mod layer;
mod merge;
mod metadata;
mod resolve;
mod runner;
mod settings;
mod spec;

pub use error::{BoxError, Result, SettingsError};
pub use layer::{load_toml_layer, parse_toml_layer};
pub use metadata::{
    EntryMetadata, LeafMetadata, Metadata, NamespaceMetadata, RecordMetadata, RecordTag, Source,
};
pub use runner::{default_on_fixup, FixupInfo, OnFixupFn, FIXUP_TAG, FIXUP_TARGET};
pub use settings::{Settings, SettingsOptions};
pub use spec::{
    FieldSpec, Fixup, FixupFn, InitialFn, MapTypeFn, ShorthandFn, Spec, ValidateFn,
};
