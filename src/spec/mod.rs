//! Spec declaration surface
//!
//! A [`Spec`] maps setting names to [`FieldSpec`]s. A `FieldSpec` is a bag
//! of optional slots; which slots are filled decides whether the setting is
//! a leaf, a namespace or a record. The classification happens once, in
//! the descriptor module, when a [`crate::Settings`] instance is created.

mod descriptor;

pub(crate) use descriptor::{
    join_path, normalize, FieldDescriptor, Fields, LeafDescriptor, NamespaceDescriptor,
    RecordDescriptor, PATH_SEPARATOR,
};

use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::error::BoxError;

/// Produces an initial value.
pub type InitialFn = Arc<dyn Fn() -> Result<Value, BoxError> + Send + Sync>;

/// Maps an input value to its data representation.
pub type MapTypeFn = Arc<dyn Fn(Value) -> Result<Value, BoxError> + Send + Sync>;

/// Repairs an input value. `Ok(None)` means no repair was needed.
pub type FixupFn = Arc<dyn Fn(&Value) -> Result<Option<Fixup>, BoxError> + Send + Sync>;

/// Checks an input value. `Ok(Some(messages))` rejects it.
pub type ValidateFn = Arc<dyn Fn(&Value) -> Result<Option<Vec<String>>, BoxError> + Send + Sync>;

/// Expands a non-object input into the object form of a namespace.
pub type ShorthandFn = Arc<dyn Fn(Value) -> Result<Value, BoxError> + Send + Sync>;

/// Top-level spec: setting name to declaration.
pub type Spec = BTreeMap<String, FieldSpec>;

/// Replacement value returned by a fixup, with the reasons for the repair.
#[derive(Debug, Clone, PartialEq)]
pub struct Fixup {
    pub value: Value,
    pub messages: Vec<String>,
}

impl Fixup {
    pub fn new(value: impl Into<Value>, messages: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            value: value.into(),
            messages: messages.into_iter().map(Into::into).collect(),
        }
    }
}

/// Declaration of a single setting.
///
/// ```
/// use serde_json::json;
/// use settings_tree::FieldSpec;
///
/// let server = FieldSpec::namespace()
///     .field("host", FieldSpec::new().initial_value("localhost"))
///     .field("port", FieldSpec::new().initial(|| Ok(json!(8080))));
/// # let _ = server;
/// ```
#[derive(Clone, Default)]
pub struct FieldSpec {
    pub(crate) initial: Option<InitialFn>,
    pub(crate) map_type: Option<MapTypeFn>,
    pub(crate) fixup: Option<FixupFn>,
    pub(crate) validate: Option<ValidateFn>,
    pub(crate) fields: Option<Spec>,
    pub(crate) entry_fields: Option<Spec>,
    pub(crate) shorthand: Option<ShorthandFn>,
    pub(crate) entry_shorthand: Option<ShorthandFn>,
}

impl FieldSpec {
    /// An empty declaration. Without further slots this is a plain leaf.
    pub fn new() -> Self {
        Self::default()
    }

    /// A namespace with no fields yet; add them with [`FieldSpec::field`].
    pub fn namespace() -> Self {
        Self {
            fields: Some(Spec::new()),
            ..Self::default()
        }
    }

    /// A record with no entry fields yet; add them with
    /// [`FieldSpec::entry_field`].
    pub fn record() -> Self {
        Self {
            entry_fields: Some(Spec::new()),
            ..Self::default()
        }
    }

    pub fn initial<F>(mut self, f: F) -> Self
    where
        F: Fn() -> Result<Value, BoxError> + Send + Sync + 'static,
    {
        self.initial = Some(Arc::new(f));
        self
    }

    /// Constant initial value.
    pub fn initial_value(self, value: impl Into<Value>) -> Self {
        let value = value.into();
        self.initial(move || Ok(value.clone()))
    }

    pub fn map_type<F>(mut self, f: F) -> Self
    where
        F: Fn(Value) -> Result<Value, BoxError> + Send + Sync + 'static,
    {
        self.map_type = Some(Arc::new(f));
        self
    }

    pub fn fixup<F>(mut self, f: F) -> Self
    where
        F: Fn(&Value) -> Result<Option<Fixup>, BoxError> + Send + Sync + 'static,
    {
        self.fixup = Some(Arc::new(f));
        self
    }

    pub fn validate<F>(mut self, f: F) -> Self
    where
        F: Fn(&Value) -> Result<Option<Vec<String>>, BoxError> + Send + Sync + 'static,
    {
        self.validate = Some(Arc::new(f));
        self
    }

    /// Add a child setting, turning this declaration into a namespace.
    pub fn field(mut self, name: impl Into<String>, spec: FieldSpec) -> Self {
        self.fields
            .get_or_insert_with(Spec::new)
            .insert(name.into(), spec);
        self
    }

    /// Add a field to the template applied to every record entry, turning
    /// this declaration into a record.
    pub fn entry_field(mut self, name: impl Into<String>, spec: FieldSpec) -> Self {
        self.entry_fields
            .get_or_insert_with(Spec::new)
            .insert(name.into(), spec);
        self
    }

    pub fn shorthand<F>(mut self, f: F) -> Self
    where
        F: Fn(Value) -> Result<Value, BoxError> + Send + Sync + 'static,
    {
        self.shorthand = Some(Arc::new(f));
        self
    }

    pub fn entry_shorthand<F>(mut self, f: F) -> Self
    where
        F: Fn(Value) -> Result<Value, BoxError> + Send + Sync + 'static,
    {
        self.entry_shorthand = Some(Arc::new(f));
        self
    }
}

impl std::fmt::Debug for FieldSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FieldSpec")
            .field("initial", &self.initial.is_some())
            .field("map_type", &self.map_type.is_some())
            .field("fixup", &self.fixup.is_some())
            .field("validate", &self.validate.is_some())
            .field("fields", &self.fields)
            .field("entry_fields", &self.entry_fields)
            .field("shorthand", &self.shorthand.is_some())
            .field("entry_shorthand", &self.entry_shorthand.is_some())
            .finish()
    }
}
