//! Invocation of user-supplied functions
//!
//! Every call into user code goes through here so failures are wrapped
//! uniformly with the dotted name of the setting involved.

use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;

use crate::error::{BoxError, Result, SettingsError};
use crate::spec::{FixupFn, InitialFn, MapTypeFn, ShorthandFn, ValidateFn};

/// Tracing target of the default fixup warning.
pub const FIXUP_TARGET: &str = "settings_tree::fixup";

/// Path tag attached to fixup warnings.
pub const FIXUP_TAG: &str = "settings.fixup";

/// Details of one applied fixup.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FixupInfo {
    pub name: String,
    pub before: Value,
    pub after: Value,
    pub messages: Vec<String>,
}

/// Custom fixup handler. The second argument is the default handler, which
/// a custom handler may call to keep the default warning.
pub type OnFixupFn =
    Arc<dyn Fn(&FixupInfo, &dyn Fn(&FixupInfo)) -> std::result::Result<(), BoxError> + Send + Sync>;

/// Default fixup handler: one structured warning per fixup.
pub fn default_on_fixup(info: &FixupInfo) {
    tracing::warn!(
        target: FIXUP_TARGET,
        tag = FIXUP_TAG,
        name = %info.name,
        before = %info.before,
        after = %info.after,
        messages = ?info.messages,
        "Setting \"{}\" was fixed up from {} to {}",
        info.name,
        info.before,
        info.after
    );
}

/// Runs user functions for one resolution pass.
pub(crate) struct Runner<'a> {
    on_fixup: Option<&'a OnFixupFn>,
}

impl<'a> Runner<'a> {
    pub fn new(on_fixup: Option<&'a OnFixupFn>) -> Self {
        Self { on_fixup }
    }

    pub fn initializer(&self, name: &str, f: &InitialFn) -> Result<Value> {
        f().map_err(|source| SettingsError::Initializer {
            name: name.to_string(),
            source,
        })
    }

    pub fn map_type(&self, name: &str, f: &MapTypeFn, input: Value) -> Result<Value> {
        f(input).map_err(|source| SettingsError::MapType {
            name: name.to_string(),
            source,
        })
    }

    /// Run a fixup and report the repair. Returns the value to use onward.
    pub fn fixup(&self, name: &str, f: &FixupFn, value: Value) -> Result<Value> {
        let fixed = match f(&value) {
            Ok(fixed) => fixed,
            Err(source) => {
                return Err(SettingsError::Fixup {
                    name: name.to_string(),
                    value,
                    source,
                })
            }
        };
        let Some(fixed) = fixed else {
            return Ok(value);
        };

        let info = FixupInfo {
            name: name.to_string(),
            before: value,
            after: fixed.value,
            messages: fixed.messages,
        };
        match self.on_fixup {
            Some(handler) => {
                handler(&info, &default_on_fixup).map_err(|source| SettingsError::OnFixup {
                    name: name.to_string(),
                    source,
                })?;
            }
            None => default_on_fixup(&info),
        }
        Ok(info.after)
    }

    /// Run a validator. Any returned messages are fatal.
    pub fn validate(&self, name: &str, f: &ValidateFn, value: &Value) -> Result<()> {
        match f(value) {
            Ok(None) => Ok(()),
            Ok(Some(messages)) => Err(SettingsError::Validation {
                name: name.to_string(),
                value: value.clone(),
                messages,
            }),
            Err(source) => Err(SettingsError::Validate {
                name: name.to_string(),
                value: value.clone(),
                source,
            }),
        }
    }

    /// Expand a non-object input. The expansion must itself be an object.
    pub fn shorthand(
        &self,
        name: &str,
        f: &ShorthandFn,
        value: Value,
    ) -> Result<serde_json::Map<String, Value>> {
        match f(value.clone()) {
            Ok(Value::Object(map)) => Ok(map),
            Ok(other) => Err(SettingsError::Shorthand {
                name: name.to_string(),
                value,
                source: format!("shorthand must expand to an object, got {}", other).into(),
            }),
            Err(source) => Err(SettingsError::Shorthand {
                name: name.to_string(),
                value,
                source,
            }),
        }
    }
}
