//! An observable keyed value store with validation.
//!
//! [`DictionaryObject`] is the state backbone of the engine: a thread-safe
//! map from string keys to [`Value`]s that announces changes through
//! signals, lets observers veto a change before it happens, and runs an
//! optional validator after each write. Writes go through [`set_with`],
//! which takes a [`SetOptions`] describing which parts of the pipeline to
//! run.
//!
//! [`set_with`]: DictionaryObject::set_with

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use slotmap::{new_key_type, SlotMap};
use tracing::trace;

use crate::logging::targets;
use crate::signal::Signal;
use crate::value::Value;

new_key_type! {
    /// Identifies a registered change veto hook.
    pub struct HookId;
}

/// A key's value transition, as seen by observers.
#[derive(Debug, Clone)]
pub struct PropertyChange {
    /// The key being written.
    pub key: String,
    /// The previous value, or `None` if the key was never set.
    pub old: Option<Value>,
    /// The incoming value.
    pub new: Value,
}

/// A validation failure attached to a key.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldError {
    /// The key the error belongs to.
    pub key: String,
    /// Human-readable error text.
    pub text: String,
}

type Validator = Box<dyn Fn(&str, &Value) -> Vec<String> + Send + Sync>;
type EqualityFn = Arc<dyn Fn(&Value, &Value) -> bool + Send + Sync>;
type VetoHook = Box<dyn Fn(&PropertyChange) -> bool + Send + Sync>;

/// Per-write pipeline switches.
///
/// The default runs the whole pipeline. Each switch disables (or in the case
/// of `force_changed`, forces) one stage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SetOptions {
    /// Skip the veto hooks.
    pub skip_changing: bool,
    /// Store the value without announcing the change.
    pub skip_changed: bool,
    /// Commit even when the new value equals the stored one.
    pub skip_equality_check: bool,
    /// Do not announce validation error transitions.
    pub skip_error_notification: bool,
    /// Announce a change even when the equality check says nothing changed.
    pub force_changed: bool,
    /// Restore the previous value when validation fails.
    pub rollback_on_error: bool,
}

impl SetOptions {
    /// Run the full pipeline.
    pub const NONE: SetOptions = SetOptions {
        skip_changing: false,
        skip_changed: false,
        skip_equality_check: false,
        skip_error_notification: false,
        force_changed: false,
        rollback_on_error: false,
    };

    /// Returns options with the veto stage disabled.
    pub const fn with_skip_changing(mut self) -> Self {
        self.skip_changing = true;
        self
    }

    /// Returns options with change announcement disabled.
    pub const fn with_skip_changed(mut self) -> Self {
        self.skip_changed = true;
        self
    }

    /// Returns options that commit regardless of equality.
    pub const fn with_skip_equality_check(mut self) -> Self {
        self.skip_equality_check = true;
        self
    }

    /// Returns options with error announcement disabled.
    pub const fn with_skip_error_notification(mut self) -> Self {
        self.skip_error_notification = true;
        self
    }

    /// Returns options that announce a change even for equal values.
    pub const fn with_force_changed(mut self) -> Self {
        self.force_changed = true;
        self
    }

    /// Returns options that roll the write back when validation fails.
    pub const fn with_rollback_on_error(mut self) -> Self {
        self.rollback_on_error = true;
        self
    }
}

/// An observable, validated map from string keys to values.
pub struct DictionaryObject {
    values: RwLock<HashMap<String, Value>>,
    errors: RwLock<Vec<FieldError>>,
    hooks: RwLock<SlotMap<HookId, VetoHook>>,
    validator: RwLock<Option<Validator>>,
    equality: RwLock<Option<EqualityFn>>,
    /// Announced after a key's value changed; carries the transition.
    changed: Signal<PropertyChange>,
    /// Announced when a key's error set changed; carries the key.
    errors_changed: Signal<String>,
    /// Announced when a write was rolled back; carries the rejected
    /// transition.
    rolled_back: Signal<PropertyChange>,
}

impl DictionaryObject {
    /// Create an empty store with no validator and structural equality.
    pub fn new() -> Self {
        Self {
            values: RwLock::new(HashMap::new()),
            errors: RwLock::new(Vec::new()),
            hooks: RwLock::new(SlotMap::with_key()),
            validator: RwLock::new(None),
            equality: RwLock::new(None),
            changed: Signal::new(),
            errors_changed: Signal::new(),
            rolled_back: Signal::new(),
        }
    }

    /// The change signal.
    pub fn changed(&self) -> &Signal<PropertyChange> {
        &self.changed
    }

    /// The error transition signal.
    pub fn errors_changed(&self) -> &Signal<String> {
        &self.errors_changed
    }

    /// The rollback signal.
    pub fn rolled_back(&self) -> &Signal<PropertyChange> {
        &self.rolled_back
    }

    /// Install the validator run after each write.
    ///
    /// The validator returns error texts for the written key; an empty
    /// vector means the value is acceptable.
    pub fn set_validator<F>(&self, validator: F)
    where
        F: Fn(&str, &Value) -> Vec<String> + Send + Sync + 'static,
    {
        *self.validator.write() = Some(Box::new(validator));
    }

    /// Replace the equality policy used by the pre-write equality check.
    pub fn set_equality<F>(&self, equality: F)
    where
        F: Fn(&Value, &Value) -> bool + Send + Sync + 'static,
    {
        *self.equality.write() = Some(Arc::new(equality));
    }

    /// Register a hook that may veto a change by returning `false`.
    pub fn add_changing_hook<F>(&self, hook: F) -> HookId
    where
        F: Fn(&PropertyChange) -> bool + Send + Sync + 'static,
    {
        self.hooks.write().insert(Box::new(hook))
    }

    /// Remove a previously registered veto hook.
    pub fn remove_changing_hook(&self, id: HookId) {
        self.hooks.write().remove(id);
    }

    /// Read a key's value, if set.
    pub fn get(&self, key: &str) -> Option<Value> {
        self.values.read().get(key).cloned()
    }

    /// Read a key's value, or `default` if unset.
    pub fn get_or(&self, key: &str, default: Value) -> Value {
        self.get(key).unwrap_or(default)
    }

    /// Write a key running the full pipeline. Returns whether the stored
    /// value changed.
    pub fn set(&self, key: &str, value: Value) -> bool {
        self.set_with(key, value, SetOptions::NONE)
    }

    /// Write a key with per-call pipeline switches. Returns whether the
    /// stored value changed (a forced announcement still returns `false`
    /// when the value was equal).
    pub fn set_with(&self, key: &str, value: Value, options: SetOptions) -> bool {
        let old = self.get(key);

        if !options.skip_equality_check {
            if let Some(old) = &old {
                if self.values_equal(old, &value) {
                    if options.force_changed && !options.skip_changed {
                        trace!(target: targets::DICTIONARY, key, "forced change announcement");
                        self.changed.emit(&PropertyChange {
                            key: key.to_string(),
                            old: Some(old.clone()),
                            new: value,
                        });
                    }
                    return false;
                }
            }
        }

        let change = PropertyChange {
            key: key.to_string(),
            old: old.clone(),
            new: value.clone(),
        };

        if !options.skip_changing {
            let hooks = self.hooks.read();
            if hooks.values().any(|hook| !hook(&change)) {
                trace!(target: targets::DICTIONARY, key, "change vetoed");
                return false;
            }
        }

        self.values.write().insert(key.to_string(), value.clone());

        let errors_diff = self.run_validator(key, &value);
        if errors_diff && !options.skip_error_notification {
            self.errors_changed.emit(&key.to_string());
        }

        if options.rollback_on_error && !self.errors_for(key).is_empty() {
            trace!(target: targets::DICTIONARY, key, "rolling back on validation error");
            {
                let mut values = self.values.write();
                match old {
                    Some(old) => {
                        values.insert(key.to_string(), old);
                    }
                    None => {
                        values.remove(key);
                    }
                }
            }
            self.rolled_back.emit(&change);
            return false;
        }

        if !options.skip_changed {
            self.changed.emit(&change);
        }
        true
    }

    /// Attach an error to a key, replacing identical text. Announces the
    /// transition when the error set actually changed.
    pub fn set_error(&self, key: &str, text: impl Into<String>) {
        let text = text.into();
        {
            let errors = self.errors.read();
            if errors.iter().any(|e| e.key == key && e.text == text) {
                return;
            }
        }
        self.errors.write().push(FieldError {
            key: key.to_string(),
            text,
        });
        self.errors_changed.emit(&key.to_string());
    }

    /// Remove all errors attached to a key. Announces when any existed.
    pub fn clear_errors(&self, key: &str) {
        let removed = {
            let mut errors = self.errors.write();
            let before = errors.len();
            errors.retain(|e| e.key != key);
            before != errors.len()
        };
        if removed {
            self.errors_changed.emit(&key.to_string());
        }
    }

    /// The errors currently attached to a key.
    pub fn errors_for(&self, key: &str) -> Vec<FieldError> {
        self.errors
            .read()
            .iter()
            .filter(|e| e.key == key)
            .cloned()
            .collect()
    }

    /// Whether any key currently has errors.
    pub fn has_errors(&self) -> bool {
        !self.errors.read().is_empty()
    }

    /// A key's error texts joined with `sep`, or `None` when error-free.
    pub fn errors_text(&self, key: &str, sep: &str) -> Option<String> {
        let errors = self.errors_for(key);
        if errors.is_empty() {
            return None;
        }
        let texts: Vec<&str> = errors.iter().map(|e| e.text.as_str()).collect();
        Some(texts.join(sep))
    }

    fn values_equal(&self, a: &Value, b: &Value) -> bool {
        match self.equality.read().as_ref() {
            Some(eq) => eq(a, b),
            None => a == b,
        }
    }

    /// Run the validator for a key and replace its error set. Returns
    /// whether the error set changed.
    fn run_validator(&self, key: &str, value: &Value) -> bool {
        let texts = match self.validator.read().as_ref() {
            Some(validator) => validator(key, value),
            None => return false,
        };
        let mut errors = self.errors.write();
        let before: Vec<String> = errors
            .iter()
            .filter(|e| e.key == key)
            .map(|e| e.text.clone())
            .collect();
        if before == texts {
            return false;
        }
        errors.retain(|e| e.key != key);
        for text in texts {
            errors.push(FieldError {
                key: key.to_string(),
                text,
            });
        }
        true
    }
}

impl Default for DictionaryObject {
    fn default() -> Self {
        Self::new()
    }
}

static_assertions::assert_impl_all!(DictionaryObject: Send, Sync);
