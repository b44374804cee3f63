//! A single surfaced property.
//!
//! [`GridProperty`] mirrors one field of the selected source object. All of
//! its visible state lives in an internal [`DictionaryObject`] under
//! well-known keys (see [`keys`]), so any attribute change flows through
//! the same observable pipeline as the value itself. Attributes the grid
//! derives from others (formatted value, is-default, read-write) are not
//! stored; they are recomputed on read and announced through a fixed
//! derived-notification table whenever an input key changes.

use std::collections::HashMap;
use std::sync::{Arc, Weak};

use parking_lot::RwLock;
use tracing::trace;

use gridstone_core::logging::targets;
use gridstone_core::{
    format_value, try_change_type, DictionaryObject, PropertyChange, SetOptions, Signal, Value,
    ValueKind,
};

use crate::descriptor::FieldDescriptor;
use crate::grid::PropertyGrid;
use crate::grid_enum::GridEnum;
use crate::object::GridObject;

/// Well-known keys of a property's backing store.
pub mod keys {
    /// The property's current value.
    pub const VALUE: &str = "Value";
    /// The property's default value.
    pub const DEFAULT_VALUE: &str = "DefaultValue";
    /// Whether a default value is known.
    pub const HAS_DEFAULT_VALUE: &str = "HasDefaultValue";
    /// Whether the property refuses writes.
    pub const IS_READ_ONLY: &str = "IsReadOnly";
    /// Whether the property is an enumeration.
    pub const IS_ENUM: &str = "IsEnum";
    /// Whether the property is a flags enumeration.
    pub const IS_FLAGS_ENUM: &str = "IsFlagsEnum";
    /// Grouping category.
    pub const CATEGORY: &str = "Category";
    /// Display name.
    pub const DISPLAY_NAME: &str = "DisplayName";
    /// Human-readable description.
    pub const DESCRIPTION: &str = "Description";
    /// Sort weight.
    pub const SORT_ORDER: &str = "SortOrder";
    /// Format pattern applied by `formatted_value`, `{}` is the value.
    pub const STRING_FORMAT: &str = "StringFormat";

    /// Derived: the display rendering of the value.
    pub const FORMATTED_VALUE: &str = "FormattedValue";
    /// Derived: whether the value equals the default.
    pub const IS_DEFAULT_VALUE: &str = "IsDefaultValue";
    /// Derived: the sequence length of the value.
    pub const ENUMERABLE_COUNT: &str = "EnumerableCount";
    /// Derived: the negation of `IsReadOnly`.
    pub const IS_READ_WRITE: &str = "IsReadWrite";
    /// Derived: the negation of `IsEnum`.
    pub const IS_NOT_ENUM: &str = "IsNotEnum";
    /// Derived: the negation of `IsFlagsEnum`.
    pub const IS_NOT_FLAGS_ENUM: &str = "IsNotFlagsEnum";
}

/// Keys recomputed from other keys: when the left key changes, the right
/// keys are announced as changed too.
const DERIVED: &[(&str, &[&str])] = &[
    (
        keys::VALUE,
        &[
            keys::FORMATTED_VALUE,
            keys::IS_DEFAULT_VALUE,
            keys::ENUMERABLE_COUNT,
        ],
    ),
    (keys::STRING_FORMAT, &[keys::FORMATTED_VALUE]),
    (keys::DEFAULT_VALUE, &[keys::IS_DEFAULT_VALUE]),
    (keys::HAS_DEFAULT_VALUE, &[keys::IS_DEFAULT_VALUE]),
    (keys::IS_READ_ONLY, &[keys::IS_READ_WRITE]),
    (keys::IS_ENUM, &[keys::IS_NOT_ENUM]),
    (keys::IS_FLAGS_ENUM, &[keys::IS_NOT_FLAGS_ENUM]),
];

/// One surfaced property of the selected object.
pub struct GridProperty {
    dict: DictionaryObject,
    name: &'static str,
    kind: ValueKind,
    object: Weak<GridObject>,
    descriptor: RwLock<Option<&'static FieldDescriptor>>,
    hints: RwLock<HashMap<String, Value>>,
    // Outer None: not built yet. Inner None: the kind has no enumeration.
    enum_model: RwLock<Option<Option<Arc<GridEnum>>>>,
    weak_self: Weak<GridProperty>,
    changed: Signal<String>,
}

impl GridProperty {
    /// Create a property owned by `object` for the named field.
    pub fn new(object: &Arc<GridObject>, name: &'static str, kind: ValueKind) -> Arc<Self> {
        let property = Arc::new_cyclic(|weak| Self {
            dict: DictionaryObject::new(),
            name,
            kind,
            object: Arc::downgrade(object),
            descriptor: RwLock::new(None),
            hints: RwLock::new(HashMap::new()),
            enum_model: RwLock::new(None),
            weak_self: weak.clone(),
            changed: Signal::new(),
        });
        let weak = Arc::downgrade(&property);
        property.dict.changed().connect(move |change| {
            if let Some(property) = weak.upgrade() {
                property.on_store_changed(change);
            }
        });
        property
    }

    /// The field identifier this property mirrors.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// The property's declared kind.
    pub fn kind(&self) -> &ValueKind {
        &self.kind
    }

    /// Signal announcing changed keys, including derived ones.
    pub fn changed(&self) -> &Signal<String> {
        &self.changed
    }

    /// Signal announcing error set transitions on the backing store.
    pub fn errors_changed(&self) -> &Signal<String> {
        self.dict.errors_changed()
    }

    /// The backing store.
    pub fn store(&self) -> &DictionaryObject {
        &self.dict
    }

    /// The owning grid, while it is alive.
    pub fn grid(&self) -> Option<Arc<PropertyGrid>> {
        self.object.upgrade().and_then(|object| object.grid())
    }

    /// The owning object, while it is alive.
    pub fn object(&self) -> Option<Arc<GridObject>> {
        self.object.upgrade()
    }

    /// The source field descriptor, once described.
    pub fn descriptor(&self) -> Option<&'static FieldDescriptor> {
        *self.descriptor.read()
    }

    pub(crate) fn set_descriptor(&self, descriptor: &'static FieldDescriptor) {
        *self.descriptor.write() = Some(descriptor);
    }

    fn on_store_changed(&self, change: &PropertyChange) {
        self.changed.emit(&change.key);
        for (key, derived) in DERIVED {
            if *key == change.key {
                for derived_key in *derived {
                    self.changed.emit(&derived_key.to_string());
                }
            }
        }
        if change.key == keys::VALUE {
            let built = self.enum_model.read().clone().flatten();
            if let Some(model) = built {
                model.sync_to_value();
            }
        }
    }

    // ---- value pipeline --------------------------------------------------

    /// The current value, or the kind's default when unset.
    pub fn value(&self) -> Value {
        self.dict.get_or(keys::VALUE, self.kind.default_value())
    }

    /// Write a value through the full pipeline.
    pub fn set(&self, value: Value) -> bool {
        self.set_value(value, SetOptions::NONE)
    }

    /// Write a value: coerce it to the declared kind, push it to the source
    /// setter when one exists, re-read the source's normalized value and
    /// commit it to the backing store. Returns whether the stored value
    /// changed; failures attach an error to the `Value` key and return
    /// `false` without touching the store.
    pub fn set_value(&self, value: Value, options: SetOptions) -> bool {
        let mut coerced = match try_change_type(&value, &self.kind) {
            Ok(coerced) => coerced,
            Err(err) => {
                trace!(target: targets::PROPERTY, name = self.name, %err, "conversion failed");
                self.dict.set_error(keys::VALUE, err.to_string());
                return false;
            }
        };

        if let (Some(descriptor), Some(object)) = (self.descriptor(), self.object.upgrade()) {
            if !descriptor.is_read_only() {
                let source = object.source();
                if let Err(text) = descriptor.set(source.as_ref(), coerced.clone()) {
                    trace!(target: targets::PROPERTY, name = self.name, "source setter refused value");
                    self.dict.set_error(
                        keys::VALUE,
                        format!("cannot set value on property '{}': {text}", self.name),
                    );
                    return false;
                }
                // The setter may have normalized the value.
                coerced = descriptor.get(source.as_ref());
            }
        }

        self.dict.clear_errors(keys::VALUE);
        self.dict.set_with(keys::VALUE, coerced, options)
    }

    /// Clear the value of a nullable property. Returns whether anything
    /// changed; non-nullable properties refuse.
    pub fn nullify(&self) -> bool {
        if !self.kind.is_nullable() {
            return false;
        }
        self.set_value(Value::Null, SetOptions::NONE)
    }

    /// Reset the value to the default, when one is known.
    pub fn reset(&self) -> bool {
        if !self.has_default_value() {
            return false;
        }
        self.set_value(self.default_value(), SetOptions::NONE)
    }

    fn read_string(&self, key: &str) -> String {
        match self.dict.get(key) {
            Some(Value::Str(s)) => s,
            _ => String::new(),
        }
    }

    fn read_bool(&self, key: &str) -> bool {
        self.dict
            .get(key)
            .and_then(|v| v.as_bool())
            .unwrap_or(false)
    }

    // ---- stored attributes -----------------------------------------------

    /// The grouping category.
    pub fn category(&self) -> String {
        self.read_string(keys::CATEGORY)
    }

    /// The raw display name, possibly empty.
    pub fn display_name(&self) -> String {
        self.read_string(keys::DISPLAY_NAME)
    }

    /// The description, possibly empty.
    pub fn description(&self) -> String {
        self.read_string(keys::DESCRIPTION)
    }

    /// The sort weight.
    pub fn sort_order(&self) -> i32 {
        self.dict
            .get(keys::SORT_ORDER)
            .and_then(|v| v.as_i64())
            .unwrap_or(0) as i32
    }

    /// Whether the property refuses writes.
    pub fn is_read_only(&self) -> bool {
        self.read_bool(keys::IS_READ_ONLY)
    }

    pub(crate) fn set_read_only(&self, read_only: bool) {
        self.dict.set(keys::IS_READ_ONLY, Value::Bool(read_only));
    }

    /// Whether the property is surfaced as an enumeration.
    pub fn is_enum(&self) -> bool {
        self.read_bool(keys::IS_ENUM)
    }

    /// Whether the property is surfaced as a flags enumeration.
    pub fn is_flags_enum(&self) -> bool {
        self.read_bool(keys::IS_FLAGS_ENUM)
    }

    /// Whether a default value is known.
    pub fn has_default_value(&self) -> bool {
        self.read_bool(keys::HAS_DEFAULT_VALUE)
    }

    /// The default value, `Null` when none is known.
    pub fn default_value(&self) -> Value {
        self.dict.get_or(keys::DEFAULT_VALUE, Value::Null)
    }

    /// The format pattern applied by [`formatted_value`](Self::formatted_value).
    pub fn string_format(&self) -> Option<String> {
        match self.dict.get(keys::STRING_FORMAT) {
            Some(Value::Str(s)) if !s.is_empty() => Some(s),
            _ => None,
        }
    }

    /// Set the format pattern; `{}` stands for the value.
    pub fn set_string_format(&self, format: impl Into<String>) {
        self.dict.set(keys::STRING_FORMAT, Value::Str(format.into()));
    }

    // ---- derived attributes ----------------------------------------------

    /// The display rendering of the value, after the format pattern.
    pub fn formatted_value(&self) -> String {
        let text = format_value(&self.value());
        match self.string_format() {
            Some(format) => format.replace("{}", &text),
            None => text,
        }
    }

    /// Whether the value equals the default under the grid's equality.
    pub fn is_default_value(&self) -> bool {
        if !self.has_default_value() {
            return false;
        }
        let value = self.value();
        let default = self.default_value();
        match self.grid() {
            Some(grid) => grid.compare_for_equality(&value, &default),
            None => value == default,
        }
    }

    /// The negation of [`is_read_only`](Self::is_read_only).
    pub fn is_read_write(&self) -> bool {
        !self.is_read_only()
    }

    /// Whether the value may be absent.
    pub fn is_nullable(&self) -> bool {
        self.kind.is_nullable()
    }

    /// Whether the declared kind is a sequence.
    pub fn is_enumerable(&self) -> bool {
        self.kind.element_kind().is_some()
    }

    /// The sequence length of the value, `None` for non-sequences.
    pub fn enumerable_count(&self) -> Option<usize> {
        self.value().as_seq().map(<[Value]>::len)
    }

    /// The display name, falling back to the field identifier.
    pub fn actual_display_name(&self) -> String {
        let display_name = self.display_name();
        if display_name.is_empty() {
            self.name.to_string()
        } else {
            display_name
        }
    }

    /// The description, falling back to the display name.
    pub fn actual_description(&self) -> String {
        let description = self.description();
        if description.is_empty() {
            self.actual_display_name()
        } else {
            description
        }
    }

    // ---- errors ------------------------------------------------------------

    /// Whether the backing store currently carries errors.
    pub fn has_errors(&self) -> bool {
        self.dict.has_errors()
    }

    /// The value errors joined with newlines, `None` when error-free.
    pub fn value_errors(&self) -> Option<String> {
        self.dict.errors_text(keys::VALUE, "\n")
    }

    // ---- hints -------------------------------------------------------------

    /// Read an editor hint.
    pub fn hint(&self, name: &str) -> Option<Value> {
        self.hints.read().get(name).cloned()
    }

    /// Attach an editor hint.
    pub fn set_hint(&self, name: impl Into<String>, value: Value) {
        self.hints.write().insert(name.into(), value);
    }

    // ---- enumeration sub-model ----------------------------------------------

    /// The enumeration sub-model, built on first access. `None` for kinds
    /// with no enumeration.
    pub fn enum_model(&self) -> Option<Arc<GridEnum>> {
        {
            let built = self.enum_model.read();
            if let Some(model) = built.as_ref() {
                return model.clone();
            }
        }
        let mut built = self.enum_model.write();
        if let Some(model) = built.as_ref() {
            return model.clone();
        }
        let this = self.weak_self.upgrade()?;
        let model = match self.grid() {
            Some(grid) => grid.factory().create_enum(&this),
            None => GridEnum::new(&this),
        };
        *built = Some(model.clone());
        model
    }
}

impl std::fmt::Debug for GridProperty {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GridProperty")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("value", &self.value())
            .finish_non_exhaustive()
    }
}

static_assertions::assert_impl_all!(GridProperty: Send, Sync);
