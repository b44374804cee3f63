//! Source object descriptions.
//!
//! The grid never reflects over concrete types. A source object implements
//! [`Inspect`] and hands out a static [`TypeDescriptor`], a declarative
//! table of [`FieldDescriptor`]s with getter and setter closures. This is
//! the seam between arbitrary application types and the untyped engine.

use std::any::Any;
use std::collections::HashMap;

use gridstone_core::{Signal, Value, ValueKind};

/// A source object the grid can inspect.
///
/// Implementors usually keep their [`TypeDescriptor`] in a `static
/// OnceLock` so it can be handed out as `&'static`.
pub trait Inspect: Send + Sync + 'static {
    /// The object's field table.
    fn descriptor(&self) -> &'static TypeDescriptor;

    /// Signal announcing a source-side field change by name, when the
    /// object supports change notification.
    fn changed(&self) -> Option<&Signal<String>> {
        None
    }

    /// Downcast support for typed getters and setters.
    fn as_any(&self) -> &dyn Any;
}

/// Declarative per-field metadata, the equivalent of annotating the field
/// at its declaration site.
#[derive(Debug, Clone, Default)]
pub struct FieldMetadata {
    /// Exclude the field from scanning entirely.
    pub ignore: bool,
    /// Surface the field as writable even when the descriptor says
    /// read-only.
    pub force_read_write: bool,
    /// Default value override; takes precedence over the descriptor's.
    pub default_value: Option<Value>,
    /// Override whether the field is treated as an enumeration.
    pub is_enum: Option<bool>,
    /// Override whether the field is treated as a flags enumeration.
    pub is_flags_enum: Option<bool>,
    /// Sort weight; non-zero values sort before name order.
    pub sort_order: i32,
    /// Free-form hints consumed by editors.
    pub hints: Vec<(String, Value)>,
    /// Names an alternate property wrapper for factories to match on.
    pub wrapper: Option<&'static str>,
}

impl FieldMetadata {
    /// Attach a hint.
    pub fn with_hint(mut self, name: impl Into<String>, value: Value) -> Self {
        self.hints.push((name.into(), value));
        self
    }
}

type Getter = Box<dyn Fn(&dyn Inspect) -> Value + Send + Sync>;
type Setter = Box<dyn Fn(&dyn Inspect, Value) -> Result<(), String> + Send + Sync>;

/// Describes one field of a source type: its declared kind, display
/// attributes and access closures.
pub struct FieldDescriptor {
    /// The field's identifier.
    pub name: &'static str,
    /// The field's declared kind.
    pub kind: ValueKind,
    /// Display name override.
    pub display_name: Option<&'static str>,
    /// Grouping category.
    pub category: Option<&'static str>,
    /// Human-readable description.
    pub description: Option<&'static str>,
    /// Whether the field refuses writes regardless of setter presence.
    pub read_only: bool,
    /// Whether the field is surfaced at all.
    pub browsable: bool,
    /// Sort weight; non-zero values sort before name order.
    pub sort_order: i32,
    /// The field's default value, used for reset and is-default checks.
    pub default_value: Option<Value>,
    /// Declaration-site metadata.
    pub metadata: FieldMetadata,
    getter: Getter,
    setter: Option<Setter>,
}

impl FieldDescriptor {
    /// Describe a read-only field with a getter.
    pub fn new<F>(name: &'static str, kind: ValueKind, getter: F) -> Self
    where
        F: Fn(&dyn Inspect) -> Value + Send + Sync + 'static,
    {
        Self {
            name,
            kind,
            display_name: None,
            category: None,
            description: None,
            read_only: false,
            browsable: true,
            sort_order: 0,
            default_value: None,
            metadata: FieldMetadata::default(),
            getter: Box::new(getter),
            setter: None,
        }
    }

    /// Attach a setter. The setter may normalize the incoming value; the
    /// grid re-reads through the getter after a successful set.
    pub fn with_setter<F>(mut self, setter: F) -> Self
    where
        F: Fn(&dyn Inspect, Value) -> Result<(), String> + Send + Sync + 'static,
    {
        self.setter = Some(Box::new(setter));
        self
    }

    /// Set the display name.
    pub fn with_display_name(mut self, display_name: &'static str) -> Self {
        self.display_name = Some(display_name);
        self
    }

    /// Set the grouping category.
    pub fn with_category(mut self, category: &'static str) -> Self {
        self.category = Some(category);
        self
    }

    /// Set the description.
    pub fn with_description(mut self, description: &'static str) -> Self {
        self.description = Some(description);
        self
    }

    /// Mark the field read-only even if a setter is attached.
    pub fn read_only(mut self) -> Self {
        self.read_only = true;
        self
    }

    /// Exclude the field from scanning.
    pub fn non_browsable(mut self) -> Self {
        self.browsable = false;
        self
    }

    /// Set the sort weight.
    pub fn with_sort_order(mut self, sort_order: i32) -> Self {
        self.sort_order = sort_order;
        self
    }

    /// Set the default value.
    pub fn with_default(mut self, default_value: Value) -> Self {
        self.default_value = Some(default_value);
        self
    }

    /// Set the declaration-site metadata.
    pub fn with_metadata(mut self, metadata: FieldMetadata) -> Self {
        self.metadata = metadata;
        self
    }

    /// Read the field from `source`.
    pub fn get(&self, source: &dyn Inspect) -> Value {
        (self.getter)(source)
    }

    /// Write the field on `source`.
    pub fn set(&self, source: &dyn Inspect, value: Value) -> Result<(), String> {
        match &self.setter {
            Some(setter) => setter(source, value),
            None => Err(format!("field '{}' has no setter", self.name)),
        }
    }

    /// Whether writes are refused, either explicitly or for lack of a
    /// setter.
    pub fn is_read_only(&self) -> bool {
        self.read_only || self.setter.is_none()
    }
}

impl std::fmt::Debug for FieldDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FieldDescriptor")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("read_only", &self.read_only)
            .field("browsable", &self.browsable)
            .finish_non_exhaustive()
    }
}

/// A source type's field table plus type-level hints.
#[derive(Debug, Default)]
pub struct TypeDescriptor {
    /// The described type's name, for display and diagnostics.
    pub type_name: &'static str,
    hints: HashMap<String, Value>,
    fields: Vec<FieldDescriptor>,
}

impl TypeDescriptor {
    /// Start describing a type.
    pub fn new(type_name: &'static str) -> Self {
        Self {
            type_name,
            hints: HashMap::new(),
            fields: Vec::new(),
        }
    }

    /// Add a field.
    ///
    /// # Panics
    ///
    /// Panics on duplicate field names; descriptor tables are built once
    /// at startup and a duplicate is a structural error.
    pub fn field(mut self, field: FieldDescriptor) -> Self {
        assert!(
            !self.fields.iter().any(|f| f.name == field.name),
            "duplicate field name '{}' in descriptor for {}",
            field.name,
            self.type_name,
        );
        self.fields.push(field);
        self
    }

    /// Attach a type-level hint.
    pub fn with_hint(mut self, name: impl Into<String>, value: Value) -> Self {
        self.hints.insert(name.into(), value);
        self
    }

    /// The described fields, in declaration order.
    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    /// Find a field by name.
    pub fn field_by_name(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// The type-level hints.
    pub fn hints(&self) -> &HashMap<String, Value> {
        &self.hints
    }
}

static_assertions::assert_impl_all!(TypeDescriptor: Send, Sync);

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::RwLock;
    use std::sync::OnceLock;

    struct Point {
        x: RwLock<i64>,
    }

    impl Point {
        fn table() -> &'static TypeDescriptor {
            static TABLE: OnceLock<TypeDescriptor> = OnceLock::new();
            TABLE.get_or_init(|| {
                TypeDescriptor::new("Point")
                    .field(
                        FieldDescriptor::new("x", ValueKind::I64, |source| {
                            let point = source.as_any().downcast_ref::<Point>().unwrap();
                            Value::I64(*point.x.read())
                        })
                        .with_setter(|source, value| {
                            let point = source.as_any().downcast_ref::<Point>().unwrap();
                            let n = value.as_i64().ok_or("expected an integer")?;
                            *point.x.write() = n;
                            Ok(())
                        })
                        .with_default(Value::I64(0)),
                    )
                    .field(FieldDescriptor::new("magnitude", ValueKind::F64, |source| {
                        let point = source.as_any().downcast_ref::<Point>().unwrap();
                        Value::F64((*point.x.read() as f64).abs())
                    }))
            })
        }
    }

    impl Inspect for Point {
        fn descriptor(&self) -> &'static TypeDescriptor {
            Point::table()
        }

        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    #[test]
    fn test_getter_and_setter_round_trip() {
        let point = Point { x: RwLock::new(3) };
        let field = point.descriptor().field_by_name("x").unwrap();
        assert_eq!(field.get(&point), Value::I64(3));
        field.set(&point, Value::I64(9)).unwrap();
        assert_eq!(field.get(&point), Value::I64(9));
    }

    #[test]
    fn test_setterless_field_is_read_only() {
        let point = Point { x: RwLock::new(-4) };
        let field = point.descriptor().field_by_name("magnitude").unwrap();
        assert!(field.is_read_only());
        assert_eq!(field.get(&point), Value::F64(4.0));
        assert!(field.set(&point, Value::F64(1.0)).is_err());
    }

    #[test]
    #[should_panic(expected = "duplicate field name")]
    fn test_duplicate_field_panics() {
        let _ = TypeDescriptor::new("Bad")
            .field(FieldDescriptor::new("a", ValueKind::I64, |_| Value::I64(0)))
            .field(FieldDescriptor::new("a", ValueKind::I64, |_| Value::I64(0)));
    }
}
