//! Run-time values and declared-type descriptors.
//!
//! The engine inspects objects whose concrete types it does not know at
//! compile time, so every field value travels as a [`Value`] variant and
//! every field's declared type is described by a [`ValueKind`]. Enumerations
//! are described declaratively by a static [`EnumType`] table, an ordered
//! list of (name, numeric value, visibility, description), instead of any
//! runtime reflection.

use std::fmt;

/// One member of a declarative enumeration table.
#[derive(Debug)]
pub struct EnumMember {
    /// The member's identifier.
    pub name: &'static str,
    /// The member's numeric value (bit value for flags enumerations).
    pub value: u64,
    /// Hidden members exist in the type but are never surfaced as items.
    pub visible: bool,
    /// Optional human-readable text, used as the display name when present.
    pub description: Option<&'static str>,
}

impl EnumMember {
    /// Create a visible member with no description.
    pub const fn new(name: &'static str, value: u64) -> Self {
        Self {
            name,
            value,
            visible: true,
            description: None,
        }
    }

    /// Create a hidden member.
    pub const fn hidden(name: &'static str, value: u64) -> Self {
        Self {
            name,
            value,
            visible: false,
            description: None,
        }
    }

    /// Attach a description, used as the member's display name.
    pub const fn described(mut self, description: &'static str) -> Self {
        self.description = Some(description);
        self
    }

    /// The text an item for this member should display.
    pub fn display_name(&self) -> &'static str {
        self.description.unwrap_or(self.name)
    }
}

/// A declarative enumeration table.
///
/// Built once per enumeration as a `static` and referenced by
/// [`ValueKind::Enum`] and [`Value::Enum`]. Member order is surfacing order.
#[derive(Debug)]
pub struct EnumType {
    /// The enumeration's type name, for display and diagnostics.
    pub name: &'static str,
    /// Whether members are intended to be bitwise-combined.
    pub flags: bool,
    /// Ordered member table.
    pub members: &'static [EnumMember],
}

impl EnumType {
    /// Find the member whose numeric value is exactly `bits`.
    pub fn member(&self, bits: u64) -> Option<&EnumMember> {
        self.members.iter().find(|m| m.value == bits)
    }

    /// Find a member by identifier.
    pub fn member_by_name(&self, name: &str) -> Option<&EnumMember> {
        self.members.iter().find(|m| m.name == name)
    }

    /// Iterate over the members that may be surfaced.
    pub fn visible_members(&self) -> impl Iterator<Item = &EnumMember> {
        self.members.iter().filter(|m| m.visible)
    }
}

// Enum tables are statics; identity comparison is the right equality.
impl PartialEq for EnumType {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self, other)
    }
}

impl Eq for EnumType {}

/// A run-time value of a field.
///
/// `Null` doubles as the "no value" representation for nullable fields.
#[derive(Debug, Clone, Default)]
pub enum Value {
    /// No value.
    #[default]
    Null,
    /// Boolean data.
    Bool(bool),
    /// Signed integer data.
    I64(i64),
    /// Unsigned integer data.
    U64(u64),
    /// Floating point data.
    F64(f64),
    /// String data.
    Str(String),
    /// Sequence data.
    Seq(Vec<Value>),
    /// An enumeration value: the table it belongs to and its bit pattern.
    Enum {
        /// The declarative table this value belongs to.
        ty: &'static EnumType,
        /// The value's bit pattern.
        bits: u64,
    },
}

impl Value {
    /// Shorthand for building a string value.
    pub fn str(s: impl Into<String>) -> Self {
        Value::Str(s.into())
    }

    /// Whether this is the null representation.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// The value as a bool, if it is one.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// The value as an `i64`, if it is integral and in range.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::I64(n) => Some(*n),
            Value::U64(n) => i64::try_from(*n).ok(),
            _ => None,
        }
    }

    /// The value as a string slice, if it is a string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    /// The value as a sequence, if it is one.
    pub fn as_seq(&self) -> Option<&[Value]> {
        match self {
            Value::Seq(items) => Some(items),
            _ => None,
        }
    }

    /// A short name for the value's run-time type, used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::I64(_) => "i64",
            Value::U64(_) => "u64",
            Value::F64(_) => "f64",
            Value::Str(_) => "str",
            Value::Seq(_) => "seq",
            Value::Enum { ty, .. } => ty.name,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Seq(a), Value::Seq(b)) => a == b,
            (Value::Enum { ty: ta, bits: ba }, Value::Enum { ty: tb, bits: bb }) => {
                ta == tb && ba == bb
            }
            // Numeric values compare across representations.
            (Value::I64(a), Value::I64(b)) => a == b,
            (Value::U64(a), Value::U64(b)) => a == b,
            (Value::F64(a), Value::F64(b)) => a == b,
            (Value::I64(a), Value::U64(b)) | (Value::U64(b), Value::I64(a)) => {
                u64::try_from(*a).is_ok_and(|a| a == *b)
            }
            (Value::I64(a), Value::F64(b)) | (Value::F64(b), Value::I64(a)) => *a as f64 == *b,
            (Value::U64(a), Value::F64(b)) | (Value::F64(b), Value::U64(a)) => *a as f64 == *b,
            _ => false,
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::I64(v)
    }
}

impl From<u64> for Value {
    fn from(v: u64) -> Self {
        Value::U64(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::F64(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Str(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Str(v)
    }
}

/// The declared type of a field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValueKind {
    /// Boolean.
    Bool,
    /// Signed integer.
    I64,
    /// Unsigned integer.
    U64,
    /// Floating point.
    F64,
    /// String.
    Str,
    /// Sequence with a fixed element type.
    Seq(Box<ValueKind>),
    /// Enumeration described by a static table.
    Enum(&'static EnumType),
    /// A type whose values may also be absent.
    Nullable(Box<ValueKind>),
}

impl ValueKind {
    /// Shorthand for a nullable version of `kind`.
    pub fn nullable(kind: ValueKind) -> Self {
        ValueKind::Nullable(Box::new(kind))
    }

    /// Shorthand for a sequence of `element`.
    pub fn seq(element: ValueKind) -> Self {
        ValueKind::Seq(Box::new(element))
    }

    /// Whether values of this kind may be absent.
    pub fn is_nullable(&self) -> bool {
        matches!(self, ValueKind::Nullable(_))
    }

    /// The non-nullable kind underneath, seeing through one `Nullable`.
    pub fn unwrap_nullable(&self) -> &ValueKind {
        match self {
            ValueKind::Nullable(inner) => inner,
            other => other,
        }
    }

    /// The enumeration table, if this is an enum or nullable enum kind.
    pub fn as_enum(&self) -> Option<&'static EnumType> {
        match self.unwrap_nullable() {
            ValueKind::Enum(ty) => Some(ty),
            _ => None,
        }
    }

    /// The element kind, if this is a sequence or nullable sequence kind.
    pub fn element_kind(&self) -> Option<&ValueKind> {
        match self.unwrap_nullable() {
            ValueKind::Seq(element) => Some(element),
            _ => None,
        }
    }

    /// The default value for this kind (what an unset field reads as).
    ///
    /// Nullable kinds default to `Null`; a non-nullable enum degrades to its
    /// zero bit pattern.
    pub fn default_value(&self) -> Value {
        match self {
            ValueKind::Bool => Value::Bool(false),
            ValueKind::I64 => Value::I64(0),
            ValueKind::U64 => Value::U64(0),
            ValueKind::F64 => Value::F64(0.0),
            ValueKind::Str => Value::Str(String::new()),
            ValueKind::Seq(_) => Value::Seq(Vec::new()),
            ValueKind::Enum(ty) => Value::Enum { ty, bits: 0 },
            ValueKind::Nullable(_) => Value::Null,
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueKind::Bool => write!(f, "bool"),
            ValueKind::I64 => write!(f, "i64"),
            ValueKind::U64 => write!(f, "u64"),
            ValueKind::F64 => write!(f, "f64"),
            ValueKind::Str => write!(f, "str"),
            ValueKind::Seq(element) => write!(f, "seq<{element}>"),
            ValueKind::Enum(ty) => write!(f, "{}", ty.name),
            ValueKind::Nullable(inner) => write!(f, "{inner}?"),
        }
    }
}

static_assertions::assert_impl_all!(Value: Send, Sync);
