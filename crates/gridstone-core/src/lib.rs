//! Core systems for Gridstone.
//!
//! This crate provides the non-UI foundations the property grid engine is
//! built on:
//!
//! - **Signals**: type-safe observer connections ([`Signal`])
//! - **Values**: dynamically typed field values and declared kinds
//!   ([`Value`], [`ValueKind`], [`EnumType`])
//! - **Conversion**: tolerant value coercion and display formatting
//!   ([`try_change_type`], [`format_value`])
//! - **Observable store**: a validated keyed value store with change
//!   announcement, veto hooks and rollback ([`DictionaryObject`])
//! - **Dispatch**: marshaling closures to a host thread ([`Dispatcher`])
//!
//! The grid engine itself lives in the `gridstone` crate.
//!
//! # Example
//!
//! ```
//! use gridstone_core::{DictionaryObject, SetOptions, Value};
//!
//! let dict = DictionaryObject::new();
//! dict.changed().connect(|change| {
//!     println!("{} is now {:?}", change.key, change.new);
//! });
//!
//! assert!(dict.set("Width", Value::I64(800)));
//! // Writing the same value again is not a change.
//! assert!(!dict.set("Width", Value::I64(800)));
//! ```

pub mod convert;
pub mod dictionary;
pub mod dispatch;
pub mod logging;
pub mod signal;
pub mod value;

pub use convert::{decamelize, enum_to_u64, format_value, try_change_type, ConvertError};
pub use dictionary::{
    DictionaryObject, FieldError, HookId, PropertyChange, SetOptions,
};
pub use dispatch::{DispatchFn, Dispatcher, ImmediateDispatcher, QueuedDispatcher};
pub use signal::{ConnectionGuard, ConnectionId, Signal};
pub use value::{EnumMember, EnumType, Value, ValueKind};
