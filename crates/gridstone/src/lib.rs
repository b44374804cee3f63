//! Gridstone: a UI-agnostic property grid engine.
//!
//! The engine inspects a selected source object and surfaces each of its
//! fields as an observable [`GridProperty`]: typed value, display
//! attributes, validation errors, and for enumerations a checkable item
//! sub-model. Hosts bind their widgets to the properties and the signals;
//! the engine carries no rendering.
//!
//! # Pieces
//!
//! - [`Inspect`] / [`TypeDescriptor`]: how source types describe their
//!   fields to the engine
//! - [`PropertyGrid`]: configuration and selection
//! - [`GridObject`]: the scanned object, following source notifications
//! - [`GridProperty`]: one field's observable state and write pipeline
//! - [`GridEnum`] / [`GridEnumItem`]: enumeration sub-models
//!
//! # Example
//!
//! ```ignore
//! use gridstone::{PropertyGrid, Inspect};
//! use std::sync::Arc;
//!
//! let grid = PropertyGrid::new();
//! grid.set_selected_source(Some(Arc::new(settings) as Arc<dyn Inspect>));
//!
//! let object = grid.selected_object().unwrap();
//! for property in object.properties() {
//!     println!("{}: {}", property.actual_display_name(), property.formatted_value());
//! }
//! ```

pub mod comparer;
pub mod descriptor;
pub mod grid;
pub mod grid_enum;
pub mod object;
pub mod property;

pub use comparer::{DefaultPropertyComparer, PropertyComparer};
pub use descriptor::{FieldDescriptor, FieldMetadata, Inspect, TypeDescriptor};
pub use grid::{DefaultGridFactory, GridFactory, PropertyGrid};
pub use grid_enum::{GridEnum, GridEnumItem};
pub use object::GridObject;
pub use property::{keys, GridProperty};

pub use gridstone_core as core;
pub use gridstone_core::{
    DictionaryObject, Dispatcher, EnumMember, EnumType, ImmediateDispatcher, QueuedDispatcher,
    SetOptions, Signal, Value, ValueKind,
};
