//! The inspected object wrapper.
//!
//! [`GridObject`] wraps the selected source object: it scans the source's
//! field table into [`GridProperty`] instances, keeps them sorted, pushes
//! source-side change notifications through the grid's dispatcher and
//! refreshes the affected property when they arrive.

use std::collections::HashMap;
use std::sync::{Arc, Weak};

use parking_lot::{Mutex, RwLock};
use tracing::trace;

use gridstone_core::logging::targets;
use gridstone_core::{decamelize, ConnectionId, SetOptions, Value};

use crate::descriptor::{FieldDescriptor, Inspect};
use crate::grid::PropertyGrid;
use crate::property::{keys, GridProperty};

/// The selected source object and its surfaced properties.
pub struct GridObject {
    grid: Weak<PropertyGrid>,
    source: Arc<dyn Inspect>,
    properties: RwLock<Vec<Arc<GridProperty>>>,
    hints: RwLock<HashMap<String, Value>>,
    source_connection: Mutex<Option<ConnectionId>>,
    weak_self: Weak<GridObject>,
}

impl GridObject {
    /// Wrap `source`, scan its properties and start following its change
    /// notifications.
    pub fn new(grid: &Arc<PropertyGrid>, source: Arc<dyn Inspect>) -> Arc<Self> {
        let object = Arc::new_cyclic(|weak| Self {
            grid: Arc::downgrade(grid),
            source,
            properties: RwLock::new(Vec::new()),
            hints: RwLock::new(HashMap::new()),
            source_connection: Mutex::new(None),
            weak_self: weak.clone(),
        });
        object.rescan();

        if let Some(signal) = object.source.changed() {
            let weak = Arc::downgrade(&object);
            let grid_weak = Arc::downgrade(grid);
            let id = signal.connect(move |name| {
                let Some(grid) = grid_weak.upgrade() else {
                    return;
                };
                let weak = weak.clone();
                let name = name.clone();
                grid.dispatcher().invoke(Box::new(move || {
                    if let Some(object) = weak.upgrade() {
                        object.on_source_changed(&name);
                    } else {
                        trace!(
                            target: targets::OBJECT,
                            field = %name,
                            "dropping notification for dead object"
                        );
                    }
                }));
            });
            *object.source_connection.lock() = Some(id);
        }
        object
    }

    /// The wrapped source object.
    pub fn source(&self) -> Arc<dyn Inspect> {
        self.source.clone()
    }

    /// The owning grid, while it is alive.
    pub fn grid(&self) -> Option<Arc<PropertyGrid>> {
        self.grid.upgrade()
    }

    /// The surfaced properties, in comparer order.
    pub fn properties(&self) -> Vec<Arc<GridProperty>> {
        self.properties.read().clone()
    }

    /// Find a surfaced property by field identifier.
    pub fn property(&self, name: &str) -> Option<Arc<GridProperty>> {
        self.properties
            .read()
            .iter()
            .find(|p| p.name() == name)
            .cloned()
    }

    /// Read a type-level hint of the source's descriptor.
    pub fn hint(&self, name: &str) -> Option<Value> {
        self.hints.read().get(name).cloned()
    }

    /// Rebuild the property list from the source's field table.
    pub fn rescan(&self) {
        let (Some(grid), Some(this)) = (self.grid.upgrade(), self.weak_self.upgrade()) else {
            return;
        };
        let descriptor = self.source.descriptor();
        *self.hints.write() = descriptor.hints().clone();

        let mut properties = Vec::new();
        for field in descriptor.fields() {
            if !field.browsable {
                continue;
            }
            let Some(property) = grid.factory().create_property(&this, field) else {
                continue;
            };
            self.describe(&grid, &property, field);
            if field.metadata.force_read_write {
                property.set_read_only(false);
            }
            self.refresh_property(&property, SetOptions::NONE.with_skip_changed());

            let grid_errors = Arc::downgrade(&grid);
            let name = property.name();
            property.errors_changed().connect(move |_| {
                if let Some(grid) = grid_errors.upgrade() {
                    grid.property_errors_changed().emit(&name.to_string());
                }
            });
            properties.push(property);
        }

        let comparer = grid.comparer();
        properties.sort_by(|a, b| comparer.compare(a, b));
        trace!(
            target: targets::OBJECT,
            type_name = descriptor.type_name,
            count = properties.len(),
            "scanned properties"
        );
        *self.properties.write() = properties;
    }

    /// Re-read one property's value from the source.
    pub fn refresh_property(&self, property: &Arc<GridProperty>, options: SetOptions) {
        let Some(descriptor) = property.descriptor() else {
            return;
        };
        let value = descriptor.get(self.source.as_ref());
        property.set_value(value, options);
    }

    /// Re-read every property's value from the source.
    pub fn refresh(&self) {
        for property in self.properties() {
            self.refresh_property(&property, SetOptions::NONE);
        }
    }

    // Fill the property's backing store from the field descriptor and the
    // grid's display settings.
    fn describe(&self, grid: &Arc<PropertyGrid>, property: &Arc<GridProperty>, field: &'static FieldDescriptor) {
        property.set_descriptor(field);
        let store = property.store();

        let category = match field.category {
            Some(category) if !category.trim().is_empty() => category.to_string(),
            _ => grid.default_category_name(),
        };
        store.set(keys::CATEGORY, Value::Str(category));

        // Decamelization applies to explicit overrides too.
        let display_name = field.display_name.unwrap_or(field.name);
        let display_name = if grid.decamelize_display_names() {
            decamelize(display_name)
        } else {
            display_name.to_string()
        };
        store.set(keys::DISPLAY_NAME, Value::Str(display_name));

        if let Some(description) = field.description {
            store.set(keys::DESCRIPTION, Value::str(description));
        }

        store.set(keys::IS_READ_ONLY, Value::Bool(field.is_read_only()));

        let table = field.kind.as_enum();
        let is_enum = field.metadata.is_enum.unwrap_or(table.is_some());
        let is_flags = field
            .metadata
            .is_flags_enum
            .unwrap_or_else(|| table.is_some_and(|t| t.flags));
        store.set(keys::IS_ENUM, Value::Bool(is_enum));
        store.set(keys::IS_FLAGS_ENUM, Value::Bool(is_flags));

        let sort_order = if field.metadata.sort_order != 0 {
            field.metadata.sort_order
        } else {
            field.sort_order
        };
        store.set(keys::SORT_ORDER, Value::I64(sort_order as i64));

        // Declaration-site metadata wins over the descriptor's default.
        let default = field
            .metadata
            .default_value
            .clone()
            .or_else(|| field.default_value.clone());
        if let Some(default) = default {
            store.set(keys::HAS_DEFAULT_VALUE, Value::Bool(true));
            store.set(keys::DEFAULT_VALUE, default);
        }

        for (name, value) in &field.metadata.hints {
            property.set_hint(name.clone(), value.clone());
        }
    }

    fn on_source_changed(&self, name: &str) {
        let Some(property) = self.property(name) else {
            trace!(target: targets::OBJECT, field = name, "notification for unknown field");
            return;
        };
        // Forced so observers hear about in-place mutations too.
        self.refresh_property(&property, SetOptions::NONE.with_force_changed());
    }
}

impl Drop for GridObject {
    fn drop(&mut self) {
        if let Some(id) = self.source_connection.lock().take() {
            if let Some(signal) = self.source.changed() {
                signal.disconnect(id);
            }
        }
    }
}

impl std::fmt::Debug for GridObject {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GridObject")
            .field("type_name", &self.source.descriptor().type_name)
            .field("properties", &self.properties.read().len())
            .finish_non_exhaustive()
    }
}

static_assertions::assert_impl_all!(GridObject: Send, Sync);
