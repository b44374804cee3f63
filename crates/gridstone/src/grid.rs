//! The grid engine.
//!
//! [`PropertyGrid`] holds the engine-wide configuration (display settings,
//! ordering, equality policy, dispatcher, factory) and the currently
//! selected object. It carries no rendering of its own; hosts read the
//! selected object's properties and react to the signals.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::RwLock;
use tracing::{debug, trace};

use gridstone_core::logging::targets;
use gridstone_core::{Dispatcher, ImmediateDispatcher, Signal, Value};

use crate::comparer::{DefaultPropertyComparer, PropertyComparer};
use crate::descriptor::{FieldDescriptor, Inspect};
use crate::grid_enum::{GridEnum, GridEnumItem};
use crate::object::GridObject;
use crate::property::GridProperty;

type EqualityFn = Arc<dyn Fn(&Value, &Value) -> bool + Send + Sync>;

/// Creation seam for the engine's parts.
///
/// Hosts override single methods to substitute their own property or item
/// types; the default methods build the stock implementations. Factories
/// returning `None` from [`create_property`](Self::create_property) drop
/// the field, which is how declaration-site `ignore` metadata is honored.
pub trait GridFactory: Send + Sync {
    /// Build the property surfacing `field`, or `None` to drop it.
    fn create_property(
        &self,
        object: &Arc<GridObject>,
        field: &'static FieldDescriptor,
    ) -> Option<Arc<GridProperty>> {
        if field.metadata.ignore {
            return None;
        }
        Some(GridProperty::new(object, field.name, field.kind.clone()))
    }

    /// Build a property's enumeration sub-model, or `None` for kinds
    /// carrying no enumeration.
    fn create_enum(&self, property: &Arc<GridProperty>) -> Option<Arc<GridEnum>> {
        GridEnum::new(property)
    }

    /// Build one enumeration item.
    fn create_enum_item(
        &self,
        owner: &Arc<GridEnum>,
        name: String,
        bits: Option<u64>,
    ) -> Arc<GridEnumItem> {
        GridEnumItem::new(owner, name, bits)
    }
}

/// The stock factory; builds the default implementations.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultGridFactory;

impl GridFactory for DefaultGridFactory {}

/// The engine. Owns configuration and the selected object.
pub struct PropertyGrid {
    default_category_name: RwLock<String>,
    null_enum_name: RwLock<String>,
    zero_enum_name: RwLock<String>,
    decamelize_display_names: AtomicBool,
    comparer: RwLock<Arc<dyn PropertyComparer>>,
    dispatcher: RwLock<Arc<dyn Dispatcher>>,
    factory: RwLock<Arc<dyn GridFactory>>,
    equality: RwLock<Option<EqualityFn>>,
    selected: RwLock<Option<Arc<GridObject>>>,
    property_errors_changed: Signal<String>,
    weak_self: Weak<PropertyGrid>,
}

impl PropertyGrid {
    /// Create a grid with the stock configuration and nothing selected.
    pub fn new() -> Arc<Self> {
        Arc::new_cyclic(|weak| Self {
            default_category_name: RwLock::new("Misc".to_string()),
            null_enum_name: RwLock::new("<unset>".to_string()),
            zero_enum_name: RwLock::new("<none>".to_string()),
            decamelize_display_names: AtomicBool::new(true),
            comparer: RwLock::new(Arc::new(DefaultPropertyComparer)),
            dispatcher: RwLock::new(Arc::new(ImmediateDispatcher)),
            factory: RwLock::new(Arc::new(DefaultGridFactory)),
            equality: RwLock::new(None),
            selected: RwLock::new(None),
            property_errors_changed: Signal::new(),
            weak_self: weak.clone(),
        })
    }

    /// Select the object to inspect, or clear the selection with `None`.
    pub fn set_selected_source(&self, source: Option<Arc<dyn Inspect>>) {
        let object = match (source, self.weak_self.upgrade()) {
            (Some(source), Some(this)) => {
                debug!(
                    target: targets::GRID,
                    type_name = source.descriptor().type_name,
                    "selecting source object"
                );
                Some(GridObject::new(&this, source))
            }
            _ => {
                trace!(target: targets::GRID, "clearing selection");
                None
            }
        };
        *self.selected.write() = object;
    }

    /// The currently selected object.
    pub fn selected_object(&self) -> Option<Arc<GridObject>> {
        self.selected.read().clone()
    }

    /// Signal announcing a property whose error set changed; carries the
    /// field identifier.
    pub fn property_errors_changed(&self) -> &Signal<String> {
        &self.property_errors_changed
    }

    // ---- configuration -----------------------------------------------------

    /// The category assigned to fields that declare none.
    pub fn default_category_name(&self) -> String {
        self.default_category_name.read().clone()
    }

    /// Set the category assigned to fields that declare none.
    pub fn set_default_category_name(&self, name: impl Into<String>) {
        *self.default_category_name.write() = name.into();
    }

    /// The display text of a nullable enumeration's null sentinel.
    pub fn null_enum_name(&self) -> String {
        self.null_enum_name.read().clone()
    }

    /// Set the null sentinel's display text.
    pub fn set_null_enum_name(&self, name: impl Into<String>) {
        *self.null_enum_name.write() = name.into();
    }

    /// The display text of the synthesized zero item of an empty
    /// enumeration.
    pub fn zero_enum_name(&self) -> String {
        self.zero_enum_name.read().clone()
    }

    /// Set the synthesized zero item's display text.
    pub fn set_zero_enum_name(&self, name: impl Into<String>) {
        *self.zero_enum_name.write() = name.into();
    }

    /// Whether field identifiers are turned into words for display.
    pub fn decamelize_display_names(&self) -> bool {
        self.decamelize_display_names.load(Ordering::SeqCst)
    }

    /// Set whether field identifiers are turned into words for display.
    pub fn set_decamelize_display_names(&self, decamelize: bool) {
        self.decamelize_display_names
            .store(decamelize, Ordering::SeqCst);
    }

    /// The property ordering.
    pub fn comparer(&self) -> Arc<dyn PropertyComparer> {
        self.comparer.read().clone()
    }

    /// Replace the property ordering. Takes effect on the next scan.
    pub fn set_comparer(&self, comparer: Arc<dyn PropertyComparer>) {
        *self.comparer.write() = comparer;
    }

    /// The dispatcher source notifications are marshaled through.
    pub fn dispatcher(&self) -> Arc<dyn Dispatcher> {
        self.dispatcher.read().clone()
    }

    /// Replace the dispatcher.
    pub fn set_dispatcher(&self, dispatcher: Arc<dyn Dispatcher>) {
        *self.dispatcher.write() = dispatcher;
    }

    /// The creation factory.
    pub fn factory(&self) -> Arc<dyn GridFactory> {
        self.factory.read().clone()
    }

    /// Replace the creation factory. Takes effect on the next scan.
    pub fn set_factory(&self, factory: Arc<dyn GridFactory>) {
        *self.factory.write() = factory;
    }

    /// Replace the equality policy used for default-value comparison.
    pub fn set_equality<F>(&self, equality: F)
    where
        F: Fn(&Value, &Value) -> bool + Send + Sync + 'static,
    {
        *self.equality.write() = Some(Arc::new(equality));
    }

    /// Compare two values under the grid's equality policy.
    pub fn compare_for_equality(&self, a: &Value, b: &Value) -> bool {
        match self.equality.read().as_ref() {
            Some(eq) => eq(a, b),
            None => a == b,
        }
    }
}

impl std::fmt::Debug for PropertyGrid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PropertyGrid")
            .field("selected", &self.selected.read().is_some())
            .finish_non_exhaustive()
    }
}

static_assertions::assert_impl_all!(PropertyGrid: Send, Sync);
