//! Enumeration sub-models.
//!
//! An enum-kinded property surfaces a [`GridEnum`]: a list of checkable
//! [`GridEnumItem`]s mirroring the declarative member table. For flags
//! enumerations checking an item recomputes the combined bit pattern and
//! writes it back through the property; for plain enumerations exactly one
//! item is selected at a time. The model also follows the property: when
//! the value changes from elsewhere, item check states are resynchronized.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::RwLock;
use tracing::trace;

use gridstone_core::logging::targets;
use gridstone_core::{enum_to_u64, EnumType, Value};

use crate::property::GridProperty;

/// One checkable entry of an enumeration sub-model.
pub struct GridEnumItem {
    owner: Weak<GridEnum>,
    name: String,
    // None marks the null sentinel of a nullable enumeration.
    bits: Option<u64>,
    checked: AtomicBool,
    enabled: AtomicBool,
}

impl GridEnumItem {
    /// Create an item. `bits` of `None` marks the null sentinel.
    pub fn new(owner: &Arc<GridEnum>, name: impl Into<String>, bits: Option<u64>) -> Arc<Self> {
        Arc::new(Self {
            owner: Arc::downgrade(owner),
            name: name.into(),
            bits,
            checked: AtomicBool::new(false),
            enabled: AtomicBool::new(true),
        })
    }

    /// The item's display text.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The item's bit pattern, `None` for the null sentinel.
    pub fn bits(&self) -> Option<u64> {
        self.bits
    }

    /// Whether this is the null sentinel.
    pub fn is_null(&self) -> bool {
        self.bits.is_none()
    }

    /// Whether the item is currently checked.
    pub fn is_checked(&self) -> bool {
        self.checked.load(Ordering::SeqCst)
    }

    /// Whether the item accepts toggling.
    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    /// Check or uncheck the item. On a flags model this recomputes the
    /// combined bit pattern and writes it back through the property.
    pub fn set_checked(&self, checked: bool) {
        if self.checked.swap(checked, Ordering::SeqCst) == checked {
            return;
        }
        if let Some(owner) = self.owner.upgrade() {
            owner.on_item_changed(self);
        }
    }

    /// Flip the item's check state.
    pub fn toggle(&self) {
        self.set_checked(!self.is_checked());
    }

    fn store_checked(&self, checked: bool) {
        self.checked.store(checked, Ordering::SeqCst);
    }

    fn store_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::SeqCst);
    }
}

impl fmt::Debug for GridEnumItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GridEnumItem")
            .field("name", &self.name)
            .field("bits", &self.bits)
            .field("checked", &self.is_checked())
            .finish()
    }
}

/// Resets the block flag when dropped.
struct BlockGuard<'a>(&'a AtomicBool);

impl Drop for BlockGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// The enumeration sub-model of an enum-kinded property.
pub struct GridEnum {
    property: Weak<GridProperty>,
    enum_type: &'static EnumType,
    nullable: bool,
    flags: bool,
    items: RwLock<Vec<Arc<GridEnumItem>>>,
    value_item: RwLock<Option<Arc<GridEnumItem>>>,
    // Suppresses item reactions while the model itself updates them.
    blocked: AtomicBool,
}

impl GridEnum {
    /// Build the sub-model for `property`, or `None` when its kind carries
    /// no enumeration.
    pub fn new(property: &Arc<GridProperty>) -> Option<Arc<Self>> {
        let enum_type = property.kind().as_enum()?;
        let model = Arc::new(Self {
            property: Arc::downgrade(property),
            enum_type,
            nullable: property.kind().is_nullable(),
            flags: enum_type.flags,
            items: RwLock::new(Vec::new()),
            value_item: RwLock::new(None),
            blocked: AtomicBool::new(false),
        });
        Self::build_items(&model);
        Some(model)
    }

    /// The declarative table this model mirrors.
    pub fn enum_type(&self) -> &'static EnumType {
        self.enum_type
    }

    /// Whether members combine bitwise.
    pub fn is_flags(&self) -> bool {
        self.flags
    }

    /// Whether the model carries a null sentinel.
    pub fn is_nullable(&self) -> bool {
        self.nullable
    }

    /// The model's items, in surfacing order.
    pub fn items(&self) -> Vec<Arc<GridEnumItem>> {
        self.items.read().clone()
    }

    /// The selected item of a plain enumeration.
    pub fn value_item(&self) -> Option<Arc<GridEnumItem>> {
        self.value_item.read().clone()
    }

    fn build_items(this: &Arc<Self>) {
        this.blocked.store(true, Ordering::SeqCst);
        let _guard = BlockGuard(&this.blocked);

        let property = this.property.upgrade();
        let grid = property.as_ref().and_then(|p| p.grid());
        let value = property.as_ref().map(|p| p.value()).unwrap_or_default();
        let mut uvalue = enum_to_u64(&value);
        if uvalue.is_none() && !this.nullable {
            uvalue = Some(0);
        }

        let create = |name: String, bits: Option<u64>| match &grid {
            Some(grid) => grid.factory().create_enum_item(this, name, bits),
            None => GridEnumItem::new(this, name, bits),
        };

        let mut items = Vec::new();
        if this.nullable {
            let name = grid
                .as_ref()
                .map(|g| g.null_enum_name())
                .unwrap_or_else(|| "<unset>".to_string());
            items.push(create(name, None));
        }

        for member in this.enum_type.visible_members() {
            let item = create(member.display_name().to_string(), Some(member.value));
            let checked = match uvalue {
                Some(bits) if this.flags && member.value != 0 => bits & member.value != 0,
                Some(bits) => bits == member.value,
                None => false,
            };
            item.store_checked(checked);
            items.push(item);
        }

        // A table with no visible members still needs a selectable entry.
        if !items.iter().any(|i| !i.is_null()) {
            let name = grid
                .as_ref()
                .map(|g| g.zero_enum_name())
                .unwrap_or_else(|| "<none>".to_string());
            let item = create(name, Some(0));
            item.store_checked(uvalue == Some(0));
            items.push(item);
        }

        *this.items.write() = items;
        this.apply_bits(uvalue);
        trace!(
            target: targets::ENUM,
            enum_type = this.enum_type.name,
            count = this.items.read().len(),
            "built enumeration items"
        );
    }

    /// Resynchronize check states from the property's current value.
    pub fn sync_to_value(&self) {
        if self.blocked.swap(true, Ordering::SeqCst) {
            return;
        }
        let _guard = BlockGuard(&self.blocked);

        let value = match self.property.upgrade() {
            Some(property) => property.value(),
            None => return,
        };
        self.apply_bits(enum_to_u64(&value));
    }

    // Authoritative recomputation of all check and enabled states from a
    // bit pattern; `None` selects the null sentinel.
    fn apply_bits(&self, uvalue: Option<u64>) {
        let items = self.items.read().clone();
        match uvalue {
            None => {
                for item in &items {
                    item.store_checked(item.is_null());
                    item.store_enabled(true);
                }
                *self.value_item.write() = items.iter().find(|i| i.is_null()).cloned();
            }
            Some(bits) if self.flags => {
                for item in &items {
                    match item.bits() {
                        Some(0) => {
                            item.store_checked(bits == 0);
                            item.store_enabled(bits != 0);
                        }
                        Some(v) => {
                            item.store_checked(bits & v == v);
                            item.store_enabled(true);
                        }
                        None => {
                            item.store_checked(false);
                            item.store_enabled(true);
                        }
                    }
                }
                *self.value_item.write() = None;
            }
            Some(bits) => {
                let mut selected = None;
                for item in &items {
                    let checked = item.bits() == Some(bits);
                    item.store_checked(checked);
                    item.store_enabled(true);
                    if checked {
                        selected = Some(item.clone());
                    }
                }
                *self.value_item.write() = selected;
            }
        }
    }

    /// Select an item of a plain enumeration and write its value through
    /// the property.
    pub fn select(&self, item: &Arc<GridEnumItem>) {
        if self.flags {
            item.toggle();
            return;
        }
        if self.blocked.swap(true, Ordering::SeqCst) {
            return;
        }
        let commit = {
            let _guard = BlockGuard(&self.blocked);
            self.apply_bits(item.bits());
            *self.value_item.write() = Some(item.clone());
            self.value_for(item.bits())
        };
        self.commit(commit);
    }

    // Reacts to a single item's check transition on a flags model.
    fn on_item_changed(&self, item: &GridEnumItem) {
        if !self.flags {
            return;
        }
        if self.blocked.swap(true, Ordering::SeqCst) {
            return;
        }

        let commit = {
            let _guard = BlockGuard(&self.blocked);
            let items = self.items.read().clone();

            if item.is_null() {
                if item.is_checked() {
                    self.apply_bits(None);
                    Some(Value::Null)
                } else {
                    // Like the zero state, "no value" cannot be left by
                    // unchecking the sentinel.
                    let any_other = items
                        .iter()
                        .any(|i| !std::ptr::eq(i.as_ref(), item) && i.is_checked());
                    if !any_other {
                        item.store_checked(true);
                    }
                    None
                }
            } else if item.bits() == Some(0) {
                if item.is_checked() {
                    self.apply_bits(Some(0));
                    Some(Value::Enum { ty: self.enum_type, bits: 0 })
                } else {
                    // The zero state cannot be left by unchecking it.
                    let any_other = items
                        .iter()
                        .any(|i| !std::ptr::eq(i.as_ref(), item) && i.is_checked());
                    if !any_other {
                        item.store_checked(true);
                    }
                    None
                }
            } else {
                let mut bits = 0u64;
                for other in &items {
                    if let Some(v) = other.bits() {
                        if v != 0 && other.is_checked() {
                            bits |= v;
                        }
                    }
                }
                if !item.is_checked() {
                    if let Some(v) = item.bits() {
                        bits &= !v;
                    }
                }
                self.apply_bits(Some(bits));
                Some(Value::Enum { ty: self.enum_type, bits })
            }
        };

        if let Some(value) = commit {
            self.commit(Some(value));
        }
    }

    fn value_for(&self, bits: Option<u64>) -> Option<Value> {
        Some(match bits {
            Some(bits) => Value::Enum { ty: self.enum_type, bits },
            None => Value::Null,
        })
    }

    fn commit(&self, value: Option<Value>) {
        let (Some(value), Some(property)) = (value, self.property.upgrade()) else {
            return;
        };
        trace!(target: targets::ENUM, enum_type = self.enum_type.name, "committing enumeration value");
        property.set(value);
    }
}

impl fmt::Display for GridEnum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let items = self.items.read();
        let names: Vec<&str> = items
            .iter()
            .filter(|i| i.is_checked())
            .map(|i| i.name())
            .collect();
        write!(f, "{}", names.join(", "))
    }
}

impl fmt::Debug for GridEnum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GridEnum")
            .field("enum_type", &self.enum_type.name)
            .field("flags", &self.flags)
            .field("nullable", &self.nullable)
            .finish_non_exhaustive()
    }
}

static_assertions::assert_impl_all!(GridEnum: Send, Sync);

#[cfg(test)]
mod tests {
    use super::*;
    use std::any::Any;
    use std::sync::OnceLock;

    use gridstone_core::{EnumMember, ValueKind};

    use crate::descriptor::{FieldDescriptor, Inspect, TypeDescriptor};
    use crate::grid::PropertyGrid;

    static PERMS: EnumType = EnumType {
        name: "Permissions",
        flags: true,
        members: &[
            EnumMember::new("None", 0),
            EnumMember::new("A", 1),
            EnumMember::new("B", 2),
            EnumMember::new("C", 4),
        ],
    };

    static INTERNAL: EnumType = EnumType {
        name: "Internal",
        flags: false,
        members: &[EnumMember::hidden("Reserved", 1)],
    };

    struct Holder {
        perms: RwLock<u64>,
        opt_perms: RwLock<Option<u64>>,
    }

    impl Holder {
        fn table() -> &'static TypeDescriptor {
            static TABLE: OnceLock<TypeDescriptor> = OnceLock::new();
            TABLE.get_or_init(|| {
                TypeDescriptor::new("Holder")
                    .field(
                        FieldDescriptor::new("perms", ValueKind::Enum(&PERMS), |source| {
                            let holder = source.as_any().downcast_ref::<Holder>().unwrap();
                            Value::Enum {
                                ty: &PERMS,
                                bits: *holder.perms.read(),
                            }
                        })
                        .with_setter(|source, value| {
                            let holder = source.as_any().downcast_ref::<Holder>().unwrap();
                            match value {
                                Value::Enum { bits, .. } => {
                                    *holder.perms.write() = bits;
                                    Ok(())
                                }
                                _ => Err("expected a Permissions value".to_string()),
                            }
                        }),
                    )
                    .field(
                        FieldDescriptor::new(
                            "opt_perms",
                            ValueKind::nullable(ValueKind::Enum(&PERMS)),
                            |source| {
                                let holder = source.as_any().downcast_ref::<Holder>().unwrap();
                                match *holder.opt_perms.read() {
                                    Some(bits) => Value::Enum { ty: &PERMS, bits },
                                    None => Value::Null,
                                }
                            },
                        )
                        .with_setter(|source, value| {
                            let holder = source.as_any().downcast_ref::<Holder>().unwrap();
                            let bits = match value {
                                Value::Null => None,
                                Value::Enum { bits, .. } => Some(bits),
                                _ => return Err("expected a Permissions value".to_string()),
                            };
                            *holder.opt_perms.write() = bits;
                            Ok(())
                        }),
                    )
                    .field(FieldDescriptor::new(
                        "internal",
                        ValueKind::Enum(&INTERNAL),
                        |_| Value::Enum {
                            ty: &INTERNAL,
                            bits: 0,
                        },
                    ))
            })
        }
    }

    impl Inspect for Holder {
        fn descriptor(&self) -> &'static TypeDescriptor {
            Holder::table()
        }

        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    fn setup(bits: u64, name: &str) -> (Arc<PropertyGrid>, Arc<GridEnum>, Arc<crate::GridProperty>) {
        let grid = PropertyGrid::new();
        grid.set_selected_source(Some(Arc::new(Holder {
            perms: RwLock::new(bits),
            opt_perms: RwLock::new(None),
        }) as Arc<dyn Inspect>));
        let object = grid.selected_object().unwrap();
        let property = object.property(name).unwrap();
        let model = property.enum_model().unwrap();
        (grid, model, property)
    }

    fn find(items: &[Arc<GridEnumItem>], name: &str) -> Arc<GridEnumItem> {
        items.iter().find(|i| i.name() == name).unwrap().clone()
    }

    #[test]
    fn test_checked_items_mirror_initial_bits() {
        let (_grid, model, _property) = setup(5, "perms");
        let items = model.items();
        assert!(find(&items, "A").is_checked());
        assert!(!find(&items, "B").is_checked());
        assert!(find(&items, "C").is_checked());
        assert!(!find(&items, "None").is_checked());
    }

    #[test]
    fn test_or_of_checked_items_tracks_committed_value() {
        let (_grid, model, property) = setup(5, "perms");
        let items = model.items();

        find(&items, "B").set_checked(true);
        assert_eq!(property.value(), Value::Enum { ty: &PERMS, bits: 7 });

        find(&items, "A").set_checked(false);
        find(&items, "C").set_checked(false);
        assert_eq!(property.value(), Value::Enum { ty: &PERMS, bits: 2 });
        assert!(!find(&items, "None").is_checked());
        assert!(find(&items, "None").is_enabled());
    }

    #[test]
    fn test_unchecking_last_flag_selects_zero() {
        let (_grid, model, property) = setup(2, "perms");
        let items = model.items();

        find(&items, "B").set_checked(false);
        assert_eq!(property.value(), Value::Enum { ty: &PERMS, bits: 0 });
        let none = find(&items, "None");
        assert!(none.is_checked());
        assert!(!none.is_enabled());
    }

    #[test]
    fn test_unchecking_sole_checked_null_sentinel_keeps_null() {
        let (_grid, model, property) = setup(0, "opt_perms");
        let items = model.items();
        let sentinel = items.iter().find(|i| i.is_null()).unwrap().clone();
        assert!(sentinel.is_checked());

        sentinel.set_checked(false);
        assert!(sentinel.is_checked());
        assert_eq!(property.value(), Value::Null);
    }

    #[test]
    fn test_checking_flag_replaces_null_sentinel() {
        let (_grid, model, property) = setup(0, "opt_perms");
        let items = model.items();

        find(&items, "A").set_checked(true);
        assert_eq!(property.value(), Value::Enum { ty: &PERMS, bits: 1 });
        assert!(!items.iter().find(|i| i.is_null()).unwrap().is_checked());
    }

    #[test]
    fn test_hidden_only_table_synthesizes_zero_item() {
        let (_grid, model, _property) = setup(0, "internal");
        let items = model.items();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].name(), "<none>");
        assert!(items[0].is_checked());
    }
}
