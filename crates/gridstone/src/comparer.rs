//! Property ordering.

use std::cmp::Ordering;

use crate::property::GridProperty;

/// Decides the surfacing order of an object's properties.
pub trait PropertyComparer: Send + Sync {
    /// Compare two properties.
    fn compare(&self, a: &GridProperty, b: &GridProperty) -> Ordering;
}

/// Orders by explicit sort weight first (unweighted properties behave as
/// weight zero, so negative weights sort before them and positive weights
/// after), then by case-insensitive display name.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultPropertyComparer;

impl PropertyComparer for DefaultPropertyComparer {
    fn compare(&self, a: &GridProperty, b: &GridProperty) -> Ordering {
        let (wa, wb) = (a.sort_order(), b.sort_order());
        if wa != 0 {
            return wa.cmp(&wb);
        }
        if wb != 0 {
            return 0.cmp(&wb);
        }
        let name_a = a.actual_display_name().to_lowercase();
        let name_b = b.actual_display_name().to_lowercase();
        name_a.cmp(&name_b)
    }
}
