//! Derived-total calculation
//!
//! Converts form-entered counts into a total quantity using the inventory
//! item's multipliers:
//!
//! `total = shelves * m_shelves + floors * m_floors + packs + loose / m_packs`

use crate::models::InventoryItem;

/// Raw counts as entered on the transaction form
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct EnteredCounts {
    pub shelves: f64,
    pub floors: f64,
    pub packs: f64,
    /// Loose units, counted in fractions of a pack
    pub loose: f64,
}

/// Per-item conversion multipliers
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Multipliers {
    pub shelves: f64,
    pub floors: f64,
    pub packs: f64,
}

impl Default for Multipliers {
    fn default() -> Self {
        Multipliers {
            shelves: 1.0,
            floors: 1.0,
            packs: 1.0,
        }
    }
}

impl From<&InventoryItem> for Multipliers {
    fn from(item: &InventoryItem) -> Self {
        Multipliers {
            shelves: item.shelves as f64,
            floors: item.floors as f64,
            packs: item.packs,
        }
    }
}

/// Computes the total quantity for a transaction.
///
/// A pack multiplier of zero (or a non-finite one) is treated as 1 so the
/// loose-pack division cannot blow up; the fallback is logged.
pub fn compute_total(entered: EnteredCounts, multipliers: Multipliers) -> f64 {
    let pack_divisor = if multipliers.packs == 0.0 || !multipliers.packs.is_finite() {
        log::warn!(
            "pack multiplier {} is not usable as a divisor, treating as 1",
            multipliers.packs
        );
        1.0
    } else {
        multipliers.packs
    };

    entered.shelves * multipliers.shelves
        + entered.floors * multipliers.floors
        + entered.packs
        + entered.loose / pack_divisor
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn total_combines_all_terms() {
        let entered = EnteredCounts {
            shelves: 2.0,
            floors: 3.0,
            packs: 4.0,
            loose: 5.0,
        };
        let multipliers = Multipliers {
            shelves: 10.0,
            floors: 20.0,
            packs: 2.0,
        };
        // 2*10 + 3*20 + 4 + 5/2
        assert_eq!(compute_total(entered, multipliers), 86.5);
    }

    #[test]
    fn total_with_unit_multipliers_is_plain_sum() {
        let entered = EnteredCounts {
            shelves: 1.0,
            floors: 1.0,
            packs: 1.0,
            loose: 1.0,
        };
        assert_eq!(compute_total(entered, Multipliers::default()), 4.0);
    }

    #[test]
    fn zero_counts_give_zero_total() {
        let multipliers = Multipliers {
            shelves: 7.0,
            floors: 9.0,
            packs: 30.0,
        };
        assert_eq!(compute_total(EnteredCounts::default(), multipliers), 0.0);
    }

    #[test]
    fn zero_pack_multiplier_falls_back_to_one() {
        let entered = EnteredCounts {
            loose: 3.0,
            ..Default::default()
        };
        let multipliers = Multipliers {
            shelves: 1.0,
            floors: 1.0,
            packs: 0.0,
        };
        assert_eq!(compute_total(entered, multipliers), 3.0);
    }

    #[test]
    fn multipliers_from_inventory_item() {
        let item = InventoryItem {
            oid: None,
            id: "1".to_string(),
            code: "101".to_string(),
            product: "Harina".to_string(),
            shelves: 4,
            floors: 6,
            packs: 12.5,
        };
        let m = Multipliers::from(&item);
        assert_eq!(m.shelves, 4.0);
        assert_eq!(m.floors, 6.0);
        assert_eq!(m.packs, 12.5);
    }
}
