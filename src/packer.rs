//! Grid packing of apples inside a basket.
//!
//! Apples fill the basket row-major from the top-left corner: each row holds
//! `floor(width / diameter)` apples and the basket holds
//! `floor(height / diameter)` rows. The slot of the next apple depends only
//! on the basket size and its current apple count, so packing is fully
//! deterministic.

use crate::error::TableError;
use crate::model::{Apple, Basket, TableConfig};
use crate::types::{EPSILON_GENERAL, Vec2};

/// Number of apple columns and rows that fit in a basket.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Grid {
    pub per_row: usize,
    pub per_column: usize,
}

impl Grid {
    /// Total number of grid slots.
    #[inline]
    pub fn slots(&self) -> usize {
        self.per_row * self.per_column
    }

    #[inline]
    pub fn is_degenerate(&self) -> bool {
        self.per_row == 0 || self.per_column == 0
    }
}

/// Whole cells of `cell` length that fit into `length`.
fn cells(length: f64, cell: f64) -> usize {
    let raw = length / cell;
    if raw.is_finite() && raw > 0.0 {
        // Tolerance keeps e.g. 1.4 / 0.1 from flooring to 13
        (raw + EPSILON_GENERAL).floor() as usize
    } else {
        0
    }
}

/// Calculates the packing grid of a basket.
///
/// Computed in basket units so that sizes on the 5-unit dialog raster
/// divide exactly by the apple diameter.
pub fn grid_for(basket: &Basket, config: &TableConfig) -> Grid {
    let diameter = config.apple_radius * 2.0;
    Grid {
        per_row: cells(basket.width, diameter),
        per_column: cells(basket.height, diameter),
    }
}

/// Computes the slot for the next apple in `basket`.
///
/// The slot is relative to the basket centre. The basket is not modified;
/// the caller appends the apple only when this returns `Ok`.
///
/// # Returns
/// * `Ok(slot)` for the apple with index `basket.apple_count()`
/// * `Err(TableError::DegenerateContainer)` when no apple fits at all
/// * `Err(TableError::ContainerFull)` when every grid slot is taken
///
/// # Examples
/// ```
/// use basket_table::model::{create_basket, TableConfig};
/// use basket_table::packer::next_slot;
/// use basket_table::types::Vec2;
///
/// let config = TableConfig::default();
/// let basket = create_basket(1, Vec2::zero(), 20.0, 10.0, &config);
/// let slot = next_slot(&basket, &config).unwrap();
/// assert!((slot.x - -0.15).abs() < 1e-9);
/// assert!((slot.y - 0.05).abs() < 1e-9);
/// ```
pub fn next_slot(basket: &Basket, config: &TableConfig) -> Result<Vec2, TableError> {
    let grid = grid_for(basket, config);
    if grid.is_degenerate() {
        return Err(TableError::DegenerateContainer);
    }

    let index = basket.apple_count();
    let row = index / grid.per_row;
    let column = index % grid.per_row;
    if row >= grid.per_column {
        return Err(TableError::ContainerFull);
    }

    let radius = config.apple_radius_world();
    let x = -basket.size.x / 2.0 + radius + column as f64 * 2.0 * radius;
    let y = basket.size.y / 2.0 - radius - row as f64 * 2.0 * radius;
    Ok(Vec2::new(x, y))
}

/// Packs one apple into `basket`.
///
/// On error the basket is left unchanged.
pub fn pack_apple(basket: &mut Basket, config: &TableConfig) -> Result<Apple, TableError> {
    let slot = next_slot(basket, config)?;
    let apple = Apple { slot };
    basket.apples.push(apple);
    Ok(apple)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::create_basket;

    fn basket(width: f64, height: f64) -> Basket {
        create_basket(1, Vec2::zero(), width, height, &TableConfig::default())
    }

    #[test]
    fn full_size_basket_has_fourteen_by_fourteen_grid() {
        let config = TableConfig::default();
        let grid = grid_for(&basket(70.0, 70.0), &config);
        assert_eq!(grid.per_row, 14);
        assert_eq!(grid.per_column, 14);
        assert_eq!(grid.slots(), 196);
    }

    #[test]
    fn three_by_two_grid_fills_row_major_then_reports_full() {
        let config = TableConfig::default();
        let mut b = basket(15.0, 10.0);
        assert_eq!(
            grid_for(&b, &config),
            Grid {
                per_row: 3,
                per_column: 2
            }
        );

        let radius = config.apple_radius_world();
        let mut slots = Vec::new();
        for n in 0..6 {
            let apple = pack_apple(&mut b, &config).expect("slot should be free");
            let (row, column) = (n / 3, n % 3);
            let expected_x = -b.size.x / 2.0 + radius + column as f64 * 2.0 * radius;
            let expected_y = b.size.y / 2.0 - radius - row as f64 * 2.0 * radius;
            assert!((apple.slot.x - expected_x).abs() < 1e-9);
            assert!((apple.slot.y - expected_y).abs() < 1e-9);
            slots.push(apple.slot);
        }

        for (i, slot) in slots.iter().enumerate() {
            for other in &slots[i + 1..] {
                assert_ne!(slot, other);
            }
        }

        assert_eq!(pack_apple(&mut b, &config), Err(TableError::ContainerFull));
        assert_eq!(b.apple_count(), 6);
    }

    #[test]
    fn full_size_basket_rejects_the_197th_apple() {
        let config = TableConfig::default();
        let mut b = basket(70.0, 70.0);
        for _ in 0..196 {
            pack_apple(&mut b, &config).expect("basket should have room");
        }
        assert_eq!(b.apple_count(), b.max_apples);
        assert_eq!(next_slot(&b, &config), Err(TableError::ContainerFull));
    }

    #[test]
    fn slots_stay_inside_basket() {
        let config = TableConfig::default();
        let mut b = basket(35.0, 20.0);
        let radius = config.apple_radius_world();
        while let Ok(apple) = pack_apple(&mut b, &config) {
            assert!(apple.slot.x - radius >= -b.size.x / 2.0 - 1e-9);
            assert!(apple.slot.x + radius <= b.size.x / 2.0 + 1e-9);
            assert!(apple.slot.y - radius >= -b.size.y / 2.0 - 1e-9);
            assert!(apple.slot.y + radius <= b.size.y / 2.0 + 1e-9);
        }
        assert_eq!(b.apple_count(), 28);
    }

    #[test]
    fn basket_narrower_than_an_apple_is_degenerate() {
        let config = TableConfig::default();
        let narrow = basket(4.0, 70.0);
        assert!(grid_for(&narrow, &config).is_degenerate());
        assert_eq!(
            next_slot(&narrow, &config),
            Err(TableError::DegenerateContainer)
        );

        let flat = basket(70.0, 3.0);
        assert_eq!(next_slot(&flat, &config), Err(TableError::DegenerateContainer));
    }

    #[test]
    fn failed_pack_leaves_basket_unchanged() {
        let config = TableConfig::default();
        let mut b = basket(4.0, 4.0);
        let before = b.clone();
        assert!(pack_apple(&mut b, &config).is_err());
        assert_eq!(b, before);
    }
}
