//! Shelf layout for re-arranging baskets after a sort.
//!
//! Baskets are laid out left to right starting at the top-left corner of the
//! table; when the next basket would run past the right edge, the cursor
//! wraps to a new shelf below. Each shelf is at least
//! `TableConfig::shelf_row_height` tall and grows to its tallest basket, so
//! shelves never overlap.
//!
//! The whole layout is planned before anything moves. A layout whose last
//! shelf would hang past the bottom edge of the table is rejected with
//! `TableError::LayoutOverflow` and no basket is moved.

use serde::Serialize;
use utoipa::ToSchema;

use crate::error::TableError;
use crate::model::{Basket, TableConfig};
use crate::types::{BoundingBox, Dimensional, EPSILON_GENERAL, Vec2};

/// Position change of one basket during a layout pass.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, ToSchema)]
pub struct BasketMove {
    pub id: usize,
    pub from: Vec2,
    pub to: Vec2,
}

/// Result of a committed layout pass.
#[derive(Clone, Debug, PartialEq, Default)]
pub struct LayoutReport {
    /// Moves in layout order
    pub moves: Vec<BasketMove>,
    /// Number of shelves used
    pub rows: usize,
}

/// Planned centres for a sequence of sized items.
#[derive(Clone, Debug, PartialEq)]
pub struct ShelfPlan {
    pub centers: Vec<Vec2>,
    pub rows: usize,
    /// Lowest bottom edge of all placed items
    pub lowest: f64,
}

/// Returns basket indices ordered by apple count, fullest first.
///
/// Uses a stable sort: baskets with equal counts keep their insertion order.
pub fn order_by_occupancy(baskets: &[Basket]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..baskets.len()).collect();
    order.sort_by(|&a, &b| baskets[b].apple_count().cmp(&baskets[a].apple_count()));
    order
}

/// Plans shelf positions for `items` in the given order.
///
/// Does not check against the bottom of the table; see [`ShelfPlan::lowest`].
pub fn plan_shelves<'a, T, I>(items: I, table: &BoundingBox, config: &TableConfig) -> ShelfPlan
where
    T: Dimensional + 'a,
    I: IntoIterator<Item = &'a T>,
{
    let gap = config.shelf_gap;
    let mut next_x = table.min.x;
    let mut next_y = table.max.y;
    let mut row_height: f64 = 0.0;
    let mut row_len = 0usize;
    let mut rows = 0usize;
    let mut lowest = table.max.y;
    let mut centers = Vec::new();

    for item in items {
        let size = item.dimensions();

        // A basket alone on its shelf never wraps
        if row_len > 0 && next_x + size.x + gap > table.max.x + EPSILON_GENERAL {
            next_x = table.min.x;
            next_y -= row_height.max(config.shelf_row_height) + gap;
            row_height = 0.0;
            row_len = 0;
        }
        if row_len == 0 {
            rows += 1;
        }

        centers.push(Vec2::new(next_x + size.x / 2.0, next_y - size.y / 2.0));
        lowest = lowest.min(next_y - size.y);

        next_x += size.x + gap;
        row_height = row_height.max(size.y);
        row_len += 1;
    }

    ShelfPlan {
        centers,
        rows,
        lowest,
    }
}

/// Moves the baskets at `order` onto shelves, in that order.
///
/// `order` holds indices into `baskets`, typically from
/// [`order_by_occupancy`]. Baskets not listed keep their position.
///
/// # Returns
/// * `Ok(LayoutReport)` with the committed moves
/// * `Err(TableError::LayoutOverflow)` if the shelves would not fit on the
///   table; nothing is moved in that case
pub fn reposition_by_order(
    baskets: &mut [Basket],
    order: &[usize],
    table: &BoundingBox,
    config: &TableConfig,
) -> Result<LayoutReport, TableError> {
    let view: &[Basket] = baskets;
    let plan = plan_shelves(order.iter().map(|&idx| &view[idx]), table, config);

    if plan.lowest < table.min.y - EPSILON_GENERAL {
        return Err(TableError::LayoutOverflow {
            overflow: table.min.y - plan.lowest,
        });
    }

    let moves = order
        .iter()
        .zip(plan.centers)
        .map(|(&idx, to)| {
            let basket = &mut baskets[idx];
            let from = basket.position;
            basket.position = to;
            BasketMove {
                id: basket.id,
                from,
                to,
            }
        })
        .collect();

    Ok(LayoutReport {
        moves,
        rows: plan.rows,
    })
}
