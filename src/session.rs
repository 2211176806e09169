//! The table session: owned state plus the protocols that mutate it.
//!
//! `TableSession` is the single store for the table and its baskets. Each
//! public operation runs one protocol to completion and either commits
//! fully or returns a `TableError` with the session untouched:
//! - basket placement (cap check, clip to table, overlap check, re-centre)
//! - apple packing into a basket, directly or through a drop hit test
//! - sorting baskets by occupancy and re-laying them out on shelves

use serde::{Deserialize, Serialize};
use tracing::debug;
use utoipa::ToSchema;

use crate::error::TableError;
use crate::geometry::{clip_to_table, is_free_placement};
use crate::layout::{LayoutReport, order_by_occupancy, reposition_by_order};
use crate::model::{Apple, Basket, Table, TableConfig, ValidationError, create_basket};
use crate::packer::pack_apple;
use crate::types::Vec2;

/// Kind of token released by a drag gesture.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum TokenKind {
    Basket,
    Apple,
}

/// A completed drag gesture, in world coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct DropEvent {
    pub kind: TokenKind,
    pub point: Vec2,
    /// Whether the release point lies over the table region
    pub over_table: bool,
}

/// Accepted result of a drop.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, ToSchema)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum DropOutcome {
    /// A basket was released over the table; ask for its size, then call
    /// [`TableSession::place_basket`] with `position`.
    SizeRequested { position: Vec2 },
    /// An apple was packed into a basket.
    ApplePlaced { basket_id: usize, apple: Apple },
    /// Nothing to do: released off the table or not over a basket.
    Ignored,
}

/// Change notifications for the render side.
#[derive(Clone, Debug, PartialEq, Serialize, ToSchema)]
#[serde(tag = "type")]
pub enum TableEvent {
    /// A basket was added to the table.
    BasketPlaced {
        id: usize,
        position: Vec2,
        size: Vec2,
        max_apples: usize,
    },
    /// An apple was packed into a basket.
    AppleAdded {
        basket_id: usize,
        slot: Vec2,
        apple_count: usize,
    },
    /// A basket moved during a sort.
    BasketMoved { id: usize, from: Vec2, to: Vec2 },
    /// A sort finished.
    SortFinished { baskets: usize, rows: usize },
    /// A request was rejected.
    Rejected {
        reason_code: String,
        reason_text: String,
    },
}

impl TableEvent {
    pub fn basket_placed(basket: &Basket) -> Self {
        TableEvent::BasketPlaced {
            id: basket.id,
            position: basket.position,
            size: basket.size,
            max_apples: basket.max_apples,
        }
    }

    pub fn rejected(err: &TableError) -> Self {
        TableEvent::Rejected {
            reason_code: err.code().to_string(),
            reason_text: err.to_string(),
        }
    }
}

/// Owned state of one table.
#[derive(Clone, Debug)]
pub struct TableSession {
    config: TableConfig,
    table: Table,
    baskets: Vec<Basket>,
    next_id: usize,
}

impl TableSession {
    /// Creates an empty table after validating `config`.
    pub fn new(config: TableConfig) -> Result<Self, ValidationError> {
        config.validate()?;
        Ok(Self {
            config,
            table: Table::new(config.table_bounds),
            baskets: Vec::new(),
            next_id: 1,
        })
    }

    pub fn config(&self) -> &TableConfig {
        &self.config
    }

    pub fn table(&self) -> &Table {
        &self.table
    }

    /// Baskets in insertion order.
    pub fn baskets(&self) -> &[Basket] {
        &self.baskets
    }

    pub fn basket(&self, id: usize) -> Option<&Basket> {
        self.baskets.iter().find(|b| b.id == id)
    }

    /// Id of the basket under `point`, if any.
    pub fn basket_at(&self, point: Vec2) -> Option<usize> {
        self.baskets
            .iter()
            .find(|b| b.bounding_box().contains_point(point))
            .map(|b| b.id)
    }

    /// Places a basket of `width` x `height` basket units centred at `position`.
    ///
    /// # Returns
    /// * `Ok(&Basket)` - the registered basket, trimmed to the table if it
    ///   spilled over an edge
    /// * `Err(TableError::CapacityExceeded)` - the table already holds
    ///   `max_baskets` baskets
    /// * `Err(TableError::OutsideTable)` - no part of the basket is on the table
    /// * `Err(TableError::PlacementBlocked)` - the basket overlaps another one
    pub fn place_basket(
        &mut self,
        position: Vec2,
        width: f64,
        height: f64,
    ) -> Result<&Basket, TableError> {
        if self.baskets.len() >= self.config.max_baskets {
            return Err(TableError::CapacityExceeded {
                limit: self.config.max_baskets,
            });
        }

        let mut candidate = create_basket(self.next_id, position, width, height, &self.config);
        let bbox = candidate.bounding_box();
        let on_table = self.table.bounds().contains_box(&bbox, 0.0);
        let clipped = if on_table {
            bbox
        } else {
            clip_to_table(&bbox, self.table.bounds())
        };
        if clipped.is_empty() {
            return Err(TableError::OutsideTable);
        }

        let existing: Vec<_> = self.baskets.iter().map(Basket::bounding_box).collect();
        if !is_free_placement(&existing, &clipped) {
            debug!(id = candidate.id, x = position.x, y = position.y, "basket blocked");
            return Err(TableError::PlacementBlocked);
        }

        if !on_table {
            candidate.fit_to(&clipped, &self.config);
        }
        self.next_id += 1;
        debug!(
            id = candidate.id,
            x = candidate.position.x,
            y = candidate.position.y,
            "basket placed"
        );
        self.baskets.push(candidate);
        Ok(&self.baskets[self.baskets.len() - 1])
    }

    /// Packs one apple into the basket with `basket_id`.
    pub fn add_apple(&mut self, basket_id: usize) -> Result<Apple, TableError> {
        let config = self.config;
        let basket = self
            .baskets
            .iter_mut()
            .find(|b| b.id == basket_id)
            .ok_or(TableError::UnknownBasket(basket_id))?;
        let apple = pack_apple(basket, &config)?;
        debug!(basket_id, count = basket.apple_count(), "apple packed");
        Ok(apple)
    }

    /// Resolves a completed drag gesture.
    ///
    /// Basket drops over the table ask for a size; apple drops are packed
    /// into the basket under the release point.
    pub fn handle_drop(&mut self, event: DropEvent) -> Result<DropOutcome, TableError> {
        match event.kind {
            TokenKind::Basket if event.over_table => Ok(DropOutcome::SizeRequested {
                position: event.point,
            }),
            TokenKind::Basket => Ok(DropOutcome::Ignored),
            TokenKind::Apple => match self.basket_at(event.point) {
                Some(basket_id) => {
                    let apple = self.add_apple(basket_id)?;
                    Ok(DropOutcome::ApplePlaced { basket_id, apple })
                }
                None => Ok(DropOutcome::Ignored),
            },
        }
    }

    /// Re-lays out all baskets, fullest first.
    pub fn sort_baskets(&mut self) -> Result<LayoutReport, TableError> {
        self.sort_baskets_with_progress(|_| {})
    }

    /// Like `sort_baskets`, reporting each move and the finish as events.
    pub fn sort_baskets_with_progress(
        &mut self,
        mut on_event: impl FnMut(&TableEvent),
    ) -> Result<LayoutReport, TableError> {
        let order = order_by_occupancy(&self.baskets);
        let bounds = *self.table.bounds();
        let report = reposition_by_order(&mut self.baskets, &order, &bounds, &self.config)?;

        for mv in &report.moves {
            on_event(&TableEvent::BasketMoved {
                id: mv.id,
                from: mv.from,
                to: mv.to,
            });
        }
        on_event(&TableEvent::SortFinished {
            baskets: report.moves.len(),
            rows: report.rows,
        });
        Ok(report)
    }
}
