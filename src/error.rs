//! Outcomes of rejected table operations.

/// Reasons a placement, packing or layout request was rejected.
///
/// Every variant is recoverable; the rejected request leaves the table
/// exactly as it was.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TableError {
    #[error("Too many baskets (limit is {limit})")]
    CapacityExceeded { limit: usize },
    #[error("Basket is on another basket, try again")]
    PlacementBlocked,
    #[error("Basket would not be on the table")]
    OutsideTable,
    #[error("Basket is full")]
    ContainerFull,
    #[error("Basket is too small to hold an apple")]
    DegenerateContainer,
    #[error("Basket {0} does not exist")]
    UnknownBasket(usize),
    #[error("Sorted baskets do not fit on the table ({overflow:.3} past the bottom edge)")]
    LayoutOverflow { overflow: f64 },
}

impl TableError {
    pub fn code(&self) -> &'static str {
        match self {
            TableError::CapacityExceeded { .. } => "capacity_exceeded",
            TableError::PlacementBlocked => "placement_blocked",
            TableError::OutsideTable => "outside_table",
            TableError::ContainerFull => "container_full",
            TableError::DegenerateContainer => "degenerate_container",
            TableError::UnknownBasket(_) => "unknown_basket",
            TableError::LayoutOverflow { .. } => "layout_overflow",
        }
    }

    /// True for outcomes where a dragged apple goes back to its origin.
    pub fn returns_apple(&self) -> bool {
        matches!(
            self,
            TableError::ContainerFull | TableError::DegenerateContainer
        )
    }
}
