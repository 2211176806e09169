//! Data models for the basket table.
//!
//! This module defines the entities the placement engine works on:
//! - `TableConfig`: the fixed constants every operation is parameterised by
//! - `Table`: the immutable placement surface
//! - `Basket`: a placed container holding apples
//! - `Apple`: a token packed into exactly one basket
//!
//! Baskets are sized in abstract basket units and converted to world units
//! by `TableConfig::scale`; all positions are world coordinates.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::geometry::center;
use crate::packer::grid_for;
use crate::types::{BoundingBox, Dimensional, EPSILON_GENERAL, Vec2};

/// Validation error for basket sizes and engine configuration.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("Invalid basket size: {0}")]
    InvalidBasketSize(String),
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
}

fn validate_positive(value: f64, name: &str) -> Result<(), ValidationError> {
    if value <= 0.0 || value.is_nan() || value.is_infinite() {
        return Err(ValidationError::InvalidConfiguration(format!(
            "{} must be positive, got: {}",
            name, value
        )));
    }
    Ok(())
}

/// Constants driving placement, packing and layout.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct TableConfig {
    /// World units per basket unit, applied to every spatial entity
    pub scale: f64,
    /// Apple radius in basket units
    pub apple_radius: f64,
    /// Hard cap on the number of baskets on the table
    pub max_baskets: usize,
    /// Spacing between baskets after a sort, in world units
    pub shelf_gap: f64,
    /// Minimum height of one shelf row, in world units
    pub shelf_row_height: f64,
    /// Placement surface, in world units
    pub table_bounds: BoundingBox,
}

impl TableConfig {
    pub const DEFAULT_SCALE: f64 = 0.02;
    pub const DEFAULT_APPLE_RADIUS: f64 = 2.5;
    pub const DEFAULT_MAX_BASKETS: usize = 50;
    pub const DEFAULT_SHELF_GAP: f64 = 0.1;
    pub const DEFAULT_SHELF_ROW_HEIGHT: f64 = 1.4;
    pub const DEFAULT_TABLE_BOUNDS: BoundingBox =
        BoundingBox::new(Vec2::new(-4.5, -5.0), Vec2::new(7.5, 5.0));

    /// Creates a builder for a custom configuration.
    pub fn builder() -> TableConfigBuilder {
        TableConfigBuilder::default()
    }

    /// Area one apple claims in a basket, in squared basket units.
    #[inline]
    pub fn apple_footprint(&self) -> f64 {
        (self.apple_radius * 2.0).powi(2)
    }

    /// Apple radius in world units.
    #[inline]
    pub fn apple_radius_world(&self) -> f64 {
        self.apple_radius * self.scale
    }

    /// Checks that every constant is usable by the engine.
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_positive(self.scale, "Scale")?;
        validate_positive(self.apple_radius, "Apple radius")?;
        validate_positive(self.shelf_row_height, "Shelf row height")?;
        if self.shelf_gap < 0.0 || !self.shelf_gap.is_finite() {
            return Err(ValidationError::InvalidConfiguration(format!(
                "Shelf gap must not be negative, got: {}",
                self.shelf_gap
            )));
        }
        if self.table_bounds.is_empty()
            || !self.table_bounds.min.is_finite()
            || !self.table_bounds.max.is_finite()
        {
            return Err(ValidationError::InvalidConfiguration(format!(
                "Table bounds must span a finite, non-empty area, got: {:?}",
                self.table_bounds
            )));
        }
        Ok(())
    }
}

impl Default for TableConfig {
    fn default() -> Self {
        Self {
            scale: Self::DEFAULT_SCALE,
            apple_radius: Self::DEFAULT_APPLE_RADIUS,
            max_baskets: Self::DEFAULT_MAX_BASKETS,
            shelf_gap: Self::DEFAULT_SHELF_GAP,
            shelf_row_height: Self::DEFAULT_SHELF_ROW_HEIGHT,
            table_bounds: Self::DEFAULT_TABLE_BOUNDS,
        }
    }
}

/// Builder for `TableConfig`.
#[derive(Clone, Debug, Default)]
pub struct TableConfigBuilder {
    config: TableConfig,
}

impl TableConfigBuilder {
    pub fn scale(mut self, scale: f64) -> Self {
        self.config.scale = scale;
        self
    }

    pub fn apple_radius(mut self, radius: f64) -> Self {
        self.config.apple_radius = radius;
        self
    }

    pub fn max_baskets(mut self, max: usize) -> Self {
        self.config.max_baskets = max;
        self
    }

    pub fn shelf_gap(mut self, gap: f64) -> Self {
        self.config.shelf_gap = gap;
        self
    }

    pub fn shelf_row_height(mut self, height: f64) -> Self {
        self.config.shelf_row_height = height;
        self
    }

    pub fn table_bounds(mut self, bounds: BoundingBox) -> Self {
        self.config.table_bounds = bounds;
        self
    }

    pub fn build(self) -> TableConfig {
        self.config
    }
}

/// The fixed placement surface.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Table {
    bounds: BoundingBox,
}

impl Table {
    pub fn new(bounds: BoundingBox) -> Self {
        Self { bounds }
    }

    #[inline]
    pub fn bounds(&self) -> &BoundingBox {
        &self.bounds
    }
}

/// Basket dimensions as collected by the size dialog.
///
/// Both sides are whole basket units in `[MIN, MAX]` and multiples of
/// `STEP`. The factory accepts any size; this type is for surfaces that
/// stand in for the dialog.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct BasketSize {
    pub width: u32,
    pub height: u32,
}

impl BasketSize {
    pub const MIN: u32 = 10;
    pub const MAX: u32 = 70;
    pub const STEP: u32 = 5;

    /// Validates a width/height pair against the dialog contract.
    ///
    /// # Examples
    /// ```
    /// use basket_table::model::BasketSize;
    ///
    /// assert!(BasketSize::new(70, 25).is_ok());
    /// assert!(BasketSize::new(72, 25).is_err());
    /// assert!(BasketSize::new(5, 25).is_err());
    /// ```
    pub fn new(width: u32, height: u32) -> Result<Self, ValidationError> {
        Self::validate_side(width, "Width")?;
        Self::validate_side(height, "Height")?;
        Ok(Self { width, height })
    }

    fn validate_side(value: u32, name: &str) -> Result<(), ValidationError> {
        if !(Self::MIN..=Self::MAX).contains(&value) {
            return Err(ValidationError::InvalidBasketSize(format!(
                "{} must be between {} and {}, got: {}",
                name,
                Self::MIN,
                Self::MAX,
                value
            )));
        }
        if value % Self::STEP != 0 {
            return Err(ValidationError::InvalidBasketSize(format!(
                "{} must be a multiple of {}, got: {}",
                name,
                Self::STEP,
                value
            )));
        }
        Ok(())
    }
}

/// An apple packed into a basket.
///
/// `slot` is relative to the owning basket's centre, so apples follow
/// their basket when it is repositioned.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, ToSchema)]
pub struct Apple {
    pub slot: Vec2,
}

impl Apple {
    /// World position of the apple inside `basket`.
    #[inline]
    pub fn world_position(&self, basket: &Basket) -> Vec2 {
        basket.position + self.slot
    }
}

/// A basket placed on the table.
///
/// # Fields
/// * `id` - Unique identification number (1-based, never reused)
/// * `width`, `height` - Size in basket units
/// * `size` - Size in world units (`width * scale`, `height * scale`)
/// * `position` - Centre in world units
/// * `apples` - Apples in packing order
/// * `max_apples` - `floor(width * height / footprint)`, capped at the
///   packing grid for baskets trimmed at the table edge
#[derive(Clone, Debug, PartialEq)]
pub struct Basket {
    pub id: usize,
    pub width: f64,
    pub height: f64,
    pub size: Vec2,
    pub position: Vec2,
    pub apples: Vec<Apple>,
    pub max_apples: usize,
}

/// Builds a basket of `width` x `height` basket units centred at `position`.
///
/// Size bounds are not validated here.
///
/// # Examples
/// ```
/// use basket_table::model::{create_basket, TableConfig};
/// use basket_table::types::Vec2;
///
/// let basket = create_basket(1, Vec2::zero(), 70.0, 70.0, &TableConfig::default());
/// assert_eq!(basket.max_apples, 196);
/// ```
pub fn create_basket(
    id: usize,
    position: Vec2,
    width: f64,
    height: f64,
    config: &TableConfig,
) -> Basket {
    Basket {
        id,
        width,
        height,
        size: Vec2::new(width * config.scale, height * config.scale),
        position,
        apples: Vec::new(),
        max_apples: max_apples_for(width, height, config),
    }
}

fn max_apples_for(width: f64, height: f64, config: &TableConfig) -> usize {
    let raw = (width * height) / config.apple_footprint();
    if raw.is_finite() && raw > 0.0 {
        (raw + EPSILON_GENERAL).floor() as usize
    } else {
        0
    }
}

impl Basket {
    /// Calculates the bounding box from centre and world size.
    #[inline]
    pub fn bounding_box(&self) -> BoundingBox {
        BoundingBox::from_center_and_size(self.position, self.size)
    }

    #[inline]
    pub fn apple_count(&self) -> usize {
        self.apples.len()
    }

    /// Remaining apples the basket can take by area.
    pub fn remaining_capacity(&self) -> usize {
        self.max_apples.saturating_sub(self.apples.len())
    }

    /// Shrinks and re-centres the basket onto `clipped`.
    ///
    /// Used after clipping at the table edge so the stored box is the part
    /// that actually lies on the table. A trimmed side is rarely a whole
    /// number of apples wide, so capacity is capped at the packing grid.
    pub(crate) fn fit_to(&mut self, clipped: &BoundingBox, config: &TableConfig) {
        self.position = center(clipped);
        self.size = clipped.dimensions();
        self.width = self.size.x / config.scale;
        self.height = self.size.y / config.scale;
        let slots = grid_for(self, config).slots();
        self.max_apples = max_apples_for(self.width, self.height, config).min(slots);
    }
}

impl Dimensional for Basket {
    fn dimensions(&self) -> Vec2 {
        self.size
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn factory_scales_size_and_centres_box() {
        let config = TableConfig::default();
        let basket = create_basket(1, Vec2::new(1.0, 2.0), 70.0, 35.0, &config);

        assert!((basket.size.x - 1.4).abs() < EPSILON_GENERAL);
        assert!((basket.size.y - 0.7).abs() < EPSILON_GENERAL);
        let bbox = basket.bounding_box();
        assert!((bbox.min.x - 0.3).abs() < EPSILON_GENERAL);
        assert!((bbox.max.y - 2.35).abs() < EPSILON_GENERAL);
        assert!(basket.apples.is_empty());
    }

    #[test]
    fn capacity_uses_floor_of_footprint_ratio() {
        let config = TableConfig::default();
        assert_eq!(config.apple_footprint(), 25.0);

        let full_size = create_basket(1, Vec2::zero(), 70.0, 70.0, &config);
        assert_eq!(full_size.max_apples, 196);

        let odd = create_basket(2, Vec2::zero(), 12.0, 12.0, &config);
        assert_eq!(odd.max_apples, 5); // 144 / 25 = 5.76
    }

    #[test]
    fn fit_to_shrinks_onto_clipped_region() {
        let config = TableConfig::default();
        let mut basket = create_basket(1, Vec2::new(5.9, 0.0), 70.0, 70.0, &config);
        let clipped = BoundingBox::new(Vec2::new(5.2, -0.7), Vec2::new(6.0, 0.7));

        basket.fit_to(&clipped, &config);

        assert!((basket.position.x - 5.6).abs() < EPSILON_GENERAL);
        assert!((basket.width - 40.0).abs() < 1e-6);
        assert!((basket.height - 70.0).abs() < 1e-6);
        assert_eq!(basket.max_apples, 112);
        assert!((basket.bounding_box().max.x - 6.0).abs() < EPSILON_GENERAL);
    }

    #[test]
    fn fit_to_caps_capacity_at_packing_grid() {
        let config = TableConfig::default();
        let mut basket = create_basket(1, Vec2::zero(), 70.0, 70.0, &config);
        // 58.5 x 70 units: 163 apples by area, but only 11 x 14 grid slots
        let clipped = BoundingBox::new(Vec2::new(6.33, -0.7), Vec2::new(7.5, 0.7));

        basket.fit_to(&clipped, &config);

        assert_eq!(basket.max_apples, 154);
    }

    #[test]
    fn basket_size_enforces_dialog_contract() {
        assert!(BasketSize::new(10, 10).is_ok());
        assert!(BasketSize::new(70, 70).is_ok());
        assert!(BasketSize::new(45, 20).is_ok());

        assert!(matches!(
            BasketSize::new(75, 20),
            Err(ValidationError::InvalidBasketSize(_))
        ));
        assert!(BasketSize::new(0, 20).is_err());
        assert!(BasketSize::new(20, 33).is_err());
    }

    #[test]
    fn default_config_is_valid() {
        assert!(TableConfig::default().validate().is_ok());
    }

    #[test]
    fn config_validation_rejects_bad_values() {
        assert!(TableConfig::builder().scale(0.0).build().validate().is_err());
        assert!(
            TableConfig::builder()
                .apple_radius(f64::NAN)
                .build()
                .validate()
                .is_err()
        );
        assert!(TableConfig::builder().shelf_gap(-0.1).build().validate().is_err());
        let flat = BoundingBox::new(Vec2::new(0.0, 0.0), Vec2::new(5.0, 0.0));
        assert!(
            TableConfig::builder()
                .table_bounds(flat)
                .build()
                .validate()
                .is_err()
        );
    }

    #[test]
    fn apple_follows_basket_position() {
        let config = TableConfig::default();
        let mut basket = create_basket(1, Vec2::new(1.0, 1.0), 20.0, 20.0, &config);
        let apple = Apple {
            slot: Vec2::new(-0.15, 0.15),
        };
        basket.apples.push(apple);
        basket.position = Vec2::new(2.0, 0.0);

        let world = apple.world_position(&basket);
        assert!((world.x - 1.85).abs() < EPSILON_GENERAL);
        assert!((world.y - 0.15).abs() < EPSILON_GENERAL);
    }
}
