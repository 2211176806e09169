//! Geometric helpers for 2D collision detection and placement checks.
//!
//! Pure value transforms over [`BoundingBox`]: the overlap test used by
//! every placement decision, the clip that trims a basket at the table
//! edge, and the free-space check against already placed baskets.

use crate::types::{BoundingBox, Vec2};

/// Checks whether two boxes overlap.
///
/// Uses the separating axis test for AABBs. Boxes that only touch along an
/// edge or at a corner do NOT intersect.
///
/// # Examples
/// ```
/// use basket_table::geometry::intersects;
/// use basket_table::types::{BoundingBox, Vec2};
///
/// let a = BoundingBox::new(Vec2::new(0.0, 0.0), Vec2::new(1.0, 1.0));
/// let b = BoundingBox::new(Vec2::new(1.0, 0.0), Vec2::new(2.0, 1.0));
/// assert!(!intersects(&a, &b));
/// ```
pub fn intersects(a: &BoundingBox, b: &BoundingBox) -> bool {
    // Separated on any axis means no overlap
    !(a.max.x <= b.min.x || b.max.x <= a.min.x || a.max.y <= b.min.y || b.max.y <= a.min.y)
}

/// Returns the overlapping region of two boxes.
///
/// For disjoint inputs the result is inverted (`min > max` on at least one
/// axis); callers check [`BoundingBox::is_empty`] before relying on it.
pub fn intersect(a: &BoundingBox, b: &BoundingBox) -> BoundingBox {
    BoundingBox::new(
        Vec2::new(a.min.x.max(b.min.x), a.min.y.max(b.min.y)),
        Vec2::new(a.max.x.min(b.max.x), a.max.y.min(b.max.y)),
    )
}

/// Returns `a` shifted by `offset`.
pub fn translate(a: &BoundingBox, offset: Vec2) -> BoundingBox {
    BoundingBox::new(a.min + offset, a.max + offset)
}

/// Midpoint of a box.
pub fn center(a: &BoundingBox) -> Vec2 {
    Vec2::new((a.min.x + a.max.x) / 2.0, (a.min.y + a.max.y) / 2.0)
}

/// Trims a basket box to the part that lies on the table.
pub fn clip_to_table(basket: &BoundingBox, table: &BoundingBox) -> BoundingBox {
    intersect(basket, table)
}

/// Checks that `candidate` overlaps none of the `existing` boxes.
///
/// An empty `existing` set is always free.
pub fn is_free_placement<'a, I>(existing: I, candidate: &BoundingBox) -> bool
where
    I: IntoIterator<Item = &'a BoundingBox>,
{
    !existing
        .into_iter()
        .any(|placed| intersects(placed, candidate))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::EPSILON_GENERAL;

    fn bbox(min: (f64, f64), max: (f64, f64)) -> BoundingBox {
        BoundingBox::new(min.into(), max.into())
    }

    fn sample_boxes() -> Vec<BoundingBox> {
        vec![
            bbox((0.0, 0.0), (2.0, 2.0)),
            bbox((1.0, 1.0), (3.0, 3.0)),
            bbox((2.0, 0.0), (4.0, 2.0)),
            bbox((-5.0, -5.0), (-4.0, -4.0)),
            bbox((0.5, 0.5), (1.5, 1.5)),
            bbox((-1.0, 1.9), (5.0, 2.1)),
        ]
    }

    #[test]
    fn overlapping_boxes_intersect() {
        let a = bbox((0.0, 0.0), (2.0, 2.0));
        let b = bbox((1.0, 1.0), (3.0, 3.0));
        assert!(intersects(&a, &b));
    }

    #[test]
    fn touching_boxes_do_not_intersect() {
        let a = bbox((0.0, 0.0), (1.0, 1.0));
        let right = bbox((1.0, 0.0), (2.0, 1.0));
        let above = bbox((0.0, 1.0), (1.0, 2.0));
        let corner = bbox((1.0, 1.0), (2.0, 2.0));

        assert!(!intersects(&a, &right));
        assert!(!intersects(&a, &above));
        assert!(!intersects(&a, &corner));
    }

    #[test]
    fn contained_box_intersects() {
        let outer = bbox((0.0, 0.0), (4.0, 4.0));
        let inner = bbox((1.0, 1.0), (2.0, 2.0));
        assert!(intersects(&outer, &inner));
        assert!(intersects(&inner, &outer));
    }

    #[test]
    fn intersects_is_symmetric() {
        let boxes = sample_boxes();
        for a in &boxes {
            for b in &boxes {
                assert_eq!(intersects(a, b), intersects(b, a), "{a:?} vs {b:?}");
            }
        }
    }

    #[test]
    fn intersect_returns_overlap_region() {
        let a = bbox((0.0, 0.0), (2.0, 2.0));
        let b = bbox((1.0, -1.0), (3.0, 1.5));
        assert_eq!(intersect(&a, &b), bbox((1.0, 0.0), (2.0, 1.5)));
    }

    #[test]
    fn intersect_of_disjoint_boxes_is_empty() {
        let a = bbox((0.0, 0.0), (1.0, 1.0));
        let b = bbox((3.0, 3.0), (4.0, 4.0));
        assert!(intersect(&a, &b).is_empty());
    }

    #[test]
    fn clip_is_idempotent() {
        let boxes = sample_boxes();
        for a in &boxes {
            for b in &boxes {
                let once = intersect(a, b);
                assert_eq!(intersect(&once, b), once);
            }
        }
    }

    #[test]
    fn translate_does_not_mutate_input() {
        let a = bbox((0.0, 0.0), (1.0, 2.0));
        let moved = translate(&a, Vec2::new(2.0, -1.0));
        assert_eq!(moved, bbox((2.0, -1.0), (3.0, 1.0)));
        assert_eq!(a, bbox((0.0, 0.0), (1.0, 2.0)));
    }

    #[test]
    fn center_is_midpoint() {
        let a = bbox((-1.0, 2.0), (3.0, 4.0));
        assert_eq!(center(&a), Vec2::new(1.0, 3.0));
    }

    #[test]
    fn clip_trims_basket_at_table_edge() {
        let table = bbox((-6.0, -5.0), (6.0, 5.0));
        let spilling = bbox((5.5, 0.0), (6.9, 1.4));
        let clipped = clip_to_table(&spilling, &table);
        assert_eq!(clipped, bbox((5.5, 0.0), (6.0, 1.4)));
        assert!(table.contains_box(&clipped, EPSILON_GENERAL));
    }

    #[test]
    fn free_placement_checks_every_existing_box() {
        let existing = vec![bbox((0.0, 0.0), (1.0, 1.0)), bbox((3.0, 3.0), (4.0, 4.0))];

        assert!(is_free_placement(&existing, &bbox((1.0, 0.0), (2.0, 1.0))));
        assert!(!is_free_placement(&existing, &bbox((3.5, 3.5), (5.0, 5.0))));
        assert!(is_free_placement(std::iter::empty(), &bbox((0.0, 0.0), (1.0, 1.0))));
    }
}
