//! Workspace-space geometry aliases.
//!
//! Entries live on an unbounded 2-D plane. Positions are floating point and
//! carry no unit; the renderer decides how a workspace unit maps to pixels.

use euclid::default::{Box2D, Point2D, Size2D, Vector2D};

/// Position of an entry in workspace coordinates (top-left corner).
pub type Point = Point2D<f64>;
/// Displacement or direction in workspace coordinates.
pub type Vector = Vector2D<f64>;
/// Estimated width/height of an entry.
pub type Size = Size2D<f64>;
/// Axis-aligned region in workspace coordinates.
pub type Bounds = Box2D<f64>;

/// Returns the smallest region covering every `(origin, size)` rectangle.
///
/// Returns `None` when the iterator is empty.
pub fn union_bounds<I>(rects: I) -> Option<Bounds>
where
    I: IntoIterator<Item = (Point, Size)>,
{
    let mut acc: Option<(f64, f64, f64, f64)> = None;
    for (origin, size) in rects {
        let (x0, y0) = (origin.x, origin.y);
        let (x1, y1) = (origin.x + size.width, origin.y + size.height);
        acc = Some(match acc {
            None => (x0, y0, x1, y1),
            Some((min_x, min_y, max_x, max_y)) => {
                (min_x.min(x0), min_y.min(y0), max_x.max(x1), max_y.max(y1))
            }
        });
    }
    acc.map(|(min_x, min_y, max_x, max_y)| {
        Bounds::new(Point::new(min_x, min_y), Point::new(max_x, max_y))
    })
}

/// Returns `true` when both coordinates are finite numbers.
pub fn is_finite_point(point: Point) -> bool {
    point.x.is_finite() && point.y.is_finite()
}
