//! Shape kinds and their exact geometric outlines.
//!
//! A layout engine only knows rectangles. Routes it produces start and end on
//! an object's bounding box, which is wrong for anything that is not a
//! rectangle. [`Shape::trace_to_border`] moves such a point onto the real
//! outline of the shape.

use serde::{Deserialize, Serialize};

use crate::geometry::{Bounds, Point, Segment, Size};

/// The kinds of shapes an object can be drawn as.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShapeKind {
    #[default]
    Rectangle,
    Square,
    Page,
    Parallelogram,
    Cylinder,
    Person,
    Diamond,
    Oval,
    Circle,
    Hexagon,
    Text,
    Code,
    Image,
}

impl ShapeKind {
    /// Shapes whose label is drawn below the box rather than inside it.
    pub fn has_outside_bottom_label(self) -> bool {
        matches!(self, Self::Image | Self::Person)
    }
}

/// The outline a shape traces.
#[derive(Debug, Clone, PartialEq)]
enum Outline {
    /// Closed polygon, vertices in drawing order
    Polygon(Vec<Point>),
    Ellipse { center: Point, rx: f64, ry: f64 },
}

/// A shape kind placed at a concrete box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Shape {
    kind: ShapeKind,
    bounds: Bounds,
}

impl Shape {
    pub fn new(kind: ShapeKind, bounds: Bounds) -> Self {
        Self { kind, bounds }
    }

    pub fn kind(&self) -> ShapeKind {
        self.kind
    }

    pub fn bounds(&self) -> Bounds {
        self.bounds
    }

    fn parallelogram_skew(&self) -> f64 {
        (self.bounds.width() * 0.25).min(26.0)
    }

    fn outline(&self) -> Outline {
        let b = self.bounds;
        let center = b.center();
        match self.kind {
            ShapeKind::Oval | ShapeKind::Circle => Outline::Ellipse {
                center,
                rx: b.width() / 2.0,
                ry: b.height() / 2.0,
            },
            ShapeKind::Diamond => Outline::Polygon(vec![
                Point::new(center.x(), b.min_y()),
                Point::new(b.max_x(), center.y()),
                Point::new(center.x(), b.max_y()),
                Point::new(b.min_x(), center.y()),
            ]),
            ShapeKind::Hexagon => {
                let quarter = b.width() / 4.0;
                Outline::Polygon(vec![
                    Point::new(b.min_x() + quarter, b.min_y()),
                    Point::new(b.max_x() - quarter, b.min_y()),
                    Point::new(b.max_x(), center.y()),
                    Point::new(b.max_x() - quarter, b.max_y()),
                    Point::new(b.min_x() + quarter, b.max_y()),
                    Point::new(b.min_x(), center.y()),
                ])
            }
            ShapeKind::Parallelogram => {
                let skew = self.parallelogram_skew();
                Outline::Polygon(vec![
                    Point::new(b.min_x() + skew, b.min_y()),
                    Point::new(b.max_x(), b.min_y()),
                    Point::new(b.max_x() - skew, b.max_y()),
                    Point::new(b.min_x(), b.max_y()),
                ])
            }
            _ => Outline::Polygon(vec![
                Point::new(b.min_x(), b.min_y()),
                Point::new(b.max_x(), b.min_y()),
                Point::new(b.max_x(), b.max_y()),
                Point::new(b.min_x(), b.max_y()),
            ]),
        }
    }

    /// The largest axis-aligned box that fits inside the outline.
    ///
    /// Icons and labels that sit "inside" a shape are measured against this box.
    pub fn inner_box(&self) -> Bounds {
        let b = self.bounds;
        match self.kind {
            ShapeKind::Oval | ShapeKind::Circle => Bounds::new_from_center(
                b.center(),
                Size::new(
                    b.width() / std::f64::consts::SQRT_2,
                    b.height() / std::f64::consts::SQRT_2,
                ),
            ),
            ShapeKind::Diamond => {
                Bounds::new_from_center(b.center(), Size::new(b.width() / 2.0, b.height() / 2.0))
            }
            ShapeKind::Hexagon => Bounds::new_from_center(
                b.center(),
                Size::new(b.width() / 2.0, b.height()),
            ),
            ShapeKind::Parallelogram => {
                let skew = self.parallelogram_skew();
                Bounds::new_from_center(
                    b.center(),
                    Size::new((b.width() - 2.0 * skew).max(0.0), b.height()),
                )
            }
            _ => b,
        }
    }

    /// Moves `border_point` onto the shape's true outline.
    ///
    /// The point is traced along the ray that starts at `prev_point` and passes
    /// through `border_point`; of all the outline crossings on that ray, the
    /// one nearest `border_point` wins. When the ray never meets the outline
    /// the whole line through both points is searched instead, and when that
    /// misses too `border_point` is returned unchanged.
    ///
    /// # Examples
    ///
    /// ```
    /// # use trellis_core::geometry::{Bounds, Point, Size};
    /// # use trellis_core::shape::{Shape, ShapeKind};
    /// let bounds = Bounds::new_from_top_left(Point::new(0.0, 0.0), Size::new(100.0, 100.0));
    /// let diamond = Shape::new(ShapeKind::Diamond, bounds);
    ///
    /// // The engine left the route on the top-left corner of the box.
    /// let traced = diamond.trace_to_border(Point::new(0.0, 0.0), Point::new(-50.0, -50.0));
    /// assert!((traced.x() - 25.0).abs() < 1e-9);
    /// assert!((traced.y() - 25.0).abs() < 1e-9);
    /// ```
    pub fn trace_to_border(&self, border_point: Point, prev_point: Point) -> Point {
        let center = self.bounds.center();
        if border_point == center {
            return center;
        }

        let direction = border_point.sub_point(prev_point);
        let length = direction.hypot();
        if length == 0.0 {
            return border_point;
        }
        let reach =
            border_point.distance_to(center) + self.bounds.width() + self.bounds.height() + 1.0;
        let step = direction.scale(reach / length);
        let far = border_point.add_point(step);

        let ray = Segment::new(prev_point, far);
        if let Some(crossing) = self.nearest_crossing(ray, border_point) {
            return crossing;
        }

        // Both points lie outside the outline on the same side, as for an
        // edge leaving a container towards one of its children.
        let line = Segment::new(border_point.sub_point(step), far);
        self.nearest_crossing(line, border_point)
            .unwrap_or(border_point)
    }

    fn nearest_crossing(&self, segment: Segment, point: Point) -> Option<Point> {
        self.crossings(segment).into_iter().min_by(|a, b| {
            a.distance_to(point).total_cmp(&b.distance_to(point))
        })
    }

    fn crossings(&self, ray: Segment) -> Vec<Point> {
        match self.outline() {
            Outline::Polygon(vertices) => {
                let n = vertices.len();
                (0..n)
                    .filter_map(|i| {
                        Segment::new(vertices[i], vertices[(i + 1) % n]).intersection(ray)
                    })
                    .collect()
            }
            Outline::Ellipse { center, rx, ry } => ellipse_crossings(center, rx, ry, ray),
        }
    }

    /// Distance from `point` to the nearest point of the outline.
    pub fn distance_to_border(&self, point: Point) -> f64 {
        match self.outline() {
            Outline::Polygon(vertices) => {
                let n = vertices.len();
                (0..n)
                    .map(|i| Segment::new(vertices[i], vertices[(i + 1) % n]).distance_to_point(point))
                    .fold(f64::INFINITY, f64::min)
            }
            Outline::Ellipse { center, rx, ry } => {
                let offset = point.sub_point(center);
                if rx == 0.0 || ry == 0.0 {
                    return offset.hypot();
                }
                let normalized = (offset.x() / rx).hypot(offset.y() / ry);
                if normalized == 0.0 {
                    return rx.min(ry);
                }
                // Radial projection; exact on the axes and close enough elsewhere
                let on_outline = center.add_point(offset.scale(1.0 / normalized));
                on_outline.distance_to(point)
            }
        }
    }

    /// Returns true if `point` lies on the outline within `tolerance`.
    pub fn is_on_border(&self, point: Point, tolerance: f64) -> bool {
        self.distance_to_border(point) <= tolerance
    }
}

fn ellipse_crossings(center: Point, rx: f64, ry: f64, ray: Segment) -> Vec<Point> {
    if rx == 0.0 || ry == 0.0 {
        return Vec::new();
    }
    let start = ray.start().sub_point(center);
    let delta = ray.end().sub_point(ray.start());

    let a = (delta.x() / rx).powi(2) + (delta.y() / ry).powi(2);
    let b = 2.0 * (start.x() * delta.x() / (rx * rx) + start.y() * delta.y() / (ry * ry));
    let c = (start.x() / rx).powi(2) + (start.y() / ry).powi(2) - 1.0;
    if a == 0.0 {
        return Vec::new();
    }
    let discriminant = b * b - 4.0 * a * c;
    if discriminant < 0.0 {
        return Vec::new();
    }
    let root = discriminant.sqrt();
    [(-b - root) / (2.0 * a), (-b + root) / (2.0 * a)]
        .into_iter()
        .filter(|t| (0.0..=1.0).contains(t))
        .map(|t| ray.start().add_point(delta.scale(t)))
        .collect()
}


#[cfg(test)]
mod proptest_tests {
    use proptest::prelude::*;

    use super::*;

    fn kind_strategy() -> impl Strategy<Value = ShapeKind> {
        prop_oneof![
            Just(ShapeKind::Rectangle),
            Just(ShapeKind::Oval),
            Just(ShapeKind::Circle),
            Just(ShapeKind::Diamond),
            Just(ShapeKind::Hexagon),
            Just(ShapeKind::Parallelogram),
        ]
    }

    proptest! {
        /// Tracing from a point outside the box through any point of the
        /// inner box always lands on the outline.
        #[test]
        fn traced_point_lies_on_outline(
            kind in kind_strategy(),
            width in 20.0f64..400.0,
            height in 20.0f64..400.0,
            fx in 0.05f64..0.95,
            fy in 0.05f64..0.95,
            angle in 0.0f64..std::f64::consts::TAU,
        ) {
            let bounds = Bounds::new_from_top_left(Point::new(0.0, 0.0), Size::new(width, height));
            let shape = Shape::new(kind, bounds);
            let inner = shape.inner_box();
            let target = Point::new(
                inner.min_x() + inner.width() * fx,
                inner.min_y() + inner.height() * fy,
            );
            prop_assume!(target != bounds.center());
            let distance = width + height;
            let outside = target.add_point(Point::new(angle.cos() * distance, angle.sin() * distance));

            let traced = shape.trace_to_border(target, outside);
            prop_assert!(shape.is_on_border(traced, 1e-6), "{kind:?} {traced:?}");
        }
    }
}
