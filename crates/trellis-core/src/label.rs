//! Label and icon anchor positions.
//!
//! Anchors are assigned after layout and tell a renderer where inside (or
//! around) an object's box its label and icon belong.

use serde::{Deserialize, Serialize};

use crate::geometry::Bounds;

/// Space kept between a label or icon and the edge of its box.
pub const LABEL_PADDING: f64 = 5.0;

/// Largest icon drawn in a corner of a container.
pub const MAX_ICON_SIZE: f64 = 64.0;

/// Where a label or icon is anchored relative to its object's box.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LabelPosition {
    InsideTopLeft,
    InsideTopCenter,
    InsideTopRight,
    InsideMiddleLeft,
    InsideMiddleCenter,
    InsideMiddleRight,
    InsideBottomLeft,
    InsideBottomCenter,
    InsideBottomRight,
    OutsideTopCenter,
    OutsideBottomCenter,
}

impl LabelPosition {
    pub fn is_outside(self) -> bool {
        matches!(self, Self::OutsideTopCenter | Self::OutsideBottomCenter)
    }
}

/// Measured dimensions of a label.
///
/// Text measurement happens upstream; Trellis only consumes the result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Label {
    text: String,
    width: f64,
    height: f64,
}

impl Label {
    pub fn new(text: impl Into<String>, width: f64, height: f64) -> Self {
        Self {
            text: text.into(),
            width,
            height,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn width(&self) -> f64 {
        self.width
    }

    pub fn height(&self) -> f64 {
        self.height
    }
}

/// Size of the square an icon occupies inside `inner_box` at `position`.
///
/// Centered icons take half of the smaller box dimension; corner icons take
/// the smaller dimension capped at [`MAX_ICON_SIZE`]. Padding is removed from
/// both sides and the result rounded down to an even number of units.
///
/// # Examples
///
/// ```
/// # use trellis_core::geometry::{Bounds, Point, Size};
/// # use trellis_core::label::{icon_size, LabelPosition};
/// let inner = Bounds::new_from_top_left(Point::new(0.0, 0.0), Size::new(200.0, 120.0));
/// assert_eq!(icon_size(inner, LabelPosition::InsideTopLeft), 54.0);
/// assert_eq!(icon_size(inner, LabelPosition::InsideMiddleCenter), 50.0);
/// ```
pub fn icon_size(inner_box: Bounds, position: LabelPosition) -> f64 {
    let min_dimension = inner_box.width().min(inner_box.height()).floor();
    let size = if position == LabelPosition::InsideMiddleCenter {
        (min_dimension / 2.0).ceil()
    } else {
        min_dimension.min(MAX_ICON_SIZE)
    };
    let size = (size - LABEL_PADDING * 2.0).max(0.0);
    size - size % 2.0
}
