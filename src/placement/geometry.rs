//! Viewport geometry: clamping and corner anchors

use serde::{Deserialize, Serialize};

use crate::state::{Corner, PositionRecord};

/// Gap kept between the widget and the viewport edges
pub const VIEWPORT_PADDING: f64 = 12.0;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance_to(self, other: Point) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    pub const fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

/// Widget extent plus the viewport it lives in
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Frame {
    pub widget: Size,
    pub viewport: Size,
    pub padding: f64,
}

impl Frame {
    pub fn new(widget: Size, viewport: Size) -> Self {
        Self {
            widget,
            viewport,
            padding: VIEWPORT_PADDING,
        }
    }

    fn max_left(&self) -> f64 {
        (self.viewport.width - self.widget.width - self.padding).max(self.padding)
    }

    fn max_top(&self) -> f64 {
        (self.viewport.height - self.widget.height - self.padding).max(self.padding)
    }

    /// Keep the widget's top-left inside the padded viewport
    pub fn clamp(&self, p: Point) -> Point {
        Point::new(
            p.x.clamp(self.padding, self.max_left()),
            p.y.clamp(self.padding, self.max_top()),
        )
    }

    /// Top-left position of the widget when flush with a padded corner
    pub fn anchor(&self, corner: Corner) -> Point {
        let x = if corner.is_right() { self.max_left() } else { self.padding };
        let y = if corner.is_bottom() { self.max_top() } else { self.padding };
        Point::new(x, y)
    }

    /// Nearest corner anchor by Euclidean distance, with the offset from it
    pub fn nearest_corner(&self, p: Point) -> (Corner, Point) {
        let mut best = Corner::TopLeft;
        let mut best_distance = f64::INFINITY;
        for corner in Corner::ALL {
            let distance = p.distance_to(self.anchor(corner));
            if distance < best_distance {
                best = corner;
                best_distance = distance;
            }
        }
        let anchor = self.anchor(best);
        (best, Point::new(p.x - anchor.x, p.y - anchor.y))
    }

    /// Corner-relative record for a position
    pub fn snap(&self, p: Point) -> PositionRecord {
        let (corner, offset) = self.nearest_corner(p);
        PositionRecord::Anchored {
            corner,
            offset_x: offset.x,
            offset_y: offset.y,
        }
    }

    /// Effective on-screen position of a stored record
    pub fn resolve(&self, record: &PositionRecord) -> Point {
        let raw = match *record {
            PositionRecord::Anchored {
                corner,
                offset_x,
                offset_y,
            } => {
                let anchor = self.anchor(corner);
                Point::new(anchor.x + offset_x, anchor.y + offset_y)
            }
            PositionRecord::Absolute { left, top } => Point::new(left, top),
        };
        self.clamp(raw)
    }
}
