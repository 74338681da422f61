use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Tolerance used when comparing computed edges. Frames are in points, so
/// anything below this is float noise from repeated splitting.
pub const EPSILON: f64 = 1e-6;

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self { Self { x, y } }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    pub const fn new(width: f64, height: f64) -> Self { Self { width, height } }
}

/// An axis-aligned rectangle in display coordinates. The origin is the
/// top-left corner and y grows downwards.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub origin: Point,
    pub size: Size,
}

impl Rect {
    pub const fn new(origin: Point, size: Size) -> Self { Self { origin, size } }

    pub const fn from_xywh(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self::new(Point::new(x, y), Size::new(width, height))
    }

    pub fn min_x(&self) -> f64 { self.origin.x }

    pub fn min_y(&self) -> f64 { self.origin.y }

    pub fn max_x(&self) -> f64 { self.origin.x + self.size.width }

    pub fn max_y(&self) -> f64 { self.origin.y + self.size.height }

    pub fn area(&self) -> f64 { self.size.width * self.size.height }

    pub fn mid(&self) -> Point {
        Point::new(
            self.origin.x + self.size.width / 2.0,
            self.origin.y + self.size.height / 2.0,
        )
    }

    /// A rectangle with no positive extent on either axis cannot hold a window.
    pub fn is_degenerate(&self) -> bool {
        !(self.size.width > 0.0 && self.size.height > 0.0)
            || !self.size.width.is_finite()
            || !self.size.height.is_finite()
    }

    /// Half-open containment: a point on the right or bottom edge belongs to
    /// the neighbouring rectangle.
    pub fn contains(&self, point: Point) -> bool {
        point.x >= self.min_x()
            && point.x < self.max_x()
            && point.y >= self.min_y()
            && point.y < self.max_y()
    }

    pub fn intersects(&self, other: &Rect) -> bool {
        self.min_x() < other.max_x()
            && other.min_x() < self.max_x()
            && self.min_y() < other.max_y()
            && other.min_y() < self.max_y()
    }

    pub fn approx_eq(&self, other: &Rect) -> bool {
        (self.min_x() - other.min_x()).abs() <= EPSILON
            && (self.min_y() - other.min_y()).abs() <= EPSILON
            && (self.max_x() - other.max_x()).abs() <= EPSILON
            && (self.max_y() - other.max_y()).abs() <= EPSILON
    }

    /// Shrinks the rectangle by the given amount on each side. Sizes never go
    /// below zero.
    pub fn inset(&self, top: f64, left: f64, bottom: f64, right: f64) -> Rect {
        Rect::from_xywh(
            self.origin.x + left,
            self.origin.y + top,
            (self.size.width - left - right).max(0.0),
            (self.size.height - top - bottom).max(0.0),
        )
    }
}

impl fmt::Display for Rect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({:.0},{:.0} {:.0}x{:.0})",
            self.origin.x, self.origin.y, self.size.width, self.size.height
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("expected a rectangle as `x,y,width,height`, got `{0}`")]
pub struct ParseRectError(String);

impl FromStr for Rect {
    type Err = ParseRectError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<f64> = s
            .split(',')
            .map(|p| p.trim().parse::<f64>())
            .collect::<Result<_, _>>()
            .map_err(|_| ParseRectError(s.to_string()))?;
        match parts.as_slice() {
            [x, y, w, h] => Ok(Rect::from_xywh(*x, *y, *w, *h)),
            _ => Err(ParseRectError(s.to_string())),
        }
    }
}

pub trait Round {
    fn round(&self) -> Self;
}

impl Round for Rect {
    /// Rounds edges rather than origin and size independently, so two
    /// rectangles sharing an edge still share it afterwards.
    fn round(&self) -> Self {
        let min_x = self.min_x().round();
        let min_y = self.min_y().round();
        let max_x = self.max_x().round();
        let max_y = self.max_y().round();
        Rect::from_xywh(min_x, min_y, max_x - min_x, max_y - min_y)
    }
}
