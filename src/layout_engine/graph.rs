use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

/// How a split divides its rectangle, named after the divider line.
///
/// A `Vertical` split cuts the width: its children sit side by side with the
/// first one on the left. A `Horizontal` split cuts the height: the first
/// child is on top.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Orientation {
    Horizontal,
    Vertical,
}

impl Orientation {
    /// Wider-than-tall rectangles are split vertically; squares and tall
    /// rectangles horizontally.
    pub fn for_size(width: f64, height: f64) -> Self {
        if width > height {
            Orientation::Vertical
        } else {
            Orientation::Horizontal
        }
    }
}

#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum Direction {
    Left,
    Right,
    Up,
    Down,
}

impl Direction {
    /// The orientation of the splits that separate a node from its neighbour
    /// in this direction.
    pub fn orientation(self) -> Orientation {
        match self {
            Direction::Left | Direction::Right => Orientation::Vertical,
            Direction::Up | Direction::Down => Orientation::Horizontal,
        }
    }

    pub fn opposite(self) -> Direction {
        match self {
            Direction::Left => Direction::Right,
            Direction::Right => Direction::Left,
            Direction::Up => Direction::Down,
            Direction::Down => Direction::Up,
        }
    }

    /// Whether the neighbour lies on the first-child side of a split.
    pub(crate) fn towards_first(self) -> bool { matches!(self, Direction::Left | Direction::Up) }
}
