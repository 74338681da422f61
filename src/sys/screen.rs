use std::fmt;

use serde::{Deserialize, Serialize};

use super::geometry::Rect;

#[derive(PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DisplayId(u32);

impl DisplayId {
    pub fn new(id: u32) -> Self { Self(id) }

    pub fn get(&self) -> u32 { self.0 }
}

impl fmt::Display for DisplayId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "display {}", self.0) }
}

pub trait ScreenProvider {
    /// Usable bounds of every active display, main display first.
    fn active_displays(&self) -> Vec<(DisplayId, Rect)>;
}

/// A fixed display arrangement.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StaticScreens {
    pub displays: Vec<(DisplayId, Rect)>,
}

impl StaticScreens {
    /// Numbers the given bounds from 1 in order.
    pub fn from_bounds(bounds: impl IntoIterator<Item = Rect>) -> Self {
        Self {
            displays: bounds
                .into_iter()
                .zip(1..)
                .map(|(rect, id)| (DisplayId::new(id), rect))
                .collect(),
        }
    }
}

impl ScreenProvider for StaticScreens {
    fn active_displays(&self) -> Vec<(DisplayId, Rect)> { self.displays.clone() }
}
