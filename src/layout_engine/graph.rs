use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter};

use crate::sys::geometry::{Rect, Size};

/// Split axis. Horizontal containers place children left to right.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Orientation {
    Horizontal,
    Vertical,
}

impl Orientation {
    pub fn is_vertical(self) -> bool { self == Orientation::Vertical }

    pub fn from_vertical(vertical: bool) -> Self {
        if vertical { Orientation::Vertical } else { Orientation::Horizontal }
    }

    pub fn along_size(self, size: Size) -> f64 {
        match self {
            Orientation::Horizontal => size.width,
            Orientation::Vertical => size.height,
        }
    }

    pub fn along_rect(self, rect: Rect) -> f64 { self.along_size(rect.size()) }

    pub fn start(self, rect: Rect) -> f64 {
        match self {
            Orientation::Horizontal => rect.x,
            Orientation::Vertical => rect.y,
        }
    }

    /// `size` with its extent along this axis replaced by `along`.
    pub fn with_along(self, size: Size, along: f64) -> Size {
        match self {
            Orientation::Horizontal => Size::new(along, size.height),
            Orientation::Vertical => Size::new(size.width, along),
        }
    }
}

/// Side of a target element a new element is docked on. Also the step type of
/// a direction link.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Side {
    Left,
    Right,
    Top,
    Bottom,
}

impl Side {
    pub fn orientation(self) -> Orientation {
        match self {
            Side::Left | Side::Right => Orientation::Horizontal,
            Side::Top | Side::Bottom => Orientation::Vertical,
        }
    }

    /// Left and top put the docked element first in the new container.
    pub fn is_leading(self) -> bool { matches!(self, Side::Left | Side::Top) }

    /// The side a child sits on within a container of `orientation`.
    pub fn of_child(orientation: Orientation, first: bool) -> Side {
        match (orientation, first) {
            (Orientation::Horizontal, true) => Side::Left,
            (Orientation::Horizontal, false) => Side::Right,
            (Orientation::Vertical, true) => Side::Top,
            (Orientation::Vertical, false) => Side::Bottom,
        }
    }

    /// The half of `rect` on this side.
    pub fn half_of(self, rect: Rect) -> Rect {
        let Rect { x, y, w, h } = rect;
        match self {
            Side::Left => Rect::new(x, y, w / 2.0, h),
            Side::Right => Rect::new(x + w / 2.0, y, w / 2.0, h),
            Side::Top => Rect::new(x, y, w, h / 2.0),
            Side::Bottom => Rect::new(x, y + h / 2.0, w, h / 2.0),
        }
    }
}

/// Where a dragged tab lands relative to an existing one.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum TabPlacement {
    Before,
    After,
}

/// Root-to-node path of sides. Empty for the root itself.
pub type DirLink = Vec<Side>;
