//! Which parts of a cell's hexagon a block shows.
//!
//! Seen through the camera, a block covers a hexagon: its top face (the
//! cell) plus its two visible side faces. The hexagon is cut into six
//! triangles, three upper and three lower:
//!
//! ```text
//!        ___________
//!       /\    MU   /\
//!      /  \       /  \
//!     / LU \     / RU \
//!    /______\___/______\
//!    \      /   \      /
//!     \ LL /     \ RL /
//!      \  /   ML  \  /
//!       \/_________\/
//! ```
//!
//! The upper-left and upper-middle triangles are the block's own cell. The
//! other four are shared with neighboring cells of the oblique tiling: the
//! right-upper triangle is the same patch of screen as the left-upper triangle
//! of the cell to the right, and so on. See [Triangle::alias].

use derive_more::{BitAnd, BitAndAssign, BitOr, BitOrAssign};
use nalgebra::Vector2;
use serde::{Deserialize, Serialize};
use std::fmt;
use strum::{EnumIter, IntoEnumIterator};

use crate::board::cell::CellVector;

/// One of the six triangles that make up the hexagon a block projects to.
#[derive(
    Copy, Clone, Debug, EnumIter, PartialEq, Eq, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Triangle {
    LeftUpper,
    MiddleUpper,
    RightUpper,
    LeftLower,
    MiddleLower,
    RightLower,
}

impl Triangle {
    /// Distance from a cell corner to the center of a triangle, along each
    /// oblique axis.
    const SAMPLE_NUDGE: f64 = 1.0 / 6.0;

    /// The bit that represents this triangle in [ProjectedShapes]
    const fn bit(self) -> u8 {
        1 << self as u8
    }

    /// The two upper triangles lie on the block's own cell. Every other
    /// triangle covers the same screen area as one of the upper triangles of
    /// a neighboring cell. This returns that cell (as an offset from the
    /// block's cell) and which of its upper triangles it is.
    pub fn alias(self) -> (CellVector, UpperSlot) {
        match self {
            Self::LeftUpper => (CellVector::ZERO, UpperSlot::Left),
            Self::MiddleUpper => (CellVector::ZERO, UpperSlot::Middle),
            Self::RightUpper => (CellVector::new(1, 0), UpperSlot::Left),
            Self::LeftLower => (CellVector::new(0, -1), UpperSlot::Middle),
            Self::MiddleLower => (CellVector::new(1, -1), UpperSlot::Left),
            Self::RightLower => (CellVector::new(1, -1), UpperSlot::Middle),
        }
    }

    /// Offset from a cell's center to a point inside this triangle, in
    /// oblique coordinates. Used to test each triangle against the mirror.
    pub fn sample_offset(self) -> Vector2<f64> {
        let (cell_offset, slot) = self.alias();
        cell_offset.to_oblique() + slot.sample_offset()
    }
}

/// The two triangles of a hexagon that sit on the block's own cell. These are
/// the only triangles that matter for walking, and the only ones that can be
/// hidden by a block closer to the camera.
#[derive(
    Copy, Clone, Debug, EnumIter, PartialEq, Eq, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum UpperSlot {
    Left,
    Middle,
}

impl UpperSlot {
    /// The triangle that occupies this slot on its own cell
    pub fn triangle(self) -> Triangle {
        match self {
            Self::Left => Triangle::LeftUpper,
            Self::Middle => Triangle::MiddleUpper,
        }
    }

    fn sample_offset(self) -> Vector2<f64> {
        match self {
            Self::Left => Vector2::new(
                -Triangle::SAMPLE_NUDGE,
                -Triangle::SAMPLE_NUDGE,
            ),
            Self::Middle => {
                Vector2::new(Triangle::SAMPLE_NUDGE, Triangle::SAMPLE_NUDGE)
            }
        }
    }
}

/// A set of [Triangle]s, stored as a bitmask. This describes which parts of
/// its hexagon a block actually shows after mirror culling and occlusion.
#[derive(
    Copy,
    Clone,
    Default,
    PartialEq,
    Eq,
    Hash,
    BitAnd,
    BitOr,
    BitAndAssign,
    BitOrAssign,
    Serialize,
    Deserialize,
)]
#[serde(transparent)]
pub struct ProjectedShapes(u8);

impl ProjectedShapes {
    /// No triangles at all
    pub const NONE: Self = Self(0);
    /// The two triangles that make up the block's own cell. A block is only
    /// walkable if it shows both of them.
    pub const WALKABLE: Self = Self(
        Triangle::LeftUpper.bit() | Triangle::MiddleUpper.bit(),
    );
    /// All six triangles
    pub const FULL_HEXAGON: Self = Self(0b11_1111);

    /// Build a set from a list of triangles
    pub fn from_triangles(
        triangles: impl IntoIterator<Item = Triangle>,
    ) -> Self {
        triangles
            .into_iter()
            .fold(Self::NONE, |acc, triangle| acc.with(triangle))
    }

    /// Build a set by testing every triangle against a predicate
    pub fn from_fn(mut predicate: impl FnMut(Triangle) -> bool) -> Self {
        Self::from_triangles(Triangle::iter().filter(|t| predicate(*t)))
    }

    pub fn contains(self, triangle: Triangle) -> bool {
        self.0 & triangle.bit() != 0
    }

    pub fn contains_all(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Copy of this set with the triangle added
    #[must_use]
    pub fn with(self, triangle: Triangle) -> Self {
        Self(self.0 | triangle.bit())
    }

    /// Copy of this set with the triangle removed
    #[must_use]
    pub fn without(self, triangle: Triangle) -> Self {
        Self(self.0 & !triangle.bit())
    }

    /// Every triangle of the hexagon that is *not* in this set
    #[must_use]
    pub fn complement(self) -> Self {
        Self(!self.0 & Self::FULL_HEXAGON.0)
    }

    /// Both upper triangles present, meaning something can stand here
    pub fn is_walkable(self) -> bool {
        self.contains_all(Self::WALKABLE)
    }

    /// Iterate over the triangles in this set
    pub fn triangles(self) -> impl Iterator<Item = Triangle> {
        Triangle::iter().filter(move |t| self.contains(*t))
    }
}

impl fmt::Debug for ProjectedShapes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ProjectedShapes({})", self)
    }
}

impl fmt::Display for ProjectedShapes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return f.write_str("none");
        }
        if *self == Self::FULL_HEXAGON {
            return f.write_str("full");
        }
        let names: Vec<String> =
            self.triangles().map(|t| format!("{:?}", t)).collect();
        f.write_str(&names.join("|"))
    }
}
