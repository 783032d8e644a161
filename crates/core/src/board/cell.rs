//! Integer cells of the oblique grid.
//!
//! ## Oblique Coordinates
//!
//! The board is viewed through a camera that looks down at the blocks from an
//! angle. Once everything is flattened onto the screen, the world X and Z axes
//! show up as two screen-space directions that are generally *not*
//! perpendicular. Oblique coordinates use those two directions as the basis,
//! so one step along the oblique `x` axis is the on-screen length of one world
//! unit along X, and likewise `y` for world Z. The origin is the upper center
//! of an arbitrary reference block.
//!
//! Since the view is a parallel projection, anything that lies on the same
//! line of sight lands on the same oblique point. That's what lets a block in
//! front of the mirror and a block behind it share a cell and be walked across
//! as if they were neighbors.
//!
//! +-------------------+
//! |        +y         |
//! |         ^         |
//! |         |         |
//! | -x <----o----> +x |
//! |         |         |
//! |         v         |
//! |        -y         |
//! +-------------------+
//!
//! Each cell is the top face of a cube as seen by the camera. Together with
//! the two visible side faces that hang below it, it covers a hexagon, which
//! is split into six triangles. See [crate::board::shape].

use derive_more::{Add, AddAssign, Display, Neg, Sub};
use fnv::FnvBuildHasher;
use indexmap::IndexMap;
use nalgebra::{Point2, Vector2};
use serde::{Deserialize, Serialize};
use strum::{EnumIter, IntoEnumIterator};

use crate::util;

/// An ORDERED map of cell points to some `T`. Use this when iteration order
/// leaks into the output, e.g. the order of neighbor lists.
pub type CellPointIndexMap<T> = IndexMap<CellPoint, T, FnvBuildHasher>;

/// A whole cell of the oblique grid.
#[derive(
    Copy,
    Clone,
    Debug,
    Default,
    PartialEq,
    Eq,
    Hash,
    Display,
    Serialize,
    Deserialize,
)]
#[display(fmt = "({}, {})", x, y)]
pub struct CellPoint {
    pub x: i32,
    pub y: i32,
}

impl CellPoint {
    pub const ORIGIN: Self = Self::new(0, 0);

    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Get the cell that contains a continuous oblique point, i.e. round each
    /// component to the nearest integer
    pub fn containing(point: Point2<f64>) -> Self {
        Self::new(util::round_to_int(point.x), util::round_to_int(point.y))
    }

    /// The continuous oblique point at the center of this cell
    pub fn center(self) -> Point2<f64> {
        Point2::new(self.x as f64, self.y as f64)
    }

    /// Get the cell one step away in the given direction
    pub fn adjacent(self, direction: CellDirection) -> Self {
        self + direction.to_vector()
    }

    /// Get an iterator of the four orthogonally adjacent cells, in the
    /// iteration order of [CellDirection]
    pub fn adjacents(self) -> impl Iterator<Item = CellPoint> {
        CellDirection::iter().map(move |dir| self.adjacent(dir))
    }
}

impl std::ops::Add<CellVector> for CellPoint {
    type Output = CellPoint;

    fn add(self, rhs: CellVector) -> Self::Output {
        Self::new(self.x + rhs.x, self.y + rhs.y)
    }
}

/// A translation between two cells
#[derive(
    Copy,
    Clone,
    Debug,
    Default,
    PartialEq,
    Eq,
    Hash,
    Display,
    Add,
    AddAssign,
    Sub,
    Neg,
)]
#[display(fmt = "<{}, {}>", x, y)]
pub struct CellVector {
    pub x: i32,
    pub y: i32,
}

impl CellVector {
    pub const ZERO: Self = Self::new(0, 0);

    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Convert to a continuous oblique vector
    pub fn to_oblique(self) -> Vector2<f64> {
        Vector2::new(self.x as f64, self.y as f64)
    }
}

/// The four directions in which a walker can step from one cell to another.
/// Cells only connect along the two oblique axes, never diagonally.
#[derive(
    Copy, Clone, Debug, EnumIter, PartialEq, Eq, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum CellDirection {
    /// `+x`, along the projection of world X
    Right,
    /// `-x`
    Left,
    /// `+y`, along the projection of world Z
    Forward,
    /// `-y`
    Back,
}

impl CellDirection {
    /// Get the offset that moves a cell one step in this direction
    pub fn to_vector(self) -> CellVector {
        match self {
            Self::Right => CellVector::new(1, 0),
            Self::Left => CellVector::new(-1, 0),
            Self::Forward => CellVector::new(0, 1),
            Self::Back => CellVector::new(0, -1),
        }
    }
}
