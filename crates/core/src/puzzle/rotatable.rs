use derive_more::Display;
use nalgebra::{Point3, Rotation3, Unit, Vector3};

use crate::{
    board::{BlockId, Board},
    unwrap_or_bail,
    util::{self, WorldCell},
};

/// What happened when someone tried to rotate a group
#[derive(Copy, Clone, Debug, Display, PartialEq, Eq)]
pub enum RotateOutcome {
    /// The group turned by this many degrees, and its mirrored group turned
    /// the other way
    #[display(fmt = "rotated {}°", _0)]
    Rotated(i32),
    /// Blocked in both directions
    #[display(fmt = "stuck")]
    Stuck,
    /// Rotation isn't allowed right now (the board is locked, or the group is
    /// passive)
    #[display(fmt = "ignored")]
    Ignored,
}

/// A group of blocks that turns around a pivot block. Each click turns it by
/// 90°, in whichever direction it last turned. If that direction is blocked,
/// it tries the other way, and keeps going that way afterwards.
#[derive(Clone, Debug, PartialEq)]
pub struct RotatableBlock {
    members: Vec<BlockId>,
    pivot: BlockId,
    axis: Unit<Vector3<f64>>,
    mirrored: usize,
    passive: bool,
    angle: i32,
}

impl RotatableBlock {
    /// Starting angle, in degrees
    pub const INITIAL_ANGLE: i32 = 90;

    pub fn new(
        members: Vec<BlockId>,
        pivot: BlockId,
        axis: Vector3<f64>,
        mirrored: usize,
        passive: bool,
    ) -> Self {
        Self {
            members,
            pivot,
            axis: Unit::new_normalize(axis),
            mirrored,
            passive,
            angle: Self::INITIAL_ANGLE,
        }
    }

    pub fn members(&self) -> &[BlockId] {
        &self.members
    }

    /// Index of the counterpart group
    pub fn mirrored(&self) -> usize {
        self.mirrored
    }

    pub fn is_passive(&self) -> bool {
        self.passive
    }

    /// The angle the next rotation will use, in degrees
    pub fn angle(&self) -> i32 {
        self.angle
    }

    /// Turn around for the next rotation
    pub fn flip_angle(&mut self) {
        self.angle = -self.angle;
    }

    /// Where every member would end up after rotating by `angle` degrees, in
    /// member order
    fn rotated_positions(
        &self,
        board: &Board,
        angle: i32,
    ) -> anyhow::Result<Vec<Point3<f64>>> {
        let pivot = unwrap_or_bail!(
            board.block(self.pivot),
            "unknown pivot block {}",
            self.pivot
        )
        .position();
        let rotation =
            Rotation3::from_axis_angle(&self.axis, f64::from(angle).to_radians());

        self.members
            .iter()
            .map(|&id| {
                let block =
                    unwrap_or_bail!(board.block(id), "unknown block {}", id);
                Ok(pivot + rotation * (block.position() - pivot))
            })
            .collect()
    }

    /// Check if a rotation by `angle` degrees would sweep into another block.
    /// This is conservative: anything inside the bounding box of where the
    /// members end up counts as in the way.
    pub fn can_rotate(
        &self,
        board: &Board,
        angle: i32,
    ) -> anyhow::Result<bool> {
        let targets: Vec<WorldCell> = self
            .rotated_positions(board, angle)?
            .into_iter()
            .map(util::round_to_cell)
            .collect();
        let (min, max) = match bounding_box(&targets) {
            Some(bounds) => bounds,
            None => return Ok(true),
        };

        let mut obstacles = board.occupancy().clone();
        for &id in &self.members {
            if let Some(block) = board.block(id) {
                obstacles.remove(&block.world_cell());
            }
        }
        let blocked = obstacles.iter().any(|cell| {
            (0..3).all(|i| min[i] <= cell[i] && cell[i] <= max[i])
        });
        Ok(!blocked)
    }

    /// Move every member to its rotated position. The pivot's position is
    /// read before anything moves, so the pivot can be a member.
    pub fn rotate(&self, board: &mut Board, angle: i32) -> anyhow::Result<()> {
        let positions = self.rotated_positions(board, angle)?;
        for (&id, position) in self.members.iter().zip(positions) {
            board.set_block_position(id, position)?;
        }
        Ok(())
    }
}

/// Component-wise min and max over a list of cells
fn bounding_box(cells: &[WorldCell]) -> Option<(WorldCell, WorldCell)> {
    let first = *cells.first()?;
    Some(cells.iter().fold((first, first), |(min, max), cell| {
        (min.inf(cell), max.sup(cell))
    }))
}
