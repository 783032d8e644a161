use nalgebra::Point3;

use crate::{
    board::{Block, BlockId, Board},
    unwrap_or_bail,
    util::{self, WorldCellSet},
};

/// One block in a [MovableBlock] group, and the box it can slide around in.
/// Ranges are inclusive, in world units.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct MovableMember {
    pub block: BlockId,
    pub x_range: (i32, i32),
    pub z_range: (i32, i32),
}

impl MovableMember {
    /// Shift a position by the given amounts, keeping it inside this member's
    /// ranges. Y never changes.
    fn shifted(&self, position: Point3<f64>, dx: f64, dz: f64) -> Point3<f64> {
        Point3::new(
            clamp(position.x + dx, self.x_range),
            position.y,
            clamp(position.z + dz, self.z_range),
        )
    }

    /// Round a position onto the integer grid, then clamp it
    fn snapped(&self, position: Point3<f64>) -> Point3<f64> {
        Point3::new(
            clamp(f64::from(util::round_to_int(position.x)), self.x_range),
            position.y,
            clamp(f64::from(util::round_to_int(position.z)), self.z_range),
        )
    }
}

fn clamp(value: f64, (min, max): (i32, i32)) -> f64 {
    value.max(f64::from(min)).min(f64::from(max))
}

/// A group of blocks that slides along world X/Z as one. Every movable group
/// has a mirrored counterpart, referred to by index in the puzzle's list of
/// groups. When this group moves by `(+m, +m)`, the counterpart moves by
/// `(+m, -m)`.
#[derive(Clone, Debug, PartialEq)]
pub struct MovableBlock {
    members: Vec<MovableMember>,
    mirrored: usize,
    passive: bool,
    move_speed: f64,
}

impl MovableBlock {
    pub fn new(
        members: Vec<MovableMember>,
        mirrored: usize,
        passive: bool,
        move_speed: f64,
    ) -> Self {
        Self {
            members,
            mirrored,
            passive,
            move_speed,
        }
    }

    pub fn members(&self) -> &[MovableMember] {
        &self.members
    }

    /// Index of the counterpart group
    pub fn mirrored(&self) -> usize {
        self.mirrored
    }

    pub fn is_passive(&self) -> bool {
        self.passive
    }

    pub fn move_speed(&self) -> f64 {
        self.move_speed
    }

    /// Every cell that blocks this group from moving: the board's occupancy,
    /// minus the cells this group is currently sitting in.
    pub fn obstacles(&self, board: &Board) -> anyhow::Result<WorldCellSet> {
        let mut obstacles = board.occupancy().clone();
        for member in &self.members {
            obstacles.remove(&member_block(board, member.block)?.world_cell());
        }
        Ok(obstacles)
    }

    /// Check if every member could take a step of `step` along X and Z
    /// without running into an obstacle. A position that straddles cells
    /// touches both its floor and ceiling cells.
    pub fn can_move(
        &self,
        board: &Board,
        obstacles: &WorldCellSet,
        step: f64,
    ) -> anyhow::Result<bool> {
        for member in &self.members {
            let position = member_block(board, member.block)?.position();
            let tentative = member.shifted(position, step, step);
            if obstacles.contains(&util::floor_to_cell(tentative))
                || obstacles.contains(&util::ceil_to_cell(tentative))
            {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Move every member, clamped to its own ranges
    pub fn shift(
        &self,
        board: &mut Board,
        dx: f64,
        dz: f64,
    ) -> anyhow::Result<()> {
        for member in &self.members {
            let position = member_block(board, member.block)?.position();
            board.set_block_position(
                member.block,
                member.shifted(position, dx, dz),
            )?;
        }
        Ok(())
    }

    /// Put every member back on the integer grid
    pub fn snap(&self, board: &mut Board) -> anyhow::Result<()> {
        for member in &self.members {
            let position = member_block(board, member.block)?.position();
            board.set_block_position(member.block, member.snapped(position))?;
        }
        Ok(())
    }
}

fn member_block(board: &Board, id: BlockId) -> anyhow::Result<&Block> {
    Ok(unwrap_or_bail!(board.block(id), "unknown block {}", id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::{projection::Camera, Category};
    use assert_approx_eq::assert_approx_eq;
    use nalgebra::Vector3;

    fn board() -> Board {
        Board::new(
            Camera::look_at(
                Point3::new(10.0, 10.0, -10.0),
                Point3::origin(),
                Vector3::y(),
            ),
            None,
        )
    }

    fn group(block: BlockId) -> MovableBlock {
        MovableBlock::new(
            vec![MovableMember {
                block,
                x_range: (0, 3),
                z_range: (-1, 2),
            }],
            1,
            false,
            0.5,
        )
    }

    #[test]
    fn test_shift_clamps() {
        let mut board = board();
        let id = board.add_block(
            "a",
            Category::BeforeMirror,
            Point3::new(2.0, 0.0, 1.0),
        );
        let group = group(id);
        group.shift(&mut board, 0.5, -0.5).unwrap();
        let position = board.block(id).unwrap().position();
        assert_eq!(position, Point3::new(2.5, 0.0, 0.5));
        group.shift(&mut board, 4.0, -4.0).unwrap();
        let position = board.block(id).unwrap().position();
        assert_eq!(position, Point3::new(3.0, 0.0, -1.0));
    }

    #[test]
    fn test_snap() {
        let mut board = board();
        let id = board.add_block(
            "a",
            Category::BeforeMirror,
            Point3::new(1.5, 2.0, 0.7),
        );
        let group = group(id);
        group.snap(&mut board).unwrap();
        let position = board.block(id).unwrap().position();
        // Ties go to even
        assert_approx_eq!(position.x, 2.0);
        assert_approx_eq!(position.z, 1.0);
        assert_approx_eq!(position.y, 2.0);
    }

    #[test]
    fn test_obstacles_and_can_move() {
        let mut board = board();
        let id = board.add_block("a", Category::BeforeMirror, Point3::origin());
        board.add_block(
            "wall",
            Category::BeforeMirror,
            Point3::new(1.0, 0.0, 1.0),
        );
        board.rebuild().unwrap();

        let group = group(id);
        let obstacles = group.obstacles(&board).unwrap();
        assert!(!obstacles.contains(&Point3::new(0, 0, 0)));
        assert!(obstacles.contains(&Point3::new(1, 0, 1)));

        // Half a step forward already touches the wall's cell
        assert!(!group.can_move(&board, &obstacles, 0.5).unwrap());
        // Backward is clamped at x=0 but z is free
        assert!(group.can_move(&board, &obstacles, -0.5).unwrap());
    }
}
