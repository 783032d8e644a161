use derive_more::Display;
use serde::Serialize;

use crate::board::{path::Path, BlockId};

/// One tick of player movement
#[derive(Copy, Clone, Debug, Display, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "type")]
pub enum PlayerStep {
    /// Not moving
    #[display(fmt = "idle")]
    Idle,
    /// Crossed one edge, and there's more walking to do
    #[display(fmt = "{} -> {}", from, to)]
    Moved { from: BlockId, to: BlockId },
    /// Reached the goal of the current movement
    #[display(fmt = "{} -> {} (goal)", from, goal)]
    Arrived { from: BlockId, goal: BlockId },
}

/// The walker. It stands on one block at a time and works its way through an
/// ordered list of goals.
#[derive(Clone, Debug, PartialEq)]
pub struct Player {
    block: BlockId,
    goals: Vec<BlockId>,
    next_goal: usize,
    movement: Option<Path>,
}

impl Player {
    pub fn new(start: BlockId, goals: Vec<BlockId>) -> Self {
        Self {
            block: start,
            goals,
            next_goal: 0,
            movement: None,
        }
    }

    /// The block the player is standing on
    pub fn block(&self) -> BlockId {
        self.block
    }

    pub fn goals(&self) -> &[BlockId] {
        &self.goals
    }

    /// The goal the next movement will head for, if any are left
    pub fn next_goal(&self) -> Option<BlockId> {
        self.goals.get(self.next_goal).copied()
    }

    pub fn is_moving(&self) -> bool {
        self.movement.is_some()
    }

    /// Has the player started moving towards its last goal?
    pub fn is_finished(&self) -> bool {
        self.next_goal >= self.goals.len()
    }

    /// Begin walking a path, and count its goal as started
    pub(super) fn start_movement(&mut self, path: Path) {
        self.next_goal += 1;
        self.movement = Some(path);
    }

    /// Cross one edge of the current path. Returns `None` if not moving.
    /// When this returns [PlayerStep::Arrived], the movement is over.
    pub(super) fn advance(&mut self) -> Option<PlayerStep> {
        let path = self.movement.as_ref()?;
        let from = self.block;
        let goal = path.goal();
        match path.next_step(from) {
            Some(to) if to != goal => {
                self.block = to;
                Some(PlayerStep::Moved { from, to })
            }
            // Either the last edge, or the path was empty to begin with
            _ => {
                self.block = goal;
                self.movement = None;
                Some(PlayerStep::Arrived { from, goal })
            }
        }
    }
}
