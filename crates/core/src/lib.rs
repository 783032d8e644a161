//! Mirrorboard is the board logic for mirror puzzles: a grid of unit blocks
//! looked at through an isometric camera, with a mirror that splits the scene
//! into a real half and a reflected half. This crate projects every block
//! onto a shared 2D grid, figures out which triangles of each cell are visible
//! on each side of the mirror, and derives a walk graph from what's left.
//! Rendering and animation are left to whatever hosts the board.
//!
//! ```
//! use mirrorboard::{Puzzle, PuzzleConfig};
//!
//! # fn main() -> anyhow::Result<()> {
//! let config: PuzzleConfig = serde_json::from_str(
//!     r#"{
//!         "blocks": [
//!             {"name": "a", "category": "before_mirror", "position": [0, 0, 0]},
//!             {"name": "b", "category": "before_mirror", "position": [1, 0, 0]}
//!         ],
//!         "player": {"start": "a", "goals": ["b"]}
//!     }"#,
//! )?;
//! let mut puzzle = Puzzle::new(config)?;
//! println!("{} edges", puzzle.board().graph().edge_count());
//! for step in puzzle.walk()? {
//!     println!("{}", step);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! See [PuzzleConfig] for everything a puzzle can contain, and [Board] for
//! working with the board directly.

pub mod board;
mod config;
pub mod puzzle;
mod util;

pub use crate::{
    board::{Board, BlockId, Category},
    config::{
        BlockConfig, CameraConfig, MirrorConfig, MovableBlockConfig,
        MovableConfig, PlayerConfig, PuzzleConfig, RotatableConfig,
    },
    puzzle::Puzzle,
    util::{WorldCell, WorldCellSet},
};
