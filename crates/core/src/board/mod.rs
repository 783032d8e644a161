//! The board: every block, the mirror, the camera that looks at them, and the
//! walk graph that falls out of all of that.

mod build;
pub mod cell;
pub mod cull;
pub mod event;
pub mod graph;
pub mod guard;
pub mod mirror;
pub mod path;
pub mod projection;
pub mod shape;

use anyhow::Context;
use derive_more::Display;
use log::{debug, info};
use nalgebra::{Point3, Vector3};
use serde::{Deserialize, Serialize};

use crate::{
    board::{
        build::GraphBuilder,
        event::RebuildListeners,
        graph::BlockGraph,
        guard::InteractionGuard,
        mirror::{MirrorPlane, MirrorRegion},
        path::Path,
        projection::Camera,
    },
    timed,
    util::{self, WorldCell, WorldCellSet},
};

/// Identifies a block on one particular [Board]. Blocks are never removed, so
/// IDs are just indexes into the board's list of blocks.
#[derive(
    Copy,
    Clone,
    Debug,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Display,
    Serialize,
    Deserialize,
)]
#[display(fmt = "#{}", _0)]
#[serde(transparent)]
pub struct BlockId(usize);

impl BlockId {
    pub const fn new(index: usize) -> Self {
        Self(index)
    }

    pub fn index(self) -> usize {
        self.0
    }
}

/// Which part of the scene a block belongs to, relative to the mirror. This
/// decides how the mirror affects what the block shows.
#[derive(
    Copy,
    Clone,
    Debug,
    PartialEq,
    Eq,
    Hash,
    strum::Display,
    Serialize,
    Deserialize,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Category {
    /// Between the mirror and the camera. Always fully visible.
    BeforeMirror,
    /// The reflected scene. Only visible through the mirror.
    InMirror,
    /// The real scene behind the mirror. Visible everywhere the mirror isn't.
    BehindMirror,
}

/// A unit cube on the board
#[derive(Clone, Debug, PartialEq)]
pub struct Block {
    id: BlockId,
    name: String,
    category: Category,
    position: Point3<f64>,
}

impl Block {
    pub(crate) fn new(
        id: BlockId,
        name: String,
        category: Category,
        position: Point3<f64>,
    ) -> Self {
        Self {
            id,
            name,
            category,
            position,
        }
    }

    pub fn id(&self) -> BlockId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn category(&self) -> Category {
        self.category
    }

    /// World position of the center of the block
    pub fn position(&self) -> Point3<f64> {
        self.position
    }

    /// World position of the center of the block's top face. This is the
    /// point that gets projected onto the grid.
    pub fn upper_center(&self) -> Point3<f64> {
        self.position + Vector3::new(0.0, 0.5, 0.0)
    }

    /// The world cell the block occupies
    pub fn world_cell(&self) -> WorldCell {
        util::round_to_cell(self.position)
    }
}

/// All state for one puzzle board. The board owns its blocks, and derives a
/// [BlockGraph] from them on every [Board::rebuild]. Derived state is never
/// updated incrementally: move something, then rebuild.
///
/// The board starts out with an empty graph. Call [Board::rebuild] once
/// everything is in place.
#[derive(Debug)]
pub struct Board {
    camera: Camera,
    mirror: Option<MirrorPlane>,
    blocks: Vec<Block>,

    // Derived state, replaced as a unit on every successful rebuild
    graph: BlockGraph,
    region: Option<MirrorRegion>,
    occupancy: WorldCellSet,

    guard: InteractionGuard,
    listeners: RebuildListeners,
}

impl Board {
    pub fn new(camera: Camera, mirror: Option<MirrorPlane>) -> Self {
        Self {
            camera,
            mirror,
            blocks: Vec::new(),
            graph: BlockGraph::empty(),
            region: None,
            occupancy: WorldCellSet::default(),
            guard: InteractionGuard::default(),
            listeners: RebuildListeners::default(),
        }
    }

    /// Add a new block to the board. The block won't show up in the graph
    /// until the next rebuild.
    pub fn add_block(
        &mut self,
        name: impl Into<String>,
        category: Category,
        position: Point3<f64>,
    ) -> BlockId {
        let id = BlockId::new(self.blocks.len());
        self.blocks
            .push(Block::new(id, name.into(), category, position));
        id
    }

    pub fn block(&self, id: BlockId) -> Option<&Block> {
        self.blocks.get(id.index())
    }

    /// All blocks, in [BlockId] order
    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    /// Get every block of one category, in [BlockId] order
    pub fn blocks_in(
        &self,
        category: Category,
    ) -> impl Iterator<Item = &Block> + '_ {
        self.blocks
            .iter()
            .filter(move |block| block.category == category)
    }

    /// Find a block by name. If multiple blocks have the same name, the first
    /// one wins.
    pub fn find_block(&self, name: &str) -> Option<BlockId> {
        self.blocks
            .iter()
            .find(|block| block.name == name)
            .map(Block::id)
    }

    /// Move a block. Returns an error if the block isn't on this board.
    pub fn set_block_position(
        &mut self,
        id: BlockId,
        position: Point3<f64>,
    ) -> anyhow::Result<()> {
        let block = self
            .blocks
            .get_mut(id.index())
            .with_context(|| format!("unknown block {}", id))?;
        block.position = position;
        Ok(())
    }

    pub fn set_camera(&mut self, camera: Camera) {
        self.camera = camera;
    }

    pub fn mirror(&self) -> Option<&MirrorPlane> {
        self.mirror.as_ref()
    }

    pub fn mirror_mut(&mut self) -> Option<&mut MirrorPlane> {
        self.mirror.as_mut()
    }

    pub fn set_mirror(&mut self, mirror: Option<MirrorPlane>) {
        self.mirror = mirror;
    }

    /// Recompute everything derived from the blocks, mirror and camera: the
    /// walk graph and the occupancy set. Nothing is committed unless the
    /// whole rebuild succeeds, so on error the board keeps the last good
    /// graph. Every registered listener is notified after a successful
    /// rebuild.
    ///
    /// Without a mirror or without any blocks, the graph is empty. That isn't
    /// an error.
    pub fn rebuild(&mut self) -> anyhow::Result<()> {
        let occupancy: WorldCellSet =
            self.blocks.iter().map(Block::world_cell).collect();

        let (graph, region) = match &self.mirror {
            Some(mirror) if !self.blocks.is_empty() => {
                let builder =
                    GraphBuilder::new(self.camera, mirror, &self.blocks);
                let (graph, region) = timed!(
                    "Graph rebuild",
                    builder.build_graph()
                )
                .context("error rebuilding block graph")?;
                (graph, Some(region))
            }
            _ => {
                debug!(
                    "Nothing to project (mirror: {}, blocks: {})",
                    self.mirror.is_some(),
                    self.blocks.len()
                );
                (BlockGraph::empty(), None)
            }
        };

        info!(
            "Rebuilt graph: {} blocks, {} walkable, {} edges",
            graph.blocks().len(),
            graph.blocks().iter().filter(|b| b.is_walkable()).count(),
            graph.edge_count()
        );
        self.graph = graph;
        self.region = region;
        self.occupancy = occupancy;
        self.listeners.notify(&self.graph);
        Ok(())
    }

    /// The graph from the last successful rebuild
    pub fn graph(&self) -> &BlockGraph {
        &self.graph
    }

    /// The mirror's window from the last successful rebuild. `None` if there
    /// was nothing to project.
    pub fn mirror_region(&self) -> Option<&MirrorRegion> {
        self.region.as_ref()
    }

    /// World cells occupied by blocks, as of the last successful rebuild
    pub fn occupancy(&self) -> &WorldCellSet {
        &self.occupancy
    }

    /// Find the shortest walk between two blocks in the current graph
    pub fn plan_path(&self, start: BlockId, goal: BlockId) -> Option<Path> {
        self.graph.plan_path(start, goal)
    }

    /// Register a callback to run after every successful rebuild
    pub fn on_rebuilt(
        &mut self,
        listener: impl FnMut(&BlockGraph) + 'static,
    ) {
        self.listeners.add(listener);
    }

    pub fn begin_interaction_lock(&mut self) {
        self.guard.lock();
    }

    pub fn end_interaction_lock(&mut self) {
        self.guard.unlock();
    }

    pub fn can_interact(&self) -> bool {
        self.guard.can_interact()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{cell::Cell, rc::Rc};

    fn board() -> Board {
        let camera = Camera::look_at(
            Point3::new(10.0, 10.0, -10.0),
            Point3::origin(),
            Vector3::y(),
        );
        Board::new(
            camera,
            Some(MirrorPlane {
                width: 7,
                height: 12,
                position: Point3::new(4.5, 6.5, -0.5),
                move_min_x: 3.0,
                move_max_x: 7.0,
                move_speed: 0.05,
            }),
        )
    }

    #[test]
    fn test_blocks() {
        let mut board = board();
        let a = board.add_block("a", Category::BeforeMirror, Point3::origin());
        let b = board.add_block(
            "b",
            Category::InMirror,
            Point3::new(1.0, 0.0, 0.0),
        );
        assert_eq!(a, BlockId::new(0));
        assert_eq!(b, BlockId::new(1));
        assert_eq!(board.find_block("b"), Some(b));
        assert_eq!(board.find_block("c"), None);
        assert_eq!(
            board
                .blocks_in(Category::InMirror)
                .map(Block::id)
                .collect::<Vec<_>>(),
            vec![b]
        );

        board
            .set_block_position(b, Point3::new(1.4, 0.6, -0.2))
            .unwrap();
        let block = board.block(b).unwrap();
        assert_eq!(block.world_cell(), Point3::new(1, 1, 0));
        assert_eq!(block.upper_center(), Point3::new(1.4, 1.1, -0.2));
        assert!(board
            .set_block_position(BlockId::new(7), Point3::origin())
            .is_err());
    }

    #[test]
    fn test_empty_rebuilds() {
        // No blocks
        let mut board = board();
        board.rebuild().unwrap();
        assert!(board.graph().is_empty());
        assert!(board.occupancy().is_empty());

        // No mirror, occupancy is still tracked
        board.add_block("a", Category::BeforeMirror, Point3::origin());
        board.set_mirror(None);
        board.rebuild().unwrap();
        assert!(board.graph().is_empty());
        assert!(board.mirror_region().is_none());
        assert!(board.occupancy().contains(&Point3::new(0, 0, 0)));
    }

    #[test]
    fn test_failed_rebuild_keeps_graph() {
        let mut board = board();
        board.add_block("a", Category::BeforeMirror, Point3::origin());
        board.add_block(
            "b",
            Category::BeforeMirror,
            Point3::new(1.0, 0.0, 0.0),
        );
        board.rebuild().unwrap();
        assert_eq!(board.graph().edge_count(), 2);

        let calls = Rc::new(Cell::new(0));
        let counter = Rc::clone(&calls);
        board.on_rebuilt(move |_| counter.set(counter.get() + 1));

        // Move a block, then break the camera so the rebuild fails
        board
            .set_block_position(BlockId::new(1), Point3::new(5.0, 0.0, 0.0))
            .unwrap();
        board.set_camera(Camera::look_at(
            Point3::new(0.0, 0.0, 10.0),
            Point3::origin(),
            Vector3::y(),
        ));
        assert!(board.rebuild().is_err());
        assert_eq!(calls.get(), 0);
        assert_eq!(board.graph().edge_count(), 2);
        assert!(board.occupancy().contains(&Point3::new(1, 0, 0)));
        assert!(!board.occupancy().contains(&Point3::new(5, 0, 0)));

        // Looking straight down works fine
        board.set_camera(Camera::look_at(
            Point3::new(0.0, 10.0, 0.0),
            Point3::origin(),
            Vector3::x(),
        ));
        board.rebuild().unwrap();
        assert_eq!(calls.get(), 1);
        assert_eq!(board.graph().edge_count(), 0);
        assert!(board.occupancy().contains(&Point3::new(5, 0, 0)));
    }

    #[test]
    fn test_guard() {
        let mut board = board();
        assert!(board.can_interact());
        board.begin_interaction_lock();
        assert!(!board.can_interact());
        board.end_interaction_lock();
        assert!(board.can_interact());
    }
}
