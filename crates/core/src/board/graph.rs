use serde::Serialize;

use crate::board::{
    cell::{CellPoint, CellPointIndexMap},
    path::{self, Path},
    shape::ProjectedShapes,
    BlockId,
};

/// Everything a rebuild figured out about one block
#[derive(Copy, Clone, Debug, PartialEq, Serialize)]
pub struct ProjectedBlock {
    /// The grid cell that the block's upper face lands in
    pub cell: CellPoint,
    /// View-space depth of the block's upper face. Larger is closer.
    pub depth: f64,
    /// Triangles shown before occlusion
    pub assigned: ProjectedShapes,
    /// Triangles shown after occlusion
    pub shapes: ProjectedShapes,
}

impl ProjectedBlock {
    pub fn is_walkable(&self) -> bool {
        self.shapes.is_walkable()
    }
}

/// The walk graph over every block on the board. Nodes are blocks rather than
/// cells, because one cell can hold blocks from both sides of the mirror.
/// Each block's position in [Self::blocks] is its [BlockId] index.
///
/// A graph is immutable. Whenever anything on the board moves, a whole new
/// graph gets built.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct BlockGraph {
    blocks: Vec<ProjectedBlock>,
    neighbors: Vec<Vec<BlockId>>,
}

impl BlockGraph {
    /// A graph with no blocks and no edges
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build the graph for a list of fully resolved blocks, indexed by
    /// [BlockId]. Two cells are connected when they are orthogonal neighbors
    /// and both are walkable. When they are, every block in one cell gets an
    /// edge to every walkable block in the other.
    pub fn connect(blocks: Vec<ProjectedBlock>) -> Self {
        let groups = group_by_cell(&blocks);

        let mut neighbors = vec![Vec::new(); blocks.len()];
        for (cell, members) in &groups {
            if !is_group_walkable(&blocks, members) {
                continue;
            }

            for adjacent_cell in cell.adjacents() {
                let adjacent_members = match groups.get(&adjacent_cell) {
                    Some(adjacent_members)
                        if is_group_walkable(&blocks, adjacent_members) =>
                    {
                        adjacent_members
                    }
                    _ => continue,
                };

                for &source in members {
                    neighbors[source.index()].extend(
                        adjacent_members
                            .iter()
                            .copied()
                            .filter(|id| blocks[id.index()].is_walkable()),
                    );
                }
            }
        }

        Self { blocks, neighbors }
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// All projected blocks, in [BlockId] order
    pub fn blocks(&self) -> &[ProjectedBlock] {
        &self.blocks
    }

    pub fn block(&self, id: BlockId) -> Option<&ProjectedBlock> {
        self.blocks.get(id.index())
    }

    /// Get the blocks that can be stepped to from the given block. Empty for
    /// blocks that aren't in the graph.
    pub fn neighbors(&self, id: BlockId) -> &[BlockId] {
        self.neighbors
            .get(id.index())
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn is_walkable(&self, id: BlockId) -> bool {
        self.block(id).map_or(false, ProjectedBlock::is_walkable)
    }

    /// Total number of directed edges
    pub fn edge_count(&self) -> usize {
        self.neighbors.iter().map(Vec::len).sum()
    }

    /// Group blocks by the cell they occupy, in order of first appearance
    pub fn cell_groups(&self) -> CellPointIndexMap<Vec<BlockId>> {
        group_by_cell(&self.blocks)
    }

    /// Find the shortest walk between two blocks. See [path::plan_path].
    pub fn plan_path(&self, start: BlockId, goal: BlockId) -> Option<Path> {
        path::plan_path(start, goal, |id| self.neighbors(id))
    }
}

/// A cell is walkable if anything in it is walkable
fn is_group_walkable(blocks: &[ProjectedBlock], members: &[BlockId]) -> bool {
    members.iter().any(|id| blocks[id.index()].is_walkable())
}

fn group_by_cell(
    blocks: &[ProjectedBlock],
) -> CellPointIndexMap<Vec<BlockId>> {
    let mut groups = CellPointIndexMap::default();
    for (index, block) in blocks.iter().enumerate() {
        groups
            .entry(block.cell)
            .or_insert_with(Vec::new)
            .push(BlockId::new(index));
    }
    groups
}
