//! Deciding which triangles of each block are actually visible. This happens
//! in two stages:
//!
//! 1. Each block gets an *assigned* set of triangles based on its category and
//!    where the mirror is ([assign_shapes])
//! 2. Blocks that share screen space with a block closer to the camera lose
//!    the upper triangles that are covered up ([resolve_depth])
//!
//! The second stage only ever reads the output of the first, so the assigned
//! shapes are kept around as a snapshot.

use fnv::FnvBuildHasher;
use std::collections::HashMap;
use strum::IntoEnumIterator;

use crate::board::{
    cell::CellPoint,
    mirror::MirrorRegion,
    shape::{ProjectedShapes, UpperSlot},
    Category,
};

/// Get the triangles that a block shows before any occlusion is considered.
/// Blocks in front of the mirror are never affected by it. Blocks in the
/// mirror show only what falls inside the mirror's window, and blocks behind
/// the mirror show exactly the rest.
pub fn assign_shapes(
    category: Category,
    cell: CellPoint,
    region: &MirrorRegion,
) -> ProjectedShapes {
    let center = cell.center();
    match category {
        Category::BeforeMirror => ProjectedShapes::FULL_HEXAGON,
        Category::InMirror => ProjectedShapes::from_fn(|triangle| {
            region.contains(center + triangle.sample_offset())
        }),
        Category::BehindMirror => ProjectedShapes::from_fn(|triangle| {
            !region.contains(center + triangle.sample_offset())
        }),
    }
}

/// One block's input to depth resolution
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ShapeSnapshot {
    pub cell: CellPoint,
    pub depth: f64,
    pub assigned: ProjectedShapes,
}

/// Max depth of all claims on each upper slot of each cell
#[derive(Clone, Debug, Default)]
struct DepthMap {
    max_depths: HashMap<(CellPoint, UpperSlot), f64, FnvBuildHasher>,
}

impl DepthMap {
    fn claim(&mut self, cell: CellPoint, slot: UpperSlot, depth: f64) {
        self.max_depths
            .entry((cell, slot))
            .and_modify(|max| *max = max.max(depth))
            .or_insert(depth);
    }

    /// Is there a claim on this slot that's closer to the camera?
    fn is_occluded(
        &self,
        cell: CellPoint,
        slot: UpperSlot,
        depth: f64,
    ) -> bool {
        self.max_depths
            .get(&(cell, slot))
            .map_or(false, |&max| depth < max)
    }
}

/// Resolve occlusion between blocks. Every set triangle is a claim on one
/// upper slot of some cell (see [crate::board::shape::Triangle::alias]).
/// Among all claims on a slot, only the one closest to the camera wins, and
/// every block that loses on one of its *own* upper slots has that triangle
/// cleared. Other triangles are never cleared.
///
/// Output is in the same order as the input. Resolution is idempotent: feeding
/// the output back in as a new snapshot changes nothing.
pub fn resolve_depth(snapshot: &[ShapeSnapshot]) -> Vec<ProjectedShapes> {
    let mut depth_map = DepthMap::default();
    for block in snapshot {
        for triangle in block.assigned.triangles() {
            let (offset, slot) = triangle.alias();
            depth_map.claim(block.cell + offset, slot, block.depth);
        }
    }

    snapshot
        .iter()
        .map(|block| {
            UpperSlot::iter().fold(block.assigned, |shapes, slot| {
                let triangle = slot.triangle();
                if shapes.contains(triangle)
                    && depth_map.is_occluded(block.cell, slot, block.depth)
                {
                    shapes.without(triangle)
                } else {
                    shapes
                }
            })
        })
        .collect()
}
