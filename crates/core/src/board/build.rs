use anyhow::{anyhow, Context};
use log::debug;
use nalgebra::Point3;
use std::fmt::Debug;

use crate::{
    board::{
        cull::{self, ShapeSnapshot},
        graph::{BlockGraph, ProjectedBlock},
        mirror::{MirrorPlane, MirrorRegion},
        projection::{Camera, ObliqueProjector, Projection},
        shape::ProjectedShapes,
        Block, BlockId, Category,
    },
    timed, unwrap_or_bail,
};

/// A container for rebuilding the block graph. This applies a series of steps
/// in sequence, each of which fills in more data on the blocks. These fields
/// are public to allow for disjoint borrowing of multiple fields at once.
///
/// Nothing in here is ever written back to the board directly. The board only
/// takes the finished graph, so a failed rebuild leaves no trace.
pub struct GraphBuilder<'a> {
    pub camera: Camera,
    pub mirror: &'a MirrorPlane,

    /// One builder per block on the board, in [BlockId] order
    pub blocks: Vec<BlockBuilder>,

    /// Initialized by [ProjectStep], guaranteed to be populated after that
    pub projector: Option<ObliqueProjector>,

    /// Initialized by [MirrorStep], guaranteed to be populated after that
    pub region: Option<MirrorRegion>,
}

impl<'a> GraphBuilder<'a> {
    pub fn new(
        camera: Camera,
        mirror: &'a MirrorPlane,
        blocks: &[Block],
    ) -> Self {
        Self {
            camera,
            mirror,
            blocks: blocks.iter().map(BlockBuilder::new).collect(),
            projector: None,
            region: None,
        }
    }

    /// Get the projector for this rebuild. Returns an error if the projection
    /// step hasn't run yet.
    pub fn projector(&self) -> anyhow::Result<&ObliqueProjector> {
        self.projector
            .as_ref()
            .ok_or_else(|| anyhow!("projector not initialized"))
    }

    /// Get the mirror region for this rebuild. Returns an error if the mirror
    /// step hasn't run yet.
    pub fn region(&self) -> anyhow::Result<MirrorRegion> {
        self.region
            .ok_or_else(|| anyhow!("mirror region not initialized"))
    }

    /// Run every rebuild step, then connect the finished blocks into a graph.
    /// Also hands back the mirror region that was used.
    pub fn build_graph(
        mut self,
    ) -> anyhow::Result<(BlockGraph, MirrorRegion)> {
        // The order is very important!
        self.apply_step(ProjectStep)?;
        self.apply_step(MirrorStep)?;
        self.apply_step(DepthStep)?;

        let region = self.region()?;
        let blocks = self
            .blocks
            .into_iter()
            .map(BlockBuilder::build)
            .collect::<anyhow::Result<Vec<_>>>()?;
        let graph = timed!("ConnectStep", BlockGraph::connect(blocks));
        Ok((graph, region))
    }

    /// A helper to run a rebuild step on this builder.
    fn apply_step(
        &mut self,
        step: impl Debug + RebuildStep,
    ) -> anyhow::Result<()> {
        timed!(&format!("{:?}", step), step.apply(self))
            .with_context(|| format!("error in {:?}", step))
    }
}

/// One stage of a rebuild. Each step reads what earlier steps put on the
/// builder and adds its own data. A step can never add, remove or reorder
/// blocks.
trait RebuildStep {
    fn apply(&self, builder: &mut GraphBuilder) -> anyhow::Result<()>;
}

/// Picks the origin block and projects every block onto the oblique grid
#[derive(Copy, Clone, Debug)]
struct ProjectStep;

impl RebuildStep for ProjectStep {
    fn apply(&self, builder: &mut GraphBuilder) -> anyhow::Result<()> {
        // Any block works as the origin, but prefer one in front of the mirror
        let origin = unwrap_or_bail!(
            builder
                .blocks
                .iter()
                .find(|block| block.category == Category::BeforeMirror)
                .or_else(|| builder.blocks.first()),
            "no blocks to pick an origin from ({} blocks)",
            builder.blocks.len()
        );
        debug!(
            "Origin block {} with upper center {}",
            origin.id, origin.upper_center
        );

        let camera = builder.camera;
        let projector = ObliqueProjector::new(camera, origin.upper_center)
            .with_context(|| {
                format!("invalid view matrix {}", camera.view_matrix())
            })?;
        for block in &mut builder.blocks {
            block.set_projection(projector.project(&block.upper_center));
        }
        builder.projector = Some(projector);
        Ok(())
    }
}

/// Finds the mirror's window and assigns each block the triangles it shows
/// through (or around) it
#[derive(Copy, Clone, Debug)]
struct MirrorStep;

impl RebuildStep for MirrorStep {
    fn apply(&self, builder: &mut GraphBuilder) -> anyhow::Result<()> {
        let region =
            MirrorRegion::from_plane(builder.mirror, builder.projector()?);
        for block in &mut builder.blocks {
            let cell = block.projection()?.cell;
            block.set_assigned(cull::assign_shapes(
                block.category,
                cell,
                &region,
            ));
        }
        builder.region = Some(region);
        Ok(())
    }
}

/// Hides upper triangles that are covered by something closer to the camera
#[derive(Copy, Clone, Debug)]
struct DepthStep;

impl RebuildStep for DepthStep {
    fn apply(&self, builder: &mut GraphBuilder) -> anyhow::Result<()> {
        let snapshot = builder
            .blocks
            .iter()
            .map(|block| {
                let projection = block.projection()?;
                Ok(ShapeSnapshot {
                    cell: projection.cell,
                    depth: projection.depth,
                    assigned: block.assigned()?,
                })
            })
            .collect::<anyhow::Result<Vec<_>>>()?;

        let resolved = cull::resolve_depth(&snapshot);
        for (block, shapes) in builder.blocks.iter_mut().zip(resolved) {
            block.set_shapes(shapes);
        }
        Ok(())
    }
}

/// A partially built [ProjectedBlock]. This should only be used during a
/// rebuild. Since the fields may not be defined yet, the getters all return
/// results that error if the field hasn't been set. This makes it easy to
/// catch steps that run out of order.
#[derive(Clone, Debug)]
pub struct BlockBuilder {
    id: BlockId,
    category: Category,
    upper_center: Point3<f64>,
    projection: Option<Projection>,
    assigned: Option<ProjectedShapes>,
    shapes: Option<ProjectedShapes>,
}

impl BlockBuilder {
    pub fn new(block: &Block) -> Self {
        Self {
            id: block.id(),
            category: block.category(),
            upper_center: block.upper_center(),
            projection: None,
            assigned: None,
            shapes: None,
        }
    }

    /// Finalize this builder into a [ProjectedBlock]. Returns an error if any
    /// step was skipped.
    pub fn build(self) -> anyhow::Result<ProjectedBlock> {
        let projection = self.projection()?;
        Ok(ProjectedBlock {
            cell: projection.cell,
            depth: projection.depth,
            assigned: self.assigned()?,
            shapes: self.shapes()?,
        })
    }

    /// Returns an error if the block hasn't been projected
    pub fn projection(&self) -> anyhow::Result<Projection> {
        self.projection.ok_or_else(|| {
            anyhow!("projection not initialized for {}", self.id)
        })
    }

    pub fn set_projection(&mut self, projection: Projection) {
        self.projection = Some(projection);
    }

    /// Returns an error if shapes haven't been assigned
    pub fn assigned(&self) -> anyhow::Result<ProjectedShapes> {
        self.assigned.ok_or_else(|| {
            anyhow!("assigned shapes not initialized for {}", self.id)
        })
    }

    pub fn set_assigned(&mut self, assigned: ProjectedShapes) {
        self.assigned = Some(assigned);
    }

    /// Returns an error if depth hasn't been resolved
    pub fn shapes(&self) -> anyhow::Result<ProjectedShapes> {
        self.shapes.ok_or_else(|| {
            anyhow!("resolved shapes not initialized for {}", self.id)
        })
    }

    pub fn set_shapes(&mut self, shapes: ProjectedShapes) {
        self.shapes = Some(shapes);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Vector3;

    fn camera() -> Camera {
        Camera::look_at(
            Point3::new(10.0, 10.0, -10.0),
            Point3::origin(),
            Vector3::y(),
        )
    }

    fn mirror() -> MirrorPlane {
        MirrorPlane {
            width: 7,
            height: 12,
            position: Point3::new(4.5, 6.5, -0.5),
            move_min_x: 3.0,
            move_max_x: 7.0,
            move_speed: 0.05,
        }
    }

    fn block(
        index: usize,
        category: Category,
        x: f64,
        y: f64,
        z: f64,
    ) -> Block {
        Block::new(
            BlockId::new(index),
            format!("block{}", index),
            category,
            Point3::new(x, y, z),
        )
    }

    #[test]
    fn test_steps_out_of_order() {
        let mirror = mirror();
        let blocks = [block(0, Category::BeforeMirror, 0.0, 0.0, 0.0)];
        let mut builder = GraphBuilder::new(camera(), &mirror, &blocks);
        assert!(builder.projector().is_err());
        assert!(builder.apply_step(MirrorStep).is_err());
        assert!(builder.apply_step(DepthStep).is_err());
        assert!(builder.blocks[0].clone().build().is_err());
    }

    #[test]
    fn test_origin_prefers_before_mirror() {
        let mirror = mirror();
        let blocks = [
            block(0, Category::InMirror, 3.0, 0.0, 0.0),
            block(1, Category::BeforeMirror, 1.0, 0.0, 0.0),
        ];
        let mut builder = GraphBuilder::new(camera(), &mirror, &blocks);
        builder.apply_step(ProjectStep).unwrap();
        let origin = builder.blocks[1].projection().unwrap();
        assert_eq!(origin.cell.x, 0);
        assert_eq!(origin.cell.y, 0);
        assert_eq!(builder.blocks[0].projection().unwrap().cell.x, 2);

        // Falls back to the first block of any kind
        let blocks = [
            block(0, Category::BehindMirror, 3.0, 0.0, 0.0),
            block(1, Category::InMirror, 1.0, 0.0, 0.0),
        ];
        let mut builder = GraphBuilder::new(camera(), &mirror, &blocks);
        builder.apply_step(ProjectStep).unwrap();
        assert_eq!(builder.blocks[1].projection().unwrap().cell.x, -2);
    }

    #[test]
    fn test_degenerate_camera_fails() {
        let mirror = mirror();
        let blocks = [block(0, Category::BeforeMirror, 0.0, 0.0, 0.0)];
        let camera = Camera::look_at(
            Point3::new(0.0, 0.0, 10.0),
            Point3::origin(),
            Vector3::y(),
        );
        let builder = GraphBuilder::new(camera, &mirror, &blocks);
        let err = builder.build_graph().unwrap_err();
        assert!(err
            .downcast_ref::<crate::board::projection::DegenerateProjection>()
            .is_some());
    }

    #[test]
    fn test_full_build() {
        let mirror = mirror();
        let blocks = [
            block(0, Category::BeforeMirror, 0.0, 0.0, 0.0),
            block(1, Category::BeforeMirror, 1.0, 0.0, 0.0),
            block(2, Category::BeforeMirror, 0.0, 0.0, 1.0),
        ];
        let builder = GraphBuilder::new(camera(), &mirror, &blocks);
        let (graph, _) = builder.build_graph().unwrap();
        assert_eq!(graph.blocks().len(), 3);
        assert!(graph.blocks().iter().all(ProjectedBlock::is_walkable));
        assert_eq!(graph.edge_count(), 4);
    }
}
