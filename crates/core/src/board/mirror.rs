//! The mirror, both as a thing in the world and as the region of the oblique
//! grid that it reflects.

use log::debug;
use nalgebra::{Point2, Point3};
use serde::Serialize;

use crate::{board::projection::ObliqueProjector, util};

/// The mirror as it exists in the world. The mirror is a flat rectangle that
/// can only slide along world X, between two bounds. The position is the
/// mirror's max corner, i.e. the corner that sits on the upper edge of the
/// window.
#[derive(Clone, Debug, PartialEq)]
pub struct MirrorPlane {
    /// Size of the window along the diagonal, in cells
    pub width: u32,
    /// Size of the window along the oblique y axis, in cells
    pub height: u32,
    /// World position of the max corner
    pub position: Point3<f64>,
    /// Lowest x the mirror can be dragged to
    pub move_min_x: f64,
    /// Highest x the mirror can be dragged to
    pub move_max_x: f64,
    /// World units moved per drag step
    pub move_speed: f64,
}

impl MirrorPlane {
    /// Move the mirror by one drag step, in the direction of the pointer delta.
    /// The mirror stays within its move bounds.
    pub fn drag(&mut self, delta_x: f64) {
        let x = self.position.x + self.move_speed * util::sign(delta_x);
        self.position.x = self.clamp_x(x);
    }

    /// Snap the mirror to the nearest half-integer x, where its edges line up
    /// with cell boundaries.
    pub fn snap(&mut self) {
        let x = util::round_to_int(self.position.x + 0.5) as f64 - 0.5;
        self.position.x = self.clamp_x(x);
    }

    fn clamp_x(&self, x: f64) -> f64 {
        x.max(self.move_min_x).min(self.move_max_x)
    }
}

/// The parallelogram of the oblique grid that shows the reflected scene. It's
/// bounded by two diagonal lines, where `x + y` is constant, and two
/// horizontal lines, where `y` is constant. The lines are stored as their
/// intercepts.
#[derive(Copy, Clone, Debug, PartialEq, Serialize)]
pub struct MirrorRegion {
    line_v_max: i32,
    line_h_max: f64,
    width: u32,
    height: u32,
}

impl MirrorRegion {
    /// Build the region for a mirror whose max corner lands on the given
    /// continuous oblique point.
    pub fn from_oblique(
        width: u32,
        height: u32,
        reference: Point2<f64>,
    ) -> Self {
        Self {
            line_v_max: util::round_to_int(reference.x + reference.y),
            line_h_max: util::round_to_int(reference.y + 0.5) as f64 - 0.5,
            width,
            height,
        }
    }

    /// Build the region for a mirror in the world, as seen through a projector
    pub fn from_plane(
        plane: &MirrorPlane,
        projector: &ObliqueProjector,
    ) -> Self {
        let reference = projector.to_oblique(&plane.position);
        let region = Self::from_oblique(plane.width, plane.height, reference);
        debug!(
            "Mirror at oblique ({:.3}, {:.3}): V [{}, {}], H [{}, {}]",
            reference.x,
            reference.y,
            region.line_v_min(),
            region.line_v_max(),
            region.line_h_min(),
            region.line_h_max(),
        );
        region
    }

    /// Intercept of the upper diagonal boundary
    pub fn line_v_max(&self) -> i32 {
        self.line_v_max
    }

    /// Intercept of the lower diagonal boundary
    pub fn line_v_min(&self) -> i32 {
        self.line_v_max - self.width as i32
    }

    /// Intercept of the upper horizontal boundary
    pub fn line_h_max(&self) -> f64 {
        self.line_h_max
    }

    /// Intercept of the lower horizontal boundary
    pub fn line_h_min(&self) -> f64 {
        self.line_h_max - self.height as f64
    }

    /// Is the oblique point inside the window? The horizontal bounds are
    /// inclusive, the diagonal bounds are exclusive.
    pub fn contains(&self, point: Point2<f64>) -> bool {
        if point.y < self.line_h_min() || point.y > self.line_h_max() {
            return false;
        }

        let diagonal = point.x + point.y;
        (diagonal - self.line_v_min() as f64)
            * (diagonal - self.line_v_max() as f64)
            < 0.0
    }
}
