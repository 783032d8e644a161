//! Mapping world positions onto the oblique grid. See [crate::board::cell] for
//! a description of the oblique coordinate system.

use derive_more::Display;
use nalgebra::{Isometry3, Matrix2, Matrix4, Point2, Point3, Vector3};
use std::error::Error;

use crate::{board::cell::CellPoint, unwrap_or_bail};

/// The camera that the board is viewed through. All we need from it is the
/// world-to-view transform. View space follows the usual right-handed
/// convention: the camera looks down `-z`, so points closer to the camera have
/// a *larger* view-space `z`.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Camera {
    view: Matrix4<f64>,
}

impl Camera {
    /// Build a camera that sits at `eye` and looks towards `target`
    pub fn look_at(
        eye: Point3<f64>,
        target: Point3<f64>,
        up: Vector3<f64>,
    ) -> Self {
        Self {
            view: Isometry3::look_at_rh(&eye, &target, &up).to_homogeneous(),
        }
    }

    /// The world-to-view transform
    pub fn view_matrix(&self) -> &Matrix4<f64> {
        &self.view
    }

    /// Transform a world point into view space
    pub fn to_view_point(&self, point: &Point3<f64>) -> Point3<f64> {
        self.view.transform_point(point)
    }

    /// Transform a world direction into view space (ignores translation)
    pub fn to_view_vector(&self, vector: &Vector3<f64>) -> Vector3<f64> {
        self.view.transform_vector(vector)
    }
}

/// The camera looks (almost) exactly along a world axis, so world X and Z
/// show up as parallel lines on screen and can't be used as a 2D basis.
#[derive(Copy, Clone, Debug, Display)]
#[display(
    fmt = "camera projects world X and Z onto parallel screen axes \
        (determinant {})",
    determinant
)]
pub struct DegenerateProjection {
    pub determinant: f64,
}

impl Error for DegenerateProjection {}

/// The result of projecting one world position onto the board
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Projection {
    /// The grid cell the position falls in
    pub cell: CellPoint,
    /// View-space `z` of the position. Larger means closer to the camera.
    pub depth: f64,
}

/// Maps world positions to oblique coordinates for one particular camera and
/// origin. This is a pure function of those two inputs plus the position
/// being projected, so a new projector is made for every rebuild.
#[derive(Copy, Clone, Debug)]
pub struct ObliqueProjector {
    camera: Camera,
    /// Screen position of the origin
    origin: Point2<f64>,
    /// Maps a screen-space offset to oblique coordinates. This is the inverse
    /// of the matrix whose columns are the screen projections of world X & Z.
    inverse_basis: Matrix2<f64>,
}

impl ObliqueProjector {
    /// Anything with a smaller absolute determinant than this is considered
    /// parallel
    const MIN_DETERMINANT: f64 = 1e-9;

    /// Create a projector that puts the given world position at the oblique
    /// origin. Fails with [DegenerateProjection] if the camera can't see the
    /// world X and Z axes as two distinct directions.
    pub fn new(camera: Camera, origin: Point3<f64>) -> anyhow::Result<Self> {
        let axis_x = camera.to_view_vector(&Vector3::x()).xy();
        let axis_z = camera.to_view_vector(&Vector3::z()).xy();

        let basis = Matrix2::new(axis_x.x, axis_z.x, axis_x.y, axis_z.y);
        let determinant = basis.determinant();
        // The NaN check catches broken cameras (e.g. eye == target)
        if !determinant.is_finite()
            || determinant.abs() < Self::MIN_DETERMINANT
        {
            return Err(DegenerateProjection { determinant }.into());
        }
        let inverse_basis = unwrap_or_bail!(
            basis.try_inverse(),
            "basis {} is not invertible",
            basis
        );

        Ok(Self {
            camera,
            origin: camera.to_view_point(&origin).xy(),
            inverse_basis,
        })
    }

    /// Get the continuous oblique coordinates of a world position
    pub fn to_oblique(&self, position: &Point3<f64>) -> Point2<f64> {
        let screen = self.camera.to_view_point(position).xy();
        Point2::from(self.inverse_basis * (screen - self.origin))
    }

    /// Project a world position onto the grid, getting its cell and depth
    pub fn project(&self, position: &Point3<f64>) -> Projection {
        Projection {
            cell: CellPoint::containing(self.to_oblique(position)),
            depth: self.camera.to_view_point(position).z,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    /// A true isometric camera. From this angle, world (1, 1, -1) points
    /// straight at the camera, so `(dx, dy, dz)` lands on oblique
    /// `(dx - dy, dz + dy)`.
    fn isometric() -> Camera {
        Camera::look_at(
            Point3::new(10.0, 10.0, -10.0),
            Point3::origin(),
            Vector3::y(),
        )
    }

    #[test]
    fn test_origin_maps_to_origin() {
        let origin = Point3::new(3.0, 1.5, -2.0);
        let projector = ObliqueProjector::new(isometric(), origin).unwrap();
        assert_eq!(projector.project(&origin).cell, CellPoint::ORIGIN);
        let oblique = projector.to_oblique(&origin);
        assert_approx_eq!(oblique.x, 0.0);
        assert_approx_eq!(oblique.y, 0.0);
    }

    #[test]
    fn test_axes() {
        let projector =
            ObliqueProjector::new(isometric(), Point3::origin()).unwrap();

        let x = projector.to_oblique(&Point3::new(1.0, 0.0, 0.0));
        assert_approx_eq!(x.x, 1.0);
        assert_approx_eq!(x.y, 0.0);

        let z = projector.to_oblique(&Point3::new(0.0, 0.0, 1.0));
        assert_approx_eq!(z.x, 0.0);
        assert_approx_eq!(z.y, 1.0);

        let y = projector.to_oblique(&Point3::new(0.0, 1.0, 0.0));
        assert_approx_eq!(y.x, -1.0);
        assert_approx_eq!(y.y, 1.0);

        assert_eq!(
            projector.project(&Point3::new(4.0, 1.0, 2.0)).cell,
            CellPoint::new(3, 3)
        );
    }

    #[test]
    fn test_stacked_along_view_ray() {
        let projector =
            ObliqueProjector::new(isometric(), Point3::origin()).unwrap();
        let far = projector.project(&Point3::new(0.0, 0.0, 0.0));
        let near = projector.project(&Point3::new(1.0, 1.0, -1.0));
        assert_eq!(far.cell, near.cell);
        assert!(near.depth > far.depth);
    }

    #[test]
    fn test_project_agrees_with_to_oblique() {
        let camera = isometric();
        let projector =
            ObliqueProjector::new(camera, Point3::new(0.0, 0.0, 1.0)).unwrap();
        for &(x, y, z) in &[(0.0, 0.0, 0.0), (2.3, -1.0, 4.7), (-3.0, 2.0, 5.0)]
        {
            let position = Point3::new(x, y, z);
            let projection = projector.project(&position);
            assert_eq!(
                projection.cell,
                CellPoint::containing(projector.to_oblique(&position))
            );
            assert_approx_eq!(
                projection.depth,
                camera.to_view_point(&position).z
            );
        }
    }

    #[test]
    fn test_projection_is_pure() {
        let projector =
            ObliqueProjector::new(isometric(), Point3::new(1.0, 0.5, 1.0))
                .unwrap();
        let position = Point3::new(-2.0, 3.5, 7.0);
        assert_eq!(projector.project(&position), projector.project(&position));

        let other =
            ObliqueProjector::new(isometric(), Point3::new(1.0, 0.5, 1.0))
                .unwrap();
        assert_eq!(projector.project(&position), other.project(&position));
    }

    #[test]
    fn test_degenerate_camera() {
        // Looking straight down the X axis, world X collapses to a point
        let camera = Camera::look_at(
            Point3::new(10.0, 0.0, 0.0),
            Point3::origin(),
            Vector3::y(),
        );
        let err = ObliqueProjector::new(camera, Point3::origin()).unwrap_err();
        assert!(err.downcast_ref::<DegenerateProjection>().is_some());

        // Camera with no direction at all
        let camera =
            Camera::look_at(Point3::origin(), Point3::origin(), Vector3::y());
        let err = ObliqueProjector::new(camera, Point3::origin()).unwrap_err();
        assert!(err.downcast_ref::<DegenerateProjection>().is_some());
    }
}
