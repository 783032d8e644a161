use nalgebra::{Point3, Vector3};
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use crate::board::{mirror::MirrorPlane, projection::Camera, Category};

/// A 3D point or direction in config. The derive for [Validate] only accepts
/// named types on fields, so arrays go through this alias.
pub type Vec3 = [f64; 3];

/// Configuration that defines a puzzle: the camera, the mirror, every block,
/// and the controllers that move blocks around. Blocks are referred to by name
/// everywhere outside of [Self::blocks]. Names are resolved when the puzzle is
/// created, see [crate::Puzzle::new].
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct PuzzleConfig {
    /// Where the board is viewed from
    pub camera: CameraConfig,

    /// The mirror, including how it can be dragged
    #[validate]
    pub mirror: MirrorConfig,

    /// Every block on the board. Order matters: the first block in front of
    /// the mirror becomes the origin of the oblique grid.
    #[validate(custom = "validate_blocks")]
    pub blocks: Vec<BlockConfig>,

    /// Groups of blocks that slide together when dragged
    #[validate(custom = "validate_movables")]
    pub movables: Vec<MovableConfig>,

    /// Groups of blocks that rotate together when clicked
    #[validate(custom = "validate_rotatables")]
    pub rotatables: Vec<RotatableConfig>,

    /// The walker, if this puzzle has one
    pub player: Option<PlayerConfig>,
}

/// A camera that looks from `eye` towards `target`. The default is a true
/// isometric view.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    pub eye: Vec3,
    pub target: Vec3,
    pub up: Vec3,
}

impl CameraConfig {
    pub fn to_camera(&self) -> Camera {
        Camera::look_at(
            Point3::from(self.eye),
            Point3::from(self.target),
            Vector3::from(self.up),
        )
    }
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            eye: [10.0, 10.0, -10.0],
            target: [0.0, 0.0, 0.0],
            up: [0.0, 1.0, 0.0],
        }
    }
}

/// Config for the mirror. See [MirrorPlane] for what these fields mean.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
#[validate(schema(function = "validate_mirror_bounds"))]
pub struct MirrorConfig {
    /// Set to false for a puzzle with no mirror at all. With no mirror, the
    /// walk graph is always empty.
    pub enabled: bool,

    #[validate(range(min = 1))]
    pub width: u32,

    #[validate(range(min = 1))]
    pub height: u32,

    pub position: Vec3,

    pub move_min_x: f64,

    pub move_max_x: f64,

    #[validate(range(min = 0.0))]
    pub move_speed: f64,
}

impl MirrorConfig {
    /// Get the mirror described by this config, if it's enabled
    pub fn to_plane(&self) -> Option<MirrorPlane> {
        if self.enabled {
            Some(MirrorPlane {
                width: self.width,
                height: self.height,
                position: Point3::from(self.position),
                move_min_x: self.move_min_x,
                move_max_x: self.move_max_x,
                move_speed: self.move_speed,
            })
        } else {
            None
        }
    }
}

impl Default for MirrorConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            width: 7,
            height: 12,
            position: [4.5, 6.5, -0.5],
            move_min_x: 3.0,
            move_max_x: 7.0,
            move_speed: 0.05,
        }
    }
}

fn validate_mirror_bounds(mirror: &MirrorConfig) -> Result<(), ValidationError> {
    if mirror.move_min_x <= mirror.move_max_x {
        Ok(())
    } else {
        Err(ValidationError::new("move_min_x_above_move_max_x"))
    }
}

/// One block on the board
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BlockConfig {
    /// Unique name for the block, used to refer to it from other config
    pub name: String,
    pub category: Category,
    /// World position of the block's center
    pub position: Vec3,
}

fn validate_blocks(blocks: &[BlockConfig]) -> Result<(), ValidationError> {
    if blocks.iter().any(|block| block.name.is_empty()) {
        return Err(ValidationError::new("empty_block_name"));
    }
    for (i, block) in blocks.iter().enumerate() {
        if blocks[..i].iter().any(|other| other.name == block.name) {
            return Err(ValidationError::new("duplicate_block_name"));
        }
    }
    Ok(())
}

/// A group of blocks that slide together. Dragging a group moves it
/// diagonally along world X and Z, and moves its mirrored group along X and
/// *against* Z.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, Validate)]
pub struct MovableConfig {
    #[validate(length(min = 1))]
    pub blocks: Vec<MovableBlockConfig>,

    /// Index (in [PuzzleConfig::movables]) of the group that moves along with
    /// this one. Pairs must point at each other.
    pub mirrored: usize,

    /// A passive group doesn't respond to the pointer. It only moves when its
    /// mirrored group does.
    #[serde(default)]
    pub passive: bool,

    /// World units moved per drag step
    #[serde(default = "default_move_speed")]
    #[validate(range(min = 0.0))]
    pub move_speed: f64,
}

fn default_move_speed() -> f64 {
    0.05
}

/// One block in a movable group, and how far it can move
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MovableBlockConfig {
    /// Name of the block
    pub block: String,
    pub move_x_min: i32,
    pub move_x_max: i32,
    pub move_z_min: i32,
    pub move_z_max: i32,
}

fn validate_movables(
    movables: &[MovableConfig],
) -> Result<(), ValidationError> {
    for movable in movables {
        if movable.validate().is_err() {
            return Err(ValidationError::new("invalid_movable"));
        }
        let inverted = movable.blocks.iter().any(|block| {
            block.move_x_min > block.move_x_max
                || block.move_z_min > block.move_z_max
        });
        if inverted {
            return Err(ValidationError::new("inverted_move_range"));
        }
    }
    Ok(())
}

/// A group of blocks that rotates 90° around a pivot when clicked. The
/// mirrored group rotates the opposite way around its own pivot.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, Validate)]
pub struct RotatableConfig {
    /// Names of the blocks that rotate
    #[validate(length(min = 1))]
    pub blocks: Vec<String>,

    /// Name of the block to rotate around. Doesn't need to be one of the
    /// rotating blocks.
    pub pivot: String,

    /// Axis to rotate around. Defaults to world -X.
    #[serde(default = "default_axis")]
    pub axis: Vec3,

    /// Index (in [PuzzleConfig::rotatables]) of the group that rotates along
    /// with this one. Pairs must point at each other.
    pub mirrored: usize,

    /// A passive group doesn't respond to the pointer
    #[serde(default)]
    pub passive: bool,
}

fn default_axis() -> Vec3 {
    [-1.0, 0.0, 0.0]
}

fn validate_rotatables(
    rotatables: &[RotatableConfig],
) -> Result<(), ValidationError> {
    for rotatable in rotatables {
        if rotatable.validate().is_err() {
            return Err(ValidationError::new("invalid_rotatable"));
        }
        if Vector3::from(rotatable.axis).norm() == 0.0 {
            return Err(ValidationError::new("zero_rotation_axis"));
        }
    }
    Ok(())
}

/// The walker and where it needs to go
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PlayerConfig {
    /// Name of the block the player starts on
    pub start: String,
    /// Names of the blocks to walk to, in order
    pub goals: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert!(PuzzleConfig::default().validate().is_ok());
        let plane = MirrorConfig::default().to_plane().unwrap();
        assert_eq!(plane.width, 7);
        assert_eq!(plane.height, 12);

        let disabled = MirrorConfig {
            enabled: false,
            ..Default::default()
        };
        assert_eq!(disabled.to_plane(), None);
    }

    #[test]
    fn test_duplicate_names() {
        let block = BlockConfig {
            name: "a".into(),
            category: Category::BeforeMirror,
            position: [0.0, 0.0, 0.0],
        };
        let config = PuzzleConfig {
            blocks: vec![block.clone(), block],
            ..Default::default()
        };
        let errors = config.validate().unwrap_err();
        assert!(errors.errors().contains_key("blocks"));
    }

    #[test]
    fn test_inverted_ranges() {
        let config = PuzzleConfig {
            mirror: MirrorConfig {
                move_min_x: 5.0,
                move_max_x: 4.0,
                ..Default::default()
            },
            movables: vec![MovableConfig {
                blocks: vec![MovableBlockConfig {
                    block: "a".into(),
                    move_x_min: 3,
                    move_x_max: 1,
                    move_z_min: 0,
                    move_z_max: 0,
                }],
                mirrored: 0,
                passive: false,
                move_speed: 0.05,
            }],
            ..Default::default()
        };
        let errors = config.validate().unwrap_err();
        let mut fields: Vec<&str> = errors.errors().keys().copied().collect();
        fields.sort_unstable();
        assert_eq!(fields, vec!["mirror", "movables"]);
    }
    #[test]
    fn test_vector_fields() {
        let mirror: MirrorConfig = serde_json::from_str(
            r#"{"width": 5, "height": 8, "position": [3.5, 4.5, -0.5]}"#,
        )
        .unwrap();
        assert!(mirror.validate().is_ok());
        assert_eq!(
            mirror.to_plane().unwrap().position,
            Point3::new(3.5, 4.5, -0.5)
        );

        let rotatable: RotatableConfig = serde_json::from_str(
            r#"{"blocks": ["a"], "pivot": "p", "mirrored": 1}"#,
        )
        .unwrap();
        assert!(rotatable.validate().is_ok());
        assert_eq!(rotatable.axis, [-1.0, 0.0, 0.0]);
    }
}
