//! Rigid transform reported for a coordinate frame

use glam::{Mat4, Quat, Vec3};
use serde::{Deserialize, Serialize};

use super::{Pose, Quaternion, Vector3};

/// Frame transform (geometry_msgs/Transform layout)
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    #[serde(default)]
    pub translation: Vector3,
    #[serde(default)]
    pub rotation: Quaternion,
}

impl Transform {
    pub const IDENTITY: Self = Self {
        translation: Vector3 {
            x: 0.0,
            y: 0.0,
            z: 0.0,
        },
        rotation: Quaternion::IDENTITY,
    };

    pub fn new(translation: Vector3, rotation: Quaternion) -> Self {
        Self {
            translation,
            rotation,
        }
    }

    pub fn from_translation(v: Vec3) -> Self {
        Self::new(v.into(), Quaternion::IDENTITY)
    }

    pub fn to_mat4(&self) -> Mat4 {
        Mat4::from_rotation_translation(self.rotation.to_quat(), self.translation.to_vec3())
    }

    /// Express `pose` (given in this transform's child frame) in the parent frame
    pub fn apply(&self, pose: &Pose) -> Pose {
        let rotation: Quat = self.rotation.to_quat();
        let position: Vec3 = rotation * pose.translation() + self.translation.to_vec3();
        Pose::new(position.into(), (rotation * pose.rotation()).into())
    }
}
