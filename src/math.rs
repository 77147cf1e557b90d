//! Linear algebra helpers on top of glam.

pub use glam::{EulerRot, Mat4, Quat, Vec3};
use serde::{Deserialize, Serialize};
use std::f32::consts::{PI, TAU};

/// Euler rotation order of a joint.
///
/// Names follow the order in which the intrinsic rotations are applied, so
/// `XYZ` composes as `Rx * Ry * Rz`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum EulerOrder {
    #[default]
    XYZ,
    XZY,
    YXZ,
    YZX,
    ZXY,
    ZYX,
}

impl EulerOrder {
    pub const ALL: [EulerOrder; 6] = [
        EulerOrder::XYZ,
        EulerOrder::XZY,
        EulerOrder::YXZ,
        EulerOrder::YZX,
        EulerOrder::ZXY,
        EulerOrder::ZYX,
    ];

    #[inline]
    pub const fn to_glam(self) -> EulerRot {
        match self {
            EulerOrder::XYZ => EulerRot::XYZ,
            EulerOrder::XZY => EulerRot::XZY,
            EulerOrder::YXZ => EulerRot::YXZ,
            EulerOrder::YZX => EulerRot::YZX,
            EulerOrder::ZXY => EulerRot::ZXY,
            EulerOrder::ZYX => EulerRot::ZYX,
        }
    }

    /// Axis index (0 = x, 1 = y, 2 = z) of each slot in the order
    #[inline]
    pub const fn axes(self) -> [usize; 3] {
        match self {
            EulerOrder::XYZ => [0, 1, 2],
            EulerOrder::XZY => [0, 2, 1],
            EulerOrder::YXZ => [1, 0, 2],
            EulerOrder::YZX => [1, 2, 0],
            EulerOrder::ZXY => [2, 0, 1],
            EulerOrder::ZYX => [2, 1, 0],
        }
    }

    /// Decompose a rotation into per-axis angles `[x, y, z]`.
    pub fn to_angles(self, q: Quat) -> Vec3 {
        let (a, b, c) = q.to_euler(self.to_glam());
        let mut out = [0.0; 3];
        let axes = self.axes();
        out[axes[0]] = a;
        out[axes[1]] = b;
        out[axes[2]] = c;
        Vec3::from_array(out)
    }

    /// Compose per-axis angles `[x, y, z]` back into a rotation.
    pub fn from_angles(self, angles: Vec3) -> Quat {
        let a = angles.to_array();
        let axes = self.axes();
        Quat::from_euler(self.to_glam(), a[axes[0]], a[axes[1]], a[axes[2]])
    }
}

/// Wrap an angle into `[-PI, PI]`.
#[inline]
pub fn normalize_angle(angle: f32) -> f32 {
    if (-PI..=PI).contains(&angle) {
        return angle;
    }
    (angle + PI).rem_euclid(TAU) - PI
}

/// Round to a fixed number of decimals and return the scaled integer,
/// which makes equality comparisons exact.
#[inline]
pub fn round_key(value: f32, decimals: i32) -> i64 {
    (f64::from(value) * 10f64.powi(decimals)).round() as i64
}

/// Component-wise comparison that treats `q` and `-q` as the same rotation
#[inline]
pub fn same_rotation(a: Quat, b: Quat, tolerance: f32) -> bool {
    a.abs_diff_eq(b, tolerance) || a.abs_diff_eq(-b, tolerance)
}
