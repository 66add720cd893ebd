//! Conversions from the pose engine's axis conventions into the world frame.
//!
//! Engine positions are millimetres with X and Y pointing the opposite way
//! to the (right-handed, metric) camera frame used by callers. Rotations are
//! reported in two further conventions: the skeleton root orientation needs
//! an inversion plus a `diag(1, -1, -1)` axis flip, while per-joint local
//! rotations differ from the world convention on their X and Z axes.

use nalgebra::{
    Isometry3, Matrix3, Matrix4, Point3, Rotation3, RowVector4, Translation3, UnitQuaternion,
    Vector3,
};

/// Millimetres per metre.
pub const ENGINE_UNITS_PER_METRE: f64 = 1000.0;

/// Absolute tolerance used when checking that a matrix is a rotation.
pub const RIGID_TOLERANCE: f64 = 1e-6;

/// Largest `|M^T M - I|` entry accepted for an engine-reported rotation.
///
/// Engine matrices are only approximately orthonormal (single precision,
/// rounded recordings); within this bound they are projected onto the
/// nearest rotation instead of being rejected.
pub const ENGINE_ROTATION_TOLERANCE: f64 = 1e-2;

/// Axis flip between the engine's root-orientation convention and the
/// camera frame: `diag(1, -1, -1)`, a half-turn about X.
#[inline]
pub fn root_axis_flip() -> Rotation3<f64> {
    Rotation3::from_matrix_unchecked(Matrix3::from_diagonal(&Vector3::new(1.0, -1.0, -1.0)))
}

/// Half-turn about Y, `diag(-1, 1, -1)`, relating local-rotation conventions.
#[inline]
fn local_axis_flip() -> Rotation3<f64> {
    Rotation3::from_matrix_unchecked(Matrix3::from_diagonal(&Vector3::new(-1.0, 1.0, -1.0)))
}

/// Errors for matrices that are not the rigid transforms they claim to be.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq)]
pub enum ConventionError {
    #[error("matrix contains non-finite entries")]
    NonFinite,
    #[error("bottom row of a rigid transform must be [0, 0, 0, 1]")]
    NotHomogeneous,
    #[error("rotation block is not orthonormal (max deviation {deviation:e})")]
    NotOrthonormal { deviation: f64 },
    #[error("rotation block is a reflection (det = {det})")]
    Reflection { det: f64 },
}

/// Convert an engine joint position (mm, engine axes) into camera-frame metres.
#[inline]
pub fn engine_to_camera(p_mm: &Vector3<f64>) -> Point3<f64> {
    Point3::new(
        -p_mm.x / ENGINE_UNITS_PER_METRE,
        -p_mm.y / ENGINE_UNITS_PER_METRE,
        p_mm.z / ENGINE_UNITS_PER_METRE,
    )
}

/// Convert an engine joint position into the world frame.
#[inline]
pub fn engine_position_to_world(
    p_mm: &Vector3<f64>,
    world_from_camera: &Isometry3<f64>,
) -> Point3<f64> {
    world_from_camera * engine_to_camera(p_mm)
}

/// Convert the engine's skeleton-root rotation into a camera-frame rotation:
/// `F * R^-1` with `F = diag(1, -1, -1)`.
#[inline]
pub fn engine_root_rotation_to_camera(r: &Rotation3<f64>) -> Rotation3<f64> {
    root_axis_flip() * r.inverse()
}

/// Inverse of [`engine_root_rotation_to_camera`]: `(F * W)^-1`.
#[inline]
pub fn camera_root_rotation_to_engine(w: &Rotation3<f64>) -> Rotation3<f64> {
    (root_axis_flip() * w).inverse()
}

/// Convert an engine per-joint local rotation into the world convention.
///
/// Negating the X and Z components of the rotation vector of `R` is the same
/// as conjugating `R` by `D = diag(-1, 1, -1)`. The conjugation stays well
/// defined at a rotation angle of pi, where axis extraction is ambiguous.
#[inline]
pub fn engine_local_rotation_to_world(r: &Rotation3<f64>) -> Rotation3<f64> {
    let d = local_axis_flip();
    d * r * d
}

fn check_rotation_block(m: &Matrix3<f64>, tolerance: f64) -> Result<(), ConventionError> {
    if m.iter().any(|v| !v.is_finite()) {
        return Err(ConventionError::NonFinite);
    }
    let deviation = (m.transpose() * m - Matrix3::identity()).amax();
    if deviation > tolerance {
        return Err(ConventionError::NotOrthonormal { deviation });
    }
    let det = m.determinant();
    if det < 0.0 {
        return Err(ConventionError::Reflection { det });
    }
    Ok(())
}

/// Check that `m` is a proper rotation matrix within [`RIGID_TOLERANCE`].
pub fn rotation_from_matrix(m: &Matrix3<f64>) -> Result<Rotation3<f64>, ConventionError> {
    check_rotation_block(m, RIGID_TOLERANCE)?;
    Ok(Rotation3::from_matrix_unchecked(*m))
}

/// Accept an engine-reported 3x3 matrix and project it onto the nearest
/// proper rotation.
///
/// Matrices further than [`ENGINE_ROTATION_TOLERANCE`] from orthonormal,
/// reflections and non-finite matrices are rejected.
pub fn engine_rotation(m: &Matrix3<f64>) -> Result<Rotation3<f64>, ConventionError> {
    check_rotation_block(m, ENGINE_ROTATION_TOLERANCE)?;
    // Seed with the normalised quaternion of `m` so half-turns converge too.
    let seed = UnitQuaternion::from_rotation_matrix(&Rotation3::from_matrix_unchecked(*m));
    let guess = UnitQuaternion::from_quaternion(*seed.quaternion()).to_rotation_matrix();
    Ok(Rotation3::from_matrix_eps(m, 1.0e-12, 100, guess))
}

/// Validate a homogeneous 4x4 transform and turn it into an isometry.
pub fn rigid_from_matrix(m: &Matrix4<f64>) -> Result<Isometry3<f64>, ConventionError> {
    if m.iter().any(|v| !v.is_finite()) {
        return Err(ConventionError::NonFinite);
    }
    let bottom = m.fixed_view::<1, 4>(3, 0).into_owned();
    if (bottom - RowVector4::new(0.0, 0.0, 0.0, 1.0)).amax() > RIGID_TOLERANCE {
        return Err(ConventionError::NotHomogeneous);
    }
    let rotation = rotation_from_matrix(&m.fixed_view::<3, 3>(0, 0).into_owned())?;
    let translation = Translation3::from(m.fixed_view::<3, 1>(0, 3).into_owned());
    Ok(Isometry3::from_parts(
        translation,
        UnitQuaternion::from_rotation_matrix(&rotation),
    ))
}
