use super::position::Position;
use nalgebra::{Rotation3, Unit, Vector3};
use rand::Rng;

/// A rigid rotation applied to positions about a pivot point.
///
/// Two-dimensional configurations rotate in the plane; three-dimensional
/// configurations rotate about an arbitrary axis. The rotation itself is a
/// pure value; applying it never mutates the pivot.
#[derive(Debug, Clone)]
pub enum RotationMatrix {
    /// In-plane rotation by an angle in radians.
    Planar { angle: f64 },
    /// Rotation about a unit axis by an angle in radians.
    Axial { rotation: Rotation3<f64> },
}

impl RotationMatrix {
    /// Builds a rotation from an axis and an angle in radians.
    ///
    /// The axis is ignored for two-dimensional rotations.
    ///
    /// # Arguments
    ///
    /// * `axis` - The rotation axis; must be three-dimensional and non-zero.
    /// * `angle` - The rotation angle in radians.
    pub fn from_axis_angle(axis: &Position, angle: f64) -> Self {
        debug_assert_eq!(axis.dimension(), 3);
        let axis = Vector3::new(axis.get(0), axis.get(1), axis.get(2));
        Self::Axial {
            rotation: Rotation3::from_axis_angle(&Unit::new_normalize(axis), angle),
        }
    }

    /// Builds an in-plane rotation for two-dimensional configurations.
    ///
    /// # Arguments
    ///
    /// * `angle` - The rotation angle in radians.
    pub fn planar(angle: f64) -> Self {
        Self::Planar { angle }
    }

    /// Samples a uniformly random rotation axis with an angle drawn from
    /// `[-max_angle, max_angle]`, matching the given spatial dimension.
    ///
    /// # Arguments
    ///
    /// * `dimension` - 2 or 3.
    /// * `max_angle` - The maximum rotation angle in radians.
    /// * `rng` - Random number source.
    pub fn random<R: Rng + ?Sized>(dimension: usize, max_angle: f64, rng: &mut R) -> Self {
        let angle = rng.gen_range(-max_angle..=max_angle);
        match dimension {
            2 => Self::planar(angle),
            3 => {
                let axis = random_unit_vector(rng);
                Self::from_axis_angle(&axis, angle)
            }
            _ => panic!("rotations support 2 or 3 dimensions, got {}", dimension),
        }
    }

    /// Rotates a position in place about a pivot point.
    ///
    /// # Arguments
    ///
    /// * `position` - The position to rotate.
    /// * `pivot` - The fixed point of the rotation.
    pub fn rotate(&self, position: &mut Position, pivot: &Position) {
        debug_assert_eq!(position.dimension(), pivot.dimension());
        match self {
            Self::Planar { angle } => {
                let (sin, cos) = angle.sin_cos();
                let dx = position.get(0) - pivot.get(0);
                let dy = position.get(1) - pivot.get(1);
                position.set(0, pivot.get(0) + cos * dx - sin * dy);
                position.set(1, pivot.get(1) + sin * dx + cos * dy);
            }
            Self::Axial { rotation } => {
                let rel = Vector3::new(
                    position.get(0) - pivot.get(0),
                    position.get(1) - pivot.get(1),
                    position.get(2) - pivot.get(2),
                );
                let rotated = rotation * rel;
                position.set(0, pivot.get(0) + rotated.x);
                position.set(1, pivot.get(1) + rotated.y);
                position.set(2, pivot.get(2) + rotated.z);
            }
        }
    }
}

/// Samples a uniformly distributed unit vector in 2 or 3 dimensions.
pub fn random_direction<R: Rng + ?Sized>(dimension: usize, rng: &mut R) -> Position {
    match dimension {
        2 => {
            let angle = rng.gen_range(0.0..std::f64::consts::TAU);
            Position::new(vec![angle.cos(), angle.sin()])
        }
        3 => random_unit_vector(rng),
        _ => panic!("directions support 2 or 3 dimensions, got {}", dimension),
    }
}

/// Samples a uniformly distributed three-dimensional unit vector.
///
/// Uses rejection sampling from the enclosing cube, which avoids any
/// distributional bias toward the cube corners.
pub fn random_unit_vector<R: Rng + ?Sized>(rng: &mut R) -> Position {
    loop {
        let candidate = Position::new(vec![
            rng.gen_range(-1.0..=1.0),
            rng.gen_range(-1.0..=1.0),
            rng.gen_range(-1.0..=1.0),
        ]);
        let sq = candidate.squared_norm();
        if sq > 1e-6 && sq <= 1.0 {
            let mut unit = candidate;
            unit.normalize();
            return unit;
        }
    }
}
