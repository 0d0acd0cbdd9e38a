use crate::Vec3;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Axis-aligned cuboid centred on the origin.
///
/// `size` holds the side lengths, so valid positions satisfy
/// `|p.axis| <= size.axis / 2` on every axis.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Playfield {
    pub size: Vec3,
}

impl Playfield {
    pub fn new(size: Vec3) -> Self {
        Self { size }
    }

    /// Cube with the given side length
    pub fn cube(side: f64) -> Self {
        Self::new(Vec3::splat(side))
    }

    pub fn half_extent(&self) -> Vec3 {
        self.size / 2.0
    }

    pub fn is_cube(&self) -> bool {
        self.size.x == self.size.y && self.size.x == self.size.z
    }

    /// Side length when the playfield is a cube
    pub fn side_length(&self) -> Option<f64> {
        self.is_cube().then_some(self.size.x)
    }

    pub fn contains(&self, pos: Vec3) -> bool {
        let half = self.half_extent();
        pos.x.abs() <= half.x && pos.y.abs() <= half.y && pos.z.abs() <= half.z
    }

    /// Clamp a position into the playfield. NaN components pass through.
    pub fn clamp(&self, pos: Vec3) -> Vec3 {
        let half = self.half_extent();
        Vec3::new(
            pos.x.clamp(-half.x, half.x),
            pos.y.clamp(-half.y, half.y),
            pos.z.clamp(-half.z, half.z),
        )
    }

    /// Uniformly random position anywhere inside the playfield
    pub fn random_point<R: Rng + ?Sized>(&self, rng: &mut R) -> Vec3 {
        let half = self.half_extent();
        Vec3::new(
            rng.gen_range(-half.x..=half.x),
            rng.gen_range(-half.y..=half.y),
            rng.gen_range(-half.z..=half.z),
        )
    }
}

/// Move from `current` toward `candidate`, travelling at most `max_step`.
///
/// Snaps onto the candidate when it is within reach, otherwise moves exactly
/// `max_step` along the straight line.
pub fn move_towards(current: Vec3, candidate: Vec3, max_step: f64) -> Vec3 {
    let delta = candidate - current;
    let distance = delta.length();
    if distance <= max_step {
        candidate
    } else {
        current + delta * (max_step / distance)
    }
}
