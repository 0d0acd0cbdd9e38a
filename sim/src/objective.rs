use crate::Vec3;

/// Base cost shared by every algorithm: distance to the hidden target,
/// capped at the vision distance. Lower is better.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Objective {
    pub target: Vec3,
    pub vision_distance: f64,
}

impl Objective {
    pub fn new(target: Vec3, vision_distance: f64) -> Self {
        Self {
            target,
            vision_distance,
        }
    }

    pub fn evaluate(&self, pos: Vec3) -> f64 {
        (self.target - pos).length().min(self.vision_distance)
    }
}
