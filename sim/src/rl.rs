//! Adapter between the engine and an external reinforcement-learning trainer.
//!
//! The trainer sees every learned defender as an opaque policy: it gets a
//! fixed-width observation vector each step and answers with an action
//! vector. Nothing here knows how the policy is trained.

use crate::Vec3;
use thiserror::Error;

/// Minimum number of floats in an action vector
pub const ACTION_WIDTH: usize = 5;

/// Upper bound for the model-specific part of an observation.
/// Shorter model observations are zero padded so that GWO and SMA
/// environments can share one trained policy.
pub const MAX_MODEL_OBSERVATIONS: usize = 13;

/// Number of nearest roster members included in an observation
pub const OBSERVED_NEIGHBORS: usize = 3;

/// Total observation width handed to the trainer
pub const OBSERVATION_WIDTH: usize = MAX_MODEL_OBSERVATIONS + 3 * OBSERVED_NEIGHBORS;

#[derive(Debug, Error, PartialEq)]
pub enum ActionError {
    #[error("action vector has {0} entries, expected at least {}", ACTION_WIDTH)]
    TooShort(usize),

    #[error("action entry {index} is not finite")]
    NotFinite { index: usize },

    #[error("no agent with id {0}")]
    UnknownAgent(u32),

    #[error("agent {0} is not driven by actions")]
    NotLearned(u32),
}

/// Decoded action vector.
///
/// Layout: `[move_x, move_y, move_z, fitness_offset, fitness_scale, ..]`,
/// each entry clamped into `[-1, 1]`. Extra entries are ignored.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RlAction {
    pub move_vector: Vec3,
    pub fitness_offset: f64,
    pub fitness_scale: f64,
}

impl RlAction {
    pub fn from_slice(values: &[f64]) -> Result<Self, ActionError> {
        if values.len() < ACTION_WIDTH {
            return Err(ActionError::TooShort(values.len()));
        }
        if let Some(index) = values[..ACTION_WIDTH].iter().position(|v| !v.is_finite()) {
            return Err(ActionError::NotFinite { index });
        }

        Ok(Self {
            move_vector: Vec3::new(values[0], values[1], values[2]).clamp_unit(),
            fitness_offset: values[3].clamp(-1.0, 1.0),
            fitness_scale: values[4].clamp(-1.0, 1.0),
        })
    }
}

/// Build the full observation vector.
///
/// # Panics
///
/// Panics if `model_observations` is longer than [`MAX_MODEL_OBSERVATIONS`];
/// that means a model and the shared policy layout disagree.
pub fn assemble_observation(model_observations: Vec<f64>, neighbors: &[Vec3]) -> Vec<f64> {
    assert!(
        model_observations.len() <= MAX_MODEL_OBSERVATIONS,
        "model returned {} observations but at most {} fit the policy layout",
        model_observations.len(),
        MAX_MODEL_OBSERVATIONS
    );

    let mut obs = model_observations;
    obs.resize(MAX_MODEL_OBSERVATIONS, 0.0);

    for slot in 0..OBSERVED_NEIGHBORS {
        let rel = neighbors.get(slot).copied().unwrap_or(Vec3::ZERO);
        obs.extend_from_slice(&<[f64; 3]>::from(rel));
    }

    obs
}
