use crate::EnvironmentType;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum ScenarioError {
    #[error("sweep axis `{0}` has no values")]
    EmptyAxis(&'static str),

    #[error("expected {expected} scenarios but generated {generated}")]
    CountMismatch { expected: usize, generated: usize },
}

/// How defenders driven by action vectors behave when no trainer is attached
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DefenderPolicy {
    /// Stand still and report the honest objective
    #[default]
    Passive,

    /// Uniformly random action vectors every step
    Random,
}

/// One concrete setting for a single environment instance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    pub environment_type: EnvironmentType,
    pub area_side_length: f64,
    pub max_agent_speed: f64,
    pub max_episode_length: u32,
    pub learned_defenders: u32,
    pub attackers: u32,
    pub target_hit_radius: f64,
    /// `f64::INFINITY` when vision is unlimited
    pub max_vision_distance: f64,
}

/// Parameter sweep description.
///
/// Every `possible_*` list is one axis; the sweep runs the full cartesian
/// product for both environment types, `runs_per_setting` times each.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SweepConfig {
    pub runs_per_setting: u32,
    pub parallel_envs: usize,
    pub possible_area_side_length: Vec<f64>,
    pub possible_max_agent_speed: Vec<f64>,
    pub possible_max_episode_length: Vec<u32>,
    pub possible_learned_defenders: Vec<u32>,
    pub possible_attackers: Vec<u32>,
    pub possible_target_hit_radius: Vec<f64>,
    /// `null` entries stand for unlimited vision
    pub possible_max_vision_distance: Vec<Option<f64>>,
    pub defender_policy: DefenderPolicy,
    pub output_dir: PathBuf,
    pub http_port: u16,
    pub seed: Option<u64>,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            runs_per_setting: 10,
            parallel_envs: 4,
            possible_area_side_length: vec![40.0],
            possible_max_agent_speed: vec![13.0],
            possible_max_episode_length: vec![2300],
            possible_learned_defenders: vec![0, 2],
            possible_attackers: vec![25],
            possible_target_hit_radius: vec![2.0],
            possible_max_vision_distance: vec![None, Some(10.0)],
            defender_policy: DefenderPolicy::Passive,
            output_dir: PathBuf::from("."),
            http_port: 8080,
            seed: None,
        }
    }
}

impl SweepConfig {
    /// Number of scenarios the sweep will generate
    pub fn total_scenarios(&self) -> usize {
        self.runs_per_setting as usize
            * self.possible_area_side_length.len()
            * self.possible_max_agent_speed.len()
            * self.possible_max_episode_length.len()
            * self.possible_learned_defenders.len()
            * self.possible_attackers.len()
            * self.possible_target_hit_radius.len()
            * self.possible_max_vision_distance.len()
            * EnvironmentType::ALL.len()
    }

    fn check_axes(&self) -> Result<(), ScenarioError> {
        let axes = [
            ("possible_area_side_length", self.possible_area_side_length.len()),
            ("possible_max_agent_speed", self.possible_max_agent_speed.len()),
            ("possible_max_episode_length", self.possible_max_episode_length.len()),
            ("possible_learned_defenders", self.possible_learned_defenders.len()),
            ("possible_attackers", self.possible_attackers.len()),
            ("possible_target_hit_radius", self.possible_target_hit_radius.len()),
            ("possible_max_vision_distance", self.possible_max_vision_distance.len()),
        ];
        for (name, len) in axes {
            if len == 0 {
                return Err(ScenarioError::EmptyAxis(name));
            }
        }
        Ok(())
    }

    /// Expand all axes into a shuffled work queue
    pub fn build_queue<R: Rng>(&self, rng: &mut R) -> Result<VecDeque<Scenario>, ScenarioError> {
        self.check_axes()?;

        let mut scenarios = Vec::with_capacity(self.total_scenarios());
        for _ in 0..self.runs_per_setting {
            for &area_side_length in &self.possible_area_side_length {
                for &max_agent_speed in &self.possible_max_agent_speed {
                    for &max_episode_length in &self.possible_max_episode_length {
                        for &learned_defenders in &self.possible_learned_defenders {
                            for &attackers in &self.possible_attackers {
                                for &target_hit_radius in &self.possible_target_hit_radius {
                                    for &vision in &self.possible_max_vision_distance {
                                        for environment_type in EnvironmentType::ALL {
                                            scenarios.push(Scenario {
                                                environment_type,
                                                area_side_length,
                                                max_agent_speed,
                                                max_episode_length,
                                                learned_defenders,
                                                attackers,
                                                target_hit_radius,
                                                max_vision_distance: vision
                                                    .unwrap_or(f64::INFINITY),
                                            });
                                        }
                                    }
                                }
                            }
                        }
                    }
                }
            }
        }

        let expected = self.total_scenarios();
        if scenarios.len() != expected {
            return Err(ScenarioError::CountMismatch {
                expected,
                generated: scenarios.len(),
            });
        }

        scenarios.shuffle(rng);
        Ok(scenarios.into())
    }
}
