use crate::agent::LiarParams;
use crate::Vec3;
use rand::Rng;
use serde::{Deserialize, Serialize};
use shared::{EnvironmentType, Scenario};
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("GWO needs at least {needed} agents in the roster, got {got}")]
    TooFewAgents { needed: usize, got: usize },

    #[error("randomness threshold z must lie strictly between 0 and 1, got {0}")]
    InvalidZ(f64),

    #[error("go-to-crowd factor must lie in [0, 1], got {0}")]
    InvalidGoToCrowdFactor(f64),

    #[error("`{name}` must be positive and finite, got {value}")]
    NotPositive { name: &'static str, value: f64 },

    #[error("`{name}` must not be negative, got {value}")]
    Negative { name: &'static str, value: f64 },

    #[error("max_steps must be at least 1")]
    NoSteps,
}

/// Where agents are placed at every round reset
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum SpawnMode {
    /// Uniformly anywhere in the playfield
    FullArea,

    /// Uniformly inside a ball around `center`
    Point { center: Vec3, radius: f64 },
}

impl SpawnMode {
    /// Raw spawn position; the caller clamps it into the playfield
    pub fn sample<R: Rng + ?Sized>(&self, playfield: &crate::Playfield, rng: &mut R) -> Vec3 {
        match *self {
            SpawnMode::FullArea => playfield.random_point(rng),
            SpawnMode::Point { center, radius } => {
                center + Vec3::random_in_unit_sphere(rng) * radius
            }
        }
    }
}

/// Everything needed to spawn one environment instance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    pub algorithm: EnvironmentType,

    /// Side lengths of the playfield cuboid
    pub playfield_size: Vec3,

    /// Agent speed in m/s
    pub max_velocity: f64,

    /// Seconds per simulated step
    pub fixed_time_step: f64,

    pub max_steps: u32,
    pub target_hit_radius: f64,

    /// `None` means unlimited vision
    pub vision_distance: Option<f64>,

    pub attackers: u32,
    pub liars: u32,
    pub learned_defenders: u32,
    pub liar: LiarParams,
    pub spawn: SpawnMode,

    /// SMA probability of a random exploration move
    pub z: f64,

    /// Fixed seed for reproducible runs; entropy when absent
    pub seed: Option<u64>,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self::sma()
    }
}

impl ModelConfig {
    pub fn gwo() -> Self {
        Self {
            algorithm: EnvironmentType::Gwo,
            playfield_size: Vec3::splat(40.0),
            max_velocity: 13.0,
            fixed_time_step: 0.02,
            max_steps: 2300,
            target_hit_radius: 2.0,
            vision_distance: None,
            attackers: 25,
            liars: 0,
            learned_defenders: 0,
            liar: LiarParams::gwo_default(),
            spawn: SpawnMode::FullArea,
            z: 0.03,
            seed: None,
        }
    }

    pub fn sma() -> Self {
        Self {
            algorithm: EnvironmentType::Sma,
            liar: LiarParams::sma_default(),
            spawn: SpawnMode::Point {
                center: Vec3::ZERO,
                radius: 1.0,
            },
            ..Self::gwo()
        }
    }

    /// Per-step movement cap in m/step
    pub fn max_step(&self) -> f64 {
        self.max_velocity * self.fixed_time_step
    }

    pub fn vision_cap(&self) -> f64 {
        self.vision_distance.unwrap_or(f64::INFINITY)
    }

    pub fn roster_len(&self) -> usize {
        (self.attackers + self.liars + self.learned_defenders) as usize
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let positive = [
            ("playfield_size.x", self.playfield_size.x),
            ("playfield_size.y", self.playfield_size.y),
            ("playfield_size.z", self.playfield_size.z),
            ("max_velocity", self.max_velocity),
            ("fixed_time_step", self.fixed_time_step),
        ];
        for (name, value) in positive {
            if !(value.is_finite() && value > 0.0) {
                return Err(ConfigError::NotPositive { name, value });
            }
        }

        if !(self.target_hit_radius >= 0.0) {
            return Err(ConfigError::Negative {
                name: "target_hit_radius",
                value: self.target_hit_radius,
            });
        }
        if let Some(vision) = self.vision_distance {
            if !(vision >= 0.0) {
                return Err(ConfigError::Negative {
                    name: "vision_distance",
                    value: vision,
                });
            }
        }
        if let SpawnMode::Point { radius, .. } = self.spawn {
            if !(radius >= 0.0 && radius.is_finite()) {
                return Err(ConfigError::Negative {
                    name: "spawn.radius",
                    value: radius,
                });
            }
        }

        if self.max_steps == 0 {
            return Err(ConfigError::NoSteps);
        }

        let factor = self.liar.go_to_crowd_factor;
        if !(0.0..=1.0).contains(&factor) {
            return Err(ConfigError::InvalidGoToCrowdFactor(factor));
        }

        match self.algorithm {
            EnvironmentType::Gwo => {
                if self.roster_len() < 3 {
                    return Err(ConfigError::TooFewAgents {
                        needed: 3,
                        got: self.roster_len(),
                    });
                }
            }
            EnvironmentType::Sma => {
                if !(self.z > 0.0 && self.z < 1.0) {
                    return Err(ConfigError::InvalidZ(self.z));
                }
            }
        }

        Ok(())
    }
}

impl From<&Scenario> for ModelConfig {
    fn from(scenario: &Scenario) -> Self {
        let base = match scenario.environment_type {
            EnvironmentType::Gwo => ModelConfig::gwo(),
            EnvironmentType::Sma => ModelConfig::sma(),
        };
        Self {
            playfield_size: Vec3::splat(scenario.area_side_length),
            max_velocity: scenario.max_agent_speed,
            max_steps: scenario.max_episode_length,
            learned_defenders: scenario.learned_defenders,
            attackers: scenario.attackers,
            target_hit_radius: scenario.target_hit_radius,
            vision_distance: scenario
                .max_vision_distance
                .is_finite()
                .then_some(scenario.max_vision_distance),
            ..base
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Playfield;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_defaults_are_valid() {
        assert!(ModelConfig::gwo().validate().is_ok());
        assert!(ModelConfig::sma().validate().is_ok());
    }

    #[test]
    fn test_gwo_needs_three_agents() {
        let config = ModelConfig {
            attackers: 1,
            learned_defenders: 1,
            ..ModelConfig::gwo()
        };
        assert_eq!(
            config.validate(),
            Err(ConfigError::TooFewAgents { needed: 3, got: 2 })
        );
    }

    #[test]
    fn test_z_bounds_are_exclusive() {
        for z in [0.0, 1.0, -0.1, f64::NAN] {
            let config = ModelConfig {
                z,
                ..ModelConfig::sma()
            };
            assert!(matches!(config.validate(), Err(ConfigError::InvalidZ(_))));
        }
    }

    #[test]
    fn test_go_to_crowd_range() {
        let config = ModelConfig {
            liar: LiarParams {
                go_to_crowd_factor: 1.5,
                fitness_bias: 1000.0,
            },
            ..ModelConfig::sma()
        };
        assert_eq!(
            config.validate(),
            Err(ConfigError::InvalidGoToCrowdFactor(1.5))
        );
    }

    #[test]
    fn test_non_positive_speed() {
        let config = ModelConfig {
            max_velocity: 0.0,
            ..ModelConfig::gwo()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::NotPositive {
                name: "max_velocity",
                ..
            })
        ));
    }

    #[test]
    fn test_zero_steps() {
        let config = ModelConfig {
            max_steps: 0,
            ..ModelConfig::sma()
        };
        assert_eq!(config.validate(), Err(ConfigError::NoSteps));
    }

    #[test]
    fn test_from_scenario() {
        let scenario = Scenario {
            environment_type: EnvironmentType::Gwo,
            area_side_length: 20.0,
            max_agent_speed: 5.0,
            max_episode_length: 300,
            learned_defenders: 2,
            attackers: 8,
            target_hit_radius: 1.5,
            max_vision_distance: f64::INFINITY,
        };
        let config = ModelConfig::from(&scenario);
        assert_eq!(config.algorithm, EnvironmentType::Gwo);
        assert_eq!(config.playfield_size, Vec3::splat(20.0));
        assert_eq!(config.learned_defenders, 2);
        assert_eq!(config.vision_distance, None);
        assert!(config.vision_cap().is_infinite());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_point_spawn_stays_in_ball() {
        let field = Playfield::cube(40.0);
        let spawn = SpawnMode::Point {
            center: Vec3::new(5.0, 5.0, 5.0),
            radius: 2.0,
        };
        let mut rng = StdRng::seed_from_u64(9);
        for _ in 0..200 {
            let p = spawn.sample(&field, &mut rng);
            assert!(p.distance(Vec3::new(5.0, 5.0, 5.0)) <= 2.0 + 1e-12);
        }
    }

    #[test]
    fn test_config_from_json() {
        let json = r#"{
            "algorithm": "GWO",
            "attackers": 4,
            "spawn": { "mode": "point", "center": { "x": 1.0, "y": 0.0, "z": 0.0 }, "radius": 0.5 }
        }"#;
        let config: ModelConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.algorithm, EnvironmentType::Gwo);
        assert_eq!(config.attackers, 4);
        assert!(matches!(config.spawn, SpawnMode::Point { radius, .. } if radius == 0.5));
    }

    #[test]
    fn test_malformed_spawn_mode_is_rejected() {
        let json = r#"{ "spawn": { "mode": "corner" } }"#;
        assert!(serde_json::from_str::<ModelConfig>(json).is_err());
    }
}
