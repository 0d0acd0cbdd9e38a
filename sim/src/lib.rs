//! Adversarial swarm pursuit engine.
//!
//! A swarm of attackers searches a bounded 3D playfield for a hidden target
//! using either the Grey Wolf Optimizer or the Slime Mould Algorithm, while
//! defenders embedded in the swarm misreport their fitness to lead it away.
//! Each [`Model`] is one independent environment instance advanced one step
//! per [`Model::advance_round`] call.

pub mod agent;
pub mod collaborator;
pub mod config;
pub mod gwo;
pub mod model;
pub mod neighbors;
pub mod objective;
pub mod playfield;
pub mod rl;
pub mod rule;
pub mod sma;
pub mod vector;

pub use agent::{Agent, AgentKind, LeadAgent, LearnedControl, LiarParams, Role};
pub use collaborator::{
    Collaborators, EpisodeChannel, EpisodeEvent, EpisodeRecorder, NoTrainer, RoundFinishedHook,
    RoundResult, StatsRecorder, StatsSink, Termination,
};
pub use config::{ConfigError, ModelConfig, SpawnMode};
pub use model::{Model, Phase, Tally, TickOutcome};
pub use objective::Objective;
pub use playfield::Playfield;
pub use rl::{ActionError, RlAction, ACTION_WIDTH, OBSERVATION_WIDTH};
pub use rule::{StepContext, SwarmRule};
pub use vector::Vec3;
