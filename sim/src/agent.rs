use crate::playfield::{move_towards, Playfield};
use crate::rl::RlAction;
use crate::{Objective, Vec3};
use serde::{Deserialize, Serialize};

/// Role an agent plays in the pursuit game
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    /// Honest swarm member converging on the target
    Attacker,
    /// Rule-based defender that misreports its fitness and drifts off course
    DefenderLiar,
    /// Defender driven by externally supplied action vectors
    DefenderRl,
    /// GWO guide, placed by the model onto the best-ranked positions
    Leader,
}

impl Role {
    pub fn is_defender(self) -> bool {
        matches!(self, Role::DefenderLiar | Role::DefenderRl)
    }
}

/// Tuning for liar defenders
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LiarParams {
    /// 0.0 = ignore the swarm entirely, 1.0 = move exactly like an attacker
    pub go_to_crowd_factor: f64,

    /// Subtracted from the honest objective before reporting
    pub fitness_bias: f64,
}

impl LiarParams {
    pub fn gwo_default() -> Self {
        Self {
            go_to_crowd_factor: 0.2,
            fitness_bias: 2000.0,
        }
    }

    pub fn sma_default() -> Self {
        Self {
            go_to_crowd_factor: 0.0,
            fitness_bias: 1000.0,
        }
    }
}

/// Latest action received for a learned defender
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LearnedControl {
    /// Components in `[-1, 1]`, scaled by the per-step cap when moving
    pub move_vector: Vec3,
    pub fitness_scale: f64,
    pub fitness_offset: f64,
}

impl Default for LearnedControl {
    fn default() -> Self {
        Self {
            move_vector: Vec3::ZERO,
            fitness_scale: 1.0,
            fitness_offset: 0.0,
        }
    }
}

impl LearnedControl {
    pub fn apply(&mut self, action: &RlAction) {
        self.move_vector = action.move_vector;
        self.fitness_scale = action.fitness_scale;
        self.fitness_offset = action.fitness_offset;
    }

    /// Candidate position before clamping and velocity capping
    pub fn candidate(&self, position: Vec3, max_step: f64) -> Vec3 {
        position + self.move_vector * max_step
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum AgentKind {
    Attacker,
    Liar(LiarParams),
    Learned(LearnedControl),
}

/// A roster member. `id` is its index in the roster and stays fixed for the
/// lifetime of the model.
#[derive(Debug, Clone)]
pub struct Agent {
    pub id: u32,
    pub position: Vec3,
    pub kind: AgentKind,
}

impl Agent {
    pub fn new(id: u32, kind: AgentKind) -> Self {
        Self {
            id,
            position: Vec3::ZERO,
            kind,
        }
    }

    pub fn role(&self) -> Role {
        match self.kind {
            AgentKind::Attacker => Role::Attacker,
            AgentKind::Liar(_) => Role::DefenderLiar,
            AgentKind::Learned(_) => Role::DefenderRl,
        }
    }

    pub fn is_learned(&self) -> bool {
        matches!(self.kind, AgentKind::Learned(_))
    }

    /// Fitness this agent reports to the swarm at its current position
    pub fn fitness(&self, objective: &Objective) -> f64 {
        self.fitness_at(objective, self.position)
    }

    /// Fitness this agent would report at `pos`. Lower is better.
    pub fn fitness_at(&self, objective: &Objective, pos: Vec3) -> f64 {
        let honest = objective.evaluate(pos);
        match &self.kind {
            AgentKind::Attacker => honest,
            AgentKind::Liar(params) => honest - params.fitness_bias,
            AgentKind::Learned(control) => {
                control.fitness_scale * 10.0 * honest + control.fitness_offset * 10.0
            }
        }
    }
}

/// GWO guide. Leads are not part of the roster; the model moves them onto
/// the three best-ranked positions every step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LeadAgent {
    pub position: Vec3,
}

impl LeadAgent {
    pub fn new(position: Vec3) -> Self {
        Self { position }
    }

    pub fn role(&self) -> Role {
        Role::Leader
    }

    pub fn move_towards(&mut self, candidate: Vec3, playfield: &Playfield, max_step: f64) {
        let candidate = playfield.clamp(candidate);
        self.position = move_towards(self.position, candidate, max_step);
    }
}
