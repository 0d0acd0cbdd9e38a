//! Slime Mould Algorithm.
//!
//! Two phases per step: `prepare` draws a smell weight for every swarm
//! member, `advance` moves everyone against a snapshot of the positions taken
//! before the first agent moved.

use crate::agent::AgentKind;
use crate::rule::{cap_then_clamp, clamp_then_cap, settle, StepContext, SwarmRule};
use crate::{Agent, Vec3};
use rand::rngs::StdRng;
use rand::Rng;
use shared::EnvironmentType;

/// Added to the worst fitness when it equals the best one
pub const FITNESS_EPSILON: f64 = 1e-4;

/// Upper bound for the `atanh` argument so the first step stays finite
const ATANH_LIMIT: f64 = 1.0 - 1e-9;

/// Weight branch selector. Every valid index satisfies it, so the `-` branch
/// of [`smell_weight`] is unreachable from the rule itself.
pub fn rank_ok(id: u32, roster_len: usize) -> bool {
    (id as usize) + 1 <= roster_len
}

pub fn smell_weight(r: Vec3, best: f64, worst: f64, own: f64, rank_ok: bool) -> Vec3 {
    let spread = ((best - own) / (best - worst) + 1.0).log10();
    if rank_ok {
        Vec3::ONE + r * spread
    } else {
        Vec3::ONE - r * spread
    }
}

/// Oscillation bound `atanh(1 - t/T)`, clamped into a finite range
pub fn oscillation_bound(t: u32, max_steps: u32) -> f64 {
    let x = 1.0 - f64::from(t) / f64::from(max_steps);
    x.clamp(0.0, ATANH_LIMIT).atanh()
}

/// Diagonal offset a liar adds to its legitimate move
pub fn liar_offset(max_velocity: f64, go_to_crowd_factor: f64) -> Vec3 {
    Vec3::splat(max_velocity * (1.0 - go_to_crowd_factor) / 3f64.sqrt())
}

#[derive(Debug, Clone)]
pub struct SmaRule {
    pub z: f64,
    pub best_fitness: f64,
    pub worst_fitness: f64,

    /// Best fitness seen so far this round
    pub destination_fitness: f64,

    /// Where `destination_fitness` was reported
    pub best_position: Vec3,

    fitness: Vec<f64>,
    weights: Vec<Vec3>,
}

impl SmaRule {
    pub fn new(z: f64) -> Self {
        Self {
            z,
            best_fitness: 0.0,
            worst_fitness: 0.0,
            destination_fitness: f64::INFINITY,
            best_position: Vec3::ZERO,
            fitness: Vec::new(),
            weights: Vec::new(),
        }
    }

    /// Fitness of every roster member as of the last refresh
    pub fn fitness(&self) -> &[f64] {
        &self.fitness
    }

    /// Legitimate follower candidate for the agent at `index`
    fn follower_candidate(
        &self,
        index: usize,
        snapshot: &[Vec3],
        ctx: &StepContext<'_>,
        rng: &mut StdRng,
    ) -> Vec3 {
        let position = snapshot[index];

        if rng.gen::<f64>() < self.z {
            return position + Vec3::random_in_unit_sphere(rng) * ctx.max_velocity;
        }

        let t = ctx.step + 1;
        let vc = (1.0 - f64::from(t) / f64::from(ctx.max_steps)).clamp(0.0, 1.0);

        let r2: f64 = rng.gen();
        let p = (self.fitness[index] - self.destination_fitness).abs().tanh();
        let vb = Vec3::random_symmetric(rng, oscillation_bound(t, ctx.max_steps));
        let xa = snapshot[rng.gen_range(0..snapshot.len())];
        let xb = snapshot[rng.gen_range(0..snapshot.len())];

        if r2 < p {
            self.best_position + vb.mul_elem(self.weights[index].mul_elem(xa) - xb)
        } else {
            Vec3::random_symmetric(rng, vc).mul_elem(position)
        }
    }
}

impl SwarmRule for SmaRule {
    fn environment_type(&self) -> EnvironmentType {
        EnvironmentType::Sma
    }

    fn begin_round(&mut self, agents: &[Agent], _ctx: &StepContext<'_>) {
        self.best_fitness = 0.0;
        self.worst_fitness = 0.0;
        self.destination_fitness = f64::INFINITY;
        self.fitness = vec![0.0; agents.len()];
        self.weights = vec![Vec3::ONE; agents.len()];
    }

    fn refresh(&mut self, agents: &[Agent], ctx: &StepContext<'_>) {
        self.fitness.clear();
        self.fitness
            .extend(agents.iter().map(|a| a.fitness(ctx.objective)));

        self.best_fitness = f64::INFINITY;
        self.worst_fitness = f64::NEG_INFINITY;
        for (agent, &fit) in agents.iter().zip(&self.fitness) {
            self.best_fitness = self.best_fitness.min(fit);
            self.worst_fitness = self.worst_fitness.max(fit);
            if fit < self.destination_fitness {
                self.destination_fitness = fit;
                self.best_position = agent.position;
            }
        }

        if self.best_fitness == self.worst_fitness {
            tracing::trace!(fitness = self.best_fitness, "all agents report the same fitness");
            self.worst_fitness += FITNESS_EPSILON;
        }
    }

    fn prepare(&mut self, agents: &[Agent], _ctx: &StepContext<'_>, rng: &mut StdRng) {
        self.weights.resize(agents.len(), Vec3::ONE);
        for (i, agent) in agents.iter().enumerate() {
            if agent.is_learned() {
                continue;
            }
            let r = Vec3::random_unit(rng);
            self.weights[i] = smell_weight(
                r,
                self.best_fitness,
                self.worst_fitness,
                self.fitness[i],
                rank_ok(agent.id, agents.len()),
            );
        }
    }

    fn advance(&mut self, agents: &mut [Agent], ctx: &StepContext<'_>, rng: &mut StdRng) {
        let snapshot: Vec<Vec3> = agents.iter().map(|a| a.position).collect();

        for (i, agent) in agents.iter_mut().enumerate() {
            let next = match &agent.kind {
                AgentKind::Attacker => {
                    let candidate = self.follower_candidate(i, &snapshot, ctx, rng);
                    cap_then_clamp(agent.position, candidate, ctx)
                }
                AgentKind::Liar(params) => {
                    let candidate = self.follower_candidate(i, &snapshot, ctx, rng)
                        + liar_offset(ctx.max_velocity, params.go_to_crowd_factor);
                    cap_then_clamp(agent.position, candidate, ctx)
                }
                AgentKind::Learned(control) => {
                    let candidate = control.candidate(agent.position, ctx.max_step);
                    clamp_then_cap(agent.position, candidate, ctx)
                }
            };
            settle(agent, next);
        }
    }

    fn observations(&self, pos: Vec3, ctx: &StepContext<'_>) -> Vec<f64> {
        let mut obs = vec![self.best_fitness, self.worst_fitness, ctx.progress()];
        obs.extend_from_slice(&<[f64; 3]>::from(ctx.objective.target - pos));
        obs
    }
}
