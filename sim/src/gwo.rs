//! Grey Wolf Optimizer.
//!
//! Every roster member (omega) steers toward three guides. The guides are
//! `LeadAgent`s outside the roster; each step the model moves them toward
//! the positions of the three roster members reporting the lowest fitness.

use crate::agent::{AgentKind, LeadAgent, LiarParams};
use crate::rule::{clamp_then_cap, settle, StepContext, SwarmRule};
use crate::{Agent, Vec3};
use rand::rngs::StdRng;
use rand::Rng;
use shared::EnvironmentType;

pub const LEAD_COUNT: usize = 3;

/// Convergence parameter: 2 at step 0, falling linearly to 0 at `max_steps`
pub fn a_schedule(step: u32, max_steps: u32) -> f64 {
    let lin = 2.0 - 2.0 * (f64::from(step) / f64::from(max_steps));
    lin.clamp(0.0, 2.0)
}

/// Roster indices ordered by ascending fitness. Ties keep roster order.
pub fn rank_by_fitness(fitness: &[f64]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..fitness.len()).collect();
    order.sort_by(|&i, &j| fitness[i].total_cmp(&fitness[j]));
    order
}

/// Unclamped next position of an omega following `leads`
pub fn omega_candidate<R: Rng + ?Sized>(
    position: Vec3,
    leads: &[LeadAgent],
    a: f64,
    rng: &mut R,
) -> Vec3 {
    let pulls: Vec<Vec3> = leads
        .iter()
        .map(|lead| {
            let r1 = Vec3::random_unit(rng);
            let r2 = Vec3::random_unit(rng);

            let a_vec = 2.0 * a * r1 - Vec3::splat(a);
            let c_vec = 2.0 * r2;
            let d_lead = (c_vec.mul_elem(lead.position) - position).abs();
            lead.position - a_vec.mul_elem(d_lead)
        })
        .collect();

    Vec3::average(&pulls)
}

#[derive(Debug, Clone)]
pub struct GwoRule {
    pub a: f64,
    pub leads: [LeadAgent; LEAD_COUNT],
}

impl Default for GwoRule {
    fn default() -> Self {
        Self::new()
    }
}

impl GwoRule {
    pub fn new() -> Self {
        Self {
            a: 2.0,
            leads: [LeadAgent::new(Vec3::ZERO); LEAD_COUNT],
        }
    }

    fn fitness(agents: &[Agent], ctx: &StepContext<'_>) -> Vec<f64> {
        agents.iter().map(|a| a.fitness(ctx.objective)).collect()
    }

    fn step_liar(
        &self,
        agent: &Agent,
        params: &LiarParams,
        ctx: &StepContext<'_>,
        rng: &mut StdRng,
    ) -> Vec3 {
        let drift = 3f64.sqrt() * ctx.max_step * (1.0 - params.go_to_crowd_factor);
        let fake_point = ctx.playfield.clamp(agent.position + Vec3::splat(drift));
        let candidate = omega_candidate(fake_point, &self.leads, self.a, rng);
        clamp_then_cap(fake_point, candidate, ctx)
    }
}

impl SwarmRule for GwoRule {
    fn environment_type(&self) -> EnvironmentType {
        EnvironmentType::Gwo
    }

    fn begin_round(&mut self, agents: &[Agent], ctx: &StepContext<'_>) {
        self.a = a_schedule(0, ctx.max_steps);
        let fitness = Self::fitness(agents, ctx);
        for (lead, idx) in self.leads.iter_mut().zip(rank_by_fitness(&fitness)) {
            lead.position = agents[idx].position;
        }
    }

    fn refresh(&mut self, agents: &[Agent], ctx: &StepContext<'_>) {
        self.a = a_schedule(ctx.step, ctx.max_steps);

        let fitness = Self::fitness(agents, ctx);
        let ranked = rank_by_fitness(&fitness);
        debug_assert!(ranked.len() >= LEAD_COUNT);
        for (lead, idx) in self.leads.iter_mut().zip(ranked) {
            lead.move_towards(agents[idx].position, ctx.playfield, ctx.max_step);
        }
    }

    fn advance(&mut self, agents: &mut [Agent], ctx: &StepContext<'_>, rng: &mut StdRng) {
        for agent in agents.iter_mut() {
            let next = match &agent.kind {
                AgentKind::Attacker => {
                    let candidate = omega_candidate(agent.position, &self.leads, self.a, rng);
                    clamp_then_cap(agent.position, candidate, ctx)
                }
                AgentKind::Liar(params) => self.step_liar(agent, params, ctx, rng),
                AgentKind::Learned(control) => {
                    let candidate = control.candidate(agent.position, ctx.max_step);
                    clamp_then_cap(agent.position, candidate, ctx)
                }
            };
            settle(agent, next);
        }
    }

    fn observations(&self, pos: Vec3, ctx: &StepContext<'_>) -> Vec<f64> {
        let mut obs = Vec::with_capacity(13);
        obs.push(self.a);
        for lead in &self.leads {
            obs.extend_from_slice(&<[f64; 3]>::from(lead.position - pos));
        }
        obs.extend_from_slice(&<[f64; 3]>::from(ctx.objective.target - pos));
        obs
    }
}
