use crate::playfield::move_towards;
use crate::{Agent, Objective, Playfield, Vec3};
use rand::rngs::StdRng;
use shared::EnvironmentType;

/// Read-only view of the model state a rule needs during one step
#[derive(Debug, Clone, Copy)]
pub struct StepContext<'a> {
    pub playfield: &'a Playfield,
    pub objective: &'a Objective,

    /// Steps already played this round
    pub step: u32,
    pub max_steps: u32,

    /// Movement cap in m/step
    pub max_step: f64,

    /// Agent speed in m/s, used for exploration radii
    pub max_velocity: f64,
}

impl StepContext<'_> {
    /// Share of the round already played, in `[0, 1]`
    pub fn progress(&self) -> f64 {
        f64::from(self.step) / f64::from(self.max_steps)
    }
}

/// Update rule of one swarm algorithm.
///
/// Every step the model calls `refresh`, then `prepare`, then `advance`.
/// Single-phase algorithms leave `prepare` as the default no-op.
pub trait SwarmRule: Send {
    fn environment_type(&self) -> EnvironmentType;

    /// Reset per-round state after agents were placed for a new round
    fn begin_round(&mut self, agents: &[Agent], ctx: &StepContext<'_>);

    /// Recompute global scalars and leader state from the current positions
    fn refresh(&mut self, agents: &[Agent], ctx: &StepContext<'_>);

    /// First phase: per-agent bookkeeping before anyone moves
    fn prepare(&mut self, _agents: &[Agent], _ctx: &StepContext<'_>, _rng: &mut StdRng) {}

    /// Second phase: move every agent
    fn advance(&mut self, agents: &mut [Agent], ctx: &StepContext<'_>, rng: &mut StdRng);

    /// Algorithm-specific observations for an agent standing at `pos`
    fn observations(&self, pos: Vec3, ctx: &StepContext<'_>) -> Vec<f64>;
}

/// Write a new position and report it when it is not finite.
///
/// A non-finite position is kept as is so the broken state stays visible.
pub(crate) fn settle(agent: &mut Agent, position: Vec3) {
    if !position.is_finite() {
        tracing::error!(agent = agent.id, ?position, "detected non-finite position");
    }
    agent.position = position;
}

/// Clamp the candidate first, then cap the step length
pub(crate) fn clamp_then_cap(current: Vec3, candidate: Vec3, ctx: &StepContext<'_>) -> Vec3 {
    move_towards(current, ctx.playfield.clamp(candidate), ctx.max_step)
}

/// Cap the step length first, then clamp the result
pub(crate) fn cap_then_clamp(current: Vec3, candidate: Vec3, ctx: &StepContext<'_>) -> Vec3 {
    ctx.playfield.clamp(move_towards(current, candidate, ctx.max_step))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::AgentKind;

    fn ctx<'a>(field: &'a Playfield, objf: &'a Objective) -> StepContext<'a> {
        StepContext {
            playfield: field,
            objective: objf,
            step: 5,
            max_steps: 20,
            max_step: 1.0,
            max_velocity: 50.0,
        }
    }

    #[test]
    fn test_progress() {
        let field = Playfield::cube(10.0);
        let objf = Objective::new(Vec3::ZERO, f64::INFINITY);
        assert_eq!(ctx(&field, &objf).progress(), 0.25);
    }

    #[test]
    fn test_clamp_then_cap_never_leaves_field() {
        let field = Playfield::cube(10.0);
        let objf = Objective::new(Vec3::ZERO, f64::INFINITY);
        let c = ctx(&field, &objf);
        let next = clamp_then_cap(Vec3::new(4.5, 0.0, 0.0), Vec3::new(40.0, 0.0, 0.0), &c);
        assert_eq!(next, Vec3::new(5.0, 0.0, 0.0));
    }

    #[test]
    fn test_cap_then_clamp() {
        let field = Playfield::cube(10.0);
        let objf = Objective::new(Vec3::ZERO, f64::INFINITY);
        let c = ctx(&field, &objf);
        let next = cap_then_clamp(Vec3::ZERO, Vec3::new(0.0, -40.0, 0.0), &c);
        assert_eq!(next, Vec3::new(0.0, -1.0, 0.0));
    }

    #[test]
    fn test_settle_keeps_non_finite_position() {
        let mut agent = Agent::new(3, AgentKind::Attacker);
        settle(&mut agent, Vec3::new(f64::NAN, 0.0, 0.0));
        assert!(!agent.position.is_finite());
    }
}
