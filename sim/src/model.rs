use crate::agent::{AgentKind, LearnedControl};
use crate::collaborator::{Collaborators, RoundResult, Termination};
use crate::config::{ConfigError, ModelConfig};
use crate::gwo::GwoRule;
use crate::rl::{assemble_observation, ActionError, RlAction, OBSERVED_NEIGHBORS};
use crate::rule::{StepContext, SwarmRule};
use crate::sma::SmaRule;
use crate::{neighbors, Agent, Objective, Playfield, Vec3};
use rand::rngs::StdRng;
use rand::SeedableRng;
use shared::{EnvironmentType, RoundStatistic};
use uuid::Uuid;

/// Group reward for every step survived without a hit
pub const CONTINUE_REWARD: f64 = 0.01;

/// Group reward when an attacker reaches the target
pub const HIT_REWARD: f64 = -1.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Spawned, waiting for the warm-up tick
    Initializing,
    Running,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TickOutcome {
    /// First tick after spawn; nothing moved
    WarmUp,
    Continued,
    /// The round ended and the model was already reset for the next one
    RoundEnded(RoundResult),
}

/// Win counters over the lifetime of a model
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Tally {
    pub attacker_wins: u64,
    pub defender_wins: u64,
}

impl Tally {
    pub fn rounds(&self) -> u64 {
        self.attacker_wins + self.defender_wins
    }
}

fn step_context<'a>(
    playfield: &'a Playfield,
    objective: &'a Objective,
    config: &ModelConfig,
    step: u32,
) -> StepContext<'a> {
    StepContext {
        playfield,
        objective,
        step,
        max_steps: config.max_steps,
        max_step: config.max_step(),
        max_velocity: config.max_velocity,
    }
}

/// One environment instance: a roster of agents chasing a hidden target
/// under one swarm algorithm, advanced one step per tick.
pub struct Model {
    instance_id: Uuid,
    config: ModelConfig,
    playfield: Playfield,
    objective: Objective,
    agents: Vec<Agent>,
    step_count: u32,
    rounds_finished: u64,
    phase: Phase,
    rule: Box<dyn SwarmRule>,
    rng: StdRng,
    collaborators: Collaborators,
    tally: Tally,
}

impl Model {
    /// Validate `config`, spawn the roster and place it for the first round
    pub fn new(config: ModelConfig, collaborators: Collaborators) -> Result<Self, ConfigError> {
        config.validate()?;

        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        let rule: Box<dyn SwarmRule> = match config.algorithm {
            EnvironmentType::Gwo => Box::new(GwoRule::new()),
            EnvironmentType::Sma => Box::new(SmaRule::new(config.z)),
        };

        // Ids follow spawn order: attackers, liars, learned defenders
        let kinds = std::iter::repeat(AgentKind::Attacker)
            .take(config.attackers as usize)
            .chain(std::iter::repeat(AgentKind::Liar(config.liar)).take(config.liars as usize))
            .chain(
                std::iter::repeat(AgentKind::Learned(LearnedControl::default()))
                    .take(config.learned_defenders as usize),
            );
        let agents: Vec<Agent> = kinds
            .enumerate()
            .map(|(id, kind)| Agent::new(id as u32, kind))
            .collect();

        let mut model = Self {
            instance_id: Uuid::new_v4(),
            playfield: Playfield::new(config.playfield_size),
            objective: Objective::new(Vec3::ZERO, config.vision_cap()),
            agents,
            step_count: 0,
            rounds_finished: 0,
            phase: Phase::Initializing,
            rule,
            rng,
            collaborators,
            tally: Tally::default(),
            config,
        };
        model.reset();

        tracing::info!(
            instance = %model.instance_id,
            algorithm = %model.config.algorithm,
            agents = model.agents.len(),
            "spawned environment"
        );

        Ok(model)
    }

    /// Play one step of the current round
    pub fn advance_round(&mut self) -> TickOutcome {
        if self.phase == Phase::Initializing {
            self.phase = Phase::Running;
            return TickOutcome::WarmUp;
        }

        let ctx = step_context(&self.playfield, &self.objective, &self.config, self.step_count);
        self.rule.refresh(&self.agents, &ctx);
        self.rule.prepare(&self.agents, &ctx, &mut self.rng);
        self.rule.advance(&mut self.agents, &ctx, &mut self.rng);
        self.step_count += 1;

        let target = self.objective.target;
        let radius = self.config.target_hit_radius;
        let hit_by = self
            .agents
            .iter()
            .find(|a| a.position.distance(target) <= radius)
            .map(|a| a.id);

        let termination = if let Some(id) = hit_by {
            tracing::debug!(instance = %self.instance_id, agent = id, "agent hit target");
            Some(Termination::TargetHit)
        } else if self.step_count >= self.config.max_steps {
            Some(Termination::Timeout)
        } else {
            None
        };

        match termination {
            Some(termination) => TickOutcome::RoundEnded(self.finish_round(termination)),
            None => {
                if self.has_learned_defenders() {
                    self.collaborators.episodes.add_group_reward(CONTINUE_REWARD);
                }
                TickOutcome::Continued
            }
        }
    }

    fn finish_round(&mut self, termination: Termination) -> RoundResult {
        let result = RoundResult {
            round: self.rounds_finished,
            termination,
            played_steps: self.step_count,
        };

        self.emit_statistics(&result);

        let episodes = &mut self.collaborators.episodes;
        match termination {
            Termination::TargetHit => {
                episodes.add_group_reward(HIT_REWARD);
                episodes.group_episode_interrupted();
                self.tally.attacker_wins += 1;
            }
            Termination::Timeout => {
                episodes.end_group_episode();
                self.tally.defender_wins += 1;
            }
        }

        tracing::info!(
            instance = %self.instance_id,
            round = result.round,
            winner = ?result.winner(),
            steps = result.played_steps,
            "round finished"
        );

        self.rounds_finished += 1;
        self.reset();

        if let Some(hook) = self.collaborators.on_round_finished.as_mut() {
            hook(&result);
        }

        result
    }

    fn emit_statistics(&mut self, result: &RoundResult) {
        let Some(side) = self.playfield.side_length() else {
            tracing::warn!(
                instance = %self.instance_id,
                size = ?self.playfield.size,
                "statistics need a cube playfield, skipping round"
            );
            return;
        };

        let Some(sink) = self.collaborators.stats.as_mut() else {
            tracing::warn!(instance = %self.instance_id, "no statistics sink attached");
            return;
        };

        sink.record(RoundStatistic {
            environment_type: Some(self.rule.environment_type()),
            max_rounds: Some(self.config.max_steps),
            played_rounds: Some(result.played_steps),
            winner: Some(result.winner()),
            line_of_sight: Some(self.config.vision_cap()),
            nr_attackers: Some(self.config.attackers),
            nr_defenders: Some(self.config.learned_defenders),
            max_speed: Some(self.config.max_velocity),
            area_side_length: Some(side),
            target_hit_radius: Some(self.config.target_hit_radius),
        });
    }

    /// Start a fresh round: clock, positions, target and per-round rule state
    fn reset(&mut self) {
        self.step_count = 0;

        for agent in &mut self.agents {
            let raw = self.config.spawn.sample(&self.playfield, &mut self.rng);
            agent.position = self.playfield.clamp(raw);
            if let AgentKind::Learned(control) = &mut agent.kind {
                *control = LearnedControl::default();
            }
        }

        self.objective.target = self.playfield.random_point(&mut self.rng);

        let ctx = step_context(&self.playfield, &self.objective, &self.config, 0);
        self.rule.begin_round(&self.agents, &ctx);
    }

    /// Feed an action vector to a learned defender
    pub fn apply_action(&mut self, agent_id: u32, action: &[f64]) -> Result<(), ActionError> {
        let action = RlAction::from_slice(action)?;
        let agent = self
            .agents
            .get_mut(agent_id as usize)
            .ok_or(ActionError::UnknownAgent(agent_id))?;

        match &mut agent.kind {
            AgentKind::Learned(control) => {
                control.apply(&action);
                Ok(())
            }
            _ => Err(ActionError::NotLearned(agent_id)),
        }
    }

    /// Observation vector for the policy driving `agent_id`
    pub fn observe(&self, agent_id: u32) -> Result<Vec<f64>, ActionError> {
        let agent = self
            .agents
            .get(agent_id as usize)
            .ok_or(ActionError::UnknownAgent(agent_id))?;

        let ctx = step_context(&self.playfield, &self.objective, &self.config, self.step_count);
        let model_obs = self.rule.observations(agent.position, &ctx);
        let neighbors = self.nearest_agents(agent.position, OBSERVED_NEIGHBORS, true);
        Ok(assemble_observation(model_obs, &neighbors))
    }

    /// Positions of the `k` roster members closest to `center`, relative to it
    pub fn nearest_agents(&self, center: Vec3, k: usize, ignore_self: bool) -> Vec<Vec3> {
        neighbors::nearest_agents(self.agents.iter().map(|a| a.position), center, k, ignore_self)
    }

    pub fn has_learned_defenders(&self) -> bool {
        self.config.learned_defenders > 0
    }

    /// Ids of the agents driven by actions
    pub fn learned_ids(&self) -> impl Iterator<Item = u32> + '_ {
        self.agents.iter().filter(|a| a.is_learned()).map(|a| a.id)
    }

    pub fn instance_id(&self) -> Uuid {
        self.instance_id
    }

    pub fn config(&self) -> &ModelConfig {
        &self.config
    }

    pub fn agents(&self) -> &[Agent] {
        &self.agents
    }

    pub fn target(&self) -> Vec3 {
        self.objective.target
    }

    pub fn playfield(&self) -> &Playfield {
        &self.playfield
    }

    pub fn step_count(&self) -> u32 {
        self.step_count
    }

    pub fn rounds_finished(&self) -> u64 {
        self.rounds_finished
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn tally(&self) -> Tally {
        self.tally
    }

    pub fn environment_type(&self) -> EnvironmentType {
        self.rule.environment_type()
    }

    /// Current algorithm rule, for inspection
    pub fn rule(&self) -> &dyn SwarmRule {
        self.rule.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaborator::{EpisodeEvent, EpisodeRecorder, StatsRecorder};
    use crate::config::SpawnMode;
    use crate::rl::OBSERVATION_WIDTH;
    use shared::Winner;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn far_config() -> ModelConfig {
        // Agents spawn in a tiny ball at one corner; the hit radius is zero
        ModelConfig {
            attackers: 4,
            max_steps: 5,
            target_hit_radius: 0.0,
            spawn: SpawnMode::Point {
                center: Vec3::splat(-20.0),
                radius: 0.1,
            },
            seed: Some(11),
            ..ModelConfig::gwo()
        }
    }

    #[test]
    fn test_first_tick_is_warm_up() {
        let mut model = Model::new(far_config(), Collaborators::default()).unwrap();
        assert_eq!(model.phase(), Phase::Initializing);
        let before: Vec<Vec3> = model.agents().iter().map(|a| a.position).collect();

        assert_eq!(model.advance_round(), TickOutcome::WarmUp);
        assert_eq!(model.phase(), Phase::Running);
        assert_eq!(model.step_count(), 0);
        let after: Vec<Vec3> = model.agents().iter().map(|a| a.position).collect();
        assert_eq!(before, after);
    }

    #[test]
    fn test_round_times_out_after_max_steps() {
        let stats = StatsRecorder::new();
        let episodes = EpisodeRecorder::new();
        let mut model = Model::new(
            far_config(),
            Collaborators::default()
                .with_stats(stats.clone())
                .with_episodes(episodes.clone()),
        )
        .unwrap();
        model.advance_round();

        for _ in 0..4 {
            assert_eq!(model.advance_round(), TickOutcome::Continued);
        }
        let outcome = model.advance_round();
        let TickOutcome::RoundEnded(result) = outcome else {
            panic!("expected the round to end, got {outcome:?}");
        };
        assert_eq!(result.termination, Termination::Timeout);
        assert_eq!(result.played_steps, 5);
        assert_eq!(model.step_count(), 0);
        assert_eq!(model.tally().defender_wins, 1);

        let events = stats.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].winner, Some(Winner::Defender));
        assert_eq!(events[0].played_rounds, Some(5));
        assert!(events[0].is_complete());

        // No learned defenders: no survival reward, only the episode end
        assert_eq!(episodes.events(), vec![EpisodeEvent::Ended]);
    }

    #[test]
    fn test_immediate_hit_ends_round() {
        let config = ModelConfig {
            attackers: 1,
            max_velocity: 0.01,
            target_hit_radius: 100.0,
            seed: Some(3),
            ..ModelConfig::sma()
        };
        let stats = StatsRecorder::new();
        let episodes = EpisodeRecorder::new();
        let mut model = Model::new(
            config,
            Collaborators::default()
                .with_stats(stats.clone())
                .with_episodes(episodes.clone()),
        )
        .unwrap();
        model.advance_round();

        let outcome = model.advance_round();
        let TickOutcome::RoundEnded(result) = outcome else {
            panic!("expected a hit, got {outcome:?}");
        };
        assert_eq!(result.termination, Termination::TargetHit);
        assert_eq!(result.played_steps, 1);
        assert_eq!(model.tally().attacker_wins, 1);
        assert_eq!(stats.events()[0].winner, Some(Winner::Attacker));
        assert_eq!(
            episodes.events(),
            vec![EpisodeEvent::Reward(HIT_REWARD), EpisodeEvent::Interrupted]
        );
    }

    #[test]
    fn test_reset_draws_fresh_target_and_positions() {
        let mut model = Model::new(far_config(), Collaborators::default()).unwrap();
        model.advance_round();
        let first_target = model.target();
        let first_positions: Vec<Vec3> = model.agents().iter().map(|a| a.position).collect();

        for _ in 0..5 {
            model.advance_round();
        }
        assert_eq!(model.rounds_finished(), 1);
        assert_ne!(model.target(), first_target);
        let positions: Vec<Vec3> = model.agents().iter().map(|a| a.position).collect();
        assert_ne!(positions, first_positions);
        for p in positions {
            assert!(model.playfield().contains(p));
        }
    }

    #[test]
    fn test_hook_runs_after_reset() {
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = calls.clone();
        let mut model = Model::new(
            far_config(),
            Collaborators::default().on_round_finished(move |result| {
                assert_eq!(result.played_steps, 5);
                seen.fetch_add(1, Ordering::SeqCst);
            }),
        )
        .unwrap();

        for _ in 0..(1 + 5 * 3) {
            model.advance_round();
        }
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(model.tally().rounds(), 3);
    }

    #[test]
    fn test_non_cube_playfield_skips_statistics() {
        let stats = StatsRecorder::new();
        let config = ModelConfig {
            playfield_size: Vec3::new(40.0, 40.0, 20.0),
            spawn: SpawnMode::Point {
                center: Vec3::new(-20.0, -20.0, -10.0),
                radius: 0.1,
            },
            ..far_config()
        };
        let mut model = Model::new(config, Collaborators::default().with_stats(stats.clone())).unwrap();
        for _ in 0..6 {
            model.advance_round();
        }
        assert_eq!(model.rounds_finished(), 1);
        assert!(stats.is_empty());
    }

    #[test]
    fn test_learned_defenders_get_survival_reward() {
        let episodes = EpisodeRecorder::new();
        let config = ModelConfig {
            learned_defenders: 2,
            ..far_config()
        };
        let mut model =
            Model::new(config, Collaborators::default().with_episodes(episodes.clone())).unwrap();
        model.advance_round();
        model.advance_round();
        model.advance_round();
        assert_eq!(
            episodes.events(),
            vec![
                EpisodeEvent::Reward(CONTINUE_REWARD),
                EpisodeEvent::Reward(CONTINUE_REWARD)
            ]
        );
    }

    #[test]
    fn test_roster_order_and_actions() {
        let config = ModelConfig {
            attackers: 3,
            liars: 1,
            learned_defenders: 1,
            ..far_config()
        };
        let mut model = Model::new(config, Collaborators::default()).unwrap();
        let roles: Vec<_> = model.agents().iter().map(|a| a.role()).collect();
        assert_eq!(
            roles,
            vec![
                crate::Role::Attacker,
                crate::Role::Attacker,
                crate::Role::Attacker,
                crate::Role::DefenderLiar,
                crate::Role::DefenderRl
            ]
        );
        assert_eq!(model.learned_ids().collect::<Vec<_>>(), vec![4]);

        assert!(model.apply_action(4, &[1.0, 0.0, 0.0, 0.5, -0.5]).is_ok());
        assert_eq!(
            model.apply_action(0, &[0.0; 5]),
            Err(ActionError::NotLearned(0))
        );
        assert_eq!(
            model.apply_action(9, &[0.0; 5]),
            Err(ActionError::UnknownAgent(9))
        );
        assert_eq!(model.apply_action(4, &[0.0; 2]), Err(ActionError::TooShort(2)));

        let AgentKind::Learned(control) = &model.agents()[4].kind else {
            panic!("agent 4 should be learned");
        };
        assert_eq!(control.fitness_offset, 0.5);
        assert_eq!(control.fitness_scale, -0.5);
    }

    #[test]
    fn test_observation_width() {
        for base in [ModelConfig::gwo(), ModelConfig::sma()] {
            let config = ModelConfig {
                attackers: 3,
                learned_defenders: 1,
                seed: Some(8),
                ..base
            };
            let model = Model::new(config, Collaborators::default()).unwrap();
            let obs = model.observe(3).unwrap();
            assert_eq!(obs.len(), OBSERVATION_WIDTH);
            assert!(obs.iter().all(|v| v.is_finite()));
        }
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let config = ModelConfig {
            attackers: 2,
            ..ModelConfig::gwo()
        };
        assert!(matches!(
            Model::new(config, Collaborators::default()),
            Err(ConfigError::TooFewAgents { .. })
        ));
    }
}
