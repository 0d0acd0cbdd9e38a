//! Handles the model uses to talk to the outside world.
//!
//! A model never reaches for global state: the statistics sink, the RL
//! episode channel and the round-finished hook are all handed to it at
//! construction. Several models may share one sink; emission is append-only
//! and order-insensitive.

use parking_lot::Mutex;
use shared::{RoundStatistic, Winner};
use std::sync::Arc;

/// How a round ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// An agent came within the hit radius of the target
    TargetHit,
    /// `max_steps` were played without a hit
    Timeout,
}

impl Termination {
    pub fn winner(self) -> Winner {
        match self {
            Termination::TargetHit => Winner::Attacker,
            Termination::Timeout => Winner::Defender,
        }
    }
}

/// Summary of a finished round, handed to the round-finished hook
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RoundResult {
    /// Zero-based count of rounds this model has finished before this one
    pub round: u64,
    pub termination: Termination,
    pub played_steps: u32,
}

impl RoundResult {
    pub fn winner(&self) -> Winner {
        self.termination.winner()
    }
}

/// Receives one statistics event per concluded round
pub trait StatsSink: Send {
    fn record(&mut self, stat: RoundStatistic);
}

/// Group-level reward and episode signals for the RL trainer
pub trait EpisodeChannel: Send {
    fn add_group_reward(&mut self, reward: f64);

    /// The episode reached its natural end (timeout)
    fn end_group_episode(&mut self);

    /// The episode was cut short (target hit)
    fn group_episode_interrupted(&mut self);
}

/// Called after every round, once statistics and rewards went out and the
/// model has been reset
pub type RoundFinishedHook = Box<dyn FnMut(&RoundResult) + Send>;

/// Episode channel for models without a trainer attached
#[derive(Debug, Default, Clone, Copy)]
pub struct NoTrainer;

impl EpisodeChannel for NoTrainer {
    fn add_group_reward(&mut self, _reward: f64) {}
    fn end_group_episode(&mut self) {}
    fn group_episode_interrupted(&mut self) {}
}

/// Stats sink that keeps every event in memory; clones share the buffer
#[derive(Debug, Default, Clone)]
pub struct StatsRecorder {
    events: Arc<Mutex<Vec<RoundStatistic>>>,
}

impl StatsRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<RoundStatistic> {
        self.events.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl StatsSink for StatsRecorder {
    fn record(&mut self, stat: RoundStatistic) {
        self.events.lock().push(stat);
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EpisodeEvent {
    Reward(f64),
    Ended,
    Interrupted,
}

/// Episode channel that keeps every signal in memory; clones share the buffer
#[derive(Debug, Default, Clone)]
pub struct EpisodeRecorder {
    events: Arc<Mutex<Vec<EpisodeEvent>>>,
}

impl EpisodeRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<EpisodeEvent> {
        self.events.lock().clone()
    }

    /// Sum of all rewards received so far
    pub fn total_reward(&self) -> f64 {
        self.events
            .lock()
            .iter()
            .map(|e| match e {
                EpisodeEvent::Reward(r) => *r,
                _ => 0.0,
            })
            .sum()
    }
}

impl EpisodeChannel for EpisodeRecorder {
    fn add_group_reward(&mut self, reward: f64) {
        self.events.lock().push(EpisodeEvent::Reward(reward));
    }

    fn end_group_episode(&mut self) {
        self.events.lock().push(EpisodeEvent::Ended);
    }

    fn group_episode_interrupted(&mut self) {
        self.events.lock().push(EpisodeEvent::Interrupted);
    }
}

/// Everything a model emits to, bundled for construction
pub struct Collaborators {
    pub stats: Option<Box<dyn StatsSink>>,
    pub episodes: Box<dyn EpisodeChannel>,
    pub on_round_finished: Option<RoundFinishedHook>,
}

impl Default for Collaborators {
    fn default() -> Self {
        Self {
            stats: None,
            episodes: Box::new(NoTrainer),
            on_round_finished: None,
        }
    }
}

impl Collaborators {
    pub fn with_stats(mut self, sink: impl StatsSink + 'static) -> Self {
        self.stats = Some(Box::new(sink));
        self
    }

    pub fn with_episodes(mut self, channel: impl EpisodeChannel + 'static) -> Self {
        self.episodes = Box::new(channel);
        self
    }

    pub fn on_round_finished(mut self, hook: impl FnMut(&RoundResult) + Send + 'static) -> Self {
        self.on_round_finished = Some(Box::new(hook));
        self
    }
}
