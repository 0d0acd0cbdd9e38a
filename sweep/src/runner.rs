use crate::collector::{self, StatsCollector};
use crate::policy;
use crate::progress::Progress;
use crate::server;
use anyhow::{Context, Result};
use chrono::Utc;
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use shared::{DefenderPolicy, RoundStatistic, Scenario, SweepConfig};
use sim::{Collaborators, EpisodeChannel, Model, ModelConfig, RoundResult, StatsSink, TickOutcome};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc::{self, UnboundedSender};
use tokio::task::JoinSet;

/// Forwards round statistics to the collector task
pub struct ChannelSink(UnboundedSender<RoundStatistic>);

impl ChannelSink {
    pub fn new(tx: UnboundedSender<RoundStatistic>) -> Self {
        Self(tx)
    }
}

impl StatsSink for ChannelSink {
    fn record(&mut self, stat: RoundStatistic) {
        if self.0.send(stat).is_err() {
            tracing::warn!("Statistics collector is gone, dropping round statistic");
        }
    }
}

/// Episode channel used when no trainer is attached: sums the group reward
/// of each episode and logs it when the episode ends
#[derive(Debug, Default)]
pub struct RewardLedger {
    episode_reward: f64,
    episodes: u32,
}

impl RewardLedger {
    fn close(&mut self, interrupted: bool) {
        tracing::debug!(
            episode = self.episodes,
            reward = self.episode_reward,
            interrupted,
            "Episode closed"
        );
        self.episodes += 1;
        self.episode_reward = 0.0;
    }
}

impl EpisodeChannel for RewardLedger {
    fn add_group_reward(&mut self, reward: f64) {
        self.episode_reward += reward;
    }

    fn end_group_episode(&mut self) {
        self.close(false);
    }

    fn group_episode_interrupted(&mut self) {
        self.close(true);
    }
}

/// Play one round of `scenario` in a fresh environment instance
pub fn run_scenario(
    scenario: &Scenario,
    stats: &UnboundedSender<RoundStatistic>,
    defender_policy: DefenderPolicy,
    rng: &mut StdRng,
) -> Result<RoundResult> {
    let config = ModelConfig {
        seed: Some(rng.gen()),
        ..ModelConfig::from(scenario)
    };

    // The hook fires once the round is over and the instance can be replaced
    let finished = Arc::new(AtomicBool::new(false));
    let flag = finished.clone();
    let collaborators = Collaborators::default()
        .with_stats(ChannelSink::new(stats.clone()))
        .with_episodes(RewardLedger::default())
        .on_round_finished(move |_| flag.store(true, Ordering::Release));

    let mut model = Model::new(config, collaborators)
        .with_context(|| format!("Invalid scenario {:?}", scenario))?;

    let mut result = None;
    while !finished.load(Ordering::Acquire) {
        policy::drive(&mut model, defender_policy, rng)?;
        if let TickOutcome::RoundEnded(r) = model.advance_round() {
            result = Some(r);
        }
    }

    result.context("Round finished without a result")
}

/// One parallel slot: keeps pulling scenarios until the queue is empty
fn run_slot(
    slot: usize,
    queue: Arc<Mutex<VecDeque<Scenario>>>,
    stats: UnboundedSender<RoundStatistic>,
    defender_policy: DefenderPolicy,
    seed: Option<u64>,
) -> Result<u64> {
    let mut rng = seed.map_or_else(StdRng::from_entropy, StdRng::seed_from_u64);
    let mut played = 0;

    loop {
        let Some(scenario) = queue.lock().pop_front() else {
            break;
        };
        let result = run_scenario(&scenario, &stats, defender_policy, &mut rng)?;
        tracing::debug!(
            slot,
            environment = %scenario.environment_type,
            winner = ?result.winner(),
            steps = result.played_steps,
            "Scenario finished"
        );
        played += 1;
    }

    tracing::info!("Slot {} drained after {} scenarios", slot, played);
    Ok(played)
}

/// Run the whole sweep: parallel environment slots, statistics collector and
/// progress endpoint
pub async fn run(config: SweepConfig) -> Result<()> {
    let mut rng = config
        .seed
        .map_or_else(StdRng::from_entropy, StdRng::seed_from_u64);
    let queue = config
        .build_queue(&mut rng)
        .context("Failed to build the scenario queue")?;
    let total = queue.len() as u64;
    let slots = config.parallel_envs.max(1);

    tracing::info!("Starting sweep: {} scenarios on {} slots", total, slots);

    let progress = Progress::new(total);
    let collector = StatsCollector::create(&config.output_dir, Utc::now())?;
    let (tx, rx) = mpsc::unbounded_channel();

    let collector_task = tokio::spawn(collector::run(rx, collector, progress.clone()));
    let server_task = server::spawn(config.http_port, progress.clone());

    let queue = Arc::new(Mutex::new(queue));
    let mut workers = JoinSet::new();
    for slot in 0..slots {
        let queue = queue.clone();
        let tx = tx.clone();
        let seed = config.seed.map(|_| rng.gen());
        let defender_policy = config.defender_policy;
        workers.spawn_blocking(move || run_slot(slot, queue, tx, defender_policy, seed));
    }
    drop(tx);

    let mut played = 0;
    while let Some(joined) = workers.join_next().await {
        played += joined.context("Environment slot panicked")??;
    }

    let path = collector_task.await.context("Collector task panicked")??;
    server_task.abort();

    let stats = progress.snapshot().await;
    tracing::info!(
        "Sweep finished: {} rounds ({} attacker wins, {} defender wins), log at {}",
        played,
        stats.attacker_wins,
        stats.defender_wins,
        path.display()
    );

    Ok(())
}
