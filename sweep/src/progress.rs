use crate::estimator::{Estimate, RuntimeEstimator};
use chrono::Utc;
use serde::Serialize;
use shared::{RoundStatistic, Winner};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Progress of the running sweep, shared between the collector and the
/// HTTP endpoint
#[derive(Clone)]
pub struct Progress {
    inner: Arc<RwLock<ProgressInner>>,
}

struct ProgressInner {
    sweep_id: Uuid,
    rounds_finished: u64,
    attacker_wins: u64,
    defender_wins: u64,
    estimator: RuntimeEstimator,
    last_estimate: Option<Estimate>,
}

/// Snapshot served by `GET /api/stats`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SweepStats {
    pub sweep_id: Uuid,
    pub rounds_finished: u64,
    pub total_rounds: u64,
    pub attacker_wins: u64,
    pub defender_wins: u64,
    pub percent_done: f64,
    /// RFC 3339 timestamp, absent until the first round finished
    pub eta: Option<String>,
    pub uptime_seconds: u64,
}

impl Progress {
    pub fn new(total_rounds: u64) -> Self {
        Self {
            inner: Arc::new(RwLock::new(ProgressInner {
                sweep_id: Uuid::new_v4(),
                rounds_finished: 0,
                attacker_wins: 0,
                defender_wins: 0,
                estimator: RuntimeEstimator::new(total_rounds),
                last_estimate: None,
            })),
        }
    }

    /// Count one finished round and return the refreshed estimate
    pub async fn record(&self, stat: &RoundStatistic) -> Option<Estimate> {
        let mut inner = self.inner.write().await;

        inner.rounds_finished += 1;
        match stat.winner {
            Some(Winner::Attacker) => inner.attacker_wins += 1,
            Some(Winner::Defender) => inner.defender_wins += 1,
            None => {}
        }

        let estimate = inner
            .estimator
            .estimate(inner.rounds_finished, Instant::now(), Utc::now());
        inner.last_estimate = estimate.clone();
        estimate
    }

    pub async fn snapshot(&self) -> SweepStats {
        let inner = self.inner.read().await;
        let total_rounds = inner.estimator.total_rounds();

        SweepStats {
            sweep_id: inner.sweep_id,
            rounds_finished: inner.rounds_finished,
            total_rounds,
            attacker_wins: inner.attacker_wins,
            defender_wins: inner.defender_wins,
            percent_done: if total_rounds == 0 {
                100.0
            } else {
                100.0 * inner.rounds_finished as f64 / total_rounds as f64
            },
            eta: inner.last_estimate.as_ref().map(|e| e.eta.to_rfc3339()),
            uptime_seconds: inner.estimator.elapsed().as_secs(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn won_by(winner: Winner) -> RoundStatistic {
        RoundStatistic {
            winner: Some(winner),
            ..RoundStatistic::default()
        }
    }

    #[tokio::test]
    async fn test_counts_wins() {
        let progress = Progress::new(4);
        assert!(progress.snapshot().await.eta.is_none());

        progress.record(&won_by(Winner::Attacker)).await;
        progress.record(&won_by(Winner::Defender)).await;
        let estimate = progress.record(&won_by(Winner::Attacker)).await;
        assert!(estimate.is_some());

        let stats = progress.snapshot().await;
        assert_eq!(stats.rounds_finished, 3);
        assert_eq!(stats.total_rounds, 4);
        assert_eq!(stats.attacker_wins, 2);
        assert_eq!(stats.defender_wins, 1);
        assert_eq!(stats.percent_done, 75.0);
        assert!(stats.eta.is_some());
    }

    #[tokio::test]
    async fn test_clones_share_state() {
        let progress = Progress::new(2);
        let handle = progress.clone();
        handle.record(&RoundStatistic::default()).await;
        assert_eq!(progress.snapshot().await.rounds_finished, 1);
    }
}
