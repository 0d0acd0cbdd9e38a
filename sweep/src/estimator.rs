use chrono::{DateTime, Utc};
use std::time::{Duration, Instant};

/// Extrapolates the remaining sweep time from the mean time per round
#[derive(Debug, Clone)]
pub struct RuntimeEstimator {
    started: Instant,
    total_rounds: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Estimate {
    pub per_round: Duration,
    pub percent_done: f64,
    pub remaining: Duration,
    pub eta: DateTime<Utc>,
}

impl RuntimeEstimator {
    pub fn new(total_rounds: u64) -> Self {
        Self::starting_at(Instant::now(), total_rounds)
    }

    pub fn starting_at(started: Instant, total_rounds: u64) -> Self {
        Self {
            started,
            total_rounds,
        }
    }

    pub fn total_rounds(&self) -> u64 {
        self.total_rounds
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// `None` until the first round finished
    pub fn estimate(&self, finished: u64, now: Instant, wall_now: DateTime<Utc>) -> Option<Estimate> {
        if finished == 0 || self.total_rounds == 0 {
            return None;
        }

        let elapsed = now.saturating_duration_since(self.started);
        let per_round = elapsed.div_f64(finished as f64);
        let left = self.total_rounds.saturating_sub(finished);
        let remaining = per_round.mul_f64(left as f64);
        let eta = wall_now + chrono::Duration::from_std(remaining).ok()?;

        Some(Estimate {
            per_round,
            percent_done: 100.0 * finished as f64 / self.total_rounds as f64,
            remaining,
            eta,
        })
    }
}
