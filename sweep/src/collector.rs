use crate::progress::Progress;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use shared::RoundStatistic;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::task;

/// Flush the log after this many events
const FLUSH_EVERY: usize = 10;

/// Append-only JSON-lines log of round statistics
pub struct StatsCollector {
    path: PathBuf,
    writer: BufWriter<File>,
    written: usize,
}

pub fn file_name(started: DateTime<Utc>) -> String {
    started
        .format("statistics-%Y-%m-%d-%H-%M-%S.jsonl")
        .to_string()
}

impl StatsCollector {
    /// Create the log for a sweep started at `started`. Never overwrites an
    /// existing log.
    pub fn create(dir: &Path, started: DateTime<Utc>) -> Result<Self> {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create output directory {}", dir.display()))?;

        let path = dir.join(file_name(started));
        let file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .with_context(|| format!("Refusing to overwrite statistics log {}", path.display()))?;

        tracing::info!("Writing statistics to {}", path.display());

        Ok(Self {
            path,
            writer: BufWriter::new(file),
            written: 0,
        })
    }

    pub fn written(&self) -> usize {
        self.written
    }

    pub fn write(&mut self, stat: &RoundStatistic) -> Result<()> {
        let missing = stat.missing_fields();
        if !missing.is_empty() {
            tracing::warn!(?missing, "round statistic has unset fields");
        }

        let line = stat.to_json_line().context("Failed to serialize round statistic")?;
        writeln!(self.writer, "{}", line).context("Failed to write statistics log")?;
        self.written += 1;

        if self.written % FLUSH_EVERY == 0 {
            self.writer.flush().context("Failed to flush statistics log")?;
        }
        Ok(())
    }

    pub fn finish(mut self) -> Result<PathBuf> {
        self.writer.flush().context("Failed to flush statistics log")?;
        Ok(self.path)
    }
}

/// Drain the statistics channel until every sender is gone
pub async fn run(
    mut rx: UnboundedReceiver<RoundStatistic>,
    mut collector: StatsCollector,
    progress: Progress,
) -> Result<PathBuf> {
    while let Some(stat) = rx.recv().await {
        let estimate = progress.record(&stat).await;

        collector = task::spawn_blocking(move || -> Result<StatsCollector> {
            collector.write(&stat)?;
            Ok(collector)
        })
        .await
        .context("Statistics writer panicked")??;

        if let Some(estimate) = estimate {
            tracing::info!(
                "{:.1}% done, {:.2?} per round, {:.0?} left, ETA {}",
                estimate.percent_done,
                estimate.per_round,
                estimate.remaining,
                estimate.eta.format("%Y-%m-%d %H:%M:%S UTC")
            );
        }
    }

    tracing::info!("Statistics channel closed after {} events", collector.written());
    task::spawn_blocking(move || collector.finish())
        .await
        .context("Statistics writer panicked")?
}
