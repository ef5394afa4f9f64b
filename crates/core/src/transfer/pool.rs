//! Bounded worker pool over a pre-filled job queue

use std::sync::Arc;

use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinSet;

use super::executor::TransferExecutor;
use super::job::TransferJob;
use super::progress::{self, ProgressSink};
use super::stats::{StatsAggregator, TransferOutcome, TransferStats};
use crate::error::{Error, Result};

/// Clamp a requested worker count to at least one
pub fn worker_count(requested: i64) -> usize {
    usize::try_from(requested).unwrap_or(0).max(1)
}

/// Workers actually spawned for `jobs` queued jobs
fn pool_size(concurrency: usize, jobs: usize) -> usize {
    concurrency.max(1).min(jobs)
}

/// Run every job with at most `concurrency` in flight
///
/// The queue holds all jobs up front and is closed before any worker starts,
/// so workers stop as soon as it drains. `progress` advances by one per
/// finished job, failed or not. Each job yields exactly one outcome; after
/// cancellation the remaining jobs are still drained, each failing as
/// cancelled without touching the store.
pub async fn run_pool(
    jobs: Vec<TransferJob>,
    executor: Arc<TransferExecutor>,
    concurrency: usize,
    progress: Arc<dyn ProgressSink>,
) -> Result<TransferStats> {
    let total = jobs.len();
    progress.set_total(Some(total as u64));
    if total == 0 {
        progress.finish();
        return Ok(TransferStats::default());
    }

    let (job_tx, job_rx) = mpsc::channel::<TransferJob>(total);
    for job in jobs {
        job_tx
            .try_send(job)
            .map_err(|e| Error::General(format!("failed to queue transfer job: {e}")))?;
    }
    drop(job_tx);

    let job_rx = Arc::new(Mutex::new(job_rx));
    let (outcome_tx, mut outcome_rx) = mpsc::channel::<TransferOutcome>(total);
    let workers = pool_size(concurrency, total);

    tracing::debug!(jobs = total, workers, "starting transfer pool");

    let mut set = JoinSet::new();
    for worker in 0..workers {
        let job_rx = Arc::clone(&job_rx);
        let outcome_tx = outcome_tx.clone();
        let executor = Arc::clone(&executor);
        let progress = Arc::clone(&progress);

        set.spawn(async move {
            let bytes = progress::noop();
            loop {
                let next = job_rx.lock().await.recv().await;
                let Some(job) = next else { break };

                let outcome = match executor.execute(&job, &bytes).await {
                    Ok(_) => TransferOutcome::success(job),
                    Err(e) => {
                        if !e.is_cancelled() {
                            tracing::warn!(worker, error = %e, "transfer failed");
                        }
                        TransferOutcome::failure(job, e)
                    }
                };
                progress.inc(1);

                if outcome_tx.send(outcome).await.is_err() {
                    break;
                }
            }
        });
    }
    drop(outcome_tx);

    while let Some(joined) = set.join_next().await {
        if let Err(e) = joined {
            tracing::warn!(error = %e, "transfer worker aborted");
        }
    }
    progress.finish();

    let mut aggregator = StatsAggregator::new(total);
    while let Some(outcome) = outcome_rx.recv().await {
        aggregator.record(outcome);
    }
    let stats = aggregator.finish();

    if executor.is_cancelled() {
        tracing::debug!(failed = stats.failed, "transfer pool cancelled");
    }
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_worker_count_coerces_non_positive() {
        assert_eq!(worker_count(0), 1);
        assert_eq!(worker_count(-3), 1);
        assert_eq!(worker_count(1), 1);
        assert_eq!(worker_count(8), 8);
    }

    #[test]
    fn test_pool_size_never_exceeds_jobs() {
        assert_eq!(pool_size(100_000, 3), 3);
        assert_eq!(pool_size(4, 10), 4);
        assert_eq!(pool_size(0, 10), 1);
        assert_eq!(pool_size(12, 1), 1);
    }
}
