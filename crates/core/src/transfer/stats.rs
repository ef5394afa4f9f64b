//! Batch outcome accounting

use serde::Serialize;

use super::job::TransferJob;
use crate::error::Error;

/// Result of one executed (or skipped) job
#[derive(Debug)]
pub struct TransferOutcome {
    pub job: TransferJob,
    pub error: Option<Error>,
}

impl TransferOutcome {
    pub fn success(job: TransferJob) -> Self {
        Self { job, error: None }
    }

    pub fn failure(job: TransferJob, error: Error) -> Self {
        Self {
            job,
            error: Some(error),
        }
    }
}

/// One failed transfer in a batch
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransferFailure {
    pub source: String,
    pub destination: String,
    pub error: String,
}

/// Final tally of a batch transfer
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TransferStats {
    pub total_files: usize,
    pub succeeded: usize,
    pub failed: usize,
    /// Listed keys that produced no job; not part of `total_files`
    pub skipped: usize,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub failures: Vec<TransferFailure>,
}

impl TransferStats {
    /// Every job succeeded
    pub fn is_complete(&self) -> bool {
        self.failed == 0
    }

    /// At least one job failed
    pub fn is_partial_failure(&self) -> bool {
        self.failed > 0
    }

    /// Human summary line
    pub fn summary(&self) -> String {
        let mut line = format!(
            "Total: {}, succeeded: {}, failed: {}",
            self.total_files, self.succeeded, self.failed
        );
        if self.skipped > 0 {
            line.push_str(&format!(", skipped: {}", self.skipped));
        }
        line
    }
}

/// Folds job outcomes into [`TransferStats`]
#[derive(Debug)]
pub struct StatsAggregator {
    stats: TransferStats,
}

impl StatsAggregator {
    pub fn new(total_files: usize) -> Self {
        Self {
            stats: TransferStats {
                total_files,
                ..Default::default()
            },
        }
    }

    pub fn record(&mut self, outcome: TransferOutcome) {
        match outcome.error {
            None => self.stats.succeeded += 1,
            Some(error) => {
                self.stats.failed += 1;
                self.stats.failures.push(TransferFailure {
                    source: outcome.job.source.to_string(),
                    destination: outcome.job.destination.to_string(),
                    error: error.root_cause().to_string(),
                });
            }
        }
    }

    /// Close the tally
    ///
    /// Jobs that produced no outcome (a worker died mid-job) count as failed,
    /// keeping `succeeded + failed == total_files`.
    pub fn finish(mut self) -> TransferStats {
        let recorded = self.stats.succeeded + self.stats.failed;
        if recorded < self.stats.total_files {
            let missing = self.stats.total_files - recorded;
            tracing::warn!(missing, "transfer jobs finished without an outcome");
            self.stats.failed += missing;
        }
        self.stats
    }
}
