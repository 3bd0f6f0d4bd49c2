/*!
 * Synthetic workload runner
 *
 * Pushes a batch of tasks through a `ResilientExecutor` wired to the
 * configured limiter and tallies how each one ended.
 */

use futures::future::join_all;
use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use steadfast_core_resilience::{ExecutionError, ResilientExecutor, Task};
use thiserror::Error;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::config::SteadfastConfig;
use crate::error::Result;

/// Failure raised by a synthetic task
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("task {index} failed on attempt {attempt}")]
pub struct SimulatedFailure {
    pub index: usize,
    pub attempt: u32,
}

/// Shape of the synthetic workload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Workload {
    /// Number of tasks to submit
    pub tasks: usize,

    /// Every Nth task fails its first attempt (None or 0 = never)
    pub fail_every: Option<u32>,
}

impl Default for Workload {
    fn default() -> Self {
        Self {
            tasks: 20,
            fail_every: None,
        }
    }
}

impl Workload {
    fn fails_first_attempt(&self, index: usize) -> bool {
        match self.fail_every {
            Some(n) if n > 0 => (index + 1) % n as usize == 0,
            _ => false,
        }
    }
}

/// Tally of a finished simulation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SimulationReport {
    pub succeeded: usize,
    pub rejected: usize,
    pub failed: usize,
    pub cancelled: usize,
    pub elapsed: Duration,
}

impl SimulationReport {
    pub fn total(&self) -> usize {
        self.succeeded + self.rejected + self.failed + self.cancelled
    }

    /// True when every task succeeded
    pub fn is_complete(&self) -> bool {
        self.succeeded == self.total()
    }

    fn record(&mut self, outcome: &std::result::Result<usize, ExecutionError<SimulatedFailure>>) {
        match outcome {
            Ok(_) => self.succeeded += 1,
            Err(ExecutionError::Rejected { .. }) => self.rejected += 1,
            Err(ExecutionError::Cancelled) => self.cancelled += 1,
            Err(ExecutionError::Closed) | Err(ExecutionError::Task(_)) => self.failed += 1,
        }
    }
}

impl fmt::Display for SimulationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "succeeded: {}", self.succeeded)?;
        writeln!(f, "rejected:  {}", self.rejected)?;
        writeln!(f, "failed:    {}", self.failed)?;
        if self.cancelled > 0 {
            writeln!(f, "cancelled: {}", self.cancelled)?;
        }
        write!(f, "elapsed:   {:.3}s", self.elapsed.as_secs_f64())
    }
}

/// Build the task for workload slot `index`
fn synthetic_task(index: usize, fail_first: bool) -> Task<usize, SimulatedFailure> {
    let attempts = Arc::new(AtomicU32::new(0));
    Task::new(move || {
        let attempts = Arc::clone(&attempts);
        async move {
            let attempt = attempts.fetch_add(1, Ordering::SeqCst) + 1;
            if fail_first && attempt == 1 {
                Err(SimulatedFailure { index, attempt })
            } else {
                Ok(index)
            }
        }
    })
}

/// Run `workload` under `config` until every task has finished or `cancel` fires
pub async fn run_simulation(
    config: &SteadfastConfig,
    workload: &Workload,
    cancel: &CancellationToken,
) -> Result<SimulationReport> {
    config.validate()?;

    let limiter = Arc::new(config.limiter.build::<usize, SimulatedFailure>()?);
    let executor = ResilientExecutor::new(config.retry.predicate()).with_limiter(Arc::clone(&limiter));

    info!(
        tasks = workload.tasks,
        capacity = limiter.capacity(),
        rate_per_second = limiter.rate_per_second(),
        "starting simulation"
    );

    let started = Instant::now();
    let calls = (0..workload.tasks).map(|index| {
        let task = synthetic_task(index, workload.fails_first_attempt(index));
        let executor = &executor;
        async move { executor.call_with_cancel(task, cancel).await }
    });
    let outcomes = join_all(calls).await;
    limiter.close();

    let mut report = SimulationReport {
        elapsed: started.elapsed(),
        ..Default::default()
    };
    for outcome in &outcomes {
        if let Err(e) = outcome {
            debug!(error = %e, "task did not succeed");
        }
        report.record(outcome);
    }

    info!(
        succeeded = report.succeeded,
        rejected = report.rejected,
        failed = report.failed,
        "simulation finished"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::HandlerKind;

    fn config(capacity: u32, rate: u32, max_attempts: u32) -> SteadfastConfig {
        let mut config = SteadfastConfig::default();
        config.limiter.capacity = capacity;
        config.limiter.rate_per_second = rate;
        config.retry.max_attempts = max_attempts;
        config.retry.delay_ms = 10;
        config
    }

    #[test]
    fn test_fail_every() {
        let workload = Workload {
            tasks: 6,
            fail_every: Some(3),
        };
        let failing: Vec<usize> = (0..6).filter(|i| workload.fails_first_attempt(*i)).collect();
        assert_eq!(failing, vec![2, 5]);

        let never = Workload {
            tasks: 6,
            fail_every: Some(0),
        };
        assert!(!(0..6).any(|i| never.fails_first_attempt(i)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_single_attempt_rejects_overflow() {
        let report = run_simulation(
            &config(1, 10, 1),
            &Workload {
                tasks: 3,
                fail_every: None,
            },
            &CancellationToken::new(),
        )
        .await
        .unwrap();

        assert_eq!(report.succeeded, 1);
        assert_eq!(report.rejected, 2);
        assert!(!report.is_complete());
    }

    #[tokio::test(start_paused = true)]
    async fn test_retries_absorb_failures_and_rejections() {
        let report = run_simulation(
            &config(2, 100, 20),
            &Workload {
                tasks: 5,
                fail_every: Some(2),
            },
            &CancellationToken::new(),
        )
        .await
        .unwrap();

        assert_eq!(report.succeeded, 5);
        assert!(report.is_complete());
        assert!(report.elapsed > Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_handler_needs_no_executor_retries() {
        let mut config = config(1, 10, 1);
        config.limiter.handler = HandlerKind::WaitAndRetry { max_waits: None };

        let report = run_simulation(
            &config,
            &Workload {
                tasks: 4,
                fail_every: None,
            },
            &CancellationToken::new(),
        )
        .await
        .unwrap();

        assert_eq!(report.succeeded, 4);
        assert!(report.elapsed >= Duration::from_millis(300));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_stops_waiting_tasks() {
        let mut config = config(1, 1, 1);
        config.limiter.handler = HandlerKind::WaitAndRetry { max_waits: None };
        let cancel = CancellationToken::new();

        let interrupt = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            interrupt.cancel();
        });

        let report = run_simulation(
            &config,
            &Workload {
                tasks: 3,
                fail_every: None,
            },
            &cancel,
        )
        .await
        .unwrap();

        assert_eq!(report.succeeded, 1);
        assert_eq!(report.cancelled, 2);
        assert_eq!(report.elapsed, Duration::from_millis(50));
    }

    #[tokio::test]
    async fn test_cancelled_before_start() {
        let cancel = CancellationToken::new();
        cancel.cancel();

        let report = run_simulation(&config(10, 10, 3), &Workload::default(), &cancel)
            .await
            .unwrap();
        assert_eq!(report.cancelled, 20);
        assert!(report.to_string().contains("cancelled: 20"));
    }

    #[tokio::test]
    async fn test_invalid_config_is_fatal() {
        let err = run_simulation(
            &config(1000, 9, 3),
            &Workload::default(),
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();
        assert!(err.is_fatal());
    }
}
