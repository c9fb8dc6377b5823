//! Bounded polling of long-running operations

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use openapi_client::models::Operation;
use tracing::{debug, warn};

use crate::errors::ProcessorError;
use crate::http::infra_manager::InfraManager;

/// Number of status checks and the wait before each one
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollBudget {
    pub max_attempts: u32,
    pub interval: Duration,
}

impl PollBudget {
    /// 30 checks, 10s apart
    pub fn provision() -> Self {
        Self {
            max_attempts: 30,
            interval: Duration::from_secs(10),
        }
    }

    /// 10 checks, 5s apart
    pub fn deletion() -> Self {
        Self {
            max_attempts: 10,
            interval: Duration::from_secs(5),
        }
    }
}

/// Poll budgets for both lifecycles
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollOptions {
    pub provision: PollBudget,
    pub deletion: PollBudget,
}

impl Default for PollOptions {
    fn default() -> Self {
        Self {
            provision: PollBudget::provision(),
            deletion: PollBudget::deletion(),
        }
    }
}

/// Result of one step of the poller
#[derive(Debug)]
pub enum PollCheck {
    /// Operation still running after check `attempt`
    Pending { attempt: u32 },

    /// Operation finished, with or without an error
    Done { attempt: u32, operation: Operation },

    /// The status request itself failed; the attempt still counts
    Unreachable { attempt: u32, error: ProcessorError },

    /// Every attempt used without seeing completion
    Exhausted,

    /// Shutdown requested while waiting
    Cancelled,
}

/// Steps through the checks of a single operation
pub struct OperationPoller<'a> {
    infra: &'a dyn InfraManager,
    operation_name: String,
    budget: PollBudget,
    attempt: u32,
    shutdown_signal: Pin<Box<dyn Future<Output = ()> + Send>>,
}

impl<'a> OperationPoller<'a> {
    pub fn new(
        infra: &'a dyn InfraManager,
        operation_name: impl Into<String>,
        budget: PollBudget,
        shutdown_signal: Pin<Box<dyn Future<Output = ()> + Send>>,
    ) -> Self {
        Self {
            infra,
            operation_name: operation_name.into(),
            budget,
            attempt: 0,
            shutdown_signal,
        }
    }

    pub fn budget(&self) -> PollBudget {
        self.budget
    }

    /// Wait one interval, then check the operation once. Callers stop at
    /// the first `Done`, `Exhausted` or `Cancelled`.
    pub async fn next_check<S, F>(&mut self, sleep_fn: S) -> PollCheck
    where
        S: FnOnce(Duration) -> F,
        F: Future<Output = ()>,
    {
        if self.attempt >= self.budget.max_attempts {
            return PollCheck::Exhausted;
        }

        tokio::select! {
            _ = &mut self.shutdown_signal => {
                debug!(operation = %self.operation_name, "Polling cancelled by shutdown");
                return PollCheck::Cancelled;
            }
            _ = sleep_fn(self.budget.interval) => {}
        }

        self.attempt += 1;
        let attempt = self.attempt;

        match self.infra.get_operation(&self.operation_name).await {
            Ok(operation) if operation.done => PollCheck::Done { attempt, operation },
            Ok(_) => PollCheck::Pending { attempt },
            Err(error) => {
                warn!(
                    operation = %self.operation_name,
                    attempt,
                    max_attempts = self.budget.max_attempts,
                    "Error checking operation status (will retry): {}",
                    error
                );
                PollCheck::Unreachable { attempt, error }
            }
        }
    }
}
