//! Status state machine for deployment records

use crate::errors::ProcessorError;
use crate::models::deployment::DeploymentStatus;

/// Event observed while provisioning or deleting a deployment
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusEvent {
    /// Create request accepted
    ProvisionAccepted,

    /// Status check reported the create operation still running
    ProvisionPolled,

    /// Create operation finished without error
    ProvisionSucceeded,

    /// Create operation finished with an error, or submission failed
    ProvisionFailed(String),

    /// Poll budget exhausted; the operation keeps running out-of-band
    ProvisionTimedOut,

    /// Deletion submitted and acknowledged with an operation handle
    DeleteAccepted,

    /// Status check reported the delete operation still running
    DeletePolled,

    /// Delete operation finished without error
    DeleteSucceeded,

    /// Delete operation finished with an error, or submission failed
    DeleteFailed(String),

    /// Poll budget exhausted before the deletion reported completion
    DeleteTimedOut,
}

/// Outcome of a transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Write this status to the record
    To(DeploymentStatus),

    /// The record is removed
    Removed,
}

/// Tracks one record through its lifecycle and rejects transitions the
/// lifecycle does not allow
#[derive(Debug, Clone)]
pub struct StatusMachine {
    state: DeploymentStatus,
    removed: bool,
    error: Option<String>,
    checks: u32,
}

impl StatusMachine {
    /// Start from the status currently stored on the record
    pub fn new(state: DeploymentStatus) -> Self {
        Self {
            state,
            removed: false,
            error: None,
            checks: 0,
        }
    }

    pub fn state(&self) -> DeploymentStatus {
        self.state
    }

    pub fn is_removed(&self) -> bool {
        self.removed
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Non-terminal status checks seen so far
    pub fn checks(&self) -> u32 {
        self.checks
    }

    /// Process an event and transition state
    pub fn process(&mut self, event: StatusEvent) -> Result<Transition, ProcessorError> {
        use DeploymentStatus::*;

        if self.removed {
            return Err(ProcessorError::InvalidTransition(format!(
                "record removed, cannot apply {:?}",
                event
            )));
        }

        let next = match (self.state, &event) {
            // Provisioning
            (ProvisionRequested, StatusEvent::ProvisionAccepted) => ProvisionPending,
            (ProvisionPending | ProvisionInProgress, StatusEvent::ProvisionPolled) => {
                self.checks += 1;
                ProvisionInProgress
            }
            (ProvisionPending | ProvisionInProgress, StatusEvent::ProvisionSucceeded) => {
                ProvisionSuccessful
            }
            (ProvisionPending | ProvisionInProgress, StatusEvent::ProvisionFailed(err)) => {
                self.error = Some(err.clone());
                ProvisionError
            }
            (ProvisionPending | ProvisionInProgress, StatusEvent::ProvisionTimedOut) => {
                ProvisionInProgress
            }

            // Deletion
            (DeleteRequested, StatusEvent::DeleteAccepted) => DeletePending,
            (DeletePending | DeleteInProgress, StatusEvent::DeletePolled) => {
                self.checks += 1;
                DeleteInProgress
            }
            (DeletePending | DeleteInProgress, StatusEvent::DeleteSucceeded) => {
                self.removed = true;
                return Ok(Transition::Removed);
            }
            (DeleteRequested | DeletePending | DeleteInProgress, StatusEvent::DeleteFailed(err)) => {
                self.error = Some(err.clone());
                DeleteError
            }
            (DeletePending | DeleteInProgress, StatusEvent::DeleteTimedOut) => {
                self.error = Some("deletion status check timed out".to_string());
                DeleteError
            }

            (state, event) => {
                return Err(ProcessorError::InvalidTransition(format!(
                    "{} -> {:?}",
                    state, event
                )));
            }
        };

        self.state = next;
        Ok(Transition::To(next))
    }
}
