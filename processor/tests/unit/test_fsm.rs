//! Status machine tests

use inframgr_processor::deploy::fsm::{StatusEvent, StatusMachine, Transition};
use inframgr_processor::models::deployment::DeploymentStatus;

#[test]
fn test_fsm_initial_state() {
    let fsm = StatusMachine::new(DeploymentStatus::ProvisionRequested);
    assert_eq!(fsm.state(), DeploymentStatus::ProvisionRequested);
    assert!(fsm.error().is_none());
    assert!(!fsm.is_removed());
    assert_eq!(fsm.checks(), 0);
}

#[test]
fn test_fsm_first_check_may_finish_provisioning() {
    let mut fsm = StatusMachine::new(DeploymentStatus::ProvisionRequested);
    fsm.process(StatusEvent::ProvisionAccepted).unwrap();

    assert_eq!(
        fsm.process(StatusEvent::ProvisionSucceeded).unwrap(),
        Transition::To(DeploymentStatus::ProvisionSuccessful)
    );
    assert_eq!(fsm.checks(), 0);
}

#[test]
fn test_fsm_provision_failure_keeps_error() {
    let mut fsm = StatusMachine::new(DeploymentStatus::ProvisionRequested);
    fsm.process(StatusEvent::ProvisionAccepted).unwrap();
    fsm.process(StatusEvent::ProvisionPolled).unwrap();
    fsm.process(StatusEvent::ProvisionFailed("quota exceeded".to_string()))
        .unwrap();

    assert_eq!(fsm.state(), DeploymentStatus::ProvisionError);
    assert_eq!(fsm.error(), Some("quota exceeded"));
    assert!(fsm.process(StatusEvent::ProvisionPolled).is_err());
}

#[test]
fn test_fsm_provision_timeout_stays_in_progress() {
    let mut fsm = StatusMachine::new(DeploymentStatus::ProvisionRequested);
    fsm.process(StatusEvent::ProvisionAccepted).unwrap();

    assert_eq!(
        fsm.process(StatusEvent::ProvisionTimedOut).unwrap(),
        Transition::To(DeploymentStatus::ProvisionInProgress)
    );
    assert!(!fsm.state().is_terminal());
}

#[test]
fn test_fsm_create_requires_requested_status() {
    for status in [
        DeploymentStatus::ProvisionPending,
        DeploymentStatus::ProvisionInProgress,
        DeploymentStatus::ProvisionSuccessful,
        DeploymentStatus::DeleteRequested,
        DeploymentStatus::Unknown,
    ] {
        let mut fsm = StatusMachine::new(status);
        assert!(
            fsm.process(StatusEvent::ProvisionAccepted).is_err(),
            "accepted create from {}",
            status
        );
        assert_eq!(fsm.state(), status);
    }
}

#[test]
fn test_fsm_delete_flow() {
    let mut fsm = StatusMachine::new(DeploymentStatus::DeleteRequested);

    assert_eq!(
        fsm.process(StatusEvent::DeleteAccepted).unwrap(),
        Transition::To(DeploymentStatus::DeletePending)
    );
    assert_eq!(
        fsm.process(StatusEvent::DeletePolled).unwrap(),
        Transition::To(DeploymentStatus::DeleteInProgress)
    );
    fsm.process(StatusEvent::DeletePolled).unwrap();
    assert_eq!(fsm.checks(), 2);
    assert_eq!(
        fsm.process(StatusEvent::DeleteSucceeded).unwrap(),
        Transition::Removed
    );
}

#[test]
fn test_fsm_delete_submission_failure() {
    let mut fsm = StatusMachine::new(DeploymentStatus::DeleteRequested);
    assert_eq!(
        fsm.process(StatusEvent::DeleteFailed("permission denied".to_string()))
            .unwrap(),
        Transition::To(DeploymentStatus::DeleteError)
    );
    assert_eq!(fsm.error(), Some("permission denied"));
}

#[test]
fn test_fsm_delete_timeout_is_an_error() {
    let mut fsm = StatusMachine::new(DeploymentStatus::DeleteRequested);
    fsm.process(StatusEvent::DeleteAccepted).unwrap();
    fsm.process(StatusEvent::DeletePolled).unwrap();

    assert_eq!(
        fsm.process(StatusEvent::DeleteTimedOut).unwrap(),
        Transition::To(DeploymentStatus::DeleteError)
    );
    assert!(fsm.error().is_some());
}

#[test]
fn test_fsm_rejects_cross_lifecycle_events() {
    let mut fsm = StatusMachine::new(DeploymentStatus::ProvisionInProgress);
    assert!(fsm.process(StatusEvent::DeletePolled).is_err());
    assert!(fsm.process(StatusEvent::DeleteSucceeded).is_err());

    let mut fsm = StatusMachine::new(DeploymentStatus::DeletePending);
    assert!(fsm.process(StatusEvent::ProvisionSucceeded).is_err());
    assert_eq!(fsm.state(), DeploymentStatus::DeletePending);
}
