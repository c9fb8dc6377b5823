//! Deployment lifecycle

pub mod fsm;
pub mod orchestrator;
pub mod payload;
pub mod poller;
