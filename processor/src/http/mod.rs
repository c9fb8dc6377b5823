//! Outbound HTTP clients

pub mod client;
pub mod infra_manager;
