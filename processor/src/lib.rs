//! Infra-manager processor library
//!
//! Orchestrates sandbox deployments: validates deployment records kept in
//! Firestore, submits Terraform blueprints and deletions to Infrastructure
//! Manager and tracks the resulting operations.

pub mod app;
pub mod authn;
pub mod config;
pub mod deploy;
pub mod errors;
pub mod http;
pub mod logs;
pub mod models;
pub mod server;
pub mod store;
pub mod utils;
