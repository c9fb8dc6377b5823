//! Inbound HTTP API

pub mod handlers;
pub mod request_id;
pub mod serve;
pub mod state;
