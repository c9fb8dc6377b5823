//! Sandbox processor API models

pub mod models;
