//! Infrastructure Manager API models

pub mod models;
