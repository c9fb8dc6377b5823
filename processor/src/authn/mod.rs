//! Google API credentials

pub mod access_token;
