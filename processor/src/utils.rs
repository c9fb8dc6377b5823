//! Utility functions

use serde::{Deserialize, Serialize};

/// Version information for the processor
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VersionInfo {
    pub version: String,
    pub git_hash: String,
    pub build_time: String,
}

/// Get version information
pub fn version_info() -> VersionInfo {
    VersionInfo {
        version: env!("CARGO_PKG_VERSION").to_string(),
        git_hash: option_env!("GIT_HASH").unwrap_or("unknown").to_string(),
        build_time: option_env!("BUILD_TIME").unwrap_or("unknown").to_string(),
    }
}

/// Eight lowercase alphanumeric characters
pub fn random_suffix() -> String {
    uuid::Uuid::new_v4().simple().to_string()[..8].to_string()
}

/// Milliseconds since the Unix epoch
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Infrastructure Manager deployment id: `deploy-{millis}-{suffix}`
pub fn generate_deployment_id() -> String {
    format!("deploy-{}-{}", now_millis(), random_suffix())
}

/// Request id attached to every inbound request: `req-{millis}-{suffix}`
pub fn generate_request_id() -> String {
    format!("req-{}-{}", now_millis(), random_suffix())
}

/// Lowercase and replace every char outside `[a-z0-9-]` with `-`,
/// the shape GCP accepts for label values.
pub fn sanitize_label(value: &str) -> String {
    value
        .to_lowercase()
        .chars()
        .map(|c| {
            if c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' {
                c
            } else {
                '-'
            }
        })
        .collect()
}
