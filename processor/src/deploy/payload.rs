//! Blueprint submission payloads

use std::collections::BTreeMap;

use openapi_client::models::{CreateDeploymentRequest, TerraformBlueprint, TerraformVariable};
use serde_json::Value;

use crate::config::Config;
use crate::models::deployment::{DeploymentRecord, UPDATE_SOURCE};
use crate::utils::sanitize_label;

/// Template type whose blueprint creates a project and takes no zone
pub const PROJECT_TEMPLATE: &str = "project";

/// What to deploy, as named by the create request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlueprintTarget {
    pub document_id: String,
    pub template_type: String,
    pub region: String,
}

/// Build the Infrastructure Manager request for a deployment record
pub fn build_create_request(
    config: &Config,
    target: &BlueprintTarget,
    record: &DeploymentRecord,
) -> CreateDeploymentRequest {
    CreateDeploymentRequest {
        terraform_blueprint: TerraformBlueprint {
            gcs_source: config.template_source(&target.template_type),
            input_values: input_values(config, target, &record.variables),
        },
        service_account: config.service_account.resource_name(&config.project.id),
        labels: labels(config, target),
    }
}

/// Record variables first, then defaults for whatever the record left out
fn input_values(
    config: &Config,
    target: &BlueprintTarget,
    variables: &BTreeMap<String, Value>,
) -> BTreeMap<String, TerraformVariable> {
    let mut values: BTreeMap<String, TerraformVariable> = variables
        .iter()
        .map(|(key, value)| (key.clone(), TerraformVariable::new(render_variable(value))))
        .collect();

    values
        .entry("project_id".to_string())
        .or_insert_with(|| TerraformVariable::new(config.project.id.clone()));
    values
        .entry("region".to_string())
        .or_insert_with(|| TerraformVariable::new(target.region.clone()));
    if target.template_type != PROJECT_TEMPLATE {
        values
            .entry("zone".to_string())
            .or_insert_with(|| TerraformVariable::new(config.project.zone.clone()));
    }

    values
}

/// Strings pass through unquoted, anything else as JSON text
fn render_variable(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn labels(config: &Config, target: &BlueprintTarget) -> BTreeMap<String, String> {
    BTreeMap::from([
        ("environment".to_string(), config.environment.to_lowercase()),
        ("created_by".to_string(), UPDATE_SOURCE.to_string()),
        ("template_type".to_string(), target.template_type.clone()),
        ("doc_id".to_string(), sanitize_label(&target.document_id)),
    ])
}
