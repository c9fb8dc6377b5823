//! Environment-driven service configuration

use secrecy::SecretString;
use url::Url;

use crate::errors::ProcessorError;
use crate::logs::{LogFormat, LogLevel, LogOptions};

const REQUIRED_VARS: [&str; 3] = ["PROJECT_ID", "REGION", "ZONE"];

/// Processor configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub project: ProjectConfig,
    pub storage: StorageConfig,
    pub service_account: ServiceAccountConfig,
    pub service: ServiceConfig,
    pub endpoints: EndpointConfig,
    pub firestore: FirestoreConfig,
    pub store_backend: StoreBackend,

    /// Deployment environment label (`development`, `production`, ...)
    pub environment: String,

    /// Static OAuth token; the metadata server is used when unset
    pub access_token: Option<SecretString>,

    pub log: LogOptions,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectConfig {
    pub id: String,
    pub region: String,
    pub zone: String,
}

/// Cloud Storage locations of blueprints and Terraform state
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageConfig {
    pub terraform_bucket: String,
    pub terraform_state_bucket: String,
    pub catalog_path: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceAccountConfig {
    pub name: String,
}

impl ServiceAccountConfig {
    pub fn email(&self, project_id: &str) -> String {
        format!("{}@{}.iam.gserviceaccount.com", self.name, project_id)
    }

    /// Full resource name expected by Infrastructure Manager
    pub fn resource_name(&self, project_id: &str) -> String {
        format!(
            "projects/{}/serviceAccounts/{}",
            project_id,
            self.email(project_id)
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceConfig {
    pub host: String,
    pub port: u16,
    pub url: String,
}

/// Base URLs of the Google APIs, overridable for emulators and tests
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointConfig {
    pub infra_manager: String,
    pub firestore: String,
    pub metadata: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FirestoreConfig {
    pub database: String,
    pub collection: String,
}

/// Which document store backs deployment records
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StoreBackend {
    #[default]
    Firestore,
    Memory,
}

impl std::str::FromStr for StoreBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "firestore" => Ok(StoreBackend::Firestore),
            "memory" => Ok(StoreBackend::Memory),
            _ => Err(format!("Invalid store backend: {}", s)),
        }
    }
}

impl Config {
    /// Load configuration from the process environment
    pub fn from_env() -> Result<Self, ProcessorError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    /// Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ProcessorError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        for var in REQUIRED_VARS {
            if get(var).is_none() {
                return Err(ProcessorError::ConfigError(format!(
                    "{} environment variable is required but not set",
                    var
                )));
            }
        }

        let project = ProjectConfig {
            id: get("PROJECT_ID").unwrap_or_default(),
            region: get("REGION").unwrap_or_default(),
            zone: get("ZONE").unwrap_or_default(),
        };

        let storage = StorageConfig {
            terraform_bucket: get("TERRAFORM_BUCKET")
                .unwrap_or_else(|| format!("{}-catalog", project.id)),
            terraform_state_bucket: get("TERRAFORM_STATE_BUCKET")
                .unwrap_or_else(|| format!("{}-state", project.id)),
            catalog_path: get("TERRAFORM_CATALOG_PATH").unwrap_or_else(|| "templates".to_string()),
        };

        let port = match get("PORT") {
            Some(port) => port
                .parse::<u16>()
                .map_err(|e| ProcessorError::ConfigError(format!("Invalid PORT {}: {}", port, e)))?,
            None => 8080,
        };

        let service = ServiceConfig {
            host: get("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port,
            url: get("SERVICE_URL").unwrap_or_else(|| "http://localhost:8080".to_string()),
        };

        let endpoints = EndpointConfig {
            infra_manager: parse_endpoint(
                "INFRA_MANAGER_ENDPOINT",
                get("INFRA_MANAGER_ENDPOINT"),
                "https://config.googleapis.com/v1",
            )?,
            firestore: parse_endpoint(
                "FIRESTORE_ENDPOINT",
                get("FIRESTORE_ENDPOINT"),
                "https://firestore.googleapis.com/v1",
            )?,
            metadata: parse_endpoint(
                "METADATA_ENDPOINT",
                get("METADATA_ENDPOINT"),
                "http://metadata.google.internal/computeMetadata/v1",
            )?,
        };

        let firestore = FirestoreConfig {
            database: get("FIRESTORE_DATABASE").unwrap_or_else(|| "(default)".to_string()),
            collection: get("DEPLOYMENTS_COLLECTION").unwrap_or_else(|| "deployments".to_string()),
        };

        let store_backend = match get("STORE_BACKEND") {
            Some(value) => value.parse().map_err(ProcessorError::ConfigError)?,
            None => StoreBackend::default(),
        };

        let log = LogOptions {
            log_level: match get("LOG_LEVEL") {
                Some(value) => value.parse().map_err(ProcessorError::ConfigError)?,
                None => LogLevel::default(),
            },
            format: match get("LOG_FORMAT") {
                Some(value) => value.parse().map_err(ProcessorError::ConfigError)?,
                None => LogFormat::default(),
            },
        };

        Ok(Self {
            project,
            storage,
            service_account: ServiceAccountConfig {
                name: get("SERVICE_ACCOUNT_NAME").unwrap_or_else(|| "inframgr-sa".to_string()),
            },
            service,
            endpoints,
            firestore,
            store_backend,
            environment: get("ENVIRONMENT")
                .or_else(|| get("NODE_ENV"))
                .unwrap_or_else(|| "development".to_string())
                .to_lowercase(),
            access_token: get("GOOGLE_OAUTH_ACCESS_TOKEN").map(SecretString::from),
            log,
        })
    }

    /// `gs://` URI of a template directory in the catalog bucket
    pub fn template_source(&self, template_type: &str) -> String {
        format!(
            "gs://{}/{}/{}",
            self.storage.terraform_bucket, self.storage.catalog_path, template_type
        )
    }

    /// `gs://` URI of the Terraform state bucket
    pub fn state_source(&self) -> String {
        format!("gs://{}", self.storage.terraform_state_bucket)
    }

    /// Cloud console page of an Infrastructure Manager deployment
    pub fn console_url(&self, region: &str, deployment_id: &str) -> String {
        format!(
            "https://console.cloud.google.com/config-management/deployments/detail/{}/{}?project={}",
            region, deployment_id, self.project.id
        )
    }
}

fn parse_endpoint(
    name: &str,
    value: Option<String>,
    default: &str,
) -> Result<String, ProcessorError> {
    let raw = value.unwrap_or_else(|| default.to_string());
    Url::parse(&raw)
        .map_err(|e| ProcessorError::ConfigError(format!("Invalid {} {}: {}", name, raw, e)))?;
    Ok(raw.trim_end_matches('/').to_string())
}
