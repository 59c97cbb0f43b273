// file: src/config.rs
// description: application configuration management with toml and environment support
// reference: https://docs.rs/config

use crate::error::{Result, ServiceError};
use crate::utils::validation::Validator;
use dotenvy::dotenv;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Flat environment variables recognised on top of the prefixed ones.
const ENV_OVERRIDES: &[(&str, &str)] = &[
    ("ES_URL", "elasticsearch.url"),
    ("ES_API_KEY", "elasticsearch.api_key"),
    ("ES_USERNAME", "elasticsearch.username"),
    ("ES_PASSWORD", "elasticsearch.password"),
    ("ES_CA_CERT", "elasticsearch.ca_cert"),
    ("ES_INDEX", "elasticsearch.index"),
    ("PROPERTIES_SEARCH_TEMPLATE", "elasticsearch.template_id"),
    ("ELSER_INFERENCE_ID", "elasticsearch.inference_id"),
    ("GOOGLE_MAPS_API_KEY", "geocoding.api_key"),
    ("MCP_PORT", "server.port"),
];

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub elasticsearch: ElasticsearchConfig,
    pub geocoding: GeocodingConfig,
    pub server: ServerConfig,
    pub ingest: IngestConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ElasticsearchConfig {
    pub url: String,
    pub api_key: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub ca_cert: Option<PathBuf>,
    pub insecure: bool,
    pub timeout_secs: u64,
    pub index: String,
    pub raw_index: String,
    pub template_id: String,
    pub inference_id: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GeocodingConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub region: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    pub transport: String,
    pub host: String,
    pub port: u16,
    pub inference_check_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct IngestConfig {
    pub dataset_url: String,
    pub data_dir: PathBuf,
    pub workers: usize,
    pub chunk_size: usize,
    pub poll_interval_secs: u64,
    pub max_poll_failures: u32,
    pub keep_raw_index: bool,
}

/// How requests to Elasticsearch authenticate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EsAuth {
    None,
    ApiKey(String),
    Basic { username: String, password: String },
}

/// Credential kind an operator asks for on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMode {
    ApiKey,
    Basic,
}

impl FromStr for AuthMode {
    type Err = String;

    fn from_str(value: &str) -> std::result::Result<Self, Self::Err> {
        match value {
            "api-key" | "api_key" | "apikey" => Ok(AuthMode::ApiKey),
            "basic" => Ok(AuthMode::Basic),
            other => Err(format!("unknown auth mode '{}' (expected api-key or basic)", other)),
        }
    }
}

impl ElasticsearchConfig {
    /// Resolve the credentials that are actually usable. Empty strings count as
    /// unset so that `ES_API_KEY=` in a `.env` file behaves like no key at all.
    pub fn auth(&self) -> Result<EsAuth> {
        let api_key = non_empty(&self.api_key);
        let username = non_empty(&self.username);
        let password = non_empty(&self.password);

        match (username, password) {
            (Some(_), None) => Err(ServiceError::Config(
                "password must be provided when username is provided".to_string(),
            )),
            (None, Some(_)) => Err(ServiceError::Config(
                "username must be provided when password is provided".to_string(),
            )),
            (Some(username), Some(password)) if api_key.is_none() => Ok(EsAuth::Basic {
                username: username.to_string(),
                password: password.to_string(),
            }),
            _ => Ok(api_key
                .map(|key| EsAuth::ApiKey(key.to_string()))
                .unwrap_or(EsAuth::None)),
        }
    }

    /// Keeps only the credentials of `mode`, failing when they are missing.
    pub fn restrict_auth(&mut self, mode: AuthMode) -> Result<()> {
        match mode {
            AuthMode::ApiKey => {
                if non_empty(&self.api_key).is_none() {
                    return Err(ServiceError::Config(
                        "api-key auth requires ES_API_KEY".to_string(),
                    ));
                }
                self.username = None;
                self.password = None;
            }
            AuthMode::Basic => {
                if non_empty(&self.username).is_none() || non_empty(&self.password).is_none() {
                    return Err(ServiceError::Config(
                        "basic auth requires ES_USERNAME and ES_PASSWORD".to_string(),
                    ));
                }
                self.api_key = None;
            }
        }
        Ok(())
    }

    pub fn ca_cert_path(&self) -> Option<&Path> {
        self.ca_cert
            .as_deref()
            .filter(|path| !path.as_os_str().is_empty())
    }
}

impl GeocodingConfig {
    pub fn api_key(&self) -> Option<&str> {
        non_empty(&self.api_key)
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

impl Config {
    pub fn load(path: Option<&Path>) -> Result<Self> {
        dotenv().ok();

        let defaults = Self::default_config();
        let mut builder = config::Config::builder()
            .add_source(
                config::Config::try_from(&defaults)
                    .map_err(|e| ServiceError::Config(e.to_string()))?,
            );

        builder = match path {
            Some(path) => builder.add_source(config::File::from(path)),
            None => builder
                .add_source(config::File::from(Path::new("config/default.toml")).required(false)),
        };

        builder = builder.add_source(
            config::Environment::with_prefix("PROPERTY_SEARCH")
                .separator("__")
                .try_parsing(true),
        );

        for (var, key) in ENV_OVERRIDES {
            let value = std::env::var(var).ok().filter(|v| !v.trim().is_empty());
            builder = builder
                .set_override_option(*key, value)
                .map_err(|e| ServiceError::Config(e.to_string()))?;
        }

        let settings = builder
            .build()
            .map_err(|e| ServiceError::Config(e.to_string()))?;

        let config: Config = settings
            .try_deserialize()
            .map_err(|e| ServiceError::Config(e.to_string()))?;

        config.validate()?;
        Ok(config)
    }

    pub fn default_config() -> Self {
        Self {
            elasticsearch: ElasticsearchConfig {
                url: "http://localhost:9200".to_string(),
                api_key: None,
                username: None,
                password: None,
                ca_cert: None,
                insecure: false,
                timeout_secs: 300,
                index: "properties".to_string(),
                raw_index: "properties_raw".to_string(),
                template_id: "properties-search-template".to_string(),
                inference_id: ".elser-2-elasticsearch".to_string(),
            },
            geocoding: GeocodingConfig {
                api_key: None,
                base_url: "https://maps.googleapis.com/maps/api/geocode/json".to_string(),
                region: "us".to_string(),
                timeout_secs: 30,
            },
            server: ServerConfig {
                transport: "stdio".to_string(),
                host: "127.0.0.1".to_string(),
                port: 8000,
                inference_check_secs: 300,
            },
            ingest: IngestConfig {
                dataset_url:
                    "https://sunmanapp.blob.core.windows.net/publicstuff/properties/properties.json"
                        .to_string(),
                data_dir: PathBuf::from("./data"),
                workers: 4,
                chunk_size: 200,
                poll_interval_secs: 10,
                max_poll_failures: 5,
                keep_raw_index: false,
            },
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.elasticsearch.url.trim().is_empty() {
            return Err(ServiceError::Config(
                "Elasticsearch URL cannot be empty".to_string(),
            ));
        }
        Validator::validate_url(self.elasticsearch.url.trim())?;
        Validator::validate_url(&self.geocoding.base_url)?;

        self.elasticsearch.auth()?;

        if let Some(path) = self.elasticsearch.ca_cert_path() {
            Validator::validate_ca_cert_file(path)?;
        }

        if self.elasticsearch.template_id.trim().is_empty() {
            return Err(ServiceError::Config(
                "template_id cannot be empty".to_string(),
            ));
        }

        if self.elasticsearch.index == self.elasticsearch.raw_index {
            return Err(ServiceError::Config(
                "index and raw_index must differ".to_string(),
            ));
        }

        if self.elasticsearch.timeout_secs == 0 || self.geocoding.timeout_secs == 0 {
            return Err(ServiceError::Config(
                "request timeouts must be greater than 0".to_string(),
            ));
        }

        Validator::validate_port(self.server.port)?;

        if self.ingest.workers == 0 {
            return Err(ServiceError::Config(
                "workers must be greater than 0".to_string(),
            ));
        }

        Validator::validate_chunk_size(self.ingest.chunk_size)?;

        Ok(())
    }
}
