use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::Parser;

use crate::core::models::{ClientRegistration, UpstreamSettings};
use crate::http::server::ServerOptions;
use crate::relay::{ClientRegistry, DuplicateClient, StateCodec};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("upstream url {url:?} is invalid: {source}")]
    UpstreamUrl {
        url: String,
        source: url::ParseError,
    },
    #[error("failed to read clients file {path:?}: {source}")]
    ClientsFile {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("clients file is malformed: {0}")]
    ClientsFormat(#[from] serde_json::Error),
    #[error(transparent)]
    Duplicate(#[from] DuplicateClient),
    #[error("{0:?} is not a valid CORS origin")]
    Origin(String),
}

#[derive(Parser, Debug)]
#[clap(
    name = "sekishod",
    version = env!("CARGO_PKG_VERSION"),
    author = env!("CARGO_PKG_AUTHORS")
)]
pub struct Config {
    #[clap(long, env = "UPSTREAM_URL")]
    pub upstream_url: String,
    #[clap(long, env = "CLIENTS_FILE")]
    pub clients_file: PathBuf,
    #[clap(long, env = "PATH_PREFIX", default_value = "oauth")]
    pub prefix: String,
    #[clap(long, env = "BIND_ADDRESS", default_value = "0.0.0.0:8001")]
    pub bind: SocketAddr,
    /// Comma-separated
    #[clap(long, env = "CORS_ALLOWED_ORIGINS")]
    pub allowed_origins: Option<String>,
    #[clap(long, env = "DEFAULT_SCHEME", default_value = "http")]
    pub default_scheme: String,
    #[clap(long, env = "UPSTREAM_TIMEOUT_SECS", default_value = "10")]
    pub upstream_timeout_secs: u64,
    #[clap(long, env = "STATE_SECRET", hide_env_values = true)]
    pub state_secret: Option<String>,
}

impl Config {
    pub fn upstream_settings(&self) -> Result<UpstreamSettings, ConfigError> {
        let base_url = validate_upstream_url(&self.upstream_url)?;
        let registrations = load_clients(&self.clients_file)?;
        Ok(UpstreamSettings {
            base_url,
            registrations,
        })
    }

    pub fn server_options(&self) -> Result<ServerOptions, ConfigError> {
        Ok(ServerOptions {
            bind: self.bind,
            prefix: split_prefix(&self.prefix),
            default_scheme: self.default_scheme.clone(),
            allowed_origins: parse_origins(self.allowed_origins.as_deref().unwrap_or_default())?,
        })
    }

    pub fn state_codec(&self) -> StateCodec {
        state_codec(self.state_secret.as_deref())
    }

    pub fn upstream_timeout(&self) -> Duration {
        Duration::from_secs(self.upstream_timeout_secs)
    }
}

pub fn state_codec(secret: Option<&str>) -> StateCodec {
    match secret.filter(|s| !s.is_empty()) {
        Some(secret) => StateCodec::with_secret(secret),
        None => StateCodec::unsigned(),
    }
}

fn validate_upstream_url(raw: &str) -> Result<String, ConfigError> {
    url::Url::parse(raw).map_err(|source| ConfigError::UpstreamUrl {
        url: raw.to_string(),
        source,
    })?;
    Ok(raw.trim_end_matches('/').to_string())
}

pub fn split_prefix(prefix: &str) -> Vec<String> {
    prefix
        .split('/')
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
        .collect()
}

pub fn parse_origins(raw: &str) -> Result<Vec<String>, ConfigError> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|origin| {
            let origin = origin.trim_end_matches('/');
            let parsed =
                url::Url::parse(origin).map_err(|_| ConfigError::Origin(origin.to_string()))?;
            if parsed.origin().ascii_serialization() == origin {
                Ok(origin.to_string())
            } else {
                Err(ConfigError::Origin(origin.to_string()))
            }
        })
        .collect()
}

pub fn parse_clients(json: &str) -> Result<Vec<ClientRegistration>, ConfigError> {
    let registrations: Vec<ClientRegistration> = serde_json::from_str(json)?;
    ClientRegistry::from_registrations(registrations.iter().cloned())?;
    Ok(registrations)
}

pub fn load_clients(path: &Path) -> Result<Vec<ClientRegistration>, ConfigError> {
    let json = std::fs::read_to_string(path).map_err(|source| ConfigError::ClientsFile {
        path: path.to_path_buf(),
        source,
    })?;
    parse_clients(&json)
}
