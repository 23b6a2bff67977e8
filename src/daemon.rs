use std::sync::Arc;

use tracing::{event, Level};
use tracing_subscriber::EnvFilter;

use crate::http::server::Server;
use crate::relay::{DuplicateClient, HttpUpstream, OAuth2Relay};
use crate::util::config::{Config, ConfigError};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Duplicate(#[from] DuplicateClient),
    #[error("failed to build upstream client: {0}")]
    Upstream(#[from] reqwest::Error),
    #[error("server failed: {0}")]
    Serve(#[from] warp::Error),
}

pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).try_init().ok();
}

pub async fn sekishod(config: Config) -> Result<(), Error> {
    let settings = config.upstream_settings()?;
    let upstream = HttpUpstream::new(&settings, config.upstream_timeout())?;
    let relay = OAuth2Relay::new(settings, config.state_codec(), Arc::new(upstream))?;

    event!(
        Level::INFO,
        upstream = %relay.settings().base_url,
        clients = relay.registry().len(),
        signed_state = relay.codec().is_signed(),
        "Relay configured"
    );
    if !relay.codec().is_signed() {
        event!(Level::WARN, "STATE_SECRET is unset; state tokens carry no integrity tag");
    }

    let server = Server::new(Arc::new(relay), config.server_options()?);
    server.serve().await?;
    Ok(())
}
