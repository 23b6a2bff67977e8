use std::sync::Arc;

use crate::core::models::UpstreamSettings;

pub mod authorize;
pub mod callback;
pub mod error;
pub mod registry;
pub mod state;
pub mod token;
pub mod upstream;
pub mod userinfo;

pub use error::RelayError;
pub use registry::{ClientRegistry, DuplicateClient};
pub use state::{StateCodec, StateError};
pub use upstream::{HttpUpstream, Upstream, UpstreamResponse};

/// Where a relay sends its caller next.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Redirect {
    pub location: String,
}

/// Shared, read-only context for all four relays.
pub struct OAuth2Relay {
    settings: UpstreamSettings,
    registry: ClientRegistry,
    codec: StateCodec,
    upstream: Arc<dyn Upstream>,
}

impl std::fmt::Debug for OAuth2Relay {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OAuth2Relay")
            .field("base_url", &self.settings.base_url)
            .field("clients", &self.registry.len())
            .field("codec", &self.codec)
            .finish()
    }
}

impl OAuth2Relay {
    pub fn new(
        settings: UpstreamSettings,
        codec: StateCodec,
        upstream: Arc<dyn Upstream>,
    ) -> Result<Self, DuplicateClient> {
        let registry = ClientRegistry::from_registrations(settings.registrations.iter().cloned())?;
        Ok(Self {
            settings,
            registry,
            codec,
            upstream,
        })
    }

    pub fn settings(&self) -> &UpstreamSettings {
        &self.settings
    }

    pub fn registry(&self) -> &ClientRegistry {
        &self.registry
    }

    pub fn codec(&self) -> &StateCodec {
        &self.codec
    }
}
