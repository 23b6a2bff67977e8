use super::types::*;

#[derive(Debug, Clone, serde::Deserialize)]
pub struct ClientRegistration {
    #[serde(alias = "ClientId")]
    pub client_id: ClientId,
    #[serde(alias = "ClientSecret")]
    pub client_secret: ClientSecret,
    #[serde(alias = "Slug")]
    pub slug: UpstreamSlug,
}

#[derive(Debug, Clone)]
pub struct UpstreamSettings {
    pub base_url: String,
    pub registrations: Vec<ClientRegistration>,
}

impl UpstreamSettings {
    pub fn authorize_endpoint(&self) -> String {
        self.endpoint("authorize")
    }

    pub fn token_endpoint(&self) -> String {
        self.endpoint("token")
    }

    pub fn userinfo_endpoint(&self) -> String {
        self.endpoint("userinfo")
    }

    fn endpoint(&self, name: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), name)
    }
}

/// Caller intent carried through the upstream provider inside `state`.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct CallerState {
    pub redirect_uri: RedirectUri,
}

/// Scheme, host and base path the inbound request was addressed to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Origin {
    pub scheme: String,
    pub host: String,
    pub base_path: String,
}

impl Origin {
    /// The fixed address the upstream provider redirects back to.
    pub fn callback_uri(&self) -> RedirectUri {
        let base_path = self.base_path.trim_end_matches('/');
        RedirectUri(format!(
            "{}://{}{}/callback",
            self.scheme, self.host, base_path
        ))
    }
}
