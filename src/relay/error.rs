use super::state::StateError;
use super::upstream::UpstreamResponse;

#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    /// Caller input the relay refuses to act on.
    #[error("{0}")]
    BadRequest(&'static str),
    #[error("missing or malformed bearer token")]
    Unauthorized,
    #[error("request body exceeds {0} bytes")]
    PayloadTooLarge(u64),
    /// Upstream answered with a non-success status.
    #[error("upstream responded with status {}", .0.status)]
    Upstream(UpstreamResponse),
    #[error("upstream transport failure: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("internal error: {0}")]
    Internal(String),
}

impl RelayError {
    pub fn invalid_state() -> Self {
        Self::BadRequest("Invalid state parameter")
    }

    pub fn invalid_client() -> Self {
        Self::BadRequest("Invalid 'client_id'")
    }
}

impl From<StateError> for RelayError {
    fn from(_: StateError) -> Self {
        Self::invalid_state()
    }
}

impl From<url::ParseError> for RelayError {
    fn from(e: url::ParseError) -> Self {
        Self::Internal(e.to_string())
    }
}
