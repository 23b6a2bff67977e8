use tracing::{event, Level};
use url::Url;

use super::{OAuth2Relay, Redirect, RelayError};
use crate::core::models::{CallerState, Origin};
use crate::core::types::{Parameters, RedirectUri};

impl OAuth2Relay {
    /// Rewrites an inbound authorization request into a redirect to the
    /// upstream authorization endpoint.
    ///
    /// The caller's `redirect_uri` moves into the `state` token and is
    /// replaced by the relay's own callback address. Any caller-supplied
    /// `state` is discarded.
    #[tracing::instrument(skip_all, fields(client_id = ?params.get("client_id")))]
    pub fn authorize(&self, origin: &Origin, mut params: Parameters) -> Result<Redirect, RelayError> {
        event!(Level::TRACE, "Handling authorization request");

        let caller = CallerState {
            redirect_uri: RedirectUri(params.get("redirect_uri").unwrap_or_default().to_string()),
        };
        if caller.redirect_uri.is_empty() {
            event!(Level::DEBUG, "Authorization request carries no redirect_uri");
        }

        let state = self
            .codec
            .encode(&caller)
            .map_err(|e| RelayError::Internal(e.to_string()))?;
        params.set("state", state);
        params.set("redirect_uri", origin.callback_uri().0);

        let mut url = Url::parse(&self.settings.authorize_endpoint())?;
        url.query_pairs_mut().extend_pairs(params.iter());

        event!(Level::DEBUG, "Redirecting to upstream authorization endpoint");
        Ok(Redirect {
            location: url.to_string(),
        })
    }
}
