use tracing::{event, Level};

use super::{OAuth2Relay, Redirect, RelayError};
use crate::core::types::Parameters;

impl OAuth2Relay {
    /// Sends the caller back to the address recovered from `state`, carrying
    /// every parameter the upstream provider returned.
    #[tracing::instrument(skip_all)]
    pub fn callback(&self, params: Parameters) -> Result<Redirect, RelayError> {
        event!(Level::TRACE, "Handling upstream callback");

        let token = params.get("state").ok_or_else(|| {
            event!(Level::DEBUG, "Callback without state");
            RelayError::invalid_state()
        })?;

        let caller = self.codec.decode(token).map_err(|e| {
            event!(Level::DEBUG, error = %e, "Callback state rejected");
            RelayError::from(e)
        })?;

        if caller.redirect_uri.is_empty() {
            event!(Level::DEBUG, "Callback state has an empty redirect_uri");
            return Err(RelayError::invalid_state());
        }

        let uri = caller.redirect_uri.as_ref();
        let separator = if uri.contains('?') { '&' } else { '?' };
        let location = format!("{}{}{}", uri, separator, params.to_query_string());

        event!(Level::DEBUG, "Redirecting to caller");
        Ok(Redirect { location })
    }
}
