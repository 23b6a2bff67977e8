use tracing::{event, Level};

use super::{OAuth2Relay, RelayError, UpstreamResponse};
use crate::core::types::BearerToken;

impl OAuth2Relay {
    /// Forwards a bearer-authenticated userinfo request. The upstream reply
    /// is returned whatever its status.
    #[tracing::instrument(skip_all)]
    pub async fn userinfo(&self, token: BearerToken) -> Result<UpstreamResponse, RelayError> {
        let response = self.upstream.userinfo(&token).await.map_err(|e| {
            event!(Level::ERROR, error = ?e, "Userinfo request could not reach upstream");
            RelayError::Transport(e)
        })?;

        if !response.is_success() {
            event!(
                Level::ERROR,
                status = response.status,
                body = %response.body_text(),
                "Userinfo request failed upstream"
            );
        }
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use crate::core::types::BearerToken;
    use crate::relay::testing::*;

    #[tokio::test]
    async fn passes_token_and_reply_through() {
        let upstream = RecordingUpstream::replying(200, r#"{"sub":"42","email":"a@b.c"}"#);
        let relay = relay_with(upstream.clone());

        let response = relay
            .userinfo(BearerToken("token-123".to_string()))
            .await
            .unwrap();

        assert_eq!(response.status, 200);
        assert_eq!(response.body_text(), r#"{"sub":"42","email":"a@b.c"}"#);
        assert_eq!(upstream.userinfo_requests(), vec!["token-123".to_string()]);
    }

    #[tokio::test]
    async fn non_success_reply_is_returned_unchanged() {
        let upstream = RecordingUpstream::replying(401, r#"{"error":"invalid_token"}"#);
        let relay = relay_with(upstream);

        let response = relay
            .userinfo(BearerToken("expired".to_string()))
            .await
            .unwrap();

        assert_eq!(response.status, 401);
        assert_eq!(response.body_text(), r#"{"error":"invalid_token"}"#);
    }

    #[tokio::test]
    async fn non_success_reply_is_logged_as_error() {
        let events = CapturedEvents::default();
        let _guard = events.install();
        let relay = relay_with(RecordingUpstream::replying(403, "{}"));

        relay
            .userinfo(BearerToken("revoked".to_string()))
            .await
            .unwrap();

        assert_eq!(
            events.at(tracing::Level::ERROR),
            vec!["Userinfo request failed upstream".to_string()]
        );
        assert!(events.at(tracing::Level::WARN).is_empty());
    }
}
