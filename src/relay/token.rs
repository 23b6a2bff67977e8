use tracing::{event, Level};

use super::{OAuth2Relay, RelayError, UpstreamResponse};
use crate::core::models::Origin;
use crate::core::types::{ClientId, Parameters};

impl OAuth2Relay {
    /// Completes a token request on behalf of a public client.
    ///
    /// The registered secret and the relay's callback address are written
    /// into the form before it is posted upstream; whatever the caller sent
    /// for either is overwritten.
    #[tracing::instrument(skip_all, fields(client_id = ?params.get("client_id")))]
    pub async fn exchange_token(
        &self,
        origin: &Origin,
        mut params: Parameters,
    ) -> Result<UpstreamResponse, RelayError> {
        event!(Level::TRACE, "Handling token request");

        let client_id = ClientId(params.get("client_id").unwrap_or_default().to_string());
        let registration = self.registry.get(&client_id).ok_or_else(|| {
            event!(Level::DEBUG, "Unknown client_id");
            RelayError::invalid_client()
        })?;

        params.set("client_secret", registration.client_secret.as_ref());
        params.set("redirect_uri", origin.callback_uri().0);

        event!(Level::DEBUG, slug = ?registration.slug, "Forwarding token request upstream");
        let response = self.upstream.exchange_token(&params).await.map_err(|e| {
            event!(Level::ERROR, error = ?e, "Token request could not reach upstream");
            RelayError::Transport(e)
        })?;

        if !response.is_success() {
            event!(
                Level::ERROR,
                status = response.status,
                body = %response.body_text(),
                "Token exchange failed upstream"
            );
            return Err(RelayError::Upstream(response));
        }

        event!(Level::DEBUG, "Token exchange succeeded");
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use crate::relay::testing::*;
    use crate::relay::RelayError;

    #[tokio::test]
    async fn injects_registered_secret_and_callback() {
        let upstream = RecordingUpstream::replying(200, r#"{"access_token":"at"}"#);
        let relay = relay_with(upstream.clone());

        let response = relay
            .exchange_token(
                &origin(),
                params(&[
                    ("grant_type", "authorization_code"),
                    ("client_id", "cid1"),
                    ("code", "abc"),
                    ("client_secret", "guessed"),
                    ("redirect_uri", "https://app.example/cb"),
                ]),
            )
            .await
            .unwrap();

        assert_eq!(response.body_text(), r#"{"access_token":"at"}"#);

        let forwarded = upstream.token_requests();
        assert_eq!(forwarded.len(), 1);
        let form = &forwarded[0];
        assert_eq!(form.get("client_secret"), Some("secret1"));
        assert_eq!(
            form.get("redirect_uri"),
            Some("https://relay.example/oauth/callback")
        );
        assert_eq!(form.get("client_id"), Some("cid1"));
        assert_eq!(form.get("code"), Some("abc"));
        assert_eq!(form.get("grant_type"), Some("authorization_code"));
    }

    #[tokio::test]
    async fn forwards_repeated_parameters() {
        let upstream = RecordingUpstream::replying(200, "{}");
        let relay = relay_with(upstream.clone());

        relay
            .exchange_token(
                &origin(),
                params(&[
                    ("client_id", "cid1"),
                    ("code", "abc"),
                    ("resource", "https://api.one.example"),
                    ("resource", "https://api.two.example"),
                ]),
            )
            .await
            .unwrap();

        let form = &upstream.token_requests()[0];
        assert_eq!(
            form.get_all("resource").collect::<Vec<_>>(),
            vec!["https://api.one.example", "https://api.two.example"]
        );
    }

    #[tokio::test]
    async fn picks_secret_per_client() {
        let upstream = RecordingUpstream::replying(200, "{}");
        let relay = relay_with(upstream.clone());

        relay
            .exchange_token(&origin(), params(&[("client_id", "cid2"), ("code", "x")]))
            .await
            .unwrap();

        assert_eq!(
            upstream.token_requests()[0].get("client_secret"),
            Some("secret2")
        );
    }

    #[tokio::test]
    async fn unknown_client_never_reaches_upstream() {
        let upstream = RecordingUpstream::replying(200, "{}");
        let relay = relay_with(upstream.clone());

        let err = relay
            .exchange_token(
                &origin(),
                params(&[("client_id", "nobody"), ("code", "abc")]),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, RelayError::BadRequest("Invalid 'client_id'")));
        assert!(upstream.token_requests().is_empty());
    }

    #[tokio::test]
    async fn missing_client_id_is_rejected() {
        let upstream = RecordingUpstream::replying(200, "{}");
        let relay = relay_with(upstream.clone());

        let err = relay
            .exchange_token(&origin(), params(&[("code", "abc")]))
            .await
            .unwrap_err();

        assert!(matches!(err, RelayError::BadRequest(_)));
        assert!(upstream.token_requests().is_empty());
    }

    #[tokio::test]
    async fn upstream_rejection_is_propagated() {
        let upstream = RecordingUpstream::replying(401, r#"{"error":"invalid_client"}"#);
        let relay = relay_with(upstream.clone());

        let err = relay
            .exchange_token(&origin(), params(&[("client_id", "cid1"), ("code", "abc")]))
            .await
            .unwrap_err();

        match err {
            RelayError::Upstream(response) => {
                assert_eq!(response.status, 401);
                assert_eq!(response.body_text(), r#"{"error":"invalid_client"}"#);
            }
            other => panic!("expected upstream error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn unreachable_upstream_is_transport_error() {
        let settings = settings();
        let upstream = crate::relay::HttpUpstream::new(
            &crate::core::models::UpstreamSettings {
                base_url: "http://127.0.0.1:1".to_string(),
                registrations: vec![],
            },
            std::time::Duration::from_secs(2),
        )
        .unwrap();
        let relay = crate::relay::OAuth2Relay::new(
            settings,
            crate::relay::StateCodec::unsigned(),
            Arc::new(upstream),
        )
        .unwrap();

        let err = relay
            .exchange_token(&origin(), params(&[("client_id", "cid1"), ("code", "abc")]))
            .await
            .unwrap_err();

        assert!(matches!(err, RelayError::Transport(_)));
    }
}
