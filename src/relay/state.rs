//! Caller intent carried through the upstream provider as the OAuth2 `state`.
//!
//! A token is `base64url(json(CallerState))` without padding. When the codec
//! holds a secret, a `.`-separated HMAC-SHA256 tag over the payload part is
//! appended and required on decode.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::core::models::CallerState;

type HmacSha256 = Hmac<Sha256>;

const TAG_SEPARATOR: char = '.';

#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("malformed state token: {0}")]
    Malformed(String),
    #[error("state token is missing redirect_uri")]
    Incomplete,
    #[error("state token failed integrity check")]
    Tampered,
}

/// Raw payload shape; `redirect_uri` may be absent on the wire.
#[derive(serde::Deserialize)]
struct StatePayload {
    redirect_uri: Option<String>,
}

#[derive(Clone, Default)]
pub struct StateCodec {
    secret: Option<Vec<u8>>,
}

impl std::fmt::Debug for StateCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StateCodec")
            .field("signed", &self.secret.is_some())
            .finish()
    }
}

impl StateCodec {
    /// Baseline codec: base64url JSON, no integrity tag.
    pub fn unsigned() -> Self {
        Self { secret: None }
    }

    pub fn with_secret(secret: impl AsRef<[u8]>) -> Self {
        Self {
            secret: Some(secret.as_ref().to_vec()),
        }
    }

    pub fn is_signed(&self) -> bool {
        self.secret.is_some()
    }

    pub fn encode(&self, state: &CallerState) -> Result<String, StateError> {
        let json = serde_json::to_vec(state).map_err(|e| StateError::Malformed(e.to_string()))?;
        let payload = URL_SAFE_NO_PAD.encode(json);

        match self.mac()? {
            Some(mut mac) => {
                mac.update(payload.as_bytes());
                let tag = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());
                Ok(format!("{}{}{}", payload, TAG_SEPARATOR, tag))
            }
            None => Ok(payload),
        }
    }

    pub fn decode(&self, token: &str) -> Result<CallerState, StateError> {
        let payload = match self.mac()? {
            Some(mut mac) => {
                let (payload, tag) = token
                    .rsplit_once(TAG_SEPARATOR)
                    .ok_or(StateError::Tampered)?;
                let tag = URL_SAFE_NO_PAD
                    .decode(tag)
                    .map_err(|_| StateError::Tampered)?;
                mac.update(payload.as_bytes());
                mac.verify_slice(&tag).map_err(|_| StateError::Tampered)?;
                payload
            }
            None => token,
        };

        let json = URL_SAFE_NO_PAD
            .decode(payload)
            .map_err(|e| StateError::Malformed(e.to_string()))?;
        let parsed: StatePayload =
            serde_json::from_slice(&json).map_err(|e| StateError::Malformed(e.to_string()))?;

        match parsed.redirect_uri {
            Some(uri) => Ok(CallerState {
                redirect_uri: crate::core::types::RedirectUri(uri),
            }),
            None => Err(StateError::Incomplete),
        }
    }

    fn mac(&self) -> Result<Option<HmacSha256>, StateError> {
        self.secret
            .as_ref()
            .map(|secret| {
                HmacSha256::new_from_slice(secret).map_err(|e| StateError::Malformed(e.to_string()))
            })
            .transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::RedirectUri;

    fn caller(uri: &str) -> CallerState {
        CallerState {
            redirect_uri: RedirectUri(uri.to_string()),
        }
    }

    #[test]
    fn round_trips_redirect_uri() {
        let codec = StateCodec::unsigned();
        for uri in [
            "https://app.example/cb",
            "http://localhost:3000/auth/callback?tenant=a&x=%20",
            "myapp://redirect",
            "https://例え.jp/コールバック",
        ] {
            let token = codec.encode(&caller(uri)).unwrap();
            assert_eq!(codec.decode(&token).unwrap(), caller(uri));
        }
    }

    #[test]
    fn token_matches_wire_format() {
        let token = StateCodec::unsigned()
            .encode(&caller("https://app.example/cb"))
            .unwrap();
        let json = URL_SAFE_NO_PAD.decode(&token).unwrap();

        assert_eq!(
            String::from_utf8(json).unwrap(),
            r#"{"redirect_uri":"https://app.example/cb"}"#
        );
        assert!(!token.contains('='));
        assert!(!token.contains('+'));
        assert!(!token.contains('/'));
    }

    #[test]
    fn rejects_invalid_base64() {
        let err = StateCodec::unsigned().decode("not base64!").unwrap_err();
        assert!(matches!(err, StateError::Malformed(_)));
    }

    #[test]
    fn rejects_padded_base64() {
        let padded = base64::engine::general_purpose::URL_SAFE.encode(r#"{"redirect_uri":"a"}"#);
        assert!(padded.ends_with('='));

        let err = StateCodec::unsigned().decode(&padded).unwrap_err();
        assert!(matches!(err, StateError::Malformed(_)));
    }

    #[test]
    fn rejects_unparseable_payload() {
        let token = URL_SAFE_NO_PAD.encode("definitely not json");
        let err = StateCodec::unsigned().decode(&token).unwrap_err();
        assert!(matches!(err, StateError::Malformed(_)));
    }

    #[test]
    fn rejects_payload_without_redirect_uri() {
        let token = URL_SAFE_NO_PAD.encode(r#"{"something_else":"x"}"#);
        let err = StateCodec::unsigned().decode(&token).unwrap_err();
        assert!(matches!(err, StateError::Incomplete));
    }

    #[test]
    fn signed_round_trip() {
        let codec = StateCodec::with_secret("correct horse battery staple");
        let token = codec.encode(&caller("https://app.example/cb")).unwrap();

        assert!(token.contains(TAG_SEPARATOR));
        assert_eq!(
            codec.decode(&token).unwrap(),
            caller("https://app.example/cb")
        );
    }

    #[test]
    fn signed_codec_rejects_swapped_payload() {
        let codec = StateCodec::with_secret("s3cret");
        let token = codec.encode(&caller("https://app.example/cb")).unwrap();
        let (_, tag) = token.rsplit_once(TAG_SEPARATOR).unwrap();
        let evil = URL_SAFE_NO_PAD.encode(r#"{"redirect_uri":"https://evil.example"}"#);

        let err = codec.decode(&format!("{}.{}", evil, tag)).unwrap_err();
        assert!(matches!(err, StateError::Tampered));
    }

    #[test]
    fn signed_codec_rejects_untagged_and_foreign_tokens() {
        let signed = StateCodec::with_secret("s3cret");
        let unsigned_token = StateCodec::unsigned()
            .encode(&caller("https://app.example/cb"))
            .unwrap();
        let foreign_token = StateCodec::with_secret("other")
            .encode(&caller("https://app.example/cb"))
            .unwrap();

        assert!(matches!(
            signed.decode(&unsigned_token).unwrap_err(),
            StateError::Tampered
        ));
        assert!(matches!(
            signed.decode(&foreign_token).unwrap_err(),
            StateError::Tampered
        ));
    }
}
