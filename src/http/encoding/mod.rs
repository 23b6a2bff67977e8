pub mod error;
pub mod reply;

use futures::TryStreamExt;
use warp::{Buf, Filter, Rejection, Stream};

use crate::core::models::Origin;
use crate::core::types::{BearerToken, Parameters};
use crate::relay::RelayError;

const MAX_FORM_BYTES: u64 = 16 * 1024;

/// First entry of a possibly comma-separated forwarding header.
fn first_forwarded(value: Option<String>) -> Option<String> {
    value
        .as_deref()
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(ToString::to_string)
}

/// Extracts the scheme, host and base path the request was addressed to,
/// honouring `X-Forwarded-Proto` and `X-Forwarded-Host`.
pub fn origin(
    default_scheme: String,
    base_path: String,
) -> impl Filter<Extract = (Origin,), Error = Rejection> + Clone {
    warp::header::optional::<String>("x-forwarded-proto")
        .and(warp::header::optional::<String>("x-forwarded-host"))
        .and(warp::header::optional::<String>("host"))
        .and_then(
            move |proto: Option<String>, forwarded: Option<String>, host: Option<String>| {
                let default_scheme = default_scheme.clone();
                let base_path = base_path.clone();
                async move {
                    let host = first_forwarded(forwarded)
                        .or_else(|| host.filter(|h| !h.is_empty()))
                        .ok_or_else(|| {
                            RelayError::Internal("request carries no host".to_string())
                        });
                    reply::accept(host.map(|host| Origin {
                        scheme: first_forwarded(proto).unwrap_or(default_scheme),
                        host,
                        base_path,
                    }))
                }
            },
        )
}

pub fn query_params() -> impl Filter<Extract = (Parameters,), Error = Rejection> + Clone {
    warp::query::<Parameters>()
}

/// Buffers a form body of at most `limit` bytes. A declared `Content-Length`
/// over the limit is refused before reading; chunked bodies are cut off once
/// they cross it.
async fn read_form<S, B>(declared: Option<u64>, body: S, limit: u64) -> Result<Parameters, RelayError>
where
    S: Stream<Item = Result<B, warp::Error>>,
    B: Buf,
{
    if declared.map_or(false, |length| length > limit) {
        return Err(RelayError::PayloadTooLarge(limit));
    }

    futures::pin_mut!(body);
    let mut buffer = Vec::new();
    while let Some(mut chunk) = body
        .try_next()
        .await
        .map_err(|_| RelayError::BadRequest("Unreadable request body"))?
    {
        if (buffer.len() + chunk.remaining()) as u64 > limit {
            return Err(RelayError::PayloadTooLarge(limit));
        }
        buffer.extend_from_slice(&chunk.copy_to_bytes(chunk.remaining()));
    }
    Ok(Parameters::parse(&buffer))
}

async fn form_body<S, B>(declared: Option<u64>, body: S) -> Result<Parameters, Rejection>
where
    S: Stream<Item = Result<B, warp::Error>>,
    B: Buf,
{
    reply::accept(read_form(declared, body, MAX_FORM_BYTES).await)
}

pub fn form_params() -> impl Filter<Extract = (Parameters,), Error = Rejection> + Clone {
    warp::header::optional::<u64>("content-length")
        .and(warp::body::stream())
        .and_then(form_body)
}

pub fn bearer() -> impl Filter<Extract = (BearerToken,), Error = Rejection> + Clone {
    warp::header::optional::<String>("authorization").and_then(|s: Option<String>| async move {
        let token = match s.as_deref().and_then(|s| s.split_once(' ')) {
            Some((scheme, token))
                if scheme.eq_ignore_ascii_case("bearer") && !token.trim().is_empty() =>
            {
                Ok(BearerToken(token.trim().to_string()))
            }
            _ => Err(RelayError::Unauthorized),
        };
        reply::accept(token)
    })
}
