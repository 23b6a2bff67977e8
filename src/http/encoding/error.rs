use tracing::{event, Level};
use warp::http::StatusCode;
use warp::reply::{Reply, Response};
use warp::Rejection;

use super::reply::upstream_reply;
use crate::relay::RelayError;

#[derive(Debug)]
pub struct RelayRejection(pub RelayError);

impl warp::reject::Reject for RelayRejection {}

impl From<RelayError> for RelayRejection {
    fn from(error: RelayError) -> Self {
        Self(error)
    }
}

fn plain(status: StatusCode, message: &str) -> Response {
    warp::reply::with_status(message.to_string(), status).into_response()
}

pub fn error_response(error: &RelayError) -> Response {
    match error {
        RelayError::BadRequest(message) => plain(StatusCode::BAD_REQUEST, message),
        RelayError::Unauthorized => warp::reply::with_header(
            plain(StatusCode::UNAUTHORIZED, "Unauthorized"),
            "www-authenticate",
            "Bearer",
        )
        .into_response(),
        RelayError::PayloadTooLarge(_) => {
            plain(StatusCode::PAYLOAD_TOO_LARGE, "Payload Too Large")
        }
        RelayError::Upstream(response) => upstream_reply(response.clone(), None),
        RelayError::Transport(_) => {
            plain(StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error")
        }
        RelayError::Internal(detail) => {
            event!(Level::ERROR, %detail, "Internal relay failure");
            plain(StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error")
        }
    }
}

pub async fn handle_reject(err: Rejection) -> Result<Response, Rejection> {
    match err.find::<RelayRejection>() {
        Some(RelayRejection(e)) => Ok(error_response(e)),
        None => Err(err),
    }
}
