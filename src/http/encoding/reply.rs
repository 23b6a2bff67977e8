use tracing::{event, Level};
use warp::http::header::{
    HeaderValue, ACCESS_CONTROL_ALLOW_CREDENTIALS, ACCESS_CONTROL_ALLOW_HEADERS,
    ACCESS_CONTROL_ALLOW_METHODS, ACCESS_CONTROL_ALLOW_ORIGIN, CONTENT_TYPE, LOCATION, VARY,
};
use warp::http::StatusCode;
use warp::hyper::Body;
use warp::reply::{Reply, Response};
use warp::Rejection;

use super::error::RelayRejection;
use crate::relay::{Redirect, RelayError, UpstreamResponse};

impl Reply for Redirect {
    fn into_response(self) -> Response {
        match HeaderValue::from_bytes(self.location.as_bytes()) {
            Ok(location) => {
                let mut response = Response::new(Body::empty());
                *response.status_mut() = StatusCode::FOUND;
                response.headers_mut().insert(LOCATION, location);
                response
            }
            Err(e) => {
                event!(Level::ERROR, error = %e, "Redirect target is not a valid header value");
                StatusCode::INTERNAL_SERVER_ERROR.into_response()
            }
        }
    }
}

/// Replays an upstream reply to the caller.
///
/// `content_type` overrides whatever the upstream declared.
pub fn upstream_reply(upstream: UpstreamResponse, content_type: Option<&'static str>) -> Response {
    let status =
        StatusCode::from_u16(upstream.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let content_type = match content_type {
        Some(forced) => Some(HeaderValue::from_static(forced)),
        None => upstream
            .content_type
            .and_then(|declared| HeaderValue::from_str(&declared).ok()),
    };

    let mut response = Response::new(Body::from(upstream.body));
    *response.status_mut() = status;
    if let Some(content_type) = content_type {
        response.headers_mut().insert(CONTENT_TYPE, content_type);
    }
    response
}

/// Successful CORS preflight for `origin`. Declared request headers are
/// echoed back as allowed.
pub fn preflight(origin: &str, methods: &str, request_headers: Option<&str>) -> Response {
    let origin = match HeaderValue::from_str(origin) {
        Ok(origin) => origin,
        Err(_) => return StatusCode::FORBIDDEN.into_response(),
    };

    let mut response = Response::new(Body::empty());
    let headers = response.headers_mut();
    headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, origin);
    headers.insert(
        ACCESS_CONTROL_ALLOW_CREDENTIALS,
        HeaderValue::from_static("true"),
    );
    if let Ok(methods) = HeaderValue::from_str(methods) {
        headers.insert(ACCESS_CONTROL_ALLOW_METHODS, methods);
    }
    if let Some(Ok(requested)) = request_headers.map(HeaderValue::from_str) {
        headers.insert(ACCESS_CONTROL_ALLOW_HEADERS, requested);
    }
    headers.insert(VARY, HeaderValue::from_static("origin"));
    response
}

pub fn json_passthrough(
    result: Result<UpstreamResponse, RelayError>,
) -> Result<Response, Rejection> {
    result
        .map(|r| upstream_reply(r, Some("application/json")))
        .map_err(|e| warp::reject::custom(RelayRejection::from(e)))
}

pub fn passthrough(result: Result<UpstreamResponse, RelayError>) -> Result<Response, Rejection> {
    result
        .map(|r| upstream_reply(r, None))
        .map_err(|e| warp::reject::custom(RelayRejection::from(e)))
}

pub fn accept<T>(result: Result<T, RelayError>) -> Result<T, Rejection> {
    result.map_err(|e| warp::reject::custom(RelayRejection::from(e)))
}

pub fn reply<T: Reply>(result: Result<T, RelayError>) -> Result<Response, Rejection> {
    result
        .map(|t| t.into_response())
        .map_err(|e| warp::reject::custom(RelayRejection::from(e)))
}
