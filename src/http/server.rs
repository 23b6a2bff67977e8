use std::net::SocketAddr;
use std::sync::Arc;

use tracing::{event, Level};
use warp::filters::BoxedFilter;
use warp::reply::Response;
use warp::{Filter, Rejection};

use super::encoding::{self, error::handle_reject, reply};
use crate::core::models::Origin;
use crate::core::types::{BearerToken, Parameters};
use crate::relay::OAuth2Relay;

#[derive(Debug, Clone)]
pub struct ServerOptions {
    pub bind: SocketAddr,
    /// Path segments all routes are mounted under.
    pub prefix: Vec<String>,
    pub default_scheme: String,
    pub allowed_origins: Vec<String>,
}

impl ServerOptions {
    pub fn base_path(&self) -> String {
        self.prefix.iter().map(|s| format!("/{}", s)).collect()
    }
}

fn prefix(segments: &[String]) -> BoxedFilter<()> {
    segments
        .iter()
        .cloned()
        .fold(warp::any().boxed(), |filter, segment| {
            filter.and(warp::path(segment)).boxed()
        })
}

const CORS_METHODS: [&str; 3] = ["GET", "POST", "OPTIONS"];

/// Answers preflights from allow-listed origins, accepting whatever request
/// headers the browser declares. Anything else falls through to
/// `warp::cors`, which refuses it.
fn cors_preflight(
    allowed_origins: Vec<String>,
) -> impl Filter<Extract = (Response,), Error = Rejection> + Clone {
    let allowed_origins = Arc::new(allowed_origins);

    warp::options()
        .and(warp::header::<String>("origin"))
        .and(warp::header::<String>("access-control-request-method"))
        .and(warp::header::optional::<String>(
            "access-control-request-headers",
        ))
        .and_then(
            move |origin: String, method: String, headers: Option<String>| {
                let allowed_origins = allowed_origins.clone();
                async move {
                    if !allowed_origins.iter().any(|allowed| *allowed == origin)
                        || !CORS_METHODS.contains(&method.as_str())
                    {
                        return Err(warp::reject());
                    }
                    event!(Level::DEBUG, %origin, %method, "Answering CORS preflight");
                    Ok::<_, Rejection>(reply::preflight(
                        &origin,
                        &CORS_METHODS.join(", "),
                        headers.as_deref(),
                    ))
                }
            },
        )
}

pub fn routes(
    relay: Arc<OAuth2Relay>,
    options: &ServerOptions,
) -> impl Filter<Extract = (impl warp::Reply,), Error = Rejection> + Clone {
    let with_relay = warp::any().map(move || relay.clone());
    let origin = encoding::origin(options.default_scheme.clone(), options.base_path());

    let authorize = warp::path!("authorize")
        .and(warp::get())
        .and(with_relay.clone())
        .and(origin.clone())
        .and(encoding::query_params())
        .and_then(
            |relay: Arc<OAuth2Relay>, origin: Origin, params: Parameters| async move {
                reply::reply(relay.authorize(&origin, params))
            },
        );

    let callback = warp::path!("callback")
        .and(warp::get())
        .and(with_relay.clone())
        .and(encoding::query_params())
        .and_then(|relay: Arc<OAuth2Relay>, params: Parameters| async move {
            reply::reply(relay.callback(params))
        });

    let token = warp::path!("token")
        .and(warp::post())
        .and(with_relay.clone())
        .and(origin)
        .and(encoding::form_params())
        .and_then(
            |relay: Arc<OAuth2Relay>, origin: Origin, params: Parameters| async move {
                reply::json_passthrough(relay.exchange_token(&origin, params).await)
            },
        );

    let userinfo = warp::path!("userinfo")
        .and(warp::get())
        .and(with_relay)
        .and(encoding::bearer())
        .and_then(|relay: Arc<OAuth2Relay>, token: BearerToken| async move {
            reply::passthrough(relay.userinfo(token).await)
        });

    let cors = warp::cors()
        .allow_origins(options.allowed_origins.iter().map(String::as_str))
        .allow_methods(CORS_METHODS)
        .allow_credentials(true);

    let relayed = authorize
        .or(callback)
        .or(token)
        .or(userinfo)
        .recover(handle_reject)
        .with(cors);

    prefix(&options.prefix)
        .and(cors_preflight(options.allowed_origins.clone()).or(relayed))
        .with(warp::log("sekisho::http"))
}

#[derive(Debug)]
pub struct Server {
    relay: Arc<OAuth2Relay>,
    options: ServerOptions,
}

impl Server {
    pub fn new(relay: Arc<OAuth2Relay>, options: ServerOptions) -> Self {
        Self { relay, options }
    }

    /// Serves until ctrl-c.
    pub async fn serve(self) -> Result<(), warp::Error> {
        let routes = routes(Arc::clone(&self.relay), &self.options);

        let (addr, server) = warp::serve(routes).try_bind_with_graceful_shutdown(
            self.options.bind,
            async {
                tokio::signal::ctrl_c().await.ok();
            },
        )?;

        event!(Level::INFO, %addr, base_path = %self.options.base_path(), "Listening");
        server.await;
        event!(Level::INFO, "Shut down");
        Ok(())
    }
}
