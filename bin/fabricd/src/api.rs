//! REST dispatch for the fabric daemon
//!
//! Write routes are gated on `Content-Type: application/json`, decode the
//! body into a `Config` intent and invoke exactly one reconciler
//! operation; success is an empty 200 and every failure (decode included)
//! is a 500 carrying the error text. Read routes serialize the query
//! result as a JSON array. Clients depend on this envelope as-is, so no
//! finer-grained status codes are handed out.

use fabric_api::{Config, ALL_ID};
use fabric_master::{ObjectType, QueryService, Reconciler};
use http_body_util::Full;
use hyper::body::Bytes;
use hyper::{Method, Response, StatusCode};
use tracing::debug;

/// Shared per-process handlers behind the route table.
pub struct ApiContext {
    pub reconciler: Reconciler,
    pub query: QueryService,
}

/// Route a decoded request. `body` is the fully collected request body.
pub async fn dispatch(
    ctx: &ApiContext,
    method: &Method,
    path: &str,
    content_type: Option<&str>,
    body: Bytes,
) -> Response<Full<Bytes>> {
    debug!("{} {}", method, path);
    match *method {
        Method::POST => post(ctx, path, content_type, body).await,
        Method::GET => get(ctx, path).await,
        _ => text_response(StatusCode::NOT_FOUND, "404 page not found\n"),
    }
}

async fn post(
    ctx: &ApiContext,
    path: &str,
    content_type: Option<&str>,
    body: Bytes,
) -> Response<Full<Bytes>> {
    // The write subrouter only matches JSON bodies; anything else falls
    // through to not-found, like the rest of the unmatched route space.
    let is_json = content_type
        .map(|ct| ct.split(';').next().unwrap_or("").trim() == "application/json")
        .unwrap_or(false);
    if !is_json {
        return text_response(StatusCode::NOT_FOUND, "404 page not found\n");
    }

    let cfg: Config = match serde_json::from_slice(&body) {
        Ok(cfg) => cfg,
        Err(e) => {
            return text_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                &format!("parsing json failed. Error: {e}"),
            )
        }
    };

    let result = match path {
        "/desired-config" => ctx.reconciler.apply_desired(&cfg).await,
        "/add-config" => ctx.reconciler.apply_additions(&cfg).await,
        "/del-config" => ctx.reconciler.apply_deletions(&cfg).await,
        "/host-bindings-config" => ctx.reconciler.apply_host_bindings(&cfg.host_bindings).await,
        _ => return text_response(StatusCode::NOT_FOUND, "404 page not found\n"),
    };

    match result {
        Ok(()) => empty_ok(),
        Err(e) => text_response(StatusCode::INTERNAL_SERVER_ERROR, &e.to_string()),
    }
}

async fn get(ctx: &ApiContext, path: &str) -> Response<Full<Bytes>> {
    let (object_type, id) = match path {
        "/endpoints" => (ObjectType::Endpoint, ALL_ID.to_string()),
        "/networks" => (ObjectType::Network, ALL_ID.to_string()),
        _ => {
            if let Some(id) = path.strip_prefix("/endpoint/").filter(|id| !id.is_empty()) {
                (ObjectType::Endpoint, id.to_string())
            } else if let Some(id) = path.strip_prefix("/network/").filter(|id| !id.is_empty()) {
                (ObjectType::Network, id.to_string())
            } else {
                return text_response(StatusCode::NOT_FOUND, "404 page not found\n");
            }
        }
    };

    let states = match ctx.query.get(object_type, &id).await {
        Ok(states) => states,
        Err(e) => return text_response(StatusCode::INTERNAL_SERVER_ERROR, &e.to_string()),
    };

    match serde_json::to_vec(&states) {
        Ok(body) => Response::builder()
            .status(StatusCode::OK)
            .header("Content-Type", "application/json")
            .body(Full::new(Bytes::from(body)))
            .unwrap(),
        Err(e) => text_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            &format!("marshalling json failed. Error: {e}"),
        ),
    }
}

fn empty_ok() -> Response<Full<Bytes>> {
    Response::builder()
        .status(StatusCode::OK)
        .body(Full::new(Bytes::new()))
        .unwrap()
}

fn text_response(status: StatusCode, message: &str) -> Response<Full<Bytes>> {
    Response::builder()
        .status(status)
        .body(Full::new(Bytes::from(message.to_string())))
        .unwrap()
}
