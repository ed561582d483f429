use anyhow::Result;
use clap::Parser;
use fabric_master::{NetworkDriver, QueryService, Reconciler, ResourceManager};
use fabric_store::{StoreRegistry, ETCD_BACKEND};
use http_body_util::BodyExt;
use hyper::body::Incoming;
use hyper::header::CONTENT_TYPE;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response};
use hyper_util::rt::tokio::TokioIo;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

mod api;

use api::ApiContext;

/// Fabric network control-plane daemon
#[derive(Parser, Debug)]
#[command(name = "fabricd", version)]
struct Opts {
    /// State store to use
    #[arg(long = "state-store", default_value = ETCD_BACKEND)]
    state_store: String,

    /// Etcd or Consul cluster url. Unset resolves to the selected
    /// state-store's default url.
    #[arg(long = "store-url")]
    store_url: Option<String>,

    /// Url to listen http requests on
    #[arg(long = "listen-url", default_value = ":9999")]
    listen_url: String,

    /// Turn on debugging information
    #[arg(long)]
    debug: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let opts = Opts::parse();

    let default_level = if opts.debug { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    info!("Starting fabricd...");

    let registry = StoreRegistry::with_defaults();
    let store = match registry
        .connect(&opts.state_store, opts.store_url.clone())
        .await
    {
        Ok(store) => store,
        Err(e) => {
            error!("Failed to init state store. Error: {}", e);
            std::process::exit(1);
        }
    };
    info!("State store initialized ({})", store.backend());

    let resources = match ResourceManager::init(store.clone()).await {
        Ok(rm) => Arc::new(rm),
        Err(e) => {
            error!("Failed to init resource manager. Error: {}", e);
            std::process::exit(1);
        }
    };

    let context = Arc::new(ApiContext {
        reconciler: Reconciler::new(NetworkDriver::new(store.clone(), resources)),
        query: QueryService::new(store),
    });
    info!("Reconciler and query service initialized");

    let addr = parse_listen_url(&opts.listen_url)?;
    let listener = TcpListener::bind(&addr).await?;
    info!("HTTP server listening on {}", addr);

    // One task per connection; requests run concurrently with no
    // admission control, sharing the one store handle.
    loop {
        let (stream, peer_addr) = listener.accept().await?;
        let io = TokioIo::new(stream);
        let context = context.clone();

        tokio::task::spawn(async move {
            let service = service_fn(move |req| {
                let context = context.clone();
                async move { handle_request(context, req).await }
            });

            if let Err(e) = http1::Builder::new().serve_connection(io, service).await {
                debug!("Error serving connection from {}: {}", peer_addr, e);
            }
        });
    }
}

async fn handle_request(
    context: Arc<ApiContext>,
    req: Request<Incoming>,
) -> Result<Response<http_body_util::Full<hyper::body::Bytes>>, hyper::Error> {
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let content_type = req
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    let body = req.into_body().collect().await?.to_bytes();
    Ok(api::dispatch(&context, &method, &path, content_type.as_deref(), body).await)
}

// Accepts the bare-port ":9999" form as well as a full host:port.
fn parse_listen_url(listen_url: &str) -> Result<SocketAddr> {
    let normalized = if listen_url.starts_with(':') {
        format!("0.0.0.0{listen_url}")
    } else {
        listen_url.to_string()
    };
    Ok(normalized.parse()?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_port_listen_url_binds_all_interfaces() {
        let addr = parse_listen_url(":9999").unwrap();
        assert_eq!(addr.to_string(), "0.0.0.0:9999");
    }

    #[test]
    fn explicit_host_is_kept() {
        let addr = parse_listen_url("127.0.0.1:8000").unwrap();
        assert_eq!(addr.to_string(), "127.0.0.1:8000");
    }

    #[test]
    fn garbage_listen_url_is_rejected() {
        assert!(parse_listen_url("not-an-addr").is_err());
    }
}
