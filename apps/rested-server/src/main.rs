//! rested demo server.
//!
//! Serves an in-memory people collection to show content negotiation, range
//! requests, conditional requests, compression and CORS end to end.
//!
//! # Usage
//!
//! ```text
//! RESTED_LISTEN=127.0.0.1:8080 RESTED_CORS=permissive rested-server
//! ```
//!
//! # Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `RESTED_LISTEN` | `0.0.0.0:8080` | Bind address |
//! | `RESTED_SEED` | `25` | Number of generated people |
//! | `RESTED_DEBUG` | `false` | Render fault details and stacks |
//! | `RESTED_COMPRESSION_THRESHOLD` | `860` | Minimal body size to compress |
//! | `RESTED_CORS` | *(unset)* | `default` or `permissive` |
//! | `RESTED_HEADERS` | *(unset)* | `Name: value` pairs separated by `;` |
//! | `LOG_LEVEL` | `info` | Log level filter |
//! | `LOG_FORMAT` | `text` | `json` for structured logs |
//! | `RUST_LOG` | *(unset)* | Fine-grained tracing filter (overrides `LOG_LEVEL`) |

mod people;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use http::HeaderName;
use rested_core::{Envelope, MuxConfig};
use rested_http::{Endpoint, Mux, PatternRouter, RouteError};
use serde::Serialize;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::people::{PeopleCollection, PeopleStore, PersonItem};

/// Server version reported by the health endpoint.
const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Settings of the binary itself; the mux reads its own from [`MuxConfig`].
#[derive(Debug, Clone)]
struct ServerConfig {
    listen: String,
    seed: u64,
    log_level: String,
    json_logs: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: "0.0.0.0:8080".to_owned(),
            seed: 25,
            log_level: "info".to_owned(),
            json_logs: false,
        }
    }
}

impl ServerConfig {
    fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(v) = std::env::var("RESTED_LISTEN") {
            config.listen = v;
        }
        if let Ok(v) = std::env::var("RESTED_SEED") {
            match v.parse() {
                Ok(n) => config.seed = n,
                Err(e) => warn!(value = %v, error = %e, "ignoring RESTED_SEED"),
            }
        }
        if let Ok(v) = std::env::var("LOG_LEVEL") {
            config.log_level = v;
        }
        if let Ok(v) = std::env::var("LOG_FORMAT") {
            config.json_logs = v.eq_ignore_ascii_case("json");
        }
        config
    }
}

/// Initialize the tracing subscriber.
///
/// Uses `RUST_LOG` if set, otherwise falls back to the `LOG_LEVEL` config value.
fn init_tracing(log_level: &str, json: bool) -> Result<()> {
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        EnvFilter::try_new(log_level)
            .with_context(|| format!("invalid log level filter: {log_level}"))?
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }

    Ok(())
}

#[derive(Debug, Serialize)]
struct Health {
    status: &'static str,
    version: &'static str,
}

/// Register the demo routes.
fn build_router(store: &Arc<PeopleStore>) -> Result<PatternRouter, RouteError> {
    let health = Endpoint::new().get_fn(|_| {
        let health = Envelope::new(Health {
            status: "running",
            version: VERSION,
        })
        .with_etag(format!("health-{VERSION}"))
        .with_ttl(Duration::ZERO)
        .with_header(HeaderName::from_static("x-rested-version"), VERSION);
        Ok(Some(Box::new(health)))
    });

    PatternRouter::new()
        .with_route("/health", health)?
        .with_route(
            "/people",
            Endpoint::new()
                .get(PeopleCollection(Arc::clone(store)))
                .post(PeopleCollection(Arc::clone(store))),
        )?
        .with_route(
            "/people/{id:[0-9]+}",
            Endpoint::new()
                .get(PersonItem(Arc::clone(store)))
                .put(PersonItem(Arc::clone(store)))
                .patch(PersonItem(Arc::clone(store)))
                .delete(PersonItem(Arc::clone(store))),
        )
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = ServerConfig::from_env();
    init_tracing(&config.log_level, config.json_logs)?;

    let mux_config = MuxConfig::from_env();
    info!(
        listen = %config.listen,
        seed = config.seed,
        debug = mux_config.debug,
        cors = ?mux_config.cors,
        compression_threshold = mux_config.compression_threshold,
        version = VERSION,
        "starting rested server",
    );

    let store = Arc::new(PeopleStore::seeded(config.seed));
    let mux = Mux::new(build_router(&store)?, mux_config);

    let addr: SocketAddr = config
        .listen
        .parse()
        .with_context(|| format!("invalid bind address: {}", config.listen))?;

    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind to {addr}"))?;

    info!(%addr, "listening for connections");

    let shutdown = async {
        tokio::signal::ctrl_c().await.ok();
        info!("received shutdown signal, draining connections");
    };
    rested_http::serve(listener, mux, shutdown).await;

    Ok(())
}
