// src/utils/telemetry.rs

use std::net::SocketAddr;

use axum::{http::StatusCode, routing::get, serve, Router};
use prometheus::{gather, Encoder, TextEncoder};
use tokio::net::TcpListener;
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

use crate::error::Result;

/// Installs the global tracing subscriber. `RUST_LOG` wins; `info` otherwise.
pub fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = fmt::Subscriber::builder().with_env_filter(filter);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

async fn metrics_handler() -> (StatusCode, String) {
    let mut buffer = vec![];
    if let Err(e) = TextEncoder::new().encode(&gather(), &mut buffer) {
        error!(error = %e, "Could not encode prometheus metrics");
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Could not encode prometheus metrics: {}", e),
        );
    }
    match String::from_utf8(buffer) {
        Ok(body) => (StatusCode::OK, body),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Prometheus metrics UTF-8 error: {}", e),
        ),
    }
}

/// Serves `/metrics` on `host:port` in a background task.
///
/// The listener is bound before returning, so a port clash is reported to the
/// caller instead of being lost inside the spawned task. Port 0 picks a free
/// port; the bound address is returned.
pub async fn serve_metrics(host: &str, port: u16) -> Result<SocketAddr> {
    let listener = TcpListener::bind((host, port)).await?;
    let addr = listener.local_addr()?;
    let app = Router::new().route("/metrics", get(metrics_handler));

    tokio::spawn(async move {
        if let Err(e) = serve(listener, app).await {
            error!(error = %e, "Metrics server error");
        }
    });

    info!("Metrics endpoint available at http://{}/metrics", addr);
    Ok(addr)
}
