use std::net::SocketAddr;

use axum::Router;
use color_eyre::{eyre::WrapErr, Result};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::info;

use super::{routes, trace::Tracer};
use crate::{AppConfig, AppState};

pub(crate) async fn serve(config: AppConfig) -> Result<()> {
    let port = config.port;
    let app_state = AppState::from_config(config).await?;

    run_server(routes::make_router().with_state(app_state), port).await?;

    info!("Main Returning");

    Ok(())
}

async fn run_server(routes: Router, port: u16) -> Result<()> {
    let tracer = Tracer;
    let trace_layer = TraceLayer::new_for_http()
        .make_span_with(tracer)
        .on_response(tracer);

    let app = routes.layer(trace_layer);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!("Starting server on port {}", port);
    let listener = TcpListener::bind(&addr)
        .await
        .wrap_err("Failed to open port")?;

    let addr = listener.local_addr()?;
    info!("Listening on {}", addr);

    axum::serve(listener, app)
        .await
        .wrap_err("Failed to run server")
}
