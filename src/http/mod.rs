mod response;

use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::Router;
use axum::extract::{Query, State};
use axum::http::{HeaderMap, Method, Uri, header};
use tokio::net::TcpListener;
use tokio::signal::unix::{SignalKind, signal};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::api::{Api, Envelope, RequestEvent, StageVariables};
use crate::config::ServerConfig;

#[derive(Clone)]
struct AppState {
    api: Arc<Api>,
    public_url: Option<String>,
}

/// Every request goes to the API entry point; it does its own routing.
pub(crate) fn router(api: Arc<Api>, public_url: Option<String>) -> Router {
    Router::new()
        .fallback(handle)
        .with_state(AppState { api, public_url })
        .layer(TraceLayer::new_for_http())
}

pub(crate) async fn serve(config: &ServerConfig, api: Arc<Api>) -> Result<()> {
    let app = router(api, config.public_url().map(str::to_owned));
    let addr = format!("{}:{}", config.listen, config.http_port);
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("unable to listen on {addr}"))?;
    info!(target: "http", %addr, "listening");

    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;
    let shutdown = async move {
        tokio::select! {
            _ = sigterm.recv() => {
                info!(target: "lifecycle", "Received the terminate signal; stopping");
            }
            _ = sigint.recv() => {
                info!(target: "lifecycle", "Received the interrupt signal; stopping");
            }
        }
    };
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;
    Ok(())
}

async fn handle(
    State(state): State<AppState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    Query(query): Query<BTreeMap<String, String>>,
    body: String,
) -> Envelope {
    let public_url = match state.public_url {
        Some(public_url) => public_url,
        None => {
            let host = headers
                .get(header::HOST)
                .and_then(|host| host.to_str().ok())
                .unwrap_or("localhost");
            format!("http://{host}")
        }
    };
    let event = RequestEvent {
        http_method: method.to_string(),
        path: uri.path().to_owned(),
        body: Some(body).filter(|body| !body.is_empty()),
        query_string_parameters: Some(query).filter(|query| !query.is_empty()),
        stage_variables: Some(StageVariables { public_url }),
    };
    state.api.handle(event).await
}
