use std::sync::Arc;

use anyhow::{Context, Result};
use axum::extract::{DefaultBodyLimit, Path, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use axum::{Form, Router};
use serde::Deserialize;
use tokio::net::TcpListener;

use crate::backup::Clock;
use crate::config::AppConfig;
use crate::error::NotesError;
use crate::session::Notebook;

mod error;
pub mod templates;

const ASYNC_MARKER_HEADER: &str = "x-requested-with";
const ASYNC_MARKER_VALUE: &str = "XMLHttpRequest";

#[derive(Clone)]
pub struct AppState {
    notebook: Arc<Notebook>,
    debounce_ms: u64,
}

impl AppState {
    pub fn new(notebook: Arc<Notebook>, debounce_ms: u64) -> Self {
        Self {
            notebook,
            debounce_ms,
        }
    }
}

#[derive(Debug, Deserialize)]
struct SaveForm {
    #[serde(default)]
    content: String,
}

pub fn router(state: AppState, max_body_bytes: usize) -> Router {
    Router::new()
        .route("/", get(show_editor).post(save_notes))
        .route("/backup/{name}", get(show_backup))
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .with_state(state)
}

pub fn app(config: &AppConfig, clock: Arc<dyn Clock>) -> Router {
    let notebook = Arc::new(Notebook::new(&config.paths(), clock));
    router(
        AppState::new(notebook, config.debounce_ms),
        config.max_body_bytes,
    )
}

pub async fn serve(config: AppConfig, clock: Arc<dyn Clock>) -> Result<()> {
    let addr = config.socket_addr();
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    tracing::info!(%addr, "notes server listening");
    axum::serve(listener, app(&config, clock))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serving http")?;
    tracing::info!("notes server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::warn!(?err, "unable to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}

async fn show_editor(State(state): State<AppState>) -> Result<Html<String>, NotesError> {
    let notebook = state.notebook.clone();
    let view = tokio::task::spawn_blocking(move || notebook.open()).await??;
    Ok(Html(templates::editor_page(&view, state.debounce_ms)))
}

async fn save_notes(
    State(state): State<AppState>,
    headers: HeaderMap,
    Form(form): Form<SaveForm>,
) -> Result<Response, NotesError> {
    let notebook = state.notebook.clone();
    let receipt = tokio::task::spawn_blocking(move || notebook.save(&form.content)).await??;

    let is_async = headers
        .get(ASYNC_MARKER_HEADER)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.eq_ignore_ascii_case(ASYNC_MARKER_VALUE));
    if is_async {
        return Ok(receipt.last_saved.into_response());
    }
    Ok((StatusCode::FOUND, [(header::LOCATION, "/")]).into_response())
}

async fn show_backup(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Html<String>, NotesError> {
    let notebook = state.notebook.clone();
    let snapshot = tokio::task::spawn_blocking(move || notebook.backup(&name)).await??;
    Ok(Html(templates::backup_page(&snapshot)))
}
