use std::path::Path;
use std::sync::Arc;

use axum::extract::State;
use axum::response::Html;
use axum::routing::get;
use axum::Router;
use isomorph_render_html::{RenderRequest, ServerRenderer};
use list_demo::ViewState;
use serde::Serialize;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::error::AppError;

// ── Shared state ────────────────────────────────────────────────────

/// Read-only after startup; requests share it without locking.
pub struct AppState {
    pub renderer: ServerRenderer,
}

// ── Router ──────────────────────────────────────────────────────────

pub fn router(state: Arc<AppState>, static_root: &Path) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/", get(index))
        .nest_service("/static", ServeDir::new(static_root))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ── Handlers ────────────────────────────────────────────────────────

#[derive(Serialize)]
struct PageContext {
    title: &'static str,
}

async fn health() -> &'static str {
    "ok"
}

async fn index(State(state): State<Arc<AppState>>) -> Result<Html<String>, AppError> {
    let view = ViewState::initial();
    let html = state.renderer.render(&RenderRequest {
        page: list_demo::PAGE,
        mount_id: list_demo::MOUNT_ID,
        templates: list_demo::TEMPLATES,
        state: &view,
        context: &PageContext {
            title: list_demo::TITLE,
        },
    })?;
    Ok(Html(html))
}
