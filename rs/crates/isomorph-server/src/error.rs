use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use isomorph_render_html::RenderError;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("render: {0}")]
    Render(#[from] RenderError),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, msg) = match &self {
            Self::Render(_) => (StatusCode::INTERNAL_SERVER_ERROR, "page could not be rendered"),
        };
        tracing::error!(error = %self, "request failed");
        let body = serde_json::json!({ "error": msg });
        (status, axum::Json(body)).into_response()
    }
}
