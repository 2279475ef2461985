use axum::Json;
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct Health {
    pub status: &'static str,
    pub view_format_version: u32,
}

/// Liveness probe
pub async fn health() -> Json<Health> {
    Json(Health {
        status: "ok",
        view_format_version: shared::VIEW_FORMAT_VERSION,
    })
}
