use axum::http::StatusCode;

/// Liveness check, outside the authenticated surface; answers "OK" as soon as
/// the router is serving
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service is up", content_type = "text/plain", body = String)
    ),
    tag = "Health"
)]
pub async fn health() -> (StatusCode, &'static str) {
    (StatusCode::OK, "OK")
}
