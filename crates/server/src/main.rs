use axum::{Router, extract::DefaultBodyLimit};
use log::info;
use tower::ServiceBuilder;
use tower_http::compression::CompressionLayer;
use tower_oauth2_resource_server::server::OAuth2ResourceServer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    config::Config, doc::ApiDoc, state::AppState, storage::MediaStorage,
    utils::shutdown::shutdown_signal,
};

mod auth;
mod config;
mod doc;
mod dtos;
mod error;
mod routes;
mod state;
mod storage;
#[cfg(test)]
mod test_support;
mod utils;

/// Multipart bodies may carry up to the general upload cap plus form overhead.
const BODY_LIMIT_BYTES: usize = dtos::media::GENERAL_UPLOAD_MAX_BYTES + 64 * 1024;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    env_logger::init();

    let config = Config::from_env().expect("invalid configuration");

    let db = database::db::create_connection()
        .await
        .expect("failed to connect to the database");
    let storage = MediaStorage::new(config.media_root.clone(), config.media_base_url.clone());
    let state = AppState { db, storage };

    let oauth2_resource_server = <OAuth2ResourceServer>::builder()
        .issuer_url(config.oidc_issuer_url.as_str())
        .build()
        .await
        .expect("Failed to build OAuth2ResourceServer");

    let app = Router::new()
        .merge(routes::protected_router())
        .layer(ServiceBuilder::new().layer(oauth2_resource_server.into_layer()))
        .route("/health", axum::routing::get(routes::health::health))
        .merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(DefaultBodyLimit::max(BODY_LIMIT_BYTES))
        .layer(CompressionLayer::new())
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .expect("failed to bind");
    info!("Running axum on http://{}", config.bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .unwrap();
}
