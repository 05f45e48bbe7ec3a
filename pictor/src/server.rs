use std::future::Future;

use anyhow::Result;
use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;

use crate::{api::ApiState, endpoints::*};

pub fn build_router(state: ApiState, max_upload_bytes: usize) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/upload", post(upload))
        .route("/upload_image", post(upload))
        .route("/resize", get(resize))
        .route("/blur", get(blur))
        .route("/gaussian_blur", get(gaussian_blur))
        .route("/median_blur", get(median_blur))
        .route("/grayscale", get(grayscale))
        .route("/extract_text", get(extract_text))
        .route("/detect_faces", get(detect_faces))
        .with_state(state)
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(CorsLayer::very_permissive())
}

pub async fn serve_with_listener(
    listener: TcpListener,
    router: Router,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<()> {
    tracing::info!("HTTP server listening on http://{}", listener.local_addr()?);
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown)
        .await?;
    Ok(())
}
