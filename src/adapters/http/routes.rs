use super::handlers;
use super::state::AppState;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handlers::health))
        .route("/api/createUploadUrl", post(handlers::create_upload_url))
        .route("/api/ingestAsset", post(handlers::ingest_asset))
        .route("/api/detectHighlights", post(handlers::detect_highlights))
        .route("/api/detectBeats", post(handlers::detect_beats))
        .route("/api/recommendMusic", post(handlers::recommend_music))
        .route("/api/startRenderJob", post(handlers::start_render_job))
        .route("/api/getJobStatus", post(handlers::get_job_status))
        .route("/api/finalizeExport", post(handlers::finalize_export))
        .route("/api/deleteAsset", post(handlers::delete_asset))
        .route("/api/deleteExport", post(handlers::delete_export))
        .route("/api/workerCallback", post(handlers::worker_callback))
        .route(
            "/api/retentionPolicy",
            get(handlers::retention_policy).post(handlers::retention_policy),
        )
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
