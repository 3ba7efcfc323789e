use axum::{
    http::{header, HeaderName, Method},
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

pub mod config;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod metrics;
pub mod middlewares;
pub mod models;
pub mod services;

pub use config::Config;
pub use error::{EngineError, EngineResult};
pub use services::AppState;

pub fn create_router(app_state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([
            header::CONTENT_TYPE,
            HeaderName::from_static(middlewares::trace::TRACE_ID_HEADER),
        ])
        .allow_origin(tower_http::cors::Any);

    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/metrics", get(handlers::metrics_handler))
        .nest("/api/v1/catalog", catalog_routes())
        .nest("/api/v1/users/{user_id}", user_routes())
        .route("/api/v1/chat", post(handlers::chat::chat))
        .with_state(app_state)
        .layer(cors)
        .layer(middleware::from_fn(
            middlewares::metrics::metrics_middleware,
        ))
        .layer(middleware::from_fn(
            middlewares::trace::trace_context_middleware,
        ))
        .layer(TraceLayer::new_for_http())
}

fn catalog_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/questions", post(handlers::catalog::load_questions))
        .route("/questions/{id}", get(handlers::catalog::get_question))
}

fn user_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/sessions", post(handlers::sessions::create_session))
        .route("/sessions/{session_id}", get(handlers::sessions::get_session))
        .route(
            "/sessions/{session_id}/complete",
            post(handlers::sessions::complete_session),
        )
        .route("/answers", post(handlers::practice::submit_answer))
        .route("/next", get(handlers::practice::next_batch))
        .route(
            "/review",
            get(handlers::practice::wrong_questions).delete(handlers::practice::clear_review_queue),
        )
        .route("/mastery", get(handlers::practice::mastery_report))
        .route(
            "/ledger",
            get(handlers::practice::export_ledger).post(handlers::practice::import_ledger),
        )
}
