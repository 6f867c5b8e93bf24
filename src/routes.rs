// src/routes.rs

use axum::{
    Router,
    http::{HeaderValue, Method},
    middleware,
    routing::{get, post, put},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    handlers::{analysis, batch, reviews, scheduler_config, wrong_answers},
    state::AppState,
    utils::jwt::{admin_middleware, auth_middleware},
};

/// Assembles the main application router.
///
/// * Every route needs a bearer token; the scheduler config update needs an admin one.
/// * Applies global middleware (Trace, CORS).
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin([
            HeaderValue::from_static("http://localhost:3000"),
            HeaderValue::from_static("http://127.0.0.1:3000"),
        ])
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([
            axum::http::header::AUTHORIZATION,
            axum::http::header::CONTENT_TYPE,
        ]);

    let wrong_answer_routes = Router::new()
        .route(
            "/",
            get(wrong_answers::list_records).post(wrong_answers::record_outcome),
        )
        .route("/due", get(wrong_answers::list_due))
        .route("/statistics", get(wrong_answers::get_statistics))
        .route("/analytics", get(wrong_answers::get_analytics))
        .route(
            "/review-plan",
            get(wrong_answers::get_review_plan).post(wrong_answers::generate_review_plan),
        )
        .route("/analysis/batch", post(analysis::analyze_batch))
        .route("/batch/update-status", put(batch::update_status))
        .route("/batch/add-tags", post(batch::add_tags))
        .route("/batch/remove-tags", post(batch::remove_tags))
        .route("/batch/delete", post(batch::delete))
        .route(
            "/{id}",
            get(wrong_answers::get_record).delete(wrong_answers::delete_record),
        )
        .route("/{id}/mark-mastered", put(wrong_answers::mark_mastered))
        .route("/{id}/mark-reviewing", put(wrong_answers::mark_reviewing))
        .route("/{id}/notes", put(wrong_answers::update_notes))
        .route("/{id}/tags", put(wrong_answers::update_tags))
        .route("/{id}/review", post(reviews::review_once))
        .route("/{id}/logs", get(reviews::list_logs))
        .route("/{id}/analysis", get(analysis::analyze_record));

    let scheduler_routes = Router::new().route(
        "/config",
        get(scheduler_config::get_config).merge(
            put(scheduler_config::update_config).layer(middleware::from_fn(admin_middleware)),
        ),
    );

    let api_routes = Router::new()
        .nest("/wrong-answers", wrong_answer_routes)
        .nest("/scheduler", scheduler_routes)
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .nest("/api", api_routes)
        // Global Middleware (applied from outside in)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
