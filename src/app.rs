use crate::handlers;
use crate::state::AppState;
use axum::{routing::{get, post}, Router};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::index))
        .route("/:page", get(handlers::page))
        .route("/api/health", get(handlers::health))
        .route("/api/session", get(handlers::get_session))
        .route("/api/session/open/:page", post(handlers::open_session))
        .route("/api/session/granularity", post(handlers::set_granularity))
        .route("/api/session/period", post(handlers::select_period))
        .route("/api/session/slider", post(handlers::scrub_slider))
        .route("/api/session/labor-status", post(handlers::set_labor_status))
        .route("/api/session/sort", post(handlers::sort_table))
        .route(
            "/api/session/drill/product/:product_group",
            get(handlers::drill_product),
        )
        .route(
            "/api/session/drill/category/:category",
            get(handlers::drill_category),
        )
        .route("/api/session/drill/job/:job_num", get(handlers::drill_job))
        .with_state(state)
}
