// HTTP routes

mod badges;
mod http;
mod metrics;
mod performance;

use axum::{
    Router,
    routing::{get, post},
};
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use crate::analytics::Window;
use crate::config::AppConfig;
use crate::error::ApiError;
use crate::store::MetricsStore;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) store: Arc<MetricsStore>,
    pub(crate) config: AppConfig,
}

/// Payload tagged with the window it was computed over.
#[derive(Debug, Serialize)]
pub(crate) struct Windowed<T> {
    pub(crate) period: Window,
    #[serde(flatten)]
    pub(crate) data: T,
}

pub(crate) fn now() -> DateTime<Utc> {
    Utc::now()
}

/// `now` minus a client-supplied lookback; out of chrono's range is a bad request.
pub(crate) fn since(lookback: Option<Duration>, param: &str) -> Result<DateTime<Utc>, ApiError> {
    lookback
        .and_then(|d| now().checked_sub_signed(d))
        .ok_or_else(|| ApiError::BadRequest(format!("{} is out of range", param)))
}

pub fn app(store: Arc<MetricsStore>, config: AppConfig) -> Router {
    let state = AppState { store, config };
    Router::new()
        .route("/", get(|| async { "Volunteer computing dashboard API" })) // GET /
        .route("/version", get(http::version_handler)) // GET /version
        .nest("/api", api_routes())
        .layer(CorsLayer::new().allow_origin(Any))
        .with_state(state)
}

fn api_routes() -> Router<AppState> {
    Router::new()
        // metrics
        .route("/system-metrics", get(metrics::system_metrics))
        .route("/volunteers", get(metrics::volunteers))
        .route("/volunteers/{volunteer_id}", get(metrics::volunteer_details))
        .route("/tasks", get(metrics::tasks))
        .route(
            "/analytics/performance-history",
            get(metrics::performance_history),
        )
        .route("/analytics/cost-savings", get(metrics::cost_savings))
        .route(
            "/analytics/volunteer-performance",
            get(metrics::volunteer_performance),
        )
        // performance
        .route("/performance/system", get(performance::system))
        .route("/performance/tasks", get(performance::tasks))
        .route(
            "/performance/volunteers/{volunteer_id}",
            get(performance::volunteer),
        )
        .route("/performance/peaks", get(performance::peaks))
        .route("/performance/compare", get(performance::compare))
        .route("/performance/ranking", get(performance::ranking))
        .route("/performance/report", get(performance::report))
        // badges
        .route("/badges", get(badges::catalog))
        .route("/badges/volunteer-of-week", get(badges::volunteer_of_week))
        .route("/badges/volunteer-of-month", get(badges::volunteer_of_month))
        .route("/badges/volunteer-of-year", get(badges::volunteer_of_year))
        .route("/badges/top-performers", get(badges::top_performers))
        .route(
            "/badges/volunteer/{volunteer_id}/badges",
            get(badges::volunteer_badges),
        )
        .route("/badges/leaderboard", get(badges::leaderboard))
        .route("/badges/attributed", get(badges::attributed))
        .route("/badges/attributed/recent", get(badges::recent))
        .route("/badges/attributed/statistics", get(badges::statistics))
        .route(
            "/badges/attributed/{attribution_id}",
            get(badges::attribution),
        )
        .route(
            "/badges/attributed/{attribution_id}/revoke",
            post(badges::revoke),
        )
        .route(
            "/badges/volunteer/{volunteer_id}/attributed",
            get(badges::volunteer_attributed),
        )
        .route("/badges/evaluate", post(badges::evaluate))
}
