use axum::{http::StatusCode, middleware, routing::get, Router};
use tower_http::trace::TraceLayer;

use crate::{invite_routes, pow_routes, presence_routes, rate_limit, state::AppState};

/// 构建完整路由；所有路由都经过限流中间件
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .nest("/api/hearth", hearth_routes())
        .layer(middleware::from_fn_with_state(state.clone(), rate_limit::enforce))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn hearth_routes() -> Router<AppState> {
    Router::new()
        .merge(pow_routes::routes())
        .merge(invite_routes::routes())
        .merge(presence_routes::routes())
}

async fn health() -> StatusCode {
    StatusCode::OK
}
