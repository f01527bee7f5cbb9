use crate::AppState;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;

pub mod donations;
pub mod users;
pub mod webhook;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(home_handler))
        .merge(donations::router())
        .merge(users::router())
        .merge(webhook::router())
        .fallback(fallback_handler)
}

pub async fn home_handler() -> impl IntoResponse {
    "Hello, world!"
}

pub async fn fallback_handler() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, "Page not found")
}
