use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::NaiveDate;
use serde_derive::Deserialize;
use serde_json::json;
use tracing::error;

use crate::db::models::{NewUser, User};
use crate::error::ApiError;
use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/users", get(list_users))
        .route("/login", post(login))
        .route("/register", post(register))
}

#[tracing::instrument(skip(state))]
async fn list_users(State(state): State<AppState>) -> Result<Json<Vec<User>>, ApiError> {
    Ok(Json(state.store.list_users().await?))
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

#[tracing::instrument(skip(state, payload))]
async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let email = payload.email.unwrap_or_default();
    let password = payload.password.unwrap_or_default();
    if email.is_empty() || password.is_empty() {
        return Err(ApiError::BadRequest(
            "Email and password are required".to_string(),
        ));
    }

    let user = state
        .store
        .user_by_email(&email)
        .await?
        .ok_or_else(|| ApiError::Unauthorized("Invalid email".to_string()))?;

    let matches = bcrypt::verify(&password, &user.password).map_err(|e| {
        error!("password verification failed: {e}");
        ApiError::Internal
    })?;
    if !matches {
        return Err(ApiError::Unauthorized("Invalid password".to_string()));
    }

    Ok(Json(json!({ "message": "Login successful", "user": user })))
}

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    #[serde(rename = "firstName")]
    pub first_name: Option<String>,
    #[serde(rename = "lastName")]
    pub last_name: Option<String>,
    pub birth_date: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

#[tracing::instrument(skip(state, payload))]
async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<serde_json::Value>), ApiError> {
    let first_name = payload.first_name.unwrap_or_default();
    let last_name = payload.last_name.unwrap_or_default();
    let birth_date = payload.birth_date.unwrap_or_default();
    let email = payload.email.unwrap_or_default();
    let password = payload.password.unwrap_or_default();
    if first_name.is_empty()
        || last_name.is_empty()
        || birth_date.is_empty()
        || email.is_empty()
        || password.is_empty()
    {
        return Err(ApiError::BadRequest("All fields are required".to_string()));
    }

    let birth_date = NaiveDate::parse_from_str(&birth_date, "%Y-%m-%d")
        .map_err(|_| ApiError::BadRequest("birth_date must be a YYYY-MM-DD date".to_string()))?;

    if state.store.user_by_email(&email).await?.is_some() {
        return Err(ApiError::Conflict("Email is already registered".to_string()));
    }

    let password = bcrypt::hash(&password, bcrypt::DEFAULT_COST).map_err(|e| {
        error!("password hashing failed: {e}");
        ApiError::Internal
    })?;

    state
        .store
        .create_user(NewUser {
            first_name,
            last_name,
            birth_date,
            email,
            password,
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "Registration successful" })),
    ))
}
