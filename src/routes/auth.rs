use axum::{
    extract::State,
    http::HeaderMap,
    Json,
};
use serde_json::Value;

use crate::{
    error::AppError,
    middleware::rate_limit::check_rate_limit,
    models::auth::LoginRequest,
    routes::{ok, real_ip},
    services::auth::AuthService,
    AppState,
};

pub async fn login(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<LoginRequest>,
) -> Result<Json<Value>, AppError> {
    // Backstop contre le credential stuffing : 10 tentatives/min par IP.
    let ip = real_ip(&headers);
    let mut redis = state.redis.clone();
    check_rate_limit(&mut redis, &format!("rate:login:ip:{ip}"), 10, 60).await?;

    let response = AuthService::login(
        &state.db,
        &body,
        &state.config.jwt_secret,
        state.config.jwt_expiry_seconds,
    )
    .await?;

    Ok(ok(response))
}
