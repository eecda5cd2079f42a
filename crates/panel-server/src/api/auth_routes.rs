//! Маршруты аутентификации: вход администратора панели.

use crate::api::{middleware, AppState};
use crate::config::verify_password;
use crate::error::AppError;
use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginUser {
    pub email: String,
    pub role: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub token: String,
    pub user: LoginUser,
}

pub fn routes() -> Router<AppState> {
    Router::new().route("/auth/login", post(login))
}

/// POST /auth/login — вход администратора, выдаёт JWT на 24 часа.
async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, AppError> {
    let email_ok = req.email == state.admin_email;
    // Хэш считается и при неверном email
    let password_ok = verify_password(&req.password, &state.admin_password_hash);

    if !(email_ok && password_ok) {
        tracing::warn!("Неудачная попытка входа: {}", req.email);
        return Err(AppError::Unauthorized("Неверные учётные данные".into()));
    }

    let token = middleware::create_admin_token(&req.email, &state.jwt_secret)?;
    tracing::info!("Администратор {} вошёл в панель", req.email);

    Ok(Json(LoginResponse {
        token,
        user: LoginUser {
            email: req.email,
            role: "ADMIN".to_string(),
        },
    }))
}
