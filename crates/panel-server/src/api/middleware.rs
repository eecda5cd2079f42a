//! Экстракторы аутентификации: JWT администратора и токен агента узла.

use crate::api::AppState;
use crate::error::AppError;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use serde::{Deserialize, Serialize};

/// Время жизни токена администратора.
const ADMIN_TOKEN_TTL_SECS: usize = 24 * 3600;

/// Claims JWT-токена администратора.
#[derive(Debug, Serialize, Deserialize)]
pub struct AdminClaims {
    pub sub: String,
    pub role: String,
    pub exp: usize,
    pub iat: usize,
}

/// Экстрактор аутентифицированного администратора.
pub struct AdminUser(pub AdminClaims);

/// Bearer-токен агента узла. Проверяется сервисом узлов по записи узла.
pub struct NodeToken(pub String);

impl FromRequestParts<AppState> for AdminUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = extract_bearer_token(parts)?;
        let claims = decode_token::<AdminClaims>(token, &state.jwt_secret)?;
        if claims.role != "ADMIN" {
            return Err(AppError::Unauthorized("Требуется роль ADMIN".into()));
        }
        Ok(AdminUser(claims))
    }
}

impl<S: Send + Sync> FromRequestParts<S> for NodeToken {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let token = extract_bearer_token(parts)?;
        Ok(NodeToken(token.to_string()))
    }
}

/// Создать JWT-токен администратора (TTL 24 часа).
pub fn create_admin_token(email: &str, jwt_secret: &str) -> Result<String, AppError> {
    let now = chrono::Utc::now().timestamp() as usize;
    let claims = AdminClaims {
        sub: email.to_string(),
        role: "ADMIN".to_string(),
        exp: now + ADMIN_TOKEN_TTL_SECS,
        iat: now,
    };
    let key = jsonwebtoken::EncodingKey::from_secret(jwt_secret.as_bytes());
    jsonwebtoken::encode(&jsonwebtoken::Header::default(), &claims, &key)
        .map_err(|e| AppError::Internal(format!("Ошибка создания токена: {e}")))
}

// ── Вспомогательные функции ──────────────────────────────────────────────────

fn extract_bearer_token(parts: &Parts) -> Result<&str, AppError> {
    parts
        .headers
        .get("Authorization")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| AppError::Unauthorized("Отсутствует заголовок Authorization".into()))?
        .strip_prefix("Bearer ")
        .filter(|t| !t.is_empty())
        .ok_or_else(|| AppError::Unauthorized("Ожидается Bearer токен".into()))
}

fn decode_token<T: serde::de::DeserializeOwned>(
    token: &str,
    jwt_secret: &str,
) -> Result<T, AppError> {
    let key = jsonwebtoken::DecodingKey::from_secret(jwt_secret.as_bytes());
    let validation = jsonwebtoken::Validation::default();
    jsonwebtoken::decode::<T>(token, &key, &validation)
        .map(|d| d.claims)
        .map_err(|e| AppError::Unauthorized(format!("Невалидный токен: {e}")))
}
