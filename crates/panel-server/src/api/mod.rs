//! HTTP API: маршрутизация и состояние приложения.

pub mod admin_routes;
pub mod auth_routes;
pub mod middleware;
pub mod node_routes;
pub mod rate_limit;
pub mod subscription_routes;

use crate::store::SeaOrmStore;
use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use rate_limit::RateLimiter;
use sea_orm::{ConnectionTrait, DatabaseConnection};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Общее состояние приложения.
#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    /// Порт хранилища для генерации конфигов и импорта
    pub store: SeaOrmStore,
    pub jwt_secret: String,
    pub admin_email: String,
    pub admin_password_hash: String,
    pub rate_limiter: RateLimiter,
}

/// Построить маршрутизатор Axum.
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Публичные маршруты ограничены по IP: ссылку подписки и логин можно перебирать
    let limited_routes = Router::new()
        .merge(auth_routes::routes())
        .merge(subscription_routes::routes())
        .layer(axum::middleware::from_fn_with_state(
            state.rate_limiter.clone(),
            rate_limit::rate_limit_middleware,
        ));

    Router::new()
        .route("/health", get(health_check))
        .merge(limited_routes)
        .nest("/api/v1", node_routes::routes())
        .nest("/api/v1/admin", admin_routes::routes())
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// GET /health — проверка работоспособности сервера.
async fn health_check(State(state): State<AppState>) -> Json<serde_json::Value> {
    let db_ok = state.db.execute_unprepared("SELECT 1").await.is_ok();
    Json(serde_json::json!({
        "status": if db_ok { "ok" } else { "error" },
        "database": db_ok,
        "service": "panel-server"
    }))
}
