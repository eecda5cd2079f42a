//! Публичная ссылка подписки: `/sub/{public_id}`.

use crate::api::AppState;
use crate::error::AppError;
use crate::services::subscription_config::{self, OutputFormat, RenderedConfig};
use axum::extract::{Path, Query, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct SubscriptionQuery {
    pub format: Option<String>,
}

pub fn routes() -> Router<AppState> {
    Router::new().route("/sub/{public_id}", get(get_subscription))
}

/// GET /sub/{public_id}?format=json|raw|base64 — конфигурация для клиента.
async fn get_subscription(
    State(state): State<AppState>,
    Path(public_id): Path<String>,
    Query(query): Query<SubscriptionQuery>,
) -> Result<Response, AppError> {
    let format = match query.format.as_deref() {
        Some(f) => f.parse::<OutputFormat>().map_err(AppError::BadRequest)?,
        None => OutputFormat::default(),
    };

    let document =
        subscription_config::resolve_config_by_public_id(&state.store, &public_id).await?;

    Ok(match subscription_config::render(document, format) {
        RenderedConfig::Json(doc) => Json(doc).into_response(),
        RenderedConfig::Text(text) => (
            [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
            text,
        )
            .into_response(),
    })
}
