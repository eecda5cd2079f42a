//! In-memory rate limiter с фиксированным окном на IP.

use crate::error::AppError;
use axum::extract::{ConnectInfo, State};
use axum::http::Request;
use axum::middleware::Next;
use axum::response::Response;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

/// Порог размера таблицы, после которого вычищаются истёкшие окна.
const PRUNE_THRESHOLD: usize = 1000;

struct Window {
    hits: u32,
    started: Instant,
}

#[derive(Clone)]
pub struct RateLimiter {
    windows: Arc<Mutex<HashMap<String, Window>>>,
    max_requests: u32,
    window: Duration,
}

impl RateLimiter {
    pub fn new(max_requests: u32, window_secs: u64) -> Self {
        Self {
            windows: Arc::new(Mutex::new(HashMap::new())),
            max_requests,
            window: Duration::from_secs(window_secs),
        }
    }

    /// Учесть запрос. `false`, если лимит окна исчерпан.
    pub async fn check(&self, key: &str) -> bool {
        let mut windows = self.windows.lock().await;
        let now = Instant::now();

        if windows.len() > PRUNE_THRESHOLD {
            windows.retain(|_, w| now.duration_since(w.started) < self.window);
        }

        let window = windows.entry(key.to_string()).or_insert(Window {
            hits: 0,
            started: now,
        });
        if now.duration_since(window.started) >= self.window {
            window.hits = 0;
            window.started = now;
        }

        window.hits += 1;
        window.hits <= self.max_requests
    }
}

pub async fn rate_limit_middleware(
    State(limiter): State<RateLimiter>,
    req: Request<axum::body::Body>,
    next: Next,
) -> Result<Response, AppError> {
    let ip = client_ip(&req);

    if !limiter.check(&ip).await {
        tracing::warn!("Превышен лимит запросов для IP {ip}: {}", req.uri().path());
        return Err(AppError::TooManyRequests);
    }

    Ok(next.run(req).await)
}

/// IP клиента: первый адрес X-Forwarded-For, иначе адрес соединения.
pub fn client_ip<B>(req: &Request<B>) -> String {
    req.headers()
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.split(',').next())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .or_else(|| {
            req.extensions()
                .get::<ConnectInfo<SocketAddr>>()
                .map(|ci| ci.0.ip().to_string())
        })
        .unwrap_or_else(|| "unknown".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_limit_is_per_key() {
        let limiter = RateLimiter::new(2, 60);
        assert!(limiter.check("1.1.1.1").await);
        assert!(limiter.check("1.1.1.1").await);
        assert!(!limiter.check("1.1.1.1").await);
        assert!(limiter.check("2.2.2.2").await);
    }

    #[tokio::test]
    async fn test_window_resets() {
        let limiter = RateLimiter::new(1, 0);
        assert!(limiter.check("k").await);
        assert!(limiter.check("k").await);
    }
}
