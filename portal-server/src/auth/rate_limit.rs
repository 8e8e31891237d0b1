//! Login throttling per client address
//!
//! Fixed windows counted in memory. Counters are per process, so a restart
//! or a second replica starts from zero.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use shared::error::{AppError, ErrorCode};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::security_log;
use crate::state::AppState;

/// Login attempts allowed per address and window
pub const LOGIN_MAX_ATTEMPTS: u32 = 5;
pub const LOGIN_WINDOW: Duration = Duration::from_secs(60);

/// Windows idle for longer than this are dropped by [`RateLimiter::cleanup`].
const IDLE_WINDOW: Duration = Duration::from_secs(300);

struct Window {
    attempts: u32,
    opened_at: Instant,
}

type Bucket = (&'static str, String);

#[derive(Clone, Default)]
pub struct RateLimiter {
    windows: Arc<Mutex<HashMap<Bucket, Window>>>,
}

impl RateLimiter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one attempt for `route` from `addr`. `false` once the window is spent.
    pub async fn check(&self, route: &'static str, addr: &str, max: u32, window: Duration) -> bool {
        let now = Instant::now();
        let mut windows = self.windows.lock().await;
        let current = windows
            .entry((route, addr.to_owned()))
            .or_insert(Window {
                attempts: 0,
                opened_at: now,
            });
        if now.duration_since(current.opened_at) >= window {
            *current = Window {
                attempts: 0,
                opened_at: now,
            };
        }
        current.attempts = current.attempts.saturating_add(1);
        current.attempts <= max
    }

    pub async fn cleanup(&self) {
        let now = Instant::now();
        let mut windows = self.windows.lock().await;
        let before = windows.len();
        windows.retain(|_, w| now.duration_since(w.opened_at) < IDLE_WINDOW);
        let dropped = before - windows.len();
        if dropped > 0 {
            tracing::debug!(dropped, remaining = windows.len(), "Pruned login throttle windows");
        }
    }
}

/// Caller address: first `X-Forwarded-For` hop when behind the proxy, else the socket peer.
fn client_addr(request: &Request) -> String {
    let forwarded = request
        .headers()
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|addr| !addr.is_empty());
    if let Some(addr) = forwarded {
        return addr.to_owned();
    }

    request
        .extensions()
        .get::<axum::extract::ConnectInfo<std::net::SocketAddr>>()
        .map(|ci| ci.0.ip().to_string())
        .unwrap_or_else(|| "unknown".to_owned())
}

/// Middleware on `POST /api/auth/login`
pub async fn login_rate_limit(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, Response> {
    let addr = client_addr(&request);
    if !state
        .rate_limiter
        .check("login", &addr, LOGIN_MAX_ATTEMPTS, LOGIN_WINDOW)
        .await
    {
        security_log!("WARN", "login_rate_limited", ip = addr.as_str());
        return Err(AppError::new(ErrorCode::TooManyAttempts)
            .with_detail("retry_after_secs", LOGIN_WINDOW.as_secs())
            .into_response());
    }
    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http;

    const MINUTE: Duration = Duration::from_secs(60);

    #[tokio::test]
    async fn test_limit_per_route_and_addr() {
        let limiter = RateLimiter::new();
        for _ in 0..3 {
            assert!(limiter.check("login", "10.0.0.1", 3, MINUTE).await);
        }
        assert!(!limiter.check("login", "10.0.0.1", 3, MINUTE).await);
        assert!(limiter.check("login", "10.0.0.2", 3, MINUTE).await);
        assert!(limiter.check("other", "10.0.0.1", 3, MINUTE).await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_window_reopens_after_it_elapses() {
        let limiter = RateLimiter::new();
        assert!(limiter.check("login", "10.0.0.1", 1, MINUTE).await);
        assert!(!limiter.check("login", "10.0.0.1", 1, MINUTE).await);
        tokio::time::advance(MINUTE).await;
        assert!(limiter.check("login", "10.0.0.1", 1, MINUTE).await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cleanup_drops_only_idle_windows() {
        let limiter = RateLimiter::new();
        assert!(limiter.check("login", "10.0.0.1", 1, IDLE_WINDOW * 2).await);
        limiter.cleanup().await;
        assert!(!limiter.check("login", "10.0.0.1", 1, IDLE_WINDOW * 2).await);

        tokio::time::advance(IDLE_WINDOW).await;
        limiter.cleanup().await;
        assert!(limiter.windows.lock().await.is_empty());
    }

    #[test]
    fn test_client_addr_prefers_first_forwarded_hop() {
        let request = http::Request::builder()
            .header("x-forwarded-for", " 203.0.113.7 , 10.0.0.1")
            .body(Body::empty())
            .unwrap();
        assert_eq!(client_addr(&request), "203.0.113.7");

        let request = http::Request::builder().body(Body::empty()).unwrap();
        assert_eq!(client_addr(&request), "unknown");
    }
}
