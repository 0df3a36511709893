//! Fixed-window, per-client rate limiting for the public routes.

use std::{
  sync::Arc,
  time::{Duration, Instant},
};

use axum::{
  extract::{Request, State},
  middleware::Next,
  response::{IntoResponse, Response},
};
use dashmap::DashMap;

use crate::{client::client_ip, error::ApiError};

/// Windows tracked before stale ones are swept.
const SWEEP_THRESHOLD: usize = 10_000;

struct Window {
  started: Instant,
  count:   u32,
}

/// Counts requests per client key within one-minute windows.
pub struct RateLimiter {
  per_window:          u32,
  window:              Duration,
  trust_forwarded_for: bool,
  clients:             DashMap<String, Window>,
}

impl RateLimiter {
  /// `per_minute == 0` disables limiting.
  pub fn new(per_minute: u32, trust_forwarded_for: bool) -> Self {
    Self {
      per_window: per_minute,
      window: Duration::from_secs(60),
      trust_forwarded_for,
      clients: DashMap::new(),
    }
  }

  /// Record a request from `key`; `false` when it is over the limit.
  pub fn check(&self, key: &str) -> bool { self.check_at(key, Instant::now()) }

  fn check_at(&self, key: &str, now: Instant) -> bool {
    if self.per_window == 0 {
      return true;
    }
    if self.clients.len() > SWEEP_THRESHOLD {
      self
        .clients
        .retain(|_, w| now.duration_since(w.started) < self.window);
    }

    let mut window = self
      .clients
      .entry(key.to_owned())
      .or_insert(Window { started: now, count: 0 });
    if now.duration_since(window.started) >= self.window {
      *window = Window { started: now, count: 0 };
    }
    if window.count >= self.per_window {
      return false;
    }
    window.count += 1;
    true
  }
}

/// Middleware rejecting clients over their budget with `429`.
pub async fn enforce(
  State(limiter): State<Arc<RateLimiter>>,
  req: Request,
  next: Next,
) -> Response {
  let key = client_ip(req.headers(), req.extensions(), limiter.trust_forwarded_for)
    .unwrap_or_else(|| "unknown".to_owned());

  if !limiter.check(&key) {
    tracing::warn!(client = %key, path = %req.uri().path(), "rate limit exceeded");
    return ApiError::TooManyRequests.into_response();
  }
  next.run(req).await
}
