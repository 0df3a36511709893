//! HTTP layer for the survey intake service.
//!
//! Exposes an axum [`Router`] backed by any [`RecordBackend`]: public routes
//! for the intake form, Basic-auth admin routes for reading and exporting, and
//! a health probe.

pub mod auth;
pub mod client;
pub mod config;
pub mod error;
pub mod export;
pub mod handlers;
pub mod rate_limit;

pub use config::ServerConfig;
pub use error::ApiError;

use std::{sync::Arc, time::Duration};

use axum::{
  Router,
  http::{HeaderValue, Method, header},
  middleware,
  routing::{get, post},
};
use survey_core::{SurveyStore, store::RecordBackend};
use tower_http::{
  cors::{AllowOrigin, CorsLayer},
  trace::TraceLayer,
};

use auth::AdminAuth;
use handlers::{admin, health, submissions};
use rate_limit::RateLimiter;

// ─── Application state ────────────────────────────────────────────────────────

/// Shared state threaded through all axum handlers.
#[derive(Clone)]
pub struct AppState<B: RecordBackend> {
  pub store:   Arc<SurveyStore<B>>,
  pub config:  Arc<ServerConfig>,
  pub auth:    Arc<AdminAuth>,
  pub limiter: Arc<RateLimiter>,
}

impl<B: RecordBackend> AppState<B> {
  pub fn new(backend: B, config: ServerConfig) -> Self {
    Self {
      store:   Arc::new(SurveyStore::new(backend)),
      auth:    Arc::new(AdminAuth {
        username:      config.admin_username.clone(),
        password_hash: config.admin_password_hash.clone(),
      }),
      limiter: Arc::new(RateLimiter::new(
        config.rate_limit_per_minute,
        config.trust_forwarded_for,
      )),
      config:  Arc::new(config),
    }
  }
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// Build the full application router.
pub fn router<B>(state: AppState<B>) -> Router
where
  B: RecordBackend + Clone + 'static,
{
  let public = Router::new()
    .route("/api/survey", post(submissions::submit::<B>))
    .route("/api/survey/{identifier}", get(submissions::prefill::<B>))
    .route("/api/survey/{identifier}/status", get(submissions::status::<B>))
    .route_layer(middleware::from_fn_with_state(
      state.limiter.clone(),
      rate_limit::enforce,
    ));

  let admin = Router::new()
    .route("/api/admin/surveys", get(admin::list::<B>))
    .route("/api/admin/surveys/{identifier}", get(admin::get_one::<B>))
    .route("/api/admin/export", get(admin::export::<B>));

  Router::new()
    .route("/health", get(health::handler::<B>))
    .merge(public)
    .merge(admin)
    .layer(cors_layer(&state.config))
    .layer(TraceLayer::new_for_http())
    .with_state(state)
}

fn cors_layer(config: &ServerConfig) -> CorsLayer {
  let origins: Vec<HeaderValue> = config
    .cors_origins
    .iter()
    .filter_map(|o| match o.parse() {
      Ok(v) => Some(v),
      Err(_) => {
        tracing::warn!(origin = %o, "ignoring unparseable CORS origin");
        None
      }
    })
    .collect();

  let allow_origin = if origins.is_empty() {
    AllowOrigin::any()
  } else {
    AllowOrigin::list(origins)
  };

  CorsLayer::new()
    .allow_origin(allow_origin)
    .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
    .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
    .max_age(Duration::from_secs(60 * 60))
}

// ─── Integration tests ────────────────────────────────────────────────────────
