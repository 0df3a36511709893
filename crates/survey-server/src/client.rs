//! Request metadata captured alongside each submission.

use std::{convert::Infallible, net::SocketAddr};

use axum::{
  extract::{ConnectInfo, FromRequestParts},
  http::{Extensions, HeaderMap, header, request::Parts},
};
use survey_core::{record::RequestMeta, store::RecordBackend};

use crate::AppState;

/// Longest `User-Agent` kept, in characters.
const MAX_USER_AGENT_LEN: usize = 512;

/// The client's address: the first `X-Forwarded-For` hop when trusted,
/// otherwise the peer address of the socket.
pub fn client_ip(
  headers: &HeaderMap,
  extensions: &Extensions,
  trust_forwarded_for: bool,
) -> Option<String> {
  if trust_forwarded_for {
    let forwarded = headers
      .get("x-forwarded-for")
      .and_then(|v| v.to_str().ok())
      .and_then(|v| v.split(',').next())
      .map(str::trim)
      .filter(|s| !s.is_empty());
    if let Some(ip) = forwarded {
      return Some(ip.to_owned());
    }
  }

  extensions
    .get::<ConnectInfo<SocketAddr>>()
    .map(|ConnectInfo(addr)| addr.ip().to_string())
}

/// Extracts the [`RequestMeta`] audit data for the current request.
pub struct ClientMeta(pub RequestMeta);

impl<B> FromRequestParts<AppState<B>> for ClientMeta
where
  B: RecordBackend + Clone + 'static,
{
  type Rejection = Infallible;

  async fn from_request_parts(
    parts: &mut Parts,
    state: &AppState<B>,
  ) -> Result<Self, Self::Rejection> {
    let user_agent = parts
      .headers
      .get(header::USER_AGENT)
      .and_then(|v| v.to_str().ok())
      .map(str::trim)
      .filter(|s| !s.is_empty())
      .map(|s| s.chars().take(MAX_USER_AGENT_LEN).collect());

    let ip = client_ip(
      &parts.headers,
      &parts.extensions,
      state.config.trust_forwarded_for,
    );

    Ok(ClientMeta(RequestMeta { user_agent, ip }))
  }
}
