// ============================
// crates/backend-lib/src/handlers/extract.rs
// ============================
//! Request extractors shared by the auth handlers.
use std::convert::Infallible;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use axum::{
    extract::{ConnectInfo, FromRequestParts},
    http::{header, request::Parts, HeaderMap},
};

use crate::auth::{cookie::extract_session_token, ClientMeta};
use crate::AppState;

/// Session token from the request cookie, if present
#[derive(Debug, Clone, Default)]
pub struct SessionToken(pub Option<String>);

impl<S: Send + Sync> FromRequestParts<S> for SessionToken {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self(extract_session_token(&parts.headers)))
    }
}

impl<S: Send + Sync> FromRequestParts<Arc<AppState<S>>> for ClientMeta {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState<S>>,
    ) -> Result<Self, Self::Rejection> {
        Ok(client_meta(parts, state.settings.server.trust_forwarded_headers))
    }
}

/// Peer address and user agent of a request.
///
/// Forwarded headers are client-controlled unless a proxy rewrites them, so
/// they only replace the socket peer when `trust_forwarded` is set.
fn client_meta(parts: &Parts, trust_forwarded: bool) -> ClientMeta {
    let peer = parts
        .extensions
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip());
    let ip = if trust_forwarded {
        forwarded_ip(&parts.headers).or(peer)
    } else {
        peer
    };
    let user_agent = parts
        .headers
        .get(header::USER_AGENT)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string);

    ClientMeta { ip, user_agent }
}

/// Client address reported by a reverse proxy
fn forwarded_ip(headers: &HeaderMap) -> Option<IpAddr> {
    let first_hop = headers
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next());

    first_hop
        .or_else(|| headers.get("x-real-ip").and_then(|value| value.to_str().ok()))
        .and_then(|value| value.trim().parse().ok())
}
