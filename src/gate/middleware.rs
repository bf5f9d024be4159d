//! Axum middleware that puts the access gate in front of the router.

use crate::gate::{AccessDecision, AccessGate};
use axum::{
    extract::{ConnectInfo, Request, State},
    middleware::Next,
    response::Response,
};
use std::{net::SocketAddr, sync::Arc};
use tracing::warn;

/// Admit or deny the request before any route logic runs.
///
/// The peer address comes from the connection (`ConnectInfo`); forwarding
/// headers are ignored since clients control them.
pub async fn access_gate(
    State(gate): State<Arc<AccessGate>>,
    request: Request,
    next: Next,
) -> Response {
    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip());

    match gate.decide(peer).await {
        AccessDecision::Allow => next.run(request).await,
        AccessDecision::Deny => {
            warn!(
                peer = ?peer,
                method = %request.method(),
                path = %request.uri().path(),
                "request denied by access gate"
            );
            gate.denial_response()
        }
    }
}
