//! Defines the gateway's HTTP surface.
//!
//! ## Structure
//! - `GET  /`            — bundled frontend page
//! - `GET  /healthz`     — liveness
//! - `GET  /readyz`      — backend readiness
//! - `GET  /list_files`  — paginated folder listing (`?token=&max=`)
//! - `POST /upload`      — multipart upload (field `file`)
//! - `POST /delete`      — delete by JSON `{ "filename": ... }`
//!
//! Every route, the fallback included, sits behind the access gate.

use crate::{
    gate::{AccessGate, middleware::access_gate},
    handlers::{
        file_handlers::{delete_file, list_files, upload_file},
        health_handlers::{healthz, readyz},
        page_handlers::index,
    },
    services::gateway_service::GatewayService,
};
use axum::{
    Router,
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post},
};
use std::sync::Arc;
use tower_http::{catch_panic::CatchPanicLayer, cors::CorsLayer, trace::TraceLayer};

/// Build the router for all gateway routes.
///
/// Layer order, outermost first: panic boundary, request tracing, access
/// gate, CORS, then the routes themselves.
pub fn routes(gate: Arc<AccessGate>) -> Router<GatewayService> {
    Router::new()
        .route("/", get(index))
        // health endpoints (mounted at root)
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        // file routes
        .route("/list_files", get(list_files))
        .route(
            "/upload",
            post(upload_file).layer(DefaultBodyLimit::disable()),
        )
        .route("/delete", post(delete_file))
        .layer(CorsLayer::permissive())
        .layer(middleware::from_fn_with_state(gate, access_gate))
        .layer(TraceLayer::new_for_http())
        .layer(CatchPanicLayer::new())
}

/// Router with its state attached, ready to serve.
pub fn app(service: GatewayService, gate: Arc<AccessGate>) -> Router {
    routes(gate).with_state(service)
}
