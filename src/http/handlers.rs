//! Built-in routes served alongside embedder-supplied resource routers.

use axum::{
    extract::Request,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Serialize;

use crate::http::response::Rejection;
use crate::security::Principal;

#[derive(Serialize)]
pub struct SystemStatus {
    pub version: &'static str,
    pub status: &'static str,
}

pub async fn get_status() -> Json<SystemStatus> {
    Json(SystemStatus {
        version: env!("CARGO_PKG_VERSION"),
        status: "operational",
    })
}

/// The principal the gate attached to this request.
pub async fn get_me(request: Request) -> Response {
    match request.extensions().get::<Principal>() {
        Some(principal) => Json(principal.clone()).into_response(),
        None => Rejection::Unauthenticated.into_response(),
    }
}

pub fn builtin_routes() -> Router {
    Router::new()
        .route("/status", get(get_status))
        .route("/me", get(get_me))
}
