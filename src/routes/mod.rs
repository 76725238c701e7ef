//! Router assembly

pub mod api;
pub mod realtime;

use axum::{Router, middleware};
use http::{
    HeaderValue, Method,
    header::{AUTHORIZATION, CONTENT_TYPE},
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::set_header::SetResponseHeaderLayer;
use tracing::info;

use crate::middleware::auth_middleware;
use crate::state::AppState;

/// Build the full application: public routes, the authenticated session
/// socket, CORS and security headers.
pub fn create_app(app_state: Arc<AppState>) -> Router {
    let cors_layer = cors_layer(&app_state.config.cors_allowed_origins);

    let realtime_routes = realtime::create_realtime_router().layer(
        middleware::from_fn_with_state(app_state.clone(), auth_middleware),
    );

    // Security headers
    let security_headers = tower::ServiceBuilder::new()
        .layer(SetResponseHeaderLayer::overriding(
            http::header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            http::header::X_FRAME_OPTIONS,
            HeaderValue::from_static("DENY"),
        ));

    api::create_api_router()
        .merge(realtime_routes)
        .with_state(app_state)
        .layer(cors_layer)
        .layer(security_headers)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let base = CorsLayer::new()
        .allow_methods([Method::GET, Method::OPTIONS])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE]);

    if origins.iter().any(|o| o == "*") {
        return base.allow_origin(Any).allow_credentials(false);
    }

    let parsed: Vec<HeaderValue> = origins.iter().filter_map(|s| s.parse().ok()).collect();
    if parsed.is_empty() {
        // No allow_origin = same-origin only (browsers block cross-origin requests)
        info!("CORS not configured, defaulting to same-origin only");
        return base.allow_credentials(false);
    }
    base.allow_origin(parsed).allow_credentials(true)
}
