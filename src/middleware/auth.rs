use crate::auth::Auth;
use crate::errors::auth_error::AuthError;
use crate::routes::realtime::WS_PATH;
use crate::state::AppState;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;

/// Extract authentication token from request
///
/// Supports multiple token sources for browser/WebSocket compatibility:
/// 1. Authorization header: `Authorization: Bearer <token>` (preferred)
/// 2. Query parameter: `?token=<token>` (for WebSocket connections)
fn extract_token(request: &Request) -> Result<String, AuthError> {
    // Try Authorization header first (preferred method)
    if let Some(auth_header) = request.headers().get("authorization") {
        let auth_str = auth_header
            .to_str()
            .map_err(|_| AuthError::InvalidAuthHeader)?;

        if let Some(token) = auth_str.strip_prefix("Bearer ") {
            tracing::debug!("Token extracted from Authorization header");
            return Ok(token.to_string());
        }
        return Err(AuthError::InvalidAuthHeader);
    }

    // Try query parameter (for WebSocket browser connections)
    if let Some(query) = request.uri().query() {
        for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
            if key == "token" {
                tracing::debug!("Token extracted from query parameter");
                return Ok(value.to_string());
            }
        }
    }

    // No token found
    Err(AuthError::MissingAuthHeader)
}

/// Authentication middleware that validates bearer tokens
///
/// Token extraction priority (for browser/WebSocket compatibility):
/// 1. Authorization header: `Authorization: Bearer <token>`
/// 2. Query parameter: `?token=<token>`
///
/// The session socket is never refused at upgrade time. Without a token it
/// gets `Auth::Pending` and must authenticate with its `init` message; with a
/// bad token it gets `Auth::Rejected` and the handler reports the failure
/// over the socket before closing it with a policy violation. Other routes
/// fail with an HTTP error.
pub async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Result<Response, AuthError> {
    // Skip authentication if auth is not required
    if !state.config.auth_required {
        tracing::debug!("Authentication disabled");
        request.extensions_mut().insert(Auth::Disabled);
        return Ok(next.run(request).await);
    }

    let request_method = request.method().to_string();
    let request_path = request.uri().path().to_string();
    let is_session_socket = request_path == WS_PATH;

    tracing::debug!(
        method = %request_method,
        path = %request_path,
        "Starting authentication validation"
    );

    let token = match extract_token(&request) {
        Ok(t) => t,
        Err(e) => {
            if is_session_socket {
                tracing::info!(
                    path = %request_path,
                    "WebSocket connection without token, enabling first-message auth"
                );
                request.extensions_mut().insert(Auth::Pending);
                return Ok(next.run(request).await);
            }
            return Err(e);
        }
    };

    let auth_service = state
        .auth
        .as_ref()
        .ok_or_else(|| AuthError::ConfigError("Auth service not initialized".to_string()))?;

    match auth_service.verify(&token) {
        Ok(principal) => {
            tracing::info!(
                method = %request_method,
                path = %request_path,
                email = %principal.email,
                "JWT authentication successful"
            );
            request.extensions_mut().insert(Auth::Verified(principal));
            Ok(next.run(request).await)
        }
        Err(e) => {
            tracing::warn!(
                method = %request_method,
                path = %request_path,
                error = %e,
                "JWT authentication failed"
            );
            if is_session_socket {
                request.extensions_mut().insert(Auth::Rejected(e.to_string()));
                return Ok(next.run(request).await);
            }
            Err(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::StatusCode;
    use axum::{Extension, Router, middleware, routing::get};
    use tower::ServiceExt;

    use crate::config::ServerConfig;

    async fn describe(Extension(auth): Extension<Auth>) -> String {
        auth.to_string()
    }

    fn app(auth_required: bool) -> (Router, Arc<AppState>) {
        let mut config = ServerConfig::default();
        config.auth_required = auth_required;
        config.jwt_secret = Some("middleware-secret".to_string());
        config.allowed_emails = vec!["alice@example.com".to_string()];
        let state = AppState::new(config).unwrap();

        let router = Router::new()
            .route(WS_PATH, get(describe))
            .route("/private", get(describe))
            .layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
            .with_state(state.clone());
        (router, state)
    }

    async fn body_text(response: Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), 1024).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    fn get_request(uri: &str, bearer: Option<&str>) -> Request {
        let mut builder = Request::builder().uri(uri);
        if let Some(token) = bearer {
            builder = builder.header("authorization", format!("Bearer {token}"));
        }
        builder.body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn test_disabled_auth_passes_through() {
        let (router, _) = app(false);
        let response = router.oneshot(get_request("/private", None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_text(response).await, "disabled");
    }

    #[tokio::test]
    async fn test_socket_without_token_is_pending() {
        let (router, _) = app(true);
        let response = router.oneshot(get_request(WS_PATH, None)).await.unwrap();
        assert_eq!(body_text(response).await, "pending");
    }

    #[tokio::test]
    async fn test_valid_token_in_query() {
        let (router, state) = app(true);
        let token = state
            .auth
            .as_ref()
            .unwrap()
            .issue_token("alice@example.com", None)
            .unwrap();

        let response = router
            .oneshot(get_request(&format!("{WS_PATH}?token={token}"), None))
            .await
            .unwrap();
        assert_eq!(body_text(response).await, "verified(alice@example.com)");
    }

    #[tokio::test]
    async fn test_socket_with_bad_token_is_rejected_not_refused() {
        let (router, _) = app(true);
        let response = router
            .oneshot(get_request(WS_PATH, Some("garbage")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_text(response).await, "rejected");
    }

    #[tokio::test]
    async fn test_other_routes_require_token() {
        let (router, state) = app(true);
        let response = router
            .clone()
            .oneshot(get_request("/private", None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let token = state
            .auth
            .as_ref()
            .unwrap()
            .issue_token("mallory@example.com", None)
            .unwrap();
        let response = router
            .oneshot(get_request("/private", Some(&token)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }
}
