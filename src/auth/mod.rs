//! Client authentication
//!
//! Clients present an HMAC-signed JWT either on the WebSocket upgrade
//! (`Authorization: Bearer` or `?token=`) or in the `init` message. A token is
//! accepted when its signature and expiry check out and its email is on the
//! allow-list.

pub mod allowlist;
pub mod jwt;

use std::fmt;

pub use allowlist::{EmailAllowList, parse_email_list};
pub use jwt::{
    Claims, DEFAULT_JWT_ALGORITHM, DEFAULT_JWT_EXPIRATION_HOURS, JwtHandler, parse_hmac_algorithm,
};

use crate::config::ServerConfig;
use crate::errors::auth_error::{AuthError, AuthResult};

/// An authenticated client
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub email: String,
    pub name: Option<String>,
}

/// Authentication outcome attached to each request by the auth middleware
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Auth {
    /// Authentication is turned off
    Disabled,
    /// No credential on the upgrade; the `init` message must carry one
    Pending,
    Verified(Principal),
    /// A credential was presented and refused
    Rejected(String),
}

impl Auth {
    pub fn is_verified(&self) -> bool {
        matches!(self, Auth::Verified(_))
    }
}

impl fmt::Display for Auth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Auth::Disabled => write!(f, "disabled"),
            Auth::Pending => write!(f, "pending"),
            Auth::Verified(principal) => write!(f, "verified({})", principal.email),
            Auth::Rejected(_) => write!(f, "rejected"),
        }
    }
}

/// Token verification plus allow-list lookup
#[derive(Debug)]
pub struct AuthService {
    jwt: JwtHandler,
    allow_list: EmailAllowList,
}

impl AuthService {
    pub fn new(jwt: JwtHandler, allow_list: EmailAllowList) -> Self {
        Self { jwt, allow_list }
    }

    /// Build from server configuration. Returns `None` when no JWT secret is set.
    pub fn from_config(config: &ServerConfig) -> AuthResult<Option<Self>> {
        let Some(secret) = config.jwt_secret.as_deref() else {
            return Ok(None);
        };
        let jwt = JwtHandler::new(secret, &config.jwt_algorithm, config.jwt_expiration_hours)?;
        let allow_list = EmailAllowList::load(&config.allowed_emails, config.whitelist_file.clone())
            .map_err(|e| AuthError::ConfigError(format!("Failed to load allow-list: {e}")))?;
        Ok(Some(Self::new(jwt, allow_list)))
    }

    pub fn jwt(&self) -> &JwtHandler {
        &self.jwt
    }

    pub fn allow_list(&self) -> &EmailAllowList {
        &self.allow_list
    }

    /// Verify a token and check its email against the allow-list.
    pub fn verify(&self, token: &str) -> AuthResult<Principal> {
        let claims = self.jwt.verify_token(token)?;
        if !self.allow_list.is_allowed(&claims.email) {
            return Err(AuthError::EmailNotAllowed(claims.email));
        }
        Ok(Principal {
            email: claims.email,
            name: claims.name,
        })
    }

    pub fn issue_token(&self, email: &str, name: Option<&str>) -> AuthResult<String> {
        self.jwt.create_token(email, name)
    }
}
