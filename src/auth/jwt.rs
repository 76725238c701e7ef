//! HMAC-signed access tokens.

use jsonwebtoken::{
    Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode,
    errors::ErrorKind, get_current_timestamp,
};
use serde::{Deserialize, Serialize};

use crate::errors::auth_error::{AuthError, AuthResult};

pub const DEFAULT_JWT_ALGORITHM: &str = "HS256";
pub const DEFAULT_JWT_EXPIRATION_HOURS: u64 = 24;

/// Claims carried by an access token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Expiry, seconds since the Unix epoch
    pub exp: u64,
    /// Issued at, seconds since the Unix epoch
    pub iat: u64,
}

/// Parse a JWT algorithm name, accepting only the HMAC family.
pub fn parse_hmac_algorithm(name: &str) -> Result<Algorithm, String> {
    match name.trim().to_uppercase().as_str() {
        "HS256" => Ok(Algorithm::HS256),
        "HS384" => Ok(Algorithm::HS384),
        "HS512" => Ok(Algorithm::HS512),
        other => Err(format!(
            "Unsupported JWT algorithm '{other}'. Supported: HS256, HS384, HS512"
        )),
    }
}

/// Issues and verifies access tokens with a shared secret.
pub struct JwtHandler {
    algorithm: Algorithm,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    expiration_secs: u64,
}

impl std::fmt::Debug for JwtHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtHandler")
            .field("algorithm", &self.algorithm)
            .field("expiration_secs", &self.expiration_secs)
            .finish_non_exhaustive()
    }
}

impl JwtHandler {
    pub fn new(secret: &str, algorithm: &str, expiration_hours: u64) -> AuthResult<Self> {
        if secret.is_empty() {
            return Err(AuthError::ConfigError("JWT secret is empty".to_string()));
        }
        let algorithm = parse_hmac_algorithm(algorithm).map_err(AuthError::ConfigError)?;

        Ok(Self {
            algorithm,
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            expiration_secs: expiration_hours.saturating_mul(3600),
        })
    }

    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    /// Issue a token for `email`, valid for the configured lifetime.
    pub fn create_token(&self, email: &str, name: Option<&str>) -> AuthResult<String> {
        let now = get_current_timestamp();
        self.encode_claims(&Claims {
            email: email.to_string(),
            name: name.map(str::to_string),
            exp: now.saturating_add(self.expiration_secs),
            iat: now,
        })
    }

    pub fn encode_claims(&self, claims: &Claims) -> AuthResult<String> {
        encode(&Header::new(self.algorithm), claims, &self.encoding_key)
            .map_err(|e| AuthError::ConfigError(format!("Failed to sign token: {e}")))
    }

    /// Check signature and expiry and return the claims.
    pub fn verify_token(&self, token: &str) -> AuthResult<Claims> {
        let validation = Validation::new(self.algorithm);
        decode::<Claims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => AuthError::TokenExpired,
                _ => AuthError::InvalidToken(e.to_string()),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-secret-key";

    #[test]
    fn test_create_and_verify() {
        let handler = JwtHandler::new(SECRET, "HS256", 24).unwrap();
        let token = handler
            .create_token("user@example.com", Some("User"))
            .unwrap();

        let claims = handler.verify_token(&token).unwrap();
        assert_eq!(claims.email, "user@example.com");
        assert_eq!(claims.name.as_deref(), Some("User"));
        assert_eq!(claims.exp - claims.iat, 24 * 3600);
    }

    #[test]
    fn test_wrong_secret_is_rejected() {
        let issuer = JwtHandler::new(SECRET, "HS256", 1).unwrap();
        let verifier = JwtHandler::new("another-secret", "HS256", 1).unwrap();
        let token = issuer.create_token("user@example.com", None).unwrap();

        assert!(matches!(
            verifier.verify_token(&token),
            Err(AuthError::InvalidToken(_))
        ));
    }

    #[test]
    fn test_expired_token() {
        let handler = JwtHandler::new(SECRET, "HS512", 1).unwrap();
        let now = get_current_timestamp();
        let token = handler
            .encode_claims(&Claims {
                email: "user@example.com".to_string(),
                name: None,
                exp: now - 3600,
                iat: now - 7200,
            })
            .unwrap();

        assert_eq!(handler.verify_token(&token), Err(AuthError::TokenExpired));
    }

    #[test]
    fn test_garbage_token() {
        let handler = JwtHandler::new(SECRET, "HS256", 1).unwrap();
        assert!(matches!(
            handler.verify_token("not.a.token"),
            Err(AuthError::InvalidToken(_))
        ));
    }

    #[test]
    fn test_algorithm_parsing() {
        assert_eq!(parse_hmac_algorithm("hs384").unwrap(), Algorithm::HS384);
        assert!(parse_hmac_algorithm("RS256").is_err());
        assert!(JwtHandler::new(SECRET, "ES256", 1).is_err());
        assert!(JwtHandler::new("", "HS256", 1).is_err());
    }
}
