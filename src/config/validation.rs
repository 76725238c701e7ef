use std::path::PathBuf;

use crate::auth::parse_hmac_algorithm;
use crate::core::realtime::RealtimeProvider;
use crate::core::vad::VADConfig;
use crate::errors::config_error::{ConfigError, ConfigResult};

/// `AUTH_REQUIRED` is meaningless without a signing secret.
pub fn validate_auth_required(auth_required: bool, jwt_secret: &Option<String>) -> ConfigResult<()> {
    if auth_required && jwt_secret.as_deref().is_none_or(str::is_empty) {
        return Err(ConfigError::Validation(
            "AUTH_REQUIRED is enabled but JWT_SECRET_KEY is not set".to_string(),
        ));
    }
    Ok(())
}

pub fn validate_jwt(algorithm: &str, expiration_hours: u64) -> ConfigResult<()> {
    parse_hmac_algorithm(algorithm).map_err(ConfigError::Validation)?;
    if expiration_hours == 0 {
        return Err(ConfigError::Validation(
            "JWT_EXPIRATION_HOURS must be at least 1".to_string(),
        ));
    }
    Ok(())
}

/// Certificate and key must be configured together.
pub fn validate_tls(cert: &Option<PathBuf>, key: &Option<PathBuf>) -> ConfigResult<()> {
    match (cert, key) {
        (Some(_), None) => Err(ConfigError::Validation(
            "TLS_CERT_PATH is set but TLS_KEY_PATH is missing".to_string(),
        )),
        (None, Some(_)) => Err(ConfigError::Validation(
            "TLS_KEY_PATH is set but TLS_CERT_PATH is missing".to_string(),
        )),
        _ => Ok(()),
    }
}

pub fn validate_vad(threshold: f32, hangover_frames: u32) -> ConfigResult<()> {
    VADConfig::new(threshold, hangover_frames)
        .validate()
        .map_err(ConfigError::Validation)
}

pub fn validate_provider(provider: &str) -> ConfigResult<()> {
    if RealtimeProvider::parse(provider).is_none() {
        return Err(ConfigError::Validation(format!(
            "Unsupported realtime provider: {provider}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_required_needs_secret() {
        assert!(validate_auth_required(true, &None).is_err());
        assert!(validate_auth_required(true, &Some(String::new())).is_err());
        assert!(validate_auth_required(true, &Some("secret".into())).is_ok());
        assert!(validate_auth_required(false, &None).is_ok());
    }

    #[test]
    fn test_jwt_algorithm_must_be_hmac() {
        assert!(validate_jwt("HS256", 24).is_ok());
        assert!(validate_jwt("RS256", 24).is_err());
        assert!(validate_jwt("HS512", 0).is_err());
    }

    #[test]
    fn test_tls_pair() {
        let path = Some(PathBuf::from("/tmp/x.pem"));
        assert!(validate_tls(&None, &None).is_ok());
        assert!(validate_tls(&path, &path).is_ok());
        assert!(validate_tls(&path, &None).is_err());
        assert!(validate_tls(&None, &path).is_err());
    }

    #[test]
    fn test_vad_threshold() {
        assert!(validate_vad(0.0, 0).is_ok());
        assert!(validate_vad(-1.0, 15).is_err());
        assert!(validate_vad(f32::NAN, 15).is_err());
    }

    #[test]
    fn test_provider() {
        assert!(validate_provider("gemini").is_ok());
        assert!(validate_provider("openai").is_err());
    }
}
