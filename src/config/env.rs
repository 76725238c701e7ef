use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use super::ServerConfig;
use crate::auth::parse_email_list;
use crate::errors::config_error::{ConfigError, ConfigResult};

/// Read a variable, treating empty values as unset.
pub(super) fn env_var(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_env<T>(key: &'static str) -> ConfigResult<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    env_var(key)
        .map(|value| {
            value.parse::<T>().map_err(|e| ConfigError::InvalidValue {
                key,
                value: value.clone(),
                reason: e.to_string(),
            })
        })
        .transpose()
}

pub(super) fn parse_bool(key: &'static str, value: &str) -> ConfigResult<bool> {
    match value.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            key,
            value: value.to_string(),
            reason: "expected true or false".to_string(),
        }),
    }
}

/// Comma separated list; `*` is kept as a single wildcard entry.
pub(super) fn parse_origins(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|origin| origin.trim().to_string())
        .filter(|origin| !origin.is_empty())
        .collect()
}

/// Overlay environment variables onto `config`.
pub(super) fn apply_env(config: &mut ServerConfig) -> ConfigResult<()> {
    if let Some(host) = env_var("HOST") {
        config.host = host;
    }
    if let Some(port) = parse_env::<u16>("PORT")? {
        config.port = port;
    }
    if let Some(cert) = env_var("TLS_CERT_PATH") {
        config.tls_cert_path = Some(PathBuf::from(cert));
    }
    if let Some(key) = env_var("TLS_KEY_PATH") {
        config.tls_key_path = Some(PathBuf::from(key));
    }

    if let Some(provider) = env_var("REALTIME_PROVIDER") {
        config.realtime_provider = provider;
    }
    if let Some(key) = env_var("GEMINI_API_KEY") {
        config.gemini_api_key = Some(key);
    }
    if let Some(model) = env_var("GEMINI_MODEL") {
        config.gemini_model = model;
    }
    if let Some(voice) = env_var("GEMINI_VOICE") {
        config.gemini_voice = voice;
    }
    if let Some(endpoint) = env_var("GEMINI_ENDPOINT") {
        config.gemini_endpoint = Some(endpoint);
    }
    if let Some(instruction) = env_var("SYSTEM_INSTRUCTION") {
        config.system_instruction = Some(instruction);
    }

    if let Some(threshold) = parse_env::<f32>("VAD_THRESHOLD")? {
        config.vad_threshold = threshold;
    }
    if let Some(frames) = parse_env::<u32>("VAD_HANGOVER_FRAMES")? {
        config.vad_hangover_frames = frames;
    }

    if let Some(required) = env_var("AUTH_REQUIRED") {
        config.auth_required = parse_bool("AUTH_REQUIRED", &required)?;
    }
    if let Some(secret) = env_var("JWT_SECRET_KEY") {
        config.jwt_secret = Some(secret);
    }
    if let Some(algorithm) = env_var("JWT_ALGORITHM") {
        config.jwt_algorithm = algorithm;
    }
    if let Some(hours) = parse_env::<u64>("JWT_EXPIRATION_HOURS")? {
        config.jwt_expiration_hours = hours;
    }
    if let Some(emails) = env_var("ALLOWED_EMAILS") {
        config.allowed_emails = parse_email_list(&emails);
    }
    if let Some(file) = env_var("WHITELIST_FILE") {
        config.whitelist_file = Some(PathBuf::from(file));
    }

    if let Some(origins) = env_var("CORS_ORIGINS") {
        config.cors_allowed_origins = parse_origins(&origins);
    }

    Ok(())
}
