use serde::Deserialize;
use std::path::Path;

use super::ServerConfig;
use crate::errors::config_error::{ConfigError, ConfigResult};

/// Complete YAML configuration structure
///
/// All fields are optional to allow partial configuration. Values present in
/// the file override the environment.
///
/// # Example YAML structure
/// ```yaml
/// server:
///   host: "0.0.0.0"
///   port: 8000
///   tls:
///     cert_path: "/etc/voice-relay/cert.pem"
///     key_path: "/etc/voice-relay/key.pem"
///
/// gemini:
///   provider: "gemini"
///   api_key: "your-gemini-key"
///   model: "gemini-2.5-flash-native-audio-preview-09-2025"
///   voice: "Zephyr"
///   system_instruction: "Translate Korean to English and English to Korean."
///
/// vad:
///   threshold: 500
///   hangover_frames: 15
///
/// auth:
///   required: true
///   jwt_secret: "change-me"
///   jwt_algorithm: "HS256"
///   jwt_expiration_hours: 24
///   allowed_emails:
///     - "alice@example.com"
///   whitelist_file: "/etc/voice-relay/allowed_emails.txt"
///
/// security:
///   cors_origins:
///     - "https://interpreter.example.com"
/// ```
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct YamlConfig {
    pub server: Option<ServerYaml>,
    pub gemini: Option<GeminiYaml>,
    pub vad: Option<VadYaml>,
    pub auth: Option<AuthYaml>,
    pub security: Option<SecurityYaml>,
}

/// Server configuration from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct ServerYaml {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub tls: Option<TlsYaml>,
}

/// TLS configuration from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct TlsYaml {
    pub cert_path: Option<String>,
    pub key_path: Option<String>,
}

/// Upstream model configuration from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct GeminiYaml {
    pub provider: Option<String>,
    pub api_key: Option<String>,
    pub model: Option<String>,
    pub voice: Option<String>,
    pub endpoint: Option<String>,
    pub system_instruction: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct VadYaml {
    pub threshold: Option<f32>,
    pub hangover_frames: Option<u32>,
}

/// Authentication configuration from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AuthYaml {
    pub required: Option<bool>,
    pub jwt_secret: Option<String>,
    pub jwt_algorithm: Option<String>,
    pub jwt_expiration_hours: Option<u64>,
    pub allowed_emails: Option<Vec<String>>,
    pub whitelist_file: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct SecurityYaml {
    pub cors_origins: Option<Vec<String>>,
}

impl YamlConfig {
    /// Load YAML configuration from a file
    pub fn from_file(path: &Path) -> ConfigResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let config: YamlConfig = serde_yaml::from_str(&contents)?;
        Ok(config)
    }

    /// Overlay every value present in the file onto `config`.
    pub fn apply_to(self, config: &mut ServerConfig) {
        if let Some(server) = self.server {
            if let Some(host) = server.host {
                config.host = host;
            }
            if let Some(port) = server.port {
                config.port = port;
            }
            if let Some(tls) = server.tls {
                if let Some(cert) = tls.cert_path {
                    config.tls_cert_path = Some(cert.into());
                }
                if let Some(key) = tls.key_path {
                    config.tls_key_path = Some(key.into());
                }
            }
        }

        if let Some(gemini) = self.gemini {
            if let Some(provider) = gemini.provider {
                config.realtime_provider = provider;
            }
            if let Some(api_key) = gemini.api_key {
                config.gemini_api_key = Some(api_key);
            }
            if let Some(model) = gemini.model {
                config.gemini_model = model;
            }
            if let Some(voice) = gemini.voice {
                config.gemini_voice = voice;
            }
            if let Some(endpoint) = gemini.endpoint {
                config.gemini_endpoint = Some(endpoint);
            }
            if let Some(instruction) = gemini.system_instruction {
                config.system_instruction = Some(instruction);
            }
        }

        if let Some(vad) = self.vad {
            if let Some(threshold) = vad.threshold {
                config.vad_threshold = threshold;
            }
            if let Some(frames) = vad.hangover_frames {
                config.vad_hangover_frames = frames;
            }
        }

        if let Some(auth) = self.auth {
            if let Some(required) = auth.required {
                config.auth_required = required;
            }
            if let Some(secret) = auth.jwt_secret {
                config.jwt_secret = Some(secret);
            }
            if let Some(algorithm) = auth.jwt_algorithm {
                config.jwt_algorithm = algorithm;
            }
            if let Some(hours) = auth.jwt_expiration_hours {
                config.jwt_expiration_hours = hours;
            }
            if let Some(emails) = auth.allowed_emails {
                config.allowed_emails = emails
                    .iter()
                    .map(|e| e.trim().to_lowercase())
                    .filter(|e| !e.is_empty())
                    .collect();
            }
            if let Some(file) = auth.whitelist_file {
                config.whitelist_file = Some(file.into());
            }
        }

        if let Some(security) = self.security
            && let Some(origins) = security.cors_origins
        {
            config.cors_allowed_origins = origins;
        }
    }
}
