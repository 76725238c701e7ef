//! Configuration module for the voice-relay server
//!
//! This module handles server configuration from various sources: .env files, YAML files,
//! and environment variables. Priority: YAML > ENV vars > .env values > defaults.
//!
//! # Modules
//! - `yaml`: YAML configuration file loading
//! - `env`: Environment variable loading
//! - `validation`: Configuration validation logic
//!
//! # Example
//! ```rust,no_run
//! use voice_relay::config::ServerConfig;
//! use std::path::PathBuf;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! // Load from environment variables only
//! let config = ServerConfig::from_env()?;
//!
//! // Load from YAML file with environment variable base
//! let config_path = PathBuf::from("config.yaml");
//! let config = ServerConfig::from_file(&config_path)?;
//!
//! println!("Server listening on {}", config.address());
//! # Ok(())
//! # }
//! ```

use std::path::{Path, PathBuf};

mod env;
mod validation;
mod yaml;

pub use yaml::YamlConfig;

use crate::auth::{DEFAULT_JWT_ALGORITHM, DEFAULT_JWT_EXPIRATION_HOURS};
use crate::core::realtime::RealtimeConfig;
use crate::core::realtime::gemini::{GEMINI_DEFAULT_MODEL, GEMINI_DEFAULT_VOICE};
use crate::core::vad::{DEFAULT_HANGOVER_FRAMES, DEFAULT_VAD_THRESHOLD, VADConfig};
use crate::errors::config_error::ConfigResult;

pub const DEFAULT_HOST: &str = "localhost";
pub const DEFAULT_PORT: u16 = 8000;
pub const DEFAULT_REALTIME_PROVIDER: &str = "gemini";
/// Origins of the development web client
pub const DEFAULT_CORS_ORIGINS: &str = "http://localhost:5173,http://127.0.0.1:5173";

/// TLS configuration for HTTPS and WSS
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TlsConfig {
    /// Path to the TLS certificate file (PEM format)
    pub cert_path: PathBuf,
    /// Path to the TLS private key file (PEM format)
    pub key_path: PathBuf,
}

/// Server configuration
///
/// Covers:
/// - Listener settings (host, port, TLS)
/// - Upstream model settings (provider, API key, model, voice, instruction)
/// - Voice activity gate tuning
/// - Client authentication (JWT secret, allow-list)
/// - CORS origins
#[derive(Debug, Clone)]
pub struct ServerConfig {
    // Server settings
    pub host: String,
    pub port: u16,
    pub tls_cert_path: Option<PathBuf>,
    pub tls_key_path: Option<PathBuf>,

    // Upstream model
    pub realtime_provider: String,
    pub gemini_api_key: Option<String>,
    pub gemini_model: String,
    pub gemini_voice: String,
    /// Overrides the public Live API URL, mostly for tests and proxies
    pub gemini_endpoint: Option<String>,
    /// `None` uses the built-in interpreter prompt
    pub system_instruction: Option<String>,

    // Voice activity detection
    pub vad_threshold: f32,
    pub vad_hangover_frames: u32,

    // Authentication
    pub auth_required: bool,
    pub jwt_secret: Option<String>,
    pub jwt_algorithm: String,
    pub jwt_expiration_hours: u64,
    pub allowed_emails: Vec<String>,
    pub whitelist_file: Option<PathBuf>,

    // Security
    /// Allowed browser origins; `*` allows any
    pub cors_allowed_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            tls_cert_path: None,
            tls_key_path: None,
            realtime_provider: DEFAULT_REALTIME_PROVIDER.to_string(),
            gemini_api_key: None,
            gemini_model: GEMINI_DEFAULT_MODEL.to_string(),
            gemini_voice: GEMINI_DEFAULT_VOICE.to_string(),
            gemini_endpoint: None,
            system_instruction: None,
            vad_threshold: DEFAULT_VAD_THRESHOLD,
            vad_hangover_frames: DEFAULT_HANGOVER_FRAMES,
            auth_required: false,
            jwt_secret: None,
            jwt_algorithm: DEFAULT_JWT_ALGORITHM.to_string(),
            jwt_expiration_hours: DEFAULT_JWT_EXPIRATION_HOURS,
            allowed_emails: Vec::new(),
            whitelist_file: None,
            cors_allowed_origins: env::parse_origins(DEFAULT_CORS_ORIGINS),
        }
    }
}

/// Implement Drop to zeroize all secret fields when ServerConfig is dropped.
impl Drop for ServerConfig {
    fn drop(&mut self) {
        use zeroize::Zeroize;

        if let Some(ref mut key) = self.gemini_api_key {
            key.zeroize();
        }
        if let Some(ref mut secret) = self.jwt_secret {
            secret.zeroize();
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables on top of the defaults.
    ///
    /// The .env file is loaded in main.rs at application startup, so its values
    /// are already visible here as environment variables.
    pub fn from_env() -> ConfigResult<Self> {
        let mut config = Self::default();
        env::apply_env(&mut config)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a YAML file with environment variable base
    ///
    /// Priority order (highest to lowest):
    /// 1. YAML file values
    /// 2. Environment variables (actual ENV vars override .env values)
    /// 3. .env file values
    /// 4. Default values
    ///
    /// # Errors
    /// Returns an error if:
    /// - The YAML file cannot be read or is malformed
    /// - Environment variables have invalid formats
    /// - Configuration validation fails
    pub fn from_file(path: &Path) -> ConfigResult<Self> {
        let yaml_config = YamlConfig::from_file(path)?;

        let mut config = Self::default();
        env::apply_env(&mut config)?;
        yaml_config.apply_to(&mut config);

        config.validate()?;
        Ok(config)
    }

    /// Check cross-field constraints
    pub fn validate(&self) -> ConfigResult<()> {
        validation::validate_tls(&self.tls_cert_path, &self.tls_key_path)?;
        validation::validate_provider(&self.realtime_provider)?;
        validation::validate_vad(self.vad_threshold, self.vad_hangover_frames)?;
        validation::validate_jwt(&self.jwt_algorithm, self.jwt_expiration_hours)?;
        validation::validate_auth_required(self.auth_required, &self.jwt_secret)?;
        Ok(())
    }

    /// Get the server address as a string
    ///
    /// Returns the address in the format "host:port"
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn tls(&self) -> Option<TlsConfig> {
        match (&self.tls_cert_path, &self.tls_key_path) {
            (Some(cert), Some(key)) => Some(TlsConfig {
                cert_path: cert.clone(),
                key_path: key.clone(),
            }),
            _ => None,
        }
    }

    pub fn is_tls_enabled(&self) -> bool {
        self.tls().is_some()
    }

    pub fn has_jwt_auth(&self) -> bool {
        self.jwt_secret.as_deref().is_some_and(|s| !s.is_empty())
    }

    /// Allow any browser origin
    pub fn allows_any_origin(&self) -> bool {
        self.cors_allowed_origins.iter().any(|o| o == "*")
    }

    /// Upstream provider template shared by every session
    pub fn realtime_config(&self) -> RealtimeConfig {
        RealtimeConfig {
            api_key: self.gemini_api_key.clone().unwrap_or_default(),
            model: self.gemini_model.clone(),
            voice: Some(self.gemini_voice.clone()),
            instructions: self.system_instruction.clone(),
            modalities: Some(vec!["AUDIO".to_string()]),
            input_audio_transcription: true,
            output_audio_transcription: true,
            endpoint: self.gemini_endpoint.clone(),
            handshake_timeout_ms: None,
        }
    }

    pub fn vad_config(&self) -> VADConfig {
        VADConfig::new(self.vad_threshold, self.vad_hangover_frames)
    }
}
