use std::sync::Arc;
use thiserror::Error;

use crate::auth::AuthService;
use crate::config::ServerConfig;
use crate::core::realtime::{RealtimeError, RealtimeFactory, create_realtime_factory};
use crate::core::session::SessionSettings;
use crate::errors::auth_error::AuthError;

/// Shared application state
///
/// Holds the configuration, the upstream provider factory every session opens
/// its connection through, and the authentication service when a JWT secret
/// is configured.
pub struct AppState {
    pub config: ServerConfig,
    pub realtime_factory: Arc<dyn RealtimeFactory>,
    pub session_settings: SessionSettings,
    pub auth: Option<Arc<AuthService>>,
}

impl AppState {
    /// Build state for the configured provider.
    pub fn new(config: ServerConfig) -> Result<Arc<Self>, StateError> {
        let factory = create_realtime_factory(&config.realtime_provider)?;
        Self::with_factory(config, factory)
    }

    /// Build state around a specific upstream factory.
    pub fn with_factory(
        config: ServerConfig,
        realtime_factory: Arc<dyn RealtimeFactory>,
    ) -> Result<Arc<Self>, StateError> {
        let auth = AuthService::from_config(&config)?.map(Arc::new);
        if config.gemini_api_key.is_none() {
            tracing::warn!("GEMINI_API_KEY is not set, sessions will fail to connect upstream");
        }

        let session_settings = SessionSettings::new(config.realtime_config(), config.vad_config());

        Ok(Arc::new(Self {
            config,
            realtime_factory,
            session_settings,
            auth,
        }))
    }
}

/// Failures while assembling [`AppState`]
#[derive(Debug, Error)]
pub enum StateError {
    #[error(transparent)]
    Realtime(#[from] RealtimeError),
    #[error(transparent)]
    Auth(#[from] AuthError),
}
