//! Relay configuration management.
//!
//! Consolidates all environment variable reads and provides validated configuration.

use singular::{
    codec::MAX_FRAME_SIZE,
    config::{ConfigError, parse_env_or},
};
use std::net::SocketAddr;

const DEFAULT_BIND: &str = "127.0.0.1:6969";

/// Complete relay configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Server bind address
    pub bind: SocketAddr,
    /// Maximum number of rooms open at once
    pub max_rooms: usize,
    /// Maximum members per room
    pub max_members: usize,
    /// Largest accepted websocket frame, in bytes
    pub max_frame_bytes: usize,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([127, 0, 0, 1], 6969)),
            max_rooms: 1024,
            max_members: 10,
            max_frame_bytes: MAX_FRAME_SIZE,
        }
    }
}

impl RelayConfig {
    /// Load configuration from environment variables
    ///
    /// `bind_override` comes from the command line and wins over
    /// `RELAY_BIND`.
    ///
    /// # Errors
    ///
    /// Returns error if `RELAY_BIND` is set but is not a socket address
    pub fn from_env(bind_override: Option<SocketAddr>) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let bind = match bind_override {
            Some(bind) => bind,
            None => {
                let raw = std::env::var("RELAY_BIND").unwrap_or_else(|_| DEFAULT_BIND.to_string());
                raw.parse().map_err(|_| ConfigError::Invalid {
                    var: "RELAY_BIND".to_string(),
                    reason: format!("{raw:?} is not an IP:PORT address"),
                })?
            }
        };

        Ok(Self {
            bind,
            max_rooms: parse_env_or("RELAY_MAX_ROOMS", defaults.max_rooms),
            max_members: parse_env_or("RELAY_MAX_MEMBERS", defaults.max_members),
            max_frame_bytes: parse_env_or("RELAY_MAX_FRAME_BYTES", defaults.max_frame_bytes),
        })
    }

    /// Validate configuration after loading
    ///
    /// # Errors
    ///
    /// Returns error if a limit is out of range
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_rooms == 0 {
            return Err(ConfigError::Invalid {
                var: "RELAY_MAX_ROOMS".to_string(),
                reason: "Must be greater than 0".to_string(),
            });
        }

        if self.max_members < 2 {
            return Err(ConfigError::Invalid {
                var: "RELAY_MAX_MEMBERS".to_string(),
                reason: "A game needs at least 2 members".to_string(),
            });
        }

        if self.max_frame_bytes == 0 || self.max_frame_bytes > MAX_FRAME_SIZE {
            return Err(ConfigError::Invalid {
                var: "RELAY_MAX_FRAME_BYTES".to_string(),
                reason: format!("Must be between 1 and {MAX_FRAME_SIZE}"),
            });
        }

        Ok(())
    }
}
