//! Session configuration management.
//!
//! Consolidates the environment variable reads for pacing and game sizing
//! and validates them.

use std::time::Duration;

use crate::game::OPENING_HAND_SIZE;

/// Fixed delays used by the opening deal and the presentation sequencer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Pacing {
    /// Delay between two steps of the host's opening deal loop
    pub deal_step: Duration,
    /// Delay between two face-down cards of one deal to another seat
    pub deal_card_interval: Duration,
    /// Delay between capturing a flying card's start and end positions
    pub fly_delay: Duration,
    /// Lifetime of a dealt or drawn card token
    pub token_lifetime: Duration,
    /// Lifetime of a played card token
    pub play_token_lifetime: Duration,
    /// Delay before the table is re-rendered after a play
    pub play_settle: Duration,
}

impl Default for Pacing {
    fn default() -> Self {
        Self {
            deal_step: Duration::from_millis(100),
            deal_card_interval: Duration::from_millis(100),
            fly_delay: Duration::from_millis(20),
            token_lifetime: Duration::from_millis(300),
            play_token_lifetime: Duration::from_millis(500),
            play_settle: Duration::from_millis(200),
        }
    }
}

/// Complete session configuration
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionConfig {
    pub pacing: Pacing,
    /// Cards dealt to every player by the opening deal
    pub opening_hand_size: usize,
    /// Players required before the host may start
    pub min_players: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            pacing: Pacing::default(),
            opening_hand_size: OPENING_HAND_SIZE,
            min_players: 2,
        }
    }
}

impl SessionConfig {
    /// Load configuration from environment variables, falling back to the
    /// defaults for anything unset or unparsable.
    ///
    /// # Errors
    ///
    /// Returns error if the resulting configuration is invalid
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Pacing::default();
        let pacing = Pacing {
            deal_step: env_millis_or("SINGULAR_DEAL_STEP_MS", defaults.deal_step),
            deal_card_interval: env_millis_or(
                "SINGULAR_DEAL_CARD_INTERVAL_MS",
                defaults.deal_card_interval,
            ),
            fly_delay: env_millis_or("SINGULAR_FLY_DELAY_MS", defaults.fly_delay),
            token_lifetime: env_millis_or("SINGULAR_TOKEN_LIFETIME_MS", defaults.token_lifetime),
            play_token_lifetime: env_millis_or(
                "SINGULAR_PLAY_TOKEN_LIFETIME_MS",
                defaults.play_token_lifetime,
            ),
            play_settle: env_millis_or("SINGULAR_PLAY_SETTLE_MS", defaults.play_settle),
        };

        let config = Self {
            pacing,
            opening_hand_size: parse_env_or("SINGULAR_OPENING_HAND", OPENING_HAND_SIZE),
            min_players: parse_env_or("SINGULAR_MIN_PLAYERS", 2),
        };
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration after loading
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.opening_hand_size == 0 {
            return Err(ConfigError::Invalid {
                var: "SINGULAR_OPENING_HAND".to_string(),
                reason: "Must be greater than 0".to_string(),
            });
        }

        if self.min_players < 2 {
            return Err(ConfigError::Invalid {
                var: "SINGULAR_MIN_PLAYERS".to_string(),
                reason: "Must be at least 2".to_string(),
            });
        }

        // A drawn card has to reach its slot before its token is removed.
        if self.pacing.fly_delay >= self.pacing.token_lifetime {
            return Err(ConfigError::Invalid {
                var: "SINGULAR_FLY_DELAY_MS".to_string(),
                reason: format!(
                    "Must be shorter than the token lifetime ({}ms)",
                    self.pacing.token_lifetime.as_millis()
                ),
            });
        }

        Ok(())
    }
}

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration for {var}: {reason}")]
    Invalid { var: String, reason: String },
}

/// Helper to parse environment variable with default fallback
pub fn parse_env_or<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr,
{
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_millis_or(key: &str, default: Duration) -> Duration {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .map_or(default, Duration::from_millis)
}
