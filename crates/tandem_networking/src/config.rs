//! # Engine Configuration
//!
//! Every tunable lives in [`EngineConfig`]. All sections default to the
//! built-in constants, so an empty TOML file is a valid config:
//!
//! ```toml
//! log_capacity = 80
//!
//! [arena]
//! width = 960.0
//! height = 540.0
//! padding = 24.0
//!
//! [simulation]
//! speed = 180.0
//! broadcast_hz = 30
//! max_frame_dt = 0.1
//!
//! [controllers]
//! dead_zone = 0.3
//! poll_interval_ms = 16
//!
//! [signaling]
//! host = "signal.example.org"
//! port = 9000
//! path = "/peerjs"
//! secure = true
//! ```

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tandem_shared::constants::{
    CONTROLLER_DEAD_ZONE, CONTROLLER_POLL_INTERVAL_MS, DEFAULT_SIGNALING_PATH, MAX_FRAME_DT,
};
use tandem_shared::{Arena, BROADCAST_HZ, MAX_LOG_ITEMS, PLAYER_SPEED};

use crate::error::{ConfigError, ConfigResult};

/// Top-level engine configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Play area.
    pub arena: Arena,
    /// Movement and broadcast tuning.
    pub simulation: SimulationConfig,
    /// Controller polling.
    pub controllers: ControllerConfig,
    /// Maximum number of event log entries kept.
    pub log_capacity: usize,
    /// Signaling server selection.
    pub signaling: SignalingConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            arena: Arena::default(),
            simulation: SimulationConfig::default(),
            controllers: ControllerConfig::default(),
            log_capacity: MAX_LOG_ITEMS,
            signaling: SignalingConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Parses and validates a TOML document.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for bad syntax and
    /// [`ConfigError::Invalid`] for out-of-range values.
    pub fn from_toml_str(source: &str) -> ConfigResult<Self> {
        let config: Self = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read, otherwise as
    /// [`EngineConfig::from_toml_str`].
    pub fn load(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        let source = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&source)
    }

    /// Checks every value is usable.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first bad value.
    pub fn validate(&self) -> ConfigResult<()> {
        let arena = &self.arena;
        if !(arena.width > 0.0 && arena.height > 0.0) {
            return Err(invalid(format!(
                "arena must have positive extent, got {}x{}",
                arena.width, arena.height
            )));
        }
        if !(arena.padding >= 0.0
            && arena.padding * 2.0 < arena.width
            && arena.padding * 2.0 < arena.height)
        {
            return Err(invalid(format!(
                "arena padding {} leaves no room to move",
                arena.padding
            )));
        }
        if !(self.simulation.speed > 0.0) {
            return Err(invalid(format!(
                "simulation.speed must be positive, got {}",
                self.simulation.speed
            )));
        }
        if self.simulation.broadcast_hz == 0 {
            return Err(invalid("simulation.broadcast_hz must be positive"));
        }
        if !(self.simulation.max_frame_dt > 0.0) {
            return Err(invalid("simulation.max_frame_dt must be positive"));
        }
        if !(0.0..1.0).contains(&self.controllers.dead_zone) {
            return Err(invalid(format!(
                "controllers.dead_zone must be in [0, 1), got {}",
                self.controllers.dead_zone
            )));
        }
        if self.controllers.poll_interval_ms == 0 {
            return Err(invalid("controllers.poll_interval_ms must be positive"));
        }
        if self.log_capacity == 0 {
            return Err(invalid("log_capacity must be positive"));
        }
        Ok(())
    }
}

fn invalid(message: impl Into<String>) -> ConfigError {
    ConfigError::Invalid(message.into())
}

/// Movement and broadcast tuning.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Movement speed in arena units per second.
    pub speed: f32,
    /// State broadcasts per second.
    pub broadcast_hz: u32,
    /// Longest frame step in seconds. Longer gaps are clamped.
    pub max_frame_dt: f32,
}

impl SimulationConfig {
    /// Interval between state broadcasts.
    #[must_use]
    pub fn broadcast_period(&self) -> Duration {
        Duration::from_secs_f64(1.0 / f64::from(self.broadcast_hz.max(1)))
    }

    /// Longest frame step as a duration.
    #[must_use]
    pub fn max_frame_step(&self) -> Duration {
        Duration::from_secs_f32(self.max_frame_dt.max(0.0))
    }
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            speed: PLAYER_SPEED,
            broadcast_hz: BROADCAST_HZ,
            max_frame_dt: MAX_FRAME_DT,
        }
    }
}

/// Controller polling.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    /// Stick deflection that must be exceeded to count as held.
    pub dead_zone: f32,
    /// Milliseconds between polls.
    pub poll_interval_ms: u64,
}

impl ControllerConfig {
    /// Interval between polls.
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            dead_zone: CONTROLLER_DEAD_ZONE,
            poll_interval_ms: CONTROLLER_POLL_INTERVAL_MS,
        }
    }
}

/// Signaling server selection. A blank host means the provider's default
/// cloud.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SignalingConfig {
    /// Host name of a self-hosted signaling server.
    pub host: String,
    /// Port; missing or non-positive picks the scheme default.
    pub port: Option<i64>,
    /// URL path; blank picks `/peerjs`.
    pub path: String,
    /// Use TLS.
    pub secure: bool,
}

/// Where the discovery layer should register.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignalingEndpoint {
    /// The provider's hosted service.
    DefaultCloud,
    /// A self-hosted server.
    Custom {
        /// Host name.
        host: String,
        /// Port.
        port: u16,
        /// Path, always starting with `/`.
        path: String,
        /// Use TLS.
        secure: bool,
    },
}

impl SignalingConfig {
    /// Resolves the user's fields into an endpoint.
    #[must_use]
    pub fn resolve(&self) -> SignalingEndpoint {
        let host = self.host.trim();
        if host.is_empty() {
            return SignalingEndpoint::DefaultCloud;
        }

        let default_port = if self.secure { 443 } else { 80 };
        let port = self
            .port
            .filter(|port| *port > 0)
            .and_then(|port| u16::try_from(port).ok())
            .unwrap_or(default_port);

        let path = self.path.trim();
        let path = if path.is_empty() {
            DEFAULT_SIGNALING_PATH.to_owned()
        } else if path.starts_with('/') {
            path.to_owned()
        } else {
            format!("/{path}")
        };

        SignalingEndpoint::Custom {
            host: host.to_owned(),
            port,
            path,
            secure: self.secure,
        }
    }
}

impl SignalingEndpoint {
    /// Human-readable form for logs.
    #[must_use]
    pub fn describe(&self) -> String {
        match self {
            Self::DefaultCloud => String::from("default signaling cloud"),
            Self::Custom {
                host,
                port,
                path,
                secure,
            } => {
                let scheme = if *secure { "https" } else { "http" };
                format!("{scheme}://{host}:{port}{path}")
            }
        }
    }
}
