//! Replay Configuration
//!
//! Configuration is layered:
//!
//! 1. Built-in defaults ([`ReplayConfig::default`])
//! 2. Optional TOML file ([`load_config_from_path`])
//! 3. Command-line / environment overrides ([`ConfigOverrides`])
//!
//! [`ReplayConfig::validate`] runs after the last layer is applied.
//!
//! # Example file
//!
//! ```toml
//! role = "client"
//! host = "192.168.0.10"
//! port = 2112
//! recording = "recordings/lidar.rec"
//! pacing_secs = 0.05
//! strip_newline = true
//! hex = false
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::receiver::{
    ReceiverConfig, DEFAULT_BUFFER_SIZE, DEFAULT_IDLE_BACKOFF, DEFAULT_MAX_EMPTY_READS,
};
use crate::transform::{LineTransform, PayloadEncoding};
use crate::transport::{Endpoint, Role};

/// Default TCP port (SICK LIDAR CoLa port)
pub const DEFAULT_PORT: u16 = 2112;

/// Default bind/connect address
pub const DEFAULT_HOST: &str = "0.0.0.0";

/// Default recording location
pub const DEFAULT_RECORDING: &str = "recordings/20190821122752SB_LIDAR.rec";

/// Default pause before each send, in seconds
pub const DEFAULT_PACING_SECS: f64 = 0.001;

/// Errors raised while building the configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The config file could not be read
    #[error("cannot read config file {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The config file is not valid TOML for this schema
    #[error("invalid config file {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    /// A value is out of range
    #[error("invalid value for {field}: {reason}")]
    Invalid {
        field: &'static str,
        reason: String,
    },
}

/// Complete replayer configuration
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReplayConfig {
    /// Accept (server) or initiate (client) the connection
    pub role: Role,

    /// Bind address in server role, peer address in client role
    pub host: String,

    pub port: u16,

    /// Recording to replay
    pub recording: PathBuf,

    /// Pause before every send and between cycles, in seconds
    pub pacing_secs: f64,

    /// Remove newline characters from every line
    pub strip_newline: bool,

    /// Remove `$...$` annotation spans from every line
    pub strip_markers: bool,

    /// Lines are hex strings
    pub hex: bool,

    /// In server role, keep the peer connection open after a cycle
    pub keep_open: bool,

    /// Stop after this many cycles (None = run until killed)
    pub max_cycles: Option<u64>,

    /// Bound on accept/connect, in seconds (None = wait forever)
    pub establish_timeout_secs: Option<f64>,

    /// Receive buffer size in bytes
    pub receive_buffer: usize,

    /// Pause after an empty read, in milliseconds
    pub idle_backoff_ms: u64,

    /// Empty reads in a row before the receiver gives up
    pub max_empty_reads: u32,
}

impl Default for ReplayConfig {
    fn default() -> Self {
        Self {
            role: Role::Server,
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            recording: PathBuf::from(DEFAULT_RECORDING),
            pacing_secs: DEFAULT_PACING_SECS,
            strip_newline: false,
            strip_markers: true,
            hex: false,
            keep_open: false,
            max_cycles: None,
            establish_timeout_secs: None,
            receive_buffer: DEFAULT_BUFFER_SIZE,
            idle_backoff_ms: DEFAULT_IDLE_BACKOFF.as_millis() as u64,
            max_empty_reads: DEFAULT_MAX_EMPTY_READS,
        }
    }
}

fn seconds(field: &'static str, secs: f64) -> Result<Duration, ConfigError> {
    Duration::try_from_secs_f64(secs).map_err(|e| ConfigError::Invalid {
        field,
        reason: format!("{secs} is not a usable number of seconds ({e})"),
    })
}

impl ReplayConfig {
    /// Check every value that can be out of range
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.pacing_interval()?;
        self.establish_timeout()?;

        if self.receive_buffer == 0 {
            return Err(ConfigError::Invalid {
                field: "receive_buffer",
                reason: "must be at least 1 byte".to_string(),
            });
        }

        if self.max_empty_reads == 0 {
            return Err(ConfigError::Invalid {
                field: "max_empty_reads",
                reason: "must be at least 1".to_string(),
            });
        }

        if self.host.is_empty() {
            return Err(ConfigError::Invalid {
                field: "host",
                reason: "must not be empty".to_string(),
            });
        }

        Ok(())
    }

    #[must_use]
    pub fn endpoint(&self) -> Endpoint {
        Endpoint::new(self.host.clone(), self.port)
    }

    /// Pacing interval as a duration
    pub fn pacing_interval(&self) -> Result<Duration, ConfigError> {
        seconds("pacing_secs", self.pacing_secs)
    }

    pub fn establish_timeout(&self) -> Result<Option<Duration>, ConfigError> {
        self.establish_timeout_secs
            .map(|secs| seconds("establish_timeout_secs", secs))
            .transpose()
    }

    #[must_use]
    pub fn encoding(&self) -> PayloadEncoding {
        if self.hex {
            PayloadEncoding::Hex
        } else {
            PayloadEncoding::Text
        }
    }

    #[must_use]
    pub fn line_transform(&self) -> LineTransform {
        LineTransform {
            strip_markers: self.strip_markers,
            strip_newline: self.strip_newline,
            encoding: self.encoding(),
        }
    }

    #[must_use]
    pub fn receiver_config(&self) -> ReceiverConfig {
        ReceiverConfig {
            buffer_size: self.receive_buffer,
            idle_backoff: Duration::from_millis(self.idle_backoff_ms),
            max_empty_reads: self.max_empty_reads,
            log_as_hex: self.hex,
        }
    }
}

/// Load a configuration file; missing keys take their defaults
pub fn load_config_from_path(path: &Path) -> Result<ReplayConfig, ConfigError> {
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    toml::from_str(&text).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Values supplied on the command line or through the environment
///
/// `None` (or `false` for switches) leaves the underlying value untouched.
#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub client: bool,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub recording: Option<PathBuf>,
    pub pacing_secs: Option<f64>,
    pub strip_newline: bool,
    pub keep_markers: bool,
    pub hex: bool,
    pub keep_open: bool,
    pub max_cycles: Option<u64>,
    pub establish_timeout_secs: Option<f64>,
}

impl ConfigOverrides {
    /// Layer the overrides on top of `config`
    pub fn apply(self, config: &mut ReplayConfig) {
        if self.client {
            config.role = Role::Client;
        }
        if let Some(host) = self.host {
            config.host = host;
        }
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(recording) = self.recording {
            config.recording = recording;
        }
        if let Some(pacing) = self.pacing_secs {
            config.pacing_secs = pacing;
        }
        if let Some(max) = self.max_cycles {
            config.max_cycles = Some(max);
        }
        if let Some(timeout) = self.establish_timeout_secs {
            config.establish_timeout_secs = Some(timeout);
        }

        config.strip_newline |= self.strip_newline;
        config.strip_markers &= !self.keep_markers;
        config.hex |= self.hex;
        config.keep_open |= self.keep_open;
    }
}
