//! Command-line interface

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use replayer_core::{load_config_from_path, ConfigOverrides, ReplayConfig};

/// Data Replayer - replay a recorded device trace over TCP
#[derive(Parser, Debug)]
#[command(name = "data-replayer")]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// TCP port to listen on (server) or connect to (client) [default: 2112]
    #[arg(long, env = "REPLAYER_PORT", value_name = "PORT")]
    pub port: Option<u16>,

    /// Enable debug logging
    #[arg(short = 'v', long)]
    pub verbose: bool,

    /// Recording to replay
    /// [default: recordings/20190821122752SB_LIDAR.rec]
    #[arg(short = 'f', long, env = "REPLAYER_FILE", value_name = "FILE")]
    pub file: Option<PathBuf>,

    /// Seconds to wait before each message [default: 0.001]
    #[arg(short = 't', long, env = "REPLAYER_TIMEOUT", value_name = "SECONDS")]
    pub timeout: Option<f64>,

    /// Connect to the peer instead of waiting for it
    #[arg(short = 'c', long)]
    pub client: bool,

    /// Delete newlines from every line before sending
    #[arg(short = 'n', long)]
    pub newline: bool,

    /// Address to bind (server) or connect to (client) [default: 0.0.0.0]
    #[arg(short = 'i', long, env = "REPLAYER_IP", value_name = "ADDR")]
    pub ip: Option<String>,

    /// Lines are hex strings; send the decoded bytes
    #[arg(long)]
    pub hex: bool,

    /// Send `$...$` annotations instead of stripping them
    #[arg(long)]
    pub keep_markers: bool,

    /// Server role: keep the peer connection open after each cycle
    #[arg(long)]
    pub keep_open: bool,

    /// Stop after this many passes over the recording
    #[arg(long, env = "REPLAYER_CYCLES", value_name = "N")]
    pub cycles: Option<u64>,

    /// Give up if no connection is established within this many seconds
    #[arg(long, env = "REPLAYER_ESTABLISH_TIMEOUT", value_name = "SECONDS")]
    pub establish_timeout: Option<f64>,

    /// TOML configuration file; flags override its values
    #[arg(long, env = "REPLAYER_CONFIG", value_name = "FILE")]
    pub config: Option<PathBuf>,
}

impl Args {
    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            client: self.client,
            host: self.ip.clone(),
            port: self.port,
            recording: self.file.clone(),
            pacing_secs: self.timeout,
            strip_newline: self.newline,
            keep_markers: self.keep_markers,
            hex: self.hex,
            keep_open: self.keep_open,
            max_cycles: self.cycles,
            establish_timeout_secs: self.establish_timeout,
        }
    }

    /// Build the validated configuration: defaults, then file, then flags
    pub fn resolve(&self) -> Result<ReplayConfig> {
        let mut config = match &self.config {
            Some(path) => load_config_from_path(path)?,
            None => ReplayConfig::default(),
        };

        self.overrides().apply(&mut config);
        config.validate().context("Invalid configuration")?;

        Ok(config)
    }
}
