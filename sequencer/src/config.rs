//! Configuration (`spec.md` §6, "Configuration").
//!
//! Three layers, lowest priority first: built-in defaults, an optional TOML
//! file, then CLI flags/env vars — the same precedence as the teacher's own
//! validator binary (`clap` for flags/env, `toml` for the file, CLI
//! overrides file values).

use clap::Parser;
use serde::Deserialize;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

#[derive(Parser, Debug)]
#[command(name = "sequencer", about = "Ballot ingestion and worker-orchestration service")]
pub struct Cli {
    /// Optional TOML config file; CLI flags/env vars override its values.
    #[arg(long, env = "SEQUENCER_CONFIG")]
    pub config: Option<PathBuf>,

    #[arg(long, env = "SEQUENCER_LISTEN_HOST")]
    pub listen_host: Option<String>,

    #[arg(long, env = "SEQUENCER_LISTEN_PORT")]
    pub listen_port: Option<u16>,

    /// Chain/network name, framed into the signed voter digest.
    #[arg(long, env = "SEQUENCER_CHAIN_ID")]
    pub chain_id: Option<String>,

    /// Process-wide seed hashed into the worker-facing UUID. Omit to
    /// disable the `/workers/*` endpoints entirely.
    #[arg(long, env = "SEQUENCER_WORKER_SEED")]
    pub worker_seed: Option<String>,

    #[arg(long, env = "SEQUENCER_WORKER_JOB_TIMEOUT_MILLIS")]
    pub worker_job_timeout_millis: Option<u64>,

    #[arg(long, env = "SEQUENCER_MAX_CONSECUTIVE_FAILURES")]
    pub max_consecutive_failures: Option<u32>,

    #[arg(long, env = "SEQUENCER_BAN_TIMEOUT_MILLIS")]
    pub ban_timeout_millis: Option<u64>,

    #[arg(long, env = "SEQUENCER_SWEEP_INTERVAL_MILLIS")]
    pub sweep_interval_millis: Option<u64>,

    /// Path to the raw (canonical-compressed) Groth16 verification key.
    #[arg(long, env = "SEQUENCER_VERIFICATION_KEY_PATH")]
    pub verification_key_path: Option<PathBuf>,
}

/// All fields optional — a partially-specified TOML file is valid, and
/// anything it omits falls through to `Config::default()`.
#[derive(Debug, Default, Deserialize)]
struct FileConfig {
    listen_host: Option<String>,
    listen_port: Option<u16>,
    chain_id: Option<String>,
    worker_seed: Option<String>,
    worker_job_timeout_millis: Option<u64>,
    max_consecutive_failures: Option<u32>,
    ban_timeout_millis: Option<u64>,
    sweep_interval_millis: Option<u64>,
    verification_key_path: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub listen_host: String,
    pub listen_port: u16,
    pub chain_id: String,
    pub worker_seed: Option<String>,
    pub worker_job_timeout_millis: u64,
    pub max_consecutive_failures: u32,
    pub ban_timeout_millis: u64,
    pub sweep_interval_millis: u64,
    pub verification_key_path: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen_host: "0.0.0.0".to_string(),
            listen_port: 8080,
            chain_id: "vocdoni-1".to_string(),
            worker_seed: None,
            worker_job_timeout_millis: 30_000,
            max_consecutive_failures: 3,
            ban_timeout_millis: 60_000,
            sweep_interval_millis: 5_000,
            verification_key_path: PathBuf::from("verification_key.bin"),
        }
    }
}

impl Config {
    pub fn load(cli: Cli) -> Result<Self, ConfigError> {
        let file = match &cli.config {
            Some(path) => Self::read_file(path)?,
            None => FileConfig::default(),
        };

        let defaults = Config::default();
        Ok(Config {
            listen_host: cli.listen_host.or(file.listen_host).unwrap_or(defaults.listen_host),
            listen_port: cli.listen_port.or(file.listen_port).unwrap_or(defaults.listen_port),
            chain_id: cli.chain_id.or(file.chain_id).unwrap_or(defaults.chain_id),
            worker_seed: cli.worker_seed.or(file.worker_seed),
            worker_job_timeout_millis: cli
                .worker_job_timeout_millis
                .or(file.worker_job_timeout_millis)
                .unwrap_or(defaults.worker_job_timeout_millis),
            max_consecutive_failures: cli
                .max_consecutive_failures
                .or(file.max_consecutive_failures)
                .unwrap_or(defaults.max_consecutive_failures),
            ban_timeout_millis: cli
                .ban_timeout_millis
                .or(file.ban_timeout_millis)
                .unwrap_or(defaults.ban_timeout_millis),
            sweep_interval_millis: cli
                .sweep_interval_millis
                .or(file.sweep_interval_millis)
                .unwrap_or(defaults.sweep_interval_millis),
            verification_key_path: cli
                .verification_key_path
                .or(file.verification_key_path)
                .unwrap_or(defaults.verification_key_path),
        })
    }

    fn read_file(path: &PathBuf) -> Result<FileConfig, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.clone(),
            source,
        })?;
        toml::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.clone(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cli_with(config: Option<PathBuf>) -> Cli {
        Cli {
            config,
            listen_host: None,
            listen_port: None,
            chain_id: None,
            worker_seed: None,
            worker_job_timeout_millis: None,
            max_consecutive_failures: None,
            ban_timeout_millis: None,
            sweep_interval_millis: None,
            verification_key_path: None,
        }
    }

    #[test]
    fn defaults_apply_when_nothing_is_set() {
        let config = Config::load(cli_with(None)).unwrap();
        assert_eq!(config.listen_port, 8080);
        assert!(config.worker_seed.is_none());
    }

    #[test]
    fn cli_overrides_take_priority() {
        let mut cli = cli_with(None);
        cli.listen_port = Some(9999);
        let config = Config::load(cli).unwrap();
        assert_eq!(config.listen_port, 9999);
    }
}
