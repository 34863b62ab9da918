//! Command-line interface parsing for railcache
//!
//! Every flag can also be set through an environment variable, so the usual
//! `PORT=8080 railcache` deployment works without arguments.

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use thiserror::Error;

use crate::data::UPSTREAM_URL;
use crate::refresh::RefreshConfig;

/// Error types for CLI argument validation
#[derive(Debug, Error)]
pub enum CliError {
    /// The refresh interval must be at least one second
    #[error("Invalid refresh interval: must be at least 1 second")]
    ZeroInterval,

    /// The fetch timeout must be at least one second
    #[error("Invalid fetch timeout: must be at least 1 second")]
    ZeroTimeout,
}

/// railcache - serves a cached snapshot of live rail vehicle positions
#[derive(Parser, Debug)]
#[command(name = "railcache")]
#[command(about = "Caching proxy for live rail vehicle positions")]
#[command(version)]
pub struct Cli {
    /// Port to listen on
    #[arg(long, env = "PORT", default_value_t = 3000)]
    pub port: u16,

    /// Address to bind
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    pub host: IpAddr,

    /// Seconds between upstream refreshes
    #[arg(long, env = "REFRESH_INTERVAL_SECS", value_name = "SECS", default_value_t = 60)]
    pub refresh_interval: u64,

    /// Seconds before an upstream request is abandoned
    #[arg(long, env = "FETCH_TIMEOUT_SECS", value_name = "SECS", default_value_t = 15)]
    pub fetch_timeout: u64,

    /// Directory of static frontend assets
    #[arg(long, env = "PUBLIC_DIR", default_value = "public")]
    pub public_dir: PathBuf,

    /// Write each new snapshot to this JSON file (e.g. public/timetables.json)
    #[arg(long, env = "MIRROR_FILE", value_name = "PATH")]
    pub mirror_file: Option<PathBuf>,

    /// GraphQL endpoint to poll
    #[arg(long, env = "UPSTREAM_URL", default_value = UPSTREAM_URL)]
    pub upstream_url: String,
}

/// Validated runtime configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Socket address to listen on
    pub addr: SocketAddr,
    pub refresh: RefreshConfig,
    pub public_dir: PathBuf,
    pub mirror_file: Option<PathBuf>,
    pub upstream_url: String,
}

impl ServerConfig {
    /// Creates a ServerConfig from parsed CLI arguments.
    ///
    /// # Returns
    /// * `Ok(ServerConfig)` with durations converted from seconds
    /// * `Err(CliError)` if the interval or timeout is zero
    pub fn from_cli(cli: &Cli) -> Result<Self, CliError> {
        if cli.refresh_interval == 0 {
            return Err(CliError::ZeroInterval);
        }
        if cli.fetch_timeout == 0 {
            return Err(CliError::ZeroTimeout);
        }

        Ok(ServerConfig {
            addr: SocketAddr::new(cli.host, cli.port),
            refresh: RefreshConfig {
                interval: Duration::from_secs(cli.refresh_interval),
                timeout: Duration::from_secs(cli.fetch_timeout),
            },
            public_dir: cli.public_dir.clone(),
            mirror_file: cli.mirror_file.clone(),
            upstream_url: cli.upstream_url.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("railcache").chain(args.iter().copied()))
            .expect("arguments should parse")
    }

    #[test]
    fn test_cli_parse_explicit_port() {
        let cli = parse(&["--port", "8080"]);
        assert_eq!(cli.port, 8080);
    }

    #[test]
    fn test_cli_parse_rejects_non_numeric_port() {
        let result = Cli::try_parse_from(["railcache", "--port", "http"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_server_config_from_cli_converts_units() {
        let cli = parse(&[
            "--port",
            "4000",
            "--host",
            "127.0.0.1",
            "--refresh-interval",
            "30",
            "--fetch-timeout",
            "5",
            "--mirror-file",
            "public/timetables.json",
        ]);

        let config = ServerConfig::from_cli(&cli).unwrap();

        assert_eq!(config.addr, "127.0.0.1:4000".parse().unwrap());
        assert_eq!(config.refresh.interval, Duration::from_secs(30));
        assert_eq!(config.refresh.timeout, Duration::from_secs(5));
        assert_eq!(config.mirror_file, Some(PathBuf::from("public/timetables.json")));
    }

    #[test]
    fn test_server_config_from_cli_zero_interval() {
        let cli = parse(&["--refresh-interval", "0"]);
        let err = ServerConfig::from_cli(&cli).unwrap_err();
        assert!(matches!(err, CliError::ZeroInterval));
        assert!(err.to_string().contains("refresh interval"));
    }

    #[test]
    fn test_server_config_from_cli_zero_timeout() {
        let cli = parse(&["--fetch-timeout", "0"]);
        let err = ServerConfig::from_cli(&cli).unwrap_err();
        assert!(matches!(err, CliError::ZeroTimeout));
    }

    #[test]
    fn test_cli_upstream_url_override() {
        let cli = parse(&["--upstream-url", "http://127.0.0.1:9000/graphql"]);
        assert_eq!(cli.upstream_url, "http://127.0.0.1:9000/graphql");
    }
}
