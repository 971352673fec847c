use crate::error::MonitorError;
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

pub const DEFAULT_SERVER_URL: &str = "http://127.0.0.1:8000";
pub const DEFAULT_PULL_INTERVAL_SECS: u64 = 5;
pub const DEFAULT_RECONNECT_DELAY_SECS: u64 = 3;
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 4000;

#[derive(Parser, Debug, Clone)]
#[command(
    name = "synapse-monitor",
    version,
    about = "Live monitor for open positions, status and trade history"
)]
pub struct Args {
    /// Base URL of the trading API; the stream URL is derived from it.
    #[arg(long, env = "SYNAPSE_SERVER_URL", default_value = DEFAULT_SERVER_URL)]
    pub server_url: String,
    #[arg(long, env = "SYNAPSE_PULL_INTERVAL_SECS", default_value_t = DEFAULT_PULL_INTERVAL_SECS)]
    pub pull_interval_secs: u64,
    #[arg(long, env = "SYNAPSE_RECONNECT_DELAY_SECS", default_value_t = DEFAULT_RECONNECT_DELAY_SECS)]
    pub reconnect_delay_secs: u64,
    /// Upper bound for each REST request of a pull cycle.
    #[arg(long, env = "SYNAPSE_REQUEST_TIMEOUT_MS", default_value_t = DEFAULT_REQUEST_TIMEOUT_MS)]
    pub request_timeout_ms: u64,
    /// Append logs to this file instead of discarding them.
    #[arg(long, env = "SYNAPSE_LOG_FILE")]
    pub log_file: Option<PathBuf>,
    /// Run a single pull cycle, print it as plain text and exit.
    #[arg(long)]
    pub once: bool,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub server_url: Url,
    pub pull_interval: Duration,
    pub reconnect_delay: Duration,
    pub request_timeout: Duration,
    pub log_file: Option<PathBuf>,
    pub once: bool,
}

impl Config {
    pub fn from_args(args: Args) -> Result<Self, MonitorError> {
        let server_url = parse_server_url(&args.server_url)?;
        if args.pull_interval_secs == 0 {
            return Err(MonitorError::Config(
                "pull interval must be at least one second".to_string(),
            ));
        }
        if args.request_timeout_ms == 0 {
            return Err(MonitorError::Config(
                "request timeout must be positive".to_string(),
            ));
        }
        Ok(Self {
            server_url,
            pull_interval: Duration::from_secs(args.pull_interval_secs),
            reconnect_delay: Duration::from_secs(args.reconnect_delay_secs),
            request_timeout: Duration::from_millis(args.request_timeout_ms),
            log_file: args.log_file,
            once: args.once,
        })
    }
}

/// Parses the server URL into the REST base. A `ws`/`wss` URL names the
/// same server, so it is mapped to `http`/`https` for the pull requests.
pub fn parse_server_url(raw: &str) -> Result<Url, MonitorError> {
    let mut url = Url::parse(raw.trim()).map_err(|source| MonitorError::InvalidUrl {
        url: raw.to_string(),
        source,
    })?;
    let scheme = match url.scheme() {
        "http" | "ws" => "http",
        "https" | "wss" => "https",
        other => return Err(MonitorError::UnsupportedScheme(other.to_string())),
    };
    url.set_scheme(scheme)
        .map_err(|_| MonitorError::UnsupportedScheme(raw.to_string()))?;
    Ok(url)
}

pub fn parse_bool_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
