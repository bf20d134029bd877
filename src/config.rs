//! Process configuration loaded from environment variables

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid {var}: '{value}'")]
    Invalid { var: &'static str, value: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    /// Directory holding the CSV content files
    pub content_dir: PathBuf,
    /// Directory served as fallback for the browser clients
    pub static_dir: PathBuf,
    /// Seeds every room's random source when set
    pub rng_seed: Option<u64>,
    /// Whether `/api/rooms/{id}/view` answers for operator ids. Off by
    /// default since the endpoint is unauthenticated.
    pub operator_http_views: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8000)),
            content_dir: PathBuf::from("."),
            static_dir: PathBuf::from("static"),
            rng_seed: None,
            operator_http_views: false,
        }
    }
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn parse_var<T: std::str::FromStr>(var: &'static str, value: String) -> Result<T, ConfigError> {
    value
        .parse()
        .map_err(|_| ConfigError::Invalid { var, value })
}

impl ServerConfig {
    /// Load config from BIND_ADDR, PORT, CONTENT_DIR, STATIC_DIR, RNG_SEED
    /// and OPERATOR_HTTP_VIEWS
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let ip: IpAddr = match env_var("BIND_ADDR") {
            Some(value) => parse_var("BIND_ADDR", value)?,
            None => defaults.bind_addr.ip(),
        };
        let port: u16 = match env_var("PORT") {
            Some(value) => parse_var("PORT", value)?,
            None => defaults.bind_addr.port(),
        };
        let rng_seed = match env_var("RNG_SEED") {
            Some(value) => {
                let seed = parse_var("RNG_SEED", value)?;
                tracing::warn!("RNG_SEED set, room randomness is deterministic");
                Some(seed)
            }
            None => None,
        };
        let operator_http_views = match env_var("OPERATOR_HTTP_VIEWS") {
            Some(value) => parse_var("OPERATOR_HTTP_VIEWS", value)?,
            None => defaults.operator_http_views,
        };

        Ok(Self {
            bind_addr: SocketAddr::new(ip, port),
            content_dir: env_var("CONTENT_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.content_dir),
            static_dir: env_var("STATIC_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.static_dir),
            rng_seed,
            operator_http_views,
        })
    }
}
