//! Gateway configuration with validation.
//!
//! Resolved once at startup from the environment and passed explicitly to
//! everything that needs it.

use crate::domain::connection::DEFAULT_OUTBOUND_CAPACITY;
use crate::domain::identity::ContainerId;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;

/// Default listen port.
pub const DEFAULT_PORT: u16 = 54342;

/// Default WebSocket upgrade path.
pub const DEFAULT_WS_PATH: &str = "/ws";

/// Default certificate path.
pub const DEFAULT_CERT_PATH: &str = "./certs/cert.pem";

/// Default private key path.
pub const DEFAULT_KEY_PATH: &str = "./certs/key.pem";

/// Main gateway configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayConfig {
    /// Listener configuration
    pub listen: ListenConfig,
    /// TLS configuration (`None` serves plain WebSocket)
    pub tls: Option<TlsConfig>,
    /// Identity of this instance
    pub container_id: ContainerId,
    /// Per-connection outbound queue capacity
    pub outbound_capacity: usize,
    /// Redis URL for the shared registry and directive channel
    pub redis_url: Option<String>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            listen: ListenConfig::default(),
            tls: Some(TlsConfig::default()),
            container_id: ContainerId::default(),
            outbound_capacity: DEFAULT_OUTBOUND_CAPACITY,
            redis_url: None,
        }
    }
}

/// Listener configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListenConfig {
    /// Bind address
    pub host: IpAddr,
    /// Port (default: 54342)
    pub port: u16,
    /// Upgrade path (default: /ws)
    pub ws_path: String,
}

impl Default for ListenConfig {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: DEFAULT_PORT,
            ws_path: DEFAULT_WS_PATH.to_string(),
        }
    }
}

/// TLS configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TlsConfig {
    /// Path to certificate file
    pub cert_path: PathBuf,
    /// Path to key file
    pub key_path: PathBuf,
}

impl Default for TlsConfig {
    fn default() -> Self {
        Self {
            cert_path: PathBuf::from(DEFAULT_CERT_PATH),
            key_path: PathBuf::from(DEFAULT_KEY_PATH),
        }
    }
}

impl GatewayConfig {
    /// Load configuration from process environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    ///
    /// Empty values are treated as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());
        let mut config = Self::default();

        if let Some(host) = get("BIND_HOST") {
            config.listen.host = parse_var("BIND_HOST", &host)?;
        }
        if let Some(port) = get("PORT") {
            config.listen.port = parse_var("PORT", &port)?;
        }
        if let Some(path) = get("WS_PATH") {
            config.listen.ws_path = path;
        }

        let tls_disabled = get("TLS_DISABLED")
            .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
            .unwrap_or(false);

        config.tls = if tls_disabled {
            None
        } else {
            let mut tls = TlsConfig::default();
            if let Some(cert) = get("CERT_PATH") {
                tls.cert_path = PathBuf::from(cert);
            }
            if let Some(key) = get("KEY_PATH") {
                tls.key_path = PathBuf::from(key);
            }
            Some(tls)
        };

        if let Some(host) = get("HOSTNAME") {
            config.container_id = ContainerId::new(host);
        }
        if let Some(capacity) = get("OUTBOUND_CAPACITY") {
            config.outbound_capacity = parse_var("OUTBOUND_CAPACITY", &capacity)?;
        }
        config.redis_url = get("REDIS_URL");

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.listen.ws_path.starts_with('/') {
            return Err(ConfigError::Invalid(format!(
                "ws_path must start with '/': {}",
                self.listen.ws_path
            )));
        }

        if self.outbound_capacity == 0 {
            return Err(ConfigError::Invalid(
                "outbound_capacity cannot be 0".into(),
            ));
        }

        if self.container_id.as_str().is_empty() {
            return Err(ConfigError::Invalid("container id cannot be empty".into()));
        }

        if let Some(tls) = &self.tls {
            if tls.cert_path.as_os_str().is_empty() || tls.key_path.as_os_str().is_empty() {
                return Err(ConfigError::Invalid(
                    "TLS certificate and key paths are required".into(),
                ));
            }
        }

        if let Some(url) = &self.redis_url {
            if !(url.starts_with("redis://") || url.starts_with("rediss://")) {
                return Err(ConfigError::Invalid(format!("unsupported redis url: {url}")));
            }
        }

        Ok(())
    }

    /// Get listener bind address
    #[must_use]
    pub fn listen_addr(&self) -> SocketAddr {
        SocketAddr::new(self.listen.host, self.listen.port)
    }
}

fn parse_var<T: std::str::FromStr>(name: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidValue {
        name: name.to_string(),
        value: value.to_string(),
    })
}

/// Configuration errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// An environment variable could not be parsed
    #[error("invalid value for {name}: {value:?}")]
    InvalidValue { name: String, value: String },
    /// General configuration error
    #[error("invalid configuration: {0}")]
    Invalid(String),
}
