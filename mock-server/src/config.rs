//! Mock server configuration from environment variables.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use tracing::warn;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Env: `BIND_ADDR`. Default: `127.0.0.1`
    pub bind_addr: IpAddr,

    /// Env: `PORT`. Default: `3000`
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: 3000,
        }
    }
}

impl ServerConfig {
    /// Read `BIND_ADDR` and `PORT`; unparsable values keep the default.
    pub fn from_env() -> Self {
        Self::from_vars(
            std::env::var("BIND_ADDR").ok().as_deref(),
            std::env::var("PORT").ok().as_deref(),
        )
    }

    fn from_vars(bind_addr: Option<&str>, port: Option<&str>) -> Self {
        let mut config = Self::default();
        if let Some(raw) = bind_addr {
            match raw.parse() {
                Ok(addr) => config.bind_addr = addr,
                Err(_) => warn!(value = raw, "ignoring invalid BIND_ADDR"),
            }
        }
        if let Some(raw) = port {
            match raw.parse() {
                Ok(port) => config.port = port,
                Err(_) => warn!(value = raw, "ignoring invalid PORT"),
            }
        }
        config
    }

    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_addr, self.port)
    }
}
