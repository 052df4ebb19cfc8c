//! `serde` + `toml` configuration shared by every role.
//!
//! Replaces the out-of-scope interactive startup dialog (spec §1) with
//! a config file plus CLI overrides — the idiomatic Rust equivalent,
//! using the teacher's own `serde`/`toml` dependencies.

use std::net::Ipv4Addr;
use std::path::Path;

use serde::{Deserialize, Serialize};

fn default_ip() -> Ipv4Addr {
    Ipv4Addr::new(127, 0, 0, 1)
}

/// Naming Service configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NsConfig {
    #[serde(default = "default_ip")]
    pub ip: Ipv4Addr,
    pub client_port: u16,
    pub server_port: u16,
    pub backup_servers: usize,
    pub cache_size: usize,
    pub log_dir: String,
}

impl Default for NsConfig {
    fn default() -> Self {
        Self {
            ip: default_ip(),
            client_port: crate::NS_CLIENT_PORT,
            server_port: crate::NS_SERVER_PORT,
            backup_servers: crate::DEFAULT_BACKUP_SERVERS,
            cache_size: crate::DEFAULT_CACHE_SIZE,
            log_dir: ".".to_string(),
        }
    }
}

/// Storage Server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SsConfig {
    #[serde(default = "default_ip")]
    pub ip: Ipv4Addr,
    pub ns_ip: Ipv4Addr,
    pub ns_server_port: u16,
    pub client_port: u16,
    pub ns_port: u16,
    pub root: String,
    pub log_dir: String,
}

impl Default for SsConfig {
    fn default() -> Self {
        Self {
            ip: default_ip(),
            ns_ip: default_ip(),
            ns_server_port: crate::NS_SERVER_PORT,
            client_port: 0,
            ns_port: 0,
            root: ".".to_string(),
            log_dir: ".".to_string(),
        }
    }
}

/// Client configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub ns_ip: Ipv4Addr,
    pub ns_client_port: u16,
    pub log_dir: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            ns_ip: default_ip(),
            ns_client_port: crate::NS_CLIENT_PORT,
            log_dir: ".".to_string(),
        }
    }
}

/// Loads a config struct from a TOML file, falling back to defaults
/// for any field the file omits.
pub fn load<T: Default + serde::de::DeserializeOwned>(path: &Path) -> anyhow::Result<T> {
    match std::fs::read_to_string(path) {
        Ok(contents) => Ok(toml::from_str(&contents)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(T::default()),
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ns_config_defaults_match_spec_constants() {
        let cfg = NsConfig::default();
        assert_eq!(cfg.client_port, 8080);
        assert_eq!(cfg.server_port, 8081);
    }
}
