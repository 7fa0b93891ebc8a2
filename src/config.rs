//! Runtime configuration.
//!
//! Resolved once at process startup and passed into the processor and service, so
//! nothing reads environment variables while documents are being handled.

use crate::mmap_reader::DEFAULT_MMAP_THRESHOLD;
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};
use std::path::PathBuf;
use thiserror::Error;

pub const ENV_MMAP_THRESHOLD: &str = "COURSE_INTAKE_MMAP_THRESHOLD";
pub const ENV_RULES: &str = "COURSE_INTAKE_RULES";
pub const ENV_GRPC_ADDR: &str = "COURSE_INTAKE_GRPC_ADDR";

pub const DEFAULT_GRPC_ADDR: SocketAddr =
    SocketAddr::V4(SocketAddrV4::new(Ipv4Addr::LOCALHOST, 50051));

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{name} must be a byte count, got {value:?}")]
    InvalidThreshold { name: &'static str, value: String },
    #[error("{name} must be a socket address, got {value:?}")]
    InvalidAddress { name: &'static str, value: String },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IntakeConfig {
    pub mmap_threshold: u64,
    pub rules_path: Option<PathBuf>,
    pub grpc_addr: SocketAddr,
}

impl Default for IntakeConfig {
    fn default() -> Self {
        Self {
            mmap_threshold: DEFAULT_MMAP_THRESHOLD,
            rules_path: None,
            grpc_addr: DEFAULT_GRPC_ADDR,
        }
    }
}

impl IntakeConfig {
    /// Read configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build configuration from any key lookup; unset or blank keys fall back to defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        let mut config = Self::default();

        if let Some(value) = get(ENV_MMAP_THRESHOLD) {
            config.mmap_threshold = value.trim().parse().map_err(|_| ConfigError::InvalidThreshold {
                name: ENV_MMAP_THRESHOLD,
                value: value.clone(),
            })?;
        }

        if let Some(value) = get(ENV_RULES) {
            config.rules_path = Some(PathBuf::from(value.trim()));
        }

        if let Some(value) = get(ENV_GRPC_ADDR) {
            config.grpc_addr = value.trim().parse().map_err(|_| ConfigError::InvalidAddress {
                name: ENV_GRPC_ADDR,
                value: value.clone(),
            })?;
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn defaults_when_unset() {
        let config = IntakeConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, IntakeConfig::default());
        assert_eq!(config.grpc_addr, DEFAULT_GRPC_ADDR);
        assert_eq!(config.grpc_addr.to_string(), "127.0.0.1:50051");
    }

    #[test]
    fn reads_overrides() {
        let config = IntakeConfig::from_lookup(lookup(&[
            (ENV_MMAP_THRESHOLD, " 2048 "),
            (ENV_RULES, "/etc/course-intake/rules.json"),
            (ENV_GRPC_ADDR, "0.0.0.0:9000"),
        ]))
        .unwrap();
        assert_eq!(config.mmap_threshold, 2048);
        assert_eq!(config.rules_path, Some(PathBuf::from("/etc/course-intake/rules.json")));
        assert_eq!(config.grpc_addr.port(), 9000);
    }

    #[test]
    fn blank_values_fall_back_to_defaults() {
        let config = IntakeConfig::from_lookup(lookup(&[(ENV_RULES, "   ")])).unwrap();
        assert_eq!(config.rules_path, None);
    }

    #[test]
    fn rejects_bad_values() {
        let err = IntakeConfig::from_lookup(lookup(&[(ENV_MMAP_THRESHOLD, "ten megs")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidThreshold { .. }));

        let err = IntakeConfig::from_lookup(lookup(&[(ENV_GRPC_ADDR, "localhost")])).unwrap_err();
        assert!(err.to_string().contains(ENV_GRPC_ADDR));
    }
}
