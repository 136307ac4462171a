//! Server settings read from the environment
//!
//! # Environment Variables
//!
//! - `REGISTRY_SERVER_PORT`: port to listen on (default: 3001)
//! - `REGISTRY_SNAPSHOT`: JSON snapshot to serve from memory
//! - `REGISTRY_DB_PATH`: libsql database to serve (default: `data/registry.db`,
//!   ignored when `REGISTRY_SNAPSHOT` is set)
//! - `REGISTRY_MASTER_LANGUAGE`, `REGISTRY_ALLOW_EMPTY_FIELDS`,
//!   `REGISTRY_DATE_FORMAT`, `REGISTRY_ACTIVE_STATUS`, `REGISTRY_MAX_DEPTH`:
//!   resolver overrides

use anyhow::{anyhow, Context, Result};
use registry_core::ResolverConfig;
use std::path::PathBuf;

const DEFAULT_PORT: u16 = 3001;
const DEFAULT_DB_PATH: &str = "data/registry.db";

/// Where the registry is read from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreSource {
    Snapshot(PathBuf),
    Database(PathBuf),
}

#[derive(Debug, Clone)]
pub struct ServerSettings {
    pub port: u16,
    pub store: StoreSource,
    pub resolver: ResolverConfig,
}

impl ServerSettings {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build settings from any key lookup; unset keys keep their defaults
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let port = match lookup("REGISTRY_SERVER_PORT") {
            Some(value) => value
                .parse::<u16>()
                .with_context(|| format!("Invalid REGISTRY_SERVER_PORT '{}'", value))?,
            None => DEFAULT_PORT,
        };

        let store = match lookup("REGISTRY_SNAPSHOT") {
            Some(path) => StoreSource::Snapshot(PathBuf::from(path)),
            None => StoreSource::Database(PathBuf::from(
                lookup("REGISTRY_DB_PATH").unwrap_or_else(|| DEFAULT_DB_PATH.to_string()),
            )),
        };

        let mut resolver = ResolverConfig::default();
        if let Some(language) = lookup("REGISTRY_MASTER_LANGUAGE") {
            resolver.master_language = language;
        }
        if let Some(value) = lookup("REGISTRY_ALLOW_EMPTY_FIELDS") {
            resolver.allow_empty_fields = parse_flag(&value)
                .ok_or_else(|| anyhow!("Invalid REGISTRY_ALLOW_EMPTY_FIELDS '{}'", value))?;
        }
        if let Some(format) = lookup("REGISTRY_DATE_FORMAT") {
            resolver.date_format = format;
        }
        if let Some(status) = lookup("REGISTRY_ACTIVE_STATUS") {
            resolver.active_status_id = status;
        }
        if let Some(value) = lookup("REGISTRY_MAX_DEPTH") {
            resolver.max_depth = value
                .parse::<usize>()
                .with_context(|| format!("Invalid REGISTRY_MAX_DEPTH '{}'", value))?;
        }
        resolver.validate().map_err(|e| anyhow!(e))?;

        Ok(Self {
            port,
            store,
            resolver,
        })
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn settings(vars: &[(&str, &str)]) -> Result<ServerSettings> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ServerSettings::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let settings = settings(&[]).unwrap();
        assert_eq!(settings.port, 3001);
        assert_eq!(
            settings.store,
            StoreSource::Database(PathBuf::from("data/registry.db"))
        );
        assert_eq!(settings.resolver.master_language, "en");
    }

    #[test]
    fn test_overrides() {
        let settings = settings(&[
            ("REGISTRY_SERVER_PORT", "8080"),
            ("REGISTRY_SNAPSHOT", "/tmp/registry.json"),
            ("REGISTRY_DB_PATH", "/tmp/ignored.db"),
            ("REGISTRY_MASTER_LANGUAGE", "fr"),
            ("REGISTRY_ALLOW_EMPTY_FIELDS", "true"),
            ("REGISTRY_DATE_FORMAT", "%Y-%m-%d"),
            ("REGISTRY_ACTIVE_STATUS", "valid"),
            ("REGISTRY_MAX_DEPTH", "4"),
        ])
        .unwrap();

        assert_eq!(settings.port, 8080);
        assert_eq!(
            settings.store,
            StoreSource::Snapshot(PathBuf::from("/tmp/registry.json"))
        );
        assert_eq!(settings.resolver.master_language, "fr");
        assert!(settings.resolver.allow_empty_fields);
        assert_eq!(settings.resolver.date_format, "%Y-%m-%d");
        assert_eq!(settings.resolver.active_status_id, "valid");
        assert_eq!(settings.resolver.max_depth, 4);
    }

    #[test]
    fn test_invalid_values() {
        assert!(settings(&[("REGISTRY_SERVER_PORT", "http")]).is_err());
        assert!(settings(&[("REGISTRY_ALLOW_EMPTY_FIELDS", "maybe")]).is_err());
        assert!(settings(&[("REGISTRY_MAX_DEPTH", "0")]).is_err());
        assert!(settings(&[("REGISTRY_MASTER_LANGUAGE", "")]).is_err());
    }
}
