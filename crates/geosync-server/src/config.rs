use std::net::{Ipv4Addr, SocketAddr};
use std::path::Path;

use geosync_core::HashAlgorithm;
use geosync_sync::SyncConfig;
use serde::{Deserialize, Serialize};

use crate::error::{ServerError, ServerResult};
use crate::gateway::Point;

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    /// Content hash algorithm (`sha256` or `blake3`).
    pub digest: HashAlgorithm,
    pub max_dataset_id_len: usize,
    pub sync: SyncConfig,
    /// Datasets written at startup.
    #[serde(rename = "seed")]
    pub seeds: Vec<SeedDataset>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from((Ipv4Addr::LOCALHOST, 8000)),
            digest: HashAlgorithm::default(),
            max_dataset_id_len: 128,
            sync: SyncConfig::default(),
            seeds: Vec::new(),
        }
    }
}

/// A dataset loaded at startup, e.g. a reference polygon.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SeedDataset {
    pub id: String,
    pub points: Vec<Point>,
}

impl ServerConfig {
    /// Parse a TOML document. Missing keys take their defaults.
    pub fn from_toml_str(text: &str) -> ServerResult<Self> {
        let config: Self = toml::from_str(text).map_err(|e| ServerError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse a TOML config file.
    pub fn load(path: impl AsRef<Path>) -> ServerResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| ServerError::Config(format!("{}: {}", path.display(), e)))?;
        let config = Self::from_toml_str(&text)?;
        tracing::debug!(path = %path.display(), seeds = config.seeds.len(), "config loaded");
        Ok(config)
    }

    pub fn validate(&self) -> ServerResult<()> {
        if self.max_dataset_id_len == 0 {
            return Err(ServerError::Config("max_dataset_id_len must be at least 1".into()));
        }
        if self.sync.outbox_capacity == 0 {
            return Err(ServerError::Config("sync.outbox_capacity must be at least 1".into()));
        }
        for seed in &self.seeds {
            if seed.id.is_empty() || seed.id.len() > self.max_dataset_id_len {
                return Err(ServerError::Config(format!("invalid seed dataset id {:?}", seed.id)));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn default_config() {
        let c = ServerConfig::default();
        assert_eq!(c.bind_addr, "127.0.0.1:8000".parse::<SocketAddr>().unwrap());
        assert_eq!(c.digest, HashAlgorithm::Sha256);
        assert_eq!(c.max_dataset_id_len, 128);
        assert_eq!(c.sync.outbox_capacity, 64);
        assert!(c.seeds.is_empty());
        assert!(c.validate().is_ok());
    }

    #[test]
    fn empty_document_is_default() {
        let c = ServerConfig::from_toml_str("").unwrap();
        assert_eq!(c.bind_addr, ServerConfig::default().bind_addr);
    }

    #[test]
    fn full_document() {
        let c = ServerConfig::from_toml_str(
            r#"
            bind_addr = "0.0.0.0:9000"
            digest = "blake3"
            max_dataset_id_len = 32

            [sync]
            outbox_capacity = 8

            [[seed]]
            id = "region"
            points = [{ x = 0.0, y = 0.0 }, { x = 1.0, y = 0.0 }, { x = 1, y = 1 }]
            "#,
        )
        .unwrap();

        assert_eq!(c.bind_addr.port(), 9000);
        assert_eq!(c.digest, HashAlgorithm::Blake3);
        assert_eq!(c.max_dataset_id_len, 32);
        assert_eq!(c.sync.outbox_capacity, 8);
        assert_eq!(c.seeds.len(), 1);
        assert_eq!(c.seeds[0].id, "region");
        assert_eq!(c.seeds[0].points[2], Point::new(1.0, 1.0));
    }

    #[test]
    fn rejects_bad_values() {
        assert!(ServerConfig::from_toml_str("digest = \"md5\"").is_err());
        assert!(ServerConfig::from_toml_str("[sync]\noutbox_capacity = 0").is_err());
        assert!(ServerConfig::from_toml_str("[[seed]]\nid = \"\"\npoints = []").is_err());
    }

    #[test]
    fn load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "bind_addr = \"127.0.0.1:8123\"").unwrap();
        let c = ServerConfig::load(file.path()).unwrap();
        assert_eq!(c.bind_addr.port(), 8123);
    }

    #[test]
    fn load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = ServerConfig::load(dir.path().join("absent.toml")).unwrap_err();
        assert!(matches!(err, ServerError::Config(_)));
    }
}
