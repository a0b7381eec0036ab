//! Server configuration from the environment.

use monopoly_core::{Catalog, CatalogError};
use std::net::{AddrParseError, SocketAddr};
use std::path::PathBuf;
use thiserror::Error;

const DEFAULT_ADDR: &str = "0.0.0.0:8080";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid SERVER_ADDR {value:?}: {source}")]
    InvalidAddr {
        value: String,
        source: AddrParseError,
    },

    #[error("Cannot read catalog {path:?}: {source}")]
    ReadCatalog {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid catalog: {0}")]
    Catalog(#[from] CatalogError),
}

/// Settings read once at startup
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub addr: SocketAddr,
    /// JSON catalog document; the standard board is used when absent
    pub catalog_path: Option<PathBuf>,
}

impl ServerConfig {
    /// Read `SERVER_ADDR` and `CATALOG_PATH`
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(
            std::env::var("SERVER_ADDR").ok(),
            std::env::var("CATALOG_PATH").ok(),
        )
    }

    fn from_vars(addr: Option<String>, catalog_path: Option<String>) -> Result<Self, ConfigError> {
        let value = addr.unwrap_or_else(|| DEFAULT_ADDR.into());
        let addr = value
            .parse()
            .map_err(|source| ConfigError::InvalidAddr { value, source })?;

        Ok(Self {
            addr,
            catalog_path: catalog_path.filter(|p| !p.is_empty()).map(PathBuf::from),
        })
    }

    pub fn load_catalog(&self) -> Result<Catalog, ConfigError> {
        let Some(path) = &self.catalog_path else {
            return Ok(Catalog::standard());
        };
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadCatalog {
            path: path.clone(),
            source,
        })?;
        Ok(Catalog::from_json(&json)?)
    }
}
