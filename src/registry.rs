//! Port registry: the file through which a running server advertises its port.

use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

const REGISTRY_DIR: &str = "warmcache";
const REGISTRY_FILE: &str = "server.port";

#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("failed to make cache folder {path}: {source}")]
    Directory {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to write server port file {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to read server port file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortRegistry {
    path: PathBuf,
}

impl PortRegistry {
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Registry in the user's cache directory (`~/.cache/warmcache/server.port` on Linux).
    pub fn in_cache_dir() -> Self {
        Self::at(cache_dir().join(REGISTRY_FILE))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Publishes `port`, replacing whatever a previous server left behind.
    pub fn persist(&self, port: &str) -> Result<(), RegistryError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|source| RegistryError::Directory {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        fs::write(&self.path, port).map_err(|source| RegistryError::Write {
            path: self.path.clone(),
            source,
        })
    }

    /// Returns the advertised port exactly as stored. The entry may be stale.
    pub fn resolve(&self) -> Result<String, RegistryError> {
        fs::read_to_string(&self.path).map_err(|source| RegistryError::Read {
            path: self.path.clone(),
            source,
        })
    }
}

/// Application cache directory, shared with the log files.
pub fn cache_dir() -> PathBuf {
    dirs::cache_dir()
        .or_else(|| dirs::home_dir().map(|home| home.join(".cache")))
        .unwrap_or_else(|| PathBuf::from("."))
        .join(REGISTRY_DIR)
}
