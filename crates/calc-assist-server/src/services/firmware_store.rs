use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

use crate::config::FirmwareConfig;

const BINARY_FILE: &str = "firmware.bin";
const VERSION_FILE: &str = "version.txt";

#[derive(Debug, Error)]
pub enum FirmwareError {
    #[error("failed to access {}: {source}", path.display())]
    Io { path: PathBuf, source: io::Error },
}

/// Latest device firmware image plus its version string, kept on disk.
pub struct FirmwareStore {
    directory: PathBuf,
    default_version: String,
}

impl FirmwareStore {
    pub fn new(config: FirmwareConfig) -> Self {
        Self {
            directory: config.directory,
            default_version: config.default_version,
        }
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    pub async fn ensure_dir(&self) -> Result<(), FirmwareError> {
        tokio::fs::create_dir_all(&self.directory)
            .await
            .map_err(|source| FirmwareError::Io { path: self.directory.clone(), source })
    }

    /// Uploaded version, or the configured default before any upload
    pub async fn version(&self) -> Result<String, FirmwareError> {
        let path = self.directory.join(VERSION_FILE);
        match tokio::fs::read_to_string(&path).await {
            Ok(version) => Ok(version.trim().to_string()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(self.default_version.clone()),
            Err(source) => Err(FirmwareError::Io { path, source }),
        }
    }

    pub async fn binary(&self) -> Result<Option<Vec<u8>>, FirmwareError> {
        let path = self.directory.join(BINARY_FILE);
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(FirmwareError::Io { path, source }),
        }
    }

    /// Binary first, so a half-finished upload never advertises a new version
    pub async fn store(&self, version: &str, binary: &[u8]) -> Result<(), FirmwareError> {
        self.ensure_dir().await?;

        let binary_path = self.directory.join(BINARY_FILE);
        tokio::fs::write(&binary_path, binary)
            .await
            .map_err(|source| FirmwareError::Io { path: binary_path, source })?;

        let version_path = self.directory.join(VERSION_FILE);
        tokio::fs::write(&version_path, version)
            .await
            .map_err(|source| FirmwareError::Io { path: version_path, source })?;

        info!("Firmware uploaded: {} ({} bytes)", version, binary.len());
        Ok(())
    }

    pub fn binary_file_name(&self) -> &'static str {
        BINARY_FILE
    }
}
