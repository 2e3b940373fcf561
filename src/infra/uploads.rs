use anyhow::{anyhow, Result};
use std::ffi::OsStr;
use std::io;
use std::path::{Path, PathBuf};
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;

use crate::domain::conversion::{converted_file_name, TargetFormat};

/// Consecutive taken names tried before giving up on a converted asset.
const MAX_NAME_ATTEMPTS: i128 = 1000;

/// Flat directory holding converted assets, served under `/uploads`.
#[derive(Clone, Debug)]
pub struct UploadsDir {
    root: PathBuf,
}

impl UploadsDir {
    /// Creates the directory (and parents) if it does not exist yet.
    pub async fn ensure(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root)
            .await
            .map_err(|err| anyhow!("failed to create uploads dir {}: {}", root.display(), err))?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path_for(&self, name: &str) -> Result<PathBuf> {
        if name.is_empty() || Path::new(name).file_name() != Some(OsStr::new(name)) {
            return Err(anyhow!("invalid upload file name: {:?}", name));
        }
        Ok(self.root.join(name))
    }

    /// Writes a new file and returns its length as persisted on disk.
    ///
    /// Never replaces an existing file: a taken name fails with
    /// `io::ErrorKind::AlreadyExists` and leaves the old contents alone.
    pub async fn write(&self, name: &str, data: &[u8]) -> io::Result<u64> {
        let path = self.resolve(name)?;
        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await?;
        file.write_all(data).await?;
        file.flush().await?;
        Ok(file.metadata().await?.len())
    }

    /// Stores a converted asset under `converted-<ms>.<format>`, starting at
    /// `timestamp_ms` and moving to the next millisecond while the name is
    /// taken. Returns the chosen name and the persisted length.
    pub async fn write_converted(
        &self,
        timestamp_ms: i128,
        format: TargetFormat,
        data: &[u8],
    ) -> Result<(String, u64)> {
        for offset in 0..MAX_NAME_ATTEMPTS {
            let name = converted_file_name(timestamp_ms + offset, format);
            match self.write(&name, data).await {
                Ok(size) => return Ok((name, size)),
                Err(err) if err.kind() == io::ErrorKind::AlreadyExists => continue,
                Err(err) => {
                    return Err(anyhow!("failed to write {}: {}", name, err));
                }
            }
        }
        Err(anyhow!(
            "no free converted file name after {} attempts from {}",
            MAX_NAME_ATTEMPTS,
            timestamp_ms
        ))
    }

    pub async fn remove(&self, name: &str) -> io::Result<()> {
        let path = self.resolve(name)?;
        fs::remove_file(path).await
    }

    fn resolve(&self, name: &str) -> io::Result<PathBuf> {
        self.path_for(name)
            .map_err(|err| io::Error::new(io::ErrorKind::InvalidInput, err.to_string()))
    }
}
