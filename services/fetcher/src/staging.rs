//! Output area for fetched payloads.
//!
//! Files are written to a `.partial` sibling first and then renamed into
//! place, so a crashed run never leaves a truncated file under its final
//! name. Existing files are overwritten; re-running a fetch is safe.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tokio::fs;
use tracing::{debug, info};

#[derive(Debug, Clone)]
pub struct Staging {
    root: PathBuf,
}

impl Staging {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Staging rooted at `root`, creating the directory if needed.
    pub async fn create(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root)
            .await
            .with_context(|| format!("Failed to create {}", root.display()))?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Write `data` to `relative` under the staging root, creating parent
    /// directories. Returns the final path.
    pub async fn write(&self, relative: impl AsRef<Path>, data: &[u8]) -> Result<PathBuf> {
        let final_path = self.root.join(relative.as_ref());
        if let Some(parent) = final_path.parent() {
            fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Failed to create directory {}", parent.display()))?;
        }

        let mut partial = final_path.clone().into_os_string();
        partial.push(".partial");
        let partial = PathBuf::from(partial);

        fs::write(&partial, data)
            .await
            .with_context(|| format!("Failed to write {}", partial.display()))?;
        debug!(path = %partial.display(), bytes = data.len(), "Wrote partial file");

        fs::rename(&partial, &final_path)
            .await
            .with_context(|| format!("Failed to move {} into place", final_path.display()))?;

        info!(path = %final_path.display(), bytes = data.len(), "Saved");
        Ok(final_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_write_creates_parents() {
        let dir = tempfile::tempdir().unwrap();
        let staging = Staging::new(dir.path());

        let path = staging
            .write("WRFDA/RADARS/2023060112/2023060112-CAPPI2.nc", b"radar")
            .await
            .unwrap();

        assert_eq!(path, dir.path().join("WRFDA/RADARS/2023060112/2023060112-CAPPI2.nc"));
        assert_eq!(std::fs::read(&path).unwrap(), b"radar");
        assert!(!dir
            .path()
            .join("WRFDA/RADARS/2023060112/2023060112-CAPPI2.nc.partial")
            .exists());
    }

    #[tokio::test]
    async fn test_create_makes_root() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("run/2023060112");

        let staging = tokio_test::assert_ok!(Staging::create(&root).await);
        assert_eq!(staging.root(), root.as_path());
        assert!(root.is_dir());
    }

    #[tokio::test]
    async fn test_create_reports_blocked_root() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("not-a-dir");
        std::fs::write(&blocker, b"file").unwrap();

        let err = tokio_test::assert_err!(Staging::create(blocker.join("out")).await);
        assert!(err.to_string().starts_with("Failed to create"));
        assert!(err.to_string().contains("not-a-dir"));
    }

    #[tokio::test]
    async fn test_write_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let staging = Staging::new(dir.path());

        staging.write("a/b.json", b"first attempt").await.unwrap();
        let path = staging.write("a/b.json", b"[]").await.unwrap();

        assert_eq!(std::fs::read(path).unwrap(), b"[]");
    }
}
