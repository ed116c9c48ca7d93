use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tracing::{info, warn};

use crate::error::StoreError;
use crate::models::{Link, SeenSet};
use crate::storage::{ensure_parent_dir, SeenStore};

/// One URL per line. Blank lines and `#` comments are ignored.
pub struct TextFileStorage {
    path: PathBuf,
}

impl TextFileStorage {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    fn temp_path(&self) -> PathBuf {
        let mut temp = self.path.as_os_str().to_owned();
        temp.push(".tmp");
        PathBuf::from(temp)
    }
}

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> StoreError + '_ {
    move |source| StoreError::Io {
        path: path.display().to_string(),
        source,
    }
}

#[async_trait]
impl SeenStore for TextFileStorage {
    async fn load(&self) -> Result<SeenSet, StoreError> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!("No seen-link file at {}, starting empty", self.path.display());
                return Ok(SeenSet::new());
            }
            Err(e) => return Err(io_error(&self.path)(e)),
        };

        let Ok(text) = String::from_utf8(bytes) else {
            warn!(
                "{} is not valid UTF-8; treating seen links as empty",
                self.path.display()
            );
            return Ok(SeenSet::new());
        };

        let seen: SeenSet = text
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
            .map(Link::from)
            .collect();

        info!("Loaded {} seen links", seen.len());
        Ok(seen)
    }

    // Write a sibling file then rename it over the target, so readers
    // never observe a half-written list.
    async fn save(&self, seen: &SeenSet) -> Result<(), StoreError> {
        ensure_parent_dir(&self.path)?;

        let mut contents = String::new();
        for link in seen.sorted() {
            contents.push_str(link.as_str());
            contents.push('\n');
        }

        let temp = self.temp_path();
        let mut file = tokio::fs::File::create(&temp).await.map_err(io_error(&temp))?;
        file.write_all(contents.as_bytes()).await.map_err(io_error(&temp))?;
        file.sync_all().await.map_err(io_error(&temp))?;
        drop(file);

        tokio::fs::rename(&temp, &self.path)
            .await
            .map_err(io_error(&self.path))?;

        info!("Saved {} seen links", seen.len());
        Ok(())
    }
}
