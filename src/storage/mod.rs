use async_trait::async_trait;
use std::path::Path;

use crate::error::StoreError;
use crate::models::SeenSet;

mod sqlite;
mod text;
pub use sqlite::SqliteStorage;
pub use text::TextFileStorage;

/// Persistence for the set of links already delivered.
///
/// A missing store loads as an empty set, and so does a corrupt one
/// (with a warning). `save` replaces the stored set as a whole.
#[async_trait]
pub trait SeenStore: Send + Sync {
    async fn load(&self) -> Result<SeenSet, StoreError>;
    async fn save(&self, seen: &SeenSet) -> Result<(), StoreError>;
}

/// SQLite for `.db`/`.sqlite`/`.sqlite3` paths, one-URL-per-line text otherwise.
pub async fn open_store(path: &Path) -> Result<Box<dyn SeenStore>, StoreError> {
    let is_sqlite = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| matches!(ext.to_ascii_lowercase().as_str(), "db" | "sqlite" | "sqlite3"))
        .unwrap_or(false);

    if is_sqlite {
        Ok(Box::new(SqliteStorage::new(path).await?))
    } else {
        Ok(Box::new(TextFileStorage::new(path)))
    }
}

pub(crate) fn ensure_parent_dir(path: &Path) -> Result<(), StoreError> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => {
            std::fs::create_dir_all(parent).map_err(|source| StoreError::Io {
                path: parent.display().to_string(),
                source,
            })
        }
        _ => Ok(()),
    }
}

#[cfg(test)]
pub(crate) fn scratch_dir(name: &str) -> std::path::PathBuf {
    let dir = std::env::temp_dir().join(format!("updates-watcher-{}-{}", std::process::id(), name));
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).unwrap();
    dir
}
