use async_trait::async_trait;
use chrono::Utc;
use rusqlite::{params, Connection, ErrorCode};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{info, warn};

use crate::error::StoreError;
use crate::models::{Link, SeenSet};
use crate::storage::{ensure_parent_dir, SeenStore};

pub struct SqliteStorage {
    conn: Arc<Mutex<Connection>>,
    path: Option<PathBuf>,
}

impl SqliteStorage {
    /// Open (or create) the database at `db_path`. A file that SQLite
    /// refuses as corrupt or foreign is moved to `<db_path>.corrupt` and
    /// replaced by an empty database.
    pub async fn new(db_path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = db_path.as_ref();
        ensure_parent_dir(path)?;

        let conn = match open_and_migrate(path) {
            Ok(conn) => conn,
            Err(e) if is_corruption(&e) => {
                let aside = quarantine(path)?;
                warn!(
                    "{} is not a usable seen-link database ({}); moved to {} and starting empty",
                    path.display(),
                    e,
                    aside.display()
                );
                open_and_migrate(path)?
            }
            Err(e) => return Err(e.into()),
        };

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            path: Some(path.to_path_buf()),
        })
    }

    #[cfg(test)]
    pub fn in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        migrate(&conn)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            path: None,
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn.lock().map_err(|_| StoreError::Poisoned)
    }

    /// Swap a connection whose pages turned out to be corrupt for a fresh,
    /// empty database. The damaged file is kept as `<path>.corrupt`.
    fn replace_corrupt(&self, conn: &mut Connection) -> Result<(), StoreError> {
        // The old handle must be closed before its file is moved.
        drop(std::mem::replace(conn, Connection::open_in_memory()?));

        match &self.path {
            Some(path) => {
                let aside = quarantine(path)?;
                warn!("Moved corrupt seen-link database to {}", aside.display());
                *conn = open_and_migrate(path)?;
            }
            None => migrate(conn)?,
        }

        Ok(())
    }
}

fn open_and_migrate(path: &Path) -> rusqlite::Result<Connection> {
    let conn = Connection::open(path)?;
    migrate(&conn)?;
    Ok(conn)
}

// Same table as databases left behind by earlier versions of the watcher,
// which may carry extra nullable columns.
fn migrate(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS seen_links (
            url TEXT PRIMARY KEY,
            first_seen_utc TEXT NOT NULL
        )",
        [],
    )?;
    Ok(())
}

fn is_corruption(error: &rusqlite::Error) -> bool {
    matches!(
        error,
        rusqlite::Error::SqliteFailure(e, _)
            if matches!(e.code, ErrorCode::NotADatabase | ErrorCode::DatabaseCorrupt)
    )
}

fn quarantine(path: &Path) -> Result<PathBuf, StoreError> {
    let mut aside = path.as_os_str().to_owned();
    aside.push(".corrupt");
    let aside = PathBuf::from(aside);

    std::fs::rename(path, &aside).map_err(|source| StoreError::Io {
        path: path.display().to_string(),
        source,
    })?;
    Ok(aside)
}

fn read_all(conn: &Connection) -> rusqlite::Result<SeenSet> {
    let mut stmt = conn.prepare("SELECT url FROM seen_links")?;
    let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
    let seen: rusqlite::Result<SeenSet> = rows.map(|url| url.map(Link)).collect();
    seen
}

#[async_trait]
impl SeenStore for SqliteStorage {
    async fn load(&self) -> Result<SeenSet, StoreError> {
        let mut conn = self.lock()?;

        match read_all(&conn) {
            Ok(seen) => {
                info!("Loaded {} seen links", seen.len());
                Ok(seen)
            }
            Err(e) if is_corruption(&e) => {
                warn!("Seen-link database is corrupt ({}); treating it as empty", e);
                self.replace_corrupt(&mut conn)?;
                Ok(SeenSet::new())
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn save(&self, seen: &SeenSet) -> Result<(), StoreError> {
        let mut conn = self.lock()?;

        match replace_all(&mut conn, seen) {
            Ok(()) => {}
            Err(e) if is_corruption(&e) => {
                warn!("Seen-link database is corrupt ({}); rewriting it", e);
                self.replace_corrupt(&mut conn)?;
                replace_all(&mut conn, seen)?;
            }
            Err(e) => return Err(e.into()),
        }

        info!("Saved {} seen links", seen.len());
        Ok(())
    }
}

fn replace_all(conn: &mut Connection, seen: &SeenSet) -> rusqlite::Result<()> {
    let tx = conn.transaction()?;
    let now = Utc::now().to_rfc3339();

    {
        let mut insert =
            tx.prepare("INSERT OR IGNORE INTO seen_links (url, first_seen_utc) VALUES (?1, ?2)")?;
        for link in seen.iter() {
            insert.execute(params![link.as_str(), now])?;
        }

        let stored = read_all(&tx)?;
        let mut delete = tx.prepare("DELETE FROM seen_links WHERE url = ?1")?;
        for link in stored.iter().filter(|link| !seen.contains(link)) {
            delete.execute(params![link.as_str()])?;
        }
    }

    tx.commit()
}
