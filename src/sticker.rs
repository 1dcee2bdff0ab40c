//! Sticker key/value store and its cancellable cleanup worker.
//!
//! Stickers are `(type, uri, name, value)` tuples stored outside the song
//! file. The store itself is a plain `rusqlite` table; cleanup reconciles it
//! against the `Database` by re-checking, for every unique `(type, uri)`
//! pair, whether the song still exists.

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use camino::Utf8PathBuf;
use rusqlite::Connection;

use crate::database::Database;
use crate::event_loop::InjectHandle;
use crate::idle::{IdleKind, MaskMonitor};
use crate::protocol::query::song_filter_for_sticker;

const BATCH_SIZE: usize = 50;

pub struct StickerStore {
    conn: Connection,
}

impl StickerStore {
    pub fn open(path: &Path) -> rusqlite::Result<Self> {
        let conn = Connection::open(path)?;
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS sticker (
                type TEXT NOT NULL,
                uri TEXT NOT NULL,
                name TEXT NOT NULL,
                value TEXT NOT NULL,
                PRIMARY KEY (type, uri, name)
            )",
        )?;
        Ok(Self { conn })
    }

    pub fn get(&self, ty: &str, uri: &str, name: &str) -> rusqlite::Result<Option<String>> {
        self.conn
            .query_row(
                "SELECT value FROM sticker WHERE type = ?1 AND uri = ?2 AND name = ?3",
                (ty, uri, name),
                |row| row.get(0),
            )
            .map(Some)
            .or_else(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => Ok(None),
                other => Err(other),
            })
    }

    pub fn set(&self, ty: &str, uri: &str, name: &str, value: &str) -> rusqlite::Result<()> {
        self.conn.execute(
            "INSERT INTO sticker (type, uri, name, value) VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(type, uri, name) DO UPDATE SET value = excluded.value",
            (ty, uri, name, value),
        )?;
        Ok(())
    }

    pub fn delete(&self, ty: &str, uri: &str, name: Option<&str>) -> rusqlite::Result<()> {
        match name {
            Some(name) => {
                self.conn.execute(
                    "DELETE FROM sticker WHERE type = ?1 AND uri = ?2 AND name = ?3",
                    (ty, uri, name),
                )?;
            }
            None => {
                self.conn
                    .execute("DELETE FROM sticker WHERE type = ?1 AND uri = ?2", (ty, uri))?;
            }
        }
        Ok(())
    }

    pub fn list(&self, ty: &str, uri: &str) -> rusqlite::Result<Vec<(String, String)>> {
        let mut stmt = self
            .conn
            .prepare("SELECT name, value FROM sticker WHERE type = ?1 AND uri = ?2")?;
        let rows = stmt.query_map((ty, uri), |row| Ok((row.get(0)?, row.get(1)?)))?;
        rows.collect()
    }

    /// `sticker find`: every `(uri, value)` under `base_uri` (by prefix)
    /// that carries a sticker called `name`.
    pub fn find_by_name(&self, ty: &str, base_uri: &str, name: &str) -> rusqlite::Result<Vec<(String, String)>> {
        let mut stmt = self
            .conn
            .prepare("SELECT uri, value FROM sticker WHERE type = ?1 AND name = ?2 AND uri LIKE ?3")?;
        let pattern = format!("{base_uri}%");
        let rows = stmt.query_map((ty, name, pattern), |row| Ok((row.get(0)?, row.get(1)?)))?;
        rows.collect()
    }

    fn unique_type_uri_pairs(&self) -> rusqlite::Result<Vec<(String, String)>> {
        let mut stmt = self.conn.prepare("SELECT DISTINCT type, uri FROM sticker")?;
        let rows = stmt.query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?;
        rows.collect()
    }

    fn delete_batch(&mut self, batch: &[(String, String)]) -> rusqlite::Result<()> {
        let tx = self.conn.transaction()?;
        for (ty, uri) in batch {
            tx.execute("DELETE FROM sticker WHERE type = ?1 AND uri = ?2", (ty, uri))?;
        }
        tx.commit()
    }
}

/// Cooperative cancellation flag shared with a running cleanup.
#[derive(Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Runs the reconciliation algorithm to completion or cancellation. The
/// caller is expected to run this on a blocking worker thread (it does its
/// own DB I/O) and deliver the result back to the owning loop through
/// `inject`.
pub fn run_cleanup(
    mut store: StickerStore,
    database: Arc<dyn Database>,
    cancel: CancelToken,
) -> rusqlite::Result<CleanupOutcome> {
    let pairs = store.unique_type_uri_pairs()?;
    let mut batch = Vec::with_capacity(BATCH_SIZE);
    let mut total_deleted = 0u64;

    for (ty, uri) in pairs {
        if cancel.is_cancelled() {
            return Ok(CleanupOutcome { total_deleted, cancelled: true });
        }
        let Ok(path) = Utf8PathBuf::try_from(uri.clone()) else {
            continue;
        };
        let query = song_filter_for_sticker(&path);
        if database.matches_any(&query) {
            continue;
        }
        batch.push((ty, uri));
        if batch.len() >= BATCH_SIZE {
            store.delete_batch(&batch)?;
            total_deleted += batch.len() as u64;
            batch.clear();
        }
    }

    if !batch.is_empty() {
        total_deleted += batch.len() as u64;
        store.delete_batch(&batch)?;
    }

    Ok(CleanupOutcome { total_deleted, cancelled: false })
}

pub struct CleanupOutcome {
    pub total_deleted: u64,
    pub cancelled: bool,
}

/// Spawns `run_cleanup` on a blocking thread and delivers its outcome back
/// to the instance's loop via `inject`, matching the pattern `BackgroundCommand`
/// uses for long-running work.
pub fn spawn(
    store: StickerStore,
    database: Arc<dyn Database>,
    idle: Arc<MaskMonitor>,
    inject: InjectHandle,
    on_done: impl FnOnce(CleanupOutcome) + Send + 'static,
) -> CancelToken {
    let cancel = CancelToken::new();
    let cancel_for_worker = cancel.clone();
    std::thread::spawn(move || {
        let result = run_cleanup(store, database, cancel_for_worker);
        if let Ok(outcome) = result {
            inject.inject(move || {
                if !outcome.cancelled && outcome.total_deleted > 0 {
                    idle.or_mask(IdleKind::Sticker.into());
                }
                on_done(outcome);
            });
        }
    });
    cancel
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::InMemoryDatabase;

    #[test]
    fn cleanup_deletes_only_orphaned_stickers() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = StickerStore::open(&dir.path().join("sticker.db")).unwrap();
        store.set("song", "live.flac", "rating", "5").unwrap();
        store.set("song", "gone.flac", "rating", "3").unwrap();

        let database = Arc::new(InMemoryDatabase::new());
        database.insert(crate::database::SongInfo {
            uri: Utf8PathBuf::from("live.flac"),
            duration_seconds: None,
            tags: vec![],
        });

        let outcome = run_cleanup(store, database, CancelToken::new()).unwrap();
        assert_eq!(outcome.total_deleted, 1);
        assert!(!outcome.cancelled);
    }

    #[test]
    fn cancellation_stops_without_deleting_remaining_batch() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = StickerStore::open(&dir.path().join("sticker.db")).unwrap();
        for i in 0..5 {
            store.set("song", &format!("gone{i}.flac"), "rating", "1").unwrap();
        }
        let cancel = CancelToken::new();
        cancel.cancel();
        let database = Arc::new(InMemoryDatabase::new());
        let outcome = run_cleanup(store, database, cancel).unwrap();
        assert!(outcome.cancelled);
        assert_eq!(outcome.total_deleted, 0);
    }
}
