//! SQLite implementation of the Store trait.
//!
//! This is the durable storage backend for Cellar. It uses rusqlite with
//! bundled SQLite and keeps one connection behind a mutex.

use std::path::Path;
use std::sync::Mutex;

use rusqlite::{params, Connection, OptionalExtension};

use cellar_core::{Cell, Hash, RefStatus};

use crate::error::{Result, StoreError};
use crate::migration;
use crate::traits::Store;

/// SQLite-based store implementation.
///
/// Thread-safe via internal Mutex.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open a SQLite database at the given path.
    ///
    /// Creates the file and runs migrations if it doesn't exist.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let mut conn = Connection::open(path)?;
        migration::migrate(&mut conn)?;
        tracing::info!(path = %path.display(), "opened cell store");
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Open an in-memory SQLite database.
    ///
    /// Useful for testing.
    pub fn open_memory() -> Result<Self> {
        let mut conn = Connection::open_in_memory()?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn with_conn<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        let conn = self
            .conn
            .lock()
            .map_err(|e| StoreError::LockPoisoned(e.to_string()))?;
        f(&conn)
    }

    fn with_conn_mut<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T>,
    {
        let mut conn = self
            .conn
            .lock()
            .map_err(|e| StoreError::LockPoisoned(e.to_string()))?;
        f(&mut conn)
    }
}

fn parse_status(hash: &Hash, raw: u8) -> Result<RefStatus> {
    RefStatus::from_u8(raw).ok_or_else(|| {
        tracing::warn!(%hash, raw, "unknown status in cell store");
        StoreError::Corrupt {
            hash: *hash,
            reason: format!("unknown status {}", raw),
        }
    })
}

fn row_to_hash(bytes: Vec<u8>) -> rusqlite::Result<Hash> {
    Hash::try_from(bytes.as_slice()).map_err(|_| {
        rusqlite::Error::InvalidColumnType(0, "hash".into(), rusqlite::types::Type::Blob)
    })
}

impl Store for SqliteStore {
    fn put(&self, cell: &Cell, status: RefStatus) -> Result<Option<RefStatus>> {
        let hash = cell.hash();
        let encoding = cell.encoding().clone();

        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            let previous: Option<u8> = tx
                .query_row(
                    "SELECT status FROM cells WHERE hash = ?1",
                    params![hash.as_bytes().as_slice()],
                    |row| row.get(0),
                )
                .optional()?;

            tx.execute(
                "INSERT INTO cells (hash, encoding, status, stored_at)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(hash) DO UPDATE SET status = MAX(status, excluded.status)",
                params![
                    hash.as_bytes().as_slice(),
                    encoding.as_ref(),
                    status.to_u8(),
                    migration::now_millis()
                ],
            )?;

            tx.commit()?;
            previous.map(|raw| parse_status(&hash, raw)).transpose()
        })
    }

    fn get(&self, hash: &Hash) -> Result<Option<Cell>> {
        let encoding: Option<Vec<u8>> = self.with_conn(|conn| {
            Ok(conn
                .query_row(
                    "SELECT encoding FROM cells WHERE hash = ?1",
                    params![hash.as_bytes().as_slice()],
                    |row| row.get(0),
                )
                .optional()?)
        })?;

        match encoding {
            Some(bytes) => match cellar_core::decode(&bytes) {
                Ok(cell) => Ok(Some(cell)),
                Err(e) => {
                    tracing::warn!(%hash, error = %e, "stored encoding does not decode");
                    Err(StoreError::Corrupt {
                        hash: *hash,
                        reason: e.to_string(),
                    })
                }
            },
            None => Ok(None),
        }
    }

    fn status(&self, hash: &Hash) -> Result<Option<RefStatus>> {
        let raw: Option<u8> = self.with_conn(|conn| {
            Ok(conn
                .query_row(
                    "SELECT status FROM cells WHERE hash = ?1",
                    params![hash.as_bytes().as_slice()],
                    |row| row.get(0),
                )
                .optional()?)
        })?;
        raw.map(|raw| parse_status(hash, raw)).transpose()
    }

    fn all_hashes(&self) -> Result<Vec<Hash>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare("SELECT hash FROM cells ORDER BY hash")?;
            let hashes = stmt
                .query_map([], |row| row_to_hash(row.get(0)?))?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(hashes)
        })
    }

    fn count(&self) -> Result<usize> {
        self.with_conn(|conn| {
            let count: i64 = conn.query_row("SELECT COUNT(*) FROM cells", [], |row| row.get(0))?;
            Ok(count as usize)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::StoreExt;
    use cellar_core::{Address, PeerStatus, Ref};

    #[test]
    fn test_put_and_get_cell() {
        let store = SqliteStore::open_memory().unwrap();
        let cell = Cell::vector([Cell::integer(1), Cell::string("two")]);

        assert_eq!(store.put(&cell, RefStatus::Stored).unwrap(), None);
        let retrieved = store.get(&cell.hash()).unwrap().unwrap();
        assert_eq!(retrieved, cell);
        assert_eq!(retrieved.hash(), cell.hash());
        assert_eq!(store.count().unwrap(), 1);
    }

    #[test]
    fn test_status_upsert_keeps_max() {
        let store = SqliteStore::open_memory().unwrap();
        let cell = Cell::integer(99);

        store.put(&cell, RefStatus::Announced).unwrap();
        assert_eq!(
            store.put(&cell, RefStatus::Stored).unwrap(),
            Some(RefStatus::Announced)
        );
        assert_eq!(store.status(&cell.hash()).unwrap(), Some(RefStatus::Announced));
        assert_eq!(store.count().unwrap(), 1);
    }

    #[test]
    fn test_all_hashes_sorted() {
        let store = SqliteStore::open_memory().unwrap();
        for i in 0..5 {
            store.put(&Cell::integer(i), RefStatus::Stored).unwrap();
        }
        let hashes = store.all_hashes().unwrap();
        assert_eq!(hashes.len(), 5);
        assert!(hashes.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_corrupt_entry_reported() {
        let store = SqliteStore::open_memory().unwrap();
        let hash = Hash::from_bytes([0x55; 32]);
        store
            .with_conn(|conn| {
                conn.execute(
                    "INSERT INTO cells (hash, encoding, status, stored_at) VALUES (?1, ?2, 2, 0)",
                    params![hash.as_bytes().as_slice(), vec![0xfeu8]],
                )?;
                Ok(())
            })
            .unwrap();

        assert!(matches!(store.get(&hash), Err(StoreError::Corrupt { .. })));
    }

    #[test]
    fn test_lookup_detects_mismatched_key() {
        let store = SqliteStore::open_memory().unwrap();
        let cell = Cell::string("real");
        let wrong = Hash::from_bytes([0x66; 32]);
        store
            .with_conn(|conn| {
                conn.execute(
                    "INSERT INTO cells (hash, encoding, status, stored_at) VALUES (?1, ?2, 2, 0)",
                    params![wrong.as_bytes().as_slice(), cell.encoding().as_ref()],
                )?;
                Ok(())
            })
            .unwrap();

        assert!(store.get(&wrong).unwrap().is_some());
        assert!(matches!(store.lookup(&wrong), Err(StoreError::Corrupt { .. })));
    }

    #[test]
    fn test_persist_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("cells.db");

        let big = Cell::string("v".repeat(400));
        let top = Cell::vector([big.clone(), Cell::integer(3)]);
        {
            let store = SqliteStore::open(&path).unwrap();
            store.persist(&top).unwrap();
            assert_eq!(store.count().unwrap(), 2);
        }

        let store = SqliteStore::open(&path).unwrap();
        let loaded = store.lookup(&top.hash()).unwrap().unwrap();
        assert_eq!(loaded, top);

        // The large child comes back as a soft ref and resolves from the store
        let child = loaded.child_ref(0).unwrap();
        assert!(!child.is_resident());
        assert_eq!(store.resolve(&child).unwrap(), big);
        assert_eq!(store.status(&top.hash()).unwrap(), Some(RefStatus::Persisted));
    }

    #[test]
    fn test_concurrent_announce_shares_leaf_once() {
        let store = SqliteStore::open_memory().unwrap();
        let shared = Cell::string("q".repeat(300));
        let seen = Mutex::new(Vec::new());

        std::thread::scope(|s| {
            for i in 0..4i64 {
                let store = &store;
                let seen = &seen;
                s.spawn(move || {
                    let top = Cell::vector([Cell::string("q".repeat(300)), Cell::integer(i)]);
                    let mut record = |r: &Ref| seen.lock().unwrap().push(r.hash());
                    store.announce(&top, Some(&mut record)).unwrap();
                });
            }
        });

        let seen: Vec<Hash> = seen.into_inner().unwrap();
        assert_eq!(seen.iter().filter(|h| **h == shared.hash()).count(), 1);
        assert_eq!(seen.len(), 5);
        assert_eq!(store.count().unwrap(), 5);
    }

    #[test]
    fn test_persist_reloaded_graph_is_idempotent() {
        let store = SqliteStore::open_memory().unwrap();
        let top = Cell::vector([Cell::string("w".repeat(200))]);
        store.persist(&top).unwrap();

        let loaded = store.lookup(&top.hash()).unwrap().unwrap();
        let mut novel = 0;
        let mut record = |_: &Ref| novel += 1;
        store
            .store_top_ref(&loaded.to_ref(), RefStatus::Persisted, Some(&mut record))
            .unwrap();
        assert_eq!(novel, 0);
        assert_eq!(store.count().unwrap(), 2);
    }

    #[test]
    fn test_peer_status_roundtrip() {
        let store = SqliteStore::open_memory().unwrap();
        let ps = PeerStatus::create(Address(7), 1_000)
            .unwrap()
            .with_delegated_stake(Address(8), 250)
            .unwrap()
            .add_reward(100)
            .unwrap();
        let cell = Cell::from(ps.clone());

        store.persist(&cell).unwrap();
        let loaded = store.lookup(&cell.hash()).unwrap().unwrap();
        assert_eq!(loaded.as_peer_status(), Some(&ps));
    }
}
