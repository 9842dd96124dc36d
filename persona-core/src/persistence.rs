//! SQLite persistence for world snapshots.
//!
//! Each labelled [`WorldSnapshot`] is encoded (JSON or bincode) and stored
//! in one row:
//!
//! ```sql
//! CREATE TABLE IF NOT EXISTS world_snapshots (
//!     label      TEXT PRIMARY KEY,
//!     version    INTEGER NOT NULL,
//!     format     TEXT NOT NULL,
//!     data       BLOB NOT NULL,
//!     updated_at TEXT NOT NULL,
//!     checksum   TEXT
//! );
//! ```
//!
//! - WAL mode for concurrent reads.
//! - The encoding is recorded per row, so a store can hold both.
//! - Optional CRC-32 checksum flags corrupted saves.
//! - Backups use SQLite's online-backup API.

use std::path::{Path, PathBuf};
use std::time::Instant;

use chrono::Utc;
use rusqlite::{params, Connection, OpenFlags};
use tracing::{debug, info, warn};

use crate::config::{PersistenceConfig, SnapshotFormat};
use crate::error::{PersonaError, Result};
use crate::system::WorldSnapshot;

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS world_snapshots (
    label      TEXT PRIMARY KEY,
    version    INTEGER NOT NULL,
    format     TEXT NOT NULL,
    data       BLOB NOT NULL,
    updated_at TEXT NOT NULL,
    checksum   TEXT
);";

// ---------------------------------------------------------------------------
// CRC-32 checksum helper
// ---------------------------------------------------------------------------

fn crc32_hex(data: &[u8]) -> String {
    format!("{:08x}", crc32_compute(data))
}

/// CRC-32 (ISO 3309 / ITU-T V.42).
fn crc32_compute(data: &[u8]) -> u32 {
    const POLY: u32 = 0xEDB8_8320;
    let mut crc: u32 = 0xFFFF_FFFF;
    for &byte in data {
        crc ^= u32::from(byte);
        for _ in 0..8 {
            if crc & 1 == 1 {
                crc = (crc >> 1) ^ POLY;
            } else {
                crc >>= 1;
            }
        }
    }
    !crc
}

// ---------------------------------------------------------------------------
// Encoding
// ---------------------------------------------------------------------------

const fn format_tag(format: SnapshotFormat) -> &'static str {
    match format {
        SnapshotFormat::Json => "json",
        SnapshotFormat::Bincode => "bincode",
    }
}

fn encode(snapshot: &WorldSnapshot, format: SnapshotFormat) -> Result<Vec<u8>> {
    match format {
        SnapshotFormat::Json => {
            serde_json::to_vec(snapshot).map_err(|e| PersonaError::Serialization(e.to_string()))
        }
        SnapshotFormat::Bincode => {
            bincode::serialize(snapshot).map_err(|e| PersonaError::Serialization(e.to_string()))
        }
    }
}

fn decode(data: &[u8], tag: &str) -> Result<WorldSnapshot> {
    match tag {
        "json" => {
            serde_json::from_slice(data).map_err(|e| PersonaError::Serialization(e.to_string()))
        }
        "bincode" => {
            bincode::deserialize(data).map_err(|e| PersonaError::Serialization(e.to_string()))
        }
        other => Err(PersonaError::Serialization(format!(
            "unknown snapshot format {other:?}"
        ))),
    }
}

// ---------------------------------------------------------------------------
// SnapshotStore
// ---------------------------------------------------------------------------

/// Handle to an SQLite database of labelled world snapshots.
///
/// ```no_run
/// # use persona_core::persistence::SnapshotStore;
/// # use persona_core::config::{PersistenceConfig, PersonaConfig};
/// # use persona_core::system::PersonaSystem;
/// # use persona_core::types::Address;
/// let store = SnapshotStore::open("world.db", &PersistenceConfig::default())?;
/// let system = PersonaSystem::deploy(Address::from_low_u64(1), PersonaConfig::default())?;
/// store.save_snapshot("autosave", &system.snapshot())?;
/// let loaded = store.load_snapshot("autosave")?;
/// # Ok::<(), persona_core::error::PersonaError>(())
/// ```
pub struct SnapshotStore {
    conn: Connection,
    config: PersistenceConfig,
    db_path: PathBuf,
}

impl std::fmt::Debug for SnapshotStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SnapshotStore")
            .field("db_path", &self.db_path)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl SnapshotStore {
    /// Open (or create) a snapshot database at `path`.
    ///
    /// # Errors
    /// Returns [`PersonaError::Database`] on SQLite failures.
    pub fn open<P: AsRef<Path>>(path: P, config: &PersistenceConfig) -> Result<Self> {
        let db_path = path.as_ref().to_path_buf();
        let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
            | OpenFlags::SQLITE_OPEN_CREATE
            | OpenFlags::SQLITE_OPEN_NO_MUTEX;
        let conn = Connection::open_with_flags(&db_path, flags)?;

        if config.wal_mode {
            conn.execute_batch("PRAGMA journal_mode = WAL;")?;
        }
        conn.execute_batch("PRAGMA synchronous = NORMAL;")?;
        conn.execute_batch("PRAGMA busy_timeout = 5000;")?;
        conn.execute_batch(SCHEMA)?;

        info!(
            path = %db_path.display(),
            wal = config.wal_mode,
            format = format_tag(config.format),
            "Snapshot store opened"
        );

        Ok(Self {
            conn,
            config: config.clone(),
            db_path,
        })
    }

    /// Open an in-memory database.
    ///
    /// # Errors
    /// Returns [`PersonaError::Database`] on SQLite failures.
    pub fn open_in_memory(config: &PersistenceConfig) -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn,
            config: config.clone(),
            db_path: PathBuf::from(":memory:"),
        })
    }

    // ------------------------------------------------------------------
    // CRUD
    // ------------------------------------------------------------------

    /// Save (upsert) a snapshot under `label` in the configured format.
    ///
    /// # Errors
    /// [`PersonaError::Serialization`] if encoding fails,
    /// [`PersonaError::Database`] on SQLite failures.
    pub fn save_snapshot(&self, label: &str, snapshot: &WorldSnapshot) -> Result<()> {
        let start = Instant::now();
        let format = self.config.format;
        let data = encode(snapshot, format)?;
        let checksum = self.config.checksum_enabled.then(|| crc32_hex(&data));
        let now = Utc::now().to_rfc3339();

        self.conn.execute(
            "INSERT INTO world_snapshots (label, version, format, data, updated_at, checksum)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT(label) DO UPDATE SET
                version = excluded.version,
                format = excluded.format,
                data = excluded.data,
                updated_at = excluded.updated_at,
                checksum = excluded.checksum",
            params![label, snapshot.version, format_tag(format), data, now, checksum],
        )?;

        debug!(
            label,
            npcs = snapshot.registry.npcs.len(),
            quests = snapshot.quests.quests.len(),
            bytes = data.len(),
            elapsed_us = start.elapsed().as_micros(),
            "Saved world snapshot"
        );
        Ok(())
    }

    /// Load the snapshot stored under `label`, if any.
    ///
    /// A checksum mismatch is logged; the data is still decoded.
    ///
    /// # Errors
    /// [`PersonaError::Serialization`] if decoding fails,
    /// [`PersonaError::Database`] on SQLite failures.
    pub fn load_snapshot(&self, label: &str) -> Result<Option<WorldSnapshot>> {
        let start = Instant::now();
        let mut stmt = self
            .conn
            .prepare_cached("SELECT format, data, checksum FROM world_snapshots WHERE label = ?1")?;
        let row: Option<(String, Vec<u8>, Option<String>)> = stmt
            .query_row(params![label], |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)))
            .optional()?;

        let Some((format, data, stored_checksum)) = row else {
            return Ok(None);
        };

        if self.config.checksum_enabled {
            if let Some(expected) = stored_checksum {
                let actual = crc32_hex(&data);
                if expected != actual {
                    warn!(
                        label,
                        expected = %expected,
                        actual = %actual,
                        "Checksum mismatch, snapshot may be corrupt"
                    );
                }
            }
        }

        let snapshot = decode(&data, &format)?;
        debug!(
            label,
            format = %format,
            npcs = snapshot.registry.npcs.len(),
            elapsed_us = start.elapsed().as_micros(),
            "Loaded world snapshot"
        );
        Ok(Some(snapshot))
    }

    /// Delete a snapshot. Returns whether a row was removed.
    ///
    /// # Errors
    /// [`PersonaError::Database`] on SQLite failures.
    pub fn delete_snapshot(&self, label: &str) -> Result<bool> {
        let deleted = self
            .conn
            .execute("DELETE FROM world_snapshots WHERE label = ?1", params![label])?;
        Ok(deleted > 0)
    }

    /// Every stored label, alphabetically.
    ///
    /// # Errors
    /// [`PersonaError::Database`] on SQLite failures.
    pub fn list_labels(&self) -> Result<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare_cached("SELECT label FROM world_snapshots ORDER BY label")?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
        let mut labels = Vec::new();
        for row in rows {
            labels.push(row?);
        }
        Ok(labels)
    }

    /// Number of stored snapshots.
    ///
    /// # Errors
    /// [`PersonaError::Database`] on SQLite failures.
    pub fn snapshot_count(&self) -> Result<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM world_snapshots", [], |row| row.get(0))?;
        Ok(usize::try_from(count).unwrap_or(0))
    }

    // ------------------------------------------------------------------
    // Backup
    // ------------------------------------------------------------------

    /// Copy the database to `dest_path` with SQLite's online-backup API.
    ///
    /// # Errors
    /// [`PersonaError::Database`] on SQLite failures.
    pub fn backup<P: AsRef<Path>>(&self, dest_path: P) -> Result<()> {
        let start = Instant::now();
        let mut dest = Connection::open(dest_path.as_ref())?;
        let backup = rusqlite::backup::Backup::new(&self.conn, &mut dest)?;
        backup.run_to_completion(256, std::time::Duration::from_millis(50), None)?;
        info!(
            dest = %dest_path.as_ref().display(),
            elapsed_ms = start.elapsed().as_millis(),
            "Snapshot store backup completed"
        );
        Ok(())
    }

    /// Write `<db>.bak.1`, shifting older backups up and keeping at most
    /// `backup_count`. No-op for in-memory stores.
    ///
    /// # Errors
    /// [`PersonaError::Database`] or [`PersonaError::Io`] on failure.
    pub fn create_rotating_backup(&self) -> Result<()> {
        if self.db_path.as_os_str() == ":memory:" {
            return Ok(());
        }
        let max = self.config.backup_count;
        if max == 0 {
            return Ok(());
        }

        for i in (1..max).rev() {
            let src = self.backup_path(i);
            if src.exists() {
                std::fs::rename(&src, self.backup_path(i + 1))?;
            }
        }
        let oldest = self.backup_path(max + 1);
        if oldest.exists() {
            std::fs::remove_file(&oldest)?;
        }
        self.backup(self.backup_path(1))?;
        info!(max_backups = max, "Rotating backup created");
        Ok(())
    }

    fn backup_path(&self, n: u32) -> PathBuf {
        let mut p = self.db_path.clone();
        let ext = format!(
            "{}.bak.{n}",
            p.extension()
                .map_or(String::new(), |e| e.to_string_lossy().into_owned())
        );
        p.set_extension(ext);
        p
    }

    // ------------------------------------------------------------------
    // Utility
    // ------------------------------------------------------------------

    /// Path to the database file (`:memory:` for in-memory stores).
    #[must_use]
    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    /// Run `PRAGMA integrity_check`.
    ///
    /// # Errors
    /// [`PersonaError::Database`] if the check itself fails.
    pub fn integrity_check(&self) -> Result<bool> {
        let result: String = self
            .conn
            .query_row("PRAGMA integrity_check", [], |row| row.get(0))?;
        Ok(result == "ok")
    }
}

/// Adds `.optional()` to `rusqlite::Result`.
trait OptionalExt<T> {
    fn optional(self) -> std::result::Result<Option<T>, rusqlite::Error>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> std::result::Result<Option<T>, rusqlite::Error> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PersonaConfig;
    use crate::quest::{QuestDraft, QuestType};
    use crate::system::PersonaSystem;
    use crate::types::{Action, Address, CallContext, InteractionContext, Personality, Timestamp, Traits};

    fn sample_snapshot() -> WorldSnapshot {
        let authority = Address::from_low_u64(1);
        let player = Address::from_low_u64(100);
        let mut system = PersonaSystem::deploy(authority, PersonaConfig::default()).expect("deploy");
        let admin = CallContext::new(authority, Timestamp(1));
        let npc = system
            .create_npc(&admin, "Guard John", Personality::Hostile, Traits::new(750, 800, 200).expect("valid"))
            .expect("create");
        let quest = system
            .create_quest(&admin, QuestDraft::new(npc, QuestType::Combat, "Spar", 3))
            .expect("quest");
        let ctx = CallContext::new(player, Timestamp(2));
        system.accept_quest(&ctx, quest).expect("accept");
        system
            .interact(&ctx, npc, InteractionContext::new(Action::Provoke, player))
            .expect("interact");
        system.snapshot()
    }

    fn config(format: SnapshotFormat) -> PersistenceConfig {
        PersistenceConfig {
            format,
            ..PersistenceConfig::default()
        }
    }

    #[test]
    fn round_trip_json_and_bincode() {
        let snapshot = sample_snapshot();
        for format in [SnapshotFormat::Json, SnapshotFormat::Bincode] {
            let store = SnapshotStore::open_in_memory(&config(format)).expect("open");
            store.save_snapshot("slot", &snapshot).expect("save");
            let loaded = store.load_snapshot("slot").expect("load").expect("Some");
            assert_eq!(loaded, snapshot, "{format:?}");
        }
    }

    #[test]
    fn missing_label_is_none() {
        let store = SnapshotStore::open_in_memory(&config(SnapshotFormat::Json)).expect("open");
        assert!(store.load_snapshot("nope").expect("load").is_none());
    }

    #[test]
    fn upsert_list_and_delete() {
        let store = SnapshotStore::open_in_memory(&config(SnapshotFormat::Json)).expect("open");
        let snapshot = sample_snapshot();
        store.save_snapshot("b", &snapshot).expect("save");
        store.save_snapshot("a", &snapshot).expect("save");
        store.save_snapshot("a", &snapshot).expect("overwrite");

        assert_eq!(store.list_labels().expect("list"), vec!["a", "b"]);
        assert_eq!(store.snapshot_count().expect("count"), 2);
        assert!(store.delete_snapshot("a").expect("delete"));
        assert!(!store.delete_snapshot("a").expect("delete again"));
        assert_eq!(store.snapshot_count().expect("count"), 1);
    }

    #[test]
    fn corrupted_checksum_still_loads() {
        let store = SnapshotStore::open_in_memory(&config(SnapshotFormat::Json)).expect("open");
        store.save_snapshot("slot", &sample_snapshot()).expect("save");
        store
            .conn
            .execute(
                "UPDATE world_snapshots SET checksum = 'deadbeef' WHERE label = 'slot'",
                [],
            )
            .expect("corrupt checksum");
        assert!(store.load_snapshot("slot").expect("load").is_some());
    }

    #[test]
    fn unknown_format_is_a_serialization_error() {
        let store = SnapshotStore::open_in_memory(&config(SnapshotFormat::Json)).expect("open");
        store.save_snapshot("slot", &sample_snapshot()).expect("save");
        store
            .conn
            .execute("UPDATE world_snapshots SET format = 'yaml'", [])
            .expect("tamper");
        let err = store.load_snapshot("slot").expect_err("unknown format");
        assert!(matches!(err, PersonaError::Serialization(_)));
    }

    #[test]
    fn file_backup_and_rotation() {
        let dir = tempfile::tempdir().expect("tempdir");
        let db_path = dir.path().join("world.db");
        let mut cfg = config(SnapshotFormat::Bincode);
        cfg.backup_count = 2;

        let store = SnapshotStore::open(&db_path, &cfg).expect("open");
        store.save_snapshot("autosave", &sample_snapshot()).expect("save");
        assert!(store.integrity_check().expect("check"));

        let copy = dir.path().join("copy.db");
        store.backup(&copy).expect("backup");
        let reopened = SnapshotStore::open(&copy, &cfg).expect("open copy");
        assert!(reopened.load_snapshot("autosave").expect("load").is_some());

        for _ in 0..3 {
            store.create_rotating_backup().expect("rotate");
        }
        assert!(dir.path().join("world.db.bak.1").exists());
        assert!(dir.path().join("world.db.bak.2").exists());
        assert!(!dir.path().join("world.db.bak.3").exists());
    }

    #[test]
    fn crc32_known_vector() {
        assert_eq!(crc32_compute(b"123456789"), 0xCBF4_3926);
    }
}
