//! Local question cache
//!
//! A durable SQLite store holding two record kinds:
//!
//! - `questions` - question documents keyed by store identity (upsert)
//! - `log_entries` - append-only entries keyed by an assigned sequence
//!
//! The cache is an explicit handle with an open/close lifecycle. Each
//! operation holds the connection lock for its whole duration, so every
//! operation is atomic with respect to other users of the same handle.
//! `replace_questions` clears and repopulates inside one transaction; no
//! reader ever sees the collection empty mid-replace.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use rusqlite::{params, Connection, OptionalExtension, Params};
use serde::Serialize;
use tracing::debug;

use super::error::{StorageError, StorageResult};
use super::schema::{get_schema_version, migrate};
use crate::config::Config;
use crate::document::{Record, ID_FIELD};
use crate::models::{CachedQuestion, Difficulty, LogEntry, NewLogEntry, RESERVED_LOG_FIELDS};

/// The two kinds of record the cache holds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    Question,
    LogEntry,
}

impl RecordKind {
    fn table(&self) -> &'static str {
        match self {
            RecordKind::Question => "questions",
            RecordKind::LogEntry => "log_entries",
        }
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordKind::Question => f.write_str("question"),
            RecordKind::LogEntry => f.write_str("log entry"),
        }
    }
}

/// Cache statistics
#[derive(Debug, Clone, Default, Serialize)]
pub struct CacheStats {
    pub questions: i64,
    pub unvalidated: i64,
    pub log_entries: i64,
    pub schema_version: i32,
    /// Size of the database file (None for in-memory caches)
    pub database_size: Option<u64>,
}

impl CacheStats {
    /// Database size in human-readable form
    pub fn database_size_human(&self) -> String {
        match self.database_size {
            None => "in memory".to_string(),
            Some(bytes) if bytes < 1024 => format!("{} B", bytes),
            Some(bytes) if bytes < 1024 * 1024 => format!("{:.1} KB", bytes as f64 / 1024.0),
            Some(bytes) => format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0)),
        }
    }
}

const QUESTION_COLUMNS: &str = "id, validated, data";

/// Local persistent cache for questions and log entries
pub struct LocalCache {
    conn: Mutex<Option<Connection>>,
    path: Option<PathBuf>,
}

impl LocalCache {
    /// Open the cache at the configured location
    pub fn open(config: &Config) -> StorageResult<Self> {
        Self::open_at(config.cache_path())
    }

    /// Open or create a cache database file
    pub fn open_at(path: impl AsRef<Path>) -> StorageResult<Self> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| StorageError::from_io(e, parent))?;
            }
        }

        let mut conn = Connection::open(path)?;
        let version = migrate(&mut conn)?;
        debug!("Opened cache at {:?} (schema v{})", path, version);

        Ok(Self {
            conn: Mutex::new(Some(conn)),
            path: Some(path.to_path_buf()),
        })
    }

    /// Open an in-memory cache (for testing)
    pub fn open_in_memory() -> StorageResult<Self> {
        let mut conn = Connection::open_in_memory()?;
        migrate(&mut conn)?;
        Ok(Self {
            conn: Mutex::new(Some(conn)),
            path: None,
        })
    }

    /// Close the cache; every later operation fails as unavailable
    pub fn close(&self) -> StorageResult<()> {
        let conn = self.lock()?.take();
        if let Some(conn) = conn {
            conn.close().map_err(|(_, e)| StorageError::from(e))?;
            debug!("Closed cache");
        }
        Ok(())
    }

    pub fn is_open(&self) -> bool {
        self.lock().map(|guard| guard.is_some()).unwrap_or(false)
    }

    /// Database file path (None for in-memory caches)
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    // ==================== Bulk operations ====================

    /// Remove every record of one kind
    ///
    /// Clearing log entries does not reset their sequence.
    pub fn clear_all(&self, kind: RecordKind) -> StorageResult<usize> {
        self.with_conn(|conn| {
            let removed = conn.execute(&format!("DELETE FROM {}", kind.table()), [])?;
            debug!("Cleared {} {} record(s)", removed, kind);
            Ok(removed)
        })
    }

    /// Insert or replace questions by identity, in one transaction
    pub fn bulk_insert_questions(&self, questions: &[CachedQuestion]) -> StorageResult<usize> {
        self.with_conn(|conn| {
            let tx = conn.transaction()?;
            for question in questions {
                insert_question(&tx, question)?;
            }
            tx.commit()?;
            Ok(questions.len())
        })
    }

    /// Replace the whole question collection in one transaction
    pub fn replace_questions(&self, questions: &[CachedQuestion]) -> StorageResult<usize> {
        self.with_conn(|conn| {
            let tx = conn.transaction()?;
            tx.execute("DELETE FROM questions", [])?;
            for question in questions {
                insert_question(&tx, question)?;
            }
            tx.commit()?;
            Ok(questions.len())
        })
    }

    /// Append several log entries, in one transaction
    pub fn bulk_insert_log(&self, entries: &[NewLogEntry]) -> StorageResult<Vec<LogEntry>> {
        self.with_conn(|conn| {
            let tx = conn.transaction()?;
            let stored = entries
                .iter()
                .map(|entry| insert_log_entry(&tx, entry))
                .collect::<StorageResult<Vec<_>>>()?;
            tx.commit()?;
            Ok(stored)
        })
    }

    // ==================== Question operations ====================

    /// Insert or replace one question
    pub fn put_question(&self, question: &CachedQuestion) -> StorageResult<()> {
        self.with_conn(|conn| insert_question(conn, question))
    }

    /// Get a question by identity
    pub fn question(&self, id: &str) -> StorageResult<Option<CachedQuestion>> {
        self.with_conn(|conn| {
            let row = conn
                .query_row(
                    &format!("SELECT {} FROM questions WHERE id = ?", QUESTION_COLUMNS),
                    params![id],
                    QuestionRow::from_row,
                )
                .optional()?;
            row.map(QuestionRow::into_cached).transpose()
        })
    }

    /// All questions, ordered by identity
    pub fn questions(&self) -> StorageResult<Vec<CachedQuestion>> {
        self.query_questions("ORDER BY id", [])
    }

    pub fn questions_by_subject(&self, subject: &str) -> StorageResult<Vec<CachedQuestion>> {
        self.query_questions("WHERE subject = ? ORDER BY id", params![subject])
    }

    pub fn questions_by_topic(&self, topic: &str) -> StorageResult<Vec<CachedQuestion>> {
        self.query_questions("WHERE topic = ? ORDER BY id", params![topic])
    }

    /// Questions with a given (subject, topic) classification pair
    pub fn questions_by_classification(
        &self,
        subject: &str,
        topic: &str,
    ) -> StorageResult<Vec<CachedQuestion>> {
        self.query_questions(
            "WHERE subject = ? AND topic = ? ORDER BY id",
            params![subject, topic],
        )
    }

    pub fn questions_by_difficulty(
        &self,
        difficulty: Difficulty,
    ) -> StorageResult<Vec<CachedQuestion>> {
        self.query_questions(
            "WHERE difficulty = ? ORDER BY id",
            params![difficulty.as_str()],
        )
    }

    /// Questions admitted without passing validation
    pub fn unvalidated_questions(&self) -> StorageResult<Vec<CachedQuestion>> {
        self.query_questions("WHERE validated = 0 ORDER BY id", [])
    }

    pub fn question_count(&self) -> StorageResult<i64> {
        self.count("SELECT COUNT(*) FROM questions")
    }

    pub fn unvalidated_count(&self) -> StorageResult<i64> {
        self.count("SELECT COUNT(*) FROM questions WHERE validated = 0")
    }

    // ==================== Log operations ====================

    /// Append one log entry; the cache assigns its sequence number
    pub fn append(&self, entry: NewLogEntry) -> StorageResult<LogEntry> {
        self.with_conn(|conn| insert_log_entry(conn, &entry))
    }

    /// All log entries in sequence order
    pub fn log_entries(&self) -> StorageResult<Vec<LogEntry>> {
        self.query_log("ORDER BY seq", [])
    }

    /// Log entries referring to one question
    pub fn log_entries_for(&self, question_id: &str) -> StorageResult<Vec<LogEntry>> {
        self.query_log("WHERE question_id = ? ORDER BY seq", params![question_id])
    }

    pub fn log_count(&self) -> StorageResult<i64> {
        self.count("SELECT COUNT(*) FROM log_entries")
    }

    // ==================== Stats ====================

    pub fn schema_version(&self) -> StorageResult<i32> {
        self.with_conn(|conn| Ok(get_schema_version(conn)?.unwrap_or(0)))
    }

    pub fn stats(&self) -> StorageResult<CacheStats> {
        let database_size = self
            .path
            .as_ref()
            .and_then(|p| std::fs::metadata(p).ok())
            .map(|m| m.len());

        Ok(CacheStats {
            questions: self.question_count()?,
            unvalidated: self.unvalidated_count()?,
            log_entries: self.log_count()?,
            schema_version: self.schema_version()?,
            database_size,
        })
    }

    // ==================== Private helpers ====================

    fn lock(&self) -> StorageResult<std::sync::MutexGuard<'_, Option<Connection>>> {
        self.conn
            .lock()
            .map_err(|_| StorageError::unavailable("cache lock poisoned"))
    }

    fn with_conn<T>(
        &self,
        f: impl FnOnce(&mut Connection) -> StorageResult<T>,
    ) -> StorageResult<T> {
        let mut guard = self.lock()?;
        let conn = guard
            .as_mut()
            .ok_or_else(|| StorageError::unavailable("cache is closed"))?;
        f(conn)
    }

    fn count(&self, sql: &str) -> StorageResult<i64> {
        self.with_conn(|conn| Ok(conn.query_row(sql, [], |row| row.get(0))?))
    }

    fn query_questions<P: Params>(
        &self,
        clause: &str,
        params: P,
    ) -> StorageResult<Vec<CachedQuestion>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {} FROM questions {}",
                QUESTION_COLUMNS, clause
            ))?;
            let rows = stmt.query_map(params, QuestionRow::from_row)?;

            let mut questions = Vec::new();
            for row in rows {
                questions.push(row?.into_cached()?);
            }
            Ok(questions)
        })
    }

    fn query_log<P: Params>(&self, clause: &str, params: P) -> StorageResult<Vec<LogEntry>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT seq, question_id, timestamp, event_type, attributes FROM log_entries {}",
                clause
            ))?;
            let rows = stmt.query_map(params, |row| {
                Ok(LogRow {
                    seq: row.get(0)?,
                    question_id: row.get(1)?,
                    timestamp: row.get(2)?,
                    event_type: row.get(3)?,
                    attributes: row.get(4)?,
                })
            })?;

            let mut entries = Vec::new();
            for row in rows {
                entries.push(row?.into_entry()?);
            }
            Ok(entries)
        })
    }
}

/// Upsert one question row
fn insert_question(conn: &Connection, question: &CachedQuestion) -> StorageResult<()> {
    let id = question.id().ok_or(StorageError::MissingIdentity)?;
    let data = serde_json::to_string(&question.record)?;

    conn.execute(
        r#"
        INSERT OR REPLACE INTO questions (id, subject, topic, difficulty, validated, data)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6)
        "#,
        params![
            id,
            question.subject(),
            question.topic(),
            question.difficulty(),
            question.validated,
            data
        ],
    )?;
    Ok(())
}

fn insert_log_entry(conn: &Connection, entry: &NewLogEntry) -> StorageResult<LogEntry> {
    let mut attributes = entry.attributes.clone();
    attributes.retain(|key, _| !RESERVED_LOG_FIELDS.contains(&key.as_str()));
    let encoded = serde_json::to_string(&attributes)?;

    conn.execute(
        "INSERT INTO log_entries (question_id, timestamp, event_type, attributes) VALUES (?1, ?2, ?3, ?4)",
        params![entry.question_id, entry.timestamp, entry.event_type, encoded],
    )?;

    Ok(LogEntry {
        seq: conn.last_insert_rowid(),
        question_id: entry.question_id.clone(),
        timestamp: entry.timestamp,
        event_type: entry.event_type.clone(),
        attributes,
    })
}

struct QuestionRow {
    id: String,
    validated: bool,
    data: String,
}

impl QuestionRow {
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            validated: row.get(1)?,
            data: row.get(2)?,
        })
    }

    fn into_cached(self) -> StorageResult<CachedQuestion> {
        let mut record: Record =
            serde_json::from_str(&self.data).map_err(|e| StorageError::Corrupt {
                key: self.id.clone(),
                details: e.to_string(),
            })?;
        // The key column is authoritative
        record.insert(ID_FIELD.to_string(), self.id.into());

        Ok(CachedQuestion {
            record,
            validated: self.validated,
        })
    }
}

struct LogRow {
    seq: i64,
    question_id: String,
    timestamp: i64,
    event_type: String,
    attributes: String,
}

impl LogRow {
    fn into_entry(self) -> StorageResult<LogEntry> {
        let attributes: Record =
            serde_json::from_str(&self.attributes).map_err(|e| StorageError::Corrupt {
                key: format!("log_entries.{}", self.seq),
                details: e.to_string(),
            })?;

        Ok(LogEntry {
            seq: self.seq,
            question_id: self.question_id,
            timestamp: self.timestamp,
            event_type: self.event_type,
            attributes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Question;
    use serde_json::json;
    use tempfile::TempDir;

    fn question(id: &str, subject: &str, topic: &str) -> CachedQuestion {
        let q = Question::new(id, subject, topic, format!("Question {}", id));
        CachedQuestion::from_question(&q).unwrap()
    }

    fn raw(value: serde_json::Value) -> CachedQuestion {
        CachedQuestion::unvalidated(value.as_object().unwrap().clone())
    }

    fn ids(questions: &[CachedQuestion]) -> Vec<&str> {
        questions.iter().filter_map(|q| q.id()).collect()
    }

    #[test]
    fn test_open_creates_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("cache.db");

        let cache = LocalCache::open_at(&path).unwrap();
        assert!(path.exists());
        assert_eq!(cache.path(), Some(path.as_path()));
        assert_eq!(cache.schema_version().unwrap(), 2);
    }

    #[test]
    fn test_bulk_insert_and_to_array() {
        let cache = LocalCache::open_in_memory().unwrap();
        cache
            .bulk_insert_questions(&[
                question("q2", "math", "algebra"),
                question("q1", "math", "fractions"),
            ])
            .unwrap();

        let all = cache.questions().unwrap();
        assert_eq!(ids(&all), vec!["q1", "q2"]);
        assert!(all.iter().all(|q| q.validated));
    }

    #[test]
    fn test_upsert_by_identity() {
        let cache = LocalCache::open_in_memory().unwrap();
        cache.put_question(&question("q1", "math", "algebra")).unwrap();
        cache.put_question(&question("q1", "science", "cells")).unwrap();

        assert_eq!(cache.question_count().unwrap(), 1);
        let stored = cache.question("q1").unwrap().unwrap();
        assert_eq!(stored.subject(), Some("science"));
    }

    #[test]
    fn test_missing_identity_rejected() {
        let cache = LocalCache::open_in_memory().unwrap();
        let err = cache
            .bulk_insert_questions(&[
                question("q1", "math", "algebra"),
                raw(json!({ "content": "no id" })),
            ])
            .unwrap_err();

        assert!(matches!(err, StorageError::MissingIdentity));
        // The whole batch rolled back
        assert_eq!(cache.question_count().unwrap(), 0);
    }

    #[test]
    fn test_replace_questions_discards_previous() {
        let cache = LocalCache::open_in_memory().unwrap();
        cache
            .bulk_insert_questions(&[question("old1", "a", "b"), question("old2", "a", "b")])
            .unwrap();

        let replaced = cache
            .replace_questions(&[question("new1", "a", "b")])
            .unwrap();

        assert_eq!(replaced, 1);
        assert_eq!(ids(&cache.questions().unwrap()), vec!["new1"]);
    }

    #[test]
    fn test_failed_replace_keeps_previous() {
        let cache = LocalCache::open_in_memory().unwrap();
        cache.put_question(&question("keep", "a", "b")).unwrap();

        let result = cache.replace_questions(&[raw(json!({ "id": "" }))]);
        assert!(result.is_err());
        assert_eq!(ids(&cache.questions().unwrap()), vec!["keep"]);
    }

    #[test]
    fn test_indexed_lookups() {
        let cache = LocalCache::open_in_memory().unwrap();
        let mut hard = Question::new("q3", "science", "cells", "Hard one");
        hard.difficulty = Difficulty::Hard;
        cache
            .bulk_insert_questions(&[
                question("q1", "math", "algebra"),
                question("q2", "math", "fractions"),
                CachedQuestion::from_question(&hard).unwrap(),
                raw(json!({ "id": "q4", "subject": "math" })),
            ])
            .unwrap();

        assert_eq!(
            ids(&cache.questions_by_subject("math").unwrap()),
            vec!["q1", "q2", "q4"]
        );
        assert_eq!(ids(&cache.questions_by_topic("cells").unwrap()), vec!["q3"]);
        assert_eq!(
            ids(&cache.questions_by_classification("math", "fractions").unwrap()),
            vec!["q2"]
        );
        assert_eq!(
            ids(&cache.questions_by_difficulty(Difficulty::Hard).unwrap()),
            vec!["q3"]
        );
        assert_eq!(ids(&cache.unvalidated_questions().unwrap()), vec!["q4"]);
        assert_eq!(cache.unvalidated_count().unwrap(), 1);
    }

    #[test]
    fn test_stored_key_is_authoritative() {
        let cache = LocalCache::open_in_memory().unwrap();
        cache.put_question(&question("q1", "a", "b")).unwrap();

        let stored = cache.question("q1").unwrap().unwrap();
        assert_eq!(stored.record.get("id"), Some(&json!("q1")));
        assert!(cache.question("nope").unwrap().is_none());
    }

    #[test]
    fn test_append_assigns_monotonic_sequence() {
        let cache = LocalCache::open_in_memory().unwrap();

        let first = cache.append(NewLogEntry::new("q1", "viewed")).unwrap();
        let second = cache
            .append(NewLogEntry::new("q1", "answered").with_attribute("correct", true))
            .unwrap();

        assert!(second.seq > first.seq);
        assert_eq!(second.attributes.get("correct"), Some(&json!(true)));

        let entries = cache.log_entries().unwrap();
        assert_eq!(entries, vec![first, second]);
    }

    #[test]
    fn test_sequence_not_reused_after_clear() {
        let cache = LocalCache::open_in_memory().unwrap();
        let before = cache.append(NewLogEntry::new("q1", "viewed")).unwrap();

        cache.clear_all(RecordKind::LogEntry).unwrap();
        assert_eq!(cache.log_count().unwrap(), 0);

        let after = cache.append(NewLogEntry::new("q1", "viewed")).unwrap();
        assert!(after.seq > before.seq);
    }

    #[test]
    fn test_log_entries_outlive_questions() {
        let cache = LocalCache::open_in_memory().unwrap();
        cache.put_question(&question("q1", "a", "b")).unwrap();
        cache
            .bulk_insert_log(&[
                NewLogEntry::new("q1", "viewed"),
                NewLogEntry::new("q2", "viewed"),
                NewLogEntry::new("q1", "answered"),
            ])
            .unwrap();

        cache.clear_all(RecordKind::Question).unwrap();

        assert_eq!(cache.question_count().unwrap(), 0);
        let for_q1 = cache.log_entries_for("q1").unwrap();
        assert_eq!(for_q1.len(), 2);
        assert_eq!(for_q1[1].event_type, "answered");
    }

    #[test]
    fn test_closed_cache_is_unavailable() {
        let cache = LocalCache::open_in_memory().unwrap();
        cache.close().unwrap();

        assert!(!cache.is_open());
        assert!(cache.questions().unwrap_err().is_unavailable());
        assert!(cache
            .append(NewLogEntry::new("q1", "viewed"))
            .unwrap_err()
            .is_unavailable());
        assert!(cache
            .clear_all(RecordKind::Question)
            .unwrap_err()
            .is_unavailable());
        // Closing twice is harmless
        cache.close().unwrap();
    }

    #[test]
    fn test_unopenable_path_is_unavailable() {
        let temp_dir = TempDir::new().unwrap();
        let blocker = temp_dir.path().join("file");
        std::fs::write(&blocker, b"not a directory").unwrap();

        let err = LocalCache::open_at(blocker.join("cache.db"))
            .err()
            .unwrap();
        assert!(err.is_unavailable());
    }

    #[test]
    fn test_data_persists_across_reopens() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("cache.db");

        {
            let cache = LocalCache::open_at(&path).unwrap();
            cache.put_question(&question("q1", "math", "algebra")).unwrap();
            cache.append(NewLogEntry::new("q1", "viewed")).unwrap();
            cache.close().unwrap();
        }

        let cache = LocalCache::open_at(&path).unwrap();
        let stats = cache.stats().unwrap();
        assert_eq!(stats.questions, 1);
        assert_eq!(stats.log_entries, 1);
        assert_eq!(stats.unvalidated, 0);
        assert!(stats.database_size.unwrap() > 0);
    }

    #[test]
    fn test_database_size_human() {
        let mut stats = CacheStats::default();
        assert_eq!(stats.database_size_human(), "in memory");
        stats.database_size = Some(2048);
        assert_eq!(stats.database_size_human(), "2.0 KB");
    }
}
