//! SQLite schema for the local question cache
//!
//! The schema is versioned. Each migration moves the database forward one
//! version inside its own transaction; a database written by a newer
//! version is refused rather than rewritten.

use rusqlite::{Connection, OptionalExtension};
use tracing::info;

use super::error::{StorageError, StorageResult};

/// Current schema version
pub const SCHEMA_VERSION: i32 = 2;

/// Ordered migrations: (version reached, SQL)
const MIGRATIONS: &[(i32, &str)] = &[
    (
        1,
        r#"
        -- Question documents, keyed by store identity
        CREATE TABLE IF NOT EXISTS questions (
            id TEXT PRIMARY KEY,
            subject TEXT,
            topic TEXT,
            difficulty TEXT,
            data TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_questions_subject ON questions(subject);
        CREATE INDEX IF NOT EXISTS idx_questions_topic ON questions(topic);
        CREATE INDEX IF NOT EXISTS idx_questions_difficulty ON questions(difficulty);

        -- Append-only log; AUTOINCREMENT keeps sequence numbers from being reused
        CREATE TABLE IF NOT EXISTS log_entries (
            seq INTEGER PRIMARY KEY AUTOINCREMENT,
            question_id TEXT NOT NULL,
            timestamp INTEGER NOT NULL,
            event_type TEXT NOT NULL,
            attributes TEXT NOT NULL DEFAULT '{}'
        );

        CREATE INDEX IF NOT EXISTS idx_log_entries_question_id ON log_entries(question_id);
        "#,
    ),
    (
        2,
        r#"
        -- Rows cached before validation tracking are treated as unvalidated
        ALTER TABLE questions ADD COLUMN validated INTEGER NOT NULL DEFAULT 0;

        CREATE INDEX IF NOT EXISTS idx_questions_subject_topic ON questions(subject, topic);
        CREATE INDEX IF NOT EXISTS idx_questions_validated ON questions(validated);
        "#,
    ),
];

/// Bring the database up to [`SCHEMA_VERSION`]
///
/// Returns the version the database is at afterwards.
pub fn migrate(conn: &mut Connection) -> StorageResult<i32> {
    migrate_to(conn, SCHEMA_VERSION)
}

/// Apply migrations up to and including `target`
pub(crate) fn migrate_to(conn: &mut Connection, target: i32) -> StorageResult<i32> {
    ensure_schema_info(conn)?;

    let current = get_schema_version(conn)?.unwrap_or(0);
    if current > SCHEMA_VERSION {
        return Err(StorageError::UnsupportedVersion {
            found: current,
            supported: SCHEMA_VERSION,
        });
    }

    let mut version = current;
    for (step, sql) in MIGRATIONS
        .iter()
        .filter(|(step, _)| *step > current && *step <= target)
    {
        let tx = conn.transaction()?;
        tx.execute_batch(sql)?;
        tx.execute(
            "INSERT OR REPLACE INTO schema_info (key, value) VALUES ('version', ?)",
            [step.to_string()],
        )?;
        tx.commit()?;

        info!("Migrated cache schema from version {} to {}", version, step);
        version = *step;
    }

    Ok(version)
}

/// Get the current schema version from the database
pub fn get_schema_version(conn: &Connection) -> StorageResult<Option<i32>> {
    let value: Option<String> = conn
        .query_row(
            "SELECT value FROM schema_info WHERE key = 'version'",
            [],
            |row| row.get(0),
        )
        .optional()?;

    match value {
        None => Ok(None),
        Some(v) => v.parse().map(Some).map_err(|_| StorageError::Corrupt {
            key: "schema_info.version".to_string(),
            details: format!("not a number: {:?}", v),
        }),
    }
}

fn ensure_schema_info(conn: &Connection) -> StorageResult<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_info (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        );",
    )?;
    Ok(())
}
