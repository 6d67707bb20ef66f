use crate::Result;
use rusqlite::Connection;

/// Schema version. Migrations below must stay additive (`CREATE TABLE IF
/// NOT EXISTS`, `ALTER TABLE ... ADD COLUMN`) so that opening an
/// already-migrated database — or an older one, read-only — never fails.
pub const SCHEMA_VERSION: i32 = 1;

pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch("PRAGMA journal_mode = WAL;")?;
    conn.execute_batch(
        r#"
        -- `level` separates raw ingested events (0, the default) from rows
        -- that exist only to anchor a promoted consolidated memory (1).
        CREATE TABLE IF NOT EXISTS events (
            rowid INTEGER PRIMARY KEY AUTOINCREMENT,
            id TEXT NOT NULL UNIQUE,
            event_type TEXT NOT NULL,
            session_id TEXT NOT NULL,
            turn_id TEXT,
            timestamp TEXT NOT NULL,
            content TEXT NOT NULL,
            canonical_key TEXT NOT NULL,
            dedupe_key TEXT NOT NULL UNIQUE,
            metadata TEXT NOT NULL DEFAULT '{}',
            access_count INTEGER NOT NULL DEFAULT 0,
            level INTEGER NOT NULL DEFAULT 0
        );

        CREATE INDEX IF NOT EXISTS idx_events_session ON events(session_id);
        CREATE INDEX IF NOT EXISTS idx_events_turn ON events(turn_id);
        CREATE INDEX IF NOT EXISTS idx_events_canonical ON events(canonical_key);
        CREATE INDEX IF NOT EXISTS idx_events_timestamp ON events(timestamp);
        CREATE INDEX IF NOT EXISTS idx_events_level ON events(level);

        CREATE VIRTUAL TABLE IF NOT EXISTS events_fts USING fts5(
            content,
            content='events',
            content_rowid='rowid'
        );

        CREATE TABLE IF NOT EXISTS sessions (
            id TEXT PRIMARY KEY,
            started_at TEXT NOT NULL,
            ended_at TEXT,
            project_path TEXT,
            summary TEXT,
            tags TEXT NOT NULL DEFAULT '[]'
        );

        CREATE TABLE IF NOT EXISTS outbox (
            job_id INTEGER PRIMARY KEY AUTOINCREMENT,
            item_kind TEXT NOT NULL,
            item_id TEXT NOT NULL,
            embedding_version INTEGER NOT NULL,
            status TEXT NOT NULL CHECK (status IN ('pending', 'processing', 'done', 'failed')),
            retry_count INTEGER NOT NULL DEFAULT 0,
            error TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            UNIQUE(item_kind, item_id, embedding_version)
        );

        CREATE INDEX IF NOT EXISTS idx_outbox_status ON outbox(status, created_at);

        CREATE TABLE IF NOT EXISTS sync_positions (
            target_name TEXT PRIMARY KEY,
            last_event_cursor INTEGER NOT NULL,
            last_timestamp TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS working_set (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            event_id TEXT NOT NULL,
            added_at TEXT NOT NULL,
            relevance REAL NOT NULL,
            topics TEXT NOT NULL DEFAULT '[]',
            expires_at TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_working_set_expires ON working_set(expires_at);

        CREATE TABLE IF NOT EXISTS consolidated_memories (
            memory_id TEXT PRIMARY KEY,
            summary TEXT NOT NULL,
            topics TEXT NOT NULL DEFAULT '[]',
            source_events TEXT NOT NULL DEFAULT '[]',
            confidence REAL NOT NULL,
            created_at TEXT NOT NULL,
            accessed_at TEXT,
            access_count INTEGER NOT NULL DEFAULT 0
        );

        CREATE TABLE IF NOT EXISTS consolidated_rules (
            memory_id TEXT PRIMARY KEY,
            summary TEXT NOT NULL,
            topics TEXT NOT NULL DEFAULT '[]',
            source_events TEXT NOT NULL DEFAULT '[]',
            confidence REAL NOT NULL,
            promoted_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS helpfulness (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            event_id TEXT NOT NULL,
            session_id TEXT NOT NULL,
            retrieval_score REAL NOT NULL,
            query_preview TEXT NOT NULL,
            session_continued INTEGER,
            prompt_count_after INTEGER,
            tool_success_ratio REAL,
            was_reasked INTEGER,
            helpfulness_score REAL,
            measured_at TEXT
        );

        CREATE INDEX IF NOT EXISTS idx_helpfulness_session ON helpfulness(session_id, measured_at);
        "#,
    )?;

    create_fts_triggers(conn)?;

    conn.execute(&format!("PRAGMA user_version = {}", SCHEMA_VERSION), [])?;
    Ok(())
}

pub fn create_fts_triggers(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        CREATE TRIGGER IF NOT EXISTS events_ai AFTER INSERT ON events BEGIN
            INSERT INTO events_fts(rowid, content) VALUES (new.rowid, new.content);
        END;

        CREATE TRIGGER IF NOT EXISTS events_ad AFTER DELETE ON events BEGIN
            INSERT INTO events_fts(events_fts, rowid, content) VALUES('delete', old.rowid, old.content);
        END;

        CREATE TRIGGER IF NOT EXISTS events_au AFTER UPDATE ON events BEGIN
            INSERT INTO events_fts(events_fts, rowid, content) VALUES('delete', old.rowid, old.content);
            INSERT INTO events_fts(rowid, content) VALUES (new.rowid, new.content);
        END;
        "#,
    )?;
    Ok(())
}

pub fn drop_fts_triggers(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        DROP TRIGGER IF EXISTS events_ai;
        DROP TRIGGER IF EXISTS events_ad;
        DROP TRIGGER IF EXISTS events_au;
        "#,
    )?;
    Ok(())
}

pub fn rebuild_fts(conn: &Connection) -> Result<()> {
    conn.execute("INSERT INTO events_fts(events_fts) VALUES ('rebuild')", [])?;
    Ok(())
}
