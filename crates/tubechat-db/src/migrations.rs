use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);")?;

    let version: i64 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_version",
        [],
        |r| r.get(0),
    )?;

    if version < 1 {
        info!("Running migration v1 (initial schema)");
        conn.execute_batch(
            "
            CREATE TABLE users (
                user_id         TEXT PRIMARY KEY,
                name            TEXT NOT NULL,
                email           TEXT NOT NULL UNIQUE,
                password_hash   TEXT NOT NULL,
                age             INTEGER,
                gender          TEXT CHECK (gender IN ('male', 'female', 'other')),
                birth_date      TEXT,
                is_admin        INTEGER NOT NULL DEFAULT 0,
                created_at      TEXT NOT NULL
            );

            CREATE TABLE transcripts (
                transcript_id   TEXT PRIMARY KEY,
                video_url       TEXT NOT NULL UNIQUE,
                transcript_text TEXT,
                language        TEXT,
                duration        REAL,
                created_at      TEXT NOT NULL
            );

            CREATE TABLE chats (
                chat_id         TEXT PRIMARY KEY,
                user_id         TEXT NOT NULL REFERENCES users(user_id) ON DELETE CASCADE,
                transcript_id   TEXT REFERENCES transcripts(transcript_id) ON DELETE SET NULL,
                created_at      TEXT NOT NULL
            );

            CREATE INDEX idx_chats_user ON chats(user_id, created_at);
            CREATE INDEX idx_chats_transcript ON chats(transcript_id);

            CREATE TABLE messages (
                message_id      TEXT PRIMARY KEY,
                chat_id         TEXT NOT NULL REFERENCES chats(chat_id) ON DELETE CASCADE,
                sender          TEXT NOT NULL CHECK (sender IN ('user', 'system', 'llm')),
                message_text    TEXT NOT NULL,
                created_at      TEXT NOT NULL
            );

            CREATE INDEX idx_messages_chat ON messages(chat_id, created_at);

            INSERT INTO schema_version (version) VALUES (1);
            ",
        )?;
    }

    info!("Database migrations complete");
    Ok(())
}
