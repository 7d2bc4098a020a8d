use rusqlite::{Connection, Result};

/// Initialise the chat-memory tables. Safe to call on every startup.
pub fn init_db(conn: &Connection) -> Result<()> {
    create_messages_table(conn)?;
    create_fts_index(conn)?;
    Ok(())
}

fn create_messages_table(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS chat_messages (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id     TEXT NOT NULL,
            session_id  TEXT NOT NULL,
            role        TEXT NOT NULL,
            content     TEXT NOT NULL,
            intent      TEXT,
            agent       TEXT,
            metadata    TEXT,
            created_at  TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_chat_session
            ON chat_messages(session_id, user_id, created_at);
        CREATE INDEX IF NOT EXISTS idx_chat_user
            ON chat_messages(user_id, created_at DESC);",
    )
}

/// FTS5 virtual table for `search_conversation`. content='' makes this an
/// external-content table — synced manually on write, mirroring the
/// teacher's `user_memory_fts` pattern.
fn create_fts_index(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE VIRTUAL TABLE IF NOT EXISTS chat_messages_fts
            USING fts5(content, content='chat_messages', content_rowid='id');",
    )
}
