use std::sync::Mutex;

use chrono::Utc;
use concierge_core::MessageRole;
use rusqlite::Connection;
use tracing::{debug, instrument};

use crate::error::Result;
use crate::types::{ChatMessage, CONTEXT_LINE_MAX_CHARS};

/// Sentinel returned by `get_user_context` when a session has no history.
pub const EMPTY_CONTEXT: &str = "";

/// Append-only per-(user, session) chat log with tenant isolation.
///
/// Grounded directly on `skynet-memory::manager::MemoryManager` — a single
/// `Mutex<Connection>`, no separate cache layer (rendered context here is
/// cheap enough to recompute per call, unlike the teacher's heavier
/// memory-graph rendering).
pub struct MemoryStore {
    db: Mutex<Connection>,
}

impl MemoryStore {
    pub fn new(conn: Connection) -> Self {
        Self { db: Mutex::new(conn) }
    }

    /// Append a message. Silently drops empty/whitespace-only content or
    /// `role = system` — callers MUST NOT treat this as an error (§4.2).
    #[instrument(skip(self, content, metadata), fields(user_id, session_id, role = %role))]
    pub fn save_message(
        &self,
        user_id: &str,
        session_id: &str,
        role: MessageRole,
        content: &str,
        intent: Option<&str>,
        agent: Option<&str>,
        metadata: Option<&serde_json::Value>,
    ) -> Result<()> {
        if content.trim().is_empty() || matches!(role, MessageRole::System) {
            debug!(user_id, session_id, "dropping message: empty content or system role");
            return Ok(());
        }

        let db = self.db.lock().unwrap();
        let now = Utc::now().to_rfc3339();
        let role_str = role.to_string();
        let meta_str = metadata.map(|m| m.to_string());

        db.execute(
            "INSERT INTO chat_messages
             (user_id, session_id, role, content, intent, agent, metadata, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            rusqlite::params![user_id, session_id, role_str, content, intent, agent, meta_str, now],
        )?;
        let id = db.last_insert_rowid();
        db.execute(
            "INSERT INTO chat_messages_fts(rowid, content) VALUES (?1, ?2)",
            rusqlite::params![id, content],
        )?;
        Ok(())
    }

    /// Most recent `limit` messages for `session_id` owned by `user_id`,
    /// returned oldest-first.
    #[instrument(skip(self), fields(user_id, session_id, limit))]
    pub fn get_session_history(
        &self,
        session_id: &str,
        user_id: &str,
        limit: usize,
    ) -> Result<Vec<ChatMessage>> {
        let db = self.db.lock().unwrap();
        let mut stmt = db.prepare(
            "SELECT id, user_id, session_id, role, content, intent, agent, metadata, created_at
             FROM chat_messages
             WHERE session_id = ?1 AND user_id = ?2
             ORDER BY created_at DESC, id DESC
             LIMIT ?3",
        )?;
        let rows = stmt.query_map(rusqlite::params![session_id, user_id, limit as i64], row_to_message)?;
        let mut msgs: Vec<ChatMessage> = rows.filter_map(|r| r.ok()).collect();
        msgs.reverse();
        Ok(msgs)
    }

    /// Render the last `max_messages` turns into a single prompt-ready
    /// string, one line per message, each truncated to
    /// `CONTEXT_LINE_MAX_CHARS`. Returns [`EMPTY_CONTEXT`] if there is no
    /// history.
    #[instrument(skip(self), fields(user_id, session_id, max_messages))]
    pub fn get_user_context(
        &self,
        user_id: &str,
        session_id: &str,
        max_messages: usize,
    ) -> Result<String> {
        let history = self.get_session_history(session_id, user_id, max_messages)?;
        if history.is_empty() {
            return Ok(EMPTY_CONTEXT.to_string());
        }

        let mut out = String::new();
        for msg in &history {
            let speaker = match msg.role {
                MessageRole::User => "Student",
                MessageRole::Bot => "Assistant",
                MessageRole::System => continue,
            };
            let line = format!("{speaker}: {}", msg.content);
            // char-safe: `content` is arbitrary student free text and may
            // contain multi-byte UTF-8, so a byte-offset `String::truncate`
            // would panic if CONTEXT_LINE_MAX_CHARS landed mid-character.
            let line: String = line.chars().take(CONTEXT_LINE_MAX_CHARS).collect();
            out.push_str(&line);
            out.push('\n');
        }
        Ok(out)
    }

    /// User-scoped keyword search over message content.
    #[instrument(skip(self, query), fields(user_id, limit))]
    pub fn search_conversation(&self, user_id: &str, query: &str, limit: usize) -> Result<Vec<ChatMessage>> {
        let db = self.db.lock().unwrap();
        let mut stmt = db.prepare(
            "SELECT m.id, m.user_id, m.session_id, m.role, m.content, m.intent, m.agent,
                    m.metadata, m.created_at
             FROM chat_messages m
             JOIN chat_messages_fts f ON m.id = f.rowid
             WHERE m.user_id = ?1 AND chat_messages_fts MATCH ?2
             ORDER BY rank
             LIMIT ?3",
        )?;
        let rows = stmt.query_map(rusqlite::params![user_id, query, limit as i64], row_to_message)?;
        Ok(rows.filter_map(|r| r.ok()).collect())
    }

    /// Delete all messages owned by `user_id` in `session_id`.
    #[instrument(skip(self), fields(user_id, session_id))]
    pub fn delete_session(&self, session_id: &str, user_id: &str) -> Result<usize> {
        let db = self.db.lock().unwrap();
        let ids: Vec<i64> = {
            let mut stmt = db.prepare(
                "SELECT id FROM chat_messages WHERE session_id = ?1 AND user_id = ?2",
            )?;
            let rows = stmt.query_map(rusqlite::params![session_id, user_id], |r| r.get(0))?;
            rows.filter_map(|r| r.ok()).collect()
        };
        for id in &ids {
            db.execute(
                "INSERT INTO chat_messages_fts(chat_messages_fts, rowid, content) VALUES('delete', ?1, '')",
                rusqlite::params![id],
            )?;
        }
        let deleted = db.execute(
            "DELETE FROM chat_messages WHERE session_id = ?1 AND user_id = ?2",
            rusqlite::params![session_id, user_id],
        )?;
        Ok(deleted)
    }
}

fn row_to_message(row: &rusqlite::Row<'_>) -> rusqlite::Result<ChatMessage> {
    let role_str: String = row.get(3)?;
    let meta_str: Option<String> = row.get(7)?;
    Ok(ChatMessage {
        id: row.get(0)?,
        user_id: row.get(1)?,
        session_id: row.get(2)?,
        role: role_str.parse().unwrap_or(MessageRole::User),
        content: row.get(4)?,
        intent: row.get(5)?,
        agent: row.get(6)?,
        metadata: meta_str.and_then(|s| serde_json::from_str(&s).ok()),
        created_at: row.get::<_, String>(8)?.parse().unwrap_or_else(|_| Utc::now()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::Connection;

    fn test_store() -> MemoryStore {
        let conn = Connection::open_in_memory().unwrap();
        crate::db::init_db(&conn).unwrap();
        MemoryStore::new(conn)
    }

    #[test]
    fn save_message_drops_empty_content_and_system_role() {
        let store = test_store();
        store.save_message("u1", "s1", MessageRole::User, "   ", None, None, None).unwrap();
        store.save_message("u1", "s1", MessageRole::System, "hi", None, None, None).unwrap();
        let history = store.get_session_history("s1", "u1", 10).unwrap();
        assert!(history.is_empty());
    }

    #[test]
    fn history_is_chronological_and_scoped_to_user_and_session() {
        let store = test_store();
        store.save_message("u1", "s1", MessageRole::User, "first", None, None, None).unwrap();
        store.save_message("u1", "s1", MessageRole::Bot, "second", None, None, None).unwrap();
        store.save_message("u2", "s1", MessageRole::User, "other user", None, None, None).unwrap();

        let history = store.get_session_history("s1", "u1", 10).unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].content, "first");
        assert_eq!(history[1].content, "second");
    }

    #[test]
    fn user_context_is_empty_sentinel_when_no_history() {
        let store = test_store();
        let ctx = store.get_user_context("u1", "s1", 10).unwrap();
        assert_eq!(ctx, EMPTY_CONTEXT);
    }

    #[test]
    fn user_context_truncates_long_lines() {
        let store = test_store();
        let long = "x".repeat(500);
        store.save_message("u1", "s1", MessageRole::User, &long, None, None, None).unwrap();
        let ctx = store.get_user_context("u1", "s1", 10).unwrap();
        let line = ctx.lines().next().unwrap();
        assert_eq!(line.len(), CONTEXT_LINE_MAX_CHARS);
    }

    #[test]
    fn delete_session_only_removes_owning_user() {
        let store = test_store();
        store.save_message("u1", "s1", MessageRole::User, "mine", None, None, None).unwrap();
        store.save_message("u2", "s1", MessageRole::User, "theirs", None, None, None).unwrap();
        let deleted = store.delete_session("s1", "u1").unwrap();
        assert_eq!(deleted, 1);
        assert!(store.get_session_history("s1", "u1", 10).unwrap().is_empty());
        assert_eq!(store.get_session_history("s1", "u2", 10).unwrap().len(), 1);
    }
}
