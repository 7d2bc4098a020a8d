use std::sync::Mutex;

use chrono::Utc;
use rusqlite::Connection;
use tracing::{info, instrument};

use crate::chunker;
use crate::error::Result;
use crate::types::Chunk;
use crate::vectorizer::{cosine_similarity, vectorize};

/// Vector index over the policy corpus. Grounded in `skynet-memory`'s
/// FTS5 store-and-reload shape and `original_source/agents/vector_store.py`'s
/// chunking contract; see [`crate::vectorizer`] for why embeddings are a
/// hashing bag-of-words vector rather than a real embedding-model call.
pub struct RetrievalEngine {
    db: Mutex<Connection>,
}

impl RetrievalEngine {
    pub fn new(conn: Connection) -> Self {
        Self { db: Mutex::new(conn) }
    }

    /// Split `text` and persist its chunks+vectors under `source`, replacing
    /// any prior chunks for that source. Safe to call once at startup; a
    /// restart that finds existing rows for `source` should skip re-indexing
    /// (callers check `is_indexed` first) so embeddings are never recomputed
    /// needlessly.
    #[instrument(skip(self, text), fields(source, chunk_size, overlap))]
    pub fn index_corpus(&self, source: &str, text: &str, chunk_size: usize, overlap: usize) -> Result<usize> {
        let chunks = chunker::split(text, chunk_size, overlap);
        let db = self.db.lock().unwrap();
        db.execute("DELETE FROM corpus_chunks WHERE source = ?1", [source])?;
        let now = Utc::now().to_rfc3339();
        for (i, chunk_text) in chunks.iter().enumerate() {
            let vector = vectorize(chunk_text);
            let vector_json = serde_json::to_string(&vector)?;
            db.execute(
                "INSERT INTO corpus_chunks (source, chunk_index, text, vector, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                rusqlite::params![source, i as i64, chunk_text, vector_json, now],
            )?;
        }
        info!(source, chunks = chunks.len(), "indexed corpus");
        Ok(chunks.len())
    }

    /// True if `source` already has indexed chunks — lets callers skip
    /// re-indexing (and re-embedding) on every process restart.
    pub fn is_indexed(&self, source: &str) -> bool {
        let db = self.db.lock().unwrap();
        db.query_row(
            "SELECT 1 FROM corpus_chunks WHERE source = ?1 LIMIT 1",
            [source],
            |_| Ok(()),
        )
        .is_ok()
    }

    /// Return the `k` nearest chunks to `query` by cosine similarity across
    /// the whole indexed corpus.
    #[instrument(skip(self, query), fields(k))]
    pub fn retrieve(&self, query: &str, k: usize) -> Result<Vec<Chunk>> {
        let query_vector = vectorize(query);
        let db = self.db.lock().unwrap();
        let mut stmt = db.prepare("SELECT source, text, vector FROM corpus_chunks")?;
        let rows = stmt.query_map([], |row| {
            let source: String = row.get(0)?;
            let text: String = row.get(1)?;
            let vector_json: String = row.get(2)?;
            Ok((source, text, vector_json))
        })?;

        let mut scored: Vec<Chunk> = Vec::new();
        for row in rows.filter_map(|r| r.ok()) {
            let (source, text, vector_json) = row;
            let vector: Vec<f32> = match serde_json::from_str(&vector_json) {
                Ok(v) => v,
                Err(_) => continue,
            };
            let score = cosine_similarity(&query_vector, &vector);
            scored.push(Chunk { text, source, score });
        }

        scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(k);
        Ok(scored)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine() -> RetrievalEngine {
        let conn = Connection::open_in_memory().unwrap();
        crate::db::init_db(&conn).unwrap();
        RetrievalEngine::new(conn)
    }

    #[test]
    fn retrieve_returns_most_similar_chunks_first() {
        let e = engine();
        e.index_corpus(
            "college_rules.txt",
            "Attendance must be at least 75 percent to sit the final exam. \
             The library is open from 8am to 10pm on weekdays.",
            60,
            10,
        )
        .unwrap();

        let results = e.retrieve("what is the minimum attendance percentage", 1).unwrap();
        assert_eq!(results.len(), 1);
        assert!(results[0].text.to_lowercase().contains("attendance"));
    }

    #[test]
    fn reindexing_a_source_replaces_its_chunks() {
        let e = engine();
        e.index_corpus("a.txt", "first version of the text", 500, 50).unwrap();
        e.index_corpus("a.txt", "second version entirely", 500, 50).unwrap();
        let all = e.retrieve("version", 10).unwrap();
        assert_eq!(all.len(), 1);
        assert!(all[0].text.contains("second"));
    }

    #[test]
    fn is_indexed_reflects_presence_of_chunks() {
        let e = engine();
        assert!(!e.is_indexed("college_rules.txt"));
        e.index_corpus("college_rules.txt", "some policy text here", 500, 50).unwrap();
        assert!(e.is_indexed("college_rules.txt"));
    }
}
