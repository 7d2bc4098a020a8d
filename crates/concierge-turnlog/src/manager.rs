use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;

use tracing::error;

use crate::types::TurnLogRecord;

/// Append-only newline-delimited-JSON turn log. A write failure is logged
/// and swallowed, never propagated to the caller — the teacher's posture
/// (`SchedulerEngine::tick` logs and carries on) applied to "never fail a
/// student's turn because the audit log couldn't be written" (§5.11).
pub struct TurnLog {
    file: Mutex<File>,
}

impl TurnLog {
    pub fn open(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self { file: Mutex::new(file) })
    }

    /// Append `record`. Never returns an error; a serialization or write
    /// failure is logged and dropped.
    pub fn append(&self, record: &TurnLogRecord) {
        let line = match serde_json::to_string(record) {
            Ok(line) => line,
            Err(e) => {
                error!(error = %e, "failed to serialize turn log record, dropping");
                return;
            }
        };
        let mut file = self.file.lock().unwrap();
        if let Err(e) = writeln!(file, "{line}") {
            error!(error = %e, "failed to append turn log record, dropping");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn sample(turn_id: &str) -> TurnLogRecord {
        TurnLogRecord {
            turn_id: turn_id.to_string(),
            user_id: "u1".to_string(),
            session_id: "s1".to_string(),
            timestamp: Utc::now(),
            intent: "FAQ".to_string(),
            confidence: 0.9,
            agent: "faq".to_string(),
            side_effects: Vec::new(),
            duration_ms: 12,
        }
    }

    #[test]
    fn appended_records_round_trip_as_one_line_per_record() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("turns.jsonl");
        let log = TurnLog::open(&path).unwrap();
        log.append(&sample("t1"));
        log.append(&sample("t2"));

        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 2);
        let parsed: TurnLogRecord = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(parsed.turn_id, "t1");
    }

    #[test]
    fn reopening_the_same_path_appends_rather_than_truncates() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("turns.jsonl");
        TurnLog::open(&path).unwrap().append(&sample("t1"));
        TurnLog::open(&path).unwrap().append(&sample("t2"));

        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents.lines().count(), 2);
    }
}
