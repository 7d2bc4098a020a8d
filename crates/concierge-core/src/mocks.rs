//! Minimal in-memory/logging stand-ins for the external collaborators
//! (§1: SMTP delivery, ticket DB, faculty directory all live outside this
//! core). Good enough to drive the orchestrator end-to-end in tests and in
//! a demo deployment without a real mail server or ticketing system wired
//! up yet.

use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use crate::collaborators::{
    EmailHistory, EmailSender, FacultyDirectory, FacultyRecord, SentEmail, TicketRecord, TicketStore,
};
use crate::error::Result;
use crate::types::{EmailDraft, TicketDraft};

/// Logs every send instead of calling SMTP, and remembers them for
/// `EmailHistory` queries.
#[derive(Default)]
pub struct LoggingEmailSender {
    sent: Mutex<Vec<SentEmail>>,
}

#[async_trait]
impl EmailSender for LoggingEmailSender {
    async fn send(&self, draft: &EmailDraft) -> Result<()> {
        info!(to = %draft.to, subject = %draft.subject, "email send (mock collaborator)");
        self.sent.lock().unwrap().push(SentEmail {
            to: draft.to.clone(),
            subject: draft.subject.clone(),
            sent_at: Utc::now(),
        });
        Ok(())
    }
}

#[async_trait]
impl EmailHistory for LoggingEmailSender {
    async fn recent_for_user(&self, _user_id: &str, limit: usize) -> Result<Vec<SentEmail>> {
        let sent = self.sent.lock().unwrap();
        Ok(sent.iter().rev().take(limit).cloned().collect())
    }
}

/// An in-memory ticket store. Real schema mechanics are out of scope (§1);
/// this exists to exercise the ticket flow and status handler end to end.
#[derive(Default)]
pub struct InMemoryTicketStore {
    tickets: Mutex<Vec<TicketRecord>>,
}

#[async_trait]
impl TicketStore for InMemoryTicketStore {
    async fn create(&self, draft: &TicketDraft, user_id: &str) -> Result<TicketRecord> {
        let record = TicketRecord {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            category: draft.category.clone(),
            sub_category: draft.sub_category.clone(),
            priority: draft.priority.clone(),
            status: "Open".to_string(),
            description: draft.description.clone(),
        };
        info!(ticket_id = %record.id, category = %record.category, "ticket created (mock collaborator)");
        self.tickets.lock().unwrap().push(record.clone());
        Ok(record)
    }

    async fn list_for_user(&self, user_id: &str) -> Result<Vec<TicketRecord>> {
        let tickets = self.tickets.lock().unwrap();
        Ok(tickets.iter().filter(|t| t.user_id == user_id).cloned().collect())
    }

    async fn close(&self, ticket_id: &str, user_id: &str) -> Result<bool> {
        let mut tickets = self.tickets.lock().unwrap();
        match tickets.iter_mut().find(|t| t.id == ticket_id && t.user_id == user_id) {
            Some(t) => {
                t.status = "Closed".to_string();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn close_all(&self, user_id: &str) -> Result<usize> {
        let mut tickets = self.tickets.lock().unwrap();
        let mut count = 0;
        for t in tickets.iter_mut() {
            if t.user_id == user_id && t.status != "Closed" {
                t.status = "Closed".to_string();
                count += 1;
            }
        }
        Ok(count)
    }
}

/// A small static faculty directory.
pub struct StaticFacultyDirectory {
    entries: Vec<FacultyRecord>,
}

impl StaticFacultyDirectory {
    pub fn new(entries: Vec<FacultyRecord>) -> Self {
        Self { entries }
    }
}

impl Default for StaticFacultyDirectory {
    fn default() -> Self {
        Self { entries: Vec::new() }
    }
}

#[async_trait]
impl FacultyDirectory for StaticFacultyDirectory {
    async fn search(&self, query: &str) -> Result<Vec<FacultyRecord>> {
        let q = query.to_lowercase();
        Ok(self
            .entries
            .iter()
            .filter(|f| {
                f.name.to_lowercase().contains(&q)
                    || f.department.to_lowercase().contains(&q)
            })
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn ticket_close_enforces_ownership() {
        let store = InMemoryTicketStore::default();
        let draft = TicketDraft {
            student_email: "s@college.edu".to_string(),
            category: "IT Support".to_string(),
            sub_category: "Wi-Fi / Internet".to_string(),
            priority: "Medium".to_string(),
            description: "wifi down".to_string(),
            attachments: vec![],
        };
        let record = store.create(&draft, "u1").await.unwrap();
        assert!(!store.close(&record.id, "u2").await.unwrap());
        assert!(store.close(&record.id, "u1").await.unwrap());
    }
}
