//! Traits for the external systems this spec treats as black boxes: SMTP
//! delivery, the ticket database, and the faculty directory. §1 scopes the
//! HTTP surface, auth, and the actual ticket-DB schema out of this core —
//! these traits are the narrow interface the core exchanges with them.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::types::{EmailDraft, TicketDraft};

/// Delivers an email. SMTP mechanics are out of scope (§1); this is the
/// seam the executor calls through.
#[async_trait]
pub trait EmailSender: Send + Sync {
    async fn send(&self, draft: &EmailDraft) -> Result<()>;
}

/// A previously sent email, for the FAQ handler's email-history queries.
#[derive(Debug, Clone)]
pub struct SentEmail {
    pub to: String,
    pub subject: String,
    pub sent_at: DateTime<Utc>,
}

/// Read access to a user's sent-email history. Implementations typically
/// layer over the same store `EmailSender::send` writes to.
#[async_trait]
pub trait EmailHistory: Send + Sync {
    async fn recent_for_user(&self, user_id: &str, limit: usize) -> Result<Vec<SentEmail>>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TicketRecord {
    pub id: String,
    pub user_id: String,
    pub category: String,
    pub sub_category: String,
    pub priority: String,
    pub status: String,
    pub description: String,
}

/// Ticket persistence. Schema mechanics live outside this core (§1); this
/// trait is the contract the ticket flow and executor call through.
#[async_trait]
pub trait TicketStore: Send + Sync {
    async fn create(&self, draft: &TicketDraft, user_id: &str) -> Result<TicketRecord>;
    async fn list_for_user(&self, user_id: &str) -> Result<Vec<TicketRecord>>;
    /// Closes a ticket, enforcing that `user_id` owns it. Returns `Ok(false)`
    /// if the ticket doesn't exist or isn't owned by `user_id`.
    async fn close(&self, ticket_id: &str, user_id: &str) -> Result<bool>;
    /// Closes every open ticket owned by `user_id`; returns the count closed.
    async fn close_all(&self, user_id: &str) -> Result<usize>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FacultyRecord {
    pub name: String,
    pub email: String,
    pub department: String,
}

/// The structured faculty directory the FAQ handler and email flow's
/// faculty-search step query.
#[async_trait]
pub trait FacultyDirectory: Send + Sync {
    async fn search(&self, query: &str) -> Result<Vec<FacultyRecord>>;
}
