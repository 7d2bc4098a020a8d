use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

/// Opaque tenant key. Every read that returns user data must take this as an
/// argument and filter on it — see the tenant-isolation invariant.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(pub String);

impl UserId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for UserId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for UserId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Opaque session key tying together a contiguous conversation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub String);

impl SessionId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for SessionId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for SessionId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Role of a persisted conversation message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageRole {
    User,
    Bot,
    /// Never persisted — `save_message` silently drops these (§4.2).
    System,
}

impl fmt::Display for MessageRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageRole::User => write!(f, "user"),
            MessageRole::Bot => write!(f, "bot"),
            MessageRole::System => write!(f, "system"),
        }
    }
}

impl std::str::FromStr for MessageRole {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Self::User),
            "bot" => Ok(Self::Bot),
            "system" => Ok(Self::System),
            other => Err(format!("unknown message role: {other}")),
        }
    }
}

/// The closed set of intents the classifier may emit (§4.6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    Faq,
    Email,
    Ticket,
    TicketStatus,
    Greeting,
    Unknown,
}

impl Intent {
    pub fn as_str(&self) -> &'static str {
        match self {
            Intent::Faq => "FAQ",
            Intent::Email => "EMAIL",
            Intent::Ticket => "TICKET",
            Intent::TicketStatus => "TICKET_STATUS",
            Intent::Greeting => "GREETING",
            Intent::Unknown => "UNKNOWN",
        }
    }

    /// The confidence below which the orchestrator asks for clarification,
    /// unless entities were extracted for EMAIL/TICKET (§4.6).
    pub fn confidence_threshold(&self) -> f64 {
        match self {
            Intent::Faq => 0.45,
            Intent::Email => 0.65,
            Intent::Ticket => 0.65,
            Intent::TicketStatus => 0.50,
            Intent::Greeting => 0.30,
            Intent::Unknown => 1.0,
        }
    }
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Intent {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "FAQ" => Ok(Self::Faq),
            "EMAIL" => Ok(Self::Email),
            "TICKET" => Ok(Self::Ticket),
            "TICKET_STATUS" => Ok(Self::TicketStatus),
            "GREETING" => Ok(Self::Greeting),
            "UNKNOWN" => Ok(Self::Unknown),
            other => Err(format!("unknown intent: {other}")),
        }
    }
}

/// The two quota-gated, idempotency-gated side-effect kinds (§4.4, §4.9).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    Email,
    Ticket,
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActionKind::Email => write!(f, "email"),
            ActionKind::Ticket => write!(f, "ticket"),
        }
    }
}

/// A fully composed email draft. Exists only inside a flow state or an
/// action envelope — never persisted on its own.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailDraft {
    pub to: String,
    pub to_name: Option<String>,
    pub subject: String,
    pub body: String,
}

/// A fully composed ticket draft.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketDraft {
    pub student_email: String,
    pub category: String,
    pub sub_category: String,
    pub priority: String,
    pub description: String,
    #[serde(default)]
    pub attachments: Vec<String>,
}

/// A student identity as handed to the core by the (out-of-scope) HTTP
/// layer. Auth/registration/profile CRUD live outside this crate (§1).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StudentProfile {
    pub user_id: UserId,
    pub email: String,
    pub name: Option<String>,
}

/// A side effect a flow handler has decided to run, carried in
/// `HandlerResponse::artifacts["pending_action"]` for the orchestrator to
/// hand to the executor (§4.9). `email_preview`/`ticket_preview` are the
/// action names the executor contract uses for an already-confirmed draft.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum PendingAction {
    EmailPreview(EmailDraft),
    TicketPreview(TicketDraft),
}

impl PendingAction {
    pub fn kind(&self) -> ActionKind {
        match self {
            PendingAction::EmailPreview(_) => ActionKind::Email,
            PendingAction::TicketPreview(_) => ActionKind::Ticket,
        }
    }
}

/// Civil day (date string) in the configured fixed timezone — used for
/// quota rollover (§4.4, glossary "Civil day").
pub fn civil_day(tz: Tz, now: DateTime<Utc>) -> NaiveDate {
    now.with_timezone(&tz).date_naive()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn civil_day_rolls_over_at_kolkata_midnight_not_utc_midnight() {
        let ist = chrono_tz::Asia::Kolkata;
        // 2026-07-28 19:00 UTC = 2026-07-29 00:30 IST (IST is UTC+5:30)
        let just_after_ist_midnight = Utc.with_ymd_and_hms(2026, 7, 28, 19, 0, 0).unwrap();
        let day = civil_day(ist, just_after_ist_midnight);
        assert_eq!(day, NaiveDate::from_ymd_opt(2026, 7, 29).unwrap());

        let just_before_ist_midnight = Utc.with_ymd_and_hms(2026, 7, 28, 18, 0, 0).unwrap();
        let prev_day = civil_day(ist, just_before_ist_midnight);
        assert_eq!(prev_day, NaiveDate::from_ymd_opt(2026, 7, 28).unwrap());
    }

    #[test]
    fn intent_roundtrips_through_display_and_fromstr() {
        for intent in [
            Intent::Faq,
            Intent::Email,
            Intent::Ticket,
            Intent::TicketStatus,
            Intent::Greeting,
            Intent::Unknown,
        ] {
            let s = intent.to_string();
            let parsed: Intent = s.parse().unwrap();
            assert_eq!(parsed, intent);
        }
    }
}
