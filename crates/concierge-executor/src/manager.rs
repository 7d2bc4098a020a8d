use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use concierge_core::types::{ActionKind, PendingAction, SessionId, StudentProfile};
use concierge_core::{EmailSender, TicketStore};
use concierge_flowstore::FlowStore;
use concierge_governance::GovernanceService;
use sha2::{Digest, Sha256};
use tracing::{info, instrument};

use crate::error::Result;
use crate::types::ExecuteOutcome;

const FLOW_KEY: &str = "active";

/// Runs the confirmed side effect a flow handler staged in
/// `HandlerResponse::artifacts["pending_action"]` (§4.9): quota gate (with
/// the sensitive-ticket bypass), idempotency guard, the collaborator call
/// itself, and the usage/activity bookkeeping that only happens on success.
///
/// Grounded in `skynet-scheduler::engine::SchedulerEngine`'s "do the thing,
/// then record it" ordering — the counter only moves after the collaborator
/// call returns `Ok`, never before.
pub struct SideEffectExecutor {
    email_sender: Arc<dyn EmailSender>,
    ticket_store: Arc<dyn TicketStore>,
    governance: Arc<GovernanceService>,
    flow_store: Arc<FlowStore>,
    executed: Mutex<HashSet<String>>,
}

impl SideEffectExecutor {
    pub fn new(
        email_sender: Arc<dyn EmailSender>,
        ticket_store: Arc<dyn TicketStore>,
        governance: Arc<GovernanceService>,
        flow_store: Arc<FlowStore>,
    ) -> Self {
        Self {
            email_sender,
            ticket_store,
            governance,
            flow_store,
            executed: Mutex::new(HashSet::new()),
        }
    }

    /// Execute `pending` on behalf of `profile`. `sensitive` marks a ticket
    /// the ticket flow flagged via a sensitive keyword (§4.7.3); a sensitive
    /// ticket bypasses the daily quota so a harassment/ragging report is
    /// never blocked by an exhausted counter.
    #[instrument(skip(self, pending), fields(user_id = %profile.user_id, action = %pending.kind(), sensitive))]
    pub async fn execute(
        &self,
        session_id: &SessionId,
        profile: &StudentProfile,
        pending: PendingAction,
        sensitive: bool,
    ) -> Result<ExecuteOutcome> {
        let user_id = profile.user_id.as_str();
        let action = pending.kind();
        let fingerprint = fingerprint(user_id, &pending);

        if self.already_executed(&fingerprint) {
            info!(user_id, %action, "pending action already executed, skipping");
            return Ok(ExecuteOutcome::AlreadyExecuted);
        }

        let bypass_quota = sensitive && action == ActionKind::Ticket;
        if !bypass_quota {
            let check = self.governance.check_daily_limit(user_id, action);
            if !check.allowed {
                self.governance
                    .log_activity(user_id, "QUOTA_DENIED", &format!("{action} quota exhausted"))?;
                return Ok(ExecuteOutcome::QuotaExceeded {
                    remaining: check.remaining,
                    max_allowed: check.max_allowed,
                });
            }
        }

        let outcome = match pending {
            PendingAction::EmailPreview(draft) => {
                self.email_sender.send(&draft).await?;
                self.governance.increment_usage(user_id, ActionKind::Email)?;
                self.governance
                    .log_activity(user_id, "EMAIL_SENT", &format!("sent to {}", draft.to))?;
                ExecuteOutcome::EmailSent {
                    to: draft.to,
                    subject: draft.subject,
                }
            }
            PendingAction::TicketPreview(mut draft) => {
                draft.student_email = profile.email.clone();
                let ticket = self.ticket_store.create(&draft, user_id).await?;
                // A sensitive ticket bypassed the quota gate above; it must not
                // consume a counter slot either, or a student reporting
                // harassment would be silently charged against their own quota
                // (§8 S5: counter NOT incremented on the sensitive path).
                if !bypass_quota {
                    self.governance.increment_usage(user_id, ActionKind::Ticket)?;
                }
                self.governance
                    .log_activity(user_id, "TICKET_CREATED", &format!("ticket {}", ticket.id))?;
                ExecuteOutcome::TicketCreated { ticket }
            }
        };

        self.mark_executed(fingerprint);
        // The flow handler already cleared "active" at confirmation time;
        // this is a belt-and-suspenders clear so a side effect can never
        // leave stale flow state behind even if that earlier clear raced
        // with a concurrent resume (§4.9 step 4).
        self.flow_store.clear(session_id, FLOW_KEY);
        Ok(outcome)
    }

    fn already_executed(&self, fingerprint: &str) -> bool {
        self.executed.lock().unwrap().contains(fingerprint)
    }

    fn mark_executed(&self, fingerprint: String) {
        self.executed.lock().unwrap().insert(fingerprint);
    }
}

/// Identifies a pending action by its salient fields, independent of the
/// C5 whole-turn dedup cache (§9): re-confirming the same draft twice in one
/// session must not send two emails even if the turn-level cache already
/// expired.
fn fingerprint(user_id: &str, pending: &PendingAction) -> String {
    let salient = match pending {
        PendingAction::EmailPreview(d) => format!("email|{}|{}", d.to, truncate(&d.subject, 50)),
        PendingAction::TicketPreview(d) => format!("ticket|{}", truncate(&d.description, 50)),
    };
    let digest = Sha256::digest(format!("{user_id}|{salient}").as_bytes());
    hex::encode(digest)
}

fn truncate(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use concierge_core::types::{EmailDraft, TicketDraft, UserId};
    use concierge_core::mocks::{InMemoryTicketStore, LoggingEmailSender};
    use concierge_governance::GovernanceService;
    use rusqlite::Connection;

    fn test_executor() -> SideEffectExecutor {
        let conn = Connection::open_in_memory().unwrap();
        concierge_governance::db::init_db(&conn).unwrap();
        let governance = Arc::new(GovernanceService::new(conn, chrono_tz::Asia::Kolkata, 2, 2));
        SideEffectExecutor::new(
            Arc::new(LoggingEmailSender::default()),
            Arc::new(InMemoryTicketStore::default()),
            governance,
            Arc::new(FlowStore::new(30)),
        )
    }

    fn profile() -> StudentProfile {
        StudentProfile {
            user_id: UserId::from("u1"),
            email: "u1@college.edu".to_string(),
            name: Some("Asha".to_string()),
        }
    }

    fn sid() -> SessionId {
        SessionId::from("s1")
    }

    #[tokio::test]
    async fn sending_an_email_increments_usage() {
        let executor = test_executor();
        let draft = EmailDraft {
            to: "prof@college.edu".to_string(),
            to_name: None,
            subject: "Meeting".to_string(),
            body: "Hi".to_string(),
        };
        let outcome = executor
            .execute(&sid(), &profile(), PendingAction::EmailPreview(draft), false)
            .await
            .unwrap();
        assert!(outcome.succeeded());
        let limits = executor.governance.get_remaining_limits("u1");
        assert_eq!(limits.emails_remaining, 1);
    }

    #[tokio::test]
    async fn repeating_the_same_confirmed_draft_is_not_re_sent() {
        let executor = test_executor();
        let draft = EmailDraft {
            to: "prof@college.edu".to_string(),
            to_name: None,
            subject: "Meeting".to_string(),
            body: "Hi".to_string(),
        };
        executor
            .execute(&sid(), &profile(), PendingAction::EmailPreview(draft.clone()), false)
            .await
            .unwrap();
        let second = executor
            .execute(&sid(), &profile(), PendingAction::EmailPreview(draft), false)
            .await
            .unwrap();
        assert_eq!(second, ExecuteOutcome::AlreadyExecuted);
        let limits = executor.governance.get_remaining_limits("u1");
        assert_eq!(limits.emails_remaining, 1);
    }

    #[tokio::test]
    async fn exhausted_quota_blocks_without_sending() {
        let executor = test_executor();
        for i in 0..2 {
            let draft = EmailDraft {
                to: format!("prof{i}@college.edu"),
                to_name: None,
                subject: format!("Subject {i}"),
                body: "Hi".to_string(),
            };
            executor
                .execute(&sid(), &profile(), PendingAction::EmailPreview(draft), false)
                .await
                .unwrap();
        }
        let draft = EmailDraft {
            to: "other@college.edu".to_string(),
            to_name: None,
            subject: "Another".to_string(),
            body: "Hi".to_string(),
        };
        let outcome = executor
            .execute(&sid(), &profile(), PendingAction::EmailPreview(draft), false)
            .await
            .unwrap();
        assert!(matches!(outcome, ExecuteOutcome::QuotaExceeded { .. }));
    }

    #[tokio::test]
    async fn sensitive_ticket_bypasses_exhausted_quota() {
        let executor = test_executor();
        for i in 0..2 {
            let draft = TicketDraft {
                student_email: String::new(),
                category: "Other".to_string(),
                sub_category: "General".to_string(),
                priority: "Medium".to_string(),
                description: format!("issue {i}"),
                attachments: Vec::new(),
            };
            executor
                .execute(&sid(), &profile(), PendingAction::TicketPreview(draft), false)
                .await
                .unwrap();
        }
        let draft = TicketDraft {
            student_email: String::new(),
            category: "Student Grievance".to_string(),
            sub_category: "Harassment".to_string(),
            priority: "Urgent".to_string(),
            description: "reporting ragging incident".to_string(),
            attachments: Vec::new(),
        };
        let outcome = executor
            .execute(&sid(), &profile(), PendingAction::TicketPreview(draft), true)
            .await
            .unwrap();
        assert!(outcome.succeeded());
    }

    #[tokio::test]
    async fn sensitive_ticket_bypass_does_not_consume_quota() {
        let executor = test_executor();
        let draft = TicketDraft {
            student_email: String::new(),
            category: "Student Grievance".to_string(),
            sub_category: "Harassment".to_string(),
            priority: "Urgent".to_string(),
            description: "reporting ragging incident".to_string(),
            attachments: Vec::new(),
        };
        executor
            .execute(&sid(), &profile(), PendingAction::TicketPreview(draft), true)
            .await
            .unwrap();
        let limits = executor.governance.get_remaining_limits("u1");
        assert_eq!(limits.tickets_remaining, 2, "sensitive-path ticket must not consume quota");
    }

    #[tokio::test]
    async fn ticket_draft_student_email_is_filled_from_profile() {
        let executor = test_executor();
        let draft = TicketDraft {
            student_email: String::new(),
            category: "Other".to_string(),
            sub_category: "General".to_string(),
            priority: "Medium".to_string(),
            description: "wifi is down".to_string(),
            attachments: Vec::new(),
        };
        let outcome = executor
            .execute(&sid(), &profile(), PendingAction::TicketPreview(draft), false)
            .await
            .unwrap();
        match outcome {
            ExecuteOutcome::TicketCreated { ticket } => assert_eq!(ticket.user_id, "u1"),
            other => panic!("unexpected outcome: {other:?}"),
        }
    }
}
