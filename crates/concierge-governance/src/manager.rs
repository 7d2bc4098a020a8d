use std::sync::Mutex;

use chrono::Utc;
use concierge_core::{civil_day, ActionKind};
use rusqlite::Connection;
use tracing::{instrument, warn};

use crate::error::Result;
use crate::types::{usage_column, LimitCheck, RemainingLimits};

/// Known activity-log event types. `log_activity` accepts any string but
/// warns when it isn't one of these, per §4.4.
pub const KNOWN_ACTIVITY_TYPES: &[&str] = &[
    "EMAIL_SENT",
    "TICKET_CREATED",
    "QUOTA_DENIED",
    "DUPLICATE_BLOCKED",
    "SESSION_TIMEOUT",
    "ACTION_CANCELLED",
];

/// Daily per-user quota counters and an append-only activity log.
///
/// Grounded in `skynet-scheduler::engine::SchedulerEngine`'s single
/// `Mutex<Connection>` plus `original_source/services/limits_service.py`'s
/// `BEGIN IMMEDIATE` upsert for serializing concurrent increments on the
/// same `(user_id, usage_date)` row.
pub struct GovernanceService {
    db: Mutex<Connection>,
    tz: chrono_tz::Tz,
    email_max: u32,
    ticket_max: u32,
}

impl GovernanceService {
    pub fn new(conn: Connection, tz: chrono_tz::Tz, email_max: u32, ticket_max: u32) -> Self {
        Self {
            db: Mutex::new(conn),
            tz,
            email_max,
            ticket_max,
        }
    }

    fn today(&self) -> String {
        civil_day(self.tz, Utc::now()).to_string()
    }

    /// Check remaining quota for `action`. Fails open (allows, remaining=1)
    /// on a counter-read error — never blocks a student on a storage hiccup.
    #[instrument(skip(self), fields(user_id, action = %action))]
    pub fn check_daily_limit(&self, user_id: &str, action: ActionKind) -> LimitCheck {
        let max_allowed = match action {
            ActionKind::Email => self.email_max,
            ActionKind::Ticket => self.ticket_max,
        };
        let col = usage_column(action);
        let today = self.today();

        let used: rusqlite::Result<u32> = {
            let db = self.db.lock().unwrap();
            db.query_row(
                &format!("SELECT {col} FROM daily_usage WHERE user_id = ?1 AND usage_date = ?2"),
                rusqlite::params![user_id, today],
                |row| row.get(0),
            )
            .or_else(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => Ok(0),
                other => Err(other),
            })
        };

        match used {
            Ok(used) => LimitCheck {
                allowed: used < max_allowed,
                remaining: max_allowed.saturating_sub(used),
                max_allowed,
            },
            Err(e) => {
                warn!(user_id, %action, error = %e, "quota read failed, failing open");
                LimitCheck {
                    allowed: true,
                    remaining: 1,
                    max_allowed,
                }
            }
        }
    }

    /// Atomically increment today's counter for `action`. Serialized via
    /// `BEGIN IMMEDIATE` so concurrent increments for the same row never
    /// lose a count.
    #[instrument(skip(self), fields(user_id, action = %action))]
    pub fn increment_usage(&self, user_id: &str, action: ActionKind) -> Result<()> {
        let col = usage_column(action);
        let today = self.today();
        let db = self.db.lock().unwrap();

        db.execute_batch("BEGIN IMMEDIATE")?;
        let result = db.execute(
            &format!(
                "INSERT INTO daily_usage (user_id, usage_date, {col}) VALUES (?1, ?2, 1)
                 ON CONFLICT(user_id, usage_date) DO UPDATE SET {col} = {col} + 1"
            ),
            rusqlite::params![user_id, today],
        );
        match result {
            Ok(_) => {
                db.execute_batch("COMMIT")?;
                Ok(())
            }
            Err(e) => {
                let _ = db.execute_batch("ROLLBACK");
                Err(e.into())
            }
        }
    }

    /// All remaining limits for today, for "how many do I have left" queries.
    /// Fails open to the full allowance on a read error.
    #[instrument(skip(self), fields(user_id))]
    pub fn get_remaining_limits(&self, user_id: &str) -> RemainingLimits {
        let today = self.today();
        let db = self.db.lock().unwrap();
        let row: rusqlite::Result<(u32, u32)> = db
            .query_row(
                "SELECT emails_sent, tickets_created FROM daily_usage
                 WHERE user_id = ?1 AND usage_date = ?2",
                rusqlite::params![user_id, today],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .or_else(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => Ok((0, 0)),
                other => Err(other),
            });

        match row {
            Ok((emails_used, tickets_used)) => RemainingLimits {
                emails_remaining: self.email_max.saturating_sub(emails_used),
                emails_max: self.email_max,
                tickets_remaining: self.ticket_max.saturating_sub(tickets_used),
                tickets_max: self.ticket_max,
            },
            Err(e) => {
                warn!(user_id, error = %e, "remaining-limits read failed, returning full allowance");
                RemainingLimits {
                    emails_remaining: self.email_max,
                    emails_max: self.email_max,
                    tickets_remaining: self.ticket_max,
                    tickets_max: self.ticket_max,
                }
            }
        }
    }

    /// Append an activity-log entry. Unknown `event_type`s are accepted but
    /// logged with a warning.
    #[instrument(skip(self, description), fields(user_id, event_type))]
    pub fn log_activity(&self, user_id: &str, event_type: &str, description: &str) -> Result<()> {
        if !KNOWN_ACTIVITY_TYPES.contains(&event_type) {
            warn!(user_id, event_type, "logging unrecognised activity type");
        }
        let db = self.db.lock().unwrap();
        db.execute(
            "INSERT INTO activity_log (user_id, event_type, description, created_at)
             VALUES (?1, ?2, ?3, ?4)",
            rusqlite::params![user_id, event_type, description, Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::Connection;

    fn test_service() -> GovernanceService {
        let conn = Connection::open_in_memory().unwrap();
        crate::db::init_db(&conn).unwrap();
        GovernanceService::new(conn, chrono_tz::Asia::Kolkata, 5, 3)
    }

    #[test]
    fn fresh_user_has_full_quota() {
        let svc = test_service();
        let check = svc.check_daily_limit("u1", ActionKind::Email);
        assert!(check.allowed);
        assert_eq!(check.remaining, 5);
        assert_eq!(check.max_allowed, 5);
    }

    #[test]
    fn increment_decreases_remaining_and_blocks_at_max() {
        let svc = test_service();
        for _ in 0..3 {
            svc.increment_usage("u1", ActionKind::Ticket).unwrap();
        }
        let check = svc.check_daily_limit("u1", ActionKind::Ticket);
        assert!(!check.allowed);
        assert_eq!(check.remaining, 0);
    }

    #[test]
    fn email_and_ticket_counters_are_independent() {
        let svc = test_service();
        svc.increment_usage("u1", ActionKind::Email).unwrap();
        let limits = svc.get_remaining_limits("u1");
        assert_eq!(limits.emails_remaining, 4);
        assert_eq!(limits.tickets_remaining, 3);
    }

    #[test]
    fn log_activity_accepts_unknown_type() {
        let svc = test_service();
        svc.log_activity("u1", "SOMETHING_NEW", "test").unwrap();
    }
}
