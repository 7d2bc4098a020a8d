use concierge_core::TicketRecord;

/// What happened when a pending action was handed to the executor (§4.9).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecuteOutcome {
    EmailSent { to: String, subject: String },
    TicketCreated { ticket: TicketRecord },
    /// The daily quota for this action is exhausted; nothing was sent and no
    /// counter was touched.
    QuotaExceeded { remaining: u32, max_allowed: u32 },
    /// This exact action was already executed earlier in the session
    /// (matching fingerprint); returned instead of sending twice.
    AlreadyExecuted,
}

impl ExecuteOutcome {
    pub fn succeeded(&self) -> bool {
        matches!(self, ExecuteOutcome::EmailSent { .. } | ExecuteOutcome::TicketCreated { .. })
    }
}
