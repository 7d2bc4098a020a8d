use concierge_core::ActionKind;

/// Result of a quota check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LimitCheck {
    pub allowed: bool,
    pub remaining: u32,
    pub max_allowed: u32,
}

/// All remaining daily limits for a user, for "how many do I have left" queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RemainingLimits {
    pub emails_remaining: u32,
    pub emails_max: u32,
    pub tickets_remaining: u32,
    pub tickets_max: u32,
}

pub(crate) fn usage_column(action: ActionKind) -> &'static str {
    match action {
        ActionKind::Email => "emails_sent",
        ActionKind::Ticket => "tickets_created",
    }
}
