//! Exact-match (case-insensitive, trimmed) keyword sets shared by the
//! orchestrator's cancel short-circuit (§4.8 step 3) and the email/ticket
//! preview steps (§4.7.2, §4.7.3).

/// Cancels an active flow from anywhere in its step machine.
pub const CANCEL_KEYWORDS: &[&str] = &[
    "cancel",
    "never mind",
    "nevermind",
    "stop",
    "abort",
    "forget it",
    "quit",
];

/// Confirms a preview and triggers the side effect.
pub const CONFIRM_KEYWORDS: &[&str] = &[
    "yes",
    "confirm",
    "send",
    "send it",
    "go ahead",
    "ok",
    "okay",
    "sure",
    "looks good",
    "correct",
    "do it",
];

/// Requests the preview be regenerated instead of sent.
pub const EDIT_KEYWORDS: &[&str] = &[
    "edit",
    "change",
    "modify",
    "update",
    "fix",
    "redo",
    "regenerate",
    "try again",
    "rewrite",
];

fn normalize(message: &str) -> String {
    message.trim().to_lowercase()
}

/// True iff `message`, trimmed and lowercased, exactly equals one of `set`.
pub fn exact_match(message: &str, set: &[&str]) -> bool {
    let normalized = normalize(message);
    set.iter().any(|kw| normalized == *kw)
}

pub fn is_cancel(message: &str) -> bool {
    exact_match(message, CANCEL_KEYWORDS)
}

pub fn is_confirm(message: &str) -> bool {
    exact_match(message, CONFIRM_KEYWORDS)
}

pub fn is_edit(message: &str) -> bool {
    exact_match(message, EDIT_KEYWORDS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cancel_keywords_match_case_and_whitespace_insensitively() {
        assert!(is_cancel("  Cancel  "));
        assert!(is_cancel("NEVER MIND"));
        assert!(!is_cancel("cancel my subscription"));
    }

    #[test]
    fn confirm_and_edit_keyword_sets_are_disjoint() {
        for kw in CONFIRM_KEYWORDS {
            assert!(!EDIT_KEYWORDS.contains(kw), "{kw} in both confirm and edit sets");
        }
    }
}
