//! Greeting handler (§4.7.5). One-shot, keyword-bucketed, no LLM call —
//! greetings carry no slots worth an LLM round trip.

use concierge_core::envelope::{HandlerResponse, HandlerStatus};

const AGENT: &str = "greeting";

const FAREWELL_KEYWORDS: &[&str] = &["bye", "goodbye", "see you", "good night", "talk later"];
const THANKS_KEYWORDS: &[&str] = &["thanks", "thank you", "thx", "appreciate it"];
const CAPABILITY_KEYWORDS: &[&str] = &["what can you do", "help", "what do you do", "how does this work"];

pub fn handle(message: &str) -> HandlerResponse {
    let lower = message.to_lowercase();

    let reply = if FAREWELL_KEYWORDS.iter().any(|k| lower.contains(k)) {
        "Goodbye! Feel free to come back whenever you need help."
    } else if THANKS_KEYWORDS.iter().any(|k| lower.contains(k)) {
        "You're welcome! Let me know if there's anything else."
    } else if CAPABILITY_KEYWORDS.iter().any(|k| lower.contains(k)) {
        "I can answer questions about college policies, draft and send emails to faculty, raise support \
         tickets, and check on ticket status for you. What would you like to do?"
    } else {
        "Hello! I'm your campus concierge. I can help with policy questions, emailing faculty, and support tickets."
    };

    HandlerResponse {
        status: HandlerStatus::Success,
        agent: AGENT.to_string(),
        message: reply.to_string(),
        resolved_entities: Default::default(),
        required_slots: Vec::new(),
        artifacts: Default::default(),
        side_effects: Vec::new(),
        citations: Vec::new(),
        confirmation_data: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn farewell_keywords_get_a_goodbye_reply() {
        let resp = handle("ok bye");
        assert!(resp.message.starts_with("Goodbye"));
    }

    #[test]
    fn unrecognised_greeting_gets_the_default_reply() {
        let resp = handle("hiya");
        assert!(resp.message.contains("campus concierge"));
    }
}
