//! Ticket-status handler (§4.7.4). One-shot: list a student's tickets,
//! close one by ID, or close all of them. Grounded in
//! `original_source/agents/ticket_agent.py`'s `get_student_tickets`/
//! `close_ticket`/`close_all_tickets`.

use std::sync::Arc;

use concierge_core::envelope::{HandlerResponse, HandlerStatus};
use concierge_core::TicketStore;

const AGENT: &str = "ticket_status";

pub struct TicketStatusHandler {
    tickets: Arc<dyn TicketStore>,
}

impl TicketStatusHandler {
    pub fn new(tickets: Arc<dyn TicketStore>) -> Self {
        Self { tickets }
    }

    pub async fn handle(&self, user_id: &str, message: &str) -> HandlerResponse {
        let lower = message.to_lowercase();

        if lower.contains("close all") {
            return self.close_all(user_id).await;
        }
        if let Some(id) = extract_ticket_id(&lower) {
            if lower.contains("close") {
                return self.close_one(user_id, &id).await;
            }
        }
        self.list(user_id).await
    }

    async fn list(&self, user_id: &str) -> HandlerResponse {
        match self.tickets.list_for_user(user_id).await {
            Ok(tickets) if !tickets.is_empty() => {
                let lines: Vec<String> = tickets
                    .iter()
                    .map(|t| format!("#{} — {} [{}] ({})", t.id, t.category, t.status, t.priority))
                    .collect();
                success(format!("Your tickets:\n{}", lines.join("\n")))
            }
            Ok(_) => success("You don't have any tickets on file.".to_string()),
            Err(_) => success("I couldn't load your tickets right now. Please try again shortly.".to_string()),
        }
    }

    async fn close_one(&self, user_id: &str, ticket_id: &str) -> HandlerResponse {
        match self.tickets.close(ticket_id, user_id).await {
            Ok(true) => success(format!("Ticket #{ticket_id} has been closed.")),
            Ok(false) => success(format!("I couldn't find a ticket #{ticket_id} of yours to close.")),
            Err(_) => success("I couldn't close that ticket right now. Please try again shortly.".to_string()),
        }
    }

    async fn close_all(&self, user_id: &str) -> HandlerResponse {
        match self.tickets.close_all(user_id).await {
            Ok(0) => success("You don't have any open tickets to close.".to_string()),
            Ok(n) => success(format!("Closed {n} ticket(s).")),
            Err(_) => success("I couldn't close your tickets right now. Please try again shortly.".to_string()),
        }
    }
}

/// Pull a ticket id out of "close ticket #42" / "close ticket 42".
fn extract_ticket_id(lower_message: &str) -> Option<String> {
    let digits: String = lower_message
        .chars()
        .skip_while(|c| !c.is_ascii_digit())
        .take_while(|c| c.is_ascii_digit())
        .collect();
    if digits.is_empty() {
        None
    } else {
        Some(digits)
    }
}

fn success(message: String) -> HandlerResponse {
    HandlerResponse {
        status: HandlerStatus::Success,
        agent: AGENT.to_string(),
        message,
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
    fn extracts_ticket_id_from_close_command() {
        assert_eq!(extract_ticket_id("close ticket #42"), Some("42".to_string()));
        assert_eq!(extract_ticket_id("close ticket 7 please"), Some("7".to_string()));
        assert_eq!(extract_ticket_id("close all tickets"), None);
    }
}
