//! Ticket flow handler (§4.7.3). States: `start → collect_description →
//! preview → (submit|cancel)`. Grounded in
//! `original_source/agents/ticket_agent.py`'s triage step — LLM-assisted
//! category/priority classification constrained to the closed set in
//! [`crate::ticket_config`], with a sensitive-keyword override that never
//! depends on the LLM call succeeding.

use std::sync::Arc;

use concierge_classifier::Entities;
use concierge_core::envelope::{HandlerResponse, HandlerStatus};
use concierge_core::keywords::{is_cancel, is_confirm, is_edit};
use concierge_core::types::{PendingAction, TicketDraft};
use concierge_core::SessionId;
use concierge_flowstore::FlowStore;
use concierge_llm::{ChatRequest, LlmProvider};

use crate::flow_state::{TicketFlowState, TicketStep};
use crate::ticket_config::{self, contains_sensitive_keyword};

const AGENT: &str = "ticket";
const FLOW_KEY: &str = "active";

const TRIAGE_SYSTEM_PROMPT: &str = "You triage student support tickets for a college helpdesk. \
Classify the complaint into exactly one category and subcategory from the allowed list, write a short \
title (under 10 words), and rewrite the description in clear, professional language without changing its \
meaning. Respond with a single JSON object: \
{\"category\": string, \"sub_category\": string, \"title\": string, \"priority\": \"Low\"|\"Medium\"|\"High\"|\"Urgent\", \"description\": string}. \
Output ONLY the JSON object.";

#[derive(Debug, serde::Deserialize)]
struct RawTriage {
    category: String,
    #[serde(default)]
    sub_category: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    priority: String,
    #[serde(default)]
    description: String,
}

pub struct TicketHandler {
    llm: Arc<dyn LlmProvider>,
    model: String,
    flow_store: Arc<FlowStore>,
}

impl TicketHandler {
    pub fn new(llm: Arc<dyn LlmProvider>, model: impl Into<String>, flow_store: Arc<FlowStore>) -> Self {
        Self {
            llm,
            model: model.into(),
            flow_store,
        }
    }

    /// §4.7.3 `start` is awaiting "description present in entities or
    /// message" — fall back to the raw turn text when the classifier left
    /// `ticket_description` unset, so a student who states the issue
    /// directly ("my wifi has been down for three days") goes straight to
    /// preview instead of being asked to repeat themselves.
    pub async fn start(&self, session_id: &SessionId, message: &str, entities: &Entities) -> HandlerResponse {
        let description = entities
            .ticket_description
            .clone()
            .or_else(|| (message.trim().chars().count() >= 5).then(|| message.trim().to_string()));

        if let Some(description) = description {
            let state = TicketFlowState {
                description: Some(description),
                ..Default::default()
            };
            return self.triage_and_preview(session_id, state).await;
        }
        let state = TicketFlowState {
            step: Some(TicketStep::CollectDescription),
            ..Default::default()
        };
        self.flow_store.pause(session_id, FLOW_KEY, state.to_value());
        needs_input("What's the issue you'd like to raise a ticket for? Please describe it.", &["description"])
    }

    pub async fn continue_flow(&self, session_id: &SessionId, message: &str, _entities: &Entities, state: TicketFlowState) -> HandlerResponse {
        match state.step {
            Some(TicketStep::CollectDescription) => {
                let next = TicketFlowState {
                    description: Some(message.to_string()),
                    ..Default::default()
                };
                self.triage_and_preview(session_id, next).await
            }
            Some(TicketStep::Preview) => self.handle_preview(session_id, message, state).await,
            None => {
                let next = TicketFlowState {
                    description: Some(message.to_string()),
                    ..Default::default()
                };
                self.triage_and_preview(session_id, next).await
            }
        }
    }

    async fn triage_and_preview(&self, session_id: &SessionId, mut state: TicketFlowState) -> HandlerResponse {
        let description = state.description.clone().unwrap_or_default();
        let sensitive = contains_sensitive_keyword(&description);

        let triage = self.call_triage(&description).await;
        let category = ticket_config::normalize_category(&triage.category).to_string();
        let sub_category = if triage.sub_category.trim().is_empty() {
            ticket_config::default_sub_category(&category).to_string()
        } else {
            triage.sub_category
        };
        let priority = if sensitive {
            "Urgent".to_string()
        } else if ticket_config::PRIORITY_LEVELS.contains(&triage.priority.as_str()) {
            triage.priority
        } else {
            "Medium".to_string()
        };
        let final_description = if triage.description.trim().is_empty() {
            description.clone()
        } else {
            triage.description
        };
        let title = if triage.title.trim().is_empty() {
            truncate_title(&description)
        } else {
            triage.title
        };

        state.category = Some(category.clone());
        state.sub_category = Some(sub_category.clone());
        state.priority = Some(priority.clone());
        state.title = Some(title.clone());
        state.description = Some(final_description.clone());
        state.sensitive = sensitive;
        state.step = Some(TicketStep::Preview);
        self.flow_store.pause(session_id, FLOW_KEY, state.to_value());

        let department = ticket_config::department_for(&category);
        let sla = ticket_config::sla_hours_for(&priority);
        let urgent_note = if sensitive {
            "\n\nThis has been flagged as sensitive and routed for priority handling."
        } else {
            ""
        };
        let message = format!(
            "Here's your ticket:\n\nTitle: {title}\nCategory: {category} / {sub_category}\nPriority: {priority} (handled by {department}, target response within {sla}h)\nDescription: {final_description}{urgent_note}\n\nSubmit it or cancel?"
        );

        HandlerResponse {
            status: HandlerStatus::NeedsConfirmation,
            agent: AGENT.to_string(),
            message,
            resolved_entities: Default::default(),
            required_slots: Vec::new(),
            artifacts: Default::default(),
            side_effects: Vec::new(),
            citations: Vec::new(),
            confirmation_data: Some(serde_json::json!({
                "category": category,
                "sub_category": sub_category,
                "priority": priority,
                "description": final_description,
            })),
        }
    }

    async fn handle_preview(&self, session_id: &SessionId, message: &str, state: TicketFlowState) -> HandlerResponse {
        if is_cancel(message) {
            self.flow_store.clear(session_id, FLOW_KEY);
            return cancelled();
        }
        if is_edit(message) {
            let retriage = TicketFlowState {
                description: state.description.clone(),
                ..Default::default()
            };
            return self.triage_and_preview(session_id, retriage).await;
        }
        if is_confirm(message) {
            self.flow_store.clear(session_id, FLOW_KEY);
            let draft = TicketDraft {
                student_email: String::new(),
                category: state.category.clone().unwrap_or_default(),
                sub_category: state.sub_category.clone().unwrap_or_default(),
                priority: state.priority.clone().unwrap_or_default(),
                description: state.description.clone().unwrap_or_default(),
                attachments: Vec::new(),
            };
            let mut response = HandlerResponse {
                status: HandlerStatus::Success,
                agent: AGENT.to_string(),
                message: "Submitting your ticket now...".to_string(),
                resolved_entities: Default::default(),
                required_slots: Vec::new(),
                artifacts: Default::default(),
                side_effects: vec!["create_ticket".to_string()],
                citations: Vec::new(),
                confirmation_data: None,
            };
            let pending = PendingAction::TicketPreview(draft);
            response
                .artifacts
                .insert("pending_action".to_string(), serde_json::to_value(pending).unwrap());
            if state.sensitive {
                response.artifacts.insert("sensitive".to_string(), serde_json::Value::Bool(true));
            }
            return response;
        }
        needs_input(
            "Please reply \"submit\" to file the ticket, \"edit\" to redo it, or \"cancel\" to drop it.",
            &[],
        )
    }

    async fn call_triage(&self, description: &str) -> RawTriage {
        let categories: Vec<&str> = ticket_config::CATEGORIES.iter().map(|(name, _)| *name).collect();
        let prompt = format!(
            "Allowed categories: {}\n\nComplaint:\n{description}",
            categories.join(", ")
        );
        let mut req = ChatRequest::single_turn(self.model.clone(), TRIAGE_SYSTEM_PROMPT, prompt);
        req.temperature = 0.1;
        req.max_tokens = 400;

        match self.llm.send(&req).await {
            Ok(resp) => serde_json::from_str(extract_json(&resp.content)).unwrap_or_else(|_| fallback_triage(description)),
            Err(_) => fallback_triage(description),
        }
    }
}

fn fallback_triage(description: &str) -> RawTriage {
    RawTriage {
        category: "Other".to_string(),
        sub_category: String::new(),
        title: truncate_title(description),
        priority: "Medium".to_string(),
        description: description.to_string(),
    }
}

fn truncate_title(description: &str) -> String {
    let words: Vec<&str> = description.split_whitespace().take(8).collect();
    words.join(" ")
}

/// Pull the first `{...}` object out of a response that may have stray
/// prose around it (mirrors the classifier's own tolerant parsing).
fn extract_json(text: &str) -> &str {
    let start = text.find('{');
    let end = text.rfind('}');
    match (start, end) {
        (Some(s), Some(e)) if e > s => &text[s..=e],
        _ => text,
    }
}

fn needs_input(message: &str, slots: &[&str]) -> HandlerResponse {
    HandlerResponse {
        status: HandlerStatus::NeedsInput,
        agent: AGENT.to_string(),
        message: message.to_string(),
        resolved_entities: Default::default(),
        required_slots: slots.iter().map(|s| s.to_string()).collect(),
        artifacts: Default::default(),
        side_effects: Vec::new(),
        citations: Vec::new(),
        confirmation_data: None,
    }
}

fn cancelled() -> HandlerResponse {
    HandlerResponse {
        status: HandlerStatus::Success,
        agent: AGENT.to_string(),
        message: "No problem, I've cancelled that ticket.".to_string(),
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
    fn extract_json_strips_surrounding_prose() {
        let text = "Sure, here you go:\n{\"category\": \"IT Support\"}\nHope that helps.";
        assert_eq!(extract_json(text), "{\"category\": \"IT Support\"}");
    }

    #[test]
    fn fallback_triage_defaults_to_other_and_medium() {
        let t = fallback_triage("my wifi keeps dropping in the hostel");
        assert_eq!(t.category, "Other");
        assert_eq!(t.priority, "Medium");
    }
}
