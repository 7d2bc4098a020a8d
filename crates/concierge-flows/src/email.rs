//! Email flow handler (§4.7.2). States: `start → collect_recipient |
//! collect_purpose | faculty_select | preview → (send|cancel|edit)`.
//! Grounded in `original_source/agents/email_agent.py`'s step handling,
//! rebuilt as an explicit state-transition function over [`EmailFlowState`]
//! instead of the original's mutable draft dict.

use std::sync::Arc;

use concierge_classifier::Entities;
use concierge_core::envelope::{HandlerResponse, HandlerStatus};
use concierge_core::keywords::{is_cancel, is_confirm, is_edit};
use concierge_core::types::{EmailDraft, PendingAction};
use concierge_core::{FacultyDirectory, FacultyRecord, SessionId};
use concierge_flowstore::FlowStore;

use crate::email_prompt::{infer_length_band, sanitize_purpose, EmailDraftGenerator};
use crate::flow_state::{EmailFlowState, EmailStep, FacultyCandidate};

const AGENT: &str = "email";
const FLOW_KEY: &str = "active";

/// Message substrings that indicate the user has moved on to something
/// unrelated while `collect_recipient`/`faculty_select` is still open
/// (§4.7.2 "faculty search escape"). Also used at `preview` to recognise
/// free text that isn't a confirm/edit/cancel so the turn can be handed
/// back to the classifier instead of looping forever (§9, scenario S6).
const ESCAPE_PHRASES: &[&str] = &[
    "raise a ticket",
    "file a ticket",
    "report a problem",
    "support ticket",
    "what is",
    "what's",
    "attendance policy",
    "fee structure",
    "hostel fee",
    "library timing",
];

fn looks_like_escape(message: &str) -> bool {
    let lower = message.to_lowercase();
    ESCAPE_PHRASES.iter().any(|p| lower.contains(p))
}

pub struct EmailHandler {
    faculty_dir: Arc<dyn FacultyDirectory>,
    generator: EmailDraftGenerator,
    flow_store: Arc<FlowStore>,
}

impl EmailHandler {
    pub fn new(faculty_dir: Arc<dyn FacultyDirectory>, generator: EmailDraftGenerator, flow_store: Arc<FlowStore>) -> Self {
        Self {
            faculty_dir,
            generator,
            flow_store,
        }
    }

    /// Fresh entry into the EMAIL intent (§4.8 step 7 clears C1 first).
    pub async fn start(&self, session_id: &SessionId, _message: &str, entities: &Entities) -> HandlerResponse {
        let mut state = EmailFlowState::default();

        if let Some(email) = &entities.email_address {
            state.recipient = Some(email.clone());
        }
        if let Some(purpose) = &entities.purpose {
            state.purpose = Some(sanitize_purpose(purpose, entities.faculty_name.as_deref()));
        }

        if state.recipient.is_none() {
            if let Some(faculty_name) = &entities.faculty_name {
                return self.search_faculty(session_id, &mut state, faculty_name).await;
            }
            state.step = Some(EmailStep::CollectRecipient);
            self.flow_store.pause(session_id, FLOW_KEY, state.to_value());
            return needs_input(
                "Who would you like to email? You can give me a name, department, or email address.",
                &["recipient"],
            );
        }

        if state.purpose.is_none() {
            state.step = Some(EmailStep::CollectPurpose);
            self.flow_store.pause(session_id, FLOW_KEY, state.to_value());
            return needs_input("What would you like the email to say?", &["purpose"]);
        }

        self.generate_preview_owned(session_id, state).await
    }

    /// Continue a paused email flow with the next turn's message.
    pub async fn continue_flow(&self, session_id: &SessionId, message: &str, entities: &Entities, mut state: EmailFlowState) -> HandlerResponse {
        match state.step {
            Some(EmailStep::CollectRecipient) => {
                if looks_like_escape(message) {
                    self.flow_store.clear(session_id, FLOW_KEY);
                    return reclassify();
                }
                if let Some(email) = extract_email(message) {
                    state.recipient = Some(email);
                    if state.purpose.is_none() {
                        state.step = Some(EmailStep::CollectPurpose);
                        self.flow_store.pause(session_id, FLOW_KEY, state.to_value());
                        return needs_input("What would you like the email to say?", &["purpose"]);
                    }
                    return self.generate_preview_owned(session_id, state).await;
                }
                self.search_faculty(session_id, &mut state, message).await
            }
            Some(EmailStep::FacultySelect) => self.handle_faculty_select(session_id, message, &mut state).await,
            Some(EmailStep::CollectPurpose) => {
                state.purpose = Some(sanitize_purpose(message, state.recipient_name.as_deref()));
                self.generate_preview_owned(session_id, state).await
            }
            Some(EmailStep::Preview) => self.handle_preview(session_id, message, entities, state).await,
            None => self.start(session_id, message, entities).await,
        }
    }

    async fn search_faculty(&self, session_id: &SessionId, state: &mut EmailFlowState, query: &str) -> HandlerResponse {
        let results = self.faculty_dir.search(query).await.unwrap_or_default();
        if results.is_empty() {
            state.step = Some(EmailStep::CollectRecipient);
            state.faculty_search_text = Some(query.to_string());
            self.flow_store.pause(session_id, FLOW_KEY, state.to_value());
            return needs_input(
                &format!("I couldn't find anyone matching \"{query}\". Could you give me a name or department?"),
                &["recipient"],
            );
        }
        if results.len() == 1 {
            let only = &results[0];
            state.recipient = Some(only.email.clone());
            state.recipient_name = Some(only.name.clone());
            if state.purpose.is_none() {
                state.step = Some(EmailStep::CollectPurpose);
                self.flow_store.pause(session_id, FLOW_KEY, state.to_value());
                return needs_input(
                    &format!("What would you like to tell {}?", only.name),
                    &["purpose"],
                );
            }
            return self.generate_preview_owned(session_id, state.clone()).await;
        }

        state.step = Some(EmailStep::FacultySelect);
        state.faculty_search_text = Some(query.to_string());
        state.faculty_candidates = results.iter().map(to_candidate).collect();
        self.flow_store.pause(session_id, FLOW_KEY, state.to_value());
        let listing = format_candidates(&results);
        needs_input(
            &format!("I found a few matches. Which one did you mean?\n{listing}"),
            &["faculty_selection"],
        )
    }

    async fn handle_faculty_select(&self, session_id: &SessionId, message: &str, state: &mut EmailFlowState) -> HandlerResponse {
        let trimmed = message.trim();
        if let Ok(index) = trimmed.parse::<usize>() {
            if index >= 1 && index <= state.faculty_candidates.len() {
                let chosen = state.faculty_candidates[index - 1].clone();
                state.recipient = Some(chosen.email);
                state.recipient_name = Some(chosen.name.clone());
                state.faculty_candidates.clear();
                if state.purpose.is_none() {
                    state.step = Some(EmailStep::CollectPurpose);
                    self.flow_store.pause(session_id, FLOW_KEY, state.to_value());
                    return needs_input(&format!("What would you like to tell {}?", chosen.name), &["purpose"]);
                }
                return self.generate_preview_owned(session_id, state.clone()).await;
            }
        }
        // Not a valid selection; treat the message as a refined search query.
        self.search_faculty(session_id, state, trimmed).await
    }

    async fn generate_preview_owned(&self, session_id: &SessionId, mut state: EmailFlowState) -> HandlerResponse {
        let purpose = state.purpose.clone().unwrap_or_default();
        let recipient_name = state.recipient_name.clone().unwrap_or_default();
        let length = infer_length_band(&purpose);

        let subject = self.generator.generate_subject(&purpose, state.regenerate).await;
        let body = self
            .generator
            .generate_body(&purpose, &recipient_name, length, state.regenerate)
            .await;

        state.subject = Some(subject.clone());
        state.body = Some(body.clone());
        state.step = Some(EmailStep::Preview);
        state.regenerate = false;
        self.flow_store.pause(session_id, FLOW_KEY, state.to_value());

        let to = state.recipient.clone().unwrap_or_default();
        let preview = format!(
            "Here's a draft:\n\nTo: {}\nSubject: {subject}\n\n{body}\n\nSend it, edit it, or cancel?",
            state.recipient_name.clone().unwrap_or_else(|| to.clone())
        );

        let mut response = HandlerResponse {
            status: HandlerStatus::NeedsConfirmation,
            agent: AGENT.to_string(),
            message: preview,
            resolved_entities: Default::default(),
            required_slots: Vec::new(),
            artifacts: Default::default(),
            side_effects: Vec::new(),
            citations: Vec::new(),
            confirmation_data: Some(serde_json::json!({
                "to": to,
                "subject": subject,
                "body": body,
            })),
        };
        response
            .artifacts
            .insert("preview".to_string(), serde_json::json!({"to": to}));
        response
    }

    async fn handle_preview(&self, session_id: &SessionId, message: &str, _entities: &Entities, state: EmailFlowState) -> HandlerResponse {
        if is_cancel(message) {
            self.flow_store.clear(session_id, FLOW_KEY);
            return cancelled();
        }
        if is_edit(message) {
            let mut next = state;
            next.regenerate = true;
            return self.generate_preview_owned(session_id, next).await;
        }
        if is_confirm(message) {
            self.flow_store.clear(session_id, FLOW_KEY);
            let draft = EmailDraft {
                to: state.recipient.clone().unwrap_or_default(),
                to_name: state.recipient_name.clone(),
                subject: state.subject.clone().unwrap_or_default(),
                body: state.body.clone().unwrap_or_default(),
            };
            let mut response = HandlerResponse {
                status: HandlerStatus::Success,
                agent: AGENT.to_string(),
                message: "Sending your email now...".to_string(),
                resolved_entities: Default::default(),
                required_slots: Vec::new(),
                artifacts: Default::default(),
                side_effects: vec!["send_email".to_string()],
                citations: Vec::new(),
                confirmation_data: None,
            };
            let pending = PendingAction::EmailPreview(draft);
            response
                .artifacts
                .insert("pending_action".to_string(), serde_json::to_value(pending).unwrap());
            return response;
        }

        // Free text that isn't confirm/edit/cancel: hand back to the
        // orchestrator for reclassification rather than repeat the preview
        // forever (§9, scenario S6).
        self.flow_store.clear(session_id, FLOW_KEY);
        reclassify()
    }
}

fn to_candidate(record: &FacultyRecord) -> FacultyCandidate {
    FacultyCandidate {
        name: record.name.clone(),
        email: record.email.clone(),
        department: record.department.clone(),
    }
}

fn format_candidates(records: &[FacultyRecord]) -> String {
    records
        .iter()
        .enumerate()
        .map(|(i, r)| format!("{}. {} ({})", i + 1, r.name, r.department))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Pull a bare email address out of free text (mirrors the classifier's own
/// regex fallback so a recipient typed directly doesn't trigger a faculty
/// search first).
fn extract_email(message: &str) -> Option<String> {
    message
        .split_whitespace()
        .find(|tok| tok.contains('@') && tok.contains('.'))
        .map(|tok| tok.trim_matches(|c: char| !c.is_alphanumeric() && c != '@' && c != '.').to_string())
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
        message: "No problem, I've cancelled that email.".to_string(),
        resolved_entities: Default::default(),
        required_slots: Vec::new(),
        artifacts: Default::default(),
        side_effects: Vec::new(),
        citations: Vec::new(),
        confirmation_data: None,
    }
}

fn reclassify() -> HandlerResponse {
    let mut response = HandlerResponse {
        status: HandlerStatus::Success,
        agent: AGENT.to_string(),
        message: String::from("one moment"),
        resolved_entities: Default::default(),
        required_slots: Vec::new(),
        artifacts: Default::default(),
        side_effects: Vec::new(),
        citations: Vec::new(),
        confirmation_data: None,
    };
    response.artifacts.insert("reclassify".to_string(), serde_json::Value::Bool(true));
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extract_email_finds_bare_address_in_sentence() {
        assert_eq!(extract_email("send it to dean@college.edu please"), Some("dean@college.edu".to_string()));
        assert_eq!(extract_email("email the registrar"), None);
    }

    #[test]
    fn escape_phrases_are_detected_case_insensitively() {
        assert!(looks_like_escape("Actually, let me RAISE A TICKET instead"));
        assert!(!looks_like_escape("Dr. Rao Kumar"));
    }
}
