use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use concierge_classifier::{Entities, IntentClassifier};
use concierge_core::envelope::{AgentOutput, Envelope, EnvelopeKind, EnvelopeMetadata, HandlerResponse, HandlerStatus};
use concierge_core::keywords::is_cancel;
use concierge_core::{Intent, MessageRole, PendingAction, SessionId, StudentProfile};
use concierge_dedup::DedupCache;
use concierge_executor::SideEffectExecutor;
use concierge_flows::{flow_name_of, EmailFlowState, EmailHandler, FaqHandler, TicketFlowState, TicketHandler, TicketStatusHandler};
use concierge_flowstore::FlowStore;
use concierge_memory::MemoryStore;
use concierge_turnlog::{TurnLog, TurnLogRecord};
use serde_json::Value;
use tracing::{instrument, warn};
use uuid::Uuid;

use crate::types::{TurnMetadata, ARTIFACT_PENDING_ACTION, ARTIFACT_RECLASSIFY, ARTIFACT_SENSITIVE, HISTORY_MAX_MESSAGES, INTENT_LABEL_CANCEL};

const FLOW_KEY: &str = "active";

/// Ties every collaborator together behind the single `process_message`
/// entry point (§4.8, C8). Grounded in `skynet-agent::pipeline::Pipeline`'s
/// role as the one place that sequences classification, dispatch, and
/// persistence — generalized here to the flow-aware, confirmation-gated
/// turn loop this spec describes.
pub struct Orchestrator {
    flow_store: Arc<FlowStore>,
    memory: Arc<MemoryStore>,
    classifier: Arc<IntentClassifier>,
    dedup: Arc<DedupCache>,
    executor: Arc<SideEffectExecutor>,
    turn_log: Arc<TurnLog>,
    faq: Arc<FaqHandler>,
    email: Arc<EmailHandler>,
    ticket: Arc<TicketHandler>,
    ticket_status: Arc<TicketStatusHandler>,
}

impl Orchestrator {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        flow_store: Arc<FlowStore>,
        memory: Arc<MemoryStore>,
        classifier: Arc<IntentClassifier>,
        dedup: Arc<DedupCache>,
        executor: Arc<SideEffectExecutor>,
        turn_log: Arc<TurnLog>,
        faq: Arc<FaqHandler>,
        email: Arc<EmailHandler>,
        ticket: Arc<TicketHandler>,
        ticket_status: Arc<TicketStatusHandler>,
    ) -> Self {
        Self {
            flow_store,
            memory,
            classifier,
            dedup,
            executor,
            turn_log,
            faq,
            email,
            ticket,
            ticket_status,
        }
    }

    /// Process one student turn end to end (§4.8). Never returns an error —
    /// every failure mode downstream degrades to a `HandlerStatus::Error`
    /// envelope so the student always gets a reply.
    #[instrument(skip(self, message, profile), fields(session_id = %session_id, user_id = %profile.user_id))]
    pub async fn process_message(&self, session_id: &SessionId, profile: &StudentProfile, message: &str) -> Envelope {
        let start = Instant::now();

        self.flow_store.update_activity(session_id);
        if self.flow_store.check_session_timeout(session_id) {
            tracing::info!(session_id = %session_id, "session timed out, paused flows were cleared");
        }

        let active_state = self.flow_store.resume(session_id, FLOW_KEY);

        if let Some(state_value) = active_state {
            if is_cancel(message) {
                let flow_kind = flow_name_of(&state_value).map(str::to_string);
                self.flow_store.clear(session_id, FLOW_KEY);
                let response = cancellation_response(flow_kind.as_deref());
                return self.finish(session_id, profile, message, response, INTENT_LABEL_CANCEL, 1.0, start).await;
            }

            let response = self.dispatch_active_flow(session_id, message, state_value).await;
            if !is_reclassify(&response) {
                let intent_label = response.agent.to_uppercase();
                let response = self.run_pending_action(session_id, profile, response).await;
                return self.finish(session_id, profile, message, response, &intent_label, 1.0, start).await;
            }
            // Ambiguous free text at a preview step: fall through and
            // reclassify `message` as if no flow had been active (§9 S6).
        }

        self.classify_and_respond(session_id, profile, message, start).await
    }

    async fn classify_and_respond(&self, session_id: &SessionId, profile: &StudentProfile, message: &str, start: Instant) -> Envelope {
        let user_id = profile.user_id.as_str();

        let history_text = self
            .memory
            .get_user_context(user_id, session_id.as_str(), HISTORY_MAX_MESSAGES)
            .unwrap_or_default();
        let classification = self.classifier.classify(message, &history_text).await;
        let intent_label = classification.intent.as_str();

        let has_entities = !classification.entities.is_empty();
        let entity_override = has_entities && matches!(classification.intent, Intent::Email | Intent::Ticket);
        if classification.confidence < classification.intent.confidence_threshold() && !entity_override {
            let response = clarification_response();
            return self.finish(session_id, profile, message, response, intent_label, classification.confidence, start).await;
        }

        let entities_value = serde_json::to_value(&classification.entities).unwrap_or(Value::Null);
        let (is_dup, cached) = self.dedup.check_duplicate(user_id, intent_label, &entities_value, message);
        if is_dup {
            if let Some(cached_response) = cached.and_then(|v| serde_json::from_value::<HandlerResponse>(v).ok()) {
                return self
                    .finish(session_id, profile, message, cached_response, intent_label, classification.confidence, start)
                    .await;
            }
        }

        let response = self.dispatch_intent(session_id, user_id, message, classification.intent, &classification.entities).await;
        let response = if response.is_valid() { response } else { HandlerResponse::generic_error(&response.agent) };
        let response = self.run_pending_action(session_id, profile, response).await;

        if let Ok(cacheable) = serde_json::to_value(&response) {
            self.dedup.cache_response(user_id, intent_label, &entities_value, cacheable);
        }

        self.finish(session_id, profile, message, response, intent_label, classification.confidence, start).await
    }

    /// Fresh intent dispatch (§4.8 step 7). EMAIL/TICKET clear any stale
    /// paused flow before entering with empty state — only a flow handler
    /// itself re-pauses state once it is actually mid-draft.
    async fn dispatch_intent(&self, session_id: &SessionId, user_id: &str, message: &str, intent: Intent, entities: &Entities) -> HandlerResponse {
        match intent {
            Intent::Faq => self.faq.handle(user_id, message).await,
            Intent::Email => {
                self.flow_store.clear(session_id, FLOW_KEY);
                self.email.start(session_id, message, entities).await
            }
            Intent::Ticket => {
                self.flow_store.clear(session_id, FLOW_KEY);
                self.ticket.start(session_id, message, entities).await
            }
            Intent::TicketStatus => self.ticket_status.handle(user_id, message).await,
            Intent::Greeting => concierge_flows::greeting::handle(message),
            Intent::Unknown => clarification_response(),
        }
    }

    async fn dispatch_active_flow(&self, session_id: &SessionId, message: &str, state_value: Value) -> HandlerResponse {
        let entities = Entities::default();
        let flow_name = flow_name_of(&state_value).map(str::to_string);
        match flow_name.as_deref() {
            Some(concierge_flows::FLOW_NAME_EMAIL) => match EmailFlowState::from_value(state_value) {
                Some(state) => self.email.continue_flow(session_id, message, &entities, state).await,
                None => self.drop_unreadable_flow(session_id),
            },
            Some(concierge_flows::FLOW_NAME_TICKET) => match TicketFlowState::from_value(state_value) {
                Some(state) => self.ticket.continue_flow(session_id, message, &entities, state).await,
                None => self.drop_unreadable_flow(session_id),
            },
            _ => self.drop_unreadable_flow(session_id),
        }
    }

    fn drop_unreadable_flow(&self, session_id: &SessionId) -> HandlerResponse {
        warn!(session_id = %session_id, "paused flow state missing or unreadable, dropping it");
        self.flow_store.clear(session_id, FLOW_KEY);
        HandlerResponse::generic_error("orchestrator")
    }

    /// Hand a confirmed draft to the executor (§4.9) if the handler staged
    /// one, and fold the outcome into the response shown to the student.
    async fn run_pending_action(&self, session_id: &SessionId, profile: &StudentProfile, mut response: HandlerResponse) -> HandlerResponse {
        let Some(pending_value) = response.artifacts.remove(ARTIFACT_PENDING_ACTION) else {
            return response;
        };
        let pending: PendingAction = match serde_json::from_value(pending_value) {
            Ok(p) => p,
            Err(e) => {
                warn!(error = %e, "pending_action artifact did not parse, skipping side effect");
                return response;
            }
        };
        let sensitive = response
            .artifacts
            .remove(ARTIFACT_SENSITIVE)
            .and_then(|v| v.as_bool())
            .unwrap_or(false);

        match self.executor.execute(session_id, profile, pending, sensitive).await {
            Ok(outcome) => apply_outcome(&mut response, outcome),
            Err(e) => {
                warn!(error = %e, "side effect execution failed");
                response.status = HandlerStatus::Error;
                response.message = "Sorry, I couldn't complete that just now. Please try again shortly.".to_string();
            }
        }
        response
    }

    /// Build the outer envelope, persist both sides of the turn (§4.8 step
    /// 9), and append a turn-log record (§4.8 step 10). Never fails the
    /// turn: persistence/logging errors are logged and swallowed.
    async fn finish(
        &self,
        session_id: &SessionId,
        profile: &StudentProfile,
        message: &str,
        response: HandlerResponse,
        intent: &str,
        confidence: f64,
        start: Instant,
    ) -> Envelope {
        let user_id = profile.user_id.as_str();
        let flow_summary = self.peek_flow_summary(session_id);
        let envelope = build_envelope(&response, intent, confidence, &flow_summary);

        let turn_metadata = TurnMetadata {
            intent: intent.to_string(),
            confidence,
            active_flow: flow_summary.0.clone(),
            step: flow_summary.1.clone(),
        };
        let metadata_value = serde_json::to_value(&turn_metadata).ok();

        if let Err(e) = self.memory.save_message(user_id, session_id.as_str(), MessageRole::User, message, Some(intent), Some(&response.agent), None) {
            warn!(error = %e, "failed to persist user turn");
        }
        if let Err(e) = self.memory.save_message(
            user_id,
            session_id.as_str(),
            MessageRole::Bot,
            &response.message,
            Some(intent),
            Some(&response.agent),
            metadata_value.as_ref(),
        ) {
            warn!(error = %e, "failed to persist bot turn");
        }

        self.turn_log.append(&TurnLogRecord {
            turn_id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            session_id: session_id.to_string(),
            timestamp: Utc::now(),
            intent: intent.to_string(),
            confidence,
            agent: response.agent.clone(),
            side_effects: response.side_effects.clone(),
            duration_ms: start.elapsed().as_millis() as u64,
        });

        envelope
    }

    fn peek_flow_summary(&self, session_id: &SessionId) -> (Option<String>, Option<Value>) {
        match self.flow_store.peek(session_id, FLOW_KEY) {
            Some(state) => {
                let name = flow_name_of(&state).map(str::to_string);
                let step = state.get("step").cloned();
                (name, step)
            }
            None => (None, None),
        }
    }
}

fn is_reclassify(response: &HandlerResponse) -> bool {
    response.artifacts.get(ARTIFACT_RECLASSIFY).and_then(|v| v.as_bool()).unwrap_or(false)
}

fn cancellation_response(flow_kind: Option<&str>) -> HandlerResponse {
    let message = match flow_kind {
        Some(concierge_flows::FLOW_NAME_EMAIL) => "No problem, I've cancelled that email.",
        Some(concierge_flows::FLOW_NAME_TICKET) => "No problem, I've cancelled that ticket.",
        _ => "No problem, I've cancelled that.",
    };
    HandlerResponse {
        status: HandlerStatus::Success,
        agent: "orchestrator".to_string(),
        message: message.to_string(),
        resolved_entities: Default::default(),
        required_slots: Vec::new(),
        artifacts: Default::default(),
        side_effects: Vec::new(),
        citations: Vec::new(),
        confirmation_data: None,
    }
}

fn clarification_response() -> HandlerResponse {
    HandlerResponse {
        status: HandlerStatus::NeedsInput,
        agent: "orchestrator".to_string(),
        message: "I'm not quite sure what you'd like me to do. Could you tell me a bit more — for example, \
                   are you asking about a policy, want to email a professor, or need to raise a support ticket?"
            .to_string(),
        resolved_entities: Default::default(),
        required_slots: Vec::new(),
        artifacts: Default::default(),
        side_effects: Vec::new(),
        citations: Vec::new(),
        confirmation_data: None,
    }
}

fn apply_outcome(response: &mut HandlerResponse, outcome: concierge_executor::ExecuteOutcome) {
    use concierge_executor::ExecuteOutcome;
    match outcome {
        ExecuteOutcome::EmailSent { to, subject } => {
            response.status = HandlerStatus::Success;
            response.message = format!("Your email \"{subject}\" to {to} has been sent.");
        }
        ExecuteOutcome::TicketCreated { ticket } => {
            response.status = HandlerStatus::Success;
            response.message = format!(
                "Ticket #{} has been created ({} / {}, priority {}).",
                ticket.id, ticket.category, ticket.sub_category, ticket.priority
            );
        }
        ExecuteOutcome::QuotaExceeded { remaining, max_allowed } => {
            response.status = HandlerStatus::Error;
            response.message = format!(
                "You've reached today's limit ({max_allowed} max, {remaining} remaining). Please try again tomorrow."
            );
        }
        ExecuteOutcome::AlreadyExecuted => {
            response.status = HandlerStatus::Success;
            response.message = "That's already been taken care of.".to_string();
        }
    }
}

/// Select the envelope's `type` and assemble its content per the shape in
/// §4.8. `NeedsConfirmation` maps to the agent-specific preview kind so the
/// HTTP layer can render an email/ticket preview card instead of plain text.
fn envelope_kind(response: &HandlerResponse) -> EnvelopeKind {
    match response.status {
        HandlerStatus::NeedsInput => EnvelopeKind::ClarificationRequest,
        HandlerStatus::NeedsConfirmation => match response.agent.as_str() {
            "email" => EnvelopeKind::EmailPreview,
            "ticket" => EnvelopeKind::TicketPreview,
            _ => EnvelopeKind::ConfirmationRequest,
        },
        HandlerStatus::Success | HandlerStatus::Error | HandlerStatus::NeedsEscalation => EnvelopeKind::Information,
    }
}

fn build_envelope(response: &HandlerResponse, intent: &str, confidence: f64, flow_summary: &(Option<String>, Option<Value>)) -> Envelope {
    let kind = envelope_kind(response);
    let content = response.confirmation_data.clone().unwrap_or_else(|| Value::String(response.message.clone()));

    let mut extracted_slots = response.resolved_entities.clone();
    if let Some(step) = &flow_summary.1 {
        extracted_slots.insert("step".to_string(), step.clone());
    }

    let agent = if response.agent == "orchestrator" {
        response.agent.clone()
    } else {
        format!("{}_agent", response.agent)
    };

    let agent_output = if response.agent == "orchestrator" {
        None
    } else {
        Some(AgentOutput {
            agent_name: response.agent.clone(),
            detected_intent: intent.to_string(),
            confidence,
            required_slots: response.required_slots.clone(),
            action_type: response.side_effects.first().cloned(),
            preview_or_final: content.clone(),
            message_to_user: response.message.clone(),
            citations: response.citations.clone(),
        })
    };

    Envelope {
        kind,
        agent,
        content,
        metadata: EnvelopeMetadata {
            intent: intent.to_string(),
            confidence,
            active_flow: flow_summary.0.clone(),
            extracted_slots,
        },
        agent_output,
    }
}
