//! FAQ handler (§4.7.1). One-shot: no flow state survives past a single
//! turn. Handles the general policy-RAG case plus three special-cased
//! query kinds the Open Questions resolved to live here rather than behind
//! their own intents — quota status, sent-email history, and faculty
//! lookups (SPEC_FULL.md §9).

use std::sync::Arc;

use concierge_core::envelope::{HandlerResponse, HandlerStatus};
use concierge_core::{EmailHistory, FacultyDirectory, FacultyRecord};
use concierge_governance::GovernanceService;
use concierge_llm::{ChatRequest, LlmProvider};
use concierge_retrieval::RetrievalEngine;

const AGENT: &str = "faq";

const RAG_SYSTEM_PROMPT: &str = "You are a college support assistant. Answer the student's question using \
ONLY the provided context. If the context doesn't contain the answer, say you don't have that information \
and suggest they raise a ticket. Be concise and factual.";

/// Below this cosine similarity the top retrieved chunk isn't considered a
/// real match (§4.7.1 "low-confidence policy").
const MIN_RETRIEVAL_SCORE: f32 = 0.08;

const QUOTA_PHRASES: &[&str] = &[
    "how many emails",
    "how many tickets",
    "remaining quota",
    "my limit",
    "daily limit",
    "quota left",
    "emails left",
    "tickets left",
];
const HISTORY_PHRASES: &[&str] = &["sent emails", "email history", "emails i sent", "did i email", "emails have i sent"];
const FACULTY_PHRASES: &[&str] = &[
    "who is",
    "contact for",
    "contact details",
    "email address of",
    "email id of",
    "faculty",
    "professor",
    "hod",
    "dean",
];

pub struct FaqHandler {
    retrieval: Arc<RetrievalEngine>,
    llm: Arc<dyn LlmProvider>,
    model: String,
    governance: Arc<GovernanceService>,
    email_history: Arc<dyn EmailHistory>,
    faculty_dir: Arc<dyn FacultyDirectory>,
}

impl FaqHandler {
    pub fn new(
        retrieval: Arc<RetrievalEngine>,
        llm: Arc<dyn LlmProvider>,
        model: impl Into<String>,
        governance: Arc<GovernanceService>,
        email_history: Arc<dyn EmailHistory>,
        faculty_dir: Arc<dyn FacultyDirectory>,
    ) -> Self {
        Self {
            retrieval,
            llm,
            model: model.into(),
            governance,
            email_history,
            faculty_dir,
        }
    }

    pub async fn handle(&self, user_id: &str, message: &str) -> HandlerResponse {
        let lower = message.to_lowercase();

        if QUOTA_PHRASES.iter().any(|p| lower.contains(p)) {
            return self.answer_quota(user_id);
        }
        if HISTORY_PHRASES.iter().any(|p| lower.contains(p)) {
            return self.answer_history(user_id).await;
        }
        if FACULTY_PHRASES.iter().any(|p| lower.contains(p)) {
            return self.answer_faculty_lookup(message).await;
        }

        self.answer_from_corpus(message).await
    }

    fn answer_quota(&self, user_id: &str) -> HandlerResponse {
        let limits = self.governance.get_remaining_limits(user_id);
        let message = format!(
            "You have {}/{} emails and {}/{} tickets remaining today.",
            limits.emails_remaining, limits.emails_max, limits.tickets_remaining, limits.tickets_max
        );
        success(message)
    }

    async fn answer_history(&self, user_id: &str) -> HandlerResponse {
        match self.email_history.recent_for_user(user_id, 5).await {
            Ok(emails) if !emails.is_empty() => {
                let lines: Vec<String> = emails
                    .iter()
                    .map(|e| format!("- {} ({})", e.subject, e.sent_at.format("%Y-%m-%d")))
                    .collect();
                success(format!("Your recent emails:\n{}", lines.join("\n")))
            }
            Ok(_) => success("You haven't sent any emails through me yet.".to_string()),
            Err(_) => success("I couldn't load your email history right now. Please try again shortly.".to_string()),
        }
    }

    async fn answer_faculty_lookup(&self, message: &str) -> HandlerResponse {
        match self.faculty_dir.search(message).await {
            Ok(results) if !results.is_empty() => success(format_faculty(&results)),
            Ok(_) => success("I couldn't find anyone matching that in the faculty directory.".to_string()),
            Err(_) => success("The faculty directory is unavailable right now. Please try again shortly.".to_string()),
        }
    }

    async fn answer_from_corpus(&self, message: &str) -> HandlerResponse {
        let chunks = match self.retrieval.retrieve(message, 4) {
            Ok(c) => c,
            Err(_) => return needs_input("I don't have information on that yet. Could you rephrase, or would you like to raise a ticket instead?"),
        };

        let best_score = chunks.first().map(|c| c.score).unwrap_or(0.0);
        if chunks.is_empty() || best_score < MIN_RETRIEVAL_SCORE {
            return needs_input("I don't have information on that yet. Could you rephrase, or would you like to raise a ticket instead?");
        }

        let context = chunks
            .iter()
            .map(|c| format!("[{}]\n{}", c.source, c.text))
            .collect::<Vec<_>>()
            .join("\n\n");
        let citations: Vec<String> = chunks.iter().map(|c| c.source.clone()).collect();

        let prompt = format!("Context:\n{context}\n\nQuestion: {message}");
        let mut req = ChatRequest::single_turn(self.model.clone(), RAG_SYSTEM_PROMPT, prompt);
        req.temperature = 0.2;
        req.max_tokens = 400;

        let answer = match self.llm.send(&req).await {
            Ok(resp) => resp.content.trim().to_string(),
            Err(_) => "I found some relevant policy text but couldn't summarize it right now. Please try again shortly.".to_string(),
        };

        let mut response = success(answer);
        response.citations = citations;
        response
    }
}

fn format_faculty(records: &[FacultyRecord]) -> String {
    records
        .iter()
        .map(|r| format!("{} ({}) — {}", r.name, r.department, r.email))
        .collect::<Vec<_>>()
        .join("\n")
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

fn needs_input(message: &str) -> HandlerResponse {
    HandlerResponse {
        status: HandlerStatus::NeedsInput,
        agent: AGENT.to_string(),
        message: message.to_string(),
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
    fn quota_phrases_are_recognised() {
        assert!(QUOTA_PHRASES.iter().any(|p| "how many emails do I have left today?".to_lowercase().contains(p)));
    }

    #[test]
    fn format_faculty_lists_name_department_and_email() {
        let records = vec![FacultyRecord {
            name: "Dr. Rao".to_string(),
            email: "rao@college.edu".to_string(),
            department: "Computer Science".to_string(),
        }];
        let text = format_faculty(&records);
        assert!(text.contains("Dr. Rao"));
        assert!(text.contains("rao@college.edu"));
    }
}
