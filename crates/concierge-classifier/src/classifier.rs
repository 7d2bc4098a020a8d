use std::sync::Arc;

use concierge_core::Intent;
use concierge_llm::{ChatRequest, LlmProvider};
use tracing::{instrument, warn};

use crate::prompt::{build_user_prompt, SYSTEM_PROMPT};
use crate::regex_fallback::extract_email;
use crate::types::{Classification, Entities, RawClassification};

/// Classifies a student's message into the closed `Intent` set, grounded in
/// `concierge-llm`'s single-turn `ChatRequest`/`ChatResponse` shape (itself
/// generalized from `skynet-agent::provider`).
pub struct IntentClassifier {
    llm: Arc<dyn LlmProvider>,
    model: String,
}

impl IntentClassifier {
    pub fn new(llm: Arc<dyn LlmProvider>, model: impl Into<String>) -> Self {
        Self {
            llm,
            model: model.into(),
        }
    }

    /// Classify `message` given rendered conversation history. Non-JSON or
    /// unparseable LLM output becomes `UNKNOWN` with confidence 0, never an
    /// error — the orchestrator always gets a usable classification.
    #[instrument(skip(self, message, history_text), fields(model = %self.model))]
    pub async fn classify(&self, message: &str, history_text: &str) -> Classification {
        let req = ChatRequest::single_turn(
            self.model.clone(),
            SYSTEM_PROMPT,
            build_user_prompt(message, history_text),
        );

        let raw = match self.llm.send(&req).await {
            Ok(resp) => parse_raw(&resp.content),
            Err(e) => {
                warn!(error = %e, "classifier LLM call failed, defaulting to UNKNOWN");
                None
            }
        };

        let mut classification = match raw {
            Some(r) => {
                let intent = r.intent.parse().unwrap_or(Intent::Unknown);
                Classification {
                    intent,
                    confidence: r.confidence.clamp(0.0, 1.0),
                    entities: r.entities,
                    reasoning: r.reasoning,
                }
            }
            None => Classification {
                intent: Intent::Unknown,
                confidence: 0.0,
                entities: Entities::default(),
                reasoning: "classifier output was not valid JSON".to_string(),
            },
        };

        if classification.entities.email_address.is_none() {
            if let Some(email) = extract_email(message) {
                classification.entities.email_address = Some(email);
            }
        }

        classification
    }
}

fn parse_raw(content: &str) -> Option<RawClassification> {
    let trimmed = content.trim();
    let json_slice = extract_json_object(trimmed).unwrap_or(trimmed);
    serde_json::from_str(json_slice).ok()
}

/// Models sometimes wrap JSON in prose or code fences despite instructions;
/// take the outermost `{...}` span rather than rejecting on the first stray
/// character.
fn extract_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end > start {
        Some(&text[start..=end])
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use concierge_llm::FixtureProvider;

    fn classifier_with(responses: Vec<&str>) -> IntentClassifier {
        IntentClassifier::new(Arc::new(FixtureProvider::ok(responses)), "fixture-model")
    }

    #[tokio::test]
    async fn parses_strict_json_into_classification() {
        let classifier = classifier_with(vec![
            r#"{"intent": "EMAIL", "confidence": 0.9, "entities": {"email_address": null, "purpose": "fee refund"}, "reasoning": "student wants to email about fees"}"#,
        ]);
        let result = classifier.classify("email the accounts office about my fee refund", "").await;
        assert_eq!(result.intent, Intent::Email);
        assert_eq!(result.confidence, 0.9);
        assert_eq!(result.entities.purpose.as_deref(), Some("fee refund"));
    }

    #[tokio::test]
    async fn non_json_output_becomes_unknown_with_zero_confidence() {
        let classifier = classifier_with(vec!["I'm not sure what you mean."]);
        let result = classifier.classify("asdf", "").await;
        assert_eq!(result.intent, Intent::Unknown);
        assert_eq!(result.confidence, 0.0);
    }

    #[tokio::test]
    async fn regex_fallback_fills_missing_email() {
        let classifier = classifier_with(vec![
            r#"{"intent": "EMAIL", "confidence": 0.8, "entities": {}, "reasoning": "wants to email"}"#,
        ]);
        let result = classifier
            .classify("please email prof.rao@college.edu about attendance", "")
            .await;
        assert_eq!(result.entities.email_address.as_deref(), Some("prof.rao@college.edu"));
    }

    #[tokio::test]
    async fn llm_provided_email_is_not_overwritten_by_regex() {
        let classifier = classifier_with(vec![
            r#"{"intent": "EMAIL", "confidence": 0.8, "entities": {"email_address": "llm@college.edu"}, "reasoning": "x"}"#,
        ]);
        let result = classifier
            .classify("email regex-found@college.edu please", "")
            .await;
        assert_eq!(result.entities.email_address.as_deref(), Some("llm@college.edu"));
    }
}
