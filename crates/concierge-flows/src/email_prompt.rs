//! Email subject/body generation (§4.7.2 "Preview generation"). Grounded in
//! `original_source/agents/email_agent.py`'s `generate_email_subject`/
//! `generate_email_body` — same strict-purpose-preservation prompt rules,
//! first-person-singular voice, and length bands, routed through
//! `concierge-llm::LlmProvider` instead of a direct Groq SDK call.

use std::sync::Arc;

use concierge_llm::{ChatRequest, LlmProvider};

const SUBJECT_SYSTEM_PROMPT: &str = "You are a strict email subject line generator. Your ONLY job is to preserve the user's purpose exactly. NEVER change topics, NEVER add creativity. Use verbatim phrases from the purpose.";

const BODY_SYSTEM_PROMPT_PREFIX: &str = "You are a strict email writer. You MUST preserve the user's exact purpose. You MUST write as an individual using 'I', never as an institution. You MUST match the requested length exactly. NEVER add creativity or expand beyond what's requested.";

/// Requested body length band (§4.7.2: short 3–4 sentences, medium 5–7,
/// detailed 10–12). Defaults to medium when the purpose gives no hint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LengthBand {
    Short,
    Medium,
    Detailed,
}

impl LengthBand {
    fn guidance(&self) -> &'static str {
        match self {
            LengthBand::Short => "EXACTLY 3-4 short sentences. Be extremely concise. NO explanations, NO extra details.",
            LengthBand::Medium => "EXACTLY 5-7 sentences. Provide sufficient context but remain brief.",
            LengthBand::Detailed => "EXACTLY 10-12 sentences. Include thorough details and explanations.",
        }
    }

    fn max_tokens(&self) -> u32 {
        match self {
            LengthBand::Short => 150,
            LengthBand::Medium => 300,
            LengthBand::Detailed => 500,
        }
    }
}

/// Infer a length band from hints in the purpose text ("briefly", "in
/// detail", ...); defaults to medium.
pub fn infer_length_band(purpose: &str) -> LengthBand {
    let lower = purpose.to_lowercase();
    if lower.contains("brief") || lower.contains("short") || lower.contains("quick") {
        LengthBand::Short
    } else if lower.contains("detail") || lower.contains("thorough") || lower.contains("comprehensive") {
        LengthBand::Detailed
    } else {
        LengthBand::Medium
    }
}

/// Leading phrases stripped before treating the remainder as the purpose
/// proper (§4.7.2 "Sanitizes the purpose").
const STRIP_PREFIXES: &[&str] = &[
    "send email to",
    "send an email to",
    "email to",
    "email about",
    "send email about",
];

/// Strip a leading "send email to X about"/"email about" prefix and any
/// recipient mention so the purpose generator sees only the topic.
pub fn sanitize_purpose(raw: &str, recipient_hint: Option<&str>) -> String {
    let mut text = raw.trim().to_string();
    let lower = text.to_lowercase();
    for prefix in STRIP_PREFIXES {
        if lower.starts_with(prefix) {
            text = text[prefix.len()..].trim().to_string();
            break;
        }
    }
    if let Some(hint) = recipient_hint {
        if !hint.is_empty() {
            text = text.replace(hint, "").trim().to_string();
        }
    }
    text.trim_start_matches(|c: char| c == ',' || c.is_whitespace()).to_string()
}

/// Generator for email previews. Holds the shared LLM provider; the
/// regenerate-temperature knob is passed per-call from `ConciergeConfig`.
pub struct EmailDraftGenerator {
    llm: Arc<dyn LlmProvider>,
    model: String,
    regenerate_temperature_bump: f32,
}

impl EmailDraftGenerator {
    pub fn new(llm: Arc<dyn LlmProvider>, model: impl Into<String>, regenerate_temperature_bump: f32) -> Self {
        Self {
            llm,
            model: model.into(),
            regenerate_temperature_bump,
        }
    }

    /// Generate a subject line, regenerating once if it fails validation
    /// (bare name, command verb, or under 5 characters — §4.7.2).
    pub async fn generate_subject(&self, purpose: &str, regenerate: bool) -> String {
        let subject = self.call_subject(purpose, regenerate).await;
        if is_valid_subject(&subject) {
            subject
        } else {
            self.call_subject(purpose, true).await
        }
    }

    async fn call_subject(&self, purpose: &str, regenerate: bool) -> String {
        let temperature = base_temperature(regenerate, self.regenerate_temperature_bump, 0.2);
        let prompt = format!(
            "Generate a concise email subject line based STRICTLY on this purpose:\n\n\
             Purpose: {purpose}\n\n\
             CRITICAL RULES (DO NOT VIOLATE):\n\
             1. Subject MUST directly reflect the purpose - NO creativity, NO topic changes\n\
             2. At least one noun phrase from the purpose MUST appear VERBATIM in the subject\n\
             3. Subject must be 6-10 words maximum\n\
             4. Use professional, clear language\n\
             5. DO NOT add information not in the purpose\n\
             6. DO NOT paraphrase the core topic (keep key nouns/verbs unchanged)\n\n\
             Generate ONLY the subject line, nothing else."
        );
        let mut req = ChatRequest::single_turn(self.model.clone(), SUBJECT_SYSTEM_PROMPT, prompt);
        req.temperature = temperature;
        req.max_tokens = 30;

        match self.llm.send(&req).await {
            Ok(resp) => clean_quotes(resp.content.trim()),
            Err(_) => fallback_subject(purpose),
        }
    }

    /// Generate a body in first-person voice, matching `length`. Callers
    /// validate meta-tag absence via [`strip_meta_tags`] before use.
    pub async fn generate_body(
        &self,
        purpose: &str,
        recipient_name: &str,
        length: LengthBand,
        regenerate: bool,
    ) -> String {
        let temperature = base_temperature(regenerate, self.regenerate_temperature_bump, 0.2);
        let recipient = if recipient_name.is_empty() { "Sir/Madam" } else { recipient_name };
        let prompt = format!(
            "Generate a professional email body for this EXACT purpose:\n\n\
             Purpose: {purpose}\n\
             Recipient: {recipient}\n\n\
             Length Guidance: {}\n\n\
             CRITICAL RULES - VIOLATION WILL CAUSE FAILURE:\n\
             1. PURPOSE PRESERVATION: write ONLY about the stated purpose, nothing more.\n\
             2. FIRST-PERSON VOICE (MANDATORY): always \"I\"/\"my\"; NEVER \"we\"/\"our college\"/\"the institution\". \
                The sender is an individual student, not an institution.\n\
             3. NO CREATIVE EXPANSION: no bullet points, no extra explanations or examples.\n\
             4. LENGTH ENFORCEMENT: match the guidance above exactly.\n\
             5. GREETING CONSTRAINT: one line only, \"Dear {recipient},\" — no extra pleasantries.\n\
             6. PLAIN TEXT: no HTML, no meta tags like [..] or {{..}} or \"Note:\"/\"System:\".\n\n\
             Generate ONLY the email body (greeting + content), NO signature.",
            length.guidance()
        );
        let mut req = ChatRequest::single_turn(
            self.model.clone(),
            format!("{BODY_SYSTEM_PROMPT_PREFIX} Length band: {length:?}."),
            prompt,
        );
        req.temperature = temperature;
        req.max_tokens = length.max_tokens();

        let body = match self.llm.send(&req).await {
            Ok(resp) => resp.content.trim().to_string(),
            Err(_) => fallback_body(purpose, recipient),
        };
        strip_meta_tags(&body)
    }
}

fn base_temperature(regenerate: bool, bump: f32, base: f32) -> f32 {
    if regenerate {
        base + bump
    } else {
        base
    }
}

fn clean_quotes(s: &str) -> String {
    s.trim_matches('"').trim_matches('\'').to_string()
}

fn fallback_subject(purpose: &str) -> String {
    let words: Vec<&str> = purpose.split_whitespace().take(8).collect();
    capitalize(&words.join(" "))
}

fn fallback_body(purpose: &str, recipient: &str) -> String {
    format!("Dear {recipient},\n\nI am writing to you regarding: {purpose}")
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

/// §4.7.2: reject a subject that is a bare name, a command verb, or
/// shorter than 5 characters.
pub fn is_valid_subject(subject: &str) -> bool {
    let trimmed = subject.trim();
    if trimmed.chars().count() < 5 {
        return false;
    }
    let lower = trimmed.to_lowercase();
    const COMMAND_VERBS: &[&str] = &["send", "write", "draft", "compose", "email"];
    if COMMAND_VERBS.contains(&lower.as_str()) {
        return false;
    }
    // A "bare name" heuristic: every word capitalized, no verb/punctuation,
    // and at most three words (e.g. "Professor Rao Kumar").
    let words: Vec<&str> = trimmed.split_whitespace().collect();
    let looks_like_bare_name = words.len() <= 3
        && words.iter().all(|w| w.chars().next().map(|c| c.is_uppercase()).unwrap_or(false))
        && !trimmed.contains(':');
    !looks_like_bare_name
}

/// §4.7.2: strip anything in `[...]`, `{...}`, or a leading "Note:"/"System:"
/// line the model added despite instructions.
pub fn strip_meta_tags(body: &str) -> String {
    let bracket_stripped = strip_delimited(&strip_delimited(body, '[', ']'), '{', '}');
    bracket_stripped
        .lines()
        .filter(|line| {
            let lower = line.trim().to_lowercase();
            !lower.starts_with("note:") && !lower.starts_with("system:")
        })
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

fn strip_delimited(text: &str, open: char, close: char) -> String {
    let mut out = String::with_capacity(text.len());
    let mut depth = 0i32;
    for c in text.chars() {
        if c == open {
            depth += 1;
            continue;
        }
        if c == close && depth > 0 {
            depth -= 1;
            continue;
        }
        if depth == 0 {
            out.push(c);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitizes_common_purpose_prefixes() {
        assert_eq!(
            sanitize_purpose("send email to Dr. Rao about my internship letter", None),
            "Dr. Rao about my internship letter"
        );
        assert_eq!(sanitize_purpose("email about the seminar tomorrow", None), "the seminar tomorrow");
    }

    #[test]
    fn bare_name_subjects_are_rejected() {
        assert!(!is_valid_subject("Dr Kumar"));
        assert!(!is_valid_subject("Send"));
        assert!(!is_valid_subject("Hi"));
        assert!(is_valid_subject("Request for Internship Letter Approval"));
    }

    #[test]
    fn meta_tags_are_stripped_from_body() {
        let body = "Dear Sir,\n\n[System note] I am writing about fees.\nNote: this is a draft.\nBest,\nStudent";
        let cleaned = strip_meta_tags(body);
        assert!(!cleaned.contains("[System note]"));
        assert!(!cleaned.to_lowercase().contains("note:"));
    }

    #[test]
    fn length_band_is_inferred_from_purpose_hints() {
        assert_eq!(infer_length_band("briefly explain the issue"), LengthBand::Short);
        assert_eq!(infer_length_band("in detail, describe my situation"), LengthBand::Detailed);
        assert_eq!(infer_length_band("about the seminar"), LengthBand::Medium);
    }
}
