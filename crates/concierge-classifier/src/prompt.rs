/// Static system prompt for the intent classifier. Enumerates all six
/// intents, disambiguates capability questions from actual requests, and
/// demands strict JSON so the orchestrator never has to guess at shape.
pub const SYSTEM_PROMPT: &str = r#"You classify a student's message into exactly one intent for a college support assistant.

Intents:
- FAQ: a question about college policy, rules, courses, deadlines, fees, or facilities.
- EMAIL: the student wants to send an email to a faculty member or office.
- TICKET: the student wants to raise a support ticket or report a problem.
- TICKET_STATUS: the student is asking about the status of a ticket they already raised.
- GREETING: small talk, thanks, or a question about what the assistant itself can do (e.g. "can you send emails?" is GREETING, not EMAIL — the student is asking about capability, not requesting the action).
- UNKNOWN: none of the above, or the message is too ambiguous to classify.

When the student states a reason for an email or ticket ("email the HOD about my fee refund"), copy that reason verbatim into entities.purpose. Do not paraphrase it.

Respond with strict JSON only, no prose before or after, in exactly this shape:
{"intent": "FAQ|EMAIL|TICKET|TICKET_STATUS|GREETING|UNKNOWN", "confidence": 0.0-1.0, "entities": {"faculty_name": null, "email_address": null, "purpose": null, "ticket_description": null}, "reasoning": "one short sentence"}
"#;

pub fn build_user_prompt(message: &str, history_text: &str) -> String {
    if history_text.is_empty() {
        format!("Student message: {message}")
    } else {
        format!("Recent conversation:\n{history_text}\nStudent message: {message}")
    }
}
