use regex::Regex;
use std::sync::OnceLock;

fn email_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}").expect("static regex is valid")
    })
}

/// Find the first RFC-ish email address in `message`, if any.
pub fn extract_email(message: &str) -> Option<String> {
    email_pattern().find(message).map(|m| m.as_str().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_email_in_free_text() {
        let found = extract_email("please email prof.sharma@college.edu about my grade");
        assert_eq!(found.as_deref(), Some("prof.sharma@college.edu"));
    }

    #[test]
    fn returns_none_without_an_email() {
        assert_eq!(extract_email("I need help with my fee refund"), None);
    }
}
