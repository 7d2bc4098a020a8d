//! Ticket category/subcategory/department/SLA constants. Ported verbatim
//! from `original_source/agents/ticket_config.py` — supplemental data the
//! distilled spec only gestures at via "a closed set" (§4.7.3).

/// `(category, subcategories)` pairs, in display order. `"Other"` is last
/// and is the category the preview generator falls back to.
pub const CATEGORIES: &[(&str, &[&str])] = &[
    (
        "Academic Support",
        &[
            "Assignment Issues",
            "Internal Marks / Grade Queries",
            "Subject / Elective Change",
            "Attendance Clarification",
            "Syllabus / Curriculum Clarification",
            "Faculty / Teaching Issues",
            "Lab / Practical Issues",
            "Timetable Issues",
        ],
    ),
    (
        "Examinations",
        &[
            "Hall Ticket Issues",
            "Exam Timetable Queries",
            "Re-evaluation / Recounting",
            "Supplementary Exams",
            "Result Discrepancy",
            "Exam Registration Issues",
        ],
    ),
    (
        "Fees & Finance",
        &[
            "Fee Payment Issues",
            "Fee Receipt Download",
            "Scholarship Issues",
            "Refund Requests",
            "Late Fee Clarification",
        ],
    ),
    (
        "IT Support",
        &[
            "Portal Login Issues",
            "College Email Issues",
            "Wi-Fi / Internet",
            "LMS / Online Classes",
            "Password Reset",
        ],
    ),
    (
        "Hostel & Transport",
        &[
            "Room Allocation / Change",
            "Maintenance Issues",
            "Food / Mess Issues",
            "Bus Timings",
            "Route Change",
        ],
    ),
    (
        "Certificates",
        &[
            "Bonafide Certificate",
            "Transfer Certificate",
            "Character Certificate",
            "Degree / Provisional Certificate",
            "Internship / NOC Letter",
        ],
    ),
    (
        "Health & Counseling",
        &[
            "Medical Emergency",
            "Counseling Request",
            "Mental Health Support",
            "Medical Leave",
        ],
    ),
    (
        "Library",
        &["Book Issue / Return", "Fine Clarification", "Digital Resources"],
    ),
    (
        "Placements & Internships",
        &["Placement Registration", "Eligibility Queries", "Internship Approval"],
    ),
    ("Other", &["General Query", "Complaint", "Suggestion"]),
];

pub const DEPARTMENT_MAPPING: &[(&str, &str)] = &[
    ("Academic Support", "Academic Department"),
    ("Examinations", "Examination Cell"),
    ("Fees & Finance", "Finance Office"),
    ("IT Support", "IT Department"),
    ("Hostel & Transport", "Hostel & Transport Office"),
    ("Certificates", "Administration Office"),
    ("Health & Counseling", "Health & Counseling Center"),
    ("Library", "Library"),
    ("Placements & Internships", "Training & Placement Office"),
    ("Other", "General Administration"),
];

pub const SLA_HOURS: &[(&str, u32)] = &[("Low", 72), ("Medium", 48), ("High", 24), ("Urgent", 4)];

pub const PRIORITY_LEVELS: &[&str] = &["Low", "Medium", "High", "Urgent"];

pub const TICKET_STATUSES: &[&str] = &["Open", "Assigned", "In Progress", "Resolved", "Closed", "Cancelled"];

pub const ALLOWED_FILE_TYPES: &[&str] = &["pdf", "jpg", "jpeg", "png"];
pub const MAX_FILE_SIZE_MB: u32 = 5;
pub const MAX_FILES_PER_TICKET: usize = 3;

/// Keywords that force priority to Urgent and bypass the quota gate (§4.7.3, §4.9).
pub const SENSITIVE_KEYWORDS: &[&str] = &["harassment", "ragging", "bullying", "threat", "sexual"];

/// Validate `category` against the closed set, falling back to `"Other"`.
pub fn normalize_category(category: &str) -> &'static str {
    CATEGORIES
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(category))
        .map(|(name, _)| *name)
        .unwrap_or("Other")
}

/// First subcategory of `category`'s static subcategory list.
pub fn default_sub_category(category: &str) -> &'static str {
    CATEGORIES
        .iter()
        .find(|(name, _)| *name == category)
        .and_then(|(_, subs)| subs.first())
        .copied()
        .unwrap_or("General Query")
}

pub fn department_for(category: &str) -> &'static str {
    DEPARTMENT_MAPPING
        .iter()
        .find(|(name, _)| *name == category)
        .map(|(_, dept)| *dept)
        .unwrap_or("General Administration")
}

pub fn sla_hours_for(priority: &str) -> u32 {
    SLA_HOURS
        .iter()
        .find(|(name, _)| *name == priority)
        .map(|(_, hours)| *hours)
        .unwrap_or(72)
}

/// True if `text` contains any sensitive-complaint keyword (case-insensitive).
pub fn contains_sensitive_keyword(text: &str) -> bool {
    let lower = text.to_lowercase();
    SENSITIVE_KEYWORDS.iter().any(|kw| lower.contains(kw))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_category_falls_back_to_other() {
        assert_eq!(normalize_category("Made Up Category"), "Other");
    }

    #[test]
    fn default_sub_category_is_first_in_list() {
        assert_eq!(default_sub_category("IT Support"), "Portal Login Issues");
    }

    #[test]
    fn sensitive_keyword_detection_is_case_insensitive() {
        assert!(contains_sensitive_keyword("I want to report HARASSMENT by my TA"));
        assert!(!contains_sensitive_keyword("my wifi is not working"));
    }
}
