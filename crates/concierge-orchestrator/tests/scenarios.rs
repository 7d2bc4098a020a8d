//! End-to-end orchestrator tests for the FAQ and email-happy-path
//! scenarios of spec §8 (S1, S2 T1/T2). Wires every collaborator together
//! with in-memory/fixture backends exactly as `concierge-gateway::app`
//! does it for a real deployment, so these exercise the full
//! classify → dispatch → handler → executor → persist sequence rather
//! than any single crate in isolation.

use std::sync::Arc;

use concierge_classifier::IntentClassifier;
use concierge_core::mocks::{InMemoryTicketStore, LoggingEmailSender, StaticFacultyDirectory};
use concierge_core::{EmailHistory, EmailSender, FacultyDirectory, SessionId, StudentProfile, TicketStore, UserId};
use concierge_dedup::DedupCache;
use concierge_executor::SideEffectExecutor;
use concierge_flows::{EmailDraftGenerator, EmailHandler, FaqHandler, TicketHandler, TicketStatusHandler};
use concierge_flowstore::FlowStore;
use concierge_governance::GovernanceService;
use concierge_llm::FixtureProvider;
use concierge_memory::MemoryStore;
use concierge_orchestrator::Orchestrator;
use concierge_retrieval::RetrievalEngine;
use concierge_turnlog::TurnLog;

const POLICY_TEXT: &str = "The college attendance policy requires every student to maintain a minimum \
of 75 percent attendance in each course to remain eligible to sit for the semester examinations. \
Students who fall below this threshold must apply for condonation through the department office.";

fn build_orchestrator(llm_responses: Vec<&str>) -> (Orchestrator, Arc<LoggingEmailSender>, Arc<GovernanceService>, Arc<FlowStore>) {
    let memory_conn = rusqlite::Connection::open_in_memory().unwrap();
    concierge_memory::db::init_db(&memory_conn).unwrap();
    let memory = Arc::new(MemoryStore::new(memory_conn));

    let governance_conn = rusqlite::Connection::open_in_memory().unwrap();
    concierge_governance::db::init_db(&governance_conn).unwrap();
    let governance = Arc::new(GovernanceService::new(governance_conn, chrono_tz::Asia::Kolkata, 5, 3));

    let retrieval_conn = rusqlite::Connection::open_in_memory().unwrap();
    concierge_retrieval::db::init_db(&retrieval_conn).unwrap();
    let retrieval = Arc::new(RetrievalEngine::new(retrieval_conn));
    retrieval.index_corpus("attendance_policy", POLICY_TEXT, 500, 50).unwrap();

    let turn_log_dir = tempfile::tempdir().unwrap();
    let turn_log = Arc::new(TurnLog::open(turn_log_dir.path().join("turnlog.jsonl")).unwrap());

    let flow_store = Arc::new(FlowStore::new(30));
    let dedup = Arc::new(DedupCache::new(30));

    let llm = Arc::new(FixtureProvider::ok(llm_responses));
    let model = "fixture-model".to_string();

    let email_sender = Arc::new(LoggingEmailSender::default());
    let ticket_store = Arc::new(InMemoryTicketStore::default());
    let faculty_dir: Arc<dyn FacultyDirectory> = Arc::new(StaticFacultyDirectory::default());

    let classifier = Arc::new(IntentClassifier::new(llm.clone(), model.clone()));

    let email_history: Arc<dyn EmailHistory> = email_sender.clone();
    let faq = Arc::new(FaqHandler::new(
        retrieval,
        llm.clone(),
        model.clone(),
        governance.clone(),
        email_history,
        faculty_dir.clone(),
    ));
    let email = Arc::new(EmailHandler::new(
        faculty_dir,
        EmailDraftGenerator::new(llm.clone(), model.clone(), 0.2),
        flow_store.clone(),
    ));
    let ticket = Arc::new(TicketHandler::new(llm.clone(), model.clone(), flow_store.clone()));
    let ticket_status = Arc::new(TicketStatusHandler::new(ticket_store.clone()));

    let email_collaborator: Arc<dyn EmailSender> = email_sender.clone();
    let ticket_collaborator: Arc<dyn TicketStore> = ticket_store;
    let executor = Arc::new(SideEffectExecutor::new(
        email_collaborator,
        ticket_collaborator,
        governance.clone(),
        flow_store.clone(),
    ));

    let orchestrator = Orchestrator::new(
        flow_store.clone(),
        memory,
        classifier,
        dedup,
        executor,
        turn_log,
        faq,
        email,
        ticket,
        ticket_status,
    );

    (orchestrator, email_sender, governance, flow_store)
}

fn profile() -> StudentProfile {
    StudentProfile {
        user_id: UserId::from("u1"),
        email: "u1@college.edu".to_string(),
        name: Some("Asha".to_string()),
    }
}

/// S1 — a policy question is answered from the corpus, with citations, and
/// leaves no flow state paused afterward.
#[tokio::test]
async fn s1_faq_answered_with_citations_and_no_residual_flow() {
    let classify_json = r#"{"intent": "FAQ", "confidence": 0.9, "entities": {}, "reasoning": "policy question"}"#;
    let rag_answer = "Students must maintain at least 75% attendance in each course to sit the semester exams.";
    let (orchestrator, _email, _gov, flow_store) = build_orchestrator(vec![classify_json, rag_answer]);

    let session = SessionId::from("s1");
    let envelope = orchestrator.process_message(&session, &profile(), "What is the attendance policy?").await;

    assert_eq!(envelope.agent, "faq_agent");
    assert!(envelope.agent_output.as_ref().map(|o| !o.citations.is_empty()).unwrap_or(false));
    assert!(!flow_store.has(&session, "active"));
}

/// S2 (T1/T2) — an email is previewed then confirmed: the collaborator is
/// called with exactly the previewed recipient/subject, the daily counter
/// moves by one, and the active flow is cleared afterward.
#[tokio::test]
async fn s2_email_happy_path_sends_previewed_draft_and_clears_flow() {
    let classify_json = r#"{"intent": "EMAIL", "confidence": 0.92, "entities": {"email_address": "friend@gmail.com", "purpose": "the seminar tomorrow"}, "reasoning": "wants to email a friend"}"#;
    let subject = "Regarding tomorrow's seminar";
    let body = "Dear Sir/Madam,\n\nI wanted to let you know about the seminar happening tomorrow and invite you along.";
    let (orchestrator, email_sender, governance, flow_store) = build_orchestrator(vec![classify_json, subject, body]);

    let session = SessionId::from("s2");
    let preview = orchestrator
        .process_message(&session, &profile(), "Send an email to friend@gmail.com about the seminar tomorrow")
        .await;

    assert_eq!(preview.agent, "email_agent");
    assert_eq!(preview.metadata.active_flow.as_deref(), Some("email"));
    let preview_to = preview.content.get("to").and_then(|v| v.as_str()).unwrap().to_string();
    let preview_subject = preview.content.get("subject").and_then(|v| v.as_str()).unwrap().to_string();
    assert_eq!(preview_to, "friend@gmail.com");

    let confirmed = orchestrator.process_message(&session, &profile(), "send").await;

    assert!(confirmed.content.as_str().map(|s| s.contains(&preview_subject)).unwrap_or(false));
    assert!(!flow_store.has(&session, "active"), "active flow must be cleared after a successful send");

    let sent = email_sender.recent_for_user("u1", 5).await.unwrap();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].to, "friend@gmail.com");
    assert_eq!(sent[0].subject, preview_subject);

    let limits = governance.get_remaining_limits("u1");
    assert_eq!(limits.emails_remaining, 4, "exactly one email must be counted against today's quota");
}
