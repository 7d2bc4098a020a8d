use std::path::Path;
use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use concierge_core::config::ConciergeConfig;
use concierge_core::mocks::{InMemoryTicketStore, LoggingEmailSender, StaticFacultyDirectory};
use concierge_core::{EmailSender, FacultyDirectory, TicketStore};
use concierge_dedup::DedupCache;
use concierge_executor::SideEffectExecutor;
use concierge_flows::{EmailDraftGenerator, EmailHandler, FaqHandler, TicketHandler, TicketStatusHandler};
use concierge_flowstore::FlowStore;
use concierge_governance::GovernanceService;
use concierge_llm::{FixtureProvider, LlmProvider, OpenAiCompatProvider};
use concierge_memory::MemoryStore;
use concierge_orchestrator::Orchestrator;
use concierge_retrieval::RetrievalEngine;
use concierge_turnlog::TurnLog;

/// Central shared state for every Axum handler. Grounded in
/// `skynet_gateway::app::AppState` — one struct holding every manager
/// `Arc`, assembled once at startup and never re-created. Unlike the
/// teacher, this crate has no separate runtime-builder module, so the
/// managers are wired up inline in the constructor rather than passed in
/// already built.
pub struct AppState {
    pub config: ConciergeConfig,
    pub orchestrator: Orchestrator,
    pub memory: Arc<MemoryStore>,
}

impl AppState {
    pub fn new(config: ConciergeConfig) -> anyhow::Result<Self> {
        if let Some(parent) = Path::new(&config.database.path).parent() {
            std::fs::create_dir_all(parent)?;
        }

        let memory_conn = rusqlite::Connection::open(&config.database.path)?;
        concierge_memory::db::init_db(&memory_conn)?;
        let memory = Arc::new(MemoryStore::new(memory_conn));

        let governance_conn = rusqlite::Connection::open(&config.database.path)?;
        concierge_governance::db::init_db(&governance_conn)?;
        let governance = Arc::new(GovernanceService::new(
            governance_conn,
            config.quotas.timezone(),
            config.quotas.email_daily_max,
            config.quotas.ticket_daily_max,
        ));

        let retrieval_conn = rusqlite::Connection::open(&config.database.path)?;
        concierge_retrieval::db::init_db(&retrieval_conn)?;
        let retrieval = Arc::new(RetrievalEngine::new(retrieval_conn));
        load_corpus(&retrieval, &config);

        let turn_log_path = turn_log_path(&config.database.path);
        let turn_log = Arc::new(TurnLog::open(turn_log_path)?);

        let flow_store = Arc::new(FlowStore::new(config.flow.inactivity_ttl_minutes));
        let dedup = Arc::new(DedupCache::new(config.dedup.ttl_secs));

        let llm = build_llm_provider(&config);
        let model = config.llm.model.clone();

        let email_sender: Arc<LoggingEmailSender> = Arc::new(LoggingEmailSender::default());
        let ticket_store: Arc<InMemoryTicketStore> = Arc::new(InMemoryTicketStore::default());
        let faculty_dir: Arc<dyn FacultyDirectory> = Arc::new(StaticFacultyDirectory::default());

        let classifier = Arc::new(concierge_classifier::IntentClassifier::new(llm.clone(), model.clone()));

        let faq = Arc::new(FaqHandler::new(
            retrieval,
            llm.clone(),
            model.clone(),
            governance.clone(),
            email_sender.clone(),
            faculty_dir.clone(),
        ));
        let email = Arc::new(EmailHandler::new(
            faculty_dir,
            EmailDraftGenerator::new(llm.clone(), model.clone(), config.flow.regenerate_temperature_bump as f32),
            flow_store.clone(),
        ));
        let ticket = Arc::new(TicketHandler::new(llm.clone(), model.clone(), flow_store.clone()));
        let ticket_status = Arc::new(TicketStatusHandler::new(ticket_store.clone()));

        let email_collaborator: Arc<dyn EmailSender> = email_sender;
        let ticket_collaborator: Arc<dyn TicketStore> = ticket_store;
        let executor = Arc::new(SideEffectExecutor::new(
            email_collaborator,
            ticket_collaborator,
            governance,
            flow_store.clone(),
        ));

        let orchestrator = Orchestrator::new(
            flow_store,
            memory.clone(),
            classifier,
            dedup,
            executor,
            turn_log,
            faq,
            email,
            ticket,
            ticket_status,
        );

        Ok(Self {
            config,
            orchestrator,
            memory,
        })
    }
}

/// `OpenAiCompatProvider` when an API key is configured; otherwise a
/// `FixtureProvider` that always reports itself unavailable, so a
/// misconfigured deployment degrades to clarification responses (§7
/// `classifier_unavailable`) instead of panicking at startup.
fn build_llm_provider(config: &ConciergeConfig) -> Arc<dyn LlmProvider> {
    match &config.llm.api_key {
        Some(key) if !key.is_empty() => Arc::new(OpenAiCompatProvider::new("openai-compat", key.clone(), config.llm.base_url.clone())),
        _ => {
            tracing::warn!("no LLM api_key configured, classifier and generators will report unavailable");
            Arc::new(FixtureProvider::failing("no LLM provider configured"))
        }
    }
}

/// Load the policy corpus into C3 once at startup (§4.3, mirroring
/// `original_source/agents/vector_store.py`'s `initialize_vectorstore`).
/// Skips both the file read and the (re-)embedding pass if the source is
/// already indexed, so a restart never re-embeds. A missing or unreadable
/// corpus file is logged and left for an operator to fix — the FAQ handler
/// already degrades gracefully to "couldn't find specific information" with
/// no chunks indexed (§7 `retrieval_unavailable`).
fn load_corpus(retrieval: &RetrievalEngine, config: &ConciergeConfig) {
    let Some(path) = &config.retrieval.corpus_path else {
        return;
    };
    if retrieval.is_indexed(&config.retrieval.corpus_source) {
        return;
    }
    match std::fs::read_to_string(path) {
        Ok(text) => match retrieval.index_corpus(&config.retrieval.corpus_source, &text, config.retrieval.chunk_size, config.retrieval.chunk_overlap) {
            Ok(n) => tracing::info!(path, chunks = n, "indexed policy corpus"),
            Err(e) => tracing::error!(path, error = %e, "failed to index policy corpus"),
        },
        Err(e) => tracing::warn!(path, error = %e, "policy corpus file not found, FAQ answers will have no grounding"),
    }
}

fn turn_log_path(db_path: &str) -> std::path::PathBuf {
    let path = Path::new(db_path);
    match path.parent() {
        Some(dir) => dir.join("turnlog.jsonl"),
        None => std::path::PathBuf::from("turnlog.jsonl"),
    }
}

/// Assemble the full Axum router (§6.1 — the three `/chat/*` routes).
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(crate::http::health::health_handler))
        .route("/chat/orchestrator", post(crate::http::chat::orchestrator_handler))
        .route("/chat/confirm-action", post(crate::http::chat::confirm_action_handler))
        .route("/chat/session/{session_id}", get(crate::http::chat::session_handler))
        .with_state(state)
        .layer(tower_http::trace::TraceLayer::new_for_http())
}
