use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

pub const EMAIL_DAILY_MAX: u32 = 5;
pub const TICKET_DAILY_MAX: u32 = 3;

/// Top-level config (concierge.toml + CONCIERGE_* env overrides), mirroring
/// `skynet_core::config::SkynetConfig::load`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConciergeConfig {
    #[serde(default)]
    pub gateway: GatewayConfig,
    #[serde(default)]
    pub quotas: QuotasConfig,
    #[serde(default)]
    pub flow: FlowConfig,
    #[serde(default)]
    pub dedup: DedupConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub llm: LlmConfig,
}

impl Default for ConciergeConfig {
    fn default() -> Self {
        Self {
            gateway: GatewayConfig::default(),
            quotas: QuotasConfig::default(),
            flow: FlowConfig::default(),
            dedup: DedupConfig::default(),
            retrieval: RetrievalConfig::default(),
            database: DatabaseConfig::default(),
            llm: LlmConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            bind: default_bind(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuotasConfig {
    #[serde(default = "default_email_max")]
    pub email_daily_max: u32,
    #[serde(default = "default_ticket_max")]
    pub ticket_daily_max: u32,
    /// Fixed civil timezone used for day-boundary rollover (§4.4, §6.3).
    #[serde(default = "default_civil_timezone")]
    pub civil_timezone: String,
}

impl Default for QuotasConfig {
    fn default() -> Self {
        Self {
            email_daily_max: default_email_max(),
            ticket_daily_max: default_ticket_max(),
            civil_timezone: default_civil_timezone(),
        }
    }
}

impl QuotasConfig {
    pub fn timezone(&self) -> chrono_tz::Tz {
        self.civil_timezone
            .parse()
            .unwrap_or(chrono_tz::Asia::Kolkata)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlowConfig {
    /// Inactivity TTL in minutes before a paused flow may no longer resume.
    #[serde(default = "default_flow_ttl_minutes")]
    pub inactivity_ttl_minutes: i64,
    /// Temperature bump applied when the email draft generator regenerates
    /// a preview (§9 open question — kept as a knob).
    #[serde(default = "default_regenerate_temperature_bump")]
    pub regenerate_temperature_bump: f64,
}

impl Default for FlowConfig {
    fn default() -> Self {
        Self {
            inactivity_ttl_minutes: default_flow_ttl_minutes(),
            regenerate_temperature_bump: default_regenerate_temperature_bump(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DedupConfig {
    #[serde(default = "default_dedup_ttl_secs")]
    pub ttl_secs: i64,
}

impl Default for DedupConfig {
    fn default() -> Self {
        Self {
            ttl_secs: default_dedup_ttl_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    #[serde(default = "default_retrieval_k")]
    pub k: usize,
    /// FAQ may override k to this for course/program queries (§6.3).
    #[serde(default = "default_retrieval_k_extended")]
    pub k_extended: usize,
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,
    /// Path to the policy-corpus text file loaded into C3 at startup
    /// (mirrors `original_source/agents/vector_store.py`'s
    /// `initialize_vectorstore`). `None` skips indexing.
    #[serde(default = "default_corpus_path")]
    pub corpus_path: Option<String>,
    /// Source label the corpus is indexed and cited under.
    #[serde(default = "default_corpus_source")]
    pub corpus_source: String,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            k: default_retrieval_k(),
            k_extended: default_retrieval_k_extended(),
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
            corpus_path: default_corpus_path(),
            corpus_source: default_corpus_source(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_model")]
    pub model: String,
    pub api_key: Option<String>,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            model: default_model(),
            api_key: None,
        }
    }
}

fn default_port() -> u16 {
    8089
}
fn default_bind() -> String {
    "127.0.0.1".to_string()
}
fn default_email_max() -> u32 {
    EMAIL_DAILY_MAX
}
fn default_ticket_max() -> u32 {
    TICKET_DAILY_MAX
}
fn default_civil_timezone() -> String {
    "Asia/Kolkata".to_string()
}
fn default_flow_ttl_minutes() -> i64 {
    30
}
fn default_regenerate_temperature_bump() -> f64 {
    0.2
}
fn default_dedup_ttl_secs() -> i64 {
    30
}
fn default_retrieval_k() -> usize {
    5
}
fn default_retrieval_k_extended() -> usize {
    7
}
fn default_chunk_size() -> usize {
    500
}
fn default_chunk_overlap() -> usize {
    50
}
fn default_corpus_path() -> Option<String> {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    Some(format!("{}/.concierge/college_rules.txt", home))
}
fn default_corpus_source() -> String {
    "college_rules.txt".to_string()
}
fn default_db_path() -> String {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    format!("{}/.concierge/concierge.db", home)
}
fn default_base_url() -> String {
    "https://api.groq.com/openai/v1".to_string()
}
fn default_model() -> String {
    "llama-3.3-70b-versatile".to_string()
}

impl ConciergeConfig {
    /// Load config from a TOML file with CONCIERGE_* env var overrides.
    pub fn load(config_path: Option<&str>) -> crate::error::Result<Self> {
        let path = config_path
            .map(String::from)
            .unwrap_or_else(default_config_path);

        let config: ConciergeConfig = Figment::new()
            .merge(Toml::file(&path))
            .merge(Env::prefixed("CONCIERGE_").split("_"))
            .extract()
            .map_err(|e| crate::error::ConciergeError::Config(e.to_string()))?;

        Ok(config)
    }
}

fn default_config_path() -> String {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    format!("{}/.concierge/concierge.toml", home)
}
