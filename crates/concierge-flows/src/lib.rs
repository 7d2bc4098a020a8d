//! Per-intent step machines (§4.7). Grounded in `skynet-agent::pipeline`'s
//! module-per-concern layout: one file per flow, dispatched by a tagged
//! variant rather than an inheritance hierarchy (§9 design note).

pub mod email;
pub mod email_prompt;
pub mod faq;
pub mod flow_state;
pub mod greeting;
pub mod ticket;
pub mod ticket_config;
pub mod ticket_status;

pub use email::EmailHandler;
pub use email_prompt::EmailDraftGenerator;
pub use faq::FaqHandler;
pub use flow_state::{
    flow_name_of, EmailFlowState, EmailStep, FlowEnvelope, TicketFlowState, TicketStep, FLOW_NAME_EMAIL,
    FLOW_NAME_TICKET,
};
pub use ticket::TicketHandler;
pub use ticket_status::TicketStatusHandler;
