pub mod collaborators;
pub mod config;
pub mod envelope;
pub mod error;
pub mod keywords;
pub mod mocks;
pub mod types;

pub use collaborators::{EmailHistory, EmailSender, FacultyDirectory, FacultyRecord, SentEmail, TicketRecord, TicketStore};
pub use envelope::{AgentOutput, Envelope, EnvelopeKind, EnvelopeMetadata, HandlerResponse, HandlerStatus};
pub use error::{ConciergeError, Result};
pub use types::*;
