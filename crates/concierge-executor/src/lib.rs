//! Side-effect executor (§4.9, C9). The only crate allowed to call
//! `EmailSender::send`/`TicketStore::create` on a confirmed draft — every
//! quota check and idempotency guard lives here, in one place, so no flow
//! handler can accidentally fire a side effect twice.

pub mod error;
pub mod manager;
pub mod types;

pub use error::{ExecutorError, Result};
pub use manager::SideEffectExecutor;
pub use types::ExecuteOutcome;
