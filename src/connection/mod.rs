//! Session lifecycle: one shared connection, serialized dispatch.

mod manager;


pub use manager::{DispatchOutcome, SessionManager, SessionStatus};
