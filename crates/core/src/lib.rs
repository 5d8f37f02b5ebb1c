pub mod config;
pub mod domain;
pub mod errors;

pub use domain::account::{Account, AccountStatus};
pub use domain::message::{LogEntry, Message, MessageId, MessageLog, Role};
pub use domain::session::{Route, SessionState, SessionStore};
pub use errors::{StoreError, TurnError};
