mod errors;
mod manager;
mod notifier;
mod types;

pub use errors::SessionError;
pub use manager::SessionManager;
pub use notifier::{LoggingResetNotifier, ResetLinkLogger, ResetNotifier};
pub use types::{LoginOutcome, ResetTokenStatus};
