mod errors;
mod storage;
mod types;

pub use errors::UserError;
pub use storage::{CredentialStore, InMemoryCredentialStore, SqlCredentialStore};
pub use types::{Account, AccountLockState, NewAccount, Role, SanitizedAccount, normalize_email};
