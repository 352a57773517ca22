mod memory;
mod postgres;
mod sqlite;
mod store_type;
mod traits;

pub use memory::InMemoryCredentialStore;
pub use store_type::SqlCredentialStore;
pub use traits::CredentialStore;
