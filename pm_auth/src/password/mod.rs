mod errors;
mod hasher;
mod strength;

pub use errors::PasswordError;
pub use hasher::{MAX_BCRYPT_COST, MIN_BCRYPT_COST, PasswordHasher};
pub use strength::{PasswordRule, PasswordStrength, validate_strength};
