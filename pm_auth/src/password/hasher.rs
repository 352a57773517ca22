use std::sync::OnceLock;

use super::errors::PasswordError;

/// Lowest work factor bcrypt accepts.
pub const MIN_BCRYPT_COST: u32 = 4;
/// Highest work factor bcrypt accepts.
pub const MAX_BCRYPT_COST: u32 = 31;

/// Adaptive one-way password hashing (bcrypt) with a configurable work factor.
#[derive(Debug, Clone)]
pub struct PasswordHasher {
    cost: u32,
    dummy_digest: OnceLock<Option<String>>,
}

impl PasswordHasher {
    pub fn new(cost: u32) -> Result<Self, PasswordError> {
        if !(MIN_BCRYPT_COST..=MAX_BCRYPT_COST).contains(&cost) {
            return Err(PasswordError::InvalidCost(cost));
        }
        Ok(Self {
            cost,
            dummy_digest: OnceLock::new(),
        })
    }

    pub fn cost(&self) -> u32 {
        self.cost
    }

    /// Hash a plaintext password. Each call uses a fresh salt.
    pub fn hash(&self, plaintext: &str) -> Result<String, PasswordError> {
        Ok(bcrypt::hash(plaintext, self.cost)?)
    }

    /// Check a plaintext password against a stored digest.
    ///
    /// Malformed digests are reported as a mismatch, never as an error.
    pub fn verify(&self, plaintext: &str, digest: &str) -> bool {
        match bcrypt::verify(plaintext, digest) {
            Ok(matched) => matched,
            Err(e) => {
                tracing::warn!(error = %e, "Stored password digest could not be parsed");
                false
            }
        }
    }

    /// Spend the same work as a real verification without any account behind it.
    ///
    /// Called on the unknown-account path so response timing does not tell
    /// callers whether an email is registered.
    pub fn verify_dummy(&self, plaintext: &str) {
        let digest = self
            .dummy_digest
            .get_or_init(|| bcrypt::hash("timing-equalisation-placeholder", self.cost).ok());
        if let Some(digest) = digest {
            let _ = bcrypt::verify(plaintext, digest);
        }
    }
}
