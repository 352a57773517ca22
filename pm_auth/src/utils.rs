use ring::rand::SecureRandom;
use thiserror::Error;

/// Number of random bytes behind a token id (128 bits).
const TOKEN_ID_BYTES: usize = 16;

pub(crate) fn gen_random_bytes(len: usize) -> Result<Vec<u8>, UtilError> {
    let rng = ring::rand::SystemRandom::new();
    let mut buf = vec![0u8; len];
    rng.fill(&mut buf)
        .map_err(|_| UtilError::Crypto("Failed to generate random bytes".to_string()))?;
    Ok(buf)
}

/// Generate a random 128-bit identifier rendered as 32 lowercase hex characters.
///
/// Used both as the `tokenId` claim that decorrelates token pairs and as the
/// one-time password reset token.
pub fn gen_token_id() -> Result<String, UtilError> {
    let bytes = gen_random_bytes(TOKEN_ID_BYTES)?;
    Ok(hex::encode(bytes))
}

#[derive(Debug, Error, Clone)]
pub enum UtilError {
    #[error("Crypto error: {0}")]
    Crypto(String),
}
