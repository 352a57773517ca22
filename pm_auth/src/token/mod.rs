mod errors;
mod service;
mod types;

pub use errors::TokenError;
pub use service::TokenService;
pub use types::{IssuedToken, TokenClaims, TokenKind, TokenPair};
