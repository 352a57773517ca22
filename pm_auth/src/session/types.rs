use serde::Serialize;

use crate::token::TokenPair;
use crate::userdb::SanitizedAccount;

/// Result of a successful login or refresh.
#[derive(Debug, Clone)]
pub struct LoginOutcome {
    pub tokens: TokenPair,
    pub account: SanitizedAccount,
}

/// Answer to "is this reset token still usable?".
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetTokenStatus {
    pub is_valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

impl ResetTokenStatus {
    pub(crate) fn invalid() -> Self {
        Self {
            is_valid: false,
            email: None,
        }
    }
}
