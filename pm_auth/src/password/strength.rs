use serde::Serialize;

const MIN_PASSWORD_CHARS: usize = 8;

/// A single password rule that can be violated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PasswordRule {
    MinLength,
    Uppercase,
    Lowercase,
    Digit,
}

impl PasswordRule {
    pub fn message(&self) -> &'static str {
        match self {
            Self::MinLength => "Password must be at least 8 characters long",
            Self::Uppercase => "Password must contain at least one uppercase letter",
            Self::Lowercase => "Password must contain at least one lowercase letter",
            Self::Digit => "Password must contain at least one number",
        }
    }
}

/// Outcome of [`validate_strength`]. `violations` keeps every failed rule,
/// in rule order, so callers can report them together.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PasswordStrength {
    pub is_valid: bool,
    pub violations: Vec<PasswordRule>,
}

impl PasswordStrength {
    pub fn errors(&self) -> Vec<String> {
        self.violations
            .iter()
            .map(|rule| rule.message().to_string())
            .collect()
    }
}

pub fn validate_strength(plaintext: &str) -> PasswordStrength {
    let mut violations = Vec::new();

    if plaintext.chars().count() < MIN_PASSWORD_CHARS {
        violations.push(PasswordRule::MinLength);
    }
    if !plaintext.chars().any(|c| c.is_ascii_uppercase()) {
        violations.push(PasswordRule::Uppercase);
    }
    if !plaintext.chars().any(|c| c.is_ascii_lowercase()) {
        violations.push(PasswordRule::Lowercase);
    }
    if !plaintext.chars().any(|c| c.is_ascii_digit()) {
        violations.push(PasswordRule::Digit);
    }

    PasswordStrength {
        is_valid: violations.is_empty(),
        violations,
    }
}
