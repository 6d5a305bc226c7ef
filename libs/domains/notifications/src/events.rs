//! Account lifecycle events handled by the dispatcher.

use serde::Serialize;
use std::fmt;
use strum::{AsRefStr, Display, EnumIter, EnumString};

/// Discriminator values of the supported events.
///
/// The string form is the tag producers put in the payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[derive(Display, AsRefStr, EnumString, EnumIter)]
pub enum EventKind {
    VerificationCodeIssued,
    AccountCreated,
    PasswordResetRequested,
    AccountDeleted,
}

impl EventKind {
    /// Base name of the templates rendering this kind.
    pub fn template_name(&self) -> &'static str {
        match self {
            EventKind::VerificationCodeIssued => "verification_code",
            EventKind::AccountCreated => "welcome",
            EventKind::PasswordResetRequested => "password_reset",
            EventKind::AccountDeleted => "account_deleted",
        }
    }
}

/// A verification code as issued by the account service.
///
/// Kept as its decimal digits so codes with leading zeros render unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VerificationCode(String);

impl VerificationCode {
    /// Parse a non-empty string of ASCII digits.
    pub fn parse(digits: &str) -> Option<Self> {
        let digits = digits.trim();
        if !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()) {
            Some(Self(digits.to_string()))
        } else {
            None
        }
    }

    /// The sentinel a producer sends when it had no code at hand.
    pub fn sentinel() -> Self {
        Self("0".to_string())
    }

    /// Whether this is the zero sentinel.
    pub fn is_sentinel(&self) -> bool {
        self.0.bytes().all(|b| b == b'0')
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<u64> for VerificationCode {
    fn from(code: u64) -> Self {
        Self(code.to_string())
    }
}

impl fmt::Display for VerificationCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A validated account lifecycle event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccountEvent {
    VerificationCodeIssued {
        email: String,
        code: VerificationCode,
    },
    AccountCreated {
        email: String,
    },
    PasswordResetRequested {
        email: String,
        reset_token: String,
    },
    AccountDeleted {
        email: String,
    },
}

impl AccountEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            AccountEvent::VerificationCodeIssued { .. } => EventKind::VerificationCodeIssued,
            AccountEvent::AccountCreated { .. } => EventKind::AccountCreated,
            AccountEvent::PasswordResetRequested { .. } => EventKind::PasswordResetRequested,
            AccountEvent::AccountDeleted { .. } => EventKind::AccountDeleted,
        }
    }

    /// Recipient address of the email this event produces.
    pub fn email(&self) -> &str {
        match self {
            AccountEvent::VerificationCodeIssued { email, .. }
            | AccountEvent::AccountCreated { email }
            | AccountEvent::PasswordResetRequested { email, .. }
            | AccountEvent::AccountDeleted { email } => email,
        }
    }
}

/// Cheap syntactic check: one `@`, non-empty local part, dotted domain, no whitespace.
pub fn is_plausible_address(address: &str) -> bool {
    if address.is_empty() || address.chars().any(char::is_whitespace) {
        return false;
    }

    let mut parts = address.split('@');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(local), Some(domain), None) => {
            !local.is_empty()
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
        }
        _ => false,
    }
}
