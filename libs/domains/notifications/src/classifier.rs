//! Turns raw queue payloads into typed account events.
//!
//! Payloads are JSON objects carrying a discriminator (`eventType` unless
//! configured otherwise) plus the fields of that event:
//!
//! ```json
//! {"eventType":"PasswordResetRequested","email":"a@b.com","resetToken":"tok123"}
//! ```
//!
//! Producers serialising with PascalCase names (`EventType`, `Email`, `Token`,
//! `Code`) are accepted as well. Unknown extra fields are ignored.

use crate::error::ClassificationError;
use crate::events::{is_plausible_address, AccountEvent, EventKind, VerificationCode};
use serde_json::{Map, Value};
use std::str::FromStr;

/// Default discriminator field name.
pub const DEFAULT_DISCRIMINATOR: &str = "eventType";

const EMAIL_FIELDS: &[&str] = &["email", "Email"];
const CODE_FIELDS: &[&str] = &["code", "Code"];
const TOKEN_FIELDS: &[&str] = &["resetToken", "token", "Token", "ResetToken"];

/// Stateless payload classifier.
#[derive(Debug, Clone)]
pub struct EventClassifier {
    discriminator: String,
}

impl Default for EventClassifier {
    fn default() -> Self {
        Self::new(DEFAULT_DISCRIMINATOR)
    }
}

impl EventClassifier {
    pub fn new(discriminator: impl Into<String>) -> Self {
        Self {
            discriminator: discriminator.into(),
        }
    }

    pub fn discriminator(&self) -> &str {
        &self.discriminator
    }

    /// Classify a raw payload.
    pub fn classify(&self, raw: &[u8]) -> Result<AccountEvent, ClassificationError> {
        let value: Value = serde_json::from_slice(raw)
            .map_err(|e| ClassificationError::MalformedPayload(e.to_string()))?;
        let object = value.as_object().ok_or_else(|| {
            ClassificationError::MalformedPayload("expected a JSON object".to_string())
        })?;

        let kind = self.kind(object)?;

        match kind {
            EventKind::VerificationCodeIssued => Ok(AccountEvent::VerificationCodeIssued {
                email: required_email(object, kind)?,
                code: verification_code(object)?,
            }),
            EventKind::AccountCreated => Ok(AccountEvent::AccountCreated {
                email: required_email(object, kind)?,
            }),
            EventKind::PasswordResetRequested => {
                let email = required_email(object, kind)?;
                let reset_token = text(object, TOKEN_FIELDS)?
                    .filter(|t| !t.is_empty())
                    .ok_or(ClassificationError::MissingRequiredField {
                        kind,
                        field: "resetToken",
                    })?;
                Ok(AccountEvent::PasswordResetRequested { email, reset_token })
            }
            EventKind::AccountDeleted => Ok(AccountEvent::AccountDeleted {
                email: required_email(object, kind)?,
            }),
        }
    }

    fn kind(&self, object: &Map<String, Value>) -> Result<EventKind, ClassificationError> {
        let tag = object
            .get(&self.discriminator)
            .or_else(|| object.get(&pascal_case(&self.discriminator)));

        match tag {
            Some(Value::String(tag)) => EventKind::from_str(tag.trim())
                .map_err(|_| ClassificationError::UnknownKind(Some(tag.clone()))),
            Some(Value::Null) | None => Err(ClassificationError::UnknownKind(None)),
            Some(other) => Err(ClassificationError::UnknownKind(Some(other.to_string()))),
        }
    }
}

/// First present, non-null value among the aliases.
fn lookup<'a>(object: &'a Map<String, Value>, names: &[&str]) -> Option<&'a Value> {
    names
        .iter()
        .filter_map(|name| object.get(*name))
        .find(|value| !value.is_null())
}

/// A trimmed string field; absent and null are `None`, other types are malformed.
fn text(object: &Map<String, Value>, names: &[&str]) -> Result<Option<String>, ClassificationError> {
    match lookup(object, names) {
        None => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.trim().to_string())),
        Some(other) => Err(ClassificationError::MalformedPayload(format!(
            "field `{}` must be a string, got {}",
            names[0],
            json_type(other)
        ))),
    }
}

fn required_email(object: &Map<String, Value>, kind: EventKind) -> Result<String, ClassificationError> {
    let email = text(object, EMAIL_FIELDS)?
        .filter(|e| !e.is_empty())
        .ok_or(ClassificationError::MissingRequiredField {
            kind,
            field: "email",
        })?;

    if !is_plausible_address(&email) {
        return Err(ClassificationError::InvalidField {
            kind,
            field: "email",
            reason: "not a plausible email address".to_string(),
        });
    }

    Ok(email)
}

/// Absent, null, or an empty string yields the zero sentinel.
fn verification_code(object: &Map<String, Value>) -> Result<VerificationCode, ClassificationError> {
    let malformed = |detail: String| ClassificationError::MalformedPayload(format!("field `code` {}", detail));

    match lookup(object, CODE_FIELDS) {
        None => Ok(VerificationCode::sentinel()),
        Some(Value::Number(n)) => n
            .as_u64()
            .map(VerificationCode::from)
            .ok_or_else(|| malformed(format!("must be a non-negative integer, got {}", n))),
        Some(Value::String(s)) if s.trim().is_empty() => Ok(VerificationCode::sentinel()),
        Some(Value::String(s)) => {
            VerificationCode::parse(s).ok_or_else(|| malformed(format!("must contain only digits, got {:?}", s)))
        }
        Some(other) => Err(malformed(format!("must be an integer, got {}", json_type(other)))),
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn pascal_case(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
