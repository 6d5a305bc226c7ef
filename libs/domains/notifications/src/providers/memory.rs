//! In-process provider that records messages instead of sending them.
//!
//! Selected with `EMAIL_PROVIDER=memory` for local runs, and used by the
//! integration tests to observe what the dispatcher submits.

use super::EmailProvider;
use crate::error::DeliveryError;
use crate::models::{DeliveryReceipt, RenderedMessage};
use async_trait::async_trait;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::info;

/// What [`InMemoryProvider::send`] reports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptedResult {
    Completed,
    Incomplete,
    Transient(String),
    Rejected(String),
    Configuration(String),
}

/// Records every submitted message. Clones share the same record.
#[derive(Debug, Clone)]
pub struct InMemoryProvider {
    sent: Arc<Mutex<Vec<RenderedMessage>>>,
    result: ScriptedResult,
}

impl Default for InMemoryProvider {
    fn default() -> Self {
        Self::new(ScriptedResult::Completed)
    }
}

impl InMemoryProvider {
    pub fn new(result: ScriptedResult) -> Self {
        Self {
            sent: Arc::new(Mutex::new(Vec::new())),
            result,
        }
    }

    pub fn incomplete() -> Self {
        Self::new(ScriptedResult::Incomplete)
    }

    pub fn transient(reason: impl Into<String>) -> Self {
        Self::new(ScriptedResult::Transient(reason.into()))
    }

    pub fn rejected(reason: impl Into<String>) -> Self {
        Self::new(ScriptedResult::Rejected(reason.into()))
    }

    pub fn misconfigured(reason: impl Into<String>) -> Self {
        Self::new(ScriptedResult::Configuration(reason.into()))
    }

    /// Snapshot of everything submitted so far.
    pub fn sent(&self) -> Vec<RenderedMessage> {
        self.sent.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn sent_count(&self) -> usize {
        self.sent.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}

#[async_trait]
impl EmailProvider for InMemoryProvider {
    async fn send(&self, message: &RenderedMessage) -> Result<DeliveryReceipt, DeliveryError> {
        let id = {
            let mut sent = self.sent.lock().unwrap_or_else(PoisonError::into_inner);
            sent.push(message.clone());
            sent.len()
        };

        match &self.result {
            ScriptedResult::Completed => {
                info!(recipients = ?message.recipients(), subject = %message.subject(), "Recorded email in memory");
                Ok(DeliveryReceipt::completed(Some(format!("memory-{}", id))))
            }
            ScriptedResult::Incomplete => Ok(DeliveryReceipt::incomplete()),
            ScriptedResult::Transient(reason) => Err(DeliveryError::Transient(reason.clone())),
            ScriptedResult::Rejected(reason) => Err(DeliveryError::Rejected(reason.clone())),
            ScriptedResult::Configuration(reason) => Err(DeliveryError::Configuration(reason.clone())),
        }
    }

    fn name(&self) -> &'static str {
        "InMemory"
    }

    async fn health_check(&self) -> Result<bool, DeliveryError> {
        match &self.result {
            ScriptedResult::Configuration(reason) => Err(DeliveryError::Configuration(reason.clone())),
            _ => Ok(true),
        }
    }
}
