//! Per-message pipeline: classify, render, submit, decide.
//!
//! [`Dispatcher::dispatch`] never panics on bad input and returns either a
//! [`DispatchOutcome`] or a [`DispatchError`]. The `StreamProcessor` impl at
//! the bottom of this file is the only place where those results become
//! queue signals (ack, redeliver, stop).

use crate::classifier::EventClassifier;
use crate::error::{ClassificationError, DeliveryError, DispatchError};
use crate::events::{AccountEvent, EventKind};
use crate::models::{AckDecision, DispatchOutcome};
use crate::providers::EmailProvider;
use crate::templates::TemplateEngine;
use async_trait::async_trait;
use std::sync::Arc;
use stream_worker::{StreamError, StreamMessage, StreamProcessor};
use tracing::{debug, error, info, warn};

/// Counter incremented once per dispatch, labelled by outcome and event kind.
pub const OUTCOME_METRIC: &str = "notifications_dispatch_outcomes_total";

/// Turns raw account events into delivered emails.
pub struct Dispatcher<P: EmailProvider> {
    classifier: EventClassifier,
    templates: Arc<TemplateEngine>,
    provider: Arc<P>,
}

impl<P: EmailProvider> Clone for Dispatcher<P> {
    fn clone(&self) -> Self {
        Self {
            classifier: self.classifier.clone(),
            templates: Arc::clone(&self.templates),
            provider: Arc::clone(&self.provider),
        }
    }
}

impl<P: EmailProvider> Dispatcher<P> {
    pub fn new(classifier: EventClassifier, templates: Arc<TemplateEngine>, provider: Arc<P>) -> Self {
        Self {
            classifier,
            templates,
            provider,
        }
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Run one raw payload through the pipeline.
    pub async fn dispatch(&self, raw: &[u8]) -> Result<DispatchOutcome, DispatchError> {
        let event = match self.classifier.classify(raw) {
            Ok(event) => event,
            Err(err) => return self.classification_failed(raw, err),
        };
        let kind = event.kind();

        if let AccountEvent::VerificationCodeIssued { code, .. } = &event {
            if code.is_sentinel() {
                warn!(kind = %kind, "Verification code is zero, sending it anyway");
            }
        }

        let message = match self.templates.render(&event) {
            Ok(message) => message,
            Err(err) => {
                error!(
                    kind = %kind,
                    error = %err,
                    payload = %String::from_utf8_lossy(raw),
                    "Rendering failed, message will be retried"
                );
                return Ok(record(DispatchOutcome::TransientFailure, Some(kind)));
            }
        };

        let outcome = match self.provider.send(&message).await {
            Ok(receipt) if receipt.completed => {
                info!(
                    kind = %kind,
                    provider = self.provider.name(),
                    message_id = ?receipt.message_id,
                    "Email delivered"
                );
                DispatchOutcome::Delivered
            }
            Ok(_) => {
                error!(
                    kind = %kind,
                    provider = self.provider.name(),
                    payload = %String::from_utf8_lossy(raw),
                    "Provider did not confirm completion, message will be retried"
                );
                DispatchOutcome::TransientFailure
            }
            Err(DeliveryError::Transient(detail)) => {
                error!(
                    kind = %kind,
                    provider = self.provider.name(),
                    error = %detail,
                    payload = %String::from_utf8_lossy(raw),
                    "Transient delivery failure, message will be retried"
                );
                DispatchOutcome::TransientFailure
            }
            Err(DeliveryError::Rejected(detail)) => {
                error!(
                    kind = %kind,
                    provider = self.provider.name(),
                    error = %detail,
                    "Provider rejected the email, dropping message"
                );
                DispatchOutcome::Rejected
            }
            Err(DeliveryError::Configuration(detail)) => {
                error!(
                    kind = %kind,
                    provider = self.provider.name(),
                    error = %detail,
                    "Delivery gateway is misconfigured"
                );
                return Err(DispatchError::Configuration(detail));
            }
        };

        Ok(record(outcome, Some(kind)))
    }

    fn classification_failed(
        &self,
        raw: &[u8],
        err: ClassificationError,
    ) -> Result<DispatchOutcome, DispatchError> {
        match err {
            ClassificationError::MalformedPayload(_) => {
                error!(
                    error = %err,
                    payload = %String::from_utf8_lossy(raw),
                    "Malformed payload, message will be retried"
                );
                Err(DispatchError::MalformedPayload(err))
            }
            ClassificationError::UnknownKind(_) => {
                warn!(
                    discriminator = self.classifier.discriminator(),
                    error = %err,
                    "Skipping event of unknown kind"
                );
                Ok(record(DispatchOutcome::SkippedUnknownKind, None))
            }
            ClassificationError::MissingRequiredField { kind, .. }
            | ClassificationError::InvalidField { kind, .. } => {
                warn!(kind = %kind, error = %err, "Skipping invalid event");
                Ok(record(DispatchOutcome::SkippedInvalid, Some(kind)))
            }
        }
    }
}

fn record(outcome: DispatchOutcome, kind: Option<EventKind>) -> DispatchOutcome {
    let kind = kind.map_or_else(|| "unknown".to_string(), |k| k.to_string());
    metrics::counter!(OUTCOME_METRIC, "outcome" => outcome.to_string(), "kind" => kind).increment(1);
    outcome
}

impl From<DispatchError> for StreamError {
    fn from(err: DispatchError) -> Self {
        match err {
            DispatchError::MalformedPayload(_) => StreamError::transient(err.to_string()),
            DispatchError::Configuration(_) => StreamError::fatal(err.to_string()),
        }
    }
}

#[async_trait]
impl<P: EmailProvider + 'static> StreamProcessor for Dispatcher<P> {
    async fn process(&self, message: &StreamMessage) -> Result<(), StreamError> {
        debug!(
            message_id = %message.id,
            delivery_count = message.delivery_count,
            payload_bytes = message.payload.len(),
            "Received message"
        );

        let outcome = self.dispatch(message.as_bytes()).await?;
        match outcome.ack_decision() {
            AckDecision::Ack => Ok(()),
            AckDecision::Retry => Err(StreamError::transient(format!(
                "dispatch of {} ended in {}",
                message.id, outcome
            ))),
        }
    }

    fn name(&self) -> &'static str {
        "EventDispatcher"
    }

    async fn health_check(&self) -> Result<bool, StreamError> {
        self.provider.health_check().await.map_err(|e| match e {
            DeliveryError::Configuration(detail) => StreamError::Config(detail),
            other => StreamError::transient(other.to_string()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DeliveryReceipt;
    use crate::providers::MockEmailProvider;
    use stream_worker::ErrorCategory;

    fn dispatcher(provider: MockEmailProvider) -> Dispatcher<MockEmailProvider> {
        let mut provider = provider;
        provider.expect_name().return_const("Mock");
        Dispatcher::new(
            EventClassifier::default(),
            Arc::new(TemplateEngine::new().unwrap()),
            Arc::new(provider),
        )
    }

    const ACCOUNT_CREATED: &[u8] = br#"{"eventType":"AccountCreated","email":"a@b.com"}"#;

    #[tokio::test]
    async fn test_completed_send_is_delivered() {
        let mut provider = MockEmailProvider::new();
        provider
            .expect_send()
            .withf(|message| {
                message.subject() == "Welcome to InfiniteDb!" && message.recipients() == ["a@b.com".to_string()]
            })
            .times(1)
            .returning(|_| Ok(DeliveryReceipt::completed(Some("sg-1".into()))));

        let outcome = dispatcher(provider).dispatch(ACCOUNT_CREATED).await.unwrap();
        assert_eq!(outcome, DispatchOutcome::Delivered);
        assert_eq!(outcome.ack_decision(), AckDecision::Ack);
    }

    #[tokio::test]
    async fn test_incomplete_send_is_transient() {
        let mut provider = MockEmailProvider::new();
        provider
            .expect_send()
            .times(1)
            .returning(|_| Ok(DeliveryReceipt::incomplete()));

        let outcome = dispatcher(provider).dispatch(ACCOUNT_CREATED).await.unwrap();
        assert_eq!(outcome, DispatchOutcome::TransientFailure);
        assert_eq!(outcome.ack_decision(), AckDecision::Retry);
    }

    #[tokio::test]
    async fn test_transient_error_is_transient() {
        let mut provider = MockEmailProvider::new();
        provider
            .expect_send()
            .times(1)
            .returning(|_| Err(DeliveryError::Transient("503".into())));

        assert_eq!(
            dispatcher(provider).dispatch(ACCOUNT_CREATED).await.unwrap(),
            DispatchOutcome::TransientFailure
        );
    }

    #[tokio::test]
    async fn test_rejection_is_acked() {
        let mut provider = MockEmailProvider::new();
        provider
            .expect_send()
            .times(1)
            .returning(|_| Err(DeliveryError::Rejected("bounced".into())));

        let outcome = dispatcher(provider).dispatch(ACCOUNT_CREATED).await.unwrap();
        assert_eq!(outcome, DispatchOutcome::Rejected);
        assert_eq!(outcome.ack_decision(), AckDecision::Ack);
    }

    #[tokio::test]
    async fn test_configuration_error_is_fatal() {
        let mut provider = MockEmailProvider::new();
        provider
            .expect_send()
            .times(1)
            .returning(|_| Err(DeliveryError::Configuration("no sender".into())));

        let err = dispatcher(provider).dispatch(ACCOUNT_CREATED).await.unwrap_err();
        assert!(matches!(err, DispatchError::Configuration(_)));
        assert_eq!(StreamError::from(err).category(), ErrorCategory::Fatal);
    }

    #[tokio::test]
    async fn test_unknown_kind_never_reaches_provider() {
        let mut provider = MockEmailProvider::new();
        provider.expect_send().never();

        let outcome = dispatcher(provider)
            .dispatch(br#"{"eventType":"SomethingNew","email":"a@b.com"}"#)
            .await
            .unwrap();
        assert_eq!(outcome, DispatchOutcome::SkippedUnknownKind);
        assert_eq!(outcome.ack_decision(), AckDecision::Ack);
    }

    #[tokio::test]
    async fn test_missing_email_is_skipped_invalid() {
        let mut provider = MockEmailProvider::new();
        provider.expect_send().never();

        let outcome = dispatcher(provider)
            .dispatch(br#"{"eventType":"VerificationCodeIssued","email":""}"#)
            .await
            .unwrap();
        assert_eq!(outcome, DispatchOutcome::SkippedInvalid);
    }

    #[tokio::test]
    async fn test_malformed_payload_is_retryable() {
        let mut provider = MockEmailProvider::new();
        provider.expect_send().never();

        let err = dispatcher(provider).dispatch(b"{not json").await.unwrap_err();
        assert!(matches!(err, DispatchError::MalformedPayload(_)));
        assert_eq!(StreamError::from(err).category(), ErrorCategory::Transient);
    }

    #[tokio::test]
    async fn test_zero_code_is_still_sent() {
        let mut provider = MockEmailProvider::new();
        provider
            .expect_send()
            .withf(|message| message.plain_text().contains("Your verification code is: 0"))
            .times(1)
            .returning(|_| Ok(DeliveryReceipt::completed(None)));

        let outcome = dispatcher(provider)
            .dispatch(br#"{"eventType":"VerificationCodeIssued","email":"a@b.com","code":0}"#)
            .await
            .unwrap();
        assert_eq!(outcome, DispatchOutcome::Delivered);
    }

    #[tokio::test]
    async fn test_process_maps_outcomes_to_queue_signals() {
        let mut provider = MockEmailProvider::new();
        provider
            .expect_send()
            .times(1)
            .returning(|_| Ok(DeliveryReceipt::incomplete()));
        let dispatcher = dispatcher(provider);

        let skipped = StreamMessage::new("1-0", r#"{"eventType":"Nope"}"#);
        assert!(dispatcher.process(&skipped).await.is_ok());

        let retried = StreamMessage::new("2-0", std::str::from_utf8(ACCOUNT_CREATED).unwrap());
        let err = dispatcher.process(&retried).await.unwrap_err();
        assert_eq!(err.category(), ErrorCategory::Transient);
    }

    #[tokio::test]
    async fn test_health_check_maps_configuration_to_config_error() {
        let mut provider = MockEmailProvider::new();
        provider
            .expect_health_check()
            .returning(|| Err(DeliveryError::Configuration("bad key".into())));

        let err = dispatcher(provider).health_check().await.unwrap_err();
        assert!(matches!(err, StreamError::Config(_)));
    }

    #[test]
    fn test_processor_name() {
        assert_eq!(dispatcher(MockEmailProvider::new()).name(), "EventDispatcher");
    }
}
