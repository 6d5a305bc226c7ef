//! End-to-end tests of the dispatch pipeline through the public API

use domain_notifications::{
    AckDecision, Branding, DispatchError, DispatchOutcome, Dispatcher, EventClassifier,
    InMemoryProvider, TemplateEngine,
};
use std::sync::Arc;
use stream_worker::{ErrorCategory, StreamError, StreamMessage, StreamProcessor};

fn dispatcher(provider: &InMemoryProvider) -> Dispatcher<InMemoryProvider> {
    Dispatcher::new(
        EventClassifier::default(),
        Arc::new(TemplateEngine::new().expect("templates compile")),
        Arc::new(provider.clone()),
    )
}

mod delivery_tests {
    use super::*;

    #[tokio::test]
    async fn test_account_created_is_delivered_once() {
        let provider = InMemoryProvider::default();
        let outcome = dispatcher(&provider)
            .dispatch(br#"{"eventType":"AccountCreated","email":"a@b.com"}"#)
            .await
            .unwrap();

        assert_eq!(outcome, DispatchOutcome::Delivered);
        assert_eq!(outcome.ack_decision(), AckDecision::Ack);

        let sent = provider.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].subject(), "Welcome to InfiniteDb!");
        assert_eq!(sent[0].recipients(), ["a@b.com".to_string()]);
        assert!(sent[0].plain_text().contains("https://infinitedb.com/support"));
    }

    #[tokio::test]
    async fn test_password_reset_link_carries_token() {
        let provider = InMemoryProvider::default();
        dispatcher(&provider)
            .dispatch(br#"{"eventType":"PasswordResetRequested","email":"a@b.com","resetToken":"tok123"}"#)
            .await
            .unwrap();

        let sent = provider.sent();
        assert_eq!(sent[0].subject(), "InfiniteDb - Reset Password");
        assert!(sent[0].html().contains("token=tok123"));
        assert!(sent[0].plain_text().contains("https://infinitedb.com/reset?token=tok123"));
    }

    #[tokio::test]
    async fn test_verification_code_reaches_both_bodies() {
        let provider = InMemoryProvider::default();
        dispatcher(&provider)
            .dispatch(br#"{"eventType":"VerificationCodeIssued","email":"a@b.com","code":"004211"}"#)
            .await
            .unwrap();

        let sent = provider.sent();
        assert_eq!(sent[0].subject(), "InfiniteDb - Verification Code");
        assert!(sent[0].plain_text().contains("004211"));
        assert!(sent[0].html().contains("004211"));
        assert!(!sent[0].html().contains("a@b.com"));
    }

    #[tokio::test]
    async fn test_custom_branding_and_discriminator() {
        let provider = InMemoryProvider::default();
        let templates = TemplateEngine::with_branding(Branding {
            product_name: "Acme".to_string(),
            base_url: "https://acme.test".to_string(),
            code_ttl_minutes: 5,
        })
        .unwrap();
        let dispatcher = Dispatcher::new(
            EventClassifier::new("type"),
            Arc::new(templates),
            Arc::new(provider.clone()),
        );

        dispatcher
            .dispatch(br#"{"type":"AccountDeleted","email":"a@b.com"}"#)
            .await
            .unwrap();

        let sent = provider.sent();
        assert_eq!(sent[0].subject(), "Acme - Account Deleted");
        assert!(sent[0].html().contains("acme.test"));
    }
}

mod skip_tests {
    use super::*;

    #[tokio::test]
    async fn test_unknown_kind_sends_nothing() {
        let provider = InMemoryProvider::default();
        let outcome = dispatcher(&provider)
            .dispatch(br#"{"eventType":"SomethingNew","email":"a@b.com"}"#)
            .await
            .unwrap();

        assert_eq!(outcome, DispatchOutcome::SkippedUnknownKind);
        assert_eq!(outcome.ack_decision(), AckDecision::Ack);
        assert_eq!(provider.sent_count(), 0);
    }

    #[tokio::test]
    async fn test_missing_email_sends_nothing() {
        let provider = InMemoryProvider::default();
        let outcome = dispatcher(&provider)
            .dispatch(br#"{"eventType":"VerificationCodeIssued","email":""}"#)
            .await
            .unwrap();

        assert_eq!(outcome, DispatchOutcome::SkippedInvalid);
        assert_eq!(provider.sent_count(), 0);
    }

    #[tokio::test]
    async fn test_payload_html_is_ignored() {
        let provider = InMemoryProvider::default();
        dispatcher(&provider)
            .dispatch(br#"{"eventType":"AccountCreated","email":"a@b.com","html":"<script>x</script>","subject":"Hi"}"#)
            .await
            .unwrap();

        let sent = provider.sent();
        assert_eq!(sent[0].subject(), "Welcome to InfiniteDb!");
        assert!(!sent[0].html().contains("<script>"));
    }
}

mod failure_tests {
    use super::*;

    const PAYLOAD: &str = r#"{"eventType":"AccountCreated","email":"a@b.com"}"#;

    #[tokio::test]
    async fn test_incomplete_delivery_is_retried() {
        let provider = InMemoryProvider::incomplete();
        let outcome = dispatcher(&provider).dispatch(PAYLOAD.as_bytes()).await.unwrap();

        assert_eq!(outcome, DispatchOutcome::TransientFailure);
        assert_eq!(outcome.ack_decision(), AckDecision::Retry);
    }

    #[tokio::test]
    async fn test_rejection_is_acked() {
        let provider = InMemoryProvider::rejected("mailbox does not exist");
        let outcome = dispatcher(&provider).dispatch(PAYLOAD.as_bytes()).await.unwrap();

        assert_eq!(outcome, DispatchOutcome::Rejected);
        assert_eq!(outcome.ack_decision(), AckDecision::Ack);
    }

    #[tokio::test]
    async fn test_queue_signals() {
        let message = StreamMessage::new("1700000000000-0", PAYLOAD);

        let delivered = dispatcher(&InMemoryProvider::default());
        assert!(delivered.process(&message).await.is_ok());

        let transient = dispatcher(&InMemoryProvider::transient("connection reset"));
        let err = transient.process(&message).await.unwrap_err();
        assert_eq!(err.category(), ErrorCategory::Transient);

        let misconfigured = dispatcher(&InMemoryProvider::misconfigured("no sender"));
        let err = misconfigured.process(&message).await.unwrap_err();
        assert_eq!(err.category(), ErrorCategory::Fatal);

        let malformed = StreamMessage::new("1700000000001-0", "not json");
        let err = delivered.process(&malformed).await.unwrap_err();
        assert_eq!(err.category(), ErrorCategory::Transient);
    }

    #[tokio::test]
    async fn test_malformed_payload_error() {
        let err = dispatcher(&InMemoryProvider::default())
            .dispatch(br#"{"eventType":"VerificationCodeIssued","email":"a@b.com","code":"abc"}"#)
            .await
            .unwrap_err();

        assert!(matches!(err, DispatchError::MalformedPayload(_)));
        assert!(matches!(StreamError::from(err), StreamError::Processing { .. }));
    }
}
