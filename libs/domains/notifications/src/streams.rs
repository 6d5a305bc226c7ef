//! Stream definitions for the notifications domain.
//!
//! Names here are the defaults; `DispatcherConfig` can override them per
//! deployment.

use stream_worker::StreamDef;

/// Consumer group shared by every dispatcher replica.
pub const DISPATCHER_CONSUMER_GROUP: &str = "email_dispatchers";

/// Verification codes issued by the account service.
pub struct VerificationCodeStream;

impl StreamDef for VerificationCodeStream {
    const STREAM_NAME: &'static str = "verification-code-emails";
    const CONSUMER_GROUP: &'static str = DISPATCHER_CONSUMER_GROUP;
    const DLQ_STREAM: &'static str = "verification-code-emails:dlq";

    // Codes expire quickly, reclaim stuck ones sooner.
    const CLAIM_IDLE_MS: u64 = 15_000;
}

/// Account created, password reset and account deleted events.
pub struct AccountLifecycleStream;

impl StreamDef for AccountLifecycleStream {
    const STREAM_NAME: &'static str = "account-lifecycle-events";
    const CONSUMER_GROUP: &'static str = DISPATCHER_CONSUMER_GROUP;
    const DLQ_STREAM: &'static str = "account-lifecycle-events:dlq";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verification_stream_def() {
        assert_eq!(VerificationCodeStream::STREAM_NAME, "verification-code-emails");
        assert_eq!(VerificationCodeStream::CONSUMER_GROUP, "email_dispatchers");
        assert_eq!(VerificationCodeStream::DLQ_STREAM, "verification-code-emails:dlq");
        assert_eq!(VerificationCodeStream::MAX_DELIVERIES, 5);
    }

    #[test]
    fn test_lifecycle_stream_def() {
        assert_eq!(AccountLifecycleStream::STREAM_NAME, "account-lifecycle-events");
        assert_eq!(AccountLifecycleStream::DLQ_STREAM, "account-lifecycle-events:dlq");
        assert_eq!(AccountLifecycleStream::CLAIM_IDLE_MS, 30_000);
    }
}
