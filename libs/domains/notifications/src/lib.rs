//! Notifications Domain
//!
//! Turns account lifecycle events into transactional emails.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────┐
//! │  Redis Streams   │  ← verification-code-emails, account-lifecycle-events
//! └────────┬─────────┘
//!          │ raw payload
//! ┌────────▼─────────┐
//! │ EventClassifier  │  ← JSON → AccountEvent, or a skip/retry reason
//! └────────┬─────────┘
//!          │
//! ┌────────▼─────────┐
//! │  TemplateEngine  │  ← AccountEvent → RenderedMessage (subject, text, html)
//! └────────┬─────────┘
//!          │
//! ┌────────▼─────────┐
//! │  EmailProvider   │  ← SendGrid, SMTP, in-memory
//! └────────┬─────────┘
//!          │
//! ┌────────▼─────────┐
//! │    Dispatcher    │  ← DispatchOutcome → ack / redeliver / stop
//! └──────────────────┘
//! ```
//!
//! # Usage
//!
//! ```rust,ignore
//! use domain_notifications::{Dispatcher, EventClassifier, InMemoryProvider, TemplateEngine};
//! use std::sync::Arc;
//!
//! let dispatcher = Dispatcher::new(
//!     EventClassifier::default(),
//!     Arc::new(TemplateEngine::new()?),
//!     Arc::new(InMemoryProvider::default()),
//! );
//!
//! let outcome = dispatcher
//!     .dispatch(br#"{"eventType":"AccountCreated","email":"a@b.com"}"#)
//!     .await?;
//! ```

pub mod classifier;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod events;
pub mod models;
pub mod providers;
pub mod streams;
pub mod templates;

// Re-export commonly used types
pub use classifier::EventClassifier;
pub use config::{DispatcherConfig, ProviderKind};
pub use dispatcher::Dispatcher;
pub use error::{ClassificationError, DeliveryError, DispatchError, NotificationError, NotificationResult};
pub use events::{AccountEvent, EventKind, VerificationCode};
pub use models::{AckDecision, DeliveryReceipt, DispatchOutcome, RenderedMessage};
pub use providers::{EmailProvider, InMemoryProvider, SendGridProvider, SmtpProvider};
pub use streams::{AccountLifecycleStream, VerificationCodeStream};
pub use templates::{Branding, TemplateEngine};
