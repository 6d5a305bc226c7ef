//! Dispatcher configuration loaded from the environment.

use crate::classifier::DEFAULT_DISCRIMINATOR;
use crate::streams::{AccountLifecycleStream, VerificationCodeStream, DISPATCHER_CONSUMER_GROUP};
use crate::templates::Branding;
use core_config::{env_or_default, env_parse_or, ConfigError, Environment, FromEnv};
use std::str::FromStr;
use stream_worker::{StreamDef, WorkerConfig};
use strum::{AsRefStr, Display, EnumString};

/// Which delivery gateway the binary wires in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, AsRefStr, EnumString)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum ProviderKind {
    SendGrid,
    Smtp,
    Memory,
}

impl ProviderKind {
    /// Reads EMAIL_PROVIDER; defaults to SendGrid in production and SMTP otherwise.
    pub fn from_env(environment: &Environment) -> Result<Self, ConfigError> {
        match std::env::var("EMAIL_PROVIDER") {
            Ok(raw) => Self::from_str(raw.trim()).map_err(|_| ConfigError::ParseError {
                key: "EMAIL_PROVIDER".to_string(),
                details: format!("unknown provider '{}', expected sendgrid, smtp or memory", raw),
            }),
            Err(_) if environment.is_production() => Ok(ProviderKind::SendGrid),
            Err(_) => Ok(ProviderKind::Smtp),
        }
    }
}

/// Settings shared by both dispatcher workers.
#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    /// Payload field holding the event kind tag.
    pub discriminator: String,
    pub verification_stream: String,
    pub lifecycle_stream: String,
    pub consumer_group: String,
    pub branding: Branding,
    /// Messages processed in parallel per worker.
    pub max_concurrent_jobs: usize,
    pub job_timeout_ms: u64,
    /// Deliveries before a message is dead-lettered.
    pub max_deliveries: u32,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            discriminator: DEFAULT_DISCRIMINATOR.to_string(),
            verification_stream: VerificationCodeStream::STREAM_NAME.to_string(),
            lifecycle_stream: AccountLifecycleStream::STREAM_NAME.to_string(),
            consumer_group: DISPATCHER_CONSUMER_GROUP.to_string(),
            branding: Branding::default(),
            max_concurrent_jobs: 8,
            job_timeout_ms: 30_000,
            max_deliveries: VerificationCodeStream::MAX_DELIVERIES,
        }
    }
}

impl FromEnv for DispatcherConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let branding = Branding {
            product_name: env_or_default("BRAND_NAME", &defaults.branding.product_name),
            base_url: env_or_default("BRAND_BASE_URL", &defaults.branding.base_url)
                .trim_end_matches('/')
                .to_string(),
            code_ttl_minutes: env_parse_or("VERIFICATION_CODE_TTL_MINUTES", defaults.branding.code_ttl_minutes)?,
        };

        let config = Self {
            discriminator: env_or_default("EVENT_DISCRIMINATOR_FIELD", &defaults.discriminator),
            verification_stream: env_or_default("VERIFICATION_STREAM", &defaults.verification_stream),
            lifecycle_stream: env_or_default("LIFECYCLE_STREAM", &defaults.lifecycle_stream),
            consumer_group: env_or_default("DISPATCHER_CONSUMER_GROUP", &defaults.consumer_group),
            branding,
            max_concurrent_jobs: env_parse_or("DISPATCH_MAX_CONCURRENCY", defaults.max_concurrent_jobs)?,
            job_timeout_ms: env_parse_or("DISPATCH_JOB_TIMEOUT_MS", defaults.job_timeout_ms)?,
            max_deliveries: env_parse_or("DISPATCH_MAX_DELIVERIES", defaults.max_deliveries)?,
        };

        config.validate()?;
        Ok(config)
    }
}

impl DispatcherConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        let positive = [
            ("DISPATCH_MAX_CONCURRENCY", self.max_concurrent_jobs as u64),
            ("DISPATCH_JOB_TIMEOUT_MS", self.job_timeout_ms),
            ("DISPATCH_MAX_DELIVERIES", u64::from(self.max_deliveries)),
        ];
        if let Some((key, _)) = positive.iter().find(|(_, value)| *value == 0) {
            return Err(ConfigError::ParseError {
                key: key.to_string(),
                details: "must be greater than zero".to_string(),
            });
        }
        if self.discriminator.trim().is_empty() {
            return Err(ConfigError::ParseError {
                key: "EVENT_DISCRIMINATOR_FIELD".to_string(),
                details: "must not be empty".to_string(),
            });
        }
        Ok(())
    }

    /// Worker settings for the verification code stream.
    pub fn verification_worker(&self) -> WorkerConfig {
        self.worker::<VerificationCodeStream>(&self.verification_stream)
    }

    /// Worker settings for the account lifecycle stream.
    pub fn lifecycle_worker(&self) -> WorkerConfig {
        self.worker::<AccountLifecycleStream>(&self.lifecycle_stream)
    }

    fn worker<S: StreamDef>(&self, stream_name: &str) -> WorkerConfig {
        let config = WorkerConfig::from_stream_def::<S>();
        // Keep the predefined dead letter stream unless the stream was renamed.
        let config = if stream_name == S::STREAM_NAME {
            config
        } else {
            config.with_stream_name(stream_name)
        };

        config
            .with_consumer_group(self.consumer_group.clone())
            .with_max_concurrent_jobs(self.max_concurrent_jobs)
            .with_job_timeout_ms(self.job_timeout_ms)
            .with_max_deliveries(self.max_deliveries)
    }
}
