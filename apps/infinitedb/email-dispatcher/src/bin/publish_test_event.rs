//! Test binary to publish an account event onto the dispatcher's streams
//!
//! Run with: cargo run -p infinitedb_email_dispatcher --bin publish_test_event -- AccountCreated test@example.com
//!
//! A third argument is used as the code of `VerificationCodeIssued` or the
//! token of `PasswordResetRequested`.

use core_config::redis::RedisConfig;
use core_config::FromEnv;
use domain_notifications::{DispatcherConfig, EventKind};
use eyre::{Result, WrapErr, eyre};
use redis::AsyncCommands;
use serde_json::json;
use std::str::FromStr;
use stream_worker::MessageKey;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let mut args = std::env::args().skip(1);
    let kind_arg = args.next().unwrap_or_else(|| EventKind::AccountCreated.to_string());
    let kind = EventKind::from_str(&kind_arg).map_err(|_| eyre!("Unknown event kind '{}'", kind_arg))?;
    let email = args.next().unwrap_or_else(|| "test@example.com".to_string());
    let extra = args.next();

    let config = DispatcherConfig::from_env()?;
    let mut payload = json!({ "email": email });
    payload[config.discriminator.as_str()] = json!(kind.as_ref());
    let stream = match kind {
        EventKind::VerificationCodeIssued => {
            payload["code"] = json!(extra.unwrap_or_else(|| "482913".to_string()));
            &config.verification_stream
        }
        EventKind::PasswordResetRequested => {
            payload["resetToken"] = json!(extra.unwrap_or_else(|| "tok123".to_string()));
            &config.lifecycle_stream
        }
        EventKind::AccountCreated | EventKind::AccountDeleted => &config.lifecycle_stream,
    };

    let redis_url = RedisConfig::from_env()
        .map(|c| c.uri)
        .unwrap_or_else(|_| "redis://localhost:6379".to_string());
    println!("Connecting to Redis at {}", redis_url);

    let client = redis::Client::open(redis_url.as_str())?;
    let mut conn = redis::aio::ConnectionManager::new(client)
        .await
        .wrap_err("Failed to connect to Redis")?;

    let entry_id: String = conn
        .xadd(stream, "*", &[(MessageKey::Payload.as_ref(), payload.to_string())])
        .await
        .wrap_err_with(|| format!("Failed to publish to {}", stream))?;

    println!("Published {} to {}", kind, stream);
    println!("Payload: {}", payload);
    println!("Entry ID: {}", entry_id);

    Ok(())
}
