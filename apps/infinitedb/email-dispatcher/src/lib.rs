//! InfiniteDb Email Dispatcher
//!
//! Consumes account events from two Redis streams and sends the matching
//! transactional emails.
//!
//! ## Architecture
//!
//! ```text
//! Redis Streams (verification-code-emails, account-lifecycle-events)
//!   ↓ (Consumer Group: email_dispatchers)
//! StreamWorker<Dispatcher> × 2
//!   ↓ (classifies, renders)
//! TemplateEngine (Handlebars)
//!   ↓ (sends)
//! EmailProvider (SendGrid/SMTP/in-memory)
//! ```
//!
//! ## Features
//!
//! - Consumer group support for horizontal scaling
//! - Redelivery of unacknowledged messages after an idle time
//! - Dead letter streams for messages out of deliveries
//! - Graceful shutdown on SIGINT/SIGTERM
//! - Health, readiness and Prometheus endpoints

use core_config::redis::RedisConfig;
use core_config::server::ServerConfig;
use core_config::{app_info, AppInfo, Environment, FromEnv};
use domain_notifications::providers::SmtpConfig;
use domain_notifications::{
    Dispatcher, DispatcherConfig, EmailProvider, EventClassifier, InMemoryProvider, ProviderKind,
    SendGridProvider, SmtpProvider, TemplateEngine,
};
use eyre::{Result, WrapErr};
use std::sync::Arc;
use stream_worker::connection::connect_with_retry;
use stream_worker::{health_router, metrics, HealthState, StreamProcessor, StreamWorker};
use tokio::net::TcpListener;
use tokio::signal;
use tokio::sync::watch;
use tracing::{error, info, warn};

const REDIS_CONNECT_ATTEMPTS: u32 = 10;

/// Everything loaded at startup, before a provider is chosen.
struct Startup {
    app_info: AppInfo,
    redis: RedisConfig,
    server: ServerConfig,
    dispatcher: DispatcherConfig,
    templates: Arc<TemplateEngine>,
}

/// Run the email dispatcher
///
/// 1. Sets up structured logging (JSON for prod, pretty for dev) and metrics
/// 2. Loads configuration and compiles the templates
/// 3. Selects the email provider (`EMAIL_PROVIDER`, else by environment)
/// 4. Runs one worker per stream until shutdown or a fatal error
///
/// # Errors
///
/// Returns an error if configuration is missing or invalid, Redis is
/// unreachable, or a worker stops on a fatal error such as a misconfigured
/// email provider.
pub async fn run() -> Result<()> {
    let environment = Environment::from_env();
    core_config::tracing::init_tracing(&environment);

    metrics::init_metrics().wrap_err("Failed to install Prometheus recorder")?;

    let app_info = app_info!();
    info!(name = %app_info.name, version = %app_info.version, "Starting email dispatcher");
    info!("Environment: {:?}", environment);

    let redis = RedisConfig::from_env().wrap_err("Failed to load Redis configuration")?;
    let server = ServerConfig::from_env().wrap_err("Failed to load health server configuration")?;
    let dispatcher = DispatcherConfig::from_env().wrap_err("Failed to load dispatcher configuration")?;
    let provider_kind = ProviderKind::from_env(&environment).wrap_err("Failed to select email provider")?;

    let templates = TemplateEngine::with_branding(dispatcher.branding.clone())
        .wrap_err("Failed to initialize template engine")?;
    info!(product = %dispatcher.branding.product_name, "Template engine initialized");

    let startup = Startup {
        app_info,
        redis,
        server,
        dispatcher,
        templates: Arc::new(templates),
    };

    match provider_kind {
        ProviderKind::SendGrid => {
            info!("Using SendGrid provider");
            let provider = SendGridProvider::from_env().wrap_err(
                "SendGrid configuration error. Ensure SENDGRID_API_KEY and SENDGRID_FROM_EMAIL are set",
            )?;
            serve(provider, startup).await
        }
        ProviderKind::Smtp => {
            info!("Using SMTP provider");
            let config = SmtpConfig::from_env().wrap_err("Failed to load SMTP configuration")?;
            let provider = SmtpProvider::new(config).wrap_err("Failed to create SMTP provider")?;
            serve(provider, startup).await
        }
        ProviderKind::Memory => {
            warn!("Using in-memory provider, emails are recorded but never sent");
            serve(InMemoryProvider::default(), startup).await
        }
    }
}

/// Wire the workers and the health server around a chosen provider.
async fn serve<P: EmailProvider + 'static>(provider: P, startup: Startup) -> Result<()> {
    let Startup {
        app_info,
        redis,
        server,
        dispatcher: config,
        templates,
    } = startup;

    // Blocking XREADGROUP holds its connection, so each worker gets its own.
    info!("Connecting to Redis...");
    let health_conn = connect_with_retry(&redis.uri, REDIS_CONNECT_ATTEMPTS)
        .await
        .wrap_err("Failed to connect to Redis")?;
    let verification_conn = connect_with_retry(&redis.uri, REDIS_CONNECT_ATTEMPTS)
        .await
        .wrap_err("Failed to connect to Redis")?;
    let lifecycle_conn = connect_with_retry(&redis.uri, REDIS_CONNECT_ATTEMPTS)
        .await
        .wrap_err("Failed to connect to Redis")?;

    let dispatcher = Arc::new(Dispatcher::new(
        EventClassifier::new(config.discriminator.clone()),
        templates,
        Arc::new(provider),
    ));

    let verification_worker = StreamWorker::new(
        verification_conn,
        Arc::clone(&dispatcher),
        config.verification_worker(),
    );
    let lifecycle_worker = StreamWorker::new(
        lifecycle_conn,
        Arc::clone(&dispatcher),
        config.lifecycle_worker(),
    );

    let processor: Arc<dyn StreamProcessor> = dispatcher;
    let health_state = HealthState::new(health_conn, app_info.name, app_info.version)
        .with_consumer(verification_worker.consumer().clone())
        .with_consumer(lifecycle_worker.consumer().clone())
        .with_processor(processor);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    tokio::spawn(async move {
        if let Err(e) = shutdown_signal().await {
            error!("Error waiting for shutdown signal: {}", e);
        }
        let _ = shutdown_tx.send(true);
    });

    tokio::spawn(async move {
        if let Err(e) = start_health_server(health_state, &server).await {
            error!(error = %e, "Health server failed");
        }
    });

    let result = tokio::try_join!(
        verification_worker.run(shutdown_rx.clone()),
        lifecycle_worker.run(shutdown_rx),
    );

    match result {
        Ok(_) => {
            info!("Email dispatcher stopped");
            Ok(())
        }
        Err(e) => {
            error!(error = %e, category = %e.category(), "Stream worker stopped on a fatal error");
            Err(e).wrap_err("Stream worker failed")
        }
    }
}

/// Serve `/health`, `/ready` and `/metrics`.
async fn start_health_server(health_state: HealthState, server: &ServerConfig) -> Result<()> {
    let addr = server.address();
    let listener = TcpListener::bind(&addr)
        .await
        .wrap_err_with(|| format!("Failed to bind health server to {}", addr))?;

    info!(address = %addr, "Health server listening");

    axum::serve(listener, health_router(health_state))
        .await
        .wrap_err("Health server failed")?;

    Ok(())
}

/// Wait for a shutdown signal (SIGINT or SIGTERM)
async fn shutdown_signal() -> Result<()> {
    #[cfg(unix)]
    let mut terminate = signal::unix::signal(signal::unix::SignalKind::terminate())
        .wrap_err("Failed to install SIGTERM handler")?;

    #[cfg(unix)]
    let terminate = terminate.recv();

    #[cfg(not(unix))]
    let terminate = std::future::pending::<Option<()>>();

    tokio::select! {
        result = signal::ctrl_c() => {
            result.wrap_err("Failed to install Ctrl+C handler")?;
            info!("Received Ctrl+C, initiating shutdown...");
        },
        _ = terminate => {
            info!("Received SIGTERM, initiating shutdown...");
        },
    }

    Ok(())
}
