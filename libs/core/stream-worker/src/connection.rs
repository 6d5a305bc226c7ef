//! Redis connection helpers

use redis::aio::ConnectionManager;
use redis::Client;
use std::time::Duration;
use tracing::{info, warn};

/// Connect to Redis and verify the connection with PING
pub async fn connect(url: &str) -> redis::RedisResult<ConnectionManager> {
    let client = Client::open(url)?;
    let manager = ConnectionManager::new(client).await?;

    let mut conn = manager.clone();
    let _: String = redis::cmd("PING").query_async(&mut conn).await?;

    Ok(manager)
}

/// Connect with exponential backoff, for startup races with the Redis container
pub async fn connect_with_retry(url: &str, max_attempts: u32) -> redis::RedisResult<ConnectionManager> {
    let mut attempt = 1;
    let mut delay = Duration::from_millis(200);

    loop {
        match connect(url).await {
            Ok(manager) => {
                info!(attempt, "Connected to Redis");
                return Ok(manager);
            }
            Err(e) if attempt < max_attempts => {
                warn!(attempt, max_attempts, error = %e, delay_ms = delay.as_millis() as u64, "Redis connection failed, retrying");
                tokio::time::sleep(delay).await;
                delay = (delay * 2).min(Duration::from_secs(5));
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}
