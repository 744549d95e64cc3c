//! Server Configuration
//!
//! Configuration is loaded from environment variables with sensible defaults
//! for local development. The database is mandatory: every chat operation
//! goes through the store, so a missing `DATABASE_URL` is a startup error
//! rather than a degraded mode.

use std::time::Duration;

use sqlx::PgPool;

/// Runtime configuration loaded from the environment
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// TCP port the HTTP server binds to
    pub port: u16,
    /// Idle-connection reaping window for the WebSocket gateway
    ///
    /// A connection that stops answering pings for longer than this is
    /// forcibly disconnected to bound stale presence state. Tunable, not a
    /// protocol guarantee.
    pub heartbeat_timeout: Duration,
}

impl ServerConfig {
    /// Load configuration from environment variables
    ///
    /// - `SERVER_PORT` (default 3000)
    /// - `WS_HEARTBEAT_SECS` (default 60, minimum 1; the gateway derives its
    ///   ping interval from this and a zero period is not a valid interval)
    pub fn from_env() -> Self {
        let port = std::env::var("SERVER_PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(3000);

        let heartbeat_secs: u64 = std::env::var("WS_HEARTBEAT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(60);
        let heartbeat_secs = heartbeat_secs.max(1);

        Self {
            port,
            heartbeat_timeout: Duration::from_secs(heartbeat_secs),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 3000,
            heartbeat_timeout: Duration::from_secs(60),
        }
    }
}

/// Connect to the database and run migrations
///
/// Reads `DATABASE_URL` from the environment. Migration failures are logged
/// but do not abort startup; the schema may already be up to date.
pub async fn load_database() -> Result<PgPool, sqlx::Error> {
    let database_url = std::env::var("DATABASE_URL").map_err(|_| {
        tracing::error!("DATABASE_URL not set");
        sqlx::Error::Configuration("DATABASE_URL not set".into())
    })?;

    tracing::info!("Connecting to database...");
    let pool = PgPool::connect(&database_url).await?;
    tracing::info!("Database connection pool created");

    match sqlx::migrate!("./migrations").run(&pool).await {
        Ok(_) => tracing::info!("Database migrations completed"),
        Err(e) => {
            tracing::error!("Failed to run database migrations: {:?}", e);
            tracing::warn!("Continuing without migrations - schema might not be up to date");
        }
    }

    Ok(pool)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_config_defaults() {
        std::env::remove_var("SERVER_PORT");
        std::env::remove_var("WS_HEARTBEAT_SECS");
        let config = ServerConfig::from_env();
        assert_eq!(config.port, 3000);
        assert_eq!(config.heartbeat_timeout, Duration::from_secs(60));
    }

    #[test]
    #[serial]
    fn test_heartbeat_zero_clamped_to_one_second() {
        // A zero window would give the gateway a zero ping period, which
        // tokio's interval rejects.
        std::env::set_var("WS_HEARTBEAT_SECS", "0");
        let config = ServerConfig::from_env();
        assert_eq!(config.heartbeat_timeout, Duration::from_secs(1));
        std::env::remove_var("WS_HEARTBEAT_SECS");
    }

    #[test]
    #[serial]
    fn test_config_from_env() {
        std::env::set_var("SERVER_PORT", "8080");
        std::env::set_var("WS_HEARTBEAT_SECS", "15");
        let config = ServerConfig::from_env();
        assert_eq!(config.port, 8080);
        assert_eq!(config.heartbeat_timeout, Duration::from_secs(15));
        std::env::remove_var("SERVER_PORT");
        std::env::remove_var("WS_HEARTBEAT_SECS");
    }
}
