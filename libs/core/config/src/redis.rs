use crate::{env_required, ConfigError, FromEnv};

/// Redis configuration
#[derive(Clone, Debug)]
pub struct RedisConfig {
    pub uri: String,
}

impl RedisConfig {
    pub fn new(uri: impl Into<String>) -> Self {
        Self { uri: uri.into() }
    }
}

impl FromEnv for RedisConfig {
    /// Reads REDIS_URL, falling back to REDIS_HOST (no default)
    fn from_env() -> Result<Self, ConfigError> {
        let uri = env_required("REDIS_URL")
            .or_else(|_| env_required("REDIS_HOST"))
            .map_err(|_| ConfigError::MissingEnvVar("REDIS_URL".to_string()))?;

        Ok(Self { uri })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redis_config_prefers_redis_url() {
        temp_env::with_vars(
            [
                ("REDIS_URL", Some("redis://primary:6379")),
                ("REDIS_HOST", Some("redis://legacy:6379")),
            ],
            || {
                let config = RedisConfig::from_env().unwrap();
                assert_eq!(config.uri, "redis://primary:6379");
            },
        );
    }

    #[test]
    fn test_redis_config_falls_back_to_host() {
        temp_env::with_vars(
            [
                ("REDIS_URL", None),
                ("REDIS_HOST", Some("redis://localhost:6379")),
            ],
            || {
                let config = RedisConfig::from_env().unwrap();
                assert_eq!(config.uri, "redis://localhost:6379");
            },
        );
    }

    #[test]
    fn test_redis_config_from_env_missing() {
        temp_env::with_vars_unset(["REDIS_URL", "REDIS_HOST"], || {
            let err = RedisConfig::from_env().unwrap_err();
            assert!(err.to_string().contains("REDIS_URL"));
            assert!(err.to_string().contains("required"));
        });
    }
}
