use super::{Config, ConfigError};

impl Config {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let host = self.api_host_url()?;
        if !matches!(host.scheme(), "http" | "https") {
            return Err(ConfigError::InvalidUrl(format!(
                "API host must use http or https, got '{}'",
                host.scheme()
            )));
        }

        // An absent token may still arrive from a later layer.
        if let Some(token) = &self.token
            && token.trim().is_empty()
        {
            return Err(ConfigError::MissingToken);
        }

        if self.buffer_size == Some(0) {
            return Err(ConfigError::InvalidConfig(
                "Buffer size must be greater than 0".to_string(),
            ));
        }

        if self.timeout_secs == 0 {
            return Err(ConfigError::InvalidConfig(
                "Request timeout must be greater than 0".to_string(),
            ));
        }

        if self.connection_timeout_secs == 0 {
            return Err(ConfigError::InvalidConfig(
                "Connection timeout must be greater than 0".to_string(),
            ));
        }

        if self.max_connections == 0 {
            return Err(ConfigError::InvalidConfig(
                "Max connections must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}
