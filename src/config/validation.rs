use crate::config::types::{Config, CrawlerConfig, StorageConfig, UserAgentConfig};
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawler_config(&config.crawler)?;
    validate_user_agent_config(&config.user_agent)?;
    validate_storage_config(&config.storage)?;
    Ok(())
}

/// Validates worker pool and probing configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.workers < 1 || config.workers > 64 {
        return Err(ConfigError::Validation(format!(
            "workers must be between 1 and 64, got {}",
            config.workers
        )));
    }

    if config.queue_capacity < 1 || config.queue_capacity > 10_000 {
        return Err(ConfigError::Validation(format!(
            "queue_capacity must be between 1 and 10000, got {}",
            config.queue_capacity
        )));
    }

    if config.probe_concurrency < 1 || config.probe_concurrency > 100 {
        return Err(ConfigError::Validation(format!(
            "probe_concurrency must be between 1 and 100, got {}",
            config.probe_concurrency
        )));
    }

    if config.probe_timeout_ms < 100 {
        return Err(ConfigError::Validation(format!(
            "probe_timeout_ms must be >= 100ms, got {}ms",
            config.probe_timeout_ms
        )));
    }

    if config.crawl_timeout_secs < 1 {
        return Err(ConfigError::Validation(
            "crawl_timeout_secs must be >= 1".to_string(),
        ));
    }

    Ok(())
}

/// Validates user agent configuration
fn validate_user_agent_config(config: &UserAgentConfig) -> Result<(), ConfigError> {
    // Validate crawler name: non-empty, alphanumeric + hyphens only
    if config.crawler_name.is_empty() {
        return Err(ConfigError::Validation(
            "crawler_name cannot be empty".to_string(),
        ));
    }

    if !config
        .crawler_name
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-')
    {
        return Err(ConfigError::Validation(format!(
            "crawler_name must contain only alphanumeric characters and hyphens, got '{}'",
            config.crawler_name
        )));
    }

    Url::parse(&config.contact_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid contact_url: {}", e)))?;

    validate_email(&config.contact_email)?;

    Ok(())
}

/// Validates storage configuration
fn validate_storage_config(config: &StorageConfig) -> Result<(), ConfigError> {
    if config.database_path.is_empty() {
        return Err(ConfigError::Validation(
            "database_path cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Basic email validation
fn validate_email(email: &str) -> Result<(), ConfigError> {
    if email.is_empty() {
        return Err(ConfigError::Validation(
            "contact_email cannot be empty".to_string(),
        ));
    }

    // Basic email format check: must contain @ and have text on both sides
    let parts: Vec<&str> = email.split('@').collect();
    if parts.len() != 2 || parts[0].is_empty() || parts[1].is_empty() {
        return Err(ConfigError::Validation(format!(
            "Invalid email format: '{}'",
            email
        )));
    }

    if !parts[1].contains('.') {
        return Err(ConfigError::Validation(format!(
            "Invalid email domain: '{}'",
            email
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate(&Config::default()).is_ok());
    }

    #[test]
    fn test_worker_bounds() {
        let mut config = Config::default();
        config.crawler.workers = 0;
        assert!(validate(&config).is_err());

        config.crawler.workers = 65;
        assert!(validate(&config).is_err());

        config.crawler.workers = 64;
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn test_probe_timeout_floor() {
        let mut config = Config::default();
        config.crawler.probe_timeout_ms = 99;
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_zero_crawl_timeout_rejected() {
        let mut config = Config::default();
        config.crawler.crawl_timeout_secs = 0;
        assert!(matches!(validate(&config), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn test_crawler_name_characters() {
        let mut config = Config::default();
        config.user_agent.crawler_name = "Page Sounder".to_string();
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_invalid_contact_url() {
        let mut config = Config::default();
        config.user_agent.contact_url = "not a url".to_string();
        assert!(matches!(validate(&config), Err(ConfigError::InvalidUrl(_))));
    }

    #[test]
    fn test_empty_database_path() {
        let mut config = Config::default();
        config.storage.database_path = String::new();
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_validate_email() {
        assert!(validate_email("user@example.com").is_ok());
        assert!(validate_email("admin@sub.example.com").is_ok());

        assert!(validate_email("").is_err());
        assert!(validate_email("invalid").is_err());
        assert!(validate_email("@example.com").is_err());
        assert!(validate_email("user@").is_err());
        assert!(validate_email("user@domain").is_err());
    }
}
