use crate::config::types::{Config, CrawlerConfig, StorageConfig, UserAgentConfig};
use crate::url::CanonicalUrl;
use crate::ConfigError;
use url::Url;

/// Largest worker pool accepted
pub const MAX_WORKERS: usize = 1000;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawler_config(&config.crawler)?;
    validate_user_agent_config(&config.user_agent)?;
    validate_storage_config(&config.storage)?;
    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.workers < 1 || config.workers > MAX_WORKERS {
        return Err(ConfigError::Validation(format!(
            "workers must be between 1 and {}, got {}",
            MAX_WORKERS, config.workers
        )));
    }

    for seed in &config.seeds {
        validate_seed(seed)?;
    }

    Ok(())
}

/// Seeds must canonicalize to an absolute http URL with a host
fn validate_seed(seed: &str) -> Result<(), ConfigError> {
    let url = CanonicalUrl::parse(seed)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid seed URL '{}': {}", seed, e)))?;

    if !url.is_crawlable() {
        return Err(ConfigError::InvalidUrl(format!(
            "Seed URL '{}' must be an absolute http URL",
            seed
        )));
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
        .all(|c| c.is_ascii_alphanumeric() || c == '-')
    {
        return Err(ConfigError::Validation(format!(
            "crawler_name must contain only alphanumeric characters and hyphens, got '{}'",
            config.crawler_name
        )));
    }

    if config.crawler_version.trim().is_empty() {
        return Err(ConfigError::Validation(
            "crawler_version cannot be empty".to_string(),
        ));
    }

    Url::parse(&config.contact_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid contact_url: {}", e)))?;

    validate_email(&config.contact_email)?;

    Ok(())
}

fn validate_storage_config(config: &StorageConfig) -> Result<(), ConfigError> {
    if config.store_dir.trim().is_empty() {
        return Err(ConfigError::Validation(
            "store_dir cannot be empty".to_string(),
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

    let Some((local, domain)) = email.split_once('@') else {
        return Err(ConfigError::Validation(format!(
            "Invalid email format: '{}'",
            email
        )));
    };

    if local.is_empty() || domain.is_empty() || domain.contains('@') {
        return Err(ConfigError::Validation(format!(
            "Invalid email format: '{}'",
            email
        )));
    }

    if !domain.contains('.') {
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
    fn test_validate_seed() {
        assert!(validate_seed("http://example.com/").is_ok());
        assert!(validate_seed("HTTP://Example.com:80").is_ok());

        assert!(matches!(
            validate_seed("https://example.com/"),
            Err(ConfigError::InvalidUrl(_))
        ));
        assert!(validate_seed("/relative").is_err());
        assert!(validate_seed("http:/nohost").is_err());
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
        assert!(validate_email("a@b@c.com").is_err());
    }

    #[test]
    fn test_validate_workers() {
        let mut config = CrawlerConfig {
            workers: 0,
            seeds: vec![],
        };
        assert!(validate_crawler_config(&config).is_err());
        config.workers = MAX_WORKERS + 1;
        assert!(validate_crawler_config(&config).is_err());
        config.workers = 4;
        assert!(validate_crawler_config(&config).is_ok());
    }

    #[test]
    fn test_validate_crawler_name() {
        let mut config = UserAgentConfig {
            crawler_name: "Spinneret-Test".to_string(),
            crawler_version: "0.1".to_string(),
            contact_url: "http://example.com/bot".to_string(),
            contact_email: "bot@example.com".to_string(),
        };
        assert!(validate_user_agent_config(&config).is_ok());

        config.crawler_name = "Bad Name".to_string();
        assert!(validate_user_agent_config(&config).is_err());

        config.crawler_name = "Ok".to_string();
        config.contact_url = "not a url".to_string();
        assert!(matches!(
            validate_user_agent_config(&config),
            Err(ConfigError::InvalidUrl(_))
        ));
    }
}
