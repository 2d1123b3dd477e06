use crate::config::types::{Config, CrawlerConfig, OutputConfig, SeedEntry, SourceConfig};
use crate::model::EntityKind;
use crate::ConfigError;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawler_config(&config.crawler)?;
    validate_source_config(&config.source)?;
    validate_output_config(&config.output)?;
    validate_seeds(&config.seed)?;
    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.worker_count < 1 || config.worker_count > 8 {
        return Err(ConfigError::Validation(format!(
            "worker_count must be between 1 and 8, got {}",
            config.worker_count
        )));
    }

    if config.max_attempts < 1 {
        return Err(ConfigError::Validation(format!(
            "max_attempts must be >= 1, got {}",
            config.max_attempts
        )));
    }

    if config.fetch_timeout_secs < 1 {
        return Err(ConfigError::Validation(format!(
            "fetch_timeout_secs must be >= 1, got {}",
            config.fetch_timeout_secs
        )));
    }

    Ok(())
}

/// Validates source configuration
fn validate_source_config(config: &SourceConfig) -> Result<(), ConfigError> {
    if !config.base_url.starts_with("http://") && !config.base_url.starts_with("https://") {
        return Err(ConfigError::InvalidBaseUrl(config.base_url.clone()));
    }

    if config.user_agent.is_empty() {
        return Err(ConfigError::Validation(
            "user_agent cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.database_path.is_empty() {
        return Err(ConfigError::Validation(
            "database_path cannot be empty".to_string(),
        ));
    }

    if config.dead_letter_dir.is_empty() {
        return Err(ConfigError::Validation(
            "dead_letter_dir cannot be empty".to_string(),
        ));
    }

    if config.graph_path.is_empty() {
        return Err(ConfigError::Validation(
            "graph_path cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates seed entries
///
/// Every seed kind must name a known entity kind and every reference must
/// carry the matching path prefix, since the pipeline recovers the kind
/// from the reference alone once items are in the queue.
fn validate_seeds(seeds: &[SeedEntry]) -> Result<(), ConfigError> {
    if seeds.is_empty() {
        return Err(ConfigError::Validation(
            "at least one [[seed]] entry is required".to_string(),
        ));
    }

    for entry in seeds {
        let kind = EntityKind::from_config_string(&entry.kind).ok_or_else(|| {
            ConfigError::Validation(format!("unknown seed kind '{}'", entry.kind))
        })?;

        if entry.references.is_empty() {
            return Err(ConfigError::Validation(format!(
                "seed entry '{}' must have at least one reference",
                entry.kind
            )));
        }

        for reference in &entry.references {
            if reference.is_empty() || reference.starts_with('/') {
                return Err(ConfigError::InvalidSeed(reference.clone()));
            }

            match EntityKind::from_reference(reference) {
                Some(k) if k == kind => {}
                _ => {
                    return Err(ConfigError::InvalidSeed(format!(
                        "reference '{}' does not match seed kind '{}'",
                        reference, entry.kind
                    )));
                }
            }
        }
    }

    Ok(())
}
