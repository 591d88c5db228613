use crate::config::types::{AliasConfig, Config, HttpConfig, MirrorConfig, UpstreamConfig};
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_upstream_config(&config.upstream)?;
    validate_mirror_config(&config.mirror)?;
    validate_alias_config(&config.aliases)?;
    validate_http_config(&config.http)?;
    Ok(())
}

/// Validates the upstream repository settings
fn validate_upstream_config(config: &UpstreamConfig) -> Result<(), ConfigError> {
    let url = Url::parse(&config.host)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid upstream host '{}': {}", config.host, e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "Upstream host '{}' must use http or https",
            config.host
        )));
    }

    require_non_empty("package-prefix", &config.package_prefix)?;
    require_non_empty("source-marker", &config.source_marker)?;

    Ok(())
}

/// Validates mirror layout settings
fn validate_mirror_config(config: &MirrorConfig) -> Result<(), ConfigError> {
    require_non_empty("root", &config.root)?;
    require_non_empty("packages-file", &config.packages_file)?;
    require_non_empty("report-path", &config.report_path)?;
    Ok(())
}

/// Validates alias index settings
fn validate_alias_config(config: &AliasConfig) -> Result<(), ConfigError> {
    require_non_empty("index-path", &config.index_path)?;

    if config.max_age_hours == 0 {
        return Err(ConfigError::Validation(
            "max-age-hours must be >= 1".to_string(),
        ));
    }

    Ok(())
}

/// Validates HTTP client settings
fn validate_http_config(config: &HttpConfig) -> Result<(), ConfigError> {
    require_non_empty("user-agent", &config.user_agent)?;

    for (name, value) in [
        ("timeout-secs", config.timeout_secs),
        ("connect-timeout-secs", config.connect_timeout_secs),
        ("package-deadline-secs", config.package_deadline_secs),
    ] {
        if value == 0 {
            return Err(ConfigError::Validation(format!(
                "{} must be >= 1, got {}",
                name, value
            )));
        }
    }

    Ok(())
}

fn require_non_empty(name: &str, value: &str) -> Result<(), ConfigError> {
    if value.trim().is_empty() {
        return Err(ConfigError::Validation(format!("{} cannot be empty", name)));
    }
    Ok(())
}
