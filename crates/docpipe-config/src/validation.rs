//! Configuration validation helpers

use crate::{ConfigError, ConfigResult};

/// Trait for validating configuration values
pub trait Validate {
    /// Validate this configuration object
    ///
    /// # Errors
    /// Returns validation errors if the configuration is invalid
    fn validate(&self) -> ConfigResult<()>;
}

/// Validate a URL string
///
/// # Errors
/// Returns `ConfigError::InvalidUrl` if the URL is not an http(s) endpoint
pub fn validate_url(url: &str, _field_name: &str) -> ConfigResult<()> {
    let valid = (url.starts_with("http://") || url.starts_with("https://"))
        && url.len() > "https://".len()
        && !url.contains(char::is_whitespace);
    if valid {
        Ok(())
    } else {
        Err(ConfigError::InvalidUrl {
            url: url.to_string(),
        })
    }
}

/// Validate a port number
///
/// # Errors
/// Returns `ConfigError::InvalidPort` if port is 0
pub const fn validate_port(port: u16, _field_name: &str) -> ConfigResult<()> {
    if port == 0 {
        Err(ConfigError::InvalidPort { port })
    } else {
        Ok(())
    }
}

/// Validate a value is within a range
///
/// # Errors
/// Returns `ConfigError::OutOfRange` if value is outside the specified range
pub fn validate_range(value: u64, min: u64, max: u64, field_name: &str) -> ConfigResult<()> {
    if value < min || value > max {
        Err(ConfigError::OutOfRange {
            field: field_name.to_string(),
            value,
            min,
            max,
        })
    } else {
        Ok(())
    }
}

/// Validate a string is not empty
///
/// # Errors
/// Returns `ConfigError::MissingField` if the string is empty or whitespace-only
pub fn validate_non_empty(value: &str, field_name: &str) -> ConfigResult<()> {
    if value.trim().is_empty() {
        Err(ConfigError::MissingField {
            field: field_name.to_string(),
        })
    } else {
        Ok(())
    }
}
