use crate::{ConfigError, ConfigResult};

/// 配置节的统一验证入口
pub trait ConfigValidator {
    fn validate(&self) -> ConfigResult<()>;
}

pub struct ValidationUtils;

impl ValidationUtils {
    pub fn validate_not_empty(value: &str, field: &str) -> ConfigResult<()> {
        if value.trim().is_empty() {
            return Err(ConfigError::Validation(format!(
                "{field} must not be empty"
            )));
        }
        Ok(())
    }

    pub fn validate_count(value: usize, field: &str) -> ConfigResult<()> {
        if value == 0 {
            return Err(ConfigError::Validation(format!(
                "{field} must be greater than 0"
            )));
        }
        Ok(())
    }

    pub fn validate_timeout_seconds(value: u64) -> ConfigResult<()> {
        if value == 0 {
            return Err(ConfigError::Validation(
                "timeout must be greater than 0 seconds".to_string(),
            ));
        }
        Ok(())
    }

    pub fn validate_bind_address(value: &str, field: &str) -> ConfigResult<()> {
        Self::validate_not_empty(value, field)?;
        if value.parse::<std::net::SocketAddr>().is_err() {
            return Err(ConfigError::Validation(format!(
                "{field} must be a valid socket address, got '{value}'"
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_not_empty() {
        assert!(ValidationUtils::validate_not_empty("x", "field").is_ok());
        assert!(ValidationUtils::validate_not_empty("", "field").is_err());
        assert!(ValidationUtils::validate_not_empty("   ", "field").is_err());
    }

    #[test]
    fn test_validate_count() {
        assert!(ValidationUtils::validate_count(1, "field").is_ok());
        assert!(ValidationUtils::validate_count(0, "field").is_err());
    }

    #[test]
    fn test_validate_bind_address() {
        assert!(ValidationUtils::validate_bind_address("0.0.0.0:8080", "api.bind_address").is_ok());
        assert!(ValidationUtils::validate_bind_address("not-an-addr", "api.bind_address").is_err());
    }
}
