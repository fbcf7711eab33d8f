use crate::utils::error::{Result, TxnError};

pub trait Validate {
    fn validate(&self) -> Result<()>;
}

pub fn validate_path(field_name: &str, path: &str) -> Result<()> {
    if path.is_empty() {
        return Err(TxnError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: path.to_string(),
            reason: "Path cannot be empty".to_string(),
        });
    }

    if path.contains('\0') {
        return Err(TxnError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: path.to_string(),
            reason: "Path contains null bytes".to_string(),
        });
    }

    Ok(())
}

pub fn validate_positive_number(field_name: &str, value: usize, min_value: usize) -> Result<()> {
    if value < min_value {
        return Err(TxnError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: format!("Value must be at least {}", min_value),
        });
    }
    Ok(())
}

pub fn validate_non_empty_string(field_name: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(TxnError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: "Value cannot be empty or whitespace-only".to_string(),
        });
    }
    Ok(())
}

pub fn validate_range<T: PartialOrd + std::fmt::Display + Copy>(
    field_name: &str,
    value: T,
    min: T,
    max: T,
) -> Result<()> {
    if value < min || value > max {
        return Err(TxnError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: format!("Value must be between {} and {}", min, max),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_path() {
        assert!(validate_path("config", "txn-guard.toml").is_ok());
        assert!(validate_path("config", "").is_err());
        assert!(validate_path("config", "a\0b").is_err());
    }

    #[test]
    fn test_validate_positive_number() {
        assert!(validate_positive_number("workers", 5, 1).is_ok());
        assert!(validate_positive_number("workers", 0, 1).is_err());
    }

    #[test]
    fn test_validate_range() {
        assert!(validate_range("backoff_min_ms", 200u64, 0, 60_000).is_ok());
        let err = validate_range("backoff_min_ms", 90_000u64, 0, 60_000).unwrap_err();
        assert!(err.to_string().contains("between 0 and 60000"));
    }

    #[test]
    fn test_validate_non_empty_string() {
        assert!(validate_non_empty_string("logging.level", "info").is_ok());
        assert!(validate_non_empty_string("logging.level", "   ").is_err());
    }
}
