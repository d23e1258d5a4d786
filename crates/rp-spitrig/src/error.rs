//! Application error types

use rp_housekeeping::HkError;
use thiserror::Error;

/// Result type for application operations
pub type AppResult<T> = Result<T, AppError>;

/// Errors raised by the SPI trigger application
#[derive(Error, Debug)]
pub enum AppError {
    /// Register access failed
    #[error("Housekeeping error: {0}")]
    Hk(#[from] HkError),

    /// Malformed parameter message
    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// No parameter with this name
    #[error("Unknown parameter: {0}")]
    UnknownParameter(String),

    /// Value of the wrong type for the parameter
    #[error("Invalid value for {name}: expected {expected}, got {got}")]
    InvalidValue {
        name: String,
        expected: &'static str,
        got: String,
    },

    /// Host tried to set a read-only parameter
    #[error("Parameter {0} is read-only")]
    ReadOnly(String),

    /// Hardware access before `init`
    #[error("Application not initialized")]
    NotInitialized,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hk_error_wraps() {
        let err: AppError = HkError::AlreadyMapped.into();
        assert!(matches!(err, AppError::Hk(HkError::AlreadyMapped)));
        assert!(err.to_string().starts_with("Housekeeping error: "));
    }

    #[test]
    fn test_invalid_value_message() {
        let err = AppError::InvalidValue {
            name: "SPI_SIM_BITS".into(),
            expected: "int",
            got: "true".into(),
        };
        assert_eq!(
            err.to_string(),
            "Invalid value for SPI_SIM_BITS: expected int, got true"
        );
    }
}
