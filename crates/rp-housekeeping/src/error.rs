//! Housekeeping error types

use std::io;
use thiserror::Error;

/// Result type for housekeeping operations
pub type HkResult<T> = Result<T, HkError>;

/// Errors that can occur while mapping or accessing the housekeeping block
#[derive(Error, Debug)]
pub enum HkError {
    /// Device file or board not found
    #[error("Housekeeping device not found: {0}")]
    DeviceNotFound(String),

    /// Failed to open device file
    #[error("Failed to open device: {0}")]
    OpenFailed(#[from] io::Error),

    /// Permission denied (e.g., /dev/mem access)
    #[error("Permission denied: {0}. Try running as root or add user to appropriate group.")]
    PermissionDenied(String),

    /// Memory mapping or unmapping failed
    #[error("Memory map failed at 0x{address:08x}: {reason}")]
    MmapFailed { address: usize, reason: String },

    /// The housekeeping block is already mapped by this process
    #[error("Housekeeping block is already mapped; release the existing handle first")]
    AlreadyMapped,

    /// Byte offset not word aligned or outside the mapped block
    #[error("Invalid register offset: 0x{0:02x}")]
    InvalidOffset(usize),

    /// Index into a register array out of range
    #[error("Index {index} out of range for {field} (max {max})")]
    InvalidIndex {
        field: &'static str,
        index: usize,
        max: usize,
    },

    /// Write attempted on a read-only field
    #[error("Field '{0}' is read-only")]
    ReadOnly(&'static str),

    /// Value above the declared bound of a field
    #[error("Value {value} out of range for '{field}' (max {max})")]
    OutOfRange {
        field: &'static str,
        value: u32,
        max: u32,
    },

    /// No field with this name in the register map
    #[error("Unknown field: {0}")]
    UnknownField(String),

    /// Text that does not parse as a hexadecimal word
    #[error("Invalid hex value '{0}'")]
    InvalidHex(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Backend not compiled in or not usable on this system
    #[error("Platform not supported on this system")]
    PlatformNotSupported,
}

impl HkError {
    /// Check if retrying the operation could succeed without changing input
    pub fn is_recoverable(&self) -> bool {
        matches!(self, HkError::AlreadyMapped)
    }

    /// Check if this is a permission error
    pub fn is_permission_error(&self) -> bool {
        matches!(self, HkError::PermissionDenied(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_classification() {
        assert!(HkError::PermissionDenied("/dev/mem".into()).is_permission_error());
        assert!(HkError::AlreadyMapped.is_recoverable());
        assert!(!HkError::ReadOnly("id").is_recoverable());
        assert!(!HkError::DeviceNotFound("/dev/mem".into()).is_recoverable());
    }

    #[test]
    fn test_error_messages() {
        let err = HkError::OutOfRange {
            field: "sim_bits",
            value: 40,
            max: 32,
        };
        assert_eq!(err.to_string(), "Value 40 out of range for 'sim_bits' (max 32)");

        let err = HkError::InvalidOffset(0x71);
        assert_eq!(err.to_string(), "Invalid register offset: 0x71");
    }
}
