//! Error types and handling for ringprobe

/// Result type alias for ringprobe operations
pub type Result<T> = std::result::Result<T, RingprobeError>;

/// Error types for the ring buffer, side table and emit program
#[derive(Debug, thiserror::Error)]
pub enum RingprobeError {
    /// I/O related errors (file operations, mmap, etc.)
    #[error("I/O error: {message}")]
    Io {
        message: String,
        #[source]
        source: Option<std::io::Error>,
    },

    /// Memory allocation or mapping failures
    #[error("Memory error: {message}")]
    Memory { message: String },

    /// Invalid parameters or configuration
    #[error("Invalid parameter: {parameter} - {message}")]
    InvalidParameter { parameter: String, message: String },

    /// Not enough free bytes in the ring for a reservation
    #[error("Insufficient space: requested {requested}, available {available}")]
    InsufficientSpace { requested: usize, available: usize },

    /// Producer lock could not be taken within the spin budget
    #[error("Concurrency error: {message}")]
    Concurrency { message: String },

    /// Side table holds `max_entries` keys already
    #[error("Map full: {max_entries} entries")]
    MapFull { max_entries: usize },

    /// Key present where absence was required
    #[error("Key already exists: {key}")]
    KeyExists { key: u32 },

    /// Key absent where presence was required
    #[error("Key not found: {key}")]
    KeyNotFound { key: u32 },

    /// Record encoding/decoding errors
    #[error("Serialization error: {message}")]
    Serialization { message: String },

    /// Shared region does not carry a valid ring layout
    #[error("Layout error: {message}")]
    Layout { message: String },

    /// Platform-specific errors
    #[error("Platform error: {message}")]
    Platform { message: String },
}

impl RingprobeError {
    /// Create an I/O error from a standard I/O error
    pub fn from_io(source: std::io::Error, context: &str) -> Self {
        Self::Io {
            message: format!("{}: {}", context, source),
            source: Some(source),
        }
    }

    /// Create a memory error
    pub fn memory(message: impl Into<String>) -> Self {
        Self::Memory {
            message: message.into(),
        }
    }

    /// Create an invalid parameter error
    pub fn invalid_parameter(parameter: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidParameter {
            parameter: parameter.into(),
            message: message.into(),
        }
    }

    /// Create an insufficient space error
    pub fn insufficient_space(requested: usize, available: usize) -> Self {
        Self::InsufficientSpace {
            requested,
            available,
        }
    }

    /// Create a concurrency error
    pub fn concurrency(message: impl Into<String>) -> Self {
        Self::Concurrency {
            message: message.into(),
        }
    }

    /// Create a map full error
    pub fn map_full(max_entries: usize) -> Self {
        Self::MapFull { max_entries }
    }

    /// Create a key exists error
    pub fn key_exists(key: u32) -> Self {
        Self::KeyExists { key }
    }

    /// Create a key not found error
    pub fn key_not_found(key: u32) -> Self {
        Self::KeyNotFound { key }
    }

    /// Create a serialization error
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::Serialization {
            message: message.into(),
        }
    }

    /// Create a layout error
    pub fn layout(message: impl Into<String>) -> Self {
        Self::Layout {
            message: message.into(),
        }
    }

    /// Create a platform error
    pub fn platform(message: impl Into<String>) -> Self {
        Self::Platform {
            message: message.into(),
        }
    }

    /// Whether this error means the ring had no room for a reservation
    pub fn is_no_space(&self) -> bool {
        matches!(
            self,
            RingprobeError::InsufficientSpace { .. } | RingprobeError::Concurrency { .. }
        )
    }
}

impl From<std::io::Error> for RingprobeError {
    fn from(err: std::io::Error) -> Self {
        Self::from_io(err, "I/O operation failed")
    }
}

impl From<bincode::Error> for RingprobeError {
    fn from(err: bincode::Error) -> Self {
        Self::serialization(format!("Bincode error: {}", err))
    }
}

impl From<crate::sync::SyncError> for RingprobeError {
    fn from(err: crate::sync::SyncError) -> Self {
        Self::platform(format!("Notification error: {}", err))
    }
}
