//! Configuration types for ring buffer backing regions

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::{
    config::{DEFAULT_RING_CAPACITY, MIN_RING_CAPACITY},
    error::{Result, RingprobeError},
    ringbuf::layout::DATA_OFFSET,
};

/// Types of memory backing a ring
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BackingType {
    /// Private anonymous mapping, visible to this process only
    Anonymous,
    /// File-backed shared memory
    FileBacked,
    /// Anonymous memory file descriptor (Linux-specific)
    #[cfg(target_os = "linux")]
    MemFd,
}

impl Default for BackingType {
    fn default() -> Self {
        Self::Anonymous
    }
}

impl BackingType {
    /// Check if this backing type is supported on the current platform
    pub fn is_supported(&self) -> bool {
        match self {
            BackingType::Anonymous | BackingType::FileBacked => true,
            #[cfg(target_os = "linux")]
            BackingType::MemFd => true,
        }
    }

    /// Get a human-readable name for the backing type
    pub fn name(&self) -> &'static str {
        match self {
            BackingType::Anonymous => "anonymous",
            BackingType::FileBacked => "file-backed",
            #[cfg(target_os = "linux")]
            BackingType::MemFd => "memfd",
        }
    }
}

/// Configuration for creating or opening a ring buffer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RingConfig {
    /// Name of the ring (memfd name, default file name)
    pub name: String,
    /// Data area capacity in bytes, a power of two
    pub capacity: usize,
    /// Backing type for the ring memory
    pub backing_type: BackingType,
    /// Optional file path for file-backed rings
    pub file_path: Option<PathBuf>,
    /// Create a fresh ring (true) or attach to an existing file (false)
    pub create: bool,
    /// Permissions for created files (Unix permissions)
    pub permissions: u32,
    /// Wake waiting consumers on submit
    pub notifications: bool,
}

impl Default for RingConfig {
    fn default() -> Self {
        Self {
            name: String::from("events"),
            capacity: DEFAULT_RING_CAPACITY,
            backing_type: BackingType::default(),
            file_path: None,
            create: true,
            permissions: 0o644,
            notifications: true,
        }
    }
}

impl RingConfig {
    /// Create a new ring configuration
    pub fn new(name: impl Into<String>, capacity: usize) -> Self {
        Self {
            name: name.into(),
            capacity,
            ..Default::default()
        }
    }

    /// Set the backing type
    pub fn with_backing_type(mut self, backing_type: BackingType) -> Self {
        self.backing_type = backing_type;
        self
    }

    /// Set the file path for file-backed rings
    pub fn with_file_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.file_path = Some(path.into());
        self
    }

    /// Set whether to create the ring or attach to an existing one
    pub fn with_create(mut self, create: bool) -> Self {
        self.create = create;
        self
    }

    /// Set the permissions for created files
    pub fn with_permissions(mut self, permissions: u32) -> Self {
        self.permissions = permissions;
        self
    }

    /// Enable or disable consumer wakeups
    pub fn with_notifications(mut self, notifications: bool) -> Self {
        self.notifications = notifications;
        self
    }

    /// Total size of the mapped region (control header plus data area)
    pub fn region_size(&self) -> usize {
        DATA_OFFSET + self.capacity
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.name.is_empty() {
            return Err(RingprobeError::invalid_parameter(
                "name",
                "Ring name cannot be empty",
            ));
        }

        if self.capacity < MIN_RING_CAPACITY || !self.capacity.is_power_of_two() {
            return Err(RingprobeError::invalid_parameter(
                "capacity",
                format!(
                    "Capacity must be a power of 2 and at least {} bytes",
                    MIN_RING_CAPACITY
                ),
            ));
        }

        if self.capacity > u32::MAX as usize >> 2 {
            return Err(RingprobeError::invalid_parameter(
                "capacity",
                "Capacity exceeds the record length field",
            ));
        }

        if !self.backing_type.is_supported() {
            return Err(RingprobeError::invalid_parameter(
                "backing_type",
                format!(
                    "Backing type {} is not supported on this platform",
                    self.backing_type.name()
                ),
            ));
        }

        if !self.create && self.backing_type != BackingType::FileBacked {
            return Err(RingprobeError::invalid_parameter(
                "create",
                format!(
                    "Only file-backed rings can be reopened, not {}",
                    self.backing_type.name()
                ),
            ));
        }

        Ok(())
    }

    /// Get the default file path for this ring
    pub fn default_file_path(&self) -> PathBuf {
        self.file_path
            .clone()
            .unwrap_or_else(|| PathBuf::from(format!("/tmp/ringprobe_{}", self.name)))
    }
}
