//! Bounded key-value side tables available to programs

pub mod hash;

pub use hash::HashTable;

use crate::error::Result;

/// How `update` treats an existing key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UpdateMode {
    /// Insert or overwrite
    #[default]
    Any,
    /// Only insert; fail if the key exists
    NoExist,
    /// Only overwrite; fail if the key is missing
    Exist,
}

/// Fixed-capacity `u32 -> u32` map
///
/// Every call is atomic on its own; callers needing read-modify-write across
/// calls must bring their own discipline.
pub trait BoundedMap {
    /// Look up a key
    fn get(&self, key: u32) -> Option<u32>;

    /// Insert or overwrite according to `mode`
    fn update(&self, key: u32, value: u32, mode: UpdateMode) -> Result<()>;

    /// Remove a key, returning its value
    fn remove(&self, key: u32) -> Option<u32>;

    /// Number of stored keys
    fn len(&self) -> usize;

    /// Maximum number of keys
    fn max_entries(&self) -> usize;

    /// Insert or overwrite
    fn set(&self, key: u32, value: u32) -> Result<()> {
        self.update(key, value, UpdateMode::Any)
    }

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
