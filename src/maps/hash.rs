//! Hash table with a fixed number of entries

use std::{collections::HashMap, sync::Mutex};

use log::trace;

use crate::{
    config::DEFAULT_MAP_MAX_ENTRIES,
    error::{Result, RingprobeError},
};

use super::{BoundedMap, UpdateMode};

/// Mutex-guarded hash map refusing new keys once `max_entries` are stored
#[derive(Debug)]
pub struct HashTable {
    entries: Mutex<HashMap<u32, u32>>,
    max_entries: usize,
}

impl HashTable {
    /// Create a table holding at most `max_entries` keys
    pub fn new(max_entries: usize) -> Result<Self> {
        if max_entries == 0 {
            return Err(RingprobeError::invalid_parameter(
                "max_entries",
                "Map must hold at least one entry",
            ));
        }

        Ok(Self {
            entries: Mutex::new(HashMap::with_capacity(max_entries)),
            max_entries,
        })
    }

    /// Snapshot of the stored keys, sorted
    pub fn keys(&self) -> Vec<u32> {
        let mut keys: Vec<u32> = self.lock().keys().copied().collect();
        keys.sort_unstable();
        keys
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<u32, u32>> {
        // A panic while holding the lock cannot leave the map half-updated
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Default for HashTable {
    fn default() -> Self {
        Self {
            entries: Mutex::new(HashMap::with_capacity(DEFAULT_MAP_MAX_ENTRIES)),
            max_entries: DEFAULT_MAP_MAX_ENTRIES,
        }
    }
}

impl BoundedMap for HashTable {
    fn get(&self, key: u32) -> Option<u32> {
        self.lock().get(&key).copied()
    }

    fn update(&self, key: u32, value: u32, mode: UpdateMode) -> Result<()> {
        let mut entries = self.lock();
        let exists = entries.contains_key(&key);

        match mode {
            UpdateMode::NoExist if exists => return Err(RingprobeError::key_exists(key)),
            UpdateMode::Exist if !exists => return Err(RingprobeError::key_not_found(key)),
            _ => {}
        }

        if !exists && entries.len() >= self.max_entries {
            return Err(RingprobeError::map_full(self.max_entries));
        }

        entries.insert(key, value);
        trace!("map update {} -> {} ({:?})", key, value, mode);
        Ok(())
    }

    fn remove(&self, key: u32) -> Option<u32> {
        self.lock().remove(&key)
    }

    fn len(&self) -> usize {
        self.lock().len()
    }

    fn max_entries(&self) -> usize {
        self.max_entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_capacity() {
        let map = HashTable::default();
        assert_eq!(map.max_entries(), 42);
        assert!(map.is_empty());
    }

    #[test]
    fn test_set_get_remove() {
        let map = HashTable::new(4).unwrap();
        map.set(1, 10).unwrap();
        map.set(1, 11).unwrap();

        assert_eq!(map.get(1), Some(11));
        assert_eq!(map.len(), 1);
        assert_eq!(map.remove(1), Some(11));
        assert_eq!(map.get(1), None);
    }

    #[test]
    fn test_full_map_rejects_new_keys_only() {
        let map = HashTable::new(2).unwrap();
        map.set(1, 1).unwrap();
        map.set(2, 2).unwrap();

        assert!(matches!(
            map.set(3, 3),
            Err(RingprobeError::MapFull { max_entries: 2 })
        ));
        // Overwriting an existing key still works
        map.set(2, 20).unwrap();
        assert_eq!(map.get(2), Some(20));
        assert_eq!(map.keys(), vec![1, 2]);
    }

    #[test]
    fn test_update_modes() {
        let map = HashTable::new(4).unwrap();

        assert!(matches!(
            map.update(5, 1, UpdateMode::Exist),
            Err(RingprobeError::KeyNotFound { key: 5 })
        ));
        map.update(5, 1, UpdateMode::NoExist).unwrap();
        assert!(matches!(
            map.update(5, 2, UpdateMode::NoExist),
            Err(RingprobeError::KeyExists { key: 5 })
        ));
        map.update(5, 3, UpdateMode::Exist).unwrap();
        assert_eq!(map.get(5), Some(3));
    }

    #[test]
    fn test_zero_entries_rejected() {
        assert!(HashTable::new(0).is_err());
    }
}
