use crate::error::store::StoreError;
use crate::store::CredentialStore;

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};

use zeroize::Zeroize;

/// In-process credential store.
///
/// Can be locked to model a keychain that is unreachable until the user
/// unlocks it; every operation fails with [`StoreError::Locked`] meanwhile.
#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    entries: Mutex<HashMap<String, Vec<u8>>>,
    locked: AtomicBool,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lock(&self) {
        self.locked.store(true, Ordering::Release);
    }

    pub fn unlock(&self) {
        self.locked.store(false, Ordering::Release);
    }

    pub fn is_locked(&self) -> bool {
        self.locked.load(Ordering::Acquire)
    }

    pub fn labels(&self) -> Vec<String> {
        let mut labels: Vec<String> = self.entries().keys().cloned().collect();
        labels.sort();
        labels
    }

    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }

    #[track_caller]
    fn ensure_unlocked(&self) -> Result<(), StoreError> {
        if self.is_locked() {
            return Err(StoreError::locked());
        }
        Ok(())
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<String, Vec<u8>>> {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn store(&self, label: &str, bytes: &[u8]) -> Result<(), StoreError> {
        self.ensure_unlocked()?;
        if let Some(mut previous) = self.entries().insert(label.to_string(), bytes.to_vec()) {
            previous.zeroize();
        }
        Ok(())
    }

    fn load(&self, label: &str) -> Result<Option<Vec<u8>>, StoreError> {
        self.ensure_unlocked()?;
        Ok(self.entries().get(label).cloned())
    }

    fn delete(&self, label: &str) -> Result<(), StoreError> {
        self.ensure_unlocked()?;
        if let Some(mut removed) = self.entries().remove(label) {
            removed.zeroize();
        }
        Ok(())
    }
}

impl Drop for MemoryCredentialStore {
    fn drop(&mut self) {
        for value in self.entries().values_mut() {
            value.zeroize();
        }
    }
}
