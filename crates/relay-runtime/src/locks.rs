use std::collections::HashMap;
use std::sync::{Arc, Mutex, Weak};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// One async mutex per key, created on demand and dropped once unused
#[derive(Default)]
pub struct KeyedLocks {
    slots: Mutex<HashMap<String, Weak<AsyncMutex<()>>>>,
}

impl KeyedLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn lock(&self, key: &str) -> OwnedMutexGuard<()> {
        let slot = self.slot(key);
        slot.lock_owned().await
    }

    fn slot(&self, key: &str) -> Arc<AsyncMutex<()>> {
        let mut slots = self
            .slots
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        if let Some(existing) = slots.get(key).and_then(Weak::upgrade) {
            return existing;
        }

        slots.retain(|_, weak| weak.strong_count() > 0);
        let slot = Arc::new(AsyncMutex::new(()));
        slots.insert(key.to_string(), Arc::downgrade(&slot));
        slot
    }

    /// Keys that currently have a live lock
    pub fn active(&self) -> usize {
        self.slots
            .lock()
            .map(|slots| slots.values().filter(|w| w.strong_count() > 0).count())
            .unwrap_or(0)
    }
}
