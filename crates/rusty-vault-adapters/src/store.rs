use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};

use serde_json::Value;

use rusty_vault_runtime::{PortError, StateStorePort, StoreListener, StoreSubscriptionId};

/// Subscribe/dispatch key-value store shared by the application shell.
#[derive(Clone, Default)]
pub struct StateStore {
    inner: Arc<Mutex<StoreState>>,
}

#[derive(Default)]
struct StoreState {
    values: HashMap<String, Value>,
    listeners: BTreeMap<StoreSubscriptionId, (String, StoreListener)>,
    next_id: u64,
}

impl std::fmt::Debug for StateStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StateStore").finish_non_exhaustive()
    }
}

impl StateStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, StoreState>, PortError> {
        self.inner
            .lock()
            .map_err(|e| PortError::Transport(format!("store lock poisoned: {e}")))
    }

    pub fn keys(&self) -> Result<Vec<String>, PortError> {
        let mut keys: Vec<String> = self.lock()?.values.keys().cloned().collect();
        keys.sort();
        Ok(keys)
    }
}

impl StateStorePort for StateStore {
    fn get(&self, key: &str) -> Result<Option<Value>, PortError> {
        Ok(self.lock()?.values.get(key).cloned())
    }

    fn dispatch(&self, key: &str, value: Value) -> Result<(), PortError> {
        let listeners: Vec<StoreListener> = {
            let mut g = self.lock()?;
            g.values.insert(key.to_owned(), value.clone());
            g.listeners
                .values()
                .filter(|(k, _)| k == key)
                .map(|(_, listener)| Arc::clone(listener))
                .collect()
        };
        for listener in listeners {
            listener(key, &value);
        }
        Ok(())
    }

    fn subscribe(
        &self,
        key: &str,
        listener: StoreListener,
    ) -> Result<StoreSubscriptionId, PortError> {
        let mut g = self.lock()?;
        g.next_id = g.next_id.saturating_add(1);
        let id = StoreSubscriptionId(g.next_id);
        g.listeners.insert(id, (key.to_owned(), listener));
        Ok(id)
    }

    fn unsubscribe(&self, id: StoreSubscriptionId) -> Result<(), PortError> {
        self.lock()?
            .listeners
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| PortError::NotFound(format!("store subscription {}", id.0)))
    }
}
