use crate::ingest::ValidatedTable;
use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard},
};

/// Identifies whose dataset an operation targets.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionId(String);

impl SessionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self("default".into())
    }
}

/// One validated table per session. Writes replace the whole slot, so a
/// reader holds either the previous table or the new one, never a mix.
///
/// Cloning shares the underlying map.
#[derive(Debug, Clone, Default)]
pub struct DatasetStore {
    slots: Arc<Mutex<HashMap<SessionId, Arc<ValidatedTable>>>>,
}

impl DatasetStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<SessionId, Arc<ValidatedTable>>> {
        // entries are whole Arcs; poisoning leaves nothing half-written
        self.slots.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Store `table` for `session`, returning the table it replaced.
    pub fn replace(
        &self,
        session: &SessionId,
        table: ValidatedTable,
    ) -> Option<Arc<ValidatedTable>> {
        self.lock().insert(session.clone(), Arc::new(table))
    }

    pub fn get(&self, session: &SessionId) -> Option<Arc<ValidatedTable>> {
        self.lock().get(session).cloned()
    }

    pub fn remove(&self, session: &SessionId) -> Option<Arc<ValidatedTable>> {
        self.lock().remove(session)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}
