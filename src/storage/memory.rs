use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};

use super::PasteStore;
use crate::models::Paste;
use crate::ApiError;

/// In-process store with the same constraints as the database: unique ids and
/// an indexed fingerprint lookup. Contents are lost on restart.
#[derive(Clone, Default)]
pub struct MemoryStore {
    tables: Arc<Mutex<Tables>>,
}

#[derive(Default)]
struct Tables {
    pastes: HashMap<String, Paste>,
    /// fingerprint -> (created_at, id)
    by_fingerprint: HashMap<String, BTreeSet<(DateTime<Utc>, String)>>,
}

impl Tables {
    fn remove(&mut self, id: &str) -> Option<Paste> {
        let paste = self.pastes.remove(id)?;
        if let Some(ids) = self.by_fingerprint.get_mut(&paste.fingerprint) {
            ids.remove(&(paste.created_at, paste.id.clone()));
            if ids.is_empty() {
                self.by_fingerprint.remove(&paste.fingerprint);
            }
        }
        Some(paste)
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.lock().pastes.len()
    }

    fn lock(&self) -> MutexGuard<'_, Tables> {
        // tables are only mutated in single non-panicking steps
        self.tables.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl PasteStore for MemoryStore {
    async fn find_by_fingerprint(&self, fingerprint: &str) -> crate::ApiResult<Option<Paste>> {
        let tables = self.lock();
        let paste = tables
            .by_fingerprint
            .get(fingerprint)
            .and_then(|ids| ids.first())
            .and_then(|(_, id)| tables.pastes.get(id))
            .cloned();
        Ok(paste)
    }

    async fn find_by_id(&self, id: &str) -> crate::ApiResult<Option<Paste>> {
        Ok(self.lock().pastes.get(id).cloned())
    }

    async fn insert(&self, paste: &Paste) -> crate::ApiResult<()> {
        let mut tables = self.lock();
        if tables.pastes.contains_key(&paste.id) {
            return Err(ApiError::Conflict);
        }
        tables
            .by_fingerprint
            .entry(paste.fingerprint.clone())
            .or_default()
            .insert((paste.created_at, paste.id.clone()));
        tables.pastes.insert(paste.id.clone(), paste.clone());
        Ok(())
    }

    async fn delete_by_id(&self, id: &str) -> crate::ApiResult<()> {
        self.lock().remove(id);
        Ok(())
    }

    async fn delete_by_id_and_key(&self, id: &str, delete_key: &str) -> crate::ApiResult<bool> {
        let mut tables = self.lock();
        let matches = tables
            .pastes
            .get(id)
            .is_some_and(|paste| paste.delete_key == delete_key);
        if matches {
            tables.remove(id);
        }
        Ok(matches)
    }

    async fn delete_expired(&self, now: DateTime<Utc>) -> crate::ApiResult<u64> {
        let mut tables = self.lock();
        let expired: Vec<String> = tables
            .pastes
            .values()
            .filter(|paste| paste.is_expired(now))
            .map(|paste| paste.id.clone())
            .collect();
        for id in &expired {
            tables.remove(id);
        }
        Ok(expired.len() as u64)
    }
}
