//! Shared test fixtures and doubles.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use chrono::{DateTime, Duration, TimeZone, Utc};

use crate::clock::Clock;
use crate::escape::escape;
use crate::fingerprint::fingerprint;
use crate::highlight::{Highlighted, HighlightError, Highlighter};
use crate::ids::{generate_delete_key, IdGenerator, RandomIds};
use crate::models::Paste;
use crate::storage::{MemoryStore, PasteStore};

pub fn epoch() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap()
}

/// A never-expiring paste created at [`epoch`].
pub fn paste_fixture(id: &str, raw_content: &str) -> Paste {
    let content = escape(raw_content);
    Paste {
        id: id.to_owned(),
        fingerprint: fingerprint(&content),
        title: id.to_owned(),
        content,
        delete_key: generate_delete_key(),
        expires_at: None,
        created_at: epoch(),
    }
}

/// Clock that only moves when told to.
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap();
        *now = *now + by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }
}

/// Hands out scripted ids first, then random ones.
pub struct ScriptedIds {
    ids: Mutex<VecDeque<String>>,
}

impl ScriptedIds {
    pub fn new(ids: &[&str]) -> Self {
        Self {
            ids: Mutex::new(ids.iter().map(|id| id.to_string()).collect()),
        }
    }
}

impl IdGenerator for ScriptedIds {
    fn generate(&self, length: usize) -> String {
        self.ids
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| RandomIds.generate(length))
    }
}

/// Wraps content in a `<pre>` after escaping it.
#[derive(Clone)]
pub struct FakeHighlighter;

impl Highlighter for FakeHighlighter {
    async fn highlight(
        &self,
        raw: &str,
        language: &str,
        style: &str,
    ) -> Result<Highlighted, HighlightError> {
        Ok(Highlighted {
            markup: format!("<pre class=\"{language}\">{}</pre>", escape(raw)),
            message: format!("highlighted as {language}"),
            language: language.to_owned(),
            style: style.to_owned(),
        })
    }
}

/// Always fails.
#[derive(Clone)]
pub struct BrokenHighlighter;

impl Highlighter for BrokenHighlighter {
    async fn highlight(
        &self,
        _raw: &str,
        _language: &str,
        _style: &str,
    ) -> Result<Highlighted, HighlightError> {
        Err(HighlightError::Unavailable)
    }
}

/// Store whose id lookups always miss, as if another writer claimed the id
/// between the lookup and the insert. Inserts still hit the real constraint.
#[derive(Default)]
pub struct RacingStore {
    pub inner: MemoryStore,
    inserts: AtomicUsize,
}

impl RacingStore {
    pub fn insert_attempts(&self) -> usize {
        self.inserts.load(Ordering::SeqCst)
    }
}

impl PasteStore for RacingStore {
    async fn find_by_fingerprint(&self, fingerprint: &str) -> crate::ApiResult<Option<Paste>> {
        self.inner.find_by_fingerprint(fingerprint).await
    }

    async fn find_by_id(&self, _id: &str) -> crate::ApiResult<Option<Paste>> {
        Ok(None)
    }

    async fn insert(&self, paste: &Paste) -> crate::ApiResult<()> {
        self.inserts.fetch_add(1, Ordering::SeqCst);
        self.inner.insert(paste).await
    }

    async fn delete_by_id(&self, id: &str) -> crate::ApiResult<()> {
        self.inner.delete_by_id(id).await
    }

    async fn delete_by_id_and_key(&self, id: &str, delete_key: &str) -> crate::ApiResult<bool> {
        self.inner.delete_by_id_and_key(id, delete_key).await
    }

    async fn delete_expired(&self, now: DateTime<Utc>) -> crate::ApiResult<u64> {
        self.inner.delete_expired(now).await
    }
}
