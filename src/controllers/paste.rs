use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::clock::{Clock, SystemClock};
use crate::config::Limits;
use crate::escape::escape;
use crate::fingerprint::fingerprint;
use crate::highlight::Highlighter;
use crate::ids::{generate_delete_key, IdGenerator, RandomIds};
use crate::models::{Expiry, Paste};
use crate::storage::PasteStore;
use crate::ApiError;

/// Message returned alongside plain text when highlighting fails.
pub const HIGHLIGHT_FAILED_MESSAGE: &str = "Internal error, returning plain text.";

/// Result of a submission.
#[derive(Debug, Clone)]
pub struct Submitted {
    pub paste: Paste,
    /// The content was already stored and the existing paste was returned.
    pub deduplicated: bool,
}

#[derive(Debug, Clone, Default)]
pub struct HighlightRequest {
    pub language: String,
    pub style: String,
}

/// A live paste as returned to callers.
#[derive(Debug, Clone)]
pub struct Retrieved {
    pub paste: Paste,
    /// Unescaped content, or highlighted markup if `highlighted` is set.
    pub content: String,
    pub highlighted: bool,
    pub language: Option<String>,
    pub style: Option<String>,
    pub message: Option<String>,
}

/// Submission, retrieval and deletion of pastes over a [`PasteStore`].
#[derive(Clone)]
pub struct PasteService<S, H> {
    store: S,
    highlighter: H,
    limits: Limits,
    ids: Arc<dyn IdGenerator>,
    clock: Arc<dyn Clock>,
}

impl<S: PasteStore, H: Highlighter> PasteService<S, H> {
    pub fn new(store: S, highlighter: H, limits: Limits) -> Self {
        PasteService {
            store,
            highlighter,
            limits,
            ids: Arc::new(RandomIds),
            clock: Arc::new(SystemClock),
        }
    }

    #[cfg(test)]
    pub fn with_ids(mut self, ids: impl IdGenerator + 'static) -> Self {
        self.ids = Arc::new(ids);
        self
    }

    #[cfg(test)]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    #[cfg(test)]
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Store new content, or return the existing paste with identical content.
    pub async fn submit(
        &self,
        content: &str,
        title: Option<&str>,
        expiry: Option<&str>,
    ) -> crate::ApiResult<Submitted> {
        if content.is_empty() {
            return Err(ApiError::EmptyContent);
        }
        let title = title.map(str::trim).filter(|title| !title.is_empty());
        if let Some(title) = title {
            if title.chars().count() > self.limits.max_title_length {
                return Err(ApiError::TitleTooLong {
                    max: self.limits.max_title_length,
                });
            }
        }

        let now = self.clock.now();
        let content = escape(content);
        let fingerprint = fingerprint(&content);

        if let Some(existing) = self.find_live_by_fingerprint(&fingerprint, now).await? {
            debug!("content already stored at id '{}'", existing.id);
            return Ok(Submitted {
                paste: existing,
                deduplicated: true,
            });
        }

        let expiry = self.resolve_expiry(expiry);
        let expires_at = expiry.expires_at(now);
        let title = title.map(escape);
        let delete_key = generate_delete_key();

        loop {
            let id = self.ids.generate(self.limits.id_length);
            if self.store.find_by_id(&id).await?.is_some() {
                debug!("id '{id}' is taken, generating a new one");
                continue;
            }

            let paste = Paste {
                title: title.clone().unwrap_or_else(|| id.clone()),
                id,
                fingerprint: fingerprint.clone(),
                content: content.clone(),
                delete_key: delete_key.clone(),
                expires_at,
                created_at: now,
            };

            match self.store.insert(&paste).await {
                Ok(()) => {
                    info!(
                        "new paste: id='{}', size={}, expiry='{expiry}'",
                        paste.id,
                        paste.size()
                    );
                    return Ok(Submitted {
                        paste,
                        deduplicated: false,
                    });
                }
                Err(ApiError::Conflict) => {
                    debug!("id '{}' was taken concurrently, retrying", paste.id);
                }
                Err(err) => return Err(err),
            }
        }
    }

    /// Fetch a live paste, evicting it instead if it has expired.
    pub async fn retrieve(
        &self,
        id: &str,
        highlight: Option<HighlightRequest>,
    ) -> crate::ApiResult<Retrieved> {
        let now = self.clock.now();
        let paste = self
            .store
            .find_by_id(id)
            .await?
            .ok_or(ApiError::NotFound)?;

        if paste.is_expired(now) {
            info!("deleting expired paste: {id}");
            self.store.delete_by_id(id).await?;
            return Err(ApiError::NotFound);
        }

        let raw = paste.raw_content();
        let Some(request) = highlight else {
            return Ok(Retrieved {
                paste,
                content: raw,
                highlighted: false,
                language: None,
                style: None,
                message: None,
            });
        };

        let retrieved = match self
            .highlighter
            .highlight(&raw, &request.language, &request.style)
            .await
        {
            Ok(highlighted) => Retrieved {
                paste,
                content: highlighted.markup,
                highlighted: true,
                language: Some(highlighted.language),
                style: Some(highlighted.style),
                message: Some(highlighted.message),
            },
            Err(err) => {
                warn!("highlighting failed for paste '{id}', returning plain text: {err}");
                Retrieved {
                    paste,
                    content: raw,
                    highlighted: false,
                    language: None,
                    style: None,
                    message: Some(HIGHLIGHT_FAILED_MESSAGE.to_owned()),
                }
            }
        };
        Ok(retrieved)
    }

    /// Delete a paste if the delete key matches.
    ///
    /// A missing paste and a wrong key both give [`ApiError::WrongDeleteKey`].
    pub async fn delete(&self, id: &str, delete_key: &str) -> crate::ApiResult<()> {
        if self.store.delete_by_id_and_key(id, delete_key).await? {
            info!("deleted paste: {id}");
            Ok(())
        } else {
            Err(ApiError::WrongDeleteKey)
        }
    }

    /// Delete all expired pastes, returning how many were removed.
    pub async fn purge_expired(&self) -> crate::ApiResult<u64> {
        let count = self.store.delete_expired(self.clock.now()).await?;
        if count > 0 {
            info!("deleted {count} expired pastes");
        }
        Ok(count)
    }

    async fn find_live_by_fingerprint(
        &self,
        fingerprint: &str,
        now: DateTime<Utc>,
    ) -> crate::ApiResult<Option<Paste>> {
        while let Some(paste) = self.store.find_by_fingerprint(fingerprint).await? {
            if !paste.is_expired(now) {
                return Ok(Some(paste));
            }
            info!("deleting expired paste: {}", paste.id);
            self.store.delete_by_id(&paste.id).await?;
        }
        Ok(None)
    }

    fn resolve_expiry(&self, expiry: Option<&str>) -> Expiry {
        match expiry.map(str::trim).filter(|expiry| !expiry.is_empty()) {
            None => self.limits.default_expiry,
            Some(expiry) => expiry.parse().unwrap_or_else(|err| {
                warn!("{err}, using '{}'", self.limits.default_expiry);
                self.limits.default_expiry
            }),
        }
    }
}
