use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::controllers::paste::{Retrieved, Submitted};

#[derive(Debug, Deserialize)]
pub struct SubmitPaste {
    pub content: String,
    pub title: Option<String>,
    pub expiry: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct DeleteParams {
    pub delete_key: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct HighlightParams {
    pub lang: Option<String>,
    pub style: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UploadPaste {
    pub id: String,
    pub title: String,
    pub hash: String,
    pub url: String,
    pub size: usize,
    pub delete_key: String,
    pub expires_at: Option<DateTime<Utc>>,
    pub deduplicated: bool,
}

impl UploadPaste {
    pub fn new(submitted: Submitted, base_url: &str) -> Self {
        let Submitted {
            paste,
            deduplicated,
        } = submitted;
        UploadPaste {
            url: format!("{base_url}/{}", paste.id),
            title: paste.raw_title(),
            size: paste.size(),
            id: paste.id,
            hash: paste.fingerprint,
            delete_key: paste.delete_key,
            expires_at: paste.expires_at,
            deduplicated,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PasteResponse {
    pub id: String,
    pub title: String,
    pub content: String,
    pub size: usize,
    pub expires_at: Option<DateTime<Utc>>,
    pub highlighted: bool,
    pub language: Option<String>,
    pub style: Option<String>,
    pub message: Option<String>,
}

impl From<Retrieved> for PasteResponse {
    fn from(retrieved: Retrieved) -> Self {
        PasteResponse {
            title: retrieved.paste.raw_title(),
            size: retrieved.paste.size(),
            id: retrieved.paste.id,
            expires_at: retrieved.paste.expires_at,
            content: retrieved.content,
            highlighted: retrieved.highlighted,
            language: retrieved.language,
            style: retrieved.style,
            message: retrieved.message,
        }
    }
}
