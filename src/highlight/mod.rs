//! Syntax highlighting collaborators.
//!
//! Highlighting is best effort. Callers treat any [`HighlightError`] as "no
//! highlighting available" and fall back to plain text.

use std::future::Future;
use std::process::ExitStatus;
use std::string::FromUtf8Error;
use std::time::Duration;

use thiserror::Error;
use tracing::info;

use crate::config;

pub mod builtin;
pub mod command;

pub use builtin::BuiltinHighlighter;
pub use command::CommandHighlighter;

/// Language name that asks the highlighter to guess.
pub const AUTODETECT: &str = "autodetect";

/// Rendered markup plus what the highlighter had to say about it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Highlighted {
    pub markup: String,
    pub message: String,
    /// Language actually used, after coercion.
    pub language: String,
    /// Style actually used, after coercion.
    pub style: String,
}

#[derive(Error, Debug)]
pub enum HighlightError {
    #[error("syntax highlighting is not available")]
    Unavailable,
    #[error("highlighter timed out after {0:?}")]
    Timeout(Duration),
    #[error("failed to run highlighter")]
    Spawn {
        #[from]
        source: std::io::Error,
    },
    #[error("highlighter exited with {status}: {stderr}")]
    Failed { status: ExitStatus, stderr: String },
    #[error("highlighter produced invalid UTF-8")]
    Utf8 {
        #[from]
        source: FromUtf8Error,
    },
    #[error("failed to render highlighted markup")]
    Render {
        #[from]
        source: syntect::Error,
    },
    #[error("highlighter task panicked")]
    Join {
        #[from]
        source: tokio::task::JoinError,
    },
}

pub trait Highlighter: Send + Sync {
    /// Highlight `raw` as `language` using `style`.
    ///
    /// Unsupported languages and styles are coerced to defaults rather than
    /// rejected.
    fn highlight(
        &self,
        raw: &str,
        language: &str,
        style: &str,
    ) -> impl Future<Output = Result<Highlighted, HighlightError>> + Send;
}

#[derive(Clone)]
pub enum AnyHighlighter {
    Builtin(BuiltinHighlighter),
    Command(CommandHighlighter),
    Disabled,
}

impl AnyHighlighter {
    pub async fn from_config(config: &config::Highlighter) -> anyhow::Result<Self> {
        let timeout = Duration::from_secs(config.timeout_secs);
        let highlighter = match config.kind {
            config::HighlighterKind::Builtin => AnyHighlighter::Builtin(BuiltinHighlighter::new(
                config.default_style.as_deref(),
                timeout,
            )),
            config::HighlighterKind::Command => {
                let program = config.program.as_ref().ok_or_else(|| {
                    anyhow::anyhow!("highlighter.program is required for the command highlighter")
                })?;
                let highlighter =
                    CommandHighlighter::probe(program, config.default_style.as_deref(), timeout)
                        .await?;
                info!(
                    "using highlighter '{}' ({} languages, {} styles)",
                    program.display(),
                    highlighter.language_count(),
                    highlighter.style_count()
                );
                AnyHighlighter::Command(highlighter)
            }
            config::HighlighterKind::None => AnyHighlighter::Disabled,
        };
        Ok(highlighter)
    }
}

impl Highlighter for AnyHighlighter {
    async fn highlight(
        &self,
        raw: &str,
        language: &str,
        style: &str,
    ) -> Result<Highlighted, HighlightError> {
        match self {
            AnyHighlighter::Builtin(builtin) => builtin.highlight(raw, language, style).await,
            AnyHighlighter::Command(command) => command.highlight(raw, language, style).await,
            AnyHighlighter::Disabled => Err(HighlightError::Unavailable),
        }
    }
}
