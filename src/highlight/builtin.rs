use std::sync::Arc;
use std::time::Duration;

use syntect::highlighting::ThemeSet;
use syntect::html::highlighted_html_for_string;
use syntect::parsing::{SyntaxReference, SyntaxSet};
use tracing::{debug, warn};

use super::{Highlighted, HighlightError, Highlighter, AUTODETECT};

pub const DEFAULT_STYLE: &str = "InspiredGitHub";

struct Assets {
    syntaxes: SyntaxSet,
    themes: ThemeSet,
}

/// In-process highlighting with syntect's bundled syntaxes and themes.
#[derive(Clone)]
pub struct BuiltinHighlighter {
    assets: Arc<Assets>,
    default_style: String,
    timeout: Duration,
}

impl BuiltinHighlighter {
    pub fn new(default_style: Option<&str>, timeout: Duration) -> Self {
        let themes = ThemeSet::load_defaults();
        let default_style = match default_style {
            Some(style) if themes.themes.contains_key(style) => style.to_owned(),
            Some(style) => {
                warn!("unknown default style '{style}', using '{DEFAULT_STYLE}'");
                DEFAULT_STYLE.to_owned()
            }
            None => DEFAULT_STYLE.to_owned(),
        };

        BuiltinHighlighter {
            assets: Arc::new(Assets {
                syntaxes: SyntaxSet::load_defaults_newlines(),
                themes,
            }),
            default_style,
            timeout,
        }
    }
}

impl Highlighter for BuiltinHighlighter {
    async fn highlight(
        &self,
        raw: &str,
        language: &str,
        style: &str,
    ) -> Result<Highlighted, HighlightError> {
        let assets = Arc::clone(&self.assets);
        let raw = raw.to_owned();
        let language = language.trim().to_owned();
        let style = if assets.themes.themes.contains_key(style) {
            style.to_owned()
        } else {
            debug!("style '{style}' not supported, using '{}'", self.default_style);
            self.default_style.clone()
        };

        let render = tokio::task::spawn_blocking(move || render(&assets, &raw, &language, style));
        tokio::time::timeout(self.timeout, render)
            .await
            .map_err(|_| HighlightError::Timeout(self.timeout))??
    }
}

fn render(
    assets: &Assets,
    raw: &str,
    language: &str,
    style: String,
) -> Result<Highlighted, HighlightError> {
    let (syntax, message) = resolve_syntax(&assets.syntaxes, raw, language);
    let theme = &assets.themes.themes[&style];
    let markup = highlighted_html_for_string(raw, &assets.syntaxes, syntax, theme)?;
    Ok(Highlighted {
        markup,
        message,
        language: syntax.name.clone(),
        style,
    })
}

fn resolve_syntax<'a>(
    syntaxes: &'a SyntaxSet,
    raw: &str,
    language: &str,
) -> (&'a SyntaxReference, String) {
    let autodetect = language.is_empty() || language.eq_ignore_ascii_case(AUTODETECT);

    if !autodetect {
        if let Some(syntax) = syntaxes.find_syntax_by_token(language) {
            let message = format!("Successfully used lexer for given language :: {}", syntax.name);
            return (syntax, message);
        }
    }

    match syntaxes.find_syntax_by_first_line(raw) {
        Some(syntax) if autodetect => (syntax, format!("Lexer guessed :: {}", syntax.name)),
        Some(syntax) => {
            let message = format!(
                "Lexer guessed :: {} (although given language was {language})",
                syntax.name
            );
            (syntax, message)
        }
        None if autodetect => (
            syntaxes.find_syntax_plain_text(),
            "Could not autodetect language (returning plain text).".to_owned(),
        ),
        None => (
            syntaxes.find_syntax_plain_text(),
            format!("Given language was not found :: '{language}' (returning plain text)."),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn highlighter() -> BuiltinHighlighter {
        BuiltinHighlighter::new(None, Duration::from_secs(10))
    }

    #[tokio::test]
    async fn highlights_known_language() {
        let highlighted = highlighter()
            .highlight("print('hi')", "python", "")
            .await
            .unwrap();
        assert_eq!(highlighted.language, "Python");
        assert_eq!(highlighted.style, DEFAULT_STYLE);
        assert!(highlighted.markup.contains("hi"));
        assert!(highlighted.markup.contains("<span"));
        assert!(!highlighted.markup.contains("print('hi')"));
        assert!(highlighted.message.starts_with("Successfully used lexer"));
    }

    #[tokio::test]
    async fn autodetects_from_shebang() {
        let highlighted = highlighter()
            .highlight("#!/usr/bin/env python\nprint(1)\n", AUTODETECT, "")
            .await
            .unwrap();
        assert_eq!(highlighted.language, "Python");
        assert!(highlighted.message.starts_with("Lexer guessed"));
    }

    #[tokio::test]
    async fn unknown_language_falls_back_to_plain_text() {
        let highlighted = highlighter()
            .highlight("<b>bold</b>", "klingon", "")
            .await
            .unwrap();
        assert_eq!(highlighted.language, "Plain Text");
        assert_eq!(
            highlighted.message,
            "Given language was not found :: 'klingon' (returning plain text)."
        );
        assert!(!highlighted.markup.contains("<b>"));
    }

    #[tokio::test]
    async fn known_and_unknown_styles() {
        let highlighted = highlighter()
            .highlight("fn main() {}", "rust", "Solarized (dark)")
            .await
            .unwrap();
        assert_eq!(highlighted.style, "Solarized (dark)");

        let highlighted = highlighter()
            .highlight("fn main() {}", "rust", "no-such-style")
            .await
            .unwrap();
        assert_eq!(highlighted.style, DEFAULT_STYLE);
    }

    #[test]
    fn unknown_default_style_is_replaced() {
        let highlighter = BuiltinHighlighter::new(Some("no-such-style"), Duration::from_secs(1));
        assert_eq!(highlighter.default_style, DEFAULT_STYLE);
    }
}
