//! Highlighting through an external wrapper program.
//!
//! The program is called as:
//!
//! - `<program> getlexers`: prints `Display Name;alias` per line
//! - `<program> getstyles`: prints one style name per line
//! - `<program> <lang> <style>`: reads code on stdin, prints markup on stdout
//!   and a diagnostic message on stderr

use std::collections::HashSet;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::Command;
use tokio_stream::wrappers::LinesStream;
use tokio_stream::StreamExt;
use tracing::debug;

use super::{Highlighted, HighlightError, Highlighter, AUTODETECT};

pub const DEFAULT_STYLE: &str = "manni";

/// Language used when the requested one is not supported.
const FALLBACK_LANGUAGE: &str = "text";

#[derive(Clone)]
pub struct CommandHighlighter {
    program: Arc<PathBuf>,
    languages: Arc<HashSet<String>>,
    styles: Arc<HashSet<String>>,
    default_style: String,
    timeout: Duration,
}

impl CommandHighlighter {
    /// Ask the program which languages and styles it supports.
    pub async fn probe(
        program: impl Into<PathBuf>,
        default_style: Option<&str>,
        timeout: Duration,
    ) -> Result<Self, HighlightError> {
        let program = program.into();

        let languages = list(&program, "getlexers", timeout)
            .await?
            .into_iter()
            .filter_map(|line| {
                let (_, alias) = line.split_once(';')?;
                Some(alias.trim().to_owned())
            })
            .collect();
        let styles = list(&program, "getstyles", timeout)
            .await?
            .into_iter()
            .map(|style| style.trim().to_lowercase())
            .collect();

        Ok(CommandHighlighter {
            program: Arc::new(program),
            languages: Arc::new(languages),
            styles: Arc::new(styles),
            default_style: default_style.unwrap_or(DEFAULT_STYLE).to_owned(),
            timeout,
        })
    }

    pub fn language_count(&self) -> usize {
        self.languages.len()
    }

    pub fn style_count(&self) -> usize {
        self.styles.len()
    }

    fn coerce_language(&self, language: &str) -> String {
        let language = language.trim();
        if language.is_empty() {
            AUTODETECT.to_owned()
        } else if language == AUTODETECT || self.languages.contains(language) {
            language.to_owned()
        } else {
            debug!("language '{language}' not supported, using '{FALLBACK_LANGUAGE}'");
            FALLBACK_LANGUAGE.to_owned()
        }
    }

    fn coerce_style(&self, style: &str) -> String {
        let style = style.trim().to_lowercase();
        if self.styles.contains(&style) {
            style
        } else {
            debug!("style '{style}' not supported, using '{}'", self.default_style);
            self.default_style.clone()
        }
    }
}

impl Highlighter for CommandHighlighter {
    async fn highlight(
        &self,
        raw: &str,
        language: &str,
        style: &str,
    ) -> Result<Highlighted, HighlightError> {
        let language = self.coerce_language(language);
        let style = self.coerce_style(style);

        debug!(
            "executing: {} {language} {style}",
            self.program.display()
        );
        let mut child = Command::new(self.program.as_path())
            .arg(&language)
            .arg(&style)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| io::Error::new(io::ErrorKind::BrokenPipe, "no stdin for highlighter"))?;
        let input = raw.to_owned();
        let writer = tokio::spawn(async move { stdin.write_all(input.as_bytes()).await });

        let output = tokio::time::timeout(self.timeout, child.wait_with_output())
            .await
            .map_err(|_| HighlightError::Timeout(self.timeout))??;

        if let Ok(Err(err)) = writer.await {
            debug!("highlighter did not read all input: {err}");
        }

        let message = String::from_utf8_lossy(&output.stderr).trim().to_owned();
        if !output.status.success() {
            return Err(HighlightError::Failed {
                status: output.status,
                stderr: message,
            });
        }

        Ok(Highlighted {
            markup: String::from_utf8(output.stdout)?,
            message,
            language,
            style,
        })
    }
}

async fn list(program: &Path, arg: &str, timeout: Duration) -> Result<Vec<String>, HighlightError> {
    let mut child = Command::new(program)
        .arg(arg)
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .kill_on_drop(true)
        .spawn()?;
    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| io::Error::new(io::ErrorKind::BrokenPipe, "no stdout for highlighter"))?;

    let lines = tokio::time::timeout(timeout, async {
        LinesStream::new(BufReader::new(stdout).lines())
            .filter_map(Result::ok)
            .filter(|s| !s.is_empty())
            .collect::<Vec<String>>()
            .await
    })
    .await
    .map_err(|_| HighlightError::Timeout(timeout))?;

    let status = child.wait().await?;
    if !status.success() {
        return Err(HighlightError::Failed {
            status,
            stderr: format!("'{arg}' failed"),
        });
    }

    Ok(lines)
}

#[cfg(all(test, unix))]
mod tests {
    use std::os::unix::fs::PermissionsExt;

    use tempfile::TempDir;

    use super::*;

    const WRAPPER: &str = r#"#!/bin/sh
case "$1" in
    getlexers) printf 'Python;python\nRust;rust\n'; exit 0 ;;
    getstyles) printf 'manni\nMonokai\n'; exit 0 ;;
esac
printf '<pre lang="%s" style="%s">' "$1" "$2"
cat
printf '</pre>'
printf 'Successfully used lexer for given language :: %s\n' "$1" >&2
"#;

    fn write_script(dir: &TempDir, name: &str, body: &str) -> PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, body).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    async fn probe(body: &str) -> (CommandHighlighter, TempDir) {
        let dir = TempDir::new().unwrap();
        let program = write_script(&dir, "wrapper", body);
        let highlighter = CommandHighlighter::probe(program, None, Duration::from_secs(5))
            .await
            .unwrap();
        (highlighter, dir)
    }

    #[tokio::test]
    async fn probe_reads_languages_and_styles() {
        let (highlighter, _dir) = probe(WRAPPER).await;
        assert_eq!(highlighter.language_count(), 2);
        assert_eq!(highlighter.style_count(), 2);
        assert!(highlighter.languages.contains("rust"));
        assert!(highlighter.styles.contains("monokai"));
    }

    #[tokio::test]
    async fn passes_content_and_returns_stderr_as_message() {
        let (highlighter, _dir) = probe(WRAPPER).await;
        let highlighted = highlighter
            .highlight("fn main() {}", "rust", "monokai")
            .await
            .unwrap();
        assert_eq!(
            highlighted.markup,
            r#"<pre lang="rust" style="monokai">fn main() {}</pre>"#
        );
        assert_eq!(
            highlighted.message,
            "Successfully used lexer for given language :: rust"
        );
    }

    #[tokio::test]
    async fn coerces_unsupported_language_and_style() {
        let (highlighter, _dir) = probe(WRAPPER).await;

        let highlighted = highlighter.highlight("x", "cobol", "neon").await.unwrap();
        assert_eq!(highlighted.language, "text");
        assert_eq!(highlighted.style, DEFAULT_STYLE);

        let highlighted = highlighter.highlight("x", "", "Monokai").await.unwrap();
        assert_eq!(highlighted.language, AUTODETECT);
        assert_eq!(highlighted.style, "monokai");
    }

    #[tokio::test]
    async fn failing_wrapper_is_an_error() {
        let (mut highlighter, dir) = probe(WRAPPER).await;
        highlighter.program = Arc::new(write_script(
            &dir,
            "broken",
            "#!/bin/sh\necho 'no pygments' >&2\nexit 1\n",
        ));

        let err = highlighter.highlight("x", "rust", "manni").await.unwrap_err();
        assert!(
            matches!(err, HighlightError::Failed { ref stderr, .. } if stderr == "no pygments"),
            "got {err:?}"
        );
    }

    #[tokio::test]
    async fn slow_wrapper_times_out() {
        let (mut highlighter, dir) = probe(WRAPPER).await;
        highlighter.program = Arc::new(write_script(&dir, "slow", "#!/bin/sh\nsleep 5\n"));
        highlighter.timeout = Duration::from_millis(200);

        let err = highlighter.highlight("x", "rust", "manni").await.unwrap_err();
        assert!(matches!(err, HighlightError::Timeout(_)), "got {err:?}");
    }

    #[tokio::test]
    async fn missing_program_fails_to_probe() {
        let result =
            CommandHighlighter::probe("/nonexistent/wrapper", None, Duration::from_secs(1)).await;
        assert!(matches!(result, Err(HighlightError::Spawn { .. })));
    }
}
