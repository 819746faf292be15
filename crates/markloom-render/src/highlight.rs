// SPDX-License-Identifier: AGPL-3.0-or-later
//! Syntax highlighting service
//!
//! Language tags from fences are normalized to a canonical id before they
//! reach the engine. The engine itself is built lazily; until it is ready,
//! [`Highlighter::highlight`] returns escaped code so rendering never waits.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::future::Future;
use std::str::FromStr;
use std::sync::Arc;
use syntect::highlighting::ThemeSet;
use syntect::html::highlighted_html_for_string;
use syntect::parsing::{SyntaxReference, SyntaxSet};

use crate::error::{RenderError, Result};
use crate::escape::escape_html;
use crate::lazy::LazyEngine;

pub const FALLBACK_LANGUAGE: &str = "plaintext";

/// Alias tag to canonical language id
pub const LANGUAGE_ALIASES: &[(&str, &str)] = &[
    ("c", "c"),
    ("cjs", "javascript"),
    ("cpp", "cpp"),
    ("cs", "csharp"),
    ("csharp", "csharp"),
    ("html5", "html"),
    ("js", "javascript"),
    ("jsx", "javascript"),
    ("md", "markdown"),
    ("mjs", "javascript"),
    ("py", "python"),
    ("r", "r"),
    ("rb", "ruby"),
    ("rs", "rust"),
    ("sh", "bash"),
    ("shell", "bash"),
    ("ts", "typescript"),
    ("tsx", "typescript"),
    ("yml", "yaml"),
];

/// Canonical ids the highlighter accepts
pub const SUPPORTED_LANGUAGES: &[&str] = &[
    "text",
    "plaintext",
    "c",
    "cpp",
    "csharp",
    "bash",
    "css",
    "html",
    "javascript",
    "json",
    "markdown",
    "r",
    "python",
    "ruby",
    "rust",
    "sql",
    "typescript",
    "vue",
    "yaml",
];

/// Map a fence tag to a canonical language id
///
/// Trims and lowercases, resolves aliases, and falls back to `plaintext` for
/// anything unsupported.
pub fn normalize_language(tag: &str) -> &'static str {
    let lowered = tag.trim().to_lowercase();
    let resolved = LANGUAGE_ALIASES
        .iter()
        .find(|(alias, _)| *alias == lowered)
        .map_or(lowered.as_str(), |&(_, canonical)| canonical);
    SUPPORTED_LANGUAGES
        .iter()
        .find(|id| **id == resolved)
        .copied()
        .unwrap_or(FALLBACK_LANGUAGE)
}

/// How code blocks pick their theme
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThemeMode {
    /// Follow the [`ColorSchemeSource`] at render time
    #[default]
    Auto,
    Light,
    Dark,
    /// Emit both variants side by side
    Dual,
}

impl ThemeMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ThemeMode::Auto => "auto",
            ThemeMode::Light => "light",
            ThemeMode::Dark => "dark",
            ThemeMode::Dual => "dual",
        }
    }
}

impl fmt::Display for ThemeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ThemeMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "auto" => Ok(ThemeMode::Auto),
            "light" => Ok(ThemeMode::Light),
            "dark" => Ok(ThemeMode::Dark),
            "dual" => Ok(ThemeMode::Dual),
            other => Err(format!("unknown theme mode '{other}' (expected auto, light, dark or dual)")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorScheme {
    Light,
    Dark,
}

/// Runtime colour-scheme preference consulted by [`ThemeMode::Auto`]
pub trait ColorSchemeSource: Send + Sync {
    fn color_scheme(&self) -> ColorScheme;
}

impl ColorSchemeSource for ColorScheme {
    fn color_scheme(&self) -> ColorScheme {
        *self
    }
}

/// Reads the terminal background from `COLORFGBG` (`"fg;bg"`)
#[derive(Debug, Default, Clone, Copy)]
pub struct TerminalColorScheme;

impl TerminalColorScheme {
    fn parse(value: &str) -> ColorScheme {
        match value.rsplit(';').next().and_then(|bg| bg.trim().parse::<u8>().ok()) {
            Some(0..=6 | 8) => ColorScheme::Dark,
            _ => ColorScheme::Light,
        }
    }
}

impl ColorSchemeSource for TerminalColorScheme {
    fn color_scheme(&self) -> ColorScheme {
        std::env::var("COLORFGBG")
            .ok()
            .as_deref()
            .map_or(ColorScheme::Light, Self::parse)
    }
}

/// Light and dark theme names
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThemePair {
    pub light: String,
    pub dark: String,
}

impl ThemePair {
    pub fn new(light: impl Into<String>, dark: impl Into<String>) -> Self {
        Self {
            light: light.into(),
            dark: dark.into(),
        }
    }

    pub fn for_scheme(&self, scheme: ColorScheme) -> &str {
        match scheme {
            ColorScheme::Light => &self.light,
            ColorScheme::Dark => &self.dark,
        }
    }
}

impl Default for ThemePair {
    fn default() -> Self {
        Self::new("InspiredGitHub", "base16-ocean.dark")
    }
}

/// Code to highlighted HTML for one theme
pub trait HighlightEngine: Send + Sync {
    fn highlight(&self, code: &str, language: &str, theme: &str) -> Result<String>;

    fn has_theme(&self, _theme: &str) -> bool {
        true
    }
}

/// syntect with its bundled syntaxes and themes
pub struct SyntectEngine {
    syntaxes: SyntaxSet,
    themes: ThemeSet,
}

impl SyntectEngine {
    pub fn load_defaults() -> Self {
        Self {
            syntaxes: SyntaxSet::load_defaults_newlines(),
            themes: ThemeSet::load_defaults(),
        }
    }

    pub fn theme_names(&self) -> impl Iterator<Item = &str> {
        self.themes.themes.keys().map(String::as_str)
    }

    fn syntax_for(&self, language: &str) -> &SyntaxReference {
        let token = match language {
            "javascript" => "js",
            "typescript" => "ts",
            "python" => "py",
            "ruby" => "rb",
            "rust" => "rs",
            "bash" => "sh",
            "csharp" => "cs",
            "markdown" => "md",
            "vue" => "html",
            "text" | "plaintext" => "txt",
            other => other,
        };
        self.syntaxes
            .find_syntax_by_token(token)
            .unwrap_or_else(|| self.syntaxes.find_syntax_plain_text())
    }
}

impl HighlightEngine for SyntectEngine {
    fn highlight(&self, code: &str, language: &str, theme: &str) -> Result<String> {
        let theme = self
            .themes
            .themes
            .get(theme)
            .ok_or_else(|| RenderError::UnknownTheme(theme.to_string()))?;
        highlighted_html_for_string(code, &self.syntaxes, self.syntax_for(language), theme)
            .map_err(|e| RenderError::Highlight(e.to_string()))
    }

    fn has_theme(&self, theme: &str) -> bool {
        self.themes.themes.contains_key(theme)
    }
}

/// Escaped code wrapped the same way highlighted output is
pub fn fallback_html(code: &str, language: &str) -> String {
    format!(
        r#"<pre class="language-{language}"><code class="language-{language}">{}</code></pre>"#,
        escape_html(code)
    )
}

/// Tag the first `<pre>` and its `<code>` with `language-{language}`
///
/// Engines that emit a bare `<pre>` get their content wrapped in a `<code>`.
pub fn with_language_classes(html: &str, language: &str) -> String {
    let class = format!("language-{language}");

    let mut out = if html.contains(r#"<pre class=""#) {
        html.replacen(r#"<pre class=""#, &format!(r#"<pre class="{class} "#), 1)
    } else {
        html.replacen("<pre", &format!(r#"<pre class="{class}""#), 1)
    };

    if out.contains(r#"<code class=""#) {
        out = out.replacen(r#"<code class=""#, &format!(r#"<code class="{class} "#), 1);
    } else if out.contains("<code") {
        out = out.replacen("<code", &format!(r#"<code class="{class}""#), 1);
    } else if let (Some(open), Some(close)) = (out.find("<pre"), out.rfind("</pre>")) {
        if let Some(gt) = out[open..].find('>').map(|i| open + i + 1) {
            if gt <= close {
                out.insert_str(close, "</code>");
                out.insert_str(gt, &format!(r#"<code class="{class}">"#));
            }
        }
    }
    out
}

fn tag_theme(html: &str, variant: &str) -> String {
    html.replacen("<pre", &format!(r#"<pre data-theme="{variant}""#), 1)
}

/// Lazily initialized highlighter with light/dark themes
pub struct Highlighter {
    engine: LazyEngine<dyn HighlightEngine>,
    themes: ThemePair,
    scheme: Arc<dyn ColorSchemeSource>,
}

impl Highlighter {
    /// Highlighter backed by [`SyntectEngine`]
    pub fn new(themes: ThemePair) -> Self {
        let required = themes.clone();
        Self::with_engine(themes, move || {
            let required = required.clone();
            async move {
                let engine = tokio::task::spawn_blocking(SyntectEngine::load_defaults)
                    .await
                    .map_err(|e| RenderError::EngineInit(e.to_string()))?;
                for theme in [&required.light, &required.dark] {
                    if !engine.has_theme(theme) {
                        return Err(RenderError::UnknownTheme(theme.clone()));
                    }
                }
                Ok(Arc::new(engine) as Arc<dyn HighlightEngine>)
            }
        })
    }

    /// Highlighter with a custom engine factory
    pub fn with_engine<F, Fut>(themes: ThemePair, factory: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Arc<dyn HighlightEngine>>> + Send + 'static,
    {
        Self {
            engine: LazyEngine::new("highlighter", factory),
            themes,
            scheme: Arc::new(TerminalColorScheme),
        }
    }

    pub fn with_color_scheme(mut self, scheme: Arc<dyn ColorSchemeSource>) -> Self {
        self.scheme = scheme;
        self
    }

    pub fn themes(&self) -> &ThemePair {
        &self.themes
    }

    /// Build the engine if needed; concurrent callers share one construction
    pub async fn ensure_ready(&self) -> Result<Arc<dyn HighlightEngine>> {
        self.engine.get_or_init().await
    }

    pub fn is_ready(&self) -> bool {
        self.engine.is_ready()
    }

    pub fn init_count(&self) -> usize {
        self.engine.init_count()
    }

    /// Highlight `code` as HTML without waiting for the engine
    pub fn highlight(&self, code: &str, language: &str, mode: ThemeMode) -> String {
        let language = normalize_language(language);
        let Some(engine) = self.engine.get() else {
            tracing::debug!(language, "highlighter not ready, using plain fallback");
            return fallback_html(code, language);
        };
        match self.highlight_with(engine.as_ref(), code, language, mode) {
            Ok(html) => html,
            Err(err) => {
                tracing::warn!(language, error = %err, "highlighting failed, using plain fallback");
                fallback_html(code, language)
            }
        }
    }

    fn highlight_with(
        &self,
        engine: &dyn HighlightEngine,
        code: &str,
        language: &str,
        mode: ThemeMode,
    ) -> Result<String> {
        let render = |theme: &str| -> Result<String> {
            let html = engine.highlight(code, language, theme)?;
            Ok(with_language_classes(&html, language))
        };
        match mode {
            ThemeMode::Light => render(&self.themes.light),
            ThemeMode::Dark => render(&self.themes.dark),
            ThemeMode::Auto => render(self.themes.for_scheme(self.scheme.color_scheme())),
            ThemeMode::Dual => {
                let light = tag_theme(&render(&self.themes.light)?, "light");
                let dark = tag_theme(&render(&self.themes.dark)?, "dark");
                Ok(format!(r#"<div class="highlight-themes">{light}{dark}</div>"#))
            }
        }
    }
}

impl Default for Highlighter {
    fn default() -> Self {
        Self::new(ThemePair::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    struct FakeEngine {
        calls: Arc<AtomicUsize>,
    }

    impl HighlightEngine for FakeEngine {
        fn highlight(&self, code: &str, _language: &str, theme: &str) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if code == "boom" {
                return Err(RenderError::Highlight("boom".to_string()));
            }
            Ok(format!(r#"<pre style="{theme}">{}</pre>"#, escape_html(code)))
        }
    }

    fn fake_highlighter(calls: Arc<AtomicUsize>) -> Highlighter {
        Highlighter::with_engine(ThemePair::new("day", "night"), move || {
            let calls = Arc::clone(&calls);
            async move {
                tokio::time::sleep(Duration::from_millis(10)).await;
                Ok(Arc::new(FakeEngine { calls }) as Arc<dyn HighlightEngine>)
            }
        })
    }

    #[test]
    fn test_normalize_language() {
        assert_eq!(normalize_language("JS"), "javascript");
        assert_eq!(normalize_language(" tsx "), "typescript");
        assert_eq!(normalize_language("yml"), "yaml");
        assert_eq!(normalize_language("shell"), "bash");
        assert_eq!(normalize_language("rust"), "rust");
        assert_eq!(normalize_language("text"), "text");
        assert_eq!(normalize_language("brainfuck"), "plaintext");
        assert_eq!(normalize_language(""), "plaintext");
    }

    #[test]
    fn test_every_alias_targets_a_supported_language() {
        for (alias, canonical) in LANGUAGE_ALIASES {
            assert!(SUPPORTED_LANGUAGES.contains(canonical), "{alias} -> {canonical}");
        }
    }

    #[test]
    fn test_fallback_before_ready() {
        let calls = Arc::new(AtomicUsize::new(0));
        let highlighter = fake_highlighter(Arc::clone(&calls));
        assert_eq!(
            highlighter.highlight("a < b", "rs", ThemeMode::Light),
            r#"<pre class="language-rust"><code class="language-rust">a &lt; b</code></pre>"#
        );
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert!(!highlighter.is_ready());
    }

    #[tokio::test]
    async fn test_concurrent_ensure_ready_initializes_once() {
        let highlighter = fake_highlighter(Arc::new(AtomicUsize::new(0)));
        let (a, b) = tokio::join!(highlighter.ensure_ready(), highlighter.ensure_ready());
        assert!(Arc::ptr_eq(&a.unwrap(), &b.unwrap()));
        assert_eq!(highlighter.init_count(), 1);
    }

    #[tokio::test]
    async fn test_ready_output_carries_language_classes() {
        let highlighter = fake_highlighter(Arc::new(AtomicUsize::new(0)));
        highlighter.ensure_ready().await.unwrap();
        assert_eq!(
            highlighter.highlight("x", "py", ThemeMode::Dark),
            r#"<pre class="language-python" style="night"><code class="language-python">x</code></pre>"#
        );
    }

    #[tokio::test]
    async fn test_auto_follows_color_scheme() {
        let highlighter = fake_highlighter(Arc::new(AtomicUsize::new(0)))
            .with_color_scheme(Arc::new(ColorScheme::Dark));
        highlighter.ensure_ready().await.unwrap();
        assert!(highlighter.highlight("x", "c", ThemeMode::Auto).contains(r#"style="night""#));

        let highlighter = fake_highlighter(Arc::new(AtomicUsize::new(0)))
            .with_color_scheme(Arc::new(ColorScheme::Light));
        highlighter.ensure_ready().await.unwrap();
        assert!(highlighter.highlight("x", "c", ThemeMode::Auto).contains(r#"style="day""#));
    }

    #[tokio::test]
    async fn test_dual_embeds_both_variants() {
        let highlighter = fake_highlighter(Arc::new(AtomicUsize::new(0)));
        highlighter.ensure_ready().await.unwrap();
        let html = highlighter.highlight("x", "sql", ThemeMode::Dual);
        assert!(html.starts_with(r#"<div class="highlight-themes"><pre data-theme="light" class="language-sql" style="day">"#));
        assert!(html.contains(r#"<pre data-theme="dark" class="language-sql" style="night">"#));
        assert!(html.ends_with("</pre></div>"));
    }

    #[tokio::test]
    async fn test_engine_error_degrades_to_fallback() {
        let calls = Arc::new(AtomicUsize::new(0));
        let highlighter = fake_highlighter(Arc::clone(&calls));
        highlighter.ensure_ready().await.unwrap();
        assert_eq!(highlighter.highlight("boom", "json", ThemeMode::Light), fallback_html("boom", "json"));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_with_language_classes() {
        assert_eq!(
            with_language_classes(r#"<pre class="hl"><code class="x">a</code></pre>"#, "rust"),
            r#"<pre class="language-rust hl"><code class="language-rust x">a</code></pre>"#
        );
        assert_eq!(
            with_language_classes("<pre>a</pre>", "bash"),
            r#"<pre class="language-bash"><code class="language-bash">a</code></pre>"#
        );
        assert_eq!(
            with_language_classes("<pre><code>a</code></pre>", "c"),
            r#"<pre class="language-c"><code class="language-c">a</code></pre>"#
        );
    }

    #[test]
    fn test_terminal_scheme_parsing() {
        assert_eq!(TerminalColorScheme::parse("15;0"), ColorScheme::Dark);
        assert_eq!(TerminalColorScheme::parse("0;15"), ColorScheme::Light);
        assert_eq!(TerminalColorScheme::parse("0;default;8"), ColorScheme::Dark);
        assert_eq!(TerminalColorScheme::parse("garbage"), ColorScheme::Light);
    }

    #[test]
    fn test_theme_mode_from_str() {
        assert_eq!("Dual".parse::<ThemeMode>(), Ok(ThemeMode::Dual));
        assert!("sepia".parse::<ThemeMode>().is_err());
    }

    #[test]
    fn test_syntect_engine_highlights_rust() {
        let engine = SyntectEngine::load_defaults();
        let html = engine.highlight("fn main() {}\n", "rust", "InspiredGitHub").unwrap();
        let html = with_language_classes(&html, "rust");
        assert!(html.starts_with(r#"<pre class="language-rust""#));
        assert!(html.contains(r#"<code class="language-rust">"#));
        assert!(html.contains("<span"));
        assert!(matches!(
            engine.highlight("x", "rust", "no-such-theme"),
            Err(RenderError::UnknownTheme(_))
        ));
    }

    #[test]
    fn test_syntect_has_default_themes() {
        let engine = SyntectEngine::load_defaults();
        let pair = ThemePair::default();
        assert!(engine.has_theme(&pair.light));
        assert!(engine.has_theme(&pair.dark));
        assert!(engine.theme_names().count() > 2);
    }
}
