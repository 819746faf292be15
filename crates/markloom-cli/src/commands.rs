// SPDX-License-Identifier: AGPL-3.0-or-later
//! Subcommand implementations

use anyhow::{Context, Result};
use clap::Args;
use markloom_core::{Document, MarkdownHandler};
use markloom_render::{
    MarkdownRenderer, Settings, ThemeMode, LANGUAGE_ALIASES, SUPPORTED_LANGUAGES,
};
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Config file picked up from the working directory when `--config` is absent
pub const DEFAULT_CONFIG_FILE: &str = "markloom.toml";

#[derive(Debug, Args)]
pub struct RenderArgs {
    /// Markdown file to render
    pub file: PathBuf,
    /// Code block theme: auto, light, dark or dual
    #[arg(long)]
    pub theme: Option<ThemeMode>,
    /// Render mermaid diagrams to SVG through the configured Kroki server
    #[arg(long)]
    pub diagrams: bool,
    /// Write HTML here instead of stdout
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct NormalizeArgs {
    /// Markdown file to normalize
    pub file: PathBuf,
    /// Write markdown here instead of stdout
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct TreeArgs {
    /// Markdown file to parse
    pub file: PathBuf,
}

#[derive(Debug, Clone, Serialize)]
pub struct DocumentMeta {
    pub path: String,
    pub blocks: usize,
    pub word_count: usize,
    pub char_count: usize,
}

#[derive(Debug, Serialize)]
pub struct DocumentData {
    pub meta: DocumentMeta,
    pub document: Document,
}

/// Settings from `path`, else `markloom.toml` if present, else defaults
pub fn load_settings(path: Option<&Path>) -> Result<Settings> {
    let path = match path {
        Some(path) => path.to_path_buf(),
        None => {
            let local = PathBuf::from(DEFAULT_CONFIG_FILE);
            if !local.is_file() {
                return Ok(Settings::default());
            }
            local
        }
    };
    tracing::debug!(path = %path.display(), "loading settings");
    Settings::load(&path).with_context(|| format!("Failed to load config {}", path.display()))
}

async fn read_source(path: &Path) -> Result<String> {
    tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read file: {}", path.display()))
}

/// Write to `output`, or stdout when absent
pub async fn write_output(output: Option<&Path>, content: &str) -> Result<()> {
    match output {
        Some(path) => tokio::fs::write(path, content)
            .await
            .with_context(|| format!("Failed to write file: {}", path.display())),
        None => {
            print!("{content}");
            Ok(())
        }
    }
}

pub async fn render(args: &RenderArgs, settings: &Settings) -> Result<String> {
    let source = read_source(&args.file).await?;
    let mut renderer = MarkdownRenderer::from_settings(settings);
    if let Some(mode) = args.theme {
        renderer = renderer.theme_mode(mode);
    }

    let html = renderer
        .render_to_html(&source)
        .await
        .context("Failed to render markdown")?;

    if !args.diagrams {
        return Ok(html);
    }
    if !settings.diagrams.enabled {
        tracing::warn!("diagrams are disabled in the config, leaving placeholders");
        return Ok(html);
    }
    let (html, summary) = renderer.hydrate_diagrams(html).await;
    if summary.failed > 0 {
        tracing::warn!(failed = summary.failed, "some diagrams could not be rendered");
    }
    Ok(html)
}

pub async fn normalize(args: &NormalizeArgs, settings: &Settings) -> Result<String> {
    let source = read_source(&args.file).await?;
    let handler = MarkdownHandler::new(settings.parse_config());
    handler.normalize(&source).context("Failed to normalize markdown")
}

pub async fn tree(args: &TreeArgs, settings: &Settings) -> Result<String> {
    let source = read_source(&args.file).await?;
    let handler = MarkdownHandler::new(settings.parse_config());
    let document = handler.parse(&source).context("Failed to parse markdown")?;

    let data = DocumentData {
        meta: DocumentMeta {
            path: args.file.display().to_string(),
            blocks: document.content.len(),
            word_count: source.split_whitespace().count(),
            char_count: source.chars().count(),
        },
        document,
    };
    let mut json = serde_json::to_string_pretty(&data)?;
    json.push('\n');
    Ok(json)
}

/// Canonical language ids followed by the aliases that resolve to them
pub fn languages() -> String {
    let mut out = String::new();
    for id in SUPPORTED_LANGUAGES {
        let aliases: Vec<&str> = LANGUAGE_ALIASES
            .iter()
            .filter(|(alias, canonical)| canonical == id && alias != id)
            .map(|(alias, _)| *alias)
            .collect();
        if aliases.is_empty() {
            out.push_str(&format!("{id}\n"));
        } else {
            out.push_str(&format!("{id} ({})\n", aliases.join(", ")));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    fn markdown_file(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".md").tempfile().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[tokio::test]
    async fn test_normalize_roundtrip() {
        let input = "# T\n\n```mermaid\ngraph TD; A-->B;\n```\n";
        let file = markdown_file(input);
        let args = NormalizeArgs {
            file: file.path().to_path_buf(),
            output: None,
        };
        assert_eq!(normalize(&args, &Settings::default()).await.unwrap(), input);
    }

    #[tokio::test]
    async fn test_tree_meta() {
        let file = markdown_file("Hello world\n\n```rust\nfn x() {}\n```\n");
        let args = TreeArgs {
            file: file.path().to_path_buf(),
        };
        let json: serde_json::Value =
            serde_json::from_str(&tree(&args, &Settings::default()).await.unwrap()).unwrap();
        assert_eq!(json["meta"]["blocks"], 2);
        assert_eq!(json["meta"]["word_count"], 7);
        assert_eq!(json["document"]["content"][1]["type"], "codeBlock");
        assert_eq!(json["document"]["content"][1]["attrs"]["language"], "rust");
    }

    #[tokio::test]
    async fn test_missing_file_has_context() {
        let args = TreeArgs {
            file: PathBuf::from("/no/such/file.md"),
        };
        let err = tree(&args, &Settings::default()).await.unwrap_err();
        assert!(err.to_string().starts_with("Failed to read file"));
    }

    #[test]
    fn test_languages_listing() {
        let listing = languages();
        assert!(listing.contains("typescript (ts, tsx)\n"));
        assert!(listing.contains("bash (sh, shell)\n"));
        assert!(listing.contains("\nsql\n"));
        assert_eq!(listing.lines().count(), SUPPORTED_LANGUAGES.len());
    }

    #[test]
    fn test_explicit_config_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[markdown]\nemojify = false").unwrap();
        let settings = load_settings(Some(file.path())).unwrap();
        assert!(!settings.markdown.emojify);
        assert!(load_settings(Some(Path::new("/no/such/config.toml"))).is_err());
    }
}
