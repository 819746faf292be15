// SPDX-License-Identifier: AGPL-3.0-or-later
//! Markdown to HTML
//!
//! comrak parses the source with the same GFM options as the tokenizer. The
//! AST is rewritten before formatting: code blocks are highlighted, mermaid
//! blocks become diagram placeholders, raw HTML is escaped and prose text is
//! emojified.

use comrak::nodes::{AstNode, NodeHtmlBlock, NodeValue};
use comrak::{format_html, parse_document, Arena};
use markloom_core::emoji::emojify_cow;
use markloom_core::{comrak_options, is_diagram_language};
use std::borrow::Cow;
use std::sync::Arc;

use crate::config::Settings;
use crate::diagram::{BatchSummary, DiagramService};
use crate::error::Result;
use crate::escape::escape_html;
use crate::highlight::{normalize_language, Highlighter, ThemeMode};

pub struct MarkdownRenderer {
    highlighter: Arc<Highlighter>,
    diagrams: Option<Arc<DiagramService>>,
    theme_mode: ThemeMode,
    emojify: bool,
}

impl MarkdownRenderer {
    pub fn new(highlighter: Arc<Highlighter>) -> Self {
        Self {
            highlighter,
            diagrams: None,
            theme_mode: ThemeMode::default(),
            emojify: true,
        }
    }

    /// Renderer wired from settings; diagrams go through Kroki when enabled
    pub fn from_settings(settings: &Settings) -> Self {
        let highlighter = Arc::new(Highlighter::new(settings.theme_pair()));
        let mut renderer = Self::new(highlighter)
            .theme_mode(settings.highlight.theme_mode)
            .emojify(settings.markdown.emojify);
        if settings.diagrams.enabled {
            renderer = renderer.with_diagrams(Arc::new(DiagramService::from_settings(&settings.diagrams)));
        }
        renderer
    }

    pub fn with_diagrams(mut self, diagrams: Arc<DiagramService>) -> Self {
        self.diagrams = Some(diagrams);
        self
    }

    pub fn theme_mode(mut self, mode: ThemeMode) -> Self {
        self.theme_mode = mode;
        self
    }

    pub fn emojify(mut self, enabled: bool) -> Self {
        self.emojify = enabled;
        self
    }

    pub fn highlighter(&self) -> &Arc<Highlighter> {
        &self.highlighter
    }

    /// Wait for the highlighter, then render
    ///
    /// A highlighter that fails to start is logged and code falls back to
    /// escaped blocks.
    pub async fn render_to_html(&self, markdown: &str) -> Result<String> {
        if let Err(err) = self.highlighter.ensure_ready().await {
            tracing::warn!(error = %err, "highlighter unavailable, rendering plain code blocks");
        }
        self.render_html(markdown)
    }

    /// Render with whatever engines are ready now
    pub fn render_html(&self, markdown: &str) -> Result<String> {
        let arena = Arena::new();
        let mut options = comrak_options();
        options.extension.footnotes = true;
        options.render.unsafe_ = true;

        let root = parse_document(&arena, markdown, &options);
        self.rewrite(root);

        let mut out = Vec::with_capacity(markdown.len() * 2);
        format_html(root, &options, &mut out)?;
        Ok(String::from_utf8(out)?)
    }

    /// Replace diagram placeholders in rendered HTML with SVG
    ///
    /// Without a diagram service the HTML is returned untouched.
    pub async fn hydrate_diagrams(&self, html: String) -> (String, BatchSummary) {
        match &self.diagrams {
            Some(diagrams) => diagrams.hydrate_html(html).await,
            None => (html, BatchSummary::default()),
        }
    }

    fn rewrite<'a>(&self, root: &'a AstNode<'a>) {
        merge_text_runs(root);
        for node in root.descendants() {
            let mut ast = node.data.borrow_mut();
            let replacement = match &mut ast.value {
                NodeValue::CodeBlock(code) => Some(self.code_block_html(&code.info, &code.literal)),
                NodeValue::HtmlBlock(html) => {
                    let escaped = escape_html(&html.literal).into_owned();
                    html.literal = escaped;
                    None
                }
                NodeValue::HtmlInline(raw) => {
                    let escaped = escape_html(raw).into_owned();
                    *raw = escaped;
                    None
                }
                NodeValue::Text(text) if self.emojify => {
                    let replaced = match emojify_cow(text) {
                        Cow::Owned(replaced) => Some(replaced),
                        Cow::Borrowed(_) => None,
                    };
                    if let Some(replaced) = replaced {
                        *text = replaced;
                    }
                    None
                }
                _ => None,
            };
            if let Some(literal) = replacement {
                ast.value = NodeValue::HtmlBlock(NodeHtmlBlock {
                    block_type: 0,
                    literal,
                });
            }
        }
    }

    fn code_block_html(&self, info: &str, literal: &str) -> String {
        let lang = info.split_whitespace().next().unwrap_or_default();
        // Preview is lenient about case; the editor tree is not
        if is_diagram_language(Some(lang.to_ascii_lowercase().as_str())) {
            let source = literal.trim_end_matches('\n');
            return format!("<div class=\"mermaid\">{}</div>\n", escape_html(source));
        }
        let language = normalize_language(if lang.is_empty() { "text" } else { lang });
        let mut html = self.highlighter.highlight(literal, language, self.theme_mode);
        if !html.ends_with('\n') {
            html.push('\n');
        }
        html
    }
}

/// Join sibling text nodes so shortcodes split by the inline parser still match
fn merge_text_runs<'a>(root: &'a AstNode<'a>) {
    let nodes: Vec<_> = root.descendants().collect();
    for node in nodes {
        if !matches!(node.data.borrow().value, NodeValue::Text(_)) {
            continue;
        }
        while let Some(next) = node.next_sibling() {
            let tail = match &next.data.borrow().value {
                NodeValue::Text(tail) => tail.clone(),
                _ => break,
            };
            if let NodeValue::Text(text) = &mut node.data.borrow_mut().value {
                text.push_str(&tail);
            }
            next.detach();
        }
    }
}
