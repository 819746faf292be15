// SPDX-License-Identifier: AGPL-3.0-or-later
//! Fenced code block
//!
//! Content is a single text leaf, the language lives in the `language`
//! attribute. Fences tagged `mermaid` are declined so the diagram extension
//! registered after this one can claim them.

use regex::Regex;
use std::sync::LazyLock;

use crate::ast::{AttrValue, Content, Node};
use crate::extensions::fenced_block;
use crate::token::{MarkdownToken, TokenKind};
use crate::traits::{AttributeSpec, Extension, MarkdownHelpers, MarkupSpec, NodeBuilder, NodeSpec};

pub const CODE_BLOCK: &str = "codeBlock";

const LANGUAGE_CLASS_PREFIX: &str = "language-";

/// Opening tag of an element, then the opening tag of its first child element
///
/// Text between the two tags is skipped.
static FIRST_CHILD_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)^\s*<[A-Za-z][^>]*>[^<]*<[A-Za-z][A-Za-z0-9-]*(?P<attrs>[^>]*)>").unwrap()
});

static CLASS_ATTR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"\bclass\s*=\s*(?:"(?P<dq>[^"]*)"|'(?P<sq>[^']*)')"#).unwrap());

pub struct CodeBlockExtension {
    default_language: String,
}

impl CodeBlockExtension {
    pub fn new(default_language: &str) -> Self {
        Self {
            default_language: default_language.to_string(),
        }
    }

    pub fn default_language(&self) -> &str {
        &self.default_language
    }

    /// Language named by the first `language-<id>` class, else the default
    pub fn language_from_classes<'a>(&self, classes: impl IntoIterator<Item = &'a str>) -> String {
        classes
            .into_iter()
            .find_map(|class| class.strip_prefix(LANGUAGE_CLASS_PREFIX))
            .filter(|lang| !lang.is_empty())
            .map_or_else(|| self.default_language.clone(), str::to_string)
    }

    /// Language of rendered block markup such as `<pre><code class="language-rust">`
    ///
    /// This is the hook a host editor uses when a code block is pasted or
    /// loaded as HTML, including the preview's own output. Only the first
    /// child element of the block is inspected.
    pub fn language_from_markup(&self, html: &str) -> String {
        let classes = FIRST_CHILD_RE
            .captures(html)
            .and_then(|caps| caps.name("attrs"))
            .and_then(|attrs| CLASS_ATTR_RE.captures(attrs.as_str()))
            .and_then(|caps| caps.name("dq").or_else(|| caps.name("sq")))
            .map(|m| m.as_str())
            .unwrap_or_default();
        self.language_from_classes(classes.split_whitespace())
    }
}

impl Default for CodeBlockExtension {
    fn default() -> Self {
        Self::new(crate::traits::DEFAULT_CODE_LANGUAGE)
    }
}

impl Extension for CodeBlockExtension {
    fn node_type(&self) -> &str {
        CODE_BLOCK
    }

    fn token_kind(&self) -> TokenKind {
        TokenKind::Code
    }

    fn spec(&self) -> NodeSpec {
        NodeSpec {
            code: true,
            attributes: vec![
                AttributeSpec::new("language", self.default_language.as_str()).hidden()
            ],
            markup: Some(MarkupSpec::new("pre").data_type("code-block")),
            ..NodeSpec::default()
        }
    }

    fn claims(&self, token: &MarkdownToken) -> bool {
        !token.is_diagram()
    }

    fn parse_markdown(&self, token: &MarkdownToken, builder: &NodeBuilder<'_>) -> Vec<Content> {
        if token.is_diagram() {
            return Vec::new();
        }

        let language = token
            .lang
            .as_deref()
            .filter(|l| !l.is_empty())
            .unwrap_or(&self.default_language);
        let text = token.text.as_deref().unwrap_or_default();
        let content = if text.is_empty() {
            Vec::new()
        } else {
            vec![builder.create_text(text)]
        };

        vec![builder
            .create_node(CODE_BLOCK, [("language", AttrValue::from(language))], content)
            .into()]
    }

    fn render_markdown(&self, node: &Node, helpers: &MarkdownHelpers<'_>) -> Option<String> {
        let language = node
            .attr_str("language")
            .filter(|l| !l.is_empty())
            .unwrap_or(if self.default_language.is_empty() {
                "text"
            } else {
                self.default_language.as_str()
            });
        let content = helpers.render_children(&node.content);
        Some(fenced_block(language, &content))
    }
}
