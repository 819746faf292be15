// SPDX-License-Identifier: AGPL-3.0-or-later
//! Extension trait and the shared conversion types
//!
//! Every node kind is owned by one [`Extension`] that knows how to build the
//! node from a markdown token and how to write it back out. The
//! [`ExtensionRegistry`](crate::registry::ExtensionRegistry) holds them in
//! registration order and does the dispatch.

use serde::{Deserialize, Serialize};

use crate::ast::{AttrValue, Content, Node};
use crate::registry::ExtensionRegistry;
use crate::token::{MarkdownToken, TokenKind};

/// Error type for parsing and rendering
#[derive(Debug, thiserror::Error)]
pub enum ConversionError {
    #[error("Tokenizer error: {0}")]
    Tokenize(String),
}

pub type Result<T> = std::result::Result<T, ConversionError>;

/// Language used for code blocks without an info string
pub const DEFAULT_CODE_LANGUAGE: &str = "javascript";

/// Configuration for parsing
#[derive(Debug, Clone)]
pub struct ParseConfig {
    /// Language stored on code blocks that do not name one
    pub default_language: String,
    /// Run shortcode substitution over prose text after parsing
    pub emojify: bool,
    /// Reject inputs larger than this many bytes
    pub max_input_len: Option<usize>,
}

impl Default for ParseConfig {
    fn default() -> Self {
        Self {
            default_language: DEFAULT_CODE_LANGUAGE.to_string(),
            emojify: true,
            max_input_len: None,
        }
    }
}

/// Where a node may appear
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeGroup {
    #[default]
    Block,
    Inline,
}

/// One attribute a node type declares, with its default
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeSpec {
    pub name: String,
    pub default: AttrValue,
    /// Whether the attribute is written to the node's HTML markup
    pub rendered: bool,
}

impl AttributeSpec {
    pub fn new(name: &str, default: impl Into<AttrValue>) -> Self {
        Self {
            name: name.to_string(),
            default: default.into(),
            rendered: true,
        }
    }

    pub fn hidden(mut self) -> Self {
        self.rendered = false;
        self
    }
}

/// HTML markup a node type is recognized by in a host editor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkupSpec {
    pub tag: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub class: Option<String>,
}

impl MarkupSpec {
    pub fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_string(),
            data_type: None,
            class: None,
        }
    }

    pub fn data_type(mut self, data_type: &str) -> Self {
        self.data_type = Some(data_type.to_string());
        self
    }

    pub fn class(mut self, class: &str) -> Self {
        self.class = Some(class.to_string());
        self
    }

    /// CSS-style selector, e.g. `pre[data-type="markdown-table"]`
    pub fn selector(&self) -> String {
        let mut selector = self.tag.clone();
        if let Some(class) = &self.class {
            selector.push('.');
            selector.push_str(class);
        }
        if let Some(data_type) = &self.data_type {
            selector.push_str(&format!("[data-type=\"{data_type}\"]"));
        }
        selector
    }
}

/// Schema of a node type
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NodeSpec {
    pub group: NodeGroup,
    /// Payload lives in attributes, the node has no structural content
    pub atom: bool,
    /// Content is verbatim source, never post-processed as prose
    pub code: bool,
    pub attributes: Vec<AttributeSpec>,
    pub markup: Option<MarkupSpec>,
}

/// Published contract of a registered extension
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtensionContract {
    pub node_type: String,
    pub token_kind: TokenKind,
    pub atom: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub markup: Option<MarkupSpec>,
    pub attributes: Vec<AttributeSpec>,
}

/// Node factory handed to [`Extension::parse_markdown`]
///
/// Fills in schema defaults for attributes the parse rule does not set.
pub struct NodeBuilder<'a> {
    registry: &'a ExtensionRegistry,
}

impl<'a> NodeBuilder<'a> {
    pub(crate) fn new(registry: &'a ExtensionRegistry) -> Self {
        Self { registry }
    }

    pub fn create_node<I, K>(&self, node_type: &str, attrs: I, content: Vec<Content>) -> Node
    where
        I: IntoIterator<Item = (K, AttrValue)>,
        K: Into<String>,
    {
        let mut node = Node::new(node_type);
        if let Some(spec) = self.registry.spec(node_type) {
            for attr in &spec.attributes {
                node.attrs.insert(attr.name.clone(), attr.default.clone());
            }
        }
        for (name, value) in attrs {
            node.attrs.insert(name.into(), value);
        }
        node.content = content;
        node
    }

    pub fn create_text(&self, text: impl Into<String>) -> Content {
        Content::text(text)
    }
}

/// Serialization helpers handed to [`Extension::render_markdown`]
pub struct MarkdownHelpers<'a> {
    registry: &'a ExtensionRegistry,
}

impl<'a> MarkdownHelpers<'a> {
    pub(crate) fn new(registry: &'a ExtensionRegistry) -> Self {
        Self { registry }
    }

    /// Text leaves verbatim, nested nodes through their own extension
    pub fn render_children(&self, content: &[Content]) -> String {
        let mut out = String::new();
        for item in content {
            match item {
                Content::Text { text } => out.push_str(text),
                Content::Node(node) => out.push_str(&self.registry.serialize_node(node)),
            }
        }
        out
    }
}

/// A node kind with symmetric markdown parse and serialize rules
pub trait Extension: Send + Sync {
    /// Node type this extension builds and serializes
    fn node_type(&self) -> &str;

    /// Token kind this extension parses
    fn token_kind(&self) -> TokenKind;

    fn spec(&self) -> NodeSpec {
        NodeSpec::default()
    }

    /// Explicit claim check, evaluated before `parse_markdown`
    fn claims(&self, _token: &MarkdownToken) -> bool {
        true
    }

    /// Build zero or more nodes from a token. An empty result passes the token on.
    fn parse_markdown(&self, token: &MarkdownToken, builder: &NodeBuilder<'_>) -> Vec<Content>;

    /// Markdown for a node, `None` when the node is not serializable on its own
    fn render_markdown(&self, node: &Node, helpers: &MarkdownHelpers<'_>) -> Option<String>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_markup_selector() {
        let markup = MarkupSpec::new("pre")
            .class("markdown-table-block")
            .data_type("markdown-table");
        assert_eq!(
            markup.selector(),
            r#"pre.markdown-table-block[data-type="markdown-table"]"#
        );
    }

    #[test]
    fn test_parse_config_defaults() {
        let config = ParseConfig::default();
        assert_eq!(config.default_language, "javascript");
        assert!(config.emojify);
        assert_eq!(config.max_input_len, None);
    }
}
