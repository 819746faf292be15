// SPDX-License-Identifier: AGPL-3.0-or-later
//! Default block model: paragraphs, headings, rules, and blocks kept as raw source

use crate::ast::{AttrValue, Content, Node};
use crate::token::{MarkdownToken, TokenKind};
use crate::traits::{AttributeSpec, Extension, MarkdownHelpers, MarkupSpec, NodeBuilder, NodeSpec};

pub const PARAGRAPH: &str = "paragraph";
pub const HEADING: &str = "heading";
pub const HORIZONTAL_RULE: &str = "horizontalRule";
pub const BLOCKQUOTE: &str = "blockquote";
pub const LIST: &str = "list";
pub const RAW_BLOCK: &str = "rawBlock";

fn text_leaves(builder: &NodeBuilder<'_>, text: &str) -> Vec<Content> {
    if text.is_empty() {
        Vec::new()
    } else {
        vec![builder.create_text(text)]
    }
}

/// Paragraph holding its inline markdown source as one text leaf
pub struct ParagraphExtension;

impl Extension for ParagraphExtension {
    fn node_type(&self) -> &str {
        PARAGRAPH
    }

    fn token_kind(&self) -> TokenKind {
        TokenKind::Paragraph
    }

    fn spec(&self) -> NodeSpec {
        NodeSpec {
            markup: Some(MarkupSpec::new("p")),
            ..NodeSpec::default()
        }
    }

    fn parse_markdown(&self, token: &MarkdownToken, builder: &NodeBuilder<'_>) -> Vec<Content> {
        let text = token.text.as_deref().unwrap_or_else(|| token.raw.trim());
        vec![builder
            .create_node(PARAGRAPH, std::iter::empty::<(&str, _)>(), text_leaves(builder, text))
            .into()]
    }

    fn render_markdown(&self, node: &Node, helpers: &MarkdownHelpers<'_>) -> Option<String> {
        Some(helpers.render_children(&node.content))
    }
}

/// ATX heading with a `level` attribute
pub struct HeadingExtension;

impl HeadingExtension {
    fn level(node: &Node) -> usize {
        node.attr("level")
            .and_then(AttrValue::as_integer)
            .map_or(1, |l| l.clamp(1, 6) as usize)
    }
}

impl Extension for HeadingExtension {
    fn node_type(&self) -> &str {
        HEADING
    }

    fn token_kind(&self) -> TokenKind {
        TokenKind::Heading
    }

    fn spec(&self) -> NodeSpec {
        NodeSpec {
            attributes: vec![AttributeSpec::new("level", 1i64)],
            ..NodeSpec::default()
        }
    }

    fn parse_markdown(&self, token: &MarkdownToken, builder: &NodeBuilder<'_>) -> Vec<Content> {
        let level = token.level.unwrap_or(1);
        let text = token.text.as_deref().unwrap_or_default();
        vec![builder
            .create_node(HEADING, [("level", AttrValue::from(level))], text_leaves(builder, text))
            .into()]
    }

    fn render_markdown(&self, node: &Node, helpers: &MarkdownHelpers<'_>) -> Option<String> {
        let marker = "#".repeat(Self::level(node));
        let text = helpers.render_children(&node.content);
        if text.is_empty() {
            Some(marker)
        } else {
            Some(format!("{marker} {text}"))
        }
    }
}

/// Thematic break
pub struct HorizontalRuleExtension;

impl Extension for HorizontalRuleExtension {
    fn node_type(&self) -> &str {
        HORIZONTAL_RULE
    }

    fn token_kind(&self) -> TokenKind {
        TokenKind::Hr
    }

    fn spec(&self) -> NodeSpec {
        NodeSpec {
            atom: true,
            markup: Some(MarkupSpec::new("hr")),
            ..NodeSpec::default()
        }
    }

    fn parse_markdown(&self, _token: &MarkdownToken, builder: &NodeBuilder<'_>) -> Vec<Content> {
        vec![builder
            .create_node(HORIZONTAL_RULE, std::iter::empty::<(&str, _)>(), Vec::new())
            .into()]
    }

    fn render_markdown(&self, _node: &Node, _helpers: &MarkdownHelpers<'_>) -> Option<String> {
        Some("---".to_string())
    }
}

/// Block kept as its raw markdown source
fn raw_block(node_type: &str, token: &MarkdownToken, builder: &NodeBuilder<'_>) -> Vec<Content> {
    let raw = token.raw.trim_end();
    vec![builder
        .create_node(node_type, std::iter::empty::<(&str, _)>(), text_leaves(builder, raw))
        .into()]
}

/// Block quote kept as raw source
pub struct BlockquoteExtension;

impl Extension for BlockquoteExtension {
    fn node_type(&self) -> &str {
        BLOCKQUOTE
    }

    fn token_kind(&self) -> TokenKind {
        TokenKind::Blockquote
    }

    fn spec(&self) -> NodeSpec {
        NodeSpec {
            markup: Some(MarkupSpec::new("blockquote").data_type("markdown-blockquote")),
            ..NodeSpec::default()
        }
    }

    fn parse_markdown(&self, token: &MarkdownToken, builder: &NodeBuilder<'_>) -> Vec<Content> {
        raw_block(BLOCKQUOTE, token, builder)
    }

    fn render_markdown(&self, node: &Node, helpers: &MarkdownHelpers<'_>) -> Option<String> {
        Some(helpers.render_children(&node.content))
    }
}

/// Bullet, ordered or task list kept as raw source
pub struct ListExtension;

impl Extension for ListExtension {
    fn node_type(&self) -> &str {
        LIST
    }

    fn token_kind(&self) -> TokenKind {
        TokenKind::List
    }

    fn spec(&self) -> NodeSpec {
        NodeSpec {
            markup: Some(MarkupSpec::new("pre").data_type("markdown-list")),
            ..NodeSpec::default()
        }
    }

    fn parse_markdown(&self, token: &MarkdownToken, builder: &NodeBuilder<'_>) -> Vec<Content> {
        raw_block(LIST, token, builder)
    }

    fn render_markdown(&self, node: &Node, helpers: &MarkdownHelpers<'_>) -> Option<String> {
        Some(helpers.render_children(&node.content))
    }
}

/// Any other block (reference definitions and the like) kept verbatim
pub struct RawBlockExtension;

impl Extension for RawBlockExtension {
    fn node_type(&self) -> &str {
        RAW_BLOCK
    }

    fn token_kind(&self) -> TokenKind {
        TokenKind::Other
    }

    fn spec(&self) -> NodeSpec {
        NodeSpec {
            code: true,
            markup: Some(MarkupSpec::new("pre").data_type("markdown-raw")),
            ..NodeSpec::default()
        }
    }

    fn parse_markdown(&self, token: &MarkdownToken, builder: &NodeBuilder<'_>) -> Vec<Content> {
        raw_block(RAW_BLOCK, token, builder)
    }

    fn render_markdown(&self, node: &Node, helpers: &MarkdownHelpers<'_>) -> Option<String> {
        Some(helpers.render_children(&node.content))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::ExtensionRegistry;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_heading_roundtrip() {
        let registry = ExtensionRegistry::default();
        let token = MarkdownToken {
            level: Some(2),
            text: Some("Setup".to_string()),
            ..MarkdownToken::new(TokenKind::Heading, "## Setup")
        };
        let nodes = registry.parse(&[token]);
        assert_eq!(nodes[0].attr("level"), Some(&AttrValue::Integer(2)));
        assert_eq!(registry.serialize(&nodes), "## Setup\n");
    }

    #[test]
    fn test_heading_level_is_clamped() {
        let registry = ExtensionRegistry::default();
        let node = Node::new(HEADING).with_attr("level", 9i64).with_text("x");
        assert_eq!(registry.serialize_node(&node), "###### x");
    }

    #[test]
    fn test_list_keeps_raw_source() {
        let registry = ExtensionRegistry::default();
        let raw = "- one\n  - nested\n- [x] done\n";
        let nodes = registry.parse(&[MarkdownToken::new(TokenKind::List, raw)]);
        assert_eq!(nodes[0].node_type, LIST);
        assert_eq!(registry.serialize(&nodes), raw);
    }

    #[test]
    fn test_other_blocks_pass_through() {
        let registry = ExtensionRegistry::default();
        let raw = "[d]: https://example.com/:tada: \"Title\"";
        let nodes = registry.parse(&[MarkdownToken::new(TokenKind::Other, raw)]);
        assert_eq!(nodes.len(), 1);
        assert_eq!(nodes[0].node_type, RAW_BLOCK);
        assert_eq!(registry.serialize(&nodes), format!("{raw}\n"));
    }

    #[test]
    fn test_horizontal_rule() {
        let registry = ExtensionRegistry::default();
        let nodes = registry.parse(&[MarkdownToken::new(TokenKind::Hr, "***")]);
        assert_eq!(registry.serialize(&nodes), "---\n");
    }
}
