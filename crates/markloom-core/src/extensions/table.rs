// SPDX-License-Identifier: AGPL-3.0-or-later
//! GFM table kept as raw markdown source
//!
//! No structural table parsing: the block holds the table's source text with
//! trailing whitespace trimmed and writes it back newline-terminated.

use crate::ast::{Content, Node};
use crate::token::{MarkdownToken, TokenKind};
use crate::traits::{Extension, MarkdownHelpers, MarkupSpec, NodeBuilder, NodeSpec};

pub const MARKDOWN_TABLE: &str = "markdownTable";

pub struct MarkdownTableExtension;

impl Extension for MarkdownTableExtension {
    fn node_type(&self) -> &str {
        MARKDOWN_TABLE
    }

    fn token_kind(&self) -> TokenKind {
        TokenKind::Table
    }

    fn spec(&self) -> NodeSpec {
        NodeSpec {
            code: true,
            markup: Some(
                MarkupSpec::new("pre")
                    .data_type("markdown-table")
                    .class("markdown-table-block"),
            ),
            ..NodeSpec::default()
        }
    }

    fn parse_markdown(&self, token: &MarkdownToken, builder: &NodeBuilder<'_>) -> Vec<Content> {
        let raw = token.raw.trim_end();
        let content = if raw.is_empty() {
            Vec::new()
        } else {
            vec![builder.create_text(raw)]
        };
        vec![builder
            .create_node(MARKDOWN_TABLE, std::iter::empty::<(&str, _)>(), content)
            .into()]
    }

    fn render_markdown(&self, node: &Node, helpers: &MarkdownHelpers<'_>) -> Option<String> {
        let mut raw = helpers.render_children(&node.content);
        if !raw.ends_with('\n') {
            raw.push('\n');
        }
        Some(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Document;
    use crate::registry::ExtensionRegistry;
    use pretty_assertions::assert_eq;

    const TABLE: &str = "| a | b |\n|---|---|\n| 1 | 2 |\n";

    #[test]
    fn test_parse_trims_trailing_whitespace() {
        let registry = ExtensionRegistry::default();
        let token = MarkdownToken::new(TokenKind::Table, "| a | b |\n|---|---|\n| 1 | 2 |  \n\n");
        let nodes = registry.parse(&[token]);
        assert_eq!(nodes[0].text_content(), "| a | b |\n|---|---|\n| 1 | 2 |");
    }

    #[test]
    fn test_roundtrip_single_trailing_newline() {
        let registry = ExtensionRegistry::default();
        let nodes = registry.parse(&[MarkdownToken::new(TokenKind::Table, TABLE)]);
        assert_eq!(registry.serialize_node(&nodes[0]), TABLE);
        assert_eq!(registry.serialize(&nodes), TABLE);
    }

    #[test]
    fn test_whitespace_edit_is_cleaned_up() {
        let registry = ExtensionRegistry::default();
        let mut doc = Document::from_nodes(
            registry.parse(&[MarkdownToken::new(TokenKind::Table, TABLE)]),
        );
        doc.content[0].set_text(" \n\t ");
        assert_eq!(registry.cleanup(&mut doc), 1);
        assert!(doc.blocks_of(MARKDOWN_TABLE).next().is_none());
    }
}
