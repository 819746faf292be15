// SPDX-License-Identifier: AGPL-3.0-or-later
//! Mermaid diagram block
//!
//! Atomic node: the diagram source is stored verbatim in the `code` attribute
//! and rendered to SVG later by the diagram service.

use crate::ast::{AttrValue, Content, Node};
use crate::extensions::fenced_block;
use crate::token::{MarkdownToken, TokenKind, DIAGRAM_LANGUAGE};
use crate::traits::{AttributeSpec, Extension, MarkdownHelpers, MarkupSpec, NodeBuilder, NodeSpec};

pub const MERMAID_BLOCK: &str = "mermaidBlock";

pub struct MermaidExtension;

impl Extension for MermaidExtension {
    fn node_type(&self) -> &str {
        MERMAID_BLOCK
    }

    fn token_kind(&self) -> TokenKind {
        TokenKind::Code
    }

    fn spec(&self) -> NodeSpec {
        NodeSpec {
            atom: true,
            code: true,
            attributes: vec![AttributeSpec::new("code", "")],
            markup: Some(
                MarkupSpec::new("div")
                    .data_type("mermaid-block")
                    .class(DIAGRAM_LANGUAGE),
            ),
            ..NodeSpec::default()
        }
    }

    fn claims(&self, token: &MarkdownToken) -> bool {
        token.is_diagram()
    }

    fn parse_markdown(&self, token: &MarkdownToken, builder: &NodeBuilder<'_>) -> Vec<Content> {
        if !token.is_diagram() {
            return Vec::new();
        }
        let code = token.text.clone().unwrap_or_default();
        vec![builder
            .create_node(MERMAID_BLOCK, [("code", AttrValue::from(code))], Vec::new())
            .into()]
    }

    fn render_markdown(&self, node: &Node, _helpers: &MarkdownHelpers<'_>) -> Option<String> {
        let code = node.attr_str("code").unwrap_or_default();
        Some(fenced_block(DIAGRAM_LANGUAGE, code))
    }
}
