// SPDX-License-Identifier: AGPL-3.0-or-later
//! Raw HTML passthrough
//!
//! HTML in the markdown source becomes a literal text leaf, so it is shown as
//! text and never interpreted as markup. It has no markdown form of its own:
//! the registry wraps it in a paragraph and it serializes as that paragraph's
//! text.

use crate::ast::{Content, Node};
use crate::token::{MarkdownToken, TokenKind};
use crate::traits::{Extension, MarkdownHelpers, NodeBuilder, NodeGroup, NodeSpec};

pub const TEXT: &str = "text";

pub struct RawHtmlTextExtension;

impl Extension for RawHtmlTextExtension {
    fn node_type(&self) -> &str {
        TEXT
    }

    fn token_kind(&self) -> TokenKind {
        TokenKind::Html
    }

    fn spec(&self) -> NodeSpec {
        NodeSpec {
            group: NodeGroup::Inline,
            ..NodeSpec::default()
        }
    }

    fn parse_markdown(&self, token: &MarkdownToken, builder: &NodeBuilder<'_>) -> Vec<Content> {
        let raw = token.raw.trim_end();
        if raw.is_empty() {
            Vec::new()
        } else {
            vec![builder.create_text(raw)]
        }
    }

    fn render_markdown(&self, _node: &Node, _helpers: &MarkdownHelpers<'_>) -> Option<String> {
        None
    }
}
