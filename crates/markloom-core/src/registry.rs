// SPDX-License-Identifier: AGPL-3.0-or-later
//! Ordered extension registry with parse and serialize dispatch
//!
//! Registration order is precedence: for each token the registry walks the
//! extensions front to back and the first one that claims the token and
//! returns a non-empty result wins. Serialization dispatches on node type and
//! never fails; nodes nobody owns fall back to their text content.

use crate::ast::{visit_mut, Content, Document, Node, VisitorMut, Walk};
use crate::emoji::emojify_prose;
use crate::extensions::{
    BlockquoteExtension, CodeBlockExtension, HeadingExtension, HorizontalRuleExtension,
    ListExtension, MarkdownTableExtension, MermaidExtension, ParagraphExtension,
    RawBlockExtension, RawHtmlTextExtension, PARAGRAPH,
};
use crate::token::MarkdownToken;
use crate::traits::{
    Extension, ExtensionContract, MarkdownHelpers, NodeBuilder, NodeSpec, ParseConfig,
};
use std::borrow::Cow;

struct Entry {
    extension: Box<dyn Extension>,
    spec: NodeSpec,
}

/// Registry of node-kind extensions
pub struct ExtensionRegistry {
    entries: Vec<Entry>,
}

impl ExtensionRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Base block model followed by the code, diagram, table and raw HTML kinds
    ///
    /// The code block must come before the diagram block: it declines fences
    /// tagged `mermaid`, which then fall through to the diagram extension.
    pub fn with_defaults(config: &ParseConfig) -> Self {
        let mut registry = Self::new();
        registry.register(ParagraphExtension);
        registry.register(HeadingExtension);
        registry.register(HorizontalRuleExtension);
        registry.register(BlockquoteExtension);
        registry.register(ListExtension);
        registry.register(RawBlockExtension);
        registry.register(CodeBlockExtension::new(&config.default_language));
        registry.register(MermaidExtension);
        registry.register(MarkdownTableExtension);
        registry.register(RawHtmlTextExtension);
        registry
    }

    /// Append an extension; later registrations have lower precedence
    pub fn register<E: Extension + 'static>(&mut self, extension: E) {
        let spec = extension.spec();
        tracing::trace!(
            node_type = extension.node_type(),
            token_kind = %extension.token_kind(),
            "registered extension"
        );
        self.entries.push(Entry {
            extension: Box::new(extension),
            spec,
        });
    }

    fn entry(&self, node_type: &str) -> Option<&Entry> {
        self.entries
            .iter()
            .find(|e| e.extension.node_type() == node_type)
    }

    /// Extension owning a node type
    pub fn get(&self, node_type: &str) -> Option<&dyn Extension> {
        self.entry(node_type).map(|e| e.extension.as_ref())
    }

    pub fn spec(&self, node_type: &str) -> Option<&NodeSpec> {
        self.entry(node_type).map(|e| &e.spec)
    }

    /// Registered node types in precedence order
    pub fn node_types(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.extension.node_type()).collect()
    }

    /// Declarative contracts for host editor integrations
    pub fn contracts(&self) -> Vec<ExtensionContract> {
        self.entries
            .iter()
            .map(|e| ExtensionContract {
                node_type: e.extension.node_type().to_string(),
                token_kind: e.extension.token_kind(),
                atom: e.spec.atom,
                markup: e.spec.markup.clone(),
                attributes: e.spec.attributes.clone(),
            })
            .collect()
    }

    /// Content produced for one token, empty when no extension claims it
    pub fn parse_token(&self, token: &MarkdownToken) -> Vec<Content> {
        let builder = NodeBuilder::new(self);
        for entry in &self.entries {
            let extension = &entry.extension;
            if extension.token_kind() != token.kind || !extension.claims(token) {
                continue;
            }
            let content = extension.parse_markdown(token, &builder);
            if !content.is_empty() {
                tracing::trace!(
                    token_kind = %token.kind,
                    node_type = extension.node_type(),
                    "token claimed"
                );
                return content;
            }
        }
        tracing::trace!(token_kind = %token.kind, "token dropped");
        Vec::new()
    }

    /// Build block nodes from a token stream
    ///
    /// Loose text leaves at block level are wrapped in a paragraph.
    pub fn parse(&self, tokens: &[MarkdownToken]) -> Vec<Node> {
        let builder = NodeBuilder::new(self);
        let mut blocks = Vec::new();
        let mut loose: Vec<Content> = Vec::new();

        for token in tokens {
            for item in self.parse_token(token) {
                match item {
                    Content::Node(node) => {
                        if !loose.is_empty() {
                            let text = std::mem::take(&mut loose);
                            blocks.push(builder.create_node(
                                PARAGRAPH,
                                std::iter::empty::<(&str, _)>(),
                                text,
                            ));
                        }
                        blocks.push(node);
                    }
                    text @ Content::Text { .. } => loose.push(text),
                }
            }
            if !loose.is_empty() {
                let text = std::mem::take(&mut loose);
                blocks.push(builder.create_node(PARAGRAPH, std::iter::empty::<(&str, _)>(), text));
            }
        }

        blocks
    }

    /// Markdown for a single node; never fails
    pub fn serialize_node(&self, node: &Node) -> String {
        let helpers = MarkdownHelpers::new(self);
        match self.get(&node.node_type) {
            Some(extension) => extension
                .render_markdown(node, &helpers)
                .unwrap_or_else(|| helpers.render_children(&node.content)),
            None => {
                tracing::debug!(node_type = %node.node_type, "no extension, writing text content");
                node.text_content()
            }
        }
    }

    /// Markdown for a sequence of block nodes, separated by blank lines
    pub fn serialize(&self, nodes: &[Node]) -> String {
        let mut output = String::new();
        for node in nodes {
            let mut block = self.serialize_node(node);
            if block.is_empty() {
                tracing::debug!(node_type = %node.node_type, "omitting empty block");
                continue;
            }
            if !block.ends_with('\n') {
                block.push('\n');
            }
            if !output.is_empty() {
                output.push('\n');
            }
            output.push_str(&block);
        }
        output
    }

    /// Remove non-atomic nodes whose text became whitespace-only
    ///
    /// Returns the number of nodes removed.
    pub fn cleanup(&self, doc: &mut Document) -> usize {
        let mut removed = 0;
        doc.content.retain_mut(|node| {
            if self.is_blank(node) {
                removed += 1;
                false
            } else {
                removed += self.cleanup_content(&mut node.content);
                true
            }
        });
        if removed > 0 {
            tracing::debug!(removed, "removed empty nodes");
        }
        removed
    }

    fn cleanup_content(&self, content: &mut Vec<Content>) -> usize {
        let mut removed = 0;
        content.retain_mut(|item| match item {
            Content::Node(node) if self.is_blank(node) => {
                removed += 1;
                false
            }
            Content::Node(node) => {
                removed += self.cleanup_content(&mut node.content);
                true
            }
            Content::Text { .. } => true,
        });
        removed
    }

    fn is_blank(&self, node: &Node) -> bool {
        let atom = self.spec(&node.node_type).is_some_and(|s| s.atom);
        !atom && node.text_content().trim().is_empty()
    }

    /// Shortcode substitution over prose text leaves
    pub fn emojify(&self, doc: &mut Document) {
        visit_mut(doc, &mut EmojiPass { registry: self });
    }
}

impl Default for ExtensionRegistry {
    fn default() -> Self {
        Self::with_defaults(&ParseConfig::default())
    }
}

struct EmojiPass<'a> {
    registry: &'a ExtensionRegistry,
}

impl VisitorMut for EmojiPass<'_> {
    fn enter(&mut self, node: &mut Node, _depth: usize) -> Walk {
        match self.registry.spec(&node.node_type) {
            Some(spec) if spec.code || spec.atom => Walk::Skip,
            _ => Walk::Continue,
        }
    }

    fn text(&mut self, _parent_type: &str, text: &mut String) {
        let replaced = match emojify_prose(text) {
            Cow::Owned(out) => Some(out),
            Cow::Borrowed(_) => None,
        };
        if let Some(out) = replaced {
            *text = out;
        }
    }
}
