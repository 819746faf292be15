// SPDX-License-Identifier: AGPL-3.0-or-later
//! Markdown handler: tokenize with comrak, dispatch through the registry

use crate::ast::Document;
use crate::registry::ExtensionRegistry;
use crate::token::{tokenize, MarkdownToken};
use crate::traits::{ParseConfig, Result};

/// Markdown <-> document tree conversion
pub struct MarkdownHandler {
    config: ParseConfig,
    registry: ExtensionRegistry,
}

impl MarkdownHandler {
    /// Handler with the default extension set
    pub fn new(config: ParseConfig) -> Self {
        let registry = ExtensionRegistry::with_defaults(&config);
        Self { config, registry }
    }

    /// Handler with a caller-supplied registry
    pub fn with_registry(config: ParseConfig, registry: ExtensionRegistry) -> Self {
        Self { config, registry }
    }

    pub fn registry(&self) -> &ExtensionRegistry {
        &self.registry
    }

    pub fn config(&self) -> &ParseConfig {
        &self.config
    }

    pub fn tokenize(&self, input: &str) -> Result<Vec<MarkdownToken>> {
        tokenize(input, &self.config)
    }

    /// Parse markdown into a document tree
    pub fn parse(&self, input: &str) -> Result<Document> {
        let tokens = self.tokenize(input)?;
        Ok(self.parse_tokens(&tokens))
    }

    /// Build a document from an already tokenized stream
    pub fn parse_tokens(&self, tokens: &[MarkdownToken]) -> Document {
        let mut doc = Document::from_nodes(self.registry.parse(tokens));
        if self.config.emojify {
            self.registry.emojify(&mut doc);
        }
        tracing::debug!(tokens = tokens.len(), blocks = doc.content.len(), "parsed markdown");
        doc
    }

    /// Serialize a document tree back to markdown
    pub fn render(&self, doc: &Document) -> Result<String> {
        Ok(self.registry.serialize(&doc.content))
    }

    /// Remove blocks left empty by edits, see [`ExtensionRegistry::cleanup`]
    pub fn cleanup(&self, doc: &mut Document) -> usize {
        self.registry.cleanup(doc)
    }

    /// Parse then serialize, normalizing the markdown
    pub fn normalize(&self, input: &str) -> Result<String> {
        let doc = self.parse(input)?;
        self.render(&doc)
    }
}

impl Default for MarkdownHandler {
    fn default() -> Self {
        Self::new(ParseConfig::default())
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    fn word() -> impl Strategy<Value = String> {
        "[a-z]{1,8}"
    }

    fn paragraph() -> impl Strategy<Value = String> {
        prop::collection::vec(word(), 1..6).prop_map(|w| w.join(" "))
    }

    fn code_block() -> impl Strategy<Value = String> {
        (
            prop::sample::select(vec!["rust", "python", "mermaid", "sql"]),
            prop::collection::vec(paragraph(), 1..4),
        )
            .prop_map(|(lang, lines)| format!("```{lang}\n{}\n```", lines.join("\n")))
    }

    fn block() -> impl Strategy<Value = String> {
        prop_oneof![
            paragraph(),
            word().prop_map(|w| format!("## {w}")),
            code_block(),
        ]
    }

    proptest! {
        // Serializing a parsed document and parsing it again gives the same tree
        #[test]
        fn prop_parse_serialize_idempotent(blocks in prop::collection::vec(block(), 0..6)) {
            let input = blocks.join("\n\n");
            let handler = MarkdownHandler::default();
            let first = handler.parse(&input).unwrap();
            let output = handler.render(&first).unwrap();
            let second = handler.parse(&output).unwrap();
            prop_assert_eq!(&first, &second);
            prop_assert_eq!(handler.render(&second).unwrap(), output);
        }
    }
}
