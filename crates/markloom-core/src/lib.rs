// SPDX-License-Identifier: AGPL-3.0-or-later
//! Markloom Core - Markdown <-> document tree conversion
//!
//! This crate provides:
//! - A document node tree with attribute maps and text leaves
//! - A comrak-backed tokenizer producing top-level block tokens
//! - The `Extension` trait and an ordered registry that dispatches parse and serialize
//! - Extensions for fenced code, mermaid diagrams, raw tables and raw HTML
//! - `:shortcode:` emoji substitution over prose text

pub mod ast;
pub mod emoji;
pub mod extensions;
pub mod markdown;
pub mod registry;
pub mod token;
pub mod traits;

pub use ast::{visit, visit_mut, AttrValue, Content, Document, Node, Visitor, VisitorMut, Walk};
pub use emoji::{emojify, emojify_prose};
pub use markdown::MarkdownHandler;
pub use registry::ExtensionRegistry;
pub use token::{
    comrak_options, is_diagram_language, tokenize, MarkdownToken, TokenKind, DIAGRAM_LANGUAGE,
};
pub use traits::{
    ConversionError, Extension, ExtensionContract, NodeSpec, ParseConfig, Result,
};
