// SPDX-License-Identifier: AGPL-3.0-or-later
//! Document node tree shared by the parser, serializer and post-processors
//!
//! The tree is intentionally untyped at the node level: a node is identified by
//! its `node_type` string and carries an ordered attribute map plus ordered
//! content. What a node type means (atomic or container, which attributes it
//! has) is published by the extension that owns it, not by this module.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Attribute value stored on a node
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttrValue {
    Null,
    Bool(bool),
    Integer(i64),
    String(String),
}

impl AttrValue {
    /// String view of the value, `None` for non-string values
    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttrValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            AttrValue::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, AttrValue::Null)
    }
}

impl From<&str> for AttrValue {
    fn from(value: &str) -> Self {
        AttrValue::String(value.to_string())
    }
}

impl From<String> for AttrValue {
    fn from(value: String) -> Self {
        AttrValue::String(value)
    }
}

impl From<i64> for AttrValue {
    fn from(value: i64) -> Self {
        AttrValue::Integer(value)
    }
}

impl From<u8> for AttrValue {
    fn from(value: u8) -> Self {
        AttrValue::Integer(i64::from(value))
    }
}

impl From<bool> for AttrValue {
    fn from(value: bool) -> Self {
        AttrValue::Bool(value)
    }
}

/// Ordered child content of a node
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Content {
    /// Nested structural node
    Node(Node),
    /// Plain text leaf
    Text { text: String },
}

impl Content {
    pub fn text(text: impl Into<String>) -> Self {
        Content::Text { text: text.into() }
    }

    pub fn as_node(&self) -> Option<&Node> {
        match self {
            Content::Node(node) => Some(node),
            Content::Text { .. } => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Content::Text { text } => Some(text),
            Content::Node(_) => None,
        }
    }
}

impl From<Node> for Content {
    fn from(node: Node) -> Self {
        Content::Node(node)
    }
}

/// A typed element of the document tree
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    #[serde(rename = "type")]
    pub node_type: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attrs: BTreeMap<String, AttrValue>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub content: Vec<Content>,
}

impl Node {
    /// Create an empty node of the given type
    pub fn new(node_type: impl Into<String>) -> Self {
        Self {
            node_type: node_type.into(),
            attrs: BTreeMap::new(),
            content: Vec::new(),
        }
    }

    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<AttrValue>) -> Self {
        self.attrs.insert(name.into(), value.into());
        self
    }

    /// Append a text leaf
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.content.push(Content::text(text));
        self
    }

    pub fn with_children(mut self, children: impl IntoIterator<Item = Content>) -> Self {
        self.content.extend(children);
        self
    }

    pub fn attr(&self, name: &str) -> Option<&AttrValue> {
        self.attrs.get(name)
    }

    /// String attribute, `None` when missing or not a string
    pub fn attr_str(&self, name: &str) -> Option<&str> {
        self.attrs.get(name).and_then(AttrValue::as_str)
    }

    pub fn set_attr(&mut self, name: impl Into<String>, value: impl Into<AttrValue>) {
        self.attrs.insert(name.into(), value.into());
    }

    /// Concatenated text of every leaf below this node, depth-first
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        collect_text(&self.content, &mut out);
        out
    }

    /// Replace the content with a single text leaf (or nothing for an empty string)
    pub fn set_text(&mut self, text: impl Into<String>) {
        let text = text.into();
        self.content.clear();
        if !text.is_empty() {
            self.content.push(Content::text(text));
        }
    }

    /// Direct child nodes, skipping text leaves
    pub fn children(&self) -> impl Iterator<Item = &Node> {
        self.content.iter().filter_map(Content::as_node)
    }
}

fn collect_text(content: &[Content], out: &mut String) {
    for item in content {
        match item {
            Content::Text { text } => out.push_str(text),
            Content::Node(node) => collect_text(&node.content, out),
        }
    }
}

/// The root of a parsed document
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub content: Vec<Node>,
}

impl Document {
    /// Create a new empty document
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_nodes(content: Vec<Node>) -> Self {
        Self { content }
    }

    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }

    /// Block nodes of the given type, in document order
    pub fn blocks_of<'a>(&'a self, node_type: &'a str) -> impl Iterator<Item = &'a Node> + 'a {
        self.content.iter().filter(move |n| n.node_type == node_type)
    }
}

/// Whether a walk descends into a node's content
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Walk {
    Continue,
    Skip,
}

/// Read-only tree visitor
pub trait Visitor {
    fn enter(&mut self, _node: &Node, _depth: usize) -> Walk {
        Walk::Continue
    }

    fn text(&mut self, _parent: &Node, _text: &str) {}
}

/// Mutating tree visitor
pub trait VisitorMut {
    fn enter(&mut self, _node: &mut Node, _depth: usize) -> Walk {
        Walk::Continue
    }

    fn text(&mut self, _parent_type: &str, _text: &mut String) {}
}

/// Walk every node and text leaf in document order
pub fn visit<V: Visitor + ?Sized>(doc: &Document, visitor: &mut V) {
    for node in &doc.content {
        visit_node(node, 0, visitor);
    }
}

fn visit_node<V: Visitor + ?Sized>(node: &Node, depth: usize, visitor: &mut V) {
    if visitor.enter(node, depth) == Walk::Skip {
        return;
    }
    for item in &node.content {
        match item {
            Content::Node(child) => visit_node(child, depth + 1, visitor),
            Content::Text { text } => visitor.text(node, text),
        }
    }
}

/// Mutable counterpart of [`visit`]
pub fn visit_mut<V: VisitorMut + ?Sized>(doc: &mut Document, visitor: &mut V) {
    for node in &mut doc.content {
        visit_node_mut(node, 0, visitor);
    }
}

fn visit_node_mut<V: VisitorMut + ?Sized>(node: &mut Node, depth: usize, visitor: &mut V) {
    if visitor.enter(node, depth) == Walk::Skip {
        return;
    }
    let Node {
        node_type, content, ..
    } = node;
    for item in content.iter_mut() {
        match item {
            Content::Node(child) => visit_node_mut(child, depth + 1, visitor),
            Content::Text { text } => visitor.text(node_type.as_str(), text),
        }
    }
}
