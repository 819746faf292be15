// SPDX-License-Identifier: AGPL-3.0-or-later
//! Node-kind extensions
//!
//! `base` is the default block model (paragraphs, headings and the blocks kept
//! as raw source, including any block kind nothing else claims). The other
//! modules are the kinds with their own markdown rules: fenced code, mermaid
//! diagrams, raw tables and raw HTML.

pub mod base;
pub mod code_block;
pub mod mermaid;
pub mod raw_html;
pub mod table;

pub use base::{
    BlockquoteExtension, HeadingExtension, HorizontalRuleExtension, ListExtension,
    ParagraphExtension, RawBlockExtension, BLOCKQUOTE, HEADING, HORIZONTAL_RULE, LIST,
    PARAGRAPH, RAW_BLOCK,
};
pub use code_block::{CodeBlockExtension, CODE_BLOCK};
pub use mermaid::{MermaidExtension, MERMAID_BLOCK};
pub use raw_html::{RawHtmlTextExtension, TEXT};
pub use table::{MarkdownTableExtension, MARKDOWN_TABLE};

/// Backtick fence long enough not to be closed by anything inside `content`
pub(crate) fn fence_for(content: &str) -> String {
    let longest = content
        .lines()
        .map(|line| line.trim_start().chars().take_while(|&c| c == '`').count())
        .max()
        .unwrap_or(0);
    "`".repeat(longest.max(2) + 1)
}

/// `fence` + info + newline + content + forced newline + `fence`
pub(crate) fn fenced_block(info: &str, content: &str) -> String {
    let fence = fence_for(content);
    let suffix = if content.ends_with('\n') { "" } else { "\n" };
    format!("{fence}{info}\n{content}{suffix}{fence}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_fence_for_plain_content() {
        assert_eq!(fence_for("let x = 1;"), "```");
    }

    #[test]
    fn test_fence_for_nested_fence() {
        assert_eq!(fence_for("```js\nx\n```"), "````");
    }

    #[test]
    fn test_fenced_block_forces_single_newline() {
        assert_eq!(fenced_block("rust", "fn a() {}"), "```rust\nfn a() {}\n```");
        assert_eq!(fenced_block("rust", "fn a() {}\n"), "```rust\nfn a() {}\n```");
        assert_eq!(fenced_block("rust", ""), "```rust\n\n```");
    }
}
