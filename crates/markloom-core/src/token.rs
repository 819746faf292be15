// SPDX-License-Identifier: AGPL-3.0-or-later
//! Markdown token stream built on top of comrak
//!
//! comrak does the actual CommonMark/GFM tokenizing. This module flattens the
//! top-level blocks of its AST into an ordered list of [`MarkdownToken`]s that
//! carry the verbatim source of each block, which is what the extension
//! registry dispatches on.

use comrak::nodes::{AstNode, NodeValue};
use comrak::{parse_document, Arena, Options};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;

use crate::traits::{ConversionError, ParseConfig, Result};

/// Info-string tag that marks a fenced block as a diagram
pub const DIAGRAM_LANGUAGE: &str = "mermaid";

/// Kind of a top-level markdown block
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Code,
    Table,
    Html,
    Heading,
    Paragraph,
    Blockquote,
    List,
    Hr,
    Other,
}

impl TokenKind {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Code => "code",
            Self::Table => "table",
            Self::Html => "html",
            Self::Heading => "heading",
            Self::Paragraph => "paragraph",
            Self::Blockquote => "blockquote",
            Self::List => "list",
            Self::Hr => "hr",
            Self::Other => "other",
        }
    }
}

impl std::fmt::Display for TokenKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One block of the upstream token stream
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkdownToken {
    pub kind: TokenKind,
    /// Verbatim source lines of the block
    pub raw: String,
    /// First word of a code block's info string
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lang: Option<String>,
    /// Literal code (one trailing newline removed) or heading inline source
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub level: Option<u8>,
    /// `false` for indented code blocks
    #[serde(default)]
    pub fenced: bool,
}

impl MarkdownToken {
    pub fn new(kind: TokenKind, raw: impl Into<String>) -> Self {
        Self {
            kind,
            raw: raw.into(),
            lang: None,
            text: None,
            level: None,
            fenced: false,
        }
    }

    /// Fenced code token, as the tokenizer would emit it for "```lang\ntext\n```"
    pub fn fenced_code(lang: Option<&str>, text: &str) -> Self {
        let info = lang.unwrap_or_default();
        Self {
            kind: TokenKind::Code,
            raw: format!("```{info}\n{text}\n```"),
            lang: lang.map(str::to_string),
            text: Some(text.to_string()),
            level: None,
            fenced: true,
        }
    }

    pub fn is_diagram(&self) -> bool {
        is_diagram_language(self.lang.as_deref())
    }
}

/// Whether a fence language tag selects the diagram block
///
/// The tag must be exactly `mermaid`; `Mermaid` stays an ordinary code block.
pub fn is_diagram_language(lang: Option<&str>) -> bool {
    lang == Some(DIAGRAM_LANGUAGE)
}

/// GFM options shared by the tokenizer and the HTML renderer
///
/// Footnotes stay off here: comrak moves referenced definitions to the end of
/// the document and drops unreferenced ones. The renderer turns them on.
pub fn comrak_options() -> Options<'static> {
    let mut options = Options::default();
    options.extension.strikethrough = true;
    options.extension.table = true;
    options.extension.autolink = true;
    options.extension.tasklist = true;
    options
}

/// `\r\n` and lone `\r` become `\n`
fn normalize_line_endings(input: &str) -> Cow<'_, str> {
    if input.contains('\r') {
        Cow::Owned(input.replace("\r\n", "\n").replace('\r', "\n"))
    } else {
        Cow::Borrowed(input)
    }
}

/// Tokenize markdown source into top-level block tokens
pub fn tokenize(input: &str, config: &ParseConfig) -> Result<Vec<MarkdownToken>> {
    if let Some(limit) = config.max_input_len {
        if input.len() > limit {
            return Err(ConversionError::Tokenize(format!(
                "input is {} bytes, limit is {limit}",
                input.len()
            )));
        }
    }

    let source = normalize_line_endings(input);
    let arena = Arena::new();
    let root = parse_document(&arena, &source, &comrak_options());
    let lines: Vec<&str> = source.lines().collect();

    // Source comrak keeps no node for (link reference definitions) comes
    // back as `Other` tokens between the blocks around it.
    let mut tokens = Vec::new();
    let mut next_line = 1;
    for child in root.children() {
        let (start, end) = {
            let pos = child.data.borrow().sourcepos;
            (pos.start.line, pos.end.line)
        };
        tokens.extend(gap_token(&lines, next_line, start));
        tokens.push(block_token(child, &lines));
        next_line = next_line.max(end + 1);
    }
    tokens.extend(gap_token(&lines, next_line, lines.len() + 1));

    tracing::trace!(count = tokens.len(), "tokenized markdown");
    Ok(tokens)
}

/// Non-blank lines in `from..to` (1-based, end exclusive) as one `Other` token
fn gap_token(lines: &[&str], from: usize, to: usize) -> Option<MarkdownToken> {
    let to = to.min(lines.len() + 1);
    if from == 0 || from >= to {
        return None;
    }
    let gap = &lines[from - 1..to - 1];
    let first = gap.iter().position(|l| !l.trim().is_empty())?;
    let last = gap.iter().rposition(|l| !l.trim().is_empty())?;
    Some(MarkdownToken::new(TokenKind::Other, gap[first..=last].join("\n")))
}

fn block_token<'a>(node: &'a AstNode<'a>, lines: &[&str]) -> MarkdownToken {
    let data = node.data.borrow();
    let raw = source_lines(lines, data.sourcepos.start.line, data.sourcepos.end.line);

    match &data.value {
        NodeValue::CodeBlock(code) => {
            let lang = code
                .info
                .split_whitespace()
                .next()
                .map(str::to_string);
            let text = code
                .literal
                .strip_suffix('\n')
                .unwrap_or(&code.literal)
                .to_string();
            MarkdownToken {
                lang,
                text: Some(text),
                fenced: code.fenced,
                ..MarkdownToken::new(TokenKind::Code, raw)
            }
        }

        NodeValue::Table(_) => MarkdownToken::new(TokenKind::Table, raw),

        NodeValue::HtmlBlock(html) => MarkdownToken::new(TokenKind::Html, html.literal.clone()),

        NodeValue::Heading(heading) => MarkdownToken {
            text: Some(heading_text(&raw, heading.setext)),
            level: Some(heading.level),
            ..MarkdownToken::new(TokenKind::Heading, raw)
        },

        NodeValue::Paragraph => MarkdownToken {
            text: Some(raw.trim().to_string()),
            ..MarkdownToken::new(TokenKind::Paragraph, raw)
        },

        NodeValue::BlockQuote => MarkdownToken::new(TokenKind::Blockquote, raw),

        NodeValue::List(_) => MarkdownToken::new(TokenKind::List, raw),

        NodeValue::ThematicBreak => MarkdownToken::new(TokenKind::Hr, raw),

        _ => MarkdownToken::new(TokenKind::Other, raw),
    }
}

/// Lines `start..=end` (1-based, inclusive) joined with `\n`
fn source_lines(lines: &[&str], start: usize, end: usize) -> String {
    if start == 0 || start > lines.len() {
        return String::new();
    }
    let end = end.clamp(start, lines.len());
    lines[start - 1..end].join("\n")
}

/// Inline source of a heading without its ATX markers or setext underline
fn heading_text(raw: &str, setext: bool) -> String {
    if setext {
        let mut body: Vec<&str> = raw.lines().collect();
        body.pop();
        return body
            .iter()
            .map(|l| l.trim())
            .collect::<Vec<_>>()
            .join(" ");
    }

    let line = raw.trim().trim_start_matches('#');
    let line = line.trim();
    // Optional closing sequence: a run of '#' preceded by a space
    let without_closing = line.trim_end_matches('#');
    if without_closing.is_empty() {
        String::new()
    } else if without_closing.ends_with(' ') || without_closing.len() == line.len() {
        without_closing.trim_end().to_string()
    } else {
        line.to_string()
    }
}
