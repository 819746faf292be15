// SPDX-License-Identifier: AGPL-3.0-or-later
//! Markloom Render - highlighting, diagrams and HTML output
//!
//! Engines are expensive to build, so both are constructed lazily:
//! - [`Highlighter`] never waits; before its engine is ready it emits escaped code
//! - [`DiagramService`] renders `<div class="mermaid">` placeholders in batches
//! - [`MarkdownRenderer`] ties both to comrak's HTML output

pub mod config;
pub mod diagram;
pub mod error;
pub mod escape;
pub mod highlight;
pub mod html;
pub mod lazy;

pub use config::{ConfigError, DiagramSettings, HighlightSettings, MarkdownSettings, Settings};
pub use diagram::{
    BatchSummary, DiagramArtifact, DiagramEngine, DiagramError, DiagramService, HtmlPlaceholders,
    KrokiEngine, PlaceholderSink,
};
pub use error::{RenderError, Result};
pub use highlight::{
    normalize_language, ColorScheme, ColorSchemeSource, HighlightEngine, Highlighter,
    SyntectEngine, ThemeMode, ThemePair, LANGUAGE_ALIASES, SUPPORTED_LANGUAGES,
};
pub use html::MarkdownRenderer;
pub use lazy::LazyEngine;
