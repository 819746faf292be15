// SPDX-License-Identifier: AGPL-3.0-or-later
//! Error types for the rendering crate

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("engine initialization failed: {0}")]
    EngineInit(String),

    #[error("unknown highlight theme: {0}")]
    UnknownTheme(String),

    #[error("highlighting failed: {0}")]
    Highlight(String),

    /// Writing the HTML output failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("rendered HTML is not valid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

pub type Result<T> = std::result::Result<T, RenderError>;
