// SPDX-License-Identifier: PMPL-1.0-or-later
//! Error types for a11ybot

use thiserror::Error;

pub type Result<T> = std::result::Result<T, A11yError>;

#[derive(Error, Debug)]
pub enum A11yError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Glob pattern error: {0}")]
    GlobPattern(#[from] globset::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Task failed: {0}")]
    Task(String),
}
