// SPDX-License-Identifier: PMPL-1.0-or-later
//! a11ybot - accessibility scanner and auto-fixer
//!
//! Scans standalone HTML documents and JSX embedded in JavaScript/TypeScript
//! for a fixed catalogue of accessibility defects, and rewrites the subset
//! that can be fixed without human judgment.
//!
//! ## Pipeline
//!
//! - **Analyzers**: markup tree scanner (`scraper`) and JSX scanner (`tree-sitter`)
//! - **Fixes**: fix generation, then tree re-serialization for HTML or
//!   syntax-tree edits with a line-splice fallback for scripts
//! - **Cache**: SHA-256 keyed scan results persisted as JSON
//! - **Scanner**: bounded-concurrency orchestration over many files
//! - **Report**: text, JSON and SARIF output

pub mod analyzers;
pub mod cache;
pub mod config;
pub mod error;
pub mod fixes;
pub mod model;
pub mod report;
pub mod scanner;

pub use config::Config;
pub use error::{A11yError, Result};
pub use model::{Fix, FixKind, Issue, IssueType, Position, ScanResult, Severity};
pub use scanner::Scanner;
