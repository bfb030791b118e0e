// SPDX-License-Identifier: PMPL-1.0-or-later
//! Scan orchestration across files.
//!
//! Per file: classify, read, consult the cache, scan, apply rule overrides,
//! attach fixes, optionally write fixes back, and store the result. Every
//! file runs in its own task, concurrently up to
//! `performance.max_concurrent_files` (one at a time when not parallel); a
//! file that fails or panics is logged and left out of the results.

use crate::analyzers::{scan_source, FileKind};
use crate::cache::FileCache;
use crate::config::Config;
use crate::error::{A11yError, Result};
use crate::fixes::attach_fixes;
use crate::fixes::markup::apply_markup_fixes;
use crate::fixes::script::{apply_structured, apply_textual, ScriptFixOutcome};
use crate::model::{Issue, ScanResult};
use globset::{Glob, GlobSet, GlobSetBuilder};
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::{Mutex, Semaphore};
use tokio::task::JoinSet;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// Directories never descended into
const SKIP_DIRS: &[&str] = &[
    "node_modules", ".git", "target", "dist", "build",
    "_build", "vendor", ".next", ".nuxt", "coverage",
];

/// Shared handle to a session cache
pub type SharedCache = Arc<Mutex<FileCache>>;

/// Output of the synchronous per-file pipeline
#[derive(Debug, Clone)]
pub struct ProcessedSource {
    /// Issues found in the original content, fixes attached
    pub issues: Vec<Issue>,
    /// Content after fixes (identical to the input when nothing applied)
    pub content: String,
    pub applied: usize,
}

/// Scan, filter, attach fixes and, when `apply` is set, rewrite `content`
pub fn process_source(kind: FileKind, content: &str, config: &Config, apply: bool) -> ProcessedSource {
    let issues = config.apply_rules(scan_source(kind, content));
    let issues = attach_fixes(issues, config);

    let (content, applied) = if apply {
        apply_fixes(kind, content, &issues)
    } else {
        (content.to_string(), 0)
    };

    ProcessedSource {
        issues,
        content,
        applied,
    }
}

/// Apply attached fixes with the strategy for `kind`
pub fn apply_fixes(kind: FileKind, content: &str, issues: &[Issue]) -> (String, usize) {
    match kind {
        FileKind::Markup => {
            let outcome = apply_markup_fixes(content, issues);
            (outcome.content, outcome.applied)
        }
        FileKind::Script(dialect) => match apply_structured(dialect, content, issues) {
            ScriptFixOutcome::Applied { content, applied } => (content, applied),
            ScriptFixOutcome::FallbackRequired { reason } => {
                warn!(%reason, "Syntax-tree fix failed, falling back to line edits");
                apply_textual(content, issues)
            }
        },
        FileKind::Unscannable => (content.to_string(), 0),
    }
}

/// Drives scanning over many files
#[derive(Clone)]
pub struct Scanner {
    config: Arc<Config>,
    cache: Option<SharedCache>,
}

impl Scanner {
    /// Scanner without a cache
    pub fn new(config: Config) -> Self {
        Self {
            config: Arc::new(config),
            cache: None,
        }
    }

    /// Scanner that consults and fills `cache` while not fixing
    pub fn with_cache(config: Config, cache: FileCache) -> Self {
        Self {
            config: Arc::new(config),
            cache: Some(Arc::new(Mutex::new(cache))),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    fn active_cache(&self) -> Option<&SharedCache> {
        if self.config.performance.cache && !self.config.fix {
            self.cache.as_ref()
        } else {
            None
        }
    }

    /// Scan every file; failures are logged and omitted
    pub async fn scan_files(&self, files: Vec<PathBuf>) -> Vec<ScanResult> {
        let total = files.len();
        let limit = if self.config.performance.parallel {
            self.config.performance.max_concurrent_files.max(1)
        } else {
            1
        };

        debug!(files = total, limit, "Scanning files");
        let results = run_bounded(files, limit, |path| {
            let scanner = self.clone();
            async move { scanner.scan_file(&path).await }
        })
        .await;

        let issues: usize = results.iter().map(|r| r.total).sum();
        info!(
            files = total,
            scanned = results.len(),
            issues,
            "Scan complete"
        );
        results
    }

    /// Scan one file, writing fixes back when fixing is enabled
    pub async fn scan_file(&self, path: &Path) -> Result<ScanResult> {
        let kind = FileKind::classify(path);
        if !kind.is_scannable() {
            debug!(path = %path.display(), "Not a scannable file");
            return Ok(ScanResult::empty(path.to_path_buf()));
        }

        let content = tokio::fs::read_to_string(path).await?;
        let key = tokio::fs::canonicalize(path)
            .await
            .unwrap_or_else(|_| path.to_path_buf());

        if let Some(cache) = self.active_cache() {
            if let Some(hit) = cache.lock().await.get(&key, content.as_bytes()) {
                return Ok(hit);
            }
        }

        let processed = process_source(kind, &content, &self.config, self.config.fix);
        let mut result = ScanResult::new(path.to_path_buf(), processed.issues);
        debug!(path = %path.display(), issues = result.total, "Scanned file");

        if self.config.fix {
            if processed.content != content {
                tokio::fs::write(path, &processed.content).await?;
                info!(path = %path.display(), fixed = processed.applied, "Applied fixes");
            }
            result = result.with_fixed(processed.applied);
        }

        if let Some(cache) = self.active_cache() {
            if let Err(e) = cache.lock().await.set(&key, content.as_bytes(), result.clone()) {
                warn!(path = %path.display(), error = %e, "Failed to persist scan cache");
            }
        }

        Ok(result)
    }
}

/// Run `work` for each file in its own task, at most `limit` at a time.
///
/// Results keep input order. A file whose task errors or panics is logged
/// and left out.
async fn run_bounded<F, Fut>(files: Vec<PathBuf>, limit: usize, work: F) -> Vec<ScanResult>
where
    F: Fn(PathBuf) -> Fut,
    Fut: Future<Output = Result<ScanResult>> + Send + 'static,
{
    let semaphore = Arc::new(Semaphore::new(limit.max(1)));
    let mut tasks = JoinSet::new();

    for (index, path) in files.into_iter().enumerate() {
        let semaphore = Arc::clone(&semaphore);
        let job = work(path.clone());
        tasks.spawn(async move {
            let outcome = match semaphore.acquire_owned().await {
                Ok(_permit) => job.await,
                Err(e) => Err(A11yError::Task(e.to_string())),
            };
            (index, path, outcome)
        });
    }

    let mut results = Vec::new();
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((index, _, Ok(result))) => results.push((index, result)),
            Ok((_, path, Err(e))) => warn!(path = %path.display(), error = %e, "Skipping file"),
            Err(e) => warn!(error = %e, "Scan task failed"),
        }
    }

    results.sort_by_key(|(index, _)| *index);
    results.into_iter().map(|(_, result)| result).collect()
}

fn build_ignore_set(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(Glob::new(pattern)?);
    }
    Ok(builder.build()?)
}

/// Expand files and directories into the scannable files beneath them
pub fn collect_files(roots: &[PathBuf], ignore: &[String]) -> Result<Vec<PathBuf>> {
    let ignore_set = build_ignore_set(ignore)?;
    let ignored = |root: &Path, path: &Path| {
        ignore_set.is_match(path)
            || path
                .strip_prefix(root)
                .map(|rel| ignore_set.is_match(rel))
                .unwrap_or(false)
    };

    let mut files = Vec::new();
    for root in roots {
        if root.is_file() {
            if FileKind::classify(root).is_scannable() && !ignored(root, root) {
                files.push(root.clone());
            }
            continue;
        }
        if !root.exists() {
            warn!(path = %root.display(), "Path does not exist");
            continue;
        }

        for entry in WalkDir::new(root)
            .follow_links(false)
            .into_iter()
            .filter_entry(|e| {
                let name = e.file_name().to_str().unwrap_or("");
                if e.depth() > 0 && e.file_type().is_dir() {
                    return !SKIP_DIRS.contains(&name) && !name.starts_with('.');
                }
                true
            })
        {
            let entry = match entry {
                Ok(e) => e,
                Err(e) => {
                    debug!(error = %e, "Skipping unreadable entry");
                    continue;
                }
            };

            if !entry.file_type().is_file() {
                continue;
            }

            let path = entry.path();
            if FileKind::classify(path).is_scannable() && !ignored(root, path) {
                files.push(path.to_path_buf());
            }
        }
    }

    files.sort();
    files.dedup();
    debug!(count = files.len(), "Collected files");
    Ok(files)
}
