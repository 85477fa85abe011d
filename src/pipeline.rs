//! Per-target rewrite pipeline and batch driver.
//!
//! The orchestrator drives each target through the same sequence: read,
//! regex pass, structural fallback where the regex pass left a rule
//! unresolved, change detection, conditional write-back. Every per-target
//! failure becomes an outcome record; the batch never aborts early because
//! one target misbehaved.

use crate::config::Roster;
use crate::context::RewriteContext;
use crate::rewrite::RegexRewriter;
use crate::rules::{RuleSet, OBSOLETE_MARKER};
use crate::scanner::{find_block, replace_block, ScanResult};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Idempotency gate verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Change {
    Changed,
    Unchanged,
}

/// Byte-for-byte comparison of transformed text against the original.
/// Only a genuine difference authorizes a write-back.
pub fn detect_change(original: &str, transformed: &str) -> Change {
    if original == transformed {
        Change::Unchanged
    } else {
        Change::Changed
    }
}

/// Result of transforming one file's text, independent of any I/O.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transformed {
    /// The obsolete marker is absent; output would be byte-identical.
    Clean,
    /// The marker was eliminated; carries the corrected text.
    Fixed(String),
    /// The marker is present but neither the regex pass nor the fallback
    /// scanner completed a replacement. Nothing is written; a rule or
    /// scanner defect is worth investigating.
    NoMatch,
}

/// Pure two-stage transformation: regex pass, then the block scanner for
/// any rule the pass left unresolved while the marker is still present.
///
/// A file that changed but still carries the marker is reported as
/// [`Transformed::NoMatch`] rather than written: a partial repair would
/// break the guarantee that the marker is gone after a `Fixed` outcome.
pub fn transform_text(rules: &RuleSet, input: &str, ctx: &RewriteContext) -> Transformed {
    if !input.contains(OBSOLETE_MARKER) {
        return Transformed::Clean;
    }

    let pass = RegexRewriter::new(rules).apply(input, ctx);
    let mut text = pass.text;

    if text.contains(OBSOLETE_MARKER) {
        for rule_id in &pass.unresolved {
            let rule = rules
                .iter()
                .find(|r| r.id == *rule_id)
                .and_then(|r| r.block_signature().map(|sig| (r, sig)));
            let Some((rule, signature)) = rule else {
                continue;
            };
            if let ScanResult::Found(span) = find_block(&text, signature) {
                text = replace_block(&text, span, &rule.rendered_template(ctx));
            }
        }
    }

    if text.contains(OBSOLETE_MARKER) {
        return Transformed::NoMatch;
    }
    match detect_change(input, &text) {
        Change::Changed => Transformed::Fixed(text),
        Change::Unchanged => Transformed::NoMatch,
    }
}

/// Outcome of processing one target. Report value only; never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use = "Outcome should be checked for success/failure"]
pub enum Outcome {
    /// The page was rewritten and written back.
    Fixed { file: PathBuf },
    /// The obsolete marker is absent; nothing to do.
    AlreadyClean { file: PathBuf },
    /// The target path does not resolve to an existing file.
    NotFound { file: PathBuf },
    /// Marker present but no rule or scan completed a replacement.
    NoMatch { file: PathBuf },
    /// Read or write failed for this target only.
    Failed { file: PathBuf, reason: String },
}

/// Drives the pipeline across a batch of targets, one at a time.
pub struct Orchestrator<'a> {
    roster: &'a Roster,
    pages_root: PathBuf,
    rules: RuleSet,
}

impl<'a> Orchestrator<'a> {
    /// `root` is the project checkout the roster's `pages_root` is relative
    /// to. The roster is the explicit lookup-table collaborator; the rule
    /// table is compiled in.
    pub fn new(roster: &'a Roster, root: &Path) -> Self {
        Self {
            roster,
            pages_root: root.join(&roster.meta.pages_root),
            rules: RuleSet::builtin(),
        }
    }

    /// Resolve the page file for a target id.
    pub fn target_path(&self, id: &str) -> PathBuf {
        self.pages_root.join(id).join("page.tsx")
    }

    /// Repair every target in `ids`, writing corrected pages back.
    pub fn fix(&self, ids: &[String]) -> Vec<(String, Outcome)> {
        ids.iter()
            .map(|id| (id.clone(), self.run_target(id, true)))
            .collect()
    }

    /// Evaluate what [`fix`](Self::fix) would do without touching any file.
    pub fn check(&self, ids: &[String]) -> Vec<(String, Outcome)> {
        ids.iter()
            .map(|id| (id.clone(), self.run_target(id, false)))
            .collect()
    }

    fn run_target(&self, id: &str, write: bool) -> Outcome {
        let file = self.target_path(id);
        if !file.exists() {
            return Outcome::NotFound { file };
        }

        let input = match fs::read_to_string(&file) {
            Ok(text) => text,
            Err(e) => {
                return Outcome::Failed {
                    file,
                    reason: e.to_string(),
                }
            }
        };

        let ctx = RewriteContext::for_target(id, self.roster.target(id));
        match transform_text(&self.rules, &input, &ctx) {
            Transformed::Clean => Outcome::AlreadyClean { file },
            Transformed::NoMatch => Outcome::NoMatch { file },
            Transformed::Fixed(text) => {
                if write {
                    if let Err(e) = write_back(&file, text.as_bytes()) {
                        return Outcome::Failed {
                            file,
                            reason: e.to_string(),
                        };
                    }
                }
                Outcome::Fixed { file }
            }
        }
    }
}

/// Atomic write-back: tempfile in the same directory, fsync, rename, then
/// an mtime touch so downstream incremental builds notice the change.
fn write_back(path: &Path, content: &[u8]) -> std::io::Result<()> {
    let parent = path.parent().ok_or_else(|| {
        std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            "path has no parent directory",
        )
    })?;

    let mut temp = tempfile::NamedTempFile::new_in(parent)?;
    temp.write_all(content)?;
    temp.as_file().sync_all()?;
    temp.persist(path).map_err(|e| e.error)?;

    filetime::set_file_mtime(path, filetime::FileTime::now())?;
    Ok(())
}

/// Aggregate outcome counts for the end-of-run summary.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct OutcomeTally {
    pub fixed: usize,
    pub already_clean: usize,
    pub not_found: usize,
    pub no_match: usize,
    pub failed: usize,
}

impl OutcomeTally {
    pub fn count(results: &[(String, Outcome)]) -> Self {
        let mut tally = Self::default();
        for (_, outcome) in results {
            match outcome {
                Outcome::Fixed { .. } => tally.fixed += 1,
                Outcome::AlreadyClean { .. } => tally.already_clean += 1,
                Outcome::NotFound { .. } => tally.not_found += 1,
                Outcome::NoMatch { .. } => tally.no_match += 1,
                Outcome::Failed { .. } => tally.failed += 1,
            }
        }
        tally
    }

    /// Whether the run as a whole should exit non-zero.
    pub fn has_defects(&self) -> bool {
        self.no_match > 0 || self.failed > 0
    }
}
