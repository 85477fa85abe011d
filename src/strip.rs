//! Standalone single-file variant: type/annotation stripping.
//!
//! Takes one explicit file path and applies a fixed ordered list of
//! single-line substitutions. No roster, no context placeholders, no
//! structural fallback — a strict subset of the main pipeline, kept around
//! as a minimal regression fixture for the rule machinery.

use crate::context::RewriteContext;
use crate::pipeline::{detect_change, Change};
use crate::rewrite::RegexRewriter;
use crate::rules::RuleSet;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StripError {
    #[error("file not found: {0}")]
    NotFound(PathBuf),

    #[error("file I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Result of stripping one file.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use = "StripOutcome should be checked for stripped/already-clean"]
pub enum StripOutcome {
    /// Annotations were removed and the file written back.
    Stripped { file: PathBuf },
    /// Nothing to strip; the file was left untouched.
    AlreadyClean { file: PathBuf },
}

/// Apply the annotation-stripping rules to text. Pure; idempotent by
/// construction of the rule set.
pub fn strip_annotations(input: &str) -> String {
    let rules = RuleSet::annotation_stripper();
    RegexRewriter::new(&rules)
        .apply(input, &RewriteContext::empty())
        .text
}

/// Strip one file in place. Writes back only on a genuine change.
pub fn strip_file(path: &Path) -> Result<StripOutcome, StripError> {
    if !path.exists() {
        return Err(StripError::NotFound(path.to_path_buf()));
    }

    let input = fs::read_to_string(path).map_err(|source| StripError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let output = strip_annotations(&input);
    match detect_change(&input, &output) {
        Change::Unchanged => Ok(StripOutcome::AlreadyClean {
            file: path.to_path_buf(),
        }),
        Change::Changed => {
            write_stripped(path, output.as_bytes()).map_err(|source| StripError::Io {
                path: path.to_path_buf(),
                source,
            })?;
            Ok(StripOutcome::Stripped {
                file: path.to_path_buf(),
            })
        }
    }
}

fn write_stripped(path: &Path, content: &[u8]) -> std::io::Result<()> {
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
    Ok(())
}
