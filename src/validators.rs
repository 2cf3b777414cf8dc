//! Checks an existing install against the manifest.

use std::path::Path;

use serde::Serialize;

use crate::manifest::ManifestEntry;

/// Problem found with an installed file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Problem {
    Missing,
    NotAFile,
    NotExecutable,
    UnexpectedlyExecutable,
    Unreadable,
}

impl Problem {
    pub fn label(&self) -> &'static str {
        match self {
            Problem::Missing => "missing",
            Problem::NotAFile => "not a file",
            Problem::NotExecutable => "not executable",
            Problem::UnexpectedlyExecutable => "unexpectedly executable",
            Problem::Unreadable => "cannot access file",
        }
    }
}

/// Verification result for one manifest entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum EntryCheck {
    Ok { path: String },
    /// Optional entry that was never installed.
    Absent { path: String },
    Problem { path: String, problem: Problem },
}

impl EntryCheck {
    pub fn is_problem(&self) -> bool {
        matches!(self, EntryCheck::Problem { .. })
    }
}

/// Check if metadata matches what the manifest expects (pure function).
///
/// `mode` is the Unix permission mode and is ignored on other platforms.
#[allow(unused_variables)]
fn check_metadata(is_file: bool, mode: u32, executable: bool) -> Option<Problem> {
    if !is_file {
        return Some(Problem::NotAFile);
    }

    #[cfg(unix)]
    {
        let has_exec = mode & 0o111 != 0;
        if executable && !has_exec {
            return Some(Problem::NotExecutable);
        }
        if !executable && has_exec {
            return Some(Problem::UnexpectedlyExecutable);
        }
    }

    None
}

/// Check a single entry under `root`.
pub fn check_entry(root: &Path, entry: &ManifestEntry) -> EntryCheck {
    let path = entry.local_path.to_string();
    let target = entry.target(root);

    let metadata = match std::fs::metadata(&target) {
        Ok(m) => m,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return if entry.tolerates_failure() {
                EntryCheck::Absent { path }
            } else {
                EntryCheck::Problem {
                    path,
                    problem: Problem::Missing,
                }
            };
        }
        Err(_) => {
            return EntryCheck::Problem {
                path,
                problem: Problem::Unreadable,
            };
        }
    };

    #[cfg(unix)]
    let mode = {
        use std::os::unix::fs::PermissionsExt;
        metadata.permissions().mode()
    };
    #[cfg(not(unix))]
    let mode = 0;

    match check_metadata(metadata.is_file(), mode, entry.executable) {
        Some(problem) => EntryCheck::Problem { path, problem },
        None => EntryCheck::Ok { path },
    }
}

/// Check every entry of the manifest under `root`.
pub fn verify_install(root: &Path, manifest: &[ManifestEntry]) -> Vec<EntryCheck> {
    manifest.iter().map(|e| check_entry(root, e)).collect()
}
