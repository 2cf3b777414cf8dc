//! Materializes the manifest into the destination directory.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{error, info};

use crate::fetch::{Fetch, FetchError, fetch_first};
use crate::manifest::{ManifestEntry, Source};

/// Error that aborts an install.
#[derive(Debug)]
pub enum InstallError {
    /// A required entry could not be fetched.
    Fetch {
        local_path: &'static str,
        source: FetchError,
    },
    /// The local filesystem rejected a write.
    Write {
        path: PathBuf,
        source: io::Error,
    },
}

impl std::fmt::Display for InstallError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InstallError::Fetch { local_path, .. } => {
                write!(f, "could not install {}", local_path)
            }
            InstallError::Write { path, .. } => {
                write!(f, "could not write {}", path.display())
            }
        }
    }
}

impl std::error::Error for InstallError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            InstallError::Fetch { source, .. } => Some(source),
            InstallError::Write { source, .. } => Some(source),
        }
    }
}

/// Result of processing a single manifest entry.
#[derive(Debug)]
pub enum EntryOutcome {
    Installed {
        local_path: &'static str,
        remote_name: String,
        bytes: usize,
        executable: bool,
    },
    Skipped {
        local_path: &'static str,
        reason: String,
    },
    Fatal(InstallError),
}

/// Non-fatal outcome recorded in the final report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ReportEntry {
    Installed {
        path: String,
        remote_name: String,
        bytes: usize,
        executable: bool,
    },
    Skipped {
        path: String,
        reason: String,
    },
}

/// Summary of a completed install.
#[derive(Debug, Clone, Serialize)]
pub struct InstallReport {
    pub destination: PathBuf,
    pub entries: Vec<ReportEntry>,
}

impl InstallReport {
    pub fn installed_count(&self) -> usize {
        self.entries
            .iter()
            .filter(|e| matches!(e, ReportEntry::Installed { .. }))
            .count()
    }

    pub fn skipped_count(&self) -> usize {
        self.entries.len() - self.installed_count()
    }
}

/// Installs manifest entries from a fetcher into a destination root.
pub struct Installer<'a, F: Fetch + ?Sized> {
    fetcher: &'a F,
    root: PathBuf,
}

impl<'a, F: Fetch + ?Sized> Installer<'a, F> {
    pub fn new(fetcher: &'a F, root: impl Into<PathBuf>) -> Self {
        Self {
            fetcher,
            root: root.into(),
        }
    }

    /// Process every entry in order, stopping at the first fatal outcome.
    /// Files written before a fatal outcome are left in place.
    pub fn run(&self, manifest: &[ManifestEntry]) -> Result<InstallReport, InstallError> {
        info!(
            destination = %self.root.display(),
            entries = manifest.len(),
            "install_start"
        );

        let mut entries = Vec::with_capacity(manifest.len());

        for entry in manifest {
            match self.process(entry) {
                EntryOutcome::Installed {
                    local_path,
                    remote_name,
                    bytes,
                    executable,
                } => {
                    info!(path = local_path, remote = %remote_name, bytes, "entry_installed");
                    entries.push(ReportEntry::Installed {
                        path: local_path.to_string(),
                        remote_name,
                        bytes,
                        executable,
                    });
                }
                EntryOutcome::Skipped { local_path, reason } => {
                    info!(path = local_path, reason = %reason, "entry_skipped");
                    entries.push(ReportEntry::Skipped {
                        path: local_path.to_string(),
                        reason,
                    });
                }
                EntryOutcome::Fatal(e) => {
                    let cause = std::error::Error::source(&e).map(|s| s.to_string());
                    error!(error = %e, cause = ?cause, "entry_failed");
                    return Err(e);
                }
            }
        }

        let report = InstallReport {
            destination: self.root.clone(),
            entries,
        };
        info!(
            installed = report.installed_count(),
            skipped = report.skipped_count(),
            "install_complete"
        );
        Ok(report)
    }

    /// Fetch and place a single entry.
    pub fn process(&self, entry: &ManifestEntry) -> EntryOutcome {
        let fetched = match entry.source {
            Source::Single(name) => self
                .fetcher
                .fetch(name)
                .map(|bytes| (name.to_string(), bytes)),
            Source::Fallback(names) => fetch_first(self.fetcher, names),
        };

        let (remote_name, bytes) = match fetched {
            Ok(fetched) => fetched,
            Err(e) if entry.tolerates_failure() => {
                return EntryOutcome::Skipped {
                    local_path: entry.local_path,
                    reason: e.to_string(),
                };
            }
            Err(e) => {
                return EntryOutcome::Fatal(InstallError::Fetch {
                    local_path: entry.local_path,
                    source: e,
                });
            }
        };

        let target = entry.target(&self.root);
        if let Err(e) = write_file(&target, &bytes, entry.executable) {
            return EntryOutcome::Fatal(InstallError::Write {
                path: target,
                source: e,
            });
        }

        EntryOutcome::Installed {
            local_path: entry.local_path,
            remote_name,
            bytes: bytes.len(),
            executable: entry.executable,
        }
    }
}

/// Write bytes to `path`, creating parent directories, then set or clear
/// the executable bits.
fn write_file(path: &Path, bytes: &[u8], executable: bool) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, bytes)?;
    set_executable(path, executable)
}

#[cfg(unix)]
fn set_executable(path: &Path, executable: bool) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;

    let mut permissions = fs::metadata(path)?.permissions();
    let mode = permissions.mode();
    let new_mode = if executable {
        mode | 0o111
    } else {
        mode & !0o111
    };
    if new_mode != mode {
        permissions.set_mode(new_mode);
        fs::set_permissions(path, permissions)?;
    }
    Ok(())
}

#[cfg(not(unix))]
fn set_executable(_path: &Path, _executable: bool) -> io::Result<()> {
    Ok(())
}
