//! Terminal output for install, dry-run, and verify.

use std::path::Path;

use serde::Serialize;

use crate::installer::{InstallReport, ReportEntry};
use crate::manifest::ManifestEntry;
use crate::validators::EntryCheck;

/// Contract a path by replacing the home directory with `~` for display.
pub fn contract_path(path: &Path) -> String {
    if let Some(home) = dirs::home_dir()
        && let Ok(suffix) = path.strip_prefix(&home)
    {
        return format!("~/{}", suffix.display());
    }
    path.display().to_string()
}

/// Usage hint printed after a successful install.
pub fn usage_hint(destination: &Path) -> String {
    let dest = contract_path(destination);
    format!(
        "Usage:\n  {dest}/ralph plan     # draft an implementation plan\n  {dest}/ralph build    # run the build loop\n\nOr invoke the ralph-loop skill from your assistant session."
    )
}

pub fn format_report(report: &InstallReport) -> String {
    let mut lines = Vec::with_capacity(report.entries.len() + 4);

    for entry in &report.entries {
        match entry {
            ReportEntry::Installed {
                path, executable, ..
            } => {
                let suffix = if *executable { " (executable)" } else { "" };
                lines.push(format!("  installed  {}{}", path, suffix));
            }
            ReportEntry::Skipped { path, reason } => {
                lines.push(format!("  skipped    {} ({})", path, reason));
            }
        }
    }

    lines.push(String::new());
    lines.push(format!(
        "Installed ralph-loop to {}",
        contract_path(&report.destination)
    ));
    lines.push(String::new());
    lines.push(usage_hint(&report.destination));
    lines.join("\n")
}

/// Planned layout for `--dry-run`.
pub fn format_plan(destination: &Path, base_url: &str, manifest: &[ManifestEntry]) -> String {
    let mut lines = vec![
        format!("Would install to {}", contract_path(destination)),
        format!("from {}", base_url),
        String::new(),
    ];

    for entry in manifest {
        let source = entry.source.names().join(" | ");
        let mut flags = Vec::new();
        if entry.executable {
            flags.push("executable");
        }
        if entry.tolerates_failure() {
            flags.push("optional");
        }
        let flags = if flags.is_empty() {
            String::new()
        } else {
            format!(" ({})", flags.join(", "))
        };
        lines.push(format!("  {} <- {}{}", entry.local_path, source, flags));
    }

    lines.join("\n")
}

pub fn format_checks(destination: &Path, checks: &[EntryCheck]) -> String {
    let mut lines = vec![format!("Checking {}", contract_path(destination))];

    for check in checks {
        lines.push(match check {
            EntryCheck::Ok { path } => format!("  ok         {}", path),
            EntryCheck::Absent { path } => format!("  absent     {} (optional)", path),
            EntryCheck::Problem { path, problem } => {
                format!("  problem    {}: {}", path, problem.label())
            }
        });
    }

    let problems = checks.iter().filter(|c| c.is_problem()).count();
    lines.push(String::new());
    lines.push(if problems == 0 {
        "Install looks good.".to_string()
    } else {
        format!("{} problem(s) found.", problems)
    });
    lines.join("\n")
}

/// Pretty JSON for any report type.
pub fn to_json<T: Serialize>(value: &T) -> anyhow::Result<String> {
    Ok(serde_json::to_string_pretty(value)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::MANIFEST;
    use crate::validators::Problem;
    use std::path::PathBuf;

    fn sample_report() -> InstallReport {
        InstallReport {
            destination: PathBuf::from("/opt/ralph-loop"),
            entries: vec![
                ReportEntry::Installed {
                    path: "ralph".to_string(),
                    remote_name: "ralph".to_string(),
                    bytes: 12,
                    executable: true,
                },
                ReportEntry::Skipped {
                    path: "skills/commit/SKILL.md".to_string(),
                    reason: "no alternate could be fetched".to_string(),
                },
            ],
        }
    }

    #[test]
    fn test_contract_path_outside_home() {
        assert_eq!(contract_path(Path::new("/opt/x")), "/opt/x");
    }

    #[test]
    fn test_contract_path_inside_home() {
        if let Some(home) = dirs::home_dir() {
            let path = home.join(".claude").join("skills");
            assert_eq!(contract_path(&path), "~/.claude/skills");
        }
    }

    #[test]
    fn test_format_report() {
        let text = format_report(&sample_report());
        assert!(text.contains("installed  ralph (executable)"));
        assert!(text.contains("skipped    skills/commit/SKILL.md"));
        assert!(text.contains("Installed ralph-loop to /opt/ralph-loop"));
        assert!(text.contains("/opt/ralph-loop/ralph build"));
    }

    #[test]
    fn test_report_json() {
        let json = to_json(&sample_report()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["destination"], "/opt/ralph-loop");
        assert_eq!(value["entries"][0]["status"], "installed");
        assert_eq!(value["entries"][0]["executable"], true);
        assert_eq!(value["entries"][1]["status"], "skipped");
    }

    #[test]
    fn test_format_plan_lists_every_entry() {
        let text = format_plan(Path::new("/opt/ralph-loop"), "https://host/raw", MANIFEST);
        for entry in MANIFEST {
            assert!(text.contains(entry.local_path));
        }
        assert!(text.contains("ralph <- ralph (executable)"));
        assert!(text.contains("(optional)"));
    }

    #[test]
    fn test_format_checks_summary() {
        let ok = vec![EntryCheck::Ok {
            path: "SKILL.md".to_string(),
        }];
        assert!(format_checks(Path::new("/x"), &ok).ends_with("Install looks good."));

        let bad = vec![EntryCheck::Problem {
            path: "ralph".to_string(),
            problem: Problem::NotExecutable,
        }];
        let text = format_checks(Path::new("/x"), &bad);
        assert!(text.contains("ralph: not executable"));
        assert!(text.ends_with("1 problem(s) found."));
    }

    #[test]
    fn test_checks_json() {
        let checks = vec![EntryCheck::Problem {
            path: "ralph".to_string(),
            problem: Problem::NotExecutable,
        }];
        let value: serde_json::Value = serde_json::from_str(&to_json(&checks).unwrap()).unwrap();
        assert_eq!(value[0]["status"], "problem");
        assert_eq!(value[0]["problem"], "not_executable");
    }
}
