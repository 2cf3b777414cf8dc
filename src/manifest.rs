//! The fixed set of files that make up the ralph-loop skill.

/// Gist owner hosting the skill files.
///
/// Placeholder: set this and [`GIST_ID`] per deployment, or point
/// `source.base_url` / `--base-url` at the real host.
pub const GIST_OWNER: &str = "cmoel";

/// Gist identifier hosting the skill files.
///
/// Placeholder, not a published gist. Real gist ids are hex strings.
pub const GIST_ID: &str = "ralph-loop-skill";

/// Directory name of the installed skill under `~/.claude/skills`.
pub const SKILL_DIR_NAME: &str = "ralph-loop";

/// Remote names tried, in order, for the commit sub-skill document.
pub const COMMIT_SKILL_ALTERNATES: &[&str] =
    &["commit-SKILL.md", "skills-commit-SKILL.md", "commit.md"];

/// Build the raw-content base URL for the skill gist.
pub fn default_base_url() -> String {
    format!(
        "https://gist.githubusercontent.com/{}/{}/raw",
        GIST_OWNER, GIST_ID
    )
}

/// Where the bytes for an entry come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    /// A single remote name.
    Single(&'static str),
    /// Ordered alternates; the first that fetches successfully wins.
    Fallback(&'static [&'static str]),
}

impl Source {
    /// All remote names this source may try, in order.
    pub fn names(&self) -> &[&'static str] {
        match self {
            Source::Single(name) => std::slice::from_ref(name),
            Source::Fallback(names) => names,
        }
    }
}

/// One remote file and where it lands locally.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ManifestEntry {
    pub source: Source,
    /// Path relative to the destination root, `/`-separated.
    pub local_path: &'static str,
    pub executable: bool,
    /// Fetch failures skip the entry instead of aborting the run.
    pub optional: bool,
}

impl ManifestEntry {
    const fn required(remote: &'static str, local_path: &'static str) -> Self {
        Self {
            source: Source::Single(remote),
            local_path,
            executable: false,
            optional: false,
        }
    }

    const fn executable(remote: &'static str, local_path: &'static str) -> Self {
        Self {
            source: Source::Single(remote),
            local_path,
            executable: true,
            optional: false,
        }
    }

    /// Resolve the local path against a destination root.
    pub fn target(&self, root: &std::path::Path) -> std::path::PathBuf {
        self.local_path
            .split('/')
            .fold(root.to_path_buf(), |path, part| path.join(part))
    }

    /// Whether a failed fetch for this entry is tolerated.
    ///
    /// Fallback entries are tolerated even when not flagged optional: once
    /// every alternate has failed the entry is skipped.
    pub fn tolerates_failure(&self) -> bool {
        self.optional || matches!(self.source, Source::Fallback(_))
    }
}

/// The skill manifest, in install order.
pub const MANIFEST: &[ManifestEntry] = &[
    ManifestEntry::required("SKILL.md", "SKILL.md"),
    ManifestEntry::executable("ralph", "ralph"),
    ManifestEntry::required("loop.sh", "lib/loop.sh"),
    ManifestEntry::required("build.md", "prompts/build.md"),
    ManifestEntry::required("plan.md", "prompts/plan.md"),
    ManifestEntry::executable("on-complete.sh", "hooks/on-complete.sh"),
    ManifestEntry::executable("on-start.sh", "hooks/on-start.sh"),
    ManifestEntry::required("prd-template.md", "assets/prd-template.md"),
    ManifestEntry {
        source: Source::Fallback(COMMIT_SKILL_ALTERNATES),
        local_path: "skills/commit/SKILL.md",
        executable: false,
        optional: true,
    },
];
