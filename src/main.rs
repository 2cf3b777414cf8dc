mod config;
mod fetch;
mod installer;
mod logging;
mod manifest;
mod output;
mod validators;

use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::Parser;
use tracing::{debug, info, warn};

use crate::config::{Config, ConfigLoadStatus, LoadedConfig};
use crate::fetch::HttpFetcher;
use crate::installer::Installer;
use crate::manifest::MANIFEST;

/// Install the ralph-loop skill into ~/.claude/skills.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Cli {
    /// Destination directory (default: ~/.claude/skills/ralph-loop)
    #[arg(long, value_name = "DIR")]
    dest: Option<PathBuf>,

    /// Base URL the skill files are fetched from
    #[arg(long, value_name = "URL")]
    base_url: Option<String>,

    /// Print what would be installed without fetching or writing anything
    #[arg(long, conflicts_with_all = ["verify", "json"])]
    dry_run: bool,

    /// Check an existing install instead of installing
    #[arg(long)]
    verify: bool,

    /// Print the final report as JSON
    #[arg(long)]
    json: bool,
}

impl Cli {
    /// Flags take precedence over environment and config file.
    fn apply(&self, mut config: Config) -> Config {
        if let Some(url) = &self.base_url {
            config.source.base_url = url.clone();
        }
        config
    }

    /// `--dest` is used as given, so non-UTF-8 paths survive.
    fn destination(&self, config: &Config) -> PathBuf {
        self.dest
            .clone()
            .unwrap_or_else(|| config.destination_path())
    }
}

fn main() -> Result<()> {
    use std::time::Instant;

    let start_time = Instant::now();
    let cli = Cli::parse();

    // Config comes first so its log level can seed the filter.
    let LoadedConfig {
        config,
        config_path,
        status,
    } = config::load_config();
    let config = cli.apply(config);

    let (session_id, _guard) = match logging::init(&config.logging.level) {
        Ok(ctx) => {
            logging::cleanup_old_logs(&ctx.log_directory);
            (Some(ctx.session_id), Some(ctx._guard))
        }
        Err(e) => {
            eprintln!("Warning: Failed to initialize logging: {}", e);
            (None, None)
        }
    };

    debug!(
        config_path = %config_path.display(),
        status = ?status,
        "config_loaded"
    );
    if let ConfigLoadStatus::Error(message) = &status {
        warn!(config_path = %config_path.display(), error = %message, "config_load_failed");
        eprintln!(
            "Warning: {} ({}); using defaults",
            message,
            output::contract_path(&config_path)
        );
    }

    let result = run(&cli, &config);

    if let Some(sid) = session_id {
        info!(
            session_id = %sid,
            duration_secs = start_time.elapsed().as_secs_f64(),
            success = result.is_ok(),
            "session_end"
        );
    }

    result
}

fn run(cli: &Cli, config: &Config) -> Result<()> {
    let destination = cli.destination(config);

    if cli.dry_run {
        println!(
            "{}",
            output::format_plan(&destination, &config.source.base_url, MANIFEST)
        );
        return Ok(());
    }

    if cli.verify {
        let checks = validators::verify_install(&destination, MANIFEST);
        if cli.json {
            println!("{}", output::to_json(&checks)?);
        } else {
            println!("{}", output::format_checks(&destination, &checks));
        }
        let problems = checks.iter().filter(|c| c.is_problem()).count();
        if problems > 0 {
            bail!("{} problem(s) found in {}", problems, output::contract_path(&destination));
        }
        return Ok(());
    }

    let fetcher = HttpFetcher::new(
        &config.source.base_url,
        config.timeout(),
        &config.http.user_agent,
    )
    .context("Failed to build HTTP client")?;

    if !cli.json {
        println!("Installing ralph-loop from {}", config.source.base_url);
    }

    let report = Installer::new(&fetcher, &destination)
        .run(MANIFEST)
        .with_context(|| {
            format!(
                "Install into {} did not complete",
                output::contract_path(&destination)
            )
        })?;

    if cli.json {
        println!("{}", output::to_json(&report)?);
    } else {
        println!("{}", output::format_report(&report));
    }

    Ok(())
}
