//! Command implementations.
//!
//! Results are written through the bridge's console so stdout carries only
//! command output; diagnostics go to stderr via tracing and miette.

use crate::cli::{Cli, Commands};
use gitbridge_events::{ConsoleStyle, SharedConsole, TerminalConsole};
use gitbridge_vcs::{BridgeSettings, RunOptions, ToolVersion, VcsBridge};
use miette::{IntoDiagnostic, miette};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, instrument};

/// Layer settings: file (if any), then environment, then command-line flags.
fn load_settings(
    config: Option<&Path>,
    git: Option<PathBuf>,
    timeout: Option<u64>,
) -> gitbridge_vcs::Result<BridgeSettings> {
    let settings = match config {
        Some(path) => BridgeSettings::load(path)?,
        None => BridgeSettings::default(),
    };
    let mut settings = settings.with_env_overrides()?;
    if let Some(git) = git {
        settings.git_executable = git;
    }
    if let Some(timeout) = timeout {
        settings.command_timeout_secs = timeout;
    }
    Ok(settings)
}

#[instrument(skip_all, fields(command = ?cli.command))]
pub fn execute(cli: Cli) -> miette::Result<()> {
    let settings = load_settings(cli.config.as_deref(), cli.git, cli.timeout)?;
    debug!(?settings, "Resolved settings");

    let console: SharedConsole = Arc::new(TerminalConsole::new());
    let bridge = VcsBridge::builder(console).settings(settings).build();

    match cli.command {
        Commands::Version => version(&bridge, cli.json),
        Commands::ParseRevision { revision, path } => {
            parse_revision(&bridge, &revision, path.as_deref(), cli.json)
        }
        Commands::Run { dir, quiet, args } => run(&bridge, dir, quiet, &args),
    }
}

#[derive(Serialize)]
struct VersionReport {
    executable: PathBuf,
    version: ToolVersion,
    minimum: String,
    supported: bool,
}

fn version(bridge: &VcsBridge, json: bool) -> miette::Result<()> {
    let executable = bridge.git_executable();
    let version = bridge.version();
    let minimum = bridge.settings().minimum_version;

    let Some(number) = version.number() else {
        return Err(miette!(
            code = "gitbridge::cli::version",
            help = "Pass --git or set GITBRIDGE_GIT_EXECUTABLE to a working git",
            "Unable to determine the version of '{}'",
            executable.display()
        ));
    };
    let supported = version.is_supported_by(minimum);

    let text = if json {
        let report = VersionReport {
            executable,
            version,
            minimum: minimum.to_string(),
            supported,
        };
        serde_json::to_string_pretty(&report).into_diagnostic()?
    } else if supported {
        format!("git {number}")
    } else {
        format!("git {number} (unsupported, minimum is {minimum})")
    };
    bridge.report_message(&text, ConsoleStyle::Normal);
    Ok(())
}

fn parse_revision(
    bridge: &VcsBridge,
    revision: &str,
    path: Option<&Path>,
    json: bool,
) -> miette::Result<()> {
    let Some(parsed) = bridge.parse_revision(revision, path)? else {
        return Err(miette!(
            code = "gitbridge::cli::empty_revision",
            "No revision given"
        ));
    };

    let text = if json {
        serde_json::to_string_pretty(&parsed).into_diagnostic()?
    } else {
        match parsed.timestamp() {
            Some(timestamp) => format!("{} {}", parsed.hash(), timestamp.to_rfc3339()),
            None => parsed.hash().to_string(),
        }
    };
    bridge.report_message(&text, ConsoleStyle::Normal);
    Ok(())
}

fn run(bridge: &VcsBridge, dir: Option<PathBuf>, quiet: bool, args: &[String]) -> miette::Result<()> {
    bridge.check_version();

    let options = RunOptions {
        silent: quiet,
        no_interactive_auth: true,
        working_directory: dir,
        timeout: None,
    };
    match bridge.run(args, &options) {
        Ok(output) => {
            bridge.report_message(&output, ConsoleStyle::Normal);
            Ok(())
        }
        Err(e) => {
            bridge.report_errors(&[e], &format!("git {}", args.join(" ")));
            Err(miette!(code = "gitbridge::cli::run", "git command failed"))
        }
    }
}
