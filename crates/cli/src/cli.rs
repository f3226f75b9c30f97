use crate::tracing::{LogLevel, TracingFormat};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "gitbridge")]
#[command(about = "Drive an external git executable with version checks and revision parsing")]
#[command(long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(long, global = true, help = "Git executable to run")]
    pub git: Option<PathBuf>,

    #[arg(
        long,
        global = true,
        env = "GITBRIDGE_CONFIG",
        help = "Settings file (TOML)"
    )]
    pub config: Option<PathBuf>,

    #[arg(
        long,
        global = true,
        help = "Timeout for each git invocation in seconds (0 disables)"
    )]
    pub timeout: Option<u64>,

    #[arg(
        short = 'l',
        long,
        global = true,
        help = "Set logging level",
        default_value = "warn",
        value_enum
    )]
    pub level: LogLevel,

    #[arg(
        long,
        global = true,
        help = "Log output format",
        default_value = "compact",
        value_enum
    )]
    pub format: TracingFormat,

    #[arg(long, global = true, help = "Print results as JSON")]
    pub json: bool,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Commands {
    #[command(about = "Detect the git version and check it is supported")]
    Version,
    #[command(about = "Parse a revision, resolving it through git when a path is given")]
    ParseRevision {
        #[arg(help = "Commit hash, ref name or '<date>[<hash>' encoded revision")]
        revision: String,
        #[arg(long, short = 'p', help = "File or directory inside the repository")]
        path: Option<PathBuf>,
    },
    #[command(about = "Run git with the configured executable")]
    Run {
        #[arg(long, short = 'C', help = "Directory to run in")]
        dir: Option<PathBuf>,
        #[arg(long, short = 'q', help = "Do not echo the command line")]
        quiet: bool,
        #[arg(last = true, required = true, help = "Arguments passed to git")]
        args: Vec<String>,
    },
}

pub fn parse() -> Cli {
    Cli::parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_default_values() {
        let cli = Cli::try_parse_from(["gitbridge", "version"]).unwrap();

        assert_eq!(cli.level, LogLevel::Warn);
        assert_eq!(cli.format, TracingFormat::Compact);
        assert!(!cli.json);
        assert!(cli.git.is_none());
        assert!(cli.timeout.is_none());
        assert_eq!(cli.command, Commands::Version);
    }

    #[test]
    fn test_cli_global_options() {
        let cli = Cli::try_parse_from([
            "gitbridge",
            "version",
            "--git",
            "/opt/git/bin/git",
            "--timeout",
            "5",
            "-l",
            "debug",
            "--format",
            "json",
        ])
        .unwrap();

        assert_eq!(cli.git, Some(PathBuf::from("/opt/git/bin/git")));
        assert_eq!(cli.timeout, Some(5));
        assert_eq!(cli.level, LogLevel::Debug);
        assert_eq!(cli.format, TracingFormat::Json);
    }

    #[test]
    fn test_parse_revision_command() {
        let cli =
            Cli::try_parse_from(["gitbridge", "parse-revision", "HEAD", "--path", "src"]).unwrap();
        assert_eq!(
            cli.command,
            Commands::ParseRevision {
                revision: "HEAD".to_string(),
                path: Some(PathBuf::from("src")),
            }
        );
    }

    #[test]
    fn test_run_takes_trailing_args() {
        let cli = Cli::try_parse_from(["gitbridge", "run", "-q", "--", "log", "--oneline", "-n", "3"])
            .unwrap();
        assert_eq!(
            cli.command,
            Commands::Run {
                dir: None,
                quiet: true,
                args: vec!["log".into(), "--oneline".into(), "-n".into(), "3".into()],
            }
        );
    }

    #[test]
    fn test_run_requires_args() {
        assert!(Cli::try_parse_from(["gitbridge", "run"]).is_err());
    }

    #[test]
    fn test_invalid_level_rejected() {
        assert!(Cli::try_parse_from(["gitbridge", "--level", "loud", "version"]).is_err());
    }

    #[test]
    fn test_cli_definition_is_valid() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
