mod cli;
mod commands;
mod tracing;

use crate::tracing::{Level, TracingConfig};

fn main() -> miette::Result<()> {
    let cli = cli::parse();

    crate::tracing::init_tracing(TracingConfig {
        format: cli.format,
        level: Level::from(cli.level),
        filter: None,
    })?;

    commands::execute(cli)
}
