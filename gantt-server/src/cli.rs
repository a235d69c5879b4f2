use clap::{Parser, Subcommand};
use std::path::PathBuf;

const HELP_EPILOG: &str = r#"Server options can also be provided via environment variables:
  CONFIG_PATH (default: ./config.yaml)
  DB_PATH     (default: data/app.db)
  PORT        (default: 8000 or config.listen_port)
"#;

#[derive(Debug, Parser)]
#[command(
    name = "gantt-server",
    version,
    about = "Gantt project tracker server",
    long_about = None,
    after_long_help = HELP_EPILOG,
)]
pub struct Cli {
    /// Config file; takes precedence over CONFIG_PATH.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Optional subcommand. Without one, runs the server.
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Load and validate the config file, then exit
    CheckConfig,
}
