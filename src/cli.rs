use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "auditvault")]
#[command(about = "Archive database audit logs into object storage", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Archive every due audit log once and print the status object
    Run(ConfigArgs),
    /// Print the archive key a log file would be stored under
    Key(KeyArgs),
    /// Print the current archival window
    Window(ConfigArgs),
    /// Print the effective configuration (secrets omitted)
    Config(ConfigArgs),
}

#[derive(clap::Args, Debug)]
pub struct ConfigArgs {
    /// Configuration file (defaults to $AUDITVAULT_CONFIG or config/auditvault.toml)
    #[arg(long)]
    pub config: Option<PathBuf>,
}

#[derive(clap::Args, Debug)]
pub struct KeyArgs {
    /// Cluster identifier
    #[arg(long)]
    pub cluster: String,
    /// Instance identifier
    #[arg(long)]
    pub instance: String,
    /// Log file name as listed by the source, e.g. audit/audit.log.0.2024-05-01-10-30
    pub log_file_name: String,
}
