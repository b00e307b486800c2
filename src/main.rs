mod cli;

use auditvault::config::Config;
use auditvault::keys::encode_archive_key;
use auditvault::observability::init_tracing;
use auditvault::trigger;
use chrono::Utc;
use clap::Parser;
use cli::{Cli, Commands, ConfigArgs};

type AnyError = Box<dyn std::error::Error + Send + Sync>;

#[tokio::main]
async fn main() -> Result<(), AnyError> {
    init_tracing();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run(args) => {
            let status = trigger::run(load_config(args)?).await?;
            println!("{}", serde_json::to_string(&status)?);
        }
        Commands::Key(args) => {
            let key = encode_archive_key(&args.cluster, &args.instance, &args.log_file_name)?;
            println!("{}", key);
        }
        Commands::Window(args) => {
            let window = load_config(args)?.window.at(Utc::now());
            let start = window.start_utc().map(|t| t.to_rfc3339()).unwrap_or_default();
            let end = window.end_utc().map(|t| t.to_rfc3339()).unwrap_or_default();
            println!("start={} ({})", window.start, start);
            println!("end={} ({})", window.end, end);
        }
        Commands::Config(args) => {
            print!("{}", toml::to_string_pretty(&load_config(args)?)?);
        }
    }

    Ok(())
}

fn load_config(args: ConfigArgs) -> Result<Config, AnyError> {
    let config = match args.config {
        Some(path) => Config::load_from_path(path)?,
        None => Config::load()?,
    };
    Ok(config)
}
