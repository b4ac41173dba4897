use std::path::PathBuf;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use riakjson_client::config::default_config_path;
use riakjson_client::{ClientConfig, Connection};
use riakjson_cli::{run, CliError, Command};

/// riakjson - command-line client for RiakJson
#[derive(Parser, Debug)]
#[command(name = "riakjson")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// YAML config file (defaults to ~/.config/riakjson/config.yml if present)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the configured host
    #[arg(long)]
    host: Option<String>,

    /// Override the configured port
    #[arg(long)]
    port: Option<u16>,

    #[command(subcommand)]
    command: Command,
}

fn load_config(args: &Args) -> Result<ClientConfig, CliError> {
    let path = args
        .config
        .clone()
        .or_else(|| default_config_path().filter(|p| p.exists()));

    let mut config = match path {
        Some(path) => ClientConfig::load(path)?,
        None => ClientConfig::default(),
    };
    if let Some(host) = &args.host {
        config.host = host.clone();
    }
    if let Some(port) = args.port {
        config.port = port;
    }
    tracing::debug!(host = %config.host, port = config.port, "resolved config");
    Ok(config)
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let result = load_config(&args)
        .and_then(|config| Connection::from_config(&config).map_err(CliError::from))
        .and_then(|connection| run(&connection, &args.command, &mut std::io::stdin().lock()));

    match result {
        Ok(output) => {
            if !output.is_empty() {
                println!("{}", output);
            }
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}
