mod cli;
mod cmd;
mod dispatch;
mod format;
mod table;

use clap::Parser;

use mediaplan_core::config;

use cli::Cli;
use dispatch::{dispatch_command, Session};

fn main() {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let source = match config::resolve_config_path(cli.config.as_deref()) {
        Some(s) => s,
        None => {
            eprintln!("Error: no configuration file found.");
            eprintln!("Searched:");
            for (path, level) in config::default_config_search_paths() {
                eprintln!("  {} ({})", path.display(), level);
            }
            std::process::exit(1);
        }
    };

    tracing::info!("Using config: {source}");

    let session = match Session::open(source.path()) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    };

    if let Err(e) = dispatch_command(&cli.command, &session) {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
