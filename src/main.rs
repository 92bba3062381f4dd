//! Unpinner - disable SSL certificate pinning in installed Android apps
//!
//! Main entry point for the unpinner CLI application.

use std::process::ExitCode;

use console::style;
use tracing_subscriber::EnvFilter;

use unpinner::cli::{self, Cli, Commands};
use unpinner::error::Result;

/// Application banner
const BANNER: &str = r#"
  ██╗   ██╗███╗   ██╗██████╗ ██╗███╗   ██╗
  ██║   ██║████╗  ██║██╔══██╗██║████╗  ██║
  ██║   ██║██╔██╗ ██║██████╔╝██║██╔██╗ ██║
  ██║   ██║██║╚██╗██║██╔═══╝ ██║██║╚██╗██║
  ╚██████╔╝██║ ╚████║██║     ██║██║ ╚████║
   ╚═════╝ ╚═╝  ╚═══╝╚═╝     ╚═╝╚═╝  ╚═══╝
"#;

#[tokio::main]
async fn main() -> ExitCode {
    // Parse CLI arguments
    let cli = Cli::parse_args();

    // Set up logging
    setup_logging(&cli);

    // Run the application
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {}", style("Error:").red().bold(), e);
            ExitCode::FAILURE
        }
    }
}

/// Set up logging based on CLI arguments
fn setup_logging(cli: &Cli) {
    let level = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "error"
    } else {
        "info"
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .init();
}

/// Main application logic
async fn run(cli: Cli) -> Result<()> {
    // Show banner for the pipeline commands (not quiet mode)
    if !cli.quiet {
        match &cli.command {
            Commands::Patch(_) | Commands::Install(_) => {
                println!("{}", style(BANNER).cyan());
                println!(
                    "  {} v{}\n",
                    style("unpinner").bold(),
                    style(unpinner::VERSION).dim()
                );
            }
            _ => {}
        }
    }

    // Dispatch to appropriate command handler
    match &cli.command {
        Commands::Devices(args) => cli::execute_devices(&cli, args).await,
        Commands::Search(args) => cli::execute_search(&cli, args).await,
        Commands::Pull(args) => cli::execute_pull(&cli, args).await,
        Commands::Patch(args) => cli::execute_patch(&cli, args).await,
        Commands::Install(args) => cli::execute_install(&cli, args).await,
        Commands::Setup(args) => cli::execute_setup(&cli, args).await,
        Commands::Config(args) => cli::execute_config(&cli, args).await,
        Commands::Clean(args) => cli::execute_clean(&cli, args).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_banner() {
        // The banner is ASCII art; check that it's present and has the
        // expected number of glyph rows
        assert!(!BANNER.trim().is_empty());
        assert!(BANNER.lines().count() >= 6);
    }
}
