//! Command-line interface for unpinner

mod commands;

pub use commands::*;

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Unpinner - disable SSL certificate pinning in installed Android apps
///
/// Pulls an app's APKs over ADB, injects a permissive network security
/// config, re-signs the set and reinstalls it on the device.
#[derive(Parser, Debug)]
#[command(name = "unpinner")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Configuration file path
    #[arg(short, long, global = true, env = "UNPINNER_CONFIG")]
    pub config: Option<PathBuf>,

    /// Device serial (default: the sole connected device)
    #[arg(short, long, global = true, env = "ANDROID_SERIAL")]
    pub serial: Option<String>,

    /// ADB server host
    #[arg(short = 'H', long, global = true, env = "ANDROID_ADB_SERVER_ADDRESS")]
    pub host: Option<String>,

    /// ADB server port
    #[arg(short = 'P', long, global = true, env = "ANDROID_ADB_SERVER_PORT")]
    pub port: Option<u16>,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List devices known to the ADB server
    Devices(DevicesArgs),

    /// Fuzzy-search packages installed on the device
    Search(SearchArgs),

    /// Pull a package's APKs without patching
    Pull(PullArgs),

    /// Pull, patch, re-sign and reinstall one or more packages
    Patch(PatchArgs),

    /// Reinstall previously patched APKs
    Install(InstallArgs),

    /// Download the apktool and uber-apk-signer jars
    Setup(SetupArgs),

    /// Manage configuration
    Config(ConfigArgs),

    /// Clean pulled and patched files
    Clean(CleanArgs),
}

/// Arguments for the devices command
#[derive(Parser, Debug)]
pub struct DevicesArgs {
    /// Output format
    #[arg(short, long, value_enum, default_value_t = InfoFormat::Pretty)]
    pub format: InfoFormat,
}

/// Listing output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum InfoFormat {
    /// Human-readable pretty output
    Pretty,
    /// JSON output
    Json,
}

/// Arguments for the search command
#[derive(Parser, Debug)]
pub struct SearchArgs {
    /// Package name (or fragment) to search for
    #[arg(required = true)]
    pub query: String,

    /// Maximum results to show
    #[arg(short, long, default_value = "20")]
    pub limit: usize,
}

/// Arguments for the pull command
#[derive(Parser, Debug)]
pub struct PullArgs {
    /// Package to pull
    #[arg(required = true)]
    pub package: String,

    /// Output directory (default: packages/<package>)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Re-pull over an existing directory
    #[arg(short, long)]
    pub force: bool,
}

/// Arguments for the patch command
#[derive(Parser, Debug, Clone)]
pub struct PatchArgs {
    /// Package(s) to patch
    #[arg(required = true)]
    pub packages: Vec<String>,

    /// Patched output root (default: patched/)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Stop after signing, do not reinstall
    #[arg(long)]
    pub no_install: bool,

    /// Re-pull the APKs even if a pulled copy exists
    #[arg(long)]
    pub force_pull: bool,

    /// Keep decode trees and intermediate artifacts
    #[arg(long)]
    pub keep_temp: bool,

    /// Build with aapt2 directly instead of falling back to it
    #[arg(long)]
    pub use_aapt2: bool,

    /// Skip the uninstall confirmation
    #[arg(short = 'y', long)]
    pub yes: bool,
}

/// Arguments for the install command
#[derive(Parser, Debug)]
pub struct InstallArgs {
    /// Package whose patched APKs should be installed
    #[arg(required = true)]
    pub package: String,

    /// Skip the uninstall confirmation
    #[arg(short = 'y', long)]
    pub yes: bool,
}

/// Arguments for the setup command
#[derive(Parser, Debug)]
pub struct SetupArgs {
    /// Re-download jars that are already present
    #[arg(short, long)]
    pub force: bool,
}

/// Arguments for the config command
#[derive(Parser, Debug)]
pub struct ConfigArgs {
    /// Configuration subcommand
    #[command(subcommand)]
    pub command: ConfigCommands,
}

/// Configuration subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show current configuration
    Show,
    /// Edit configuration file
    Edit,
    /// Reset configuration to defaults
    Reset,
    /// Set a configuration value
    Set {
        /// Configuration key
        key: String,
        /// Configuration value
        value: String,
    },
    /// Get a configuration value
    Get {
        /// Configuration key
        key: String,
    },
    /// Initialize configuration file
    Init {
        /// Force overwrite existing config
        #[arg(short, long)]
        force: bool,
    },
}

/// Arguments for the clean command
#[derive(Parser, Debug)]
pub struct CleanArgs {
    /// Clean pulled packages
    #[arg(long)]
    pub packages: bool,

    /// Clean patched output
    #[arg(long)]
    pub patched: bool,

    /// Clean everything
    #[arg(short, long)]
    pub all: bool,

    /// Dry run - show what would be deleted
    #[arg(short, long)]
    pub dry_run: bool,
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verify_cli() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_patch_flags() {
        let cli = Cli::parse_from([
            "unpinner",
            "patch",
            "com.example.app",
            "--no-install",
            "--force-pull",
            "-s",
            "emulator-5554",
        ]);

        assert_eq!(cli.serial.as_deref(), Some("emulator-5554"));
        match cli.command {
            Commands::Patch(args) => {
                assert_eq!(args.packages, vec!["com.example.app"]);
                assert!(args.no_install);
                assert!(args.force_pull);
                assert!(!args.yes);
            }
            _ => panic!("expected patch command"),
        }
    }
}
