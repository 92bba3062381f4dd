//! Command execution handlers

use std::path::Path;

use console::style;
use dialoguer::Confirm;
use indicatif::{HumanBytes, MultiProgress, ProgressBar, ProgressStyle};

use crate::adb::AdbClient;
use crate::config::Config;
use crate::error::{Result, UnpinnerError};
use crate::models::DeviceState;
use crate::patcher::{PackagePatcher, PatchOptions};
use crate::search::PackageMatcher;
use crate::tools::ToolFetcher;

use super::Cli;

/// Load configuration and apply the global CLI overrides
fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = Config::load_from(cli.config.as_deref())?;

    if let Some(ref host) = cli.host {
        config.adb.host = host.clone();
    }
    if let Some(port) = cli.port {
        config.adb.port = port;
    }

    Ok(config)
}

/// Progress style shared by the pipeline commands
fn progress_style() -> ProgressStyle {
    ProgressStyle::with_template("{prefix:.bold.dim} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
        .unwrap()
        .progress_chars("█▓▒░ ")
}

/// Ask before uninstalling from the device
fn confirm_reinstall(prompt: &str, assume_yes: bool) -> Result<bool> {
    if assume_yes {
        return Ok(true);
    }

    Confirm::new()
        .with_prompt(prompt)
        .default(false)
        .interact()
        .map_err(|e| UnpinnerError::Other(e.to_string()))
}

/// Execute the devices command
pub async fn execute_devices(cli: &Cli, args: &super::DevicesArgs) -> Result<()> {
    let config = load_config(cli)?;
    let client = AdbClient::from_config(&config.adb);

    let version = client.server_version().await?;
    let devices = client.devices().await?;

    match args.format {
        super::InfoFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&devices)?);
        }
        super::InfoFormat::Pretty => {
            println!(
                "ADB server at {} (protocol version {})\n",
                client.address(),
                version
            );

            if devices.is_empty() {
                println!("No devices connected");
            } else {
                for device in &devices {
                    let state = match device.state {
                        DeviceState::Device => style(device.state.to_string()).green(),
                        DeviceState::Unauthorized => style(device.state.to_string()).yellow(),
                        _ => style(device.state.to_string()).dim(),
                    };
                    println!("{}  {}", style(&device.serial).bold(), state);
                }
            }
        }
    }

    Ok(())
}

/// Execute the search command
pub async fn execute_search(cli: &Cli, args: &super::SearchArgs) -> Result<()> {
    let config = load_config(cli)?;
    let client = AdbClient::from_config(&config.adb);
    let device = client.device(cli.serial.as_deref()).await?;

    let packages = device.list_packages().await?;
    let matcher = PackageMatcher::new();
    let matches = matcher.rank(&args.query, &packages, args.limit);

    if matches.is_empty() {
        println!("No installed packages match '{}'", args.query);
    } else {
        println!(
            "Packages on {} matching '{}'\n",
            style(device.serial()).bold(),
            style(&args.query).cyan()
        );
        for m in &matches {
            println!("{}  {}", style(format!("{:4.2}", m.score)).dim(), m.name);
        }
    }

    Ok(())
}

/// Execute the pull command
pub async fn execute_pull(cli: &Cli, args: &super::PullArgs) -> Result<()> {
    let config = load_config(cli)?;
    let client = AdbClient::from_config(&config.adb);
    let device = client.device(cli.serial.as_deref()).await?;

    config.ensure_layout()?;
    let patcher = PackagePatcher::new(device, config);
    let dest = args
        .output
        .clone()
        .unwrap_or_else(|| patcher.pull_dir(&args.package));

    let pb = ProgressBar::new(0);
    pb.set_style(
        ProgressStyle::with_template(
            "{prefix:.bold.dim} [{bar:40.cyan/blue}] {bytes}/{total_bytes} {msg}",
        )
        .unwrap()
        .progress_chars("█▓▒░ "),
    );
    pb.set_prefix(args.package.clone());

    let pulled = patcher
        .pull_if_needed(&args.package, &dest, args.force, &pb)
        .await?;

    if pulled {
        pb.finish_with_message(format!("Pulled into {}", dest.display()));
    } else {
        pb.finish_and_clear();
        println!(
            "{} already pulled into {} (use --force to re-pull)",
            args.package,
            dest.display()
        );
    }

    Ok(())
}

/// Execute the patch command
pub async fn execute_patch(cli: &Cli, args: &super::PatchArgs) -> Result<()> {
    let config = load_config(cli)?;
    let client = AdbClient::from_config(&config.adb);
    let device = client.device(cli.serial.as_deref()).await?;

    let opts = PatchOptions {
        force_pull: args.force_pull,
        keep_temp: args.keep_temp,
        use_aapt2: args.use_aapt2,
        output_dir: args.output.clone(),
    };

    // Settle the reinstall question before the progress bars start
    let mut do_install = !args.no_install;
    if do_install {
        let assume_yes = args.yes || config.general.auto_yes;
        let prompt = format!(
            "Patching will uninstall and reinstall {} package(s) on {}. Continue?",
            args.packages.len(),
            device.serial()
        );
        if !confirm_reinstall(&prompt, assume_yes)? {
            println!("Skipping reinstall, patched APKs will only be written to disk");
            do_install = false;
        }
    }

    let multi = MultiProgress::new();
    let style_template = progress_style();

    let mut handles = Vec::new();
    for package in &args.packages {
        let pb = multi.add(ProgressBar::new(1));
        pb.set_style(style_template.clone());
        pb.set_prefix(package.clone());

        let device = device.clone();
        let config = config.clone();
        let package = package.clone();
        let opts = opts.clone();

        handles.push(tokio::spawn(async move {
            let patcher = PackagePatcher::new(device, config);
            let report = patcher.patch(&package, &opts, &pb).await?;
            pb.finish_with_message(format!("{} APKs patched", report.artifacts.len()));
            Ok::<_, UnpinnerError>((package, report))
        }));
    }

    let mut results = Vec::new();
    for handle in handles {
        results.push(
            handle
                .await
                .map_err(|e| UnpinnerError::Other(e.to_string()))??,
        );
    }

    for (package, report) in &results {
        let patcher = PackagePatcher::new(device.clone(), config.clone());
        let out_dir = patcher.output_dir(package, &opts);

        if do_install {
            patcher.install(package, &out_dir).await?;
            println!(
                "{} {} patched and reinstalled ({} APKs)",
                style("✓").green(),
                style(package).bold(),
                report.artifacts.len()
            );
        } else {
            println!(
                "{} {} patched into {} ({} APKs)",
                style("✓").green(),
                style(package).bold(),
                out_dir.display(),
                report.artifacts.len()
            );
        }
    }

    Ok(())
}

/// Execute the install command
pub async fn execute_install(cli: &Cli, args: &super::InstallArgs) -> Result<()> {
    let config = load_config(cli)?;
    let client = AdbClient::from_config(&config.adb);
    let device = client.device(cli.serial.as_deref()).await?;

    let assume_yes = args.yes || config.general.auto_yes;
    let patcher = PackagePatcher::new(device, config);
    let out_dir = patcher.output_dir(&args.package, &PatchOptions::default());

    if !out_dir.exists() {
        return Err(UnpinnerError::Install(format!(
            "{} has not been patched yet (no {})",
            args.package,
            out_dir.display()
        )));
    }

    let prompt = format!(
        "Uninstall {} from {} and install the patched APKs?",
        args.package,
        patcher.device().serial()
    );
    if !confirm_reinstall(&prompt, assume_yes)? {
        println!("Aborted");
        return Ok(());
    }

    patcher.install(&args.package, &out_dir).await?;
    println!(
        "{} {} reinstalled from {}",
        style("✓").green(),
        style(&args.package).bold(),
        out_dir.display()
    );

    Ok(())
}

/// Execute the setup command
pub async fn execute_setup(cli: &Cli, args: &super::SetupArgs) -> Result<()> {
    let config = load_config(cli)?;
    config.ensure_layout()?;

    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::with_template("{spinner:.green} {msg}").unwrap());
    pb.set_message("Downloading tools...");

    let fetcher = ToolFetcher::new(&config);
    let written = fetcher.fetch_all(&config, args.force).await?;

    pb.finish_and_clear();
    if written.is_empty() {
        println!("Tools already present (use --force to re-download)");
    } else {
        for path in &written {
            println!("{} {}", style("✓").green(), path.display());
        }
    }

    Ok(())
}

/// Execute the config command
pub async fn execute_config(cli: &Cli, args: &super::ConfigArgs) -> Result<()> {
    match &args.command {
        super::ConfigCommands::Show => {
            let config = load_config(cli)?;
            println!(
                "{}",
                toml::to_string_pretty(&config)
                    .map_err(|e| UnpinnerError::Config(e.to_string()))?
            );
        }
        super::ConfigCommands::Edit => {
            let config_path = Config::config_path()?;
            let editor = std::env::var("EDITOR").unwrap_or_else(|_| "nano".to_string());
            std::process::Command::new(editor)
                .arg(&config_path)
                .status()?;
        }
        super::ConfigCommands::Reset => {
            Config::reset()?;
            println!("Configuration reset to defaults");
        }
        super::ConfigCommands::Set { key, value } => {
            let mut config = Config::load()?;
            config.set(key, value)?;
            config.save()?;
            println!("Set {} = {}", key, value);
        }
        super::ConfigCommands::Get { key } => {
            let config = load_config(cli)?;
            if let Some(value) = config.get(key) {
                println!("{}", value);
            } else {
                println!("Key '{}' not found", key);
            }
        }
        super::ConfigCommands::Init { force } => {
            Config::init(*force)?;
            println!("Configuration initialized");
        }
    }

    Ok(())
}

/// Execute the clean command
pub async fn execute_clean(cli: &Cli, args: &super::CleanArgs) -> Result<()> {
    let config = load_config(cli)?;
    let clean_all = args.all || (!args.packages && !args.patched);

    let mut targets = Vec::new();
    if clean_all || args.packages {
        targets.push(config.packages_dir());
    }
    if clean_all || args.patched {
        targets.push(config.patched_dir());
    }

    let mut cleaned = Vec::new();
    for dir in targets {
        if !dir.exists() {
            continue;
        }

        let size = dir_size(&dir)?;
        if args.dry_run {
            println!("Would remove: {} ({})", dir.display(), HumanBytes(size));
        } else {
            std::fs::remove_dir_all(&dir)?;
            cleaned.push((dir, size));
        }
    }

    if !args.dry_run {
        if cleaned.is_empty() {
            println!("Nothing to clean");
        } else {
            let freed: u64 = cleaned.iter().map(|(_, size)| size).sum();
            println!(
                "Cleaned {} directories, freed {}",
                cleaned.len(),
                HumanBytes(freed)
            );
        }
    }

    Ok(())
}

/// Total size of all files under a directory
fn dir_size(dir: &Path) -> Result<u64> {
    let mut total = 0;
    for entry in walkdir::WalkDir::new(dir) {
        let entry = entry?;
        if entry.file_type().is_file() {
            total += entry.metadata()?.len();
        }
    }
    Ok(total)
}
