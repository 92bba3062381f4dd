//! Unpinner - disable SSL certificate pinning in installed Android apps
//!
//! Unpinner pulls an app's APKs off a device over ADB, injects a network
//! security config that trusts user certificates, rebuilds and re-signs
//! the set, and reinstalls it. Intended for intercepting your own apps'
//! traffic with a local proxy during security testing.
//!
//! # Features
//!
//! - **Self-contained ADB**: speaks the server and sync protocols
//!   directly, no adb binary needed for pulling
//! - **Split-aware**: handles app bundle installs (base + split APKs)
//! - **Safe**: confirmation before the original app is uninstalled
//! - **Traceable**: every run leaves a JSON report with artifact digests
//!
//! # Quick Start
//!
//! ```bash
//! # Fetch apktool and uber-apk-signer
//! unpinner setup
//!
//! # Patch an app and reinstall it
//! unpinner patch com.example.app
//!
//! # Patch without touching the device install
//! unpinner patch --no-install com.example.app
//!
//! # List connected devices
//! unpinner devices
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod adb;
pub mod apk;
pub mod cli;
pub mod config;
pub mod error;
pub mod models;
pub mod patcher;
pub mod search;
pub mod tools;

// Re-export commonly used types
pub use error::{Result, UnpinnerError};
pub use models::{ApkRole, DeviceInfo, DeviceState, PulledApk};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");

/// Quick patch function for simple use cases
///
/// Pulls, patches and signs the package with default configuration,
/// without reinstalling it on the device.
///
/// # Arguments
///
/// * `serial` - Device serial, or None for the sole connected device
/// * `package` - Package name to patch
///
/// # Returns
///
/// The patch report on success
///
/// # Example
///
/// ```no_run
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let report = unpinner::patch(None, "com.example.app").await?;
///
///     println!("Patched {} APKs", report.artifacts.len());
///     Ok(())
/// }
/// ```
pub async fn patch(serial: Option<&str>, package: &str) -> Result<patcher::PatchReport> {
    use adb::AdbClient;
    use patcher::{PackagePatcher, PatchOptions};

    let config = config::Config::load()?;
    let client = AdbClient::from_config(&config.adb);
    let device = client.device(serial).await?;

    let patcher = PackagePatcher::new(device, config);
    let pb = indicatif::ProgressBar::hidden();
    patcher.patch(package, &PatchOptions::default(), &pb).await
}
