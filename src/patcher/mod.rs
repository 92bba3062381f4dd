//! The package patching pipeline
//!
//! Pull → decode → patch → rebuild → sign → reinstall, per package.

use std::path::{Path, PathBuf};
use std::process::Command;

use chrono::{DateTime, Utc};
use indicatif::ProgressBar;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

use crate::adb::AdbDevice;
use crate::apk;
use crate::config::Config;
use crate::error::{Result, UnpinnerError};
use crate::models::{sort_for_patching, ApkRole, PulledApk};
use crate::tools::Toolchain;

/// File name of the per-package report in the output directory
pub const REPORT_FILE: &str = "patch-report.json";

/// Knobs for a single patch run
#[derive(Debug, Clone, Default)]
pub struct PatchOptions {
    /// Re-pull the APKs even if a pulled copy exists
    pub force_pull: bool,
    /// Keep decode trees and intermediate artifacts
    pub keep_temp: bool,
    /// Build with aapt2 directly instead of falling back to it
    pub use_aapt2: bool,
    /// Override for the patched output root
    pub output_dir: Option<PathBuf>,
}

/// One patched APK in the report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatchedArtifact {
    /// Final artifact file name
    pub name: String,
    /// Base or split
    pub role: ApkRole,
    /// Size of the pulled APK in bytes
    pub original_size: u64,
    /// Size of the patched APK in bytes
    pub patched_size: u64,
    /// SHA-256 of the pulled APK
    pub original_sha256: String,
    /// SHA-256 of the patched APK
    pub patched_sha256: String,
    /// Whether the rebuild needed aapt2
    pub aapt2_used: bool,
}

/// Record of a completed patch run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatchReport {
    /// Patched package name
    pub package: String,
    /// Serial of the device the APKs came from
    pub serial: String,
    /// Per-APK results, base first
    pub artifacts: Vec<PatchedArtifact>,
    /// When the run finished
    pub patched_at: DateTime<Utc>,
}

impl PatchReport {
    /// Write the report into the output directory
    pub fn write(&self, out_dir: &Path) -> Result<PathBuf> {
        let path = out_dir.join(REPORT_FILE);
        std::fs::write(&path, serde_json::to_string_pretty(self)?)?;
        Ok(path)
    }
}

/// Orchestrates the pipeline for one device
pub struct PackagePatcher {
    device: AdbDevice,
    config: Config,
    toolchain: Toolchain,
}

impl PackagePatcher {
    /// Create a patcher for a selected device
    pub fn new(device: AdbDevice, config: Config) -> Self {
        let toolchain = Toolchain::from_config(&config);
        Self {
            device,
            config,
            toolchain,
        }
    }

    /// The device this patcher works against
    pub fn device(&self) -> &AdbDevice {
        &self.device
    }

    /// Directory the package's APKs are pulled into
    pub fn pull_dir(&self, package: &str) -> PathBuf {
        self.config.packages_dir().join(package)
    }

    /// Directory the patched artifacts are written to
    pub fn output_dir(&self, package: &str, opts: &PatchOptions) -> PathBuf {
        opts.output_dir
            .clone()
            .unwrap_or_else(|| self.config.patched_dir())
            .join(package)
    }

    /// Run the pipeline for one package, up to signing
    ///
    /// Installation is a separate step so callers can gate it behind a
    /// confirmation.
    pub async fn patch(
        &self,
        package: &str,
        opts: &PatchOptions,
        pb: &ProgressBar,
    ) -> Result<PatchReport> {
        // Fail on missing tools before touching the device
        self.toolchain.check()?;
        self.config.ensure_layout()?;

        pb.set_message("Pulling APKs...");
        let pull_dir = self.pull_dir(package);
        self.pull_if_needed(package, &pull_dir, opts.force_pull, pb)
            .await?;

        let mut apks = collect_apks(&pull_dir)?;
        sort_for_patching(&mut apks);

        // Reset the output directory
        let out_dir = self.output_dir(package, opts);
        if out_dir.exists() {
            std::fs::remove_dir_all(&out_dir)?;
        }
        std::fs::create_dir_all(&out_dir)?;

        // The bar tracked bytes while pulling; switch it to APK counts
        pb.set_length(apks.len() as u64);
        pb.set_position(0);

        let mut artifacts = Vec::with_capacity(apks.len());
        for (index, apk) in apks.iter().enumerate() {
            pb.set_message(format!(
                "Patching {} ({}/{})",
                apk.stem(),
                index + 1,
                apks.len()
            ));
            artifacts.push(self.patch_one(apk, &out_dir, opts)?);
            pb.inc(1);
        }

        let report = PatchReport {
            package: package.to_string(),
            serial: self.device.serial().to_string(),
            artifacts,
            patched_at: Utc::now(),
        };
        report.write(&out_dir)?;

        info!(
            "patched {} ({} APKs) into {}",
            package,
            report.artifacts.len(),
            out_dir.display()
        );
        Ok(report)
    }

    /// Pull the package's APKs unless a pulled copy already exists
    ///
    /// Returns false when an existing pulled copy was reused.
    pub async fn pull_if_needed(
        &self,
        package: &str,
        pull_dir: &Path,
        force: bool,
        pb: &ProgressBar,
    ) -> Result<bool> {
        if pull_dir.exists() {
            if !force {
                debug!("reusing pulled APKs in {}", pull_dir.display());
                return Ok(false);
            }
            std::fs::remove_dir_all(pull_dir)?;
        }
        std::fs::create_dir_all(pull_dir)?;

        // A failed pull leaves no partial directory behind
        match self.pull_package(package, pull_dir, pb).await {
            Ok(()) => Ok(true),
            Err(e) => {
                let _ = std::fs::remove_dir_all(pull_dir);
                Err(e)
            }
        }
    }

    /// Pull every APK `pm path` reports for the package
    pub async fn pull_package(
        &self,
        package: &str,
        dest: &Path,
        pb: &ProgressBar,
    ) -> Result<()> {
        let remote_paths = self.device.apk_paths(package).await?;
        let mut sync = self.device.sync().await?;

        // Size the bar from stat so pull progress is meaningful
        let mut total: u64 = 0;
        for remote in &remote_paths {
            let stat = sync.stat(remote).await?;
            if !stat.exists() {
                return Err(UnpinnerError::sync(format!(
                    "Device no longer has {}",
                    remote
                )));
            }
            total += u64::from(stat.size);
        }
        pb.set_length(total);
        pb.set_position(0);

        for remote in &remote_paths {
            let file_name = remote.rsplit('/').next().unwrap_or(remote.as_str());
            let local = dest.join(file_name);
            debug!("pulling {} -> {}", remote, local.display());
            sync.pull(remote, &local, Some(pb)).await?;
        }

        sync.quit().await?;
        Ok(())
    }

    /// Decode, patch, rebuild and sign a single APK
    fn patch_one(
        &self,
        apk: &PulledApk,
        out_dir: &Path,
        opts: &PatchOptions,
    ) -> Result<PatchedArtifact> {
        let decode_dir = apk.decode_dir(out_dir);
        let repack = apk.repack_path(out_dir);
        let patched = apk.patched_path(out_dir);

        self.toolchain
            .apktool
            .decode(&apk.path, &decode_dir, apk.role.decode_resources())?;

        if apk.role.is_base() {
            if !apk::patch_manifest(&decode_dir)? {
                warn!("manifest already declares a network security config, resource left as-is");
            }
            apk::write_network_security_config(&decode_dir, self.config.patch.cleartext_traffic)?;
        }

        let force_aapt2 = opts.use_aapt2 || self.config.tools.use_aapt2;
        let aapt2_used = self
            .toolchain
            .apktool
            .build_with_fallback(&decode_dir, &repack, force_aapt2)?;

        let signed = self.toolchain.signer.sign(&repack)?;
        std::fs::rename(&signed, &patched)?;

        let keep_temp = opts.keep_temp || self.config.patch.keep_temp;
        if !keep_temp {
            std::fs::remove_file(&repack)?;
            std::fs::remove_dir_all(&decode_dir)?;
        }

        Ok(PatchedArtifact {
            name: patched
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
            role: apk.role.clone(),
            original_size: std::fs::metadata(&apk.path)?.len(),
            patched_size: std::fs::metadata(&patched)?.len(),
            original_sha256: file_sha256(&apk.path)?,
            patched_sha256: file_sha256(&patched)?,
            aapt2_used,
        })
    }

    /// Uninstall the original package and install the patched set
    ///
    /// `install-multiple` runs through the adb binary; the multi-session
    /// install protocol is not worth reimplementing here.
    pub async fn install(&self, package: &str, out_dir: &Path) -> Result<()> {
        let patched = patched_files(out_dir)?;
        if patched.is_empty() {
            return Err(UnpinnerError::Install(format!(
                "No patched APKs in {}, run `unpinner patch` first",
                out_dir.display()
            )));
        }

        info!("uninstalling {}", package);
        self.device.uninstall(package).await?;

        let mut cmd = Command::new("adb");
        cmd.arg("-H").arg(&self.config.adb.host);
        cmd.arg("-P").arg(self.config.adb.port.to_string());
        cmd.arg("-s").arg(self.device.serial());
        cmd.arg("install-multiple");
        for apk in &patched {
            cmd.arg(apk);
        }

        debug!("adb install: {:?}", cmd);
        let output = cmd.output().map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                UnpinnerError::Install("adb binary not found in PATH".into())
            } else {
                UnpinnerError::Io(e)
            }
        })?;

        if !output.status.success() {
            return Err(UnpinnerError::Install(crate::tools::describe_failure(
                &output,
            )));
        }

        info!("installed {} patched APKs", patched.len());
        Ok(())
    }
}

/// Collect the pulled APKs in a directory
pub fn collect_apks(dir: &Path) -> Result<Vec<PulledApk>> {
    let mut apks: Vec<PulledApk> = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().map_or(false, |t| t.is_file()))
        .filter_map(|entry| PulledApk::from_path(entry.path()))
        .collect();

    if apks.is_empty() {
        return Err(UnpinnerError::Other(format!(
            "No APKs found in {}, re-pull with --force-pull",
            dir.display()
        )));
    }

    apks.sort_by(|a, b| a.path.cmp(&b.path));
    Ok(apks)
}

/// List the `*_patched.apk` artifacts in an output directory
pub fn patched_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| {
            path.file_name()
                .and_then(|n| n.to_str())
                .map_or(false, |n| n.ends_with("_patched.apk"))
        })
        .collect();

    files.sort();
    Ok(files)
}

/// SHA-256 digest of a file, hex encoded
pub fn file_sha256(path: &Path) -> Result<String> {
    let mut file = std::fs::File::open(path)?;
    let mut hasher = Sha256::new();
    std::io::copy(&mut file, &mut hasher)?;
    Ok(hex::encode(hasher.finalize()))
}
