//! Wrappers for the Java-hosted APK tools

mod apktool;
mod fetch;
mod signer;

pub use apktool::Apktool;
pub use fetch::ToolFetcher;
pub use signer::ApkSigner;

use std::process::{Command, Output};

use crate::config::Config;
use crate::error::{Result, UnpinnerError};

/// The resolved toolchain for a patch run
pub struct Toolchain {
    /// Apktool wrapper
    pub apktool: Apktool,
    /// uber-apk-signer wrapper
    pub signer: ApkSigner,
    java: String,
}

impl Toolchain {
    /// Resolve tool paths from configuration
    pub fn from_config(config: &Config) -> Self {
        Self {
            apktool: Apktool::new(config.tools.java.as_str(), config.apktool_jar()),
            signer: ApkSigner::new(config.tools.java.as_str(), config.signer_jar()),
            java: config.tools.java.clone(),
        }
    }

    /// Verify the launcher and both jars before any device work
    pub fn check(&self) -> Result<()> {
        check_java(&self.java)?;
        self.apktool.check()?;
        self.signer.check()?;
        Ok(())
    }
}

/// Check that the Java launcher runs at all
fn check_java(java: &str) -> Result<()> {
    let status = Command::new(java)
        .arg("-version")
        .output()
        .map_err(|_| UnpinnerError::Other(format!("Java launcher not found: {}", java)))?;

    if !status.status.success() {
        return Err(UnpinnerError::Other(format!(
            "Java launcher check failed: {}",
            java
        )));
    }
    Ok(())
}

/// Summarize a failed child process for an error message
pub(crate) fn describe_failure(output: &Output) -> String {
    let stderr = String::from_utf8_lossy(&output.stderr);
    let detail = stderr.trim();

    if detail.is_empty() {
        format!("exit status {}", output.status)
    } else {
        // Last few lines carry the actual error for both tools
        let tail: Vec<&str> = detail.lines().rev().take(4).collect();
        let tail: Vec<&str> = tail.into_iter().rev().collect();
        format!("{} ({})", tail.join(" | "), output.status)
    }
}
