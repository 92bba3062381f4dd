//! uber-apk-signer invocation

use std::path::{Path, PathBuf};
use std::process::Command;

use tracing::debug;

use crate::error::{Result, UnpinnerError};

use super::describe_failure;

/// Wrapper around an uber-apk-signer jar
pub struct ApkSigner {
    java: String,
    jar: PathBuf,
}

impl ApkSigner {
    /// Create a wrapper for the given launcher and jar
    pub fn new(java: impl Into<String>, jar: impl Into<PathBuf>) -> Self {
        Self {
            java: java.into(),
            jar: jar.into(),
        }
    }

    /// Path to the jar
    pub fn jar(&self) -> &Path {
        &self.jar
    }

    /// Verify the jar is present
    pub fn check(&self) -> Result<()> {
        if !self.jar.exists() {
            return Err(UnpinnerError::tool_missing(&self.jar));
        }
        Ok(())
    }

    /// Path the signer writes its zipaligned, debug-signed output to
    pub fn signed_output(apk: &Path) -> PathBuf {
        let stem = apk
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("signed");
        apk.with_file_name(format!("{}-aligned-debugSigned.apk", stem))
    }

    /// Sign an APK with the debug keystore, returning the signed path
    pub fn sign(&self, apk: &Path) -> Result<PathBuf> {
        let mut cmd = Command::new(&self.java);
        cmd.arg("-jar").arg(&self.jar).arg("-a").arg(apk);

        debug!("uber-apk-signer: {:?}", cmd);
        let output = cmd.output()?;
        if !output.status.success() {
            return Err(UnpinnerError::Signing(format!(
                "{}: {}",
                apk.display(),
                describe_failure(&output)
            )));
        }

        let signed = Self::signed_output(apk);
        if !signed.exists() {
            return Err(UnpinnerError::Signing(format!(
                "Signer exited cleanly but {} was not created",
                signed.display()
            )));
        }

        Ok(signed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signed_output_name() {
        let signed = ApkSigner::signed_output(Path::new("/out/base.repack.apk"));
        assert_eq!(
            signed,
            Path::new("/out/base.repack-aligned-debugSigned.apk")
        );
    }

    #[test]
    fn test_check_missing_jar() {
        let signer = ApkSigner::new("java", "/nonexistent/signer.jar");
        assert!(matches!(
            signer.check(),
            Err(UnpinnerError::ToolMissing { .. })
        ));
    }
}
