//! Apktool invocation (decode and rebuild)

use std::path::{Path, PathBuf};
use std::process::Command;

use tracing::debug;

use crate::error::{Result, UnpinnerError};

use super::describe_failure;

/// Wrapper around an apktool jar
pub struct Apktool {
    java: String,
    jar: PathBuf,
}

impl Apktool {
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

    fn command(&self) -> Command {
        let mut cmd = Command::new(&self.java);
        cmd.arg("-jar").arg(&self.jar);
        cmd
    }

    /// Decode an APK into a directory
    ///
    /// Sources are never decoded (`-s`); resource decoding is skipped for
    /// split APKs (`-r`), whose resource tables do not rebuild standalone.
    pub fn decode(&self, apk: &Path, out_dir: &Path, decode_resources: bool) -> Result<()> {
        let mut cmd = self.command();
        cmd.arg("d").arg(apk).arg("-o").arg(out_dir).arg("-s");
        if !decode_resources {
            cmd.arg("-r");
        }

        debug!("apktool decode: {:?}", cmd);
        let output = cmd.output()?;
        if !output.status.success() {
            return Err(UnpinnerError::Unpack(format!(
                "{}: {}",
                apk.display(),
                describe_failure(&output)
            )));
        }
        Ok(())
    }

    /// Rebuild a decoded directory into an APK
    pub fn build(&self, dir: &Path, out_apk: &Path, use_aapt2: bool) -> Result<()> {
        let mut cmd = self.command();
        cmd.arg("b").arg(dir).arg("-o").arg(out_apk);
        if use_aapt2 {
            cmd.arg("--use-aapt2");
        }

        debug!("apktool build: {:?}", cmd);
        let output = cmd.output()?;
        if !output.status.success() {
            return Err(UnpinnerError::Repack(format!(
                "{}: {}",
                dir.display(),
                describe_failure(&output)
            )));
        }
        Ok(())
    }

    /// Rebuild, retrying once with aapt2 when the plain build fails
    ///
    /// Returns true if aapt2 ended up being used.
    pub fn build_with_fallback(&self, dir: &Path, out_apk: &Path, force_aapt2: bool) -> Result<bool> {
        if force_aapt2 {
            self.build(dir, out_apk, true)?;
            return Ok(true);
        }

        match self.build(dir, out_apk, false) {
            Ok(()) => Ok(false),
            Err(first) => {
                debug!("plain build failed, retrying with aapt2: {}", first);
                self.build(dir, out_apk, true)?;
                Ok(true)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_missing_jar() {
        let apktool = Apktool::new("java", "/nonexistent/apktool.jar");
        assert!(matches!(
            apktool.check(),
            Err(UnpinnerError::ToolMissing { .. })
        ));
    }

    #[test]
    fn test_check_present_jar() {
        let temp = tempfile::TempDir::new().unwrap();
        let jar = temp.path().join("apktool.jar");
        std::fs::write(&jar, b"").unwrap();

        assert!(Apktool::new("java", &jar).check().is_ok());
    }

    #[test]
    fn test_decode_with_missing_launcher() {
        // A launcher that cannot be spawned surfaces as an IO error, not a panic
        let apktool = Apktool::new("/nonexistent/java", "/nonexistent/apktool.jar");
        let temp = tempfile::TempDir::new().unwrap();

        let result = apktool.decode(&temp.path().join("a.apk"), &temp.path().join("out"), true);
        assert!(result.is_err());
    }
}
