//! APK artifact naming and roles

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Role of an APK within an installed package
///
/// App bundle installs ship a `base.apk` plus zero or more split APKs
/// (configuration and dynamic-feature splits). Only the base carries the
/// manifest and resources this tool patches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ApkRole {
    /// The base APK (manifest, resources)
    Base,
    /// A split APK, identified by its file stem
    Split(String),
}

impl ApkRole {
    /// Derive the role from an APK file stem
    pub fn from_stem(stem: &str) -> Self {
        if stem == "base" {
            Self::Base
        } else {
            Self::Split(stem.to_string())
        }
    }

    /// Whether this is the base APK
    pub fn is_base(&self) -> bool {
        matches!(self, Self::Base)
    }

    /// Whether apktool should decode resources for this APK
    ///
    /// Splits are rebuilt without resource decoding (`-r`); decoding split
    /// resource tables breaks the rebuild.
    pub fn decode_resources(&self) -> bool {
        self.is_base()
    }
}

impl fmt::Display for ApkRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Base => write!(f, "base"),
            Self::Split(name) => write!(f, "{}", name),
        }
    }
}

/// An APK pulled from a device, with its derived artifact names
#[derive(Debug, Clone)]
pub struct PulledApk {
    /// Path to the pulled APK on the host
    pub path: PathBuf,
    /// Role within the package
    pub role: ApkRole,
}

impl PulledApk {
    /// Build from a pulled file path; returns None for non-APK files
    pub fn from_path(path: impl Into<PathBuf>) -> Option<Self> {
        let path = path.into();
        if path.extension().map_or(true, |ext| ext != "apk") {
            return None;
        }
        let stem = path.file_stem()?.to_str()?.to_string();
        Some(Self {
            role: ApkRole::from_stem(&stem),
            path,
        })
    }

    /// File stem of the pulled APK
    pub fn stem(&self) -> &str {
        self.path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("apk")
    }

    /// Directory the APK is decoded into
    pub fn decode_dir(&self, out_dir: &Path) -> PathBuf {
        out_dir.join(self.stem())
    }

    /// Path of the unsigned rebuilt APK
    pub fn repack_path(&self, out_dir: &Path) -> PathBuf {
        out_dir.join(format!("{}.repack.apk", self.stem()))
    }

    /// Path uber-apk-signer writes the signed APK to
    pub fn signed_path(&self, out_dir: &Path) -> PathBuf {
        out_dir.join(format!("{}.repack-aligned-debugSigned.apk", self.stem()))
    }

    /// Final patched artifact path
    pub fn patched_path(&self, out_dir: &Path) -> PathBuf {
        out_dir.join(format!("{}_patched.apk", self.stem()))
    }
}

/// Sort pulled APKs so the base is processed first, splits in name order
pub fn sort_for_patching(apks: &mut [PulledApk]) {
    apks.sort_by_key(|apk| match &apk.role {
        ApkRole::Base => (0, String::new()),
        ApkRole::Split(name) => (1, name.clone()),
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_from_stem() {
        assert_eq!(ApkRole::from_stem("base"), ApkRole::Base);
        assert_eq!(
            ApkRole::from_stem("split_config.arm64_v8a"),
            ApkRole::Split("split_config.arm64_v8a".into())
        );
    }

    #[test]
    fn test_decode_resources() {
        assert!(ApkRole::Base.decode_resources());
        assert!(!ApkRole::Split("split_config.en".into()).decode_resources());
    }

    #[test]
    fn test_artifact_names() {
        let apk = PulledApk::from_path("/tmp/pkg/base.apk").unwrap();
        let out = Path::new("/tmp/out");

        assert!(apk.role.is_base());
        assert_eq!(apk.decode_dir(out), Path::new("/tmp/out/base"));
        assert_eq!(apk.repack_path(out), Path::new("/tmp/out/base.repack.apk"));
        assert_eq!(
            apk.signed_path(out),
            Path::new("/tmp/out/base.repack-aligned-debugSigned.apk")
        );
        assert_eq!(apk.patched_path(out), Path::new("/tmp/out/base_patched.apk"));
    }

    #[test]
    fn test_non_apk_rejected() {
        assert!(PulledApk::from_path("/tmp/pkg/notes.txt").is_none());
        assert!(PulledApk::from_path("/tmp/pkg/dir").is_none());
    }

    #[test]
    fn test_sort_base_first() {
        let mut apks = vec![
            PulledApk::from_path("/p/split_config.en.apk").unwrap(),
            PulledApk::from_path("/p/base.apk").unwrap(),
            PulledApk::from_path("/p/split_config.arm64_v8a.apk").unwrap(),
        ];
        sort_for_patching(&mut apks);

        assert!(apks[0].role.is_base());
        assert_eq!(apks[1].stem(), "split_config.arm64_v8a");
        assert_eq!(apks[2].stem(), "split_config.en");
    }
}
