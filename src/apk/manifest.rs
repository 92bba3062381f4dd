//! AndroidManifest.xml patching
//!
//! Injects `android:networkSecurityConfig` into the `<application>`
//! element by splicing the attribute into the existing tag, leaving the
//! rest of the document byte-for-byte intact.

use std::path::Path;

use regex::Regex;

use crate::error::{Result, UnpinnerError};

/// Attribute that points the app at the injected config resource
const NETWORK_SECURITY_ATTR: &str =
    r#"android:networkSecurityConfig="@xml/network_security_config""#;

lazy_static::lazy_static! {
    static ref APPLICATION_TAG: Regex =
        Regex::new(r"<application(\s[^>]*)?>").unwrap();
}

/// Patch the manifest inside a decoded APK tree
///
/// Returns true if the file was rewritten, false if the application
/// element already declared a network security config.
pub fn patch_manifest(unpacked_dir: &Path) -> Result<bool> {
    let manifest_path = unpacked_dir.join("AndroidManifest.xml");

    if !manifest_path.exists() {
        return Err(UnpinnerError::file_not_found(manifest_path));
    }

    let content = std::fs::read_to_string(&manifest_path)?;
    match inject_attribute(&content)? {
        Some(patched) => {
            std::fs::write(&manifest_path, patched)?;
            Ok(true)
        }
        None => Ok(false),
    }
}

/// Splice the attribute into the `<application>` tag
///
/// Returns None when the attribute is already declared (whatever resource
/// it points at is left alone).
fn inject_attribute(manifest: &str) -> Result<Option<String>> {
    let tag = APPLICATION_TAG
        .find(manifest)
        .ok_or_else(|| UnpinnerError::manifest("No <application> element in manifest"))?;

    if tag.as_str().contains("android:networkSecurityConfig") {
        return Ok(None);
    }

    // Insert before the closing ">" (or "/>" for a childless application)
    let insert_at = if tag.as_str().ends_with("/>") {
        tag.end() - 2
    } else {
        tag.end() - 1
    };

    let mut patched = String::with_capacity(manifest.len() + NETWORK_SECURITY_ATTR.len() + 1);
    patched.push_str(&manifest[..insert_at]);
    if !patched.ends_with(char::is_whitespace) {
        patched.push(' ');
    }
    patched.push_str(NETWORK_SECURITY_ATTR);
    patched.push_str(&manifest[insert_at..]);

    Ok(Some(patched))
}

#[cfg(test)]
mod tests {
    use super::*;

    const MANIFEST: &str = r#"<?xml version="1.0" encoding="utf-8" standalone="no"?>
<manifest xmlns:android="http://schemas.android.com/apk/res/android" package="com.example.app">
    <application android:allowBackup="true" android:label="@string/app_name">
        <activity android:name=".MainActivity"/>
    </application>
</manifest>
"#;

    #[test]
    fn test_inject_adds_attribute() {
        let patched = inject_attribute(MANIFEST).unwrap().unwrap();

        assert!(patched.contains(
            r#"android:networkSecurityConfig="@xml/network_security_config""#
        ));
        // The rest of the document is untouched
        assert!(patched.starts_with("<?xml version=\"1.0\""));
        assert!(patched.contains(r#"<activity android:name=".MainActivity"/>"#));
    }

    #[test]
    fn test_existing_attribute_left_alone() {
        let manifest = MANIFEST.replace(
            "android:allowBackup=\"true\"",
            "android:networkSecurityConfig=\"@xml/custom\" android:allowBackup=\"true\"",
        );

        assert!(inject_attribute(&manifest).unwrap().is_none());
    }

    #[test]
    fn test_bare_application_tag() {
        let manifest = "<manifest><application></application></manifest>";
        let patched = inject_attribute(manifest).unwrap().unwrap();

        assert_eq!(
            patched,
            format!(
                "<manifest><application {}></application></manifest>",
                r#"android:networkSecurityConfig="@xml/network_security_config""#
            )
        );
    }

    #[test]
    fn test_self_closing_application_tag() {
        let manifest = "<manifest><application android:label=\"x\"/></manifest>";
        let patched = inject_attribute(manifest).unwrap().unwrap();

        assert!(patched.contains(
            r#"android:label="x" android:networkSecurityConfig="@xml/network_security_config"/>"#
        ));
    }

    #[test]
    fn test_missing_application_element() {
        let err = inject_attribute("<manifest></manifest>").unwrap_err();
        assert!(matches!(err, UnpinnerError::Manifest(_)));
    }

    #[test]
    fn test_patch_rewrites_file() {
        let temp = tempfile::TempDir::new().unwrap();
        std::fs::write(temp.path().join("AndroidManifest.xml"), MANIFEST).unwrap();

        assert!(patch_manifest(temp.path()).unwrap());
        let content =
            std::fs::read_to_string(temp.path().join("AndroidManifest.xml")).unwrap();
        assert!(content.contains("android:networkSecurityConfig"));

        // Second run is a no-op
        assert!(!patch_manifest(temp.path()).unwrap());
    }

    #[test]
    fn test_patch_missing_manifest() {
        let temp = tempfile::TempDir::new().unwrap();
        assert!(matches!(
            patch_manifest(temp.path()),
            Err(UnpinnerError::FileNotFound { .. })
        ));
    }
}
