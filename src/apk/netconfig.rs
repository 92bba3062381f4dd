//! Network security config generation

use std::path::{Path, PathBuf};

use crate::error::Result;

/// Resource file name the manifest attribute points at
pub const NETWORK_SECURITY_CONFIG_FILE: &str = "network_security_config.xml";

/// Render the network security config document
///
/// Debug overrides trust user certificates; the base config trusts both
/// system and user anchors so a proxy CA installed in the user store is
/// accepted by the patched app.
pub fn render_network_security_config(cleartext_traffic: bool) -> String {
    format!(
        r#"<?xml version="1.0" encoding="utf-8"?>
<network-security-config>
    <debug-overrides>
        <trust-anchors>
            <certificates src="user" />
        </trust-anchors>
    </debug-overrides>
    <base-config cleartextTrafficPermitted="{}">
        <trust-anchors>
            <certificates src="system" />
            <certificates src="user" />
        </trust-anchors>
    </base-config>
</network-security-config>
"#,
        cleartext_traffic
    )
}

/// Write the config into a decoded APK tree, creating `res/xml/` if needed
pub fn write_network_security_config(
    unpacked_dir: &Path,
    cleartext_traffic: bool,
) -> Result<PathBuf> {
    let xml_dir = unpacked_dir.join("res").join("xml");
    std::fs::create_dir_all(&xml_dir)?;

    let path = xml_dir.join(NETWORK_SECURITY_CONFIG_FILE);
    std::fs::write(&path, render_network_security_config(cleartext_traffic))?;

    Ok(path)
}
