//! Error types for unpinner

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for unpinner operations
#[derive(Error, Debug)]
pub enum UnpinnerError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Walkdir error: {0}")]
    WalkDir(#[from] walkdir::Error),

    #[error("ADB protocol error: {0}")]
    Protocol(String),

    #[error("ADB server refused request: {0}")]
    Adb(String),

    #[error("Sync transfer failed: {0}")]
    Sync(String),

    #[error("No devices connected to the ADB server")]
    NoDevices,

    #[error("Multiple devices connected, pick one with --serial")]
    MultipleDevices,

    #[error("Device not found: {0}")]
    DeviceNotFound(String),

    #[error("Package not installed on device: {0}")]
    PackageNotFound(String),

    #[error("Failed to patch AndroidManifest.xml: {0}")]
    Manifest(String),

    #[error("Apktool decode failed: {0}")]
    Unpack(String),

    #[error("Apktool build failed: {0}")]
    Repack(String),

    #[error("Signing failed: {0}")]
    Signing(String),

    #[error("Install failed: {0}")]
    Install(String),

    #[error("Uninstall failed: {0}")]
    Uninstall(String),

    #[error("Tool not found: {path} (run `unpinner setup` or set its path in the config)")]
    ToolMissing { path: PathBuf },

    #[error("File not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Regex error: {0}")]
    Regex(#[from] regex::Error),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{0}")]
    Other(String),
}

/// Result type alias for unpinner operations
pub type Result<T> = std::result::Result<T, UnpinnerError>;

impl UnpinnerError {
    /// Create a new protocol error
    pub fn protocol(msg: impl Into<String>) -> Self {
        Self::Protocol(msg.into())
    }

    /// Create a new sync transfer error
    pub fn sync(msg: impl Into<String>) -> Self {
        Self::Sync(msg.into())
    }

    /// Create a new manifest patching error
    pub fn manifest(msg: impl Into<String>) -> Self {
        Self::Manifest(msg.into())
    }

    /// Create a file not found error
    pub fn file_not_found(path: impl Into<PathBuf>) -> Self {
        Self::FileNotFound { path: path.into() }
    }

    /// Create a missing tool error
    pub fn tool_missing(path: impl Into<PathBuf>) -> Self {
        Self::ToolMissing { path: path.into() }
    }
}
