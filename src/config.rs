//! Configuration management for unpinner

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{Result, UnpinnerError};

/// Jar apktool is looked up as under the utils directory
pub const APKTOOL_JAR: &str = "apktool_2.6.1.jar";

/// Jar uber-apk-signer is looked up as under the utils directory
pub const SIGNER_JAR: &str = "uber-apk-signer-1.2.1.jar";

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// General settings
    #[serde(default)]
    pub general: GeneralConfig,

    /// ADB server settings
    #[serde(default)]
    pub adb: AdbConfig,

    /// External tool settings
    #[serde(default)]
    pub tools: ToolsConfig,

    /// Patching settings
    #[serde(default)]
    pub patch: PatchConfig,

    /// Network settings
    #[serde(default)]
    pub network: NetworkConfig,

    /// Logging settings
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// General configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Workspace root holding the packages/, patched/ and utils/ directories
    pub workspace_dir: Option<PathBuf>,
    /// Override for the pulled-packages directory
    pub packages_dir: Option<PathBuf>,
    /// Override for the patched-output directory
    pub patched_dir: Option<PathBuf>,
    /// Override for the utilities directory
    pub utils_dir: Option<PathBuf>,
    /// Automatically accept prompts
    pub auto_yes: bool,
}

/// ADB server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdbConfig {
    /// ADB server host
    pub host: String,
    /// ADB server port
    pub port: u16,
    /// Connection timeout in seconds
    pub connect_timeout: u64,
}

/// External tool configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolsConfig {
    /// Java launcher used to run the jars
    pub java: String,
    /// Path to the apktool jar (default: utils dir)
    pub apktool_jar: Option<PathBuf>,
    /// Path to the uber-apk-signer jar (default: utils dir)
    pub signer_jar: Option<PathBuf>,
    /// Always build with aapt2 instead of falling back to it
    pub use_aapt2: bool,
}

/// Patching configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatchConfig {
    /// Permit cleartext traffic in the generated network security config
    pub cleartext_traffic: bool,
    /// Keep decode trees and intermediate artifacts
    pub keep_temp: bool,
}

/// Network configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// HTTP timeout in seconds
    pub timeout: u64,
    /// Download URL for the apktool jar
    pub apktool_url: String,
    /// Download URL for the uber-apk-signer jar
    pub signer_url: String,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level
    pub level: String,
    /// Enable colored output
    pub color: bool,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            workspace_dir: None,
            packages_dir: None,
            patched_dir: None,
            utils_dir: None,
            auto_yes: false,
        }
    }
}

impl Default for AdbConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 5037,
            connect_timeout: 10,
        }
    }
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            java: "java".to_string(),
            apktool_jar: None,
            signer_jar: None,
            use_aapt2: false,
        }
    }
}

impl Default for PatchConfig {
    fn default() -> Self {
        Self {
            cleartext_traffic: true,
            keep_temp: false,
        }
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            timeout: 30,
            apktool_url: format!(
                "https://github.com/iBotPeaches/Apktool/releases/download/v2.6.1/{}",
                APKTOOL_JAR
            ),
            signer_url: format!(
                "https://github.com/patrickfav/uber-apk-signer/releases/download/v1.2.1/{}",
                SIGNER_JAR
            ),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            color: true,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            general: GeneralConfig::default(),
            adb: AdbConfig::default(),
            tools: ToolsConfig::default(),
            patch: PatchConfig::default(),
            network: NetworkConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Config {
    /// Get the config file path
    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| UnpinnerError::Config("Could not find config directory".into()))?;
        Ok(config_dir.join("unpinner").join("config.toml"))
    }

    /// Load configuration from file
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load configuration from an explicit path, falling back to the default
    pub fn load_from(path: Option<&std::path::Path>) -> Result<Self> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => Self::config_path()?,
        };

        if path.exists() {
            let content = std::fs::read_to_string(&path)?;
            let config: Config = toml::from_str(&content)?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to file
    pub fn save(&self) -> Result<()> {
        let path = Self::config_path()?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content =
            toml::to_string_pretty(self).map_err(|e| UnpinnerError::Config(e.to_string()))?;
        std::fs::write(&path, content)?;

        Ok(())
    }

    /// Reset configuration to defaults
    pub fn reset() -> Result<()> {
        let config = Self::default();
        config.save()
    }

    /// Initialize configuration file
    pub fn init(force: bool) -> Result<()> {
        let path = Self::config_path()?;

        if path.exists() && !force {
            return Err(UnpinnerError::Config(
                "Configuration file already exists. Use --force to overwrite.".into(),
            ));
        }

        let config = Self::default();
        config.save()
    }

    /// Get a configuration value by key
    pub fn get(&self, key: &str) -> Option<String> {
        match key {
            "general.workspace_dir" => self
                .general
                .workspace_dir
                .as_ref()
                .map(|p| p.display().to_string()),
            "general.packages_dir" => self
                .general
                .packages_dir
                .as_ref()
                .map(|p| p.display().to_string()),
            "general.patched_dir" => self
                .general
                .patched_dir
                .as_ref()
                .map(|p| p.display().to_string()),
            "general.utils_dir" => self
                .general
                .utils_dir
                .as_ref()
                .map(|p| p.display().to_string()),
            "general.auto_yes" => Some(self.general.auto_yes.to_string()),

            "adb.host" => Some(self.adb.host.clone()),
            "adb.port" => Some(self.adb.port.to_string()),
            "adb.connect_timeout" => Some(self.adb.connect_timeout.to_string()),

            "tools.java" => Some(self.tools.java.clone()),
            "tools.apktool_jar" => self
                .tools
                .apktool_jar
                .as_ref()
                .map(|p| p.display().to_string()),
            "tools.signer_jar" => self
                .tools
                .signer_jar
                .as_ref()
                .map(|p| p.display().to_string()),
            "tools.use_aapt2" => Some(self.tools.use_aapt2.to_string()),

            "patch.cleartext_traffic" => Some(self.patch.cleartext_traffic.to_string()),
            "patch.keep_temp" => Some(self.patch.keep_temp.to_string()),

            "network.timeout" => Some(self.network.timeout.to_string()),
            "network.apktool_url" => Some(self.network.apktool_url.clone()),
            "network.signer_url" => Some(self.network.signer_url.clone()),

            "logging.level" => Some(self.logging.level.clone()),
            "logging.color" => Some(self.logging.color.to_string()),

            _ => None,
        }
    }

    /// Set a configuration value by key
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "general.workspace_dir" => {
                self.general.workspace_dir = Some(PathBuf::from(value));
            }
            "general.packages_dir" => {
                self.general.packages_dir = Some(PathBuf::from(value));
            }
            "general.patched_dir" => {
                self.general.patched_dir = Some(PathBuf::from(value));
            }
            "general.utils_dir" => {
                self.general.utils_dir = Some(PathBuf::from(value));
            }
            "general.auto_yes" => {
                self.general.auto_yes = value
                    .parse()
                    .map_err(|_| UnpinnerError::Config("Invalid boolean for auto_yes".into()))?;
            }

            "adb.host" => {
                self.adb.host = value.to_string();
            }
            "adb.port" => {
                self.adb.port = value
                    .parse()
                    .map_err(|_| UnpinnerError::Config("Invalid port number".into()))?;
            }
            "adb.connect_timeout" => {
                self.adb.connect_timeout = value.parse().map_err(|_| {
                    UnpinnerError::Config("Invalid number for connect_timeout".into())
                })?;
            }

            "tools.java" => {
                self.tools.java = value.to_string();
            }
            "tools.apktool_jar" => {
                self.tools.apktool_jar = if value.is_empty() {
                    None
                } else {
                    Some(PathBuf::from(value))
                };
            }
            "tools.signer_jar" => {
                self.tools.signer_jar = if value.is_empty() {
                    None
                } else {
                    Some(PathBuf::from(value))
                };
            }
            "tools.use_aapt2" => {
                self.tools.use_aapt2 = value
                    .parse()
                    .map_err(|_| UnpinnerError::Config("Invalid boolean for use_aapt2".into()))?;
            }

            "patch.cleartext_traffic" => {
                self.patch.cleartext_traffic = value.parse().map_err(|_| {
                    UnpinnerError::Config("Invalid boolean for cleartext_traffic".into())
                })?;
            }
            "patch.keep_temp" => {
                self.patch.keep_temp = value
                    .parse()
                    .map_err(|_| UnpinnerError::Config("Invalid boolean for keep_temp".into()))?;
            }

            "network.timeout" => {
                self.network.timeout = value
                    .parse()
                    .map_err(|_| UnpinnerError::Config("Invalid number for timeout".into()))?;
            }
            "network.apktool_url" => {
                self.network.apktool_url = value.to_string();
            }
            "network.signer_url" => {
                self.network.signer_url = value.to_string();
            }

            "logging.level" => {
                self.logging.level = value.to_string();
            }
            "logging.color" => {
                self.logging.color = value
                    .parse()
                    .map_err(|_| UnpinnerError::Config("Invalid boolean for color".into()))?;
            }

            _ => {
                return Err(UnpinnerError::Config(format!(
                    "Unknown configuration key: {}",
                    key
                )));
            }
        }

        Ok(())
    }

    /// Get the workspace root directory
    pub fn workspace_dir(&self) -> PathBuf {
        self.general
            .workspace_dir
            .clone()
            .unwrap_or_else(|| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")))
    }

    /// Get the pulled-packages directory
    pub fn packages_dir(&self) -> PathBuf {
        self.general
            .packages_dir
            .clone()
            .unwrap_or_else(|| self.workspace_dir().join("packages"))
    }

    /// Get the patched-output directory
    pub fn patched_dir(&self) -> PathBuf {
        self.general
            .patched_dir
            .clone()
            .unwrap_or_else(|| self.workspace_dir().join("patched"))
    }

    /// Get the utilities directory holding the tool jars
    pub fn utils_dir(&self) -> PathBuf {
        self.general
            .utils_dir
            .clone()
            .unwrap_or_else(|| self.workspace_dir().join("utils"))
    }

    /// Resolved path to the apktool jar
    pub fn apktool_jar(&self) -> PathBuf {
        self.tools
            .apktool_jar
            .clone()
            .unwrap_or_else(|| self.utils_dir().join(APKTOOL_JAR))
    }

    /// Resolved path to the uber-apk-signer jar
    pub fn signer_jar(&self) -> PathBuf {
        self.tools
            .signer_jar
            .clone()
            .unwrap_or_else(|| self.utils_dir().join(SIGNER_JAR))
    }

    /// Create the standard workspace directories if they are missing
    pub fn ensure_layout(&self) -> Result<()> {
        for dir in [self.packages_dir(), self.patched_dir(), self.utils_dir()] {
            std::fs::create_dir_all(&dir)?;
        }
        Ok(())
    }
}
