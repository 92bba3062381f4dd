//! Tool jar downloads for `unpinner setup`

use std::path::{Path, PathBuf};
use std::time::Duration;

use reqwest::Client;
use tracing::info;

use crate::config::Config;
use crate::error::{Result, UnpinnerError};

/// Downloads the tool jars into the utils directory
pub struct ToolFetcher {
    client: Client,
    utils_dir: PathBuf,
}

impl ToolFetcher {
    /// Create a fetcher from configuration
    pub fn new(config: &Config) -> Self {
        let client = Client::builder()
            .user_agent(format!("{}/{}", crate::NAME, crate::VERSION))
            .timeout(Duration::from_secs(config.network.timeout))
            .build()
            .unwrap_or_default();

        Self {
            client,
            utils_dir: config.utils_dir(),
        }
    }

    /// Fetch both jars, returning the paths that were written
    ///
    /// Existing jars are kept unless `force` is set.
    pub async fn fetch_all(&self, config: &Config, force: bool) -> Result<Vec<PathBuf>> {
        let targets = [
            (config.network.apktool_url.as_str(), config.apktool_jar()),
            (config.network.signer_url.as_str(), config.signer_jar()),
        ];

        let mut written = Vec::new();
        for (url, dest) in targets {
            if self.fetch(url, &dest, force).await? {
                written.push(dest);
            }
        }

        Ok(written)
    }

    /// Download one jar, atomically via a temp file in the same directory
    ///
    /// Returns false when an existing file was kept.
    pub async fn fetch(&self, url: &str, dest: &Path, force: bool) -> Result<bool> {
        if dest.exists() && !force {
            info!("keeping existing {}", dest.display());
            return Ok(false);
        }

        std::fs::create_dir_all(&self.utils_dir)?;

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| UnpinnerError::Network(e.to_string()))?;

        if !response.status().is_success() {
            return Err(UnpinnerError::Network(format!(
                "Download of {} failed: {}",
                url,
                response.status()
            )));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| UnpinnerError::Network(e.to_string()))?;

        let temp = tempfile::NamedTempFile::new_in(&self.utils_dir)?;
        std::fs::write(temp.path(), &bytes)?;
        temp.persist(dest)
            .map_err(|e| UnpinnerError::Other(format!("Could not place {}: {}", dest.display(), e)))?;

        info!("downloaded {} ({} bytes)", dest.display(), bytes.len());
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_existing_jar_kept_without_force() {
        let temp = tempfile::TempDir::new().unwrap();
        let mut config = Config::default();
        config.general.workspace_dir = Some(temp.path().to_path_buf());

        let dest = config.apktool_jar();
        std::fs::create_dir_all(dest.parent().unwrap()).unwrap();
        std::fs::write(&dest, b"jar").unwrap();

        let fetcher = ToolFetcher::new(&config);
        let rt = tokio::runtime::Runtime::new().unwrap();
        // URL is never contacted because the file exists and force is off
        let kept = rt
            .block_on(fetcher.fetch("http://127.0.0.1:1/apktool.jar", &dest, false))
            .unwrap();

        assert!(!kept);
        assert_eq!(std::fs::read(&dest).unwrap(), b"jar");
    }
}
