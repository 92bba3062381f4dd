//! Device-bound ADB services

use crate::error::{Result, UnpinnerError};

use super::client::AdbClient;
use super::sync::SyncClient;
use super::transport::Transport;

/// A device selected on an ADB server
#[derive(Debug, Clone)]
pub struct AdbDevice {
    client: AdbClient,
    serial: String,
}

impl AdbDevice {
    pub(crate) fn new(client: AdbClient, serial: String) -> Self {
        Self { client, serial }
    }

    /// Device serial number
    pub fn serial(&self) -> &str {
        &self.serial
    }

    /// Open a connection bound to this device running the given service
    async fn open(&self, service: &str) -> Result<Transport> {
        let mut transport = self.client.connect().await?;
        transport
            .request(&format!("host:transport:{}", self.serial))
            .await?;
        transport.request(service).await?;
        Ok(transport)
    }

    /// Run a shell command and collect its output
    pub async fn shell(&self, command: &str) -> Result<String> {
        let mut transport = self.open(&format!("shell:{}", command)).await?;
        transport.read_to_end_string().await
    }

    /// Remote paths of every APK belonging to a package
    ///
    /// Parses `pm path` output (`package:/data/app/.../base.apk` lines).
    pub async fn apk_paths(&self, package: &str) -> Result<Vec<String>> {
        let output = self.shell(&format!("pm path {}", package)).await?;

        let paths: Vec<String> = output
            .lines()
            .filter_map(|line| line.trim().strip_prefix("package:"))
            .map(|path| path.to_string())
            .collect();

        if paths.is_empty() {
            return Err(UnpinnerError::PackageNotFound(package.to_string()));
        }

        Ok(paths)
    }

    /// Names of all packages installed on the device
    pub async fn list_packages(&self) -> Result<Vec<String>> {
        let output = self.shell("pm list packages").await?;

        Ok(output
            .lines()
            .filter_map(|line| line.trim().strip_prefix("package:"))
            .map(|name| name.to_string())
            .collect())
    }

    /// Uninstall a package
    pub async fn uninstall(&self, package: &str) -> Result<()> {
        let output = self.shell(&format!("pm uninstall {}", package)).await?;

        if output.contains("Success") {
            Ok(())
        } else {
            Err(UnpinnerError::Uninstall(format!(
                "{}: {}",
                package,
                output.trim()
            )))
        }
    }

    /// Open a sync connection for file transfer
    pub async fn sync(&self) -> Result<SyncClient> {
        let transport = self.open("sync:").await?;
        Ok(SyncClient::new(transport))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};

    /// Accept transport + shell requests and answer the shell with `output`
    async fn shell_server(output: &'static str) -> u16 {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        tokio::spawn(async move {
            loop {
                let (stream, _) = listener.accept().await.unwrap();
                tokio::spawn(handle(stream, output));
            }
        });

        async fn handle(mut stream: TcpStream, output: &str) {
            // host:transport:<serial>
            read_request(&mut stream).await;
            stream.write_all(b"OKAY").await.unwrap();
            // shell:<cmd>
            read_request(&mut stream).await;
            stream.write_all(b"OKAY").await.unwrap();
            stream.write_all(output.as_bytes()).await.unwrap();
            // closing the stream ends the shell output
        }

        async fn read_request(stream: &mut TcpStream) {
            let mut len_buf = [0u8; 4];
            stream.read_exact(&mut len_buf).await.unwrap();
            let len =
                usize::from_str_radix(std::str::from_utf8(&len_buf).unwrap(), 16).unwrap();
            let mut payload = vec![0u8; len];
            stream.read_exact(&mut payload).await.unwrap();
        }

        port
    }

    fn device_on(port: u16) -> AdbDevice {
        AdbDevice::new(AdbClient::new("127.0.0.1", port), "emulator-5554".into())
    }

    #[tokio::test]
    async fn test_apk_paths_parsed() {
        let port = shell_server(
            "package:/data/app/com.example-1/base.apk\npackage:/data/app/com.example-1/split_config.en.apk\n",
        )
        .await;

        let paths = device_on(port).apk_paths("com.example").await.unwrap();
        assert_eq!(
            paths,
            vec![
                "/data/app/com.example-1/base.apk",
                "/data/app/com.example-1/split_config.en.apk"
            ]
        );
    }

    #[tokio::test]
    async fn test_missing_package() {
        let port = shell_server("").await;

        assert!(matches!(
            device_on(port).apk_paths("com.missing").await,
            Err(UnpinnerError::PackageNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_uninstall_requires_success() {
        let port = shell_server("Failure [DELETE_FAILED_INTERNAL_ERROR]\n").await;

        let err = device_on(port).uninstall("com.example").await.unwrap_err();
        assert!(err.to_string().contains("DELETE_FAILED_INTERNAL_ERROR"));
    }

    #[tokio::test]
    async fn test_list_packages_parsed() {
        let port = shell_server("package:com.android.shell\npackage:com.example.app\n").await;

        let packages = device_on(port).list_packages().await.unwrap();
        assert_eq!(packages, vec!["com.android.shell", "com.example.app"]);
    }
}
