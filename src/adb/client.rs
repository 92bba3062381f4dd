//! ADB server client and device selection

use std::time::Duration;

use crate::config::AdbConfig;
use crate::error::{Result, UnpinnerError};
use crate::models::DeviceInfo;

use super::device::AdbDevice;
use super::transport::Transport;

/// Client for an ADB server
///
/// Host services use one TCP connection per request; the server closes the
/// connection after answering, so the client only stores the address.
#[derive(Debug, Clone)]
pub struct AdbClient {
    host: String,
    port: u16,
    timeout: Duration,
}

impl AdbClient {
    /// Create a client for the given server address
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            timeout: Duration::from_secs(10),
        }
    }

    /// Create a client from configuration
    pub fn from_config(config: &AdbConfig) -> Self {
        Self {
            host: config.host.clone(),
            port: config.port,
            timeout: Duration::from_secs(config.connect_timeout),
        }
    }

    /// Set the connection timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Server address as `host:port`
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Open a new connection to the server
    pub(crate) async fn connect(&self) -> Result<Transport> {
        Transport::connect(&self.host, self.port, self.timeout).await
    }

    /// Query the server's protocol version
    pub async fn server_version(&self) -> Result<u32> {
        let mut transport = self.connect().await?;
        transport.request("host:version").await?;
        let payload = transport.read_block().await?;

        u32::from_str_radix(payload.trim(), 16)
            .map_err(|_| UnpinnerError::protocol(format!("Invalid version payload {:?}", payload)))
    }

    /// List devices known to the server
    pub async fn devices(&self) -> Result<Vec<DeviceInfo>> {
        let mut transport = self.connect().await?;
        transport.request("host:devices").await?;
        let payload = transport.read_block().await?;

        Ok(DeviceInfo::parse_list(&payload))
    }

    /// Select a device, by serial or as the sole connected one
    ///
    /// Without a serial there must be exactly one device in the `device`
    /// state; anything else is an error before any work starts.
    pub async fn device(&self, serial: Option<&str>) -> Result<AdbDevice> {
        let devices = self.devices().await?;

        let serial = match serial {
            Some(serial) => {
                if !devices.iter().any(|d| d.serial == serial) {
                    return Err(UnpinnerError::DeviceNotFound(serial.to_string()));
                }
                serial.to_string()
            }
            None => {
                let mut online = devices.iter().filter(|d| d.state.is_online());
                let first = online.next().ok_or(UnpinnerError::NoDevices)?;
                if online.next().is_some() {
                    return Err(UnpinnerError::MultipleDevices);
                }
                first.serial.clone()
            }
        };

        Ok(AdbDevice::new(self.clone(), serial))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::future::Future;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};

    /// Serve a canned `host:devices` payload for every connection
    async fn devices_server(payload: &'static str) -> u16 {
        async fn handle(mut stream: TcpStream, payload: &str) {
            let mut buf = [0u8; 64];
            stream.read(&mut buf).await.unwrap();
            let framed = format!("OKAY{:04x}{}", payload.len(), payload);
            stream.write_all(framed.as_bytes()).await.unwrap();
        }

        serve(move |stream| handle(stream, payload)).await
    }

    async fn serve<F, Fut>(handler: F) -> u16
    where
        F: Fn(TcpStream) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send,
    {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        tokio::spawn(async move {
            loop {
                let (stream, _) = listener.accept().await.unwrap();
                handler(stream).await;
            }
        });
        port
    }

    #[tokio::test]
    async fn test_devices_parsed() {
        let port = devices_server("emulator-5554\tdevice\nserial-2\toffline\n").await;
        let client = AdbClient::new("127.0.0.1", port);

        let devices = client.devices().await.unwrap();
        assert_eq!(devices.len(), 2);
        assert_eq!(devices[0].serial, "emulator-5554");
    }

    #[tokio::test]
    async fn test_sole_online_device_selected() {
        let port = devices_server("emulator-5554\tdevice\nserial-2\toffline\n").await;
        let client = AdbClient::new("127.0.0.1", port);

        let device = client.device(None).await.unwrap();
        assert_eq!(device.serial(), "emulator-5554");
    }

    #[tokio::test]
    async fn test_no_devices() {
        let port = devices_server("").await;
        let client = AdbClient::new("127.0.0.1", port);

        assert!(matches!(
            client.device(None).await,
            Err(UnpinnerError::NoDevices)
        ));
    }

    #[tokio::test]
    async fn test_multiple_devices_need_serial() {
        let port = devices_server("a\tdevice\nb\tdevice\n").await;
        let client = AdbClient::new("127.0.0.1", port);

        assert!(matches!(
            client.device(None).await,
            Err(UnpinnerError::MultipleDevices)
        ));

        let device = client.device(Some("b")).await.unwrap();
        assert_eq!(device.serial(), "b");
    }

    #[tokio::test]
    async fn test_unknown_serial_rejected() {
        let port = devices_server("a\tdevice\n").await;
        let client = AdbClient::new("127.0.0.1", port);

        assert!(matches!(
            client.device(Some("zzz")).await,
            Err(UnpinnerError::DeviceNotFound(_))
        ));
    }
}
