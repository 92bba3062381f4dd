//! ADB host protocol framing
//!
//! Requests are ASCII payloads prefixed with their length as four
//! lowercase hex digits. The server answers with a 4-byte `OKAY` or
//! `FAIL` status; failures carry a length-prefixed message.

use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

use crate::error::{Result, UnpinnerError};

/// A single connection to the ADB server
pub struct Transport {
    stream: TcpStream,
}

impl Transport {
    /// Connect to the ADB server
    pub async fn connect(host: &str, port: u16, timeout: Duration) -> Result<Self> {
        let addr = format!("{}:{}", host, port);
        let stream = tokio::time::timeout(timeout, TcpStream::connect(&addr))
            .await
            .map_err(|_| {
                UnpinnerError::protocol(format!("Timed out connecting to ADB server at {}", addr))
            })?
            .map_err(|e| {
                UnpinnerError::protocol(format!(
                    "Could not connect to ADB server at {}: {}",
                    addr, e
                ))
            })?;

        Ok(Self { stream })
    }

    /// Send a service request and wait for the server to accept it
    pub async fn request(&mut self, service: &str) -> Result<()> {
        self.send(service).await?;
        self.read_status(service).await
    }

    /// Write a hex-length-prefixed request
    async fn send(&mut self, service: &str) -> Result<()> {
        let framed = format!("{:04x}{}", service.len(), service);
        self.stream.write_all(framed.as_bytes()).await?;
        Ok(())
    }

    /// Read the 4-byte status, surfacing the server's message on FAIL
    async fn read_status(&mut self, service: &str) -> Result<()> {
        let mut status = [0u8; 4];
        self.stream.read_exact(&mut status).await?;

        match &status {
            b"OKAY" => Ok(()),
            b"FAIL" => {
                let message = self.read_block().await?;
                Err(UnpinnerError::Adb(format!("{} ({})", message, service)))
            }
            other => Err(UnpinnerError::protocol(format!(
                "Unexpected status {:?} for {}",
                String::from_utf8_lossy(other),
                service
            ))),
        }
    }

    /// Read a hex-length-prefixed payload
    pub async fn read_block(&mut self) -> Result<String> {
        let mut len_buf = [0u8; 4];
        self.stream.read_exact(&mut len_buf).await?;

        let len_str = std::str::from_utf8(&len_buf)
            .map_err(|_| UnpinnerError::protocol("Non-ASCII length prefix"))?;
        let len = usize::from_str_radix(len_str, 16)
            .map_err(|_| UnpinnerError::protocol(format!("Invalid length prefix {:?}", len_str)))?;

        let mut payload = vec![0u8; len];
        self.stream.read_exact(&mut payload).await?;

        Ok(String::from_utf8_lossy(&payload).into_owned())
    }

    /// Read the raw stream until the server closes it
    pub async fn read_to_end_string(&mut self) -> Result<String> {
        let mut buf = Vec::new();
        self.stream.read_to_end(&mut buf).await?;
        Ok(String::from_utf8_lossy(&buf).into_owned())
    }

    /// Write raw bytes (sync sub-protocol)
    pub(crate) async fn write_raw(&mut self, buf: &[u8]) -> Result<()> {
        self.stream.write_all(buf).await?;
        Ok(())
    }

    /// Read an exact number of raw bytes (sync sub-protocol)
    pub(crate) async fn read_raw(&mut self, buf: &mut [u8]) -> Result<()> {
        self.stream.read_exact(buf).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::future::Future;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    async fn serve_once<F, Fut>(handler: F) -> u16
    where
        F: FnOnce(TcpStream) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send,
    {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            handler(stream).await;
        });
        port
    }

    #[tokio::test]
    async fn test_request_okay() {
        let port = serve_once(|mut stream| async move {
            let mut buf = [0u8; 16];
            let n = stream.read(&mut buf).await.unwrap();
            assert_eq!(&buf[..n], b"000chost:version");
            stream.write_all(b"OKAY00040029").await.unwrap();
        })
        .await;

        let mut transport = Transport::connect("127.0.0.1", port, Duration::from_secs(1))
            .await
            .unwrap();
        transport.request("host:version").await.unwrap();
        assert_eq!(transport.read_block().await.unwrap(), "0029");
    }

    #[tokio::test]
    async fn test_request_fail_carries_message() {
        let port = serve_once(|mut stream| async move {
            let mut buf = [0u8; 64];
            stream.read(&mut buf).await.unwrap();
            stream
                .write_all(b"FAIL0013device not found: x")
                .await
                .unwrap();
        })
        .await;

        let mut transport = Transport::connect("127.0.0.1", port, Duration::from_secs(1))
            .await
            .unwrap();
        let err = transport.request("host:transport:x").await.unwrap_err();
        assert!(err.to_string().contains("device not found"));
    }

    #[tokio::test]
    async fn test_connect_refused() {
        // Port 1 is essentially guaranteed closed
        let result = Transport::connect("127.0.0.1", 1, Duration::from_secs(1)).await;
        assert!(result.is_err());
    }
}
