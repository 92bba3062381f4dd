//! ADB sync sub-protocol (file transfer)
//!
//! Spoken on a transport that has issued `sync:`. Requests and responses
//! are 8-byte headers (4-byte ASCII id, 4-byte little-endian length),
//! optionally followed by a payload.

use std::path::Path;

use indicatif::ProgressBar;
use tokio::io::AsyncWriteExt;

use crate::error::{Result, UnpinnerError};

use super::transport::Transport;

/// Largest DATA payload the protocol allows
const MAX_DATA_LEN: u32 = 64 * 1024;

/// Result of a remote `stat`
#[derive(Debug, Clone, Copy)]
pub struct FileStat {
    /// Unix mode bits
    pub mode: u32,
    /// File size in bytes
    pub size: u32,
    /// Modification time (seconds since epoch)
    pub mtime: u32,
}

impl FileStat {
    /// The server answers a missing path with an all-zero stat
    pub fn exists(&self) -> bool {
        self.mode != 0 || self.size != 0 || self.mtime != 0
    }
}

/// File-transfer session with a device
pub struct SyncClient {
    transport: Transport,
}

impl SyncClient {
    pub(crate) fn new(transport: Transport) -> Self {
        Self { transport }
    }

    /// Send an 8-byte request header plus path payload
    async fn send_request(&mut self, id: &[u8; 4], path: &str) -> Result<()> {
        let mut buf = Vec::with_capacity(8 + path.len());
        buf.extend_from_slice(id);
        buf.extend_from_slice(&(path.len() as u32).to_le_bytes());
        buf.extend_from_slice(path.as_bytes());
        self.transport.write_raw(&buf).await
    }

    /// Read a response header (id, length)
    async fn read_header(&mut self) -> Result<([u8; 4], u32)> {
        let mut header = [0u8; 8];
        self.transport.read_raw(&mut header).await?;

        let mut id = [0u8; 4];
        id.copy_from_slice(&header[..4]);
        let len = u32::from_le_bytes([header[4], header[5], header[6], header[7]]);

        Ok((id, len))
    }

    /// Read a FAIL payload into an error
    async fn read_failure(&mut self, len: u32) -> UnpinnerError {
        let mut message = vec![0u8; len as usize];
        if self.transport.read_raw(&mut message).await.is_err() {
            return UnpinnerError::sync("Transfer failed (no error message)");
        }
        UnpinnerError::sync(String::from_utf8_lossy(&message).into_owned())
    }

    /// Stat a remote path
    pub async fn stat(&mut self, remote: &str) -> Result<FileStat> {
        self.send_request(b"STAT", remote).await?;

        let (id, mode) = self.read_header().await?;
        match &id {
            b"STAT" => {
                // Header carries the mode; size and mtime follow
                let mut rest = [0u8; 8];
                self.transport.read_raw(&mut rest).await?;
                Ok(FileStat {
                    mode,
                    size: u32::from_le_bytes([rest[0], rest[1], rest[2], rest[3]]),
                    mtime: u32::from_le_bytes([rest[4], rest[5], rest[6], rest[7]]),
                })
            }
            b"FAIL" => Err(self.read_failure(mode).await),
            other => Err(UnpinnerError::protocol(format!(
                "Unexpected sync response {:?}",
                String::from_utf8_lossy(other)
            ))),
        }
    }

    /// Pull a remote file, streaming DATA chunks to a local path
    ///
    /// Returns the number of bytes written. The progress bar, if given, is
    /// advanced per chunk.
    pub async fn pull(
        &mut self,
        remote: &str,
        local: &Path,
        progress: Option<&ProgressBar>,
    ) -> Result<u64> {
        if let Some(parent) = local.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let mut file = tokio::fs::File::create(local).await?;

        self.send_request(b"RECV", remote).await?;

        let mut written: u64 = 0;
        loop {
            let (id, len) = self.read_header().await?;
            match &id {
                b"DATA" => {
                    if len > MAX_DATA_LEN {
                        return Err(UnpinnerError::protocol(format!(
                            "DATA chunk of {} bytes exceeds protocol maximum",
                            len
                        )));
                    }
                    let mut chunk = vec![0u8; len as usize];
                    self.transport.read_raw(&mut chunk).await?;
                    file.write_all(&chunk).await?;
                    written += u64::from(len);
                    if let Some(pb) = progress {
                        pb.inc(u64::from(len));
                    }
                }
                b"DONE" => break,
                b"FAIL" => {
                    let err = self.read_failure(len).await;
                    return Err(err);
                }
                other => {
                    return Err(UnpinnerError::protocol(format!(
                        "Unexpected sync response {:?}",
                        String::from_utf8_lossy(other)
                    )));
                }
            }
        }

        file.flush().await?;
        Ok(written)
    }

    /// End the session
    pub async fn quit(mut self) -> Result<()> {
        self.transport.write_raw(b"QUIT\0\0\0\0").await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};

    /// Serve one raw sync connection with the given response script
    async fn sync_server(response: Vec<u8>) -> u16 {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            // Consume the request header + path
            let mut header = [0u8; 8];
            stream.read_exact(&mut header).await.unwrap();
            let len = u32::from_le_bytes([header[4], header[5], header[6], header[7]]);
            let mut path = vec![0u8; len as usize];
            stream.read_exact(&mut path).await.unwrap();

            stream.write_all(&response).await.unwrap();
        });

        port
    }

    async fn client_on(port: u16) -> SyncClient {
        let transport = Transport::connect("127.0.0.1", port, Duration::from_secs(1))
            .await
            .unwrap();
        SyncClient::new(transport)
    }

    fn frame(id: &[u8; 4], arg: u32, payload: &[u8]) -> Vec<u8> {
        let mut buf = Vec::new();
        buf.extend_from_slice(id);
        buf.extend_from_slice(&arg.to_le_bytes());
        buf.extend_from_slice(payload);
        buf
    }

    #[tokio::test]
    async fn test_pull_streams_chunks() {
        let mut response = frame(b"DATA", 5, b"hello");
        response.extend(frame(b"DATA", 6, b" world"));
        response.extend(frame(b"DONE", 0, b""));

        let port = sync_server(response).await;
        let temp = tempfile::TempDir::new().unwrap();
        let local = temp.path().join("pulled.apk");

        let written = client_on(port)
            .await
            .pull("/data/app/base.apk", &local, None)
            .await
            .unwrap();

        assert_eq!(written, 11);
        assert_eq!(std::fs::read_to_string(&local).unwrap(), "hello world");
    }

    #[tokio::test]
    async fn test_pull_fail_frame() {
        let response = frame(b"FAIL", 12, b"no such file");
        let port = sync_server(response).await;
        let temp = tempfile::TempDir::new().unwrap();

        let err = client_on(port)
            .await
            .pull("/nope", &temp.path().join("x"), None)
            .await
            .unwrap_err();

        assert!(err.to_string().contains("no such file"));
    }

    #[tokio::test]
    async fn test_stat() {
        let mut response = frame(b"STAT", 0o100644, b"");
        response.extend_from_slice(&1234u32.to_le_bytes());
        response.extend_from_slice(&1700000000u32.to_le_bytes());

        let port = sync_server(response).await;
        let stat = client_on(port).await.stat("/data/app/base.apk").await.unwrap();

        assert!(stat.exists());
        assert_eq!(stat.size, 1234);
        assert_eq!(stat.mode, 0o100644);
    }

    #[tokio::test]
    async fn test_stat_missing_path() {
        let mut response = frame(b"STAT", 0, b"");
        response.extend_from_slice(&[0u8; 8]);

        let port = sync_server(response).await;
        let stat = client_on(port).await.stat("/missing").await.unwrap();

        assert!(!stat.exists());
    }
}
