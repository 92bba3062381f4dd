//! Native client for the ADB server protocols
//!
//! Speaks the host protocol (hex-length-prefixed requests, OKAY/FAIL
//! status) and the binary sync sub-protocol directly over TCP, so no adb
//! binary is needed for device queries, shell commands or file pulls.

mod client;
mod device;
mod sync;
mod transport;

pub use client::AdbClient;
pub use device::AdbDevice;
pub use sync::{FileStat, SyncClient};
pub use transport::Transport;
