//! Session transports.
//!
//! A [`Transport`] moves raw bytes to and from an interactive remote shell.
//! Two backends exist: the bundled libssh2 client ([`libssh2::Ssh2Transport`])
//! and the operating system's `ssh` binary ([`system::SystemSshTransport`]),
//! which honors the user's `~/.ssh/config` (proxy commands, per-host keys).

pub mod libssh2;
pub mod system;

use crate::error::Result;
use std::time::Duration;

/// Which transport backend to use for a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransportKind {
    /// Bundled cross-platform client (libssh2)
    #[default]
    Ssh2,
    /// The operating system's native `ssh`, honoring its config file
    System,
}

impl TransportKind {
    /// Transport identifier as used on the command line.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Ssh2 => "ssh2",
            Self::System => "system",
        }
    }
}

/// Everything a transport needs to reach a host.
#[derive(Debug, Clone)]
pub struct SessionOptions {
    /// Hostname or IP address
    pub host: String,
    /// TCP port (22 unless overridden)
    pub port: u16,
    /// Login username
    pub username: String,
    /// Login password
    pub password: String,
    /// Per-operation deadline (connect, and each read slice)
    pub timeout: Duration,
}

/// Byte-level access to an interactive remote shell.
///
/// `read_chunk` blocks for at most the session timeout slice and returns
/// `Ok(0)` when no data arrived in that window; a remote-side close is an
/// error, never a silent zero.
pub trait Transport: Send {
    /// Read available bytes into `buf`, waiting up to one timeout slice.
    fn read_chunk(&mut self, buf: &mut [u8]) -> Result<usize>;

    /// Write all of `data` to the remote shell.
    fn write_all(&mut self, data: &[u8]) -> Result<()>;

    /// Tear the session down.
    fn close(&mut self) -> Result<()>;
}
