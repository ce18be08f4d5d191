//! Bundled cross-platform transport via libssh2.
//!
//! Opens a TCP connection with a connect timeout, performs the SSH handshake,
//! authenticates with a password, and requests a PTY shell channel. The
//! session timeout bounds every blocking libssh2 call, so a stalled read
//! surfaces as `Ok(0)` and lets the driver check its own deadline.

use std::io::{Read, Write};
use std::net::{TcpStream, ToSocketAddrs};

use log::debug;
use ssh2::{Channel, Session};

use crate::error::{Error, Result};
use crate::transport::{SessionOptions, Transport};

const LIBSSH2_ERROR_TIMEOUT: i32 = -37;

/// Interactive shell session over libssh2.
pub struct Ssh2Transport {
    session: Session,
    channel: Channel,
}

impl Ssh2Transport {
    /// Connect, authenticate and open a PTY shell channel.
    pub fn connect(opts: &SessionOptions) -> Result<Self> {
        let address = format!("{}:{}", opts.host, opts.port);
        let resolved = address
            .to_socket_addrs()
            .map_err(|e| Error::ConnectionFailed {
                host: opts.host.clone(),
                message: format!("could not resolve {address}: {e}"),
            })?
            .next()
            .ok_or_else(|| Error::ConnectionFailed {
                host: opts.host.clone(),
                message: format!("no address found for {address}"),
            })?;

        debug!("connecting to {resolved}");
        let stream =
            TcpStream::connect_timeout(&resolved, opts.timeout).map_err(|e| {
                Error::ConnectionFailed {
                    host: opts.host.clone(),
                    message: e.to_string(),
                }
            })?;

        let mut session = Session::new().map_err(|e| Error::ConnectionFailed {
            host: opts.host.clone(),
            message: format!("could not initialize session: {e}"),
        })?;
        session.set_tcp_stream(stream);
        session.set_timeout(timeout_ms(opts));
        session.handshake().map_err(|e| Error::ConnectionFailed {
            host: opts.host.clone(),
            message: format!("handshake failed: {e}"),
        })?;

        session
            .userauth_password(&opts.username, &opts.password)
            .map_err(|e| Error::AuthenticationFailed {
                host: opts.host.clone(),
                message: e.to_string(),
            })?;
        if !session.authenticated() {
            return Err(Error::AuthenticationFailed {
                host: opts.host.clone(),
                message: "password rejected".to_string(),
            });
        }

        let mut channel = session.channel_session().map_err(|e| Error::ConnectionFailed {
            host: opts.host.clone(),
            message: format!("could not open channel: {e}"),
        })?;
        // Network devices expect an interactive terminal, not exec.
        channel
            .request_pty("xterm", None, None)
            .map_err(|e| Error::ConnectionFailed {
                host: opts.host.clone(),
                message: format!("could not request PTY: {e}"),
            })?;
        channel.shell().map_err(|e| Error::ConnectionFailed {
            host: opts.host.clone(),
            message: format!("could not start shell: {e}"),
        })?;

        debug!("shell channel open to {}", opts.host);
        Ok(Self { session, channel })
    }
}

fn timeout_ms(opts: &SessionOptions) -> u32 {
    u32::try_from(opts.timeout.as_millis()).unwrap_or(u32::MAX)
}

fn is_timeout(error: &ssh2::Error) -> bool {
    matches!(error.code(), ssh2::ErrorCode::Session(LIBSSH2_ERROR_TIMEOUT))
}

impl Transport for Ssh2Transport {
    fn read_chunk(&mut self, buf: &mut [u8]) -> Result<usize> {
        if self.channel.eof() {
            return Err(Error::ConnectionClosed);
        }
        match self.channel.read(buf) {
            Ok(0) => Err(Error::ConnectionClosed),
            Ok(n) => Ok(n),
            Err(e) => {
                let timed_out = e
                    .get_ref()
                    .and_then(|inner| inner.downcast_ref::<ssh2::Error>())
                    .is_some_and(is_timeout)
                    || matches!(
                        e.kind(),
                        std::io::ErrorKind::TimedOut | std::io::ErrorKind::WouldBlock
                    );
                if timed_out {
                    Ok(0)
                } else {
                    Err(Error::ChannelFailed {
                        message: e.to_string(),
                    })
                }
            }
        }
    }

    fn write_all(&mut self, data: &[u8]) -> Result<()> {
        self.channel.write_all(data).map_err(|e| Error::ChannelFailed {
            message: e.to_string(),
        })?;
        self.channel.flush().map_err(|e| Error::ChannelFailed {
            message: e.to_string(),
        })?;
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        let _ = self.channel.send_eof();
        let _ = self.channel.close();
        let _ = self
            .session
            .disconnect(None, "netrun session finished", None);
        Ok(())
    }
}
