//! Native-SSH transport.
//!
//! Drives the operating system's `ssh` binary over pipes, so the user's
//! `~/.ssh/config` applies in full: ProxyCommand, per-host identities, jump
//! hosts. Password prompts from `ssh` itself go to the controlling terminal
//! as usual; this transport only owns the remote shell's stdin/stdout.
//!
//! Legacy key-exchange and cipher options are offered to the server because
//! older network gear frequently supports nothing newer.

use std::io::Read;
use std::process::{Child, ChildStdin, Command, Stdio};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread;
use std::time::Duration;

use log::debug;

use crate::error::{Error, Result};
use crate::transport::{SessionOptions, Transport};

const LEGACY_KEX: &str =
    "KexAlgorithms=+diffie-hellman-group1-sha1,diffie-hellman-group-exchange-sha1,diffie-hellman-group14-sha1";
const LEGACY_CIPHERS: &str =
    "Ciphers=+aes128-ctr,aes192-ctr,aes256-ctr,aes128-cbc,3des-cbc,aes192-cbc,aes256-cbc";

/// Interactive shell session through the system `ssh` client.
pub struct SystemSshTransport {
    child: Child,
    stdin: ChildStdin,
    incoming: Receiver<std::io::Result<Vec<u8>>>,
    pending: Vec<u8>,
    slice: Duration,
}

impl SystemSshTransport {
    /// Spawn `ssh` and wire up its pipes.
    pub fn spawn(opts: &SessionOptions) -> Result<Self> {
        let mut command = Command::new("ssh");
        command
            .arg("-tt")
            .args(["-p", &opts.port.to_string()])
            .args(["-o", &format!("ConnectTimeout={}", opts.timeout.as_secs().max(1))])
            .args(["-o", LEGACY_KEX])
            .args(["-o", LEGACY_CIPHERS])
            .args(["-o", "StrictHostKeyChecking=no"])
            .arg(format!("{}@{}", opts.username, opts.host))
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        debug!("spawning system ssh for {}", opts.host);
        let mut child = command.spawn().map_err(|e| Error::ConnectionFailed {
            host: opts.host.clone(),
            message: format!("could not launch ssh: {e}"),
        })?;

        let stdin = child.stdin.take().ok_or_else(|| Error::ConnectionFailed {
            host: opts.host.clone(),
            message: "ssh child has no stdin".to_string(),
        })?;
        let stdout = child.stdout.take().ok_or_else(|| Error::ConnectionFailed {
            host: opts.host.clone(),
            message: "ssh child has no stdout".to_string(),
        })?;
        let stderr = child.stderr.take().ok_or_else(|| Error::ConnectionFailed {
            host: opts.host.clone(),
            message: "ssh child has no stderr".to_string(),
        })?;

        // One reader thread per stream; both feed the same channel so the
        // driver sees device output and ssh diagnostics interleaved, the way
        // a terminal would.
        let (tx, incoming) = mpsc::channel();
        spawn_reader(stdout, tx.clone());
        spawn_reader(stderr, tx);

        Ok(Self {
            child,
            stdin,
            incoming,
            pending: Vec::new(),
            slice: opts.timeout,
        })
    }
}

fn spawn_reader<R: Read + Send + 'static>(
    mut stream: R,
    tx: mpsc::Sender<std::io::Result<Vec<u8>>>,
) {
    thread::spawn(move || {
        let mut buf = [0u8; 8192];
        loop {
            match stream.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => {
                    if tx.send(Ok(buf[..n].to_vec())).is_err() {
                        break;
                    }
                }
                Err(e) => {
                    let _ = tx.send(Err(e));
                    break;
                }
            }
        }
    });
}

impl Transport for SystemSshTransport {
    fn read_chunk(&mut self, buf: &mut [u8]) -> Result<usize> {
        if !self.pending.is_empty() {
            let n = self.pending.len().min(buf.len());
            buf[..n].copy_from_slice(&self.pending[..n]);
            self.pending.drain(..n);
            return Ok(n);
        }
        match self.incoming.recv_timeout(self.slice) {
            Ok(Ok(bytes)) => {
                let n = bytes.len().min(buf.len());
                buf[..n].copy_from_slice(&bytes[..n]);
                self.pending.extend_from_slice(&bytes[n..]);
                Ok(n)
            }
            Ok(Err(e)) => Err(Error::ChannelFailed {
                message: e.to_string(),
            }),
            Err(RecvTimeoutError::Timeout) => Ok(0),
            // Both reader threads hung up: the ssh process is gone.
            Err(RecvTimeoutError::Disconnected) => Err(Error::ConnectionClosed),
        }
    }

    fn write_all(&mut self, data: &[u8]) -> Result<()> {
        use std::io::Write;
        self.stdin.write_all(data).map_err(|e| Error::ChannelFailed {
            message: e.to_string(),
        })?;
        self.stdin.flush().map_err(|e| Error::ChannelFailed {
            message: e.to_string(),
        })?;
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        use std::io::Write;
        // A polite exit first; ssh tears the connection down with the shell.
        let _ = self.stdin.write_all(b"exit\n");
        let _ = self.stdin.flush();
        thread::sleep(Duration::from_millis(200));
        if self.child.try_wait().ok().flatten().is_none() {
            let _ = self.child.kill();
        }
        let _ = self.child.wait();
        Ok(())
    }
}
