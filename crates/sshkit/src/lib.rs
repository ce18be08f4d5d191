//! # sshkit
//!
//! Synchronous, prompt-driven SSH sessions for network devices.
//!
//! This crate provides functionality for:
//! - Opening interactive shell sessions over libssh2 or the system `ssh`
//! - Recognizing device prompts at the tail of the read buffer
//! - Escalating to privileged (enable) mode and disabling output paging
//! - Running commands and capturing their cleaned output
//!
//! ## Example
//!
//! ```no_run
//! use sshkit::{DriverBuilder, Platform, PrivilegeLevel};
//!
//! let mut driver = DriverBuilder::new("core-sw1")
//!     .username("ops")
//!     .password("secret")
//!     .platform(Platform::CiscoIosxe)
//!     .desired_privilege(PrivilegeLevel::PrivilegedExec)
//!     .open()
//!     .expect("connect failed");
//!
//! let response = driver.send_command("show version").expect("command failed");
//! println!("{}", response.result);
//! driver.close().expect("close failed");
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod platform;
pub mod prompt;
pub mod transport;

pub use error::{Error, ErrorCategory, Result};
pub use platform::{Platform, PrivilegeLevel};
pub use transport::{SessionOptions, Transport, TransportKind};

use std::time::{Duration, Instant};

use log::{debug, info};
use regex::Regex;

use transport::libssh2::Ssh2Transport;
use transport::system::SystemSshTransport;

/// Default per-operation timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Output of a single command on a device.
#[derive(Debug, Clone)]
pub struct Response {
    /// The command that was sent
    pub command: String,
    /// Captured output, with the echoed command and trailing prompt removed
    pub result: String,
}

/// Builder for [`Driver`] sessions.
pub struct DriverBuilder {
    host: String,
    port: u16,
    username: String,
    password: String,
    auth_secondary: Option<String>,
    platform: Platform,
    transport: TransportKind,
    desired_privilege: PrivilegeLevel,
    timeout: Duration,
}

impl DriverBuilder {
    /// Start building a session to `host` with default settings.
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: 22,
            username: String::new(),
            password: String::new(),
            auth_secondary: None,
            platform: Platform::default(),
            transport: TransportKind::default(),
            desired_privilege: PrivilegeLevel::PrivilegedExec,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Login username.
    pub fn username(mut self, username: impl Into<String>) -> Self {
        self.username = username.into();
        self
    }

    /// Login password.
    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.password = password.into();
        self
    }

    /// Secondary secret used to answer the enable-password prompt.
    pub fn auth_secondary(mut self, secret: impl Into<String>) -> Self {
        self.auth_secondary = Some(secret.into());
        self
    }

    /// TCP port (default 22).
    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Network OS platform (default Cisco IOS-XE).
    pub fn platform(mut self, platform: Platform) -> Self {
        self.platform = platform;
        self
    }

    /// Transport backend (default libssh2).
    pub fn transport(mut self, kind: TransportKind) -> Self {
        self.transport = kind;
        self
    }

    /// Privilege level to reach during open (default privileged exec).
    pub fn desired_privilege(mut self, level: PrivilegeLevel) -> Self {
        self.desired_privilege = level;
        self
    }

    /// Per-operation timeout (default 10 seconds).
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Connect and run the open sequence: find the device prompt, escalate
    /// privilege if requested, disable paging.
    pub fn open(self) -> Result<Driver> {
        let opts = SessionOptions {
            host: self.host.clone(),
            port: self.port,
            username: self.username.clone(),
            password: self.password.clone(),
            timeout: self.timeout,
        };
        let transport: Box<dyn Transport> = match self.transport {
            TransportKind::Ssh2 => Box::new(Ssh2Transport::connect(&opts)?),
            TransportKind::System => Box::new(SystemSshTransport::spawn(&opts)?),
        };
        self.open_with(transport)
    }

    /// Run the open sequence over an already-established transport
    /// (useful for testing with a scripted transport).
    pub fn open_with(self, transport: Box<dyn Transport>) -> Result<Driver> {
        let mut driver = Driver {
            transport,
            platform: self.platform,
            host: self.host,
            timeout: self.timeout,
            prompt: self.platform.exec_prompt(),
        };
        let secondary = self
            .auth_secondary
            .unwrap_or_else(|| self.password.clone());
        driver.on_open(self.desired_privilege, &secondary)?;
        Ok(driver)
    }
}

/// An open, prompt-synchronized session to a network device.
pub struct Driver {
    transport: Box<dyn Transport>,
    platform: Platform,
    host: String,
    timeout: Duration,
    prompt: &'static Regex,
}

impl std::fmt::Debug for Driver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Driver")
            .field("platform", &self.platform)
            .field("host", &self.host)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl Driver {
    /// Send a command and capture its output up to the next prompt.
    pub fn send_command(&mut self, command: &str) -> Result<Response> {
        debug!("{}: sending {command:?}", self.host);
        self.transport
            .write_all(format!("{command}\n").as_bytes())?;
        let (buffer, _) = self.read_until(&[self.prompt], &format!("output of {command:?}"))?;
        let raw = String::from_utf8_lossy(&buffer);
        Ok(Response {
            command: command.to_string(),
            result: prompt::clean_output(&raw, command),
        })
    }

    /// Close the session.
    pub fn close(&mut self) -> Result<()> {
        debug!("{}: closing session", self.host);
        self.transport.close()
    }

    fn on_open(&mut self, desired: PrivilegeLevel, secondary: &str) -> Result<()> {
        // Nudge the device into printing a prompt.
        self.transport.write_all(b"\n")?;
        let initial = [self.platform.privileged_prompt(), self.platform.exec_prompt()];
        let (_, matched) = self
            .read_until(&initial, "initial device prompt")
            .map_err(|e| connect_phase(&self.host, e))?;

        let mut level = if matched == 0 {
            PrivilegeLevel::PrivilegedExec
        } else {
            PrivilegeLevel::Exec
        };
        debug!("{}: landed at {} prompt", self.host, level.name());

        if desired == PrivilegeLevel::PrivilegedExec && level == PrivilegeLevel::Exec {
            if let Some(enable) = self.platform.enable_command() {
                self.escalate(enable, secondary)?;
                level = PrivilegeLevel::PrivilegedExec;
            }
        }

        self.prompt = match level {
            PrivilegeLevel::PrivilegedExec => self.platform.privileged_prompt(),
            PrivilegeLevel::Exec => self.platform.exec_prompt(),
        };

        if let Some(paging_off) = self.platform.disable_paging_command() {
            self.send_command(paging_off)
                .map_err(|e| connect_phase(&self.host, e))?;
        }

        info!("{}: session ready at {} level", self.host, level.name());
        Ok(())
    }

    fn escalate(&mut self, enable: &str, secondary: &str) -> Result<()> {
        self.transport.write_all(format!("{enable}\n").as_bytes())?;
        // The device either asks for a password or drops straight into
        // privileged mode (no enable secret configured).
        let expected = [self.platform.privileged_prompt(), self.platform.password_prompt()];
        let (_, matched) = self
            .read_until(&expected, "enable password prompt")
            .map_err(|e| Error::EnableFailed {
                message: e.to_string(),
            })?;
        if matched == 1 {
            self.transport.write_all(format!("{secondary}\n").as_bytes())?;
            self.read_until(&[self.platform.privileged_prompt()], "privileged prompt")
                .map_err(|e| Error::EnableFailed {
                    message: format!("enable secret not accepted: {e}"),
                })?;
        }
        debug!("{}: entered privileged mode", self.host);
        Ok(())
    }

    /// Read until one of `patterns` matches at the tail of the buffer.
    ///
    /// Returns the accumulated bytes and the index of the pattern that
    /// matched. The deadline is absolute: slow-but-steady output does not
    /// extend it.
    fn read_until(&mut self, patterns: &[&'static Regex], what: &str) -> Result<(Vec<u8>, usize)> {
        let deadline = Instant::now() + self.timeout;
        let mut buffer = Vec::new();
        let mut chunk = [0u8; 8192];
        loop {
            let n = self.transport.read_chunk(&mut chunk)?;
            if n > 0 {
                buffer.extend_from_slice(&chunk[..n]);
                for (index, pattern) in patterns.iter().enumerate() {
                    if prompt::tail_matches(&buffer, pattern) {
                        return Ok((buffer, index));
                    }
                }
            }
            if Instant::now() >= deadline {
                return Err(Error::Timeout {
                    waiting_for: what.to_string(),
                    after: self.timeout,
                });
            }
        }
    }
}

/// Errors before the session is usable count as connection failures.
fn connect_phase(host: &str, error: Error) -> Error {
    match error {
        e @ (Error::ConnectionFailed { .. }
        | Error::AuthenticationFailed { .. }
        | Error::EnableFailed { .. }) => e,
        other => Error::ConnectionFailed {
            host: host.to_string(),
            message: other.to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    /// Transport that replays a canned conversation and records writes.
    struct ScriptedTransport {
        reads: VecDeque<Vec<u8>>,
        writes: Arc<Mutex<Vec<String>>>,
        closed: Arc<Mutex<bool>>,
    }

    impl Transport for ScriptedTransport {
        fn read_chunk(&mut self, buf: &mut [u8]) -> Result<usize> {
            match self.reads.pop_front() {
                Some(bytes) => {
                    buf[..bytes.len()].copy_from_slice(&bytes);
                    Ok(bytes.len())
                }
                None => Ok(0),
            }
        }

        fn write_all(&mut self, data: &[u8]) -> Result<()> {
            self.writes
                .lock()
                .unwrap()
                .push(String::from_utf8_lossy(data).to_string());
            Ok(())
        }

        fn close(&mut self) -> Result<()> {
            *self.closed.lock().unwrap() = true;
            Ok(())
        }
    }

    fn scripted(
        reads: &[&str],
    ) -> (
        Box<ScriptedTransport>,
        Arc<Mutex<Vec<String>>>,
        Arc<Mutex<bool>>,
    ) {
        let writes = Arc::new(Mutex::new(Vec::new()));
        let closed = Arc::new(Mutex::new(false));
        let transport = Box::new(ScriptedTransport {
            reads: reads.iter().map(|s| s.as_bytes().to_vec()).collect(),
            writes: Arc::clone(&writes),
            closed: Arc::clone(&closed),
        });
        (transport, writes, closed)
    }

    fn builder() -> DriverBuilder {
        DriverBuilder::new("sw1")
            .username("ops")
            .password("login-pw")
            .auth_secondary("enable-pw")
            .timeout(Duration::from_millis(100))
    }

    #[test]
    fn test_open_escalates_from_exec() {
        let (transport, writes, _) = scripted(&[
            "sw1>",
            "Password: ",
            "sw1#",
            "terminal length 0\r\nsw1#",
        ]);
        let driver = builder().open_with(transport).unwrap();
        drop(driver);

        let writes = writes.lock().unwrap();
        assert_eq!(
            *writes,
            vec![
                "\n",
                "enable\n",
                "enable-pw\n",
                "terminal length 0\n",
            ]
        );
    }

    #[test]
    fn test_open_already_privileged_skips_enable() {
        let (transport, writes, _) = scripted(&["sw1#", "terminal length 0\r\nsw1#"]);
        builder().open_with(transport).unwrap();
        assert_eq!(
            *writes.lock().unwrap(),
            vec!["\n", "terminal length 0\n"]
        );
    }

    #[test]
    fn test_open_no_enable_stays_in_exec() {
        let (transport, writes, _) = scripted(&["sw1>", "terminal length 0\r\nsw1>"]);
        builder()
            .desired_privilege(PrivilegeLevel::Exec)
            .open_with(transport)
            .unwrap();
        assert_eq!(
            *writes.lock().unwrap(),
            vec!["\n", "terminal length 0\n"]
        );
    }

    #[test]
    fn test_enable_without_password_prompt() {
        // Device with no enable secret drops straight into privileged mode.
        let (transport, writes, _) = scripted(&["sw1>", "sw1#", "terminal length 0\r\nsw1#"]);
        builder().open_with(transport).unwrap();
        let writes = writes.lock().unwrap();
        assert!(!writes.iter().any(|w| w == "enable-pw\n"));
    }

    #[test]
    fn test_send_command_cleans_output() {
        let (transport, _, _) = scripted(&[
            "sw1#",
            "terminal length 0\r\nsw1#",
            "show clock\r\n*10:04:01.042 UTC Mon Mar 3 2025\r\nsw1#",
        ]);
        let mut driver = builder().open_with(transport).unwrap();
        let response = driver.send_command("show clock").unwrap();
        assert_eq!(response.command, "show clock");
        assert_eq!(response.result, "*10:04:01.042 UTC Mon Mar 3 2025");
    }

    #[test]
    fn test_open_times_out_without_prompt() {
        let (transport, _, _) = scripted(&["garbage with no prompt\n"]);
        let err = builder().open_with(transport).unwrap_err();
        // Timeouts during open are reported as connection failures.
        assert!(err.is_connect_failure(), "unexpected error: {err}");
    }

    #[test]
    fn test_bad_enable_secret_is_enable_failure() {
        let (transport, _, _) = scripted(&["sw1>", "Password: ", "Password: "]);
        let err = builder().open_with(transport).unwrap_err();
        assert!(matches!(err, Error::EnableFailed { .. }), "{err}");
        assert!(err.is_connect_failure());
    }

    #[test]
    fn test_close_reaches_transport() {
        let (transport, _, closed) = scripted(&["sw1#", "terminal length 0\r\nsw1#"]);
        let mut driver = builder().open_with(transport).unwrap();
        driver.close().unwrap();
        assert!(*closed.lock().unwrap());
    }
}
