use anyhow::Result;
use log::{info, warn};

use crate::config::RunConfig;
use crate::inventory::CommandSource;
use crate::output::{FailureLog, OutputSink};
use crate::ui;

use sshkit::DriverBuilder;

/// How a host ended up at the end of the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostStatus {
    /// Connected and every command completed
    Succeeded,
    /// Never connected or authenticated; recorded in the failure log
    ConnectFailed,
    /// Connected, but a command failed; remaining commands were skipped
    CommandFailed,
    /// Deploy mode had no command file for this host
    Skipped,
}

/// Outcome of one host within a run.
pub struct HostResult {
    pub host: String,
    /// Ordered (command, output) pairs captured before any failure
    pub outputs: Vec<(String, String)>,
    pub status: HostStatus,
}

/// A single open session, as the run loop sees it.
pub trait HostSession {
    /// Run one command and return its cleaned output.
    fn send_command(&mut self, command: &str) -> sshkit::Result<String>;

    /// Tear the session down.
    fn close(&mut self);
}

/// Opens sessions to hosts. The run loop only talks to this trait, so tests
/// can substitute scripted sessions.
pub trait Dialer {
    /// Connect and authenticate to `host`, reaching the configured
    /// privilege level.
    fn dial(&self, host: &str) -> sshkit::Result<Box<dyn HostSession>>;
}

/// Production dialer backed by sshkit.
pub struct SshDialer<'a> {
    config: &'a RunConfig,
}

impl<'a> SshDialer<'a> {
    pub fn new(config: &'a RunConfig) -> Self {
        Self { config }
    }
}

impl Dialer for SshDialer<'_> {
    fn dial(&self, host: &str) -> sshkit::Result<Box<dyn HostSession>> {
        let driver = DriverBuilder::new(host)
            .username(self.config.username.as_str())
            .password(self.config.password.as_str())
            .auth_secondary(self.config.enable_secret.as_str())
            .port(self.config.port)
            .timeout(self.config.timeout)
            .platform(self.config.platform)
            .transport(self.config.transport)
            .desired_privilege(self.config.privilege)
            .open()?;
        Ok(Box::new(driver))
    }
}

impl HostSession for sshkit::Driver {
    fn send_command(&mut self, command: &str) -> sshkit::Result<String> {
        self.send_command(command).map(|response| response.result)
    }

    fn close(&mut self) {
        if let Err(e) = sshkit::Driver::close(self) {
            warn!("error while closing session: {e}");
        }
    }
}

/// Run the command set against every host in order.
///
/// Hosts are independent: a failure is reported, recorded when it was a
/// connection failure, and the loop moves on.
pub fn execute(
    hosts: &[String],
    source: &CommandSource,
    dialer: &dyn Dialer,
    sink: &OutputSink,
    failure_log: &FailureLog,
) -> Result<Vec<HostResult>> {
    let mut results = Vec::with_capacity(hosts.len());

    for host in hosts {
        let Some(commands) = source.commands_for(host)? else {
            results.push(HostResult {
                host: host.clone(),
                outputs: Vec::new(),
                status: HostStatus::Skipped,
            });
            continue;
        };

        info!("connecting to host {host}");
        let mut session = match dialer.dial(host) {
            Ok(session) => session,
            Err(e) => {
                ui::error(&format!("{host}: {e}"));
                failure_log.record(host)?;
                results.push(HostResult {
                    host: host.clone(),
                    outputs: Vec::new(),
                    status: HostStatus::ConnectFailed,
                });
                continue;
            }
        };
        info!("connected and authenticated to {host}");

        let mut host_sink = sink.start_host(host)?;
        let mut outputs = Vec::with_capacity(commands.len());
        let mut status = HostStatus::Succeeded;

        for command in &commands {
            match session.send_command(command) {
                Ok(output) => {
                    host_sink.record(command, &output)?;
                    outputs.push((command.clone(), output));
                }
                Err(e) => {
                    ui::error(&format!("{host}: command {command:?} failed: {e}"));
                    status = HostStatus::CommandFailed;
                    break;
                }
            }
        }

        session.close();
        results.push(HostResult {
            host: host.clone(),
            outputs,
            status,
        });
    }

    Ok(results)
}

/// Print the end-of-run summary.
pub fn print_summary(results: &[HostResult], failure_log: &FailureLog) {
    let succeeded = count(results, HostStatus::Succeeded);
    let connect_failed = count(results, HostStatus::ConnectFailed);
    let command_failed = count(results, HostStatus::CommandFailed);
    let skipped = count(results, HostStatus::Skipped);

    ui::header("Run summary");
    ui::success(&format!("{succeeded} host(s) completed"));
    if command_failed > 0 {
        ui::warn(&format!(
            "{command_failed} host(s) failed mid-run: {}",
            names(results, HostStatus::CommandFailed)
        ));
    }
    if skipped > 0 {
        ui::warn(&format!(
            "{skipped} host(s) skipped (no deploy file): {}",
            names(results, HostStatus::Skipped)
        ));
    }
    if connect_failed > 0 {
        ui::error(&format!(
            "{connect_failed} host(s) unreachable: {}",
            names(results, HostStatus::ConnectFailed)
        ));
        ui::dim(&format!(
            "failed hosts recorded in {}",
            failure_log.path().display()
        ));
    }
}

fn count(results: &[HostResult], status: HostStatus) -> usize {
    results.iter().filter(|r| r.status == status).count()
}

fn names(results: &[HostResult], status: HostStatus) -> String {
    results
        .iter()
        .filter(|r| r.status == status)
        .map(|r| r.host.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RunConfig;
    use sshkit::{Error, Platform, PrivilegeLevel, TransportKind};
    use std::fs;
    use std::time::Duration;

    struct FakeSession;

    impl HostSession for FakeSession {
        fn send_command(&mut self, command: &str) -> sshkit::Result<String> {
            if command == "bad command" {
                return Err(Error::ChannelFailed {
                    message: "broken".to_string(),
                });
            }
            Ok(format!("output of {command}"))
        }

        fn close(&mut self) {}
    }

    /// Dialer that refuses the hosts on its blocklist.
    struct FakeDialer {
        unreachable: Vec<&'static str>,
    }

    impl Dialer for FakeDialer {
        fn dial(&self, host: &str) -> sshkit::Result<Box<dyn HostSession>> {
            if self.unreachable.contains(&host) {
                return Err(Error::ConnectionFailed {
                    host: host.to_string(),
                    message: "connection refused".to_string(),
                });
            }
            Ok(Box::new(FakeSession))
        }
    }

    fn test_config() -> RunConfig {
        RunConfig {
            username: "ops".to_string(),
            password: "pw".to_string(),
            enable_secret: "pw".to_string(),
            privilege: PrivilegeLevel::PrivilegedExec,
            transport: TransportKind::Ssh2,
            platform: Platform::CiscoIosxe,
            port: 22,
            timeout: Duration::from_secs(10),
            save: false,
            separate_output: false,
            print: false,
            output_directory: None,
        }
    }

    fn hosts(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_failed_host_does_not_abort_run() {
        let dir = tempfile::tempdir().unwrap();
        let failure_log = FailureLog::new(dir.path(), "stamp");
        let sink = OutputSink::from_config(&test_config(), "stamp");
        let source = CommandSource::Inline(vec!["show version".to_string()]);
        let dialer = FakeDialer {
            unreachable: vec!["sw2"],
        };

        let results = execute(
            &hosts(&["sw1", "sw2", "sw3"]),
            &source,
            &dialer,
            &sink,
            &failure_log,
        )
        .unwrap();

        assert_eq!(results.len(), 3);
        assert_eq!(results[0].status, HostStatus::Succeeded);
        assert_eq!(results[1].status, HostStatus::ConnectFailed);
        assert_eq!(results[2].status, HostStatus::Succeeded);
        assert_eq!(
            results[2].outputs,
            vec![(
                "show version".to_string(),
                "output of show version".to_string()
            )]
        );
    }

    #[test]
    fn test_failure_log_contains_exactly_failed_hosts() {
        let dir = tempfile::tempdir().unwrap();
        let failure_log = FailureLog::new(dir.path(), "stamp");
        let sink = OutputSink::from_config(&test_config(), "stamp");
        let source = CommandSource::Inline(vec!["show clock".to_string()]);
        let dialer = FakeDialer {
            unreachable: vec!["sw1", "sw4"],
        };

        execute(
            &hosts(&["sw1", "sw2", "sw3", "sw4"]),
            &source,
            &dialer,
            &sink,
            &failure_log,
        )
        .unwrap();

        let content = fs::read_to_string(failure_log.path()).unwrap();
        assert_eq!(content, "sw1\nsw4\n");
    }

    #[test]
    fn test_command_failure_is_not_a_connect_failure() {
        let dir = tempfile::tempdir().unwrap();
        let failure_log = FailureLog::new(dir.path(), "stamp");
        let sink = OutputSink::from_config(&test_config(), "stamp");
        let source = CommandSource::Inline(vec![
            "show version".to_string(),
            "bad command".to_string(),
            "show clock".to_string(),
        ]);
        let dialer = FakeDialer {
            unreachable: vec![],
        };

        let results = execute(&hosts(&["sw1"]), &source, &dialer, &sink, &failure_log).unwrap();

        assert_eq!(results[0].status, HostStatus::CommandFailed);
        // Output captured before the failure is kept; the rest is skipped.
        assert_eq!(results[0].outputs.len(), 1);
        // A mid-run failure is not a connection failure.
        assert!(!failure_log.path().exists());
    }

    /// Dialer for paths that must never open a session.
    struct RefuseAllDialer;

    impl Dialer for RefuseAllDialer {
        fn dial(&self, host: &str) -> sshkit::Result<Box<dyn HostSession>> {
            panic!("unexpected dial to {host}");
        }
    }

    #[test]
    fn test_deploy_skip_leaves_no_failure_log() {
        let dir = tempfile::tempdir().unwrap();
        let failure_log = FailureLog::new(dir.path(), "stamp");
        let sink = OutputSink::from_config(&test_config(), "stamp");
        // No netrun_deploy_<host>.txt exists for this host, so the run loop
        // must skip it without dialing.
        let source = CommandSource::Deploy;

        let results = execute(
            &hosts(&["sw-without-deploy-file"]),
            &source,
            &RefuseAllDialer,
            &sink,
            &failure_log,
        )
        .unwrap();

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].status, HostStatus::Skipped);
        assert!(results[0].outputs.is_empty());
        // A skipped host is not a connection failure.
        assert!(!failure_log.path().exists());
    }

    #[test]
    fn test_summary_names_hosts_by_status() {
        let results = vec![
            HostResult {
                host: "sw1".to_string(),
                outputs: Vec::new(),
                status: HostStatus::ConnectFailed,
            },
            HostResult {
                host: "sw2".to_string(),
                outputs: Vec::new(),
                status: HostStatus::Succeeded,
            },
            HostResult {
                host: "sw3".to_string(),
                outputs: Vec::new(),
                status: HostStatus::ConnectFailed,
            },
        ];
        assert_eq!(names(&results, HostStatus::ConnectFailed), "sw1, sw3");
        assert_eq!(names(&results, HostStatus::Skipped), "");
    }

    #[test]
    fn test_all_hosts_reachable_leaves_no_failure_log() {
        let dir = tempfile::tempdir().unwrap();
        let failure_log = FailureLog::new(dir.path(), "stamp");
        let sink = OutputSink::from_config(&test_config(), "stamp");
        let source = CommandSource::Inline(vec!["show clock".to_string()]);
        let dialer = FakeDialer {
            unreachable: vec![],
        };

        execute(&hosts(&["sw1", "sw2"]), &source, &dialer, &sink, &failure_log).unwrap();
        assert!(!failure_log.path().exists());
    }
}
