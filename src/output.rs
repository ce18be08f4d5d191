use anyhow::{Context, Result};
use chrono::Local;
use log::info;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::config::RunConfig;

/// Width of the separator lines in host banners and command headers.
const SEPARATOR_WIDTH: usize = 120;

/// Timestamp used in filenames and command headers.
pub fn timestamp() -> String {
    Local::now().format("%Y-%m-%d_%Hh%Mm%S").to_string()
}

/// Where and how per-host output is written.
pub struct OutputSink {
    save: bool,
    separate: bool,
    print: bool,
    directory: Option<String>,
    username: String,
    run_stamp: String,
}

impl OutputSink {
    /// Build the sink from the run configuration and the run timestamp.
    pub fn from_config(config: &RunConfig, run_stamp: &str) -> Self {
        Self {
            save: config.save,
            separate: config.separate_output,
            print: config.print,
            directory: config.output_directory.clone(),
            username: config.username.clone(),
            run_stamp: run_stamp.to_string(),
        }
    }

    /// Start output for one host: create its file if saving, print the host
    /// banner if the terminal is part of the output.
    pub fn start_host(&self, host: &str) -> Result<HostSink<'_>> {
        let directory = if self.save {
            self.resolve_directory(host)?
        } else {
            PathBuf::from(".")
        };

        let file = if self.save && !self.separate {
            let path = directory.join(format!(
                "netrun_output_{host}_{stamp}.txt",
                stamp = self.run_stamp
            ));
            info!("output will be saved to {}", path.display());
            Some(File::create(&path).with_context(|| {
                format!("could not create output file {}", path.display())
            })?)
        } else {
            None
        };

        if self.prints_to_terminal() {
            print!("{}", host_banner(host));
        }

        Ok(HostSink {
            sink: self,
            host: host.to_string(),
            directory,
            file,
        })
    }

    fn prints_to_terminal(&self) -> bool {
        !self.save || self.print
    }

    /// Expand `~` and the `{date_time}`, `{host}`, `{username}` placeholders
    /// in the output directory template and create the directory.
    fn resolve_directory(&self, host: &str) -> Result<PathBuf> {
        let directory = match &self.directory {
            Some(template) => {
                let expanded = shellexpand::tilde(template);
                PathBuf::from(render_template(
                    expanded.as_ref(),
                    host,
                    &self.username,
                    &self.run_stamp,
                ))
            }
            None => PathBuf::from("."),
        };
        fs::create_dir_all(&directory).with_context(|| {
            format!("could not create output directory {}", directory.display())
        })?;
        Ok(directory)
    }
}

/// Output handling for a single host within a run.
pub struct HostSink<'a> {
    sink: &'a OutputSink,
    host: String,
    directory: PathBuf,
    file: Option<File>,
}

impl HostSink<'_> {
    /// Record the output of one command: write it to the configured file(s)
    /// and/or the terminal.
    pub fn record(&mut self, command: &str, output: &str) -> Result<()> {
        let stamp = timestamp();
        let block = command_block(&stamp, &self.host, command, output);

        if self.sink.separate {
            let path = self.directory.join(format!(
                "{host}_{command}_{stamp}.txt",
                host = self.host,
                command = sanitize_for_filename(command),
            ));
            info!("saving output of {command:?} to {}", path.display());
            fs::write(&path, &block)
                .with_context(|| format!("could not write {}", path.display()))?;
        } else if let Some(file) = &mut self.file {
            file.write_all(block.as_bytes())
                .context("could not write host output file")?;
        }

        if self.sink.prints_to_terminal() {
            print!("{block}");
        }
        Ok(())
    }
}

fn host_banner(host: &str) -> String {
    let bar = "*".repeat(SEPARATOR_WIDTH);
    let mut title = format!("***** {host} ");
    while title.len() < SEPARATOR_WIDTH {
        title.push('*');
    }
    format!("\n{bar}\n{title}\n{bar}\n")
}

fn command_block(stamp: &str, host: &str, command: &str, output: &str) -> String {
    let bar = "-".repeat(SEPARATOR_WIDTH);
    format!("{bar}\n[{stamp}] {host}: Output of command '{command}':\n{bar}\n{output}\n\n")
}

/// Whitespace and path separators in a command become dashes so the command
/// can name a file.
fn sanitize_for_filename(command: &str) -> String {
    command
        .chars()
        .map(|c| if c.is_whitespace() || c == '/' { '-' } else { c })
        .collect()
}

/// Substitute the supported placeholders in an output-directory template.
fn render_template(template: &str, host: &str, username: &str, date_time: &str) -> String {
    template
        .replace("{date_time}", date_time)
        .replace("{host}", host)
        .replace("{username}", username)
}

/// Run-scoped log of hosts that failed to connect.
///
/// The file is created lazily on the first failure, so it exists exactly
/// when the run had connection failures.
pub struct FailureLog {
    path: PathBuf,
}

impl FailureLog {
    /// Failure log for this run, named with the run timestamp.
    pub fn new(directory: &Path, run_stamp: &str) -> Self {
        Self {
            path: directory.join(format!("netrun_failed_{run_stamp}.txt")),
        }
    }

    /// Append a failed host.
    pub fn record(&self, host: &str) -> Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("could not open failure log {}", self.path.display()))?;
        writeln!(file, "{host}")
            .with_context(|| format!("could not write failure log {}", self.path.display()))?;
        Ok(())
    }

    /// Path of the failure log.
    pub fn path(&self) -> &Path {
        &self.path
    }
}
