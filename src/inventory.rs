use anyhow::{Context, Result, bail};
use log::{info, warn};
use std::fs;
use std::path::Path;

use crate::cli::Cli;

/// Parse an inline comma-separated list: trim entries, drop blanks and
/// duplicates (first occurrence wins).
pub fn parse_inline_list(raw: &str) -> Vec<String> {
    dedupe(raw.split(',').map(str::trim).map(String::from).collect())
}

/// Read a list file: one entry per line, blanks and duplicates ignored.
pub fn load_list_file(path: &Path) -> Result<Vec<String>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("could not read {}", path.display()))?;
    Ok(dedupe(
        content.lines().map(str::trim).map(String::from).collect(),
    ))
}

fn dedupe(entries: Vec<String>) -> Vec<String> {
    let mut seen = Vec::new();
    for entry in entries {
        if !entry.is_empty() && !seen.contains(&entry) {
            seen.push(entry);
        }
    }
    seen
}

/// Resolve the host list from the CLI (inline list or inventory file).
pub fn load_hosts(cli: &Cli) -> Result<Vec<String>> {
    let hosts = if let Some(path) = &cli.inventory_file {
        load_list_file(path)?
    } else if let Some(inline) = &cli.inventory {
        parse_inline_list(inline)
    } else {
        bail!("no hosts specified: use --inventory or --inventory-file");
    };
    if hosts.is_empty() {
        bail!("host list is empty");
    }
    info!("found hosts: {}", hosts.join(","));
    Ok(hosts)
}

/// Where the per-host command list comes from.
pub enum CommandSource {
    /// Commands given inline on the command line, shared by all hosts
    Inline(Vec<String>),
    /// Commands loaded from a shared file, shared by all hosts
    SharedFile(Vec<String>),
    /// Commands loaded per host from `netrun_deploy_<host>.txt`
    Deploy,
}

impl CommandSource {
    /// Resolve the command source from the CLI.
    pub fn from_cli(cli: &Cli) -> Result<Self> {
        if cli.deploy {
            return Ok(Self::Deploy);
        }
        if let Some(path) = &cli.commands_file {
            let commands = load_list_file(path)?;
            if commands.is_empty() {
                bail!("command file {} contains no commands", path.display());
            }
            return Ok(Self::SharedFile(commands));
        }
        if let Some(words) = &cli.commands {
            // Words are joined back together and split on commas, so both
            // `-c "show version,show clock"` and `-c show version` work.
            let commands = parse_inline_list(&words.join(" "));
            if commands.is_empty() {
                bail!("no commands specified");
            }
            return Ok(Self::Inline(commands));
        }
        bail!("no commands specified: use --commands, --commands-file or --deploy");
    }

    /// Commands to run on `host`, or `None` when deploy mode has no file
    /// for this host (the host is skipped, not failed).
    pub fn commands_for(&self, host: &str) -> Result<Option<Vec<String>>> {
        match self {
            Self::Inline(commands) | Self::SharedFile(commands) => Ok(Some(commands.clone())),
            Self::Deploy => deploy_commands_in(Path::new("."), host),
        }
    }
}

/// Load deploy-mode commands for `host` from `dir`, or `None` when the
/// per-host file does not exist.
fn deploy_commands_in(dir: &Path, host: &str) -> Result<Option<Vec<String>>> {
    let path = dir.join(deploy_file_name(host));
    if !path.exists() {
        warn!("no {} found, skipping host", path.display());
        return Ok(None);
    }
    let commands = load_list_file(&path)?;
    info!("loaded {} commands from {}", commands.len(), path.display());
    Ok(Some(commands))
}

/// Deploy-mode command file name for a host.
pub fn deploy_file_name(host: &str) -> String {
    format!("netrun_deploy_{host}.txt")
}
