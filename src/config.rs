use anyhow::{Context, Result};
use log::info;
use std::env;
use std::time::Duration;

use sshkit::{Platform, PrivilegeLevel, TransportKind};

use crate::cli::Cli;

pub const USERNAME_VAR: &str = "NETRUN_USERNAME";
pub const PASSWORD_VAR: &str = "NETRUN_PASSWORD";
pub const ENABLE_VAR: &str = "NETRUN_ENABLE";

/// Fully resolved configuration for one run.
///
/// Credentials are resolved once, up front, and reused for every host.
pub struct RunConfig {
    pub username: String,
    pub password: String,
    pub enable_secret: String,
    pub privilege: PrivilegeLevel,
    pub transport: TransportKind,
    pub platform: Platform,
    pub port: u16,
    pub timeout: Duration,
    pub save: bool,
    pub separate_output: bool,
    pub print: bool,
    pub output_directory: Option<String>,
}

impl RunConfig {
    /// Resolve the run configuration from parsed CLI flags, the NETRUN_*
    /// environment variables, and interactive prompts, in that order.
    pub fn resolve(cli: &Cli) -> Result<Self> {
        let username = resolve_credential(cli.username.clone(), env_value(USERNAME_VAR), || {
            prompt_username()
        })?;
        let password = resolve_credential(cli.password.clone(), env_value(PASSWORD_VAR), || {
            prompt_password()
        })?;

        let privilege = if cli.no_enable {
            PrivilegeLevel::Exec
        } else {
            PrivilegeLevel::PrivilegedExec
        };

        // The enable secret is never prompted for; it falls back to the
        // login password.
        let enable_secret = match cli.enable_password.clone().or_else(|| env_value(ENABLE_VAR)) {
            Some(secret) => secret,
            None => {
                if privilege == PrivilegeLevel::PrivilegedExec {
                    info!("no enable secret specified, using the login password");
                }
                password.clone()
            }
        };

        Ok(Self {
            username,
            password,
            enable_secret,
            privilege,
            transport: cli.transport.into(),
            platform: cli.platform.into(),
            port: cli.port.unwrap_or(22),
            timeout: Duration::from_secs(cli.timeout),
            save: cli.save || cli.separate_output,
            separate_output: cli.separate_output,
            print: cli.print,
            output_directory: cli.output_directory.clone(),
        })
    }
}

fn env_value(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.is_empty())
}

/// Pick the first available source: CLI flag, environment variable, prompt.
fn resolve_credential(
    flag: Option<String>,
    env_value: Option<String>,
    prompt: impl FnOnce() -> Result<String>,
) -> Result<String> {
    match flag.or(env_value) {
        Some(value) => Ok(value),
        None => prompt(),
    }
}

fn prompt_username() -> Result<String> {
    dialoguer::Input::<String>::new()
        .with_prompt("SSH Username")
        .interact_text()
        .context("could not read username from terminal")
}

fn prompt_password() -> Result<String> {
    dialoguer::Password::new()
        .with_prompt("SSH Password")
        .interact()
        .context("could not read password from terminal")
}
