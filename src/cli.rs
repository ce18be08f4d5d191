use clap::{Parser, ValueEnum};
use std::path::PathBuf;

use sshkit::{Platform, TransportKind};

#[derive(Parser)]
#[command(name = "netrun")]
#[command(version)]
#[command(about = "Run commands on network hosts from the command line", long_about = None)]
#[command(after_help = "Environment:\n  \
    NETRUN_USERNAME  fallback for --username\n  \
    NETRUN_PASSWORD  fallback for --password\n  \
    NETRUN_ENABLE    fallback for --enable-password\n\n\
Credentials resolve in order: flag, environment variable, interactive prompt.")]
pub struct Cli {
    /// Transport mechanism
    #[arg(
        short = 't',
        long,
        value_enum,
        default_value_t = TransportArg::Ssh2,
        help_heading = "Host inventory"
    )]
    pub transport: TransportArg,

    /// Network OS platform
    #[arg(
        short = 'x',
        long,
        value_enum,
        default_value_t = PlatformArg::CiscoIosxe,
        help_heading = "Host inventory"
    )]
    pub platform: PlatformArg,

    /// Host(s) to connect to (multiple hosts separated by commas)
    #[arg(
        short = 'i',
        long,
        value_name = "HOST,...",
        conflicts_with = "inventory_file",
        help_heading = "Host inventory"
    )]
    pub inventory: Option<String>,

    /// Text file containing a list of hostnames/IP addresses
    #[arg(short = 'I', long, value_name = "FILE", help_heading = "Host inventory")]
    pub inventory_file: Option<PathBuf>,

    /// Host port (default 22)
    #[arg(long, value_name = "PORT", help_heading = "Host inventory")]
    pub port: Option<u16>,

    /// Per-operation timeout in seconds
    #[arg(
        long,
        value_name = "SECONDS",
        default_value_t = 10,
        help_heading = "Host inventory"
    )]
    pub timeout: u64,

    /// Command(s) to execute (multiple commands separated by commas)
    #[arg(
        short = 'c',
        long = "commands",
        value_name = "COMMAND",
        num_args = 1..,
        conflicts_with_all = ["commands_file", "deploy"],
        help_heading = "Commands"
    )]
    pub commands: Option<Vec<String>>,

    /// Text file containing a list of commands
    #[arg(
        short = 'C',
        long,
        value_name = "FILE",
        conflicts_with = "deploy",
        help_heading = "Commands"
    )]
    pub commands_file: Option<PathBuf>,

    /// Load commands from netrun_deploy_<host>.txt for each host
    #[arg(long, help_heading = "Commands")]
    pub deploy: bool,

    /// SSH username
    #[arg(short = 'u', long, value_name = "USERNAME", help_heading = "Authentication")]
    pub username: Option<String>,

    /// SSH password
    #[arg(short = 'p', long, value_name = "PASSWORD", help_heading = "Authentication")]
    pub password: Option<String>,

    /// Enable password/secret (defaults to the authentication password)
    #[arg(short = 'e', long, value_name = "SECRET", help_heading = "Authentication")]
    pub enable_password: Option<String>,

    /// Do not go into enable mode after login
    #[arg(short = 'n', long, help_heading = "Authentication")]
    pub no_enable: bool,

    /// Save the output to a text file (one file per host)
    #[arg(short = 's', long, help_heading = "Output")]
    pub save: bool,

    /// Save the output of each command to a different text file
    #[arg(short = 'S', long, help_heading = "Output")]
    pub separate_output: bool,

    /// Also print to the terminal while saving
    #[arg(short = 'P', long, help_heading = "Output")]
    pub print: bool,

    /// Directory to save output files to; supports {date_time}, {host} and {username}
    #[arg(short = 'o', long, value_name = "DIR", help_heading = "Output")]
    pub output_directory: Option<String>,

    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long)]
    pub quiet: bool,
}

/// Transport choice as exposed on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum TransportArg {
    /// Bundled cross-platform SSH client (libssh2)
    #[value(name = "ssh2")]
    Ssh2,
    /// The system's native ssh, honoring ~/.ssh/config
    #[value(name = "system")]
    System,
}

impl From<TransportArg> for TransportKind {
    fn from(value: TransportArg) -> Self {
        match value {
            TransportArg::Ssh2 => TransportKind::Ssh2,
            TransportArg::System => TransportKind::System,
        }
    }
}

/// Platform choice as exposed on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum PlatformArg {
    /// Cisco IOS / IOS-XE
    #[value(name = "cisco_iosxe")]
    CiscoIosxe,
    /// Cisco NX-OS
    #[value(name = "cisco_nxos")]
    CiscoNxos,
    /// Generic shell prompt
    #[value(name = "generic")]
    Generic,
}

impl From<PlatformArg> for Platform {
    fn from(value: PlatformArg) -> Self {
        match value {
            PlatformArg::CiscoIosxe => Platform::CiscoIosxe,
            PlatformArg::CiscoNxos => Platform::CiscoNxos,
            PlatformArg::Generic => Platform::Generic,
        }
    }
}
