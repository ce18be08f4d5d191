//! Network OS platform definitions.
//!
//! A platform bundles the prompt patterns and mode-change commands the driver
//! needs to converse with a given network OS family. Prompts are matched at
//! the tail of the read buffer, so every pattern is anchored at end of input.

use regex::Regex;
use std::sync::LazyLock;

/// Privilege level of a device session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrivilegeLevel {
    /// Default, unprivileged command mode
    Exec,
    /// Privileged (enable) mode, entered after login
    PrivilegedExec,
}

impl PrivilegeLevel {
    /// Human-readable name for logs.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Exec => "exec",
            Self::PrivilegedExec => "privileged exec",
        }
    }
}

static CISCO_EXEC: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[\w.@()/:+-]{1,63}>\s*$").unwrap()
});
static CISCO_PRIVILEGED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[\w.@()/:+-]{1,63}#\s*$").unwrap()
});
static PASSWORD_PROMPT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)password:?\s*$").unwrap()
});
static GENERIC_PROMPT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[$%#>]\s*$").unwrap()
});

/// A supported network OS platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Platform {
    /// Cisco IOS / IOS-XE
    #[default]
    CiscoIosxe,
    /// Cisco NX-OS
    CiscoNxos,
    /// Generic shell prompt (Linux boxes, unknown devices)
    Generic,
}

impl Platform {
    /// All known platforms.
    pub fn all() -> &'static [Platform] {
        &[Platform::CiscoIosxe, Platform::CiscoNxos, Platform::Generic]
    }

    /// Platform identifier as used on the command line.
    pub fn name(&self) -> &'static str {
        match self {
            Platform::CiscoIosxe => "cisco_iosxe",
            Platform::CiscoNxos => "cisco_nxos",
            Platform::Generic => "generic",
        }
    }

    /// Look up a platform by its command-line identifier.
    pub fn from_name(name: &str) -> Option<Platform> {
        match name {
            "cisco_iosxe" => Some(Platform::CiscoIosxe),
            "cisco_nxos" => Some(Platform::CiscoNxos),
            "generic" => Some(Platform::Generic),
            _ => None,
        }
    }

    /// Prompt shown in unprivileged exec mode.
    pub fn exec_prompt(&self) -> &'static Regex {
        match self {
            Platform::CiscoIosxe | Platform::CiscoNxos => &CISCO_EXEC,
            Platform::Generic => &GENERIC_PROMPT,
        }
    }

    /// Prompt shown in privileged (enable) mode.
    ///
    /// For the generic platform there is no mode distinction; the same
    /// pattern covers both.
    pub fn privileged_prompt(&self) -> &'static Regex {
        match self {
            Platform::CiscoIosxe | Platform::CiscoNxos => &CISCO_PRIVILEGED,
            Platform::Generic => &GENERIC_PROMPT,
        }
    }

    /// Prompt the device shows when asking for the enable secret.
    pub fn password_prompt(&self) -> &'static Regex {
        &PASSWORD_PROMPT
    }

    /// Command that enters privileged mode, if the platform has one.
    pub fn enable_command(&self) -> Option<&'static str> {
        match self {
            Platform::CiscoIosxe | Platform::CiscoNxos => Some("enable"),
            Platform::Generic => None,
        }
    }

    /// Command that turns off output paging, if the platform has one.
    pub fn disable_paging_command(&self) -> Option<&'static str> {
        match self {
            Platform::CiscoIosxe | Platform::CiscoNxos => Some("terminal length 0"),
            Platform::Generic => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_platform_name_round_trip() {
        for platform in Platform::all() {
            assert_eq!(Platform::from_name(platform.name()), Some(*platform));
        }
        assert_eq!(Platform::from_name("juniper_junos"), None);
    }

    #[test]
    fn test_cisco_prompts() {
        let p = Platform::CiscoIosxe;
        assert!(p.exec_prompt().is_match("core-sw1>"));
        assert!(p.exec_prompt().is_match("edge.router-2> "));
        assert!(!p.exec_prompt().is_match("core-sw1#"));

        assert!(p.privileged_prompt().is_match("core-sw1#"));
        assert!(p.privileged_prompt().is_match("core-sw1(config)#"));
        assert!(!p.privileged_prompt().is_match("core-sw1>"));
    }

    #[test]
    fn test_password_prompt() {
        let p = Platform::CiscoIosxe;
        assert!(p.password_prompt().is_match("Password: "));
        assert!(p.password_prompt().is_match("password:"));
        assert!(!p.password_prompt().is_match("core-sw1#"));
    }

    #[test]
    fn test_generic_platform_has_no_modes() {
        let p = Platform::Generic;
        assert!(p.enable_command().is_none());
        assert!(p.disable_paging_command().is_none());
        assert!(p.exec_prompt().is_match("user@box:~$ "));
        assert!(p.exec_prompt().is_match("box# "));
    }
}
