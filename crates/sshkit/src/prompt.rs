//! Prompt detection in the session read buffer.
//!
//! The driver accumulates raw bytes from the transport and, after every read,
//! checks whether a device prompt has appeared at the *end* of the buffer.
//! Only the tail is searched so a prompt-looking string in the middle of
//! command output never terminates a read early.

use regex::Regex;

/// How many bytes from the end of the buffer are searched for a prompt.
///
/// Device prompts are short; a small window keeps the scan cheap no matter
/// how much output has accumulated.
pub const TAIL_SEARCH_BYTES: usize = 256;

/// Check whether `pattern` matches at the tail of the buffer.
pub fn tail_matches(buffer: &[u8], pattern: &Regex) -> bool {
    let start = buffer.len().saturating_sub(TAIL_SEARCH_BYTES);
    let tail = String::from_utf8_lossy(&buffer[start..]);
    pattern.is_match(tail.trim_end_matches([' ', '\t']))
}

/// Extract command output from a raw prompt-to-prompt capture.
///
/// The capture contains the echoed command on the first line and the next
/// prompt on the last line; both are dropped. Carriage returns from the PTY
/// are normalized away.
pub fn clean_output(raw: &str, command: &str) -> String {
    let normalized = raw.replace("\r\n", "\n").replace('\r', "\n");
    let mut lines: Vec<&str> = normalized.lines().collect();

    // Drop the echoed command (the PTY echoes what we typed).
    if let Some(first) = lines.first() {
        if first.trim_end() == command || first.trim_end().ends_with(command) {
            lines.remove(0);
        }
    }

    // The read stopped because the last line is the next prompt; drop it.
    lines.pop();

    let mut output = lines.join("\n");
    while output.ends_with('\n') {
        output.pop();
    }
    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::LazyLock;

    static PRIVILEGED: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"[\w.@()/:+-]{1,63}#\s*$").unwrap());

    #[test]
    fn test_tail_match_at_end() {
        let buf = b"show version\nCisco IOS XE Software\nsw1#";
        assert!(tail_matches(buf, &PRIVILEGED));
    }

    #[test]
    fn test_tail_match_with_trailing_space() {
        let buf = b"some output\nsw1# ";
        assert!(tail_matches(buf, &PRIVILEGED));
    }

    #[test]
    fn test_prompt_mid_buffer_does_not_match() {
        let buf = b"interface GigabitEthernet0/0#\ndescription uplink\nmore output";
        assert!(!tail_matches(buf, &PRIVILEGED));
    }

    #[test]
    fn test_tail_match_large_buffer() {
        let mut buf = vec![b'x'; 64 * 1024];
        buf.extend_from_slice(b"\nsw1#");
        assert!(tail_matches(&buf, &PRIVILEGED));
    }

    #[test]
    fn test_clean_output_strips_echo_and_prompt() {
        let raw = "show clock\r\n*10:04:01.042 UTC Mon Mar 3 2025\r\nsw1#";
        assert_eq!(
            clean_output(raw, "show clock"),
            "*10:04:01.042 UTC Mon Mar 3 2025"
        );
    }

    #[test]
    fn test_clean_output_multi_line() {
        let raw = "show ip int brief\r\nInterface  IP-Address\r\nGi0/0      10.0.0.1\r\nsw1#";
        assert_eq!(
            clean_output(raw, "show ip int brief"),
            "Interface  IP-Address\nGi0/0      10.0.0.1"
        );
    }

    #[test]
    fn test_clean_output_without_echo() {
        let raw = "line one\nline two\nsw1#";
        assert_eq!(clean_output(raw, "show foo"), "line one\nline two");
    }
}
