//! Extraction of SSH connection targets from job log messages

use regex::Regex;
use std::sync::OnceLock;

fn connection_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^.*Command: ssh -i </path/to/key> (\S+);").unwrap()
    })
}

/// Return the `user@host` part of an SSH instruction embedded in a log
/// message, if the message contains one.
///
/// ```
/// use rescale::ssh::parse_connection;
///
/// let msg = "Cluster ready. Command: ssh -i </path/to/key> uprod_xyz@3.3.3.3; then run";
/// assert_eq!(parse_connection(msg).as_deref(), Some("uprod_xyz@3.3.3.3"));
/// assert_eq!(parse_connection("Job queued"), None);
/// ```
pub fn parse_connection(message: &str) -> Option<String> {
    connection_pattern()
        .captures(message)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_requires_trailing_semicolon() {
        assert_eq!(
            parse_connection("Command: ssh -i </path/to/key> user@10.0.0.1;"),
            Some("user@10.0.0.1".to_string())
        );
        assert_eq!(
            parse_connection("Command: ssh -i </path/to/key> user@10.0.0.1"),
            None
        );
    }

    #[test]
    fn test_other_key_placeholder_does_not_match() {
        assert_eq!(parse_connection("Command: ssh -i key.pem user@host;"), None);
    }

    #[test]
    fn test_only_first_line_is_searched() {
        let msg = "Cluster ready Command: ssh -i </path/to/key> a@b; more\nsecond line";
        assert_eq!(parse_connection(msg), Some("a@b".to_string()));

        let msg = "First line\nCommand: ssh -i </path/to/key> a@b;";
        assert_eq!(parse_connection(msg), None);
    }
}
