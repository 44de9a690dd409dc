//! Command line tokenizing: splits a line into an argument vector and
//! detects the trailing background marker.

use jsh_types::JshError;
use tracing::debug;

pub const BACKGROUND_MARKER: char = '&';

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedCommand {
    pub argv: Vec<String>,
    pub background: bool,
    /// The line as typed, kept for listings and echo lines.
    pub text: String,
}

impl ParsedCommand {
    pub fn name(&self) -> &str {
        &self.argv[0]
    }
}

/// Parses one input line. Blank lines yield `None`.
pub fn parse_line(line: &str) -> Result<Option<ParsedCommand>, JshError> {
    let text = line.trim();
    if text.is_empty() {
        return Ok(None);
    }

    let (body, background) = match text.strip_suffix(BACKGROUND_MARKER) {
        Some(rest) => (rest, true),
        None => (text, false),
    };
    let argv = shell_words::split(body).map_err(|e| JshError::Parse(e.to_string()))?;
    if argv.is_empty() {
        return Ok(None);
    }

    debug!("parse_line: {:?} background:{}", argv, background);
    Ok(Some(ParsedCommand {
        argv,
        background,
        text: text.to_string(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(line: &str) -> ParsedCommand {
        parse_line(line).unwrap().unwrap()
    }

    #[test]
    fn blank_lines_are_ignored() {
        assert_eq!(parse_line("").unwrap(), None);
        assert_eq!(parse_line("   \n").unwrap(), None);
        assert_eq!(parse_line("&\n").unwrap(), None);
    }

    #[test]
    fn foreground_command() {
        let cmd = parse("/bin/echo hello world\n");
        assert_eq!(cmd.argv, vec!["/bin/echo", "hello", "world"]);
        assert!(!cmd.background);
        assert_eq!(cmd.name(), "/bin/echo");
        assert_eq!(cmd.text, "/bin/echo hello world");
    }

    #[test]
    fn background_marker_as_separate_token() {
        let cmd = parse("sleep 1 &\n");
        assert_eq!(cmd.argv, vec!["sleep", "1"]);
        assert!(cmd.background);
        assert_eq!(cmd.text, "sleep 1 &");
    }

    #[test]
    fn background_marker_attached() {
        let cmd = parse("sleep 1&");
        assert_eq!(cmd.argv, vec!["sleep", "1"]);
        assert!(cmd.background);
    }

    #[test]
    fn quoted_arguments_stay_together() {
        let cmd = parse("echo 'a b' \"c&\"");
        assert_eq!(cmd.argv, vec!["echo", "a b", "c&"]);
        assert!(!cmd.background);
    }

    #[test]
    fn unbalanced_quote_is_a_user_error() {
        let err = parse_line("echo 'oops").unwrap_err();
        assert!(matches!(err, JshError::Parse(_)));
        assert!(!err.is_fatal());
    }
}
