//! Parsing of interactive input lines into chat commands.

use std::path::PathBuf;

use shared::domain::DocumentKind;

pub const HELP: &str = "\
commands:
  /attach <path>     stage a .csv or .pdf document (max 500 MiB)
  /remove csv|pdf    drop a staged document
  /clear             clear the conversation and start over
  /status            show session, staged documents and busy state
  /help              show this help
  /quit              exit
anything else is sent as a message; start with // to send a literal '/'";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatCommand {
    Attach(PathBuf),
    Remove(DocumentKind),
    Clear,
    Status,
    Help,
    Quit,
    Send(String),
}

/// Returns `Ok(None)` for blank lines.
pub fn parse_line(line: &str) -> Result<Option<ChatCommand>, String> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    if let Some(literal) = line.strip_prefix("//") {
        return Ok(Some(ChatCommand::Send(format!("/{literal}"))));
    }
    let Some(command) = line.strip_prefix('/') else {
        return Ok(Some(ChatCommand::Send(line.to_string())));
    };

    let (name, arg) = match command.split_once(char::is_whitespace) {
        Some((name, arg)) => (name, arg.trim()),
        None => (command, ""),
    };
    let parsed = match (name.to_ascii_lowercase().as_str(), arg) {
        ("attach" | "upload", "") => return Err("usage: /attach <path>".to_string()),
        ("attach" | "upload", path) => ChatCommand::Attach(PathBuf::from(unquote(path))),
        ("remove", "") => return Err("usage: /remove csv|pdf".to_string()),
        ("remove", kind) => ChatCommand::Remove(kind.parse()?),
        ("clear", _) => ChatCommand::Clear,
        ("status", _) => ChatCommand::Status,
        ("help" | "?", _) => ChatCommand::Help,
        ("quit" | "exit", _) => ChatCommand::Quit,
        (other, _) => return Err(format!("unknown command '/{other}', try /help")),
    };
    Ok(Some(parsed))
}

fn unquote(path: &str) -> &str {
    for quote in ['"', '\''] {
        if let Some(inner) = path
            .strip_prefix(quote)
            .and_then(|rest| rest.strip_suffix(quote))
        {
            return inner;
        }
    }
    path
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_text_is_a_message() {
        assert_eq!(
            parse_line("  any duplicates?  "),
            Ok(Some(ChatCommand::Send("any duplicates?".into())))
        );
        assert_eq!(parse_line("   "), Ok(None));
        assert_eq!(
            parse_line("//etc/hosts is not a file"),
            Ok(Some(ChatCommand::Send("/etc/hosts is not a file".into())))
        );
    }

    #[test]
    fn parses_staging_commands() {
        assert_eq!(
            parse_line("/attach \"my invoices.csv\""),
            Ok(Some(ChatCommand::Attach(PathBuf::from("my invoices.csv"))))
        );
        assert_eq!(
            parse_line("/remove PDF"),
            Ok(Some(ChatCommand::Remove(DocumentKind::Pdf)))
        );
        assert!(parse_line("/remove docx").is_err());
        assert!(parse_line("/attach").is_err());
    }

    #[test]
    fn parses_control_commands() {
        assert_eq!(parse_line("/clear"), Ok(Some(ChatCommand::Clear)));
        assert_eq!(parse_line("/STATUS"), Ok(Some(ChatCommand::Status)));
        assert_eq!(parse_line("/exit"), Ok(Some(ChatCommand::Quit)));
        assert!(parse_line("/frobnicate").is_err());
    }
}
