use client_core::{ChatSnapshot, Message, Session, StagedFileSummary};
use shared::domain::Role;

pub fn role_label(role: Role) -> &'static str {
    match role {
        Role::User => "you",
        Role::Assistant => "auditor",
        Role::System => "system",
    }
}

pub fn format_message(message: &Message) -> String {
    let label = role_label(message.role);
    let mut lines = message.text.lines();
    let first = lines.next().unwrap_or_default();
    let mut out = format!("[{label}] {first}");
    let indent = " ".repeat(label.len() + 3);
    for line in lines {
        out.push('\n');
        if !line.is_empty() {
            out.push_str(&indent);
            out.push_str(line);
        }
    }
    out
}

pub fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KiB", "MiB", "GiB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{bytes} B")
    } else {
        format!("{value:.1} {}", UNITS[unit])
    }
}

pub fn format_staged(staged: &[StagedFileSummary]) -> String {
    if staged.is_empty() {
        return "none".to_string();
    }
    staged
        .iter()
        .map(|file| format!("{} ({}, {})", file.name, file.kind, format_size(file.size_bytes)))
        .collect::<Vec<_>>()
        .join(", ")
}

pub fn format_session(session: &Session) -> String {
    match session {
        Session::Active(id) => format!("active ({id})"),
        Session::Unset => "none".to_string(),
    }
}

pub fn format_status(snapshot: &ChatSnapshot) -> String {
    format!(
        "session: {}\nstaged: {}\nbusy: {}\nmessages: {}",
        format_session(&snapshot.session),
        format_staged(&snapshot.staged),
        if snapshot.busy { "yes" } else { "no" },
        snapshot.messages.len()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use client_core::MessageLog;

    fn message(text: &str, role: Role) -> Message {
        let mut log = MessageLog::new();
        log.append(text, role).clone()
    }

    #[test]
    fn multi_line_messages_are_indented_under_the_label() {
        let rendered = format_message(&message("## Summary\n\n- 3 invoices", Role::Assistant));
        assert_eq!(rendered, "[auditor] ## Summary\n\n          - 3 invoices");
    }

    #[test]
    fn sizes_use_binary_units() {
        assert_eq!(format_size(512), "512 B");
        assert_eq!(format_size(10 * 1024), "10.0 KiB");
        assert_eq!(format_size(500 * 1024 * 1024), "500.0 MiB");
    }
}
