//! Extraction of lifecycle events from server console lines.
//!
//! Vanilla and most forks print lines shaped like
//! `[12:34:56] [Server thread/INFO]: <message>`; Paper prints
//! `[12:34:56 INFO]: <message>`. Only the message part is inspected.

use blockhost_core::ServerEvent;

const JOINED_SUFFIX: &str = " joined the game";
const LEFT_SUFFIX: &str = " left the game";

/// Parse a console line into a lifecycle event, if it carries one.
pub fn parse_log_line(line: &str) -> Option<ServerEvent> {
    let message = message_part(line);

    if message.starts_with("Done (") && message.contains("For help") {
        return Some(ServerEvent::Ready);
    }

    if let Some(name) = message.strip_suffix(JOINED_SUFFIX).and_then(player_name) {
        return Some(ServerEvent::player_joined(name));
    }

    if let Some(name) = message.strip_suffix(LEFT_SUFFIX).and_then(player_name) {
        return Some(ServerEvent::player_left(name));
    }

    None
}

fn message_part(line: &str) -> &str {
    let line = line.trim();
    line.find("]: ")
        .map_or(line, |idx| &line[idx + 3..])
        .trim()
}

/// Player names are a single token. Chat lines (`<Bob> ...`) are rejected so
/// a player typing "x joined the game" does not fake an event.
fn player_name(candidate: &str) -> Option<&str> {
    let valid = !candidate.is_empty()
        && !candidate.starts_with('<')
        && !candidate.chars().any(char::is_whitespace);
    valid.then_some(candidate)
}
