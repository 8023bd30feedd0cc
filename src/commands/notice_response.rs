//! Notice text for bot replies.
//!
//! Every reply the bot sends is one of the fixed templates below, rendered
//! as a plain `m.notice`. Keeping them in one place makes the wording easy
//! to review and keeps the handlers free of string literals.

/// Formats the usage message listing the two relay commands.
///
/// Doubles as the reply to `!relay help` and to any `!relay` invocation
/// missing its index or message.
pub fn format_usage() -> String {
    "Available commands:\n!relay rooms\n!relay <room index> <message>".to_owned()
}

/// Formats the enumerated room listing.
///
/// One header line, then one `<index>. <room id>` line per room, 0-based.
/// An empty registry yields the header alone. Also serves as the reply to a
/// relay attempt with an unusable index, as a hint at the valid range.
///
/// # Examples
///
/// ```
/// # use pigeon::commands::notice_response::format_room_listing;
/// let listing = format_room_listing(&["!a:x".to_string(), "!b:x".to_string()]);
/// assert_eq!(listing, "Rooms I can deliver notes to:\n0. !a:x\n1. !b:x");
/// ```
pub fn format_room_listing(rooms: &[String]) -> String {
    let lines = rooms
        .iter()
        .enumerate()
        .map(|(index, room_id)| format!("{}. {}", index, room_id))
        .collect::<Vec<String>>()
        .join("\n");

    format!("Rooms I can deliver notes to:\n{}", lines)
}

/// Formats the reply for a sender rejected by the cooldown.
pub fn format_cooldown_rejected() -> String {
    "Too many notes, give it a minute.".to_owned()
}

/// Formats the reply for a note that could not be delivered.
///
/// Carries the target room ID and the underlying error's description
/// verbatim, so the sender can tell a dead room from a transport problem.
pub fn format_delivery_failed(room_id: &str, error: &str) -> String {
    format!("Could not deliver the note to {}: {}", room_id, error)
}

/// Formats the reply for a successfully relayed note.
pub fn format_accepted() -> String {
    "Accepted.".to_owned()
}

/// Formats the note as it appears in the target room.
///
/// The fixed lead-in makes clear the bot is relaying on someone's behalf;
/// the sender stays anonymous.
pub fn format_note(message: &str) -> String {
    format!("Someone asked me to pass along a note:\n{}", message)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_room_listing() {
        let rooms = vec!["!a:x".to_string(), "!b:x".to_string()];
        assert_eq!(
            format_room_listing(&rooms),
            "Rooms I can deliver notes to:\n0. !a:x\n1. !b:x"
        );
    }

    #[test]
    fn test_format_room_listing_empty() {
        assert_eq!(format_room_listing(&[]), "Rooms I can deliver notes to:\n");
    }

    #[test]
    fn test_format_room_listing_is_idempotent() {
        let rooms = vec!["!a:x".to_string(), "!b:x".to_string()];
        assert_eq!(format_room_listing(&rooms), format_room_listing(&rooms));
    }

    #[test]
    fn test_format_usage_names_both_commands() {
        let usage = format_usage();
        assert!(usage.contains("!relay rooms"));
        assert!(usage.contains("!relay <room index> <message>"));
    }

    #[test]
    fn test_format_delivery_failed_embeds_room_and_error() {
        let reply = format_delivery_failed("!b:x", "connection reset");
        assert_eq!(
            reply,
            "Could not deliver the note to !b:x: connection reset"
        );
    }

    #[test]
    fn test_format_note_keeps_message_verbatim() {
        assert_eq!(
            format_note("hello world"),
            "Someone asked me to pass along a note:\nhello world"
        );
    }
}
