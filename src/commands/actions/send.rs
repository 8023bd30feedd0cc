//! Send command handler.
//!
//! Runs a relay attempt through the throttle and the room-index lookup, and
//! decides which of the outcomes the sender gets:
//!
//! - **cooldown-rejected** if the sender is still inside their window
//! - **room listing** if the index does not name a room, as an implicit
//!   usage hint
//! - a [`CommandResult::Relay`] carrying the prefixed note for the caller
//!   to deliver
//!
//! The ordering is deliberate and load-bearing: the cooldown check runs
//! before the index is parsed, and the attempt consumes the sender's
//! cooldown slot even when the index turns out to be unusable or the
//! delivery later fails.

use std::time::Instant;

use log::debug;

use crate::{
    commands::{
        CommandContext, CommandResult,
        notice_response::{format_cooldown_rejected, format_note, format_room_listing},
    },
    relay::{RelayDecision, RelayService},
};

/// Decides the outcome of a `!relay <index> <message>` attempt.
///
/// Mutates the relay service: an attempt that passes the cooldown check
/// records the sender's timestamp. The caller must hold the service lock
/// across this call.
pub fn handle_send(
    relay: &mut RelayService,
    context: &CommandContext,
    index: &str,
    message: &str,
) -> CommandResult {
    debug!("handling send command from {}", context.user_id);

    match relay.begin_relay(&context.user_id, index, Instant::now()) {
        RelayDecision::Throttled => CommandResult::Reply(format_cooldown_rejected()),
        RelayDecision::UnknownRoom => CommandResult::Reply(format_room_listing(relay.rooms())),
        RelayDecision::Deliver(room_id) => CommandResult::Relay {
            room_id,
            body: format_note(message),
        },
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    fn create_relay() -> RelayService {
        let mut relay = RelayService::new(Duration::from_secs(60));
        relay.set_rooms(vec!["!a:x".to_string(), "!b:x".to_string()]);
        relay
    }

    fn create_context(user_id: &str) -> CommandContext {
        CommandContext {
            room_id: "!origin:x".to_string(),
            user_id: user_id.to_string(),
        }
    }

    #[test]
    fn test_handle_send_resolves_room_and_prefixes_note() {
        let mut relay = create_relay();
        let context = create_context("@alice:x");

        let result = handle_send(&mut relay, &context, "1", "hello world");

        assert!(matches!(
            result,
            CommandResult::Relay { room_id, body }
            if room_id == "!b:x" && body == "Someone asked me to pass along a note:\nhello world"
        ));
    }

    #[test]
    fn test_handle_send_unknown_index_returns_listing() {
        let mut relay = create_relay();
        let context = create_context("@alice:x");

        let result = handle_send(&mut relay, &context, "5", "oops");

        assert!(matches!(
            result,
            CommandResult::Reply(response)
            if response == "Rooms I can deliver notes to:\n0. !a:x\n1. !b:x"
        ));
    }

    #[test]
    fn test_handle_send_second_attempt_is_throttled() {
        let mut relay = create_relay();
        let context = create_context("@alice:x");

        handle_send(&mut relay, &context, "1", "hello world");
        let result = handle_send(&mut relay, &context, "0", "again");

        assert!(matches!(
            result,
            CommandResult::Reply(response)
            if response == "Too many notes, give it a minute."
        ));
    }
}
