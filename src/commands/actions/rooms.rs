//! Rooms command handler.
//!
//! Lists the rooms a note can be relayed to, with the numeric index users
//! pass to `!relay <index> <message>`. Read-only against the room registry.

use log::debug;

use crate::{
    commands::{CommandResult, notice_response::format_room_listing},
    relay::RelayService,
};

/// Returns the enumerated listing of the current room registry.
///
/// The listing is a snapshot: a registration event can replace the registry
/// between this reply and a later relay attempt, which is why relay attempts
/// re-check the index themselves.
pub fn handle_rooms(relay: &RelayService) -> CommandResult {
    debug!("handling rooms command");

    CommandResult::Reply(format_room_listing(relay.rooms()))
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn test_handle_rooms() {
        let mut relay = RelayService::new(Duration::from_secs(60));
        relay.set_rooms(vec!["!a:x".to_string(), "!b:x".to_string()]);

        let result = handle_rooms(&relay);

        assert!(matches!(
            result,
            CommandResult::Reply(response)
            if response == "Rooms I can deliver notes to:\n0. !a:x\n1. !b:x"
        ));
    }

    #[test]
    fn test_handle_rooms_empty_registry() {
        let relay = RelayService::new(Duration::from_secs(60));

        let result = handle_rooms(&relay);

        assert!(matches!(
            result,
            CommandResult::Reply(response)
            if response == "Rooms I can deliver notes to:\n"
        ));
    }
}
