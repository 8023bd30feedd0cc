//! Help command handler.

use log::debug;

use crate::commands::{CommandResult, notice_response::format_usage};

/// Returns the usage message.
///
/// Stateless; the same text also answers malformed `!relay` invocations.
pub fn handle_help() -> CommandResult {
    debug!("handling help command");

    CommandResult::Reply(format_usage())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handle_help() {
        let result = handle_help();

        assert!(matches!(
            result,
            CommandResult::Reply(response) if response.contains("Available commands")
        ));
    }
}
