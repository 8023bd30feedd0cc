//! Command parsing.
//!
//! Converts Matrix message text into structured [`Command`] values. Anything
//! that is not a `!relay` command is reported as such so the caller can stay
//! silent instead of replying to ordinary chat.

use command_parser::Parser;
use log::debug;

use crate::commands::notice_response::format_usage;

/// A parsed `!relay` command.
#[derive(Debug, PartialEq, Eq)]
pub enum Command {
    /// Show the usage message
    Help,
    /// List the rooms the bot can deliver notes to
    Rooms,
    /// Relay a note to the room at `index`
    ///
    /// `index` is kept as the raw token: the cooldown check must run before
    /// the index is parsed, so validation happens in the relay service, not
    /// here.
    Send {
        /// Raw room-index argument, not yet parsed
        index: String,
        /// Note body, message words joined with single spaces
        message: String,
    },
}

/// Errors that can occur during command parsing.
#[derive(Debug)]
pub enum CommandParsingError {
    /// The message could not be parsed as a command
    UnableToParse,
    /// The command is not for this bot (wrong command word)
    NotRelay,
    /// The command is missing its index or message
    Incomplete,
}

impl Command {
    /// Parses a message string into a [`Command`].
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The message is not a command at all - [`CommandParsingError::UnableToParse`]
    /// - The command is for a different bot - [`CommandParsingError::NotRelay`]
    /// - Fewer than two arguments were supplied - [`CommandParsingError::Incomplete`]
    pub fn parse(parser: &Parser, body: &str) -> Result<Self, CommandParsingError> {
        // For an unknown reason the parser ignores the last word, so we add a dummy word at the end
        let body = body.to_string() + " dummy";

        // This is normal to fail if the message is not a command
        let command = match parser.parse(&body) {
            Ok(cmd) => cmd,
            Err(_) => return Err(CommandParsingError::UnableToParse),
        };

        // Ignore commands that are not for the bot
        if command.name != "relay" {
            return Err(CommandParsingError::NotRelay);
        }

        // Note bodies stay out of the logs, only the shape is traced
        debug!(
            "parsing relay command with {} arguments",
            command.arguments.len()
        );

        if command.arguments.is_empty() {
            return Err(CommandParsingError::Incomplete);
        }

        match command.arguments[0].as_str() {
            "rooms" => Ok(Command::Rooms),
            "help" => Ok(Command::Help),
            _ => {
                // A relay needs an index and at least one message word
                if command.arguments.len() < 2 {
                    return Err(CommandParsingError::Incomplete);
                }

                Ok(Command::Send {
                    index: command.arguments[0].clone(),
                    message: command.arguments[1..].join(" "),
                })
            }
        }
    }
}

/// Formats a command error into a user-facing message.
///
/// Only [`CommandParsingError::Incomplete`] produces a message (the usage
/// text). `UnableToParse` and `NotRelay` return `None` so the bot does not
/// respond to messages that were never meant for it.
pub fn format_command_error(error: CommandParsingError) -> Option<String> {
    match error {
        CommandParsingError::Incomplete => Some(format_usage()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_parser() -> Parser {
        Parser::new('!', '-')
    }

    #[test]
    fn test_parse_rooms_command() {
        let parser = create_parser();
        let result = Command::parse(&parser, "!relay rooms");
        assert!(matches!(result, Ok(Command::Rooms)));
    }

    #[test]
    fn test_parse_rooms_command_ignores_extra_words() {
        let parser = create_parser();
        let result = Command::parse(&parser, "!relay rooms please");
        assert!(matches!(result, Ok(Command::Rooms)));
    }

    #[test]
    fn test_parse_help_command() {
        let parser = create_parser();
        let result = Command::parse(&parser, "!relay help");
        assert!(matches!(result, Ok(Command::Help)));
    }

    #[test]
    fn test_parse_send_command() {
        let parser = create_parser();
        let result = Command::parse(&parser, "!relay 1 hello world");
        assert!(matches!(
            result,
            Ok(Command::Send { index, message })
            if index == "1" && message == "hello world"
        ));
    }

    #[test]
    fn test_parse_send_command_single_word_message() {
        let parser = create_parser();
        let result = Command::parse(&parser, "!relay 0 hi");
        assert!(matches!(
            result,
            Ok(Command::Send { index, message })
            if index == "0" && message == "hi"
        ));
    }

    #[test]
    fn test_parse_send_command_keeps_raw_index() {
        let parser = create_parser();
        let result = Command::parse(&parser, "!relay banana split please");
        assert!(matches!(
            result,
            Ok(Command::Send { index, message })
            if index == "banana" && message == "split please"
        ));
    }

    #[test]
    fn test_parse_bare_command_is_incomplete() {
        let parser = create_parser();
        let result = Command::parse(&parser, "!relay");
        assert!(matches!(result, Err(CommandParsingError::Incomplete)));
    }

    #[test]
    fn test_parse_missing_message_is_incomplete() {
        let parser = create_parser();
        let result = Command::parse(&parser, "!relay 3");
        assert!(matches!(result, Err(CommandParsingError::Incomplete)));
    }

    #[test]
    fn test_parse_not_relay_command() {
        let parser = create_parser();
        let result = Command::parse(&parser, "!other_bot rooms");
        assert!(matches!(result, Err(CommandParsingError::NotRelay)));
    }

    #[test]
    fn test_parse_unable_to_parse() {
        let parser = create_parser();
        let result = Command::parse(&parser, "This is not a command");
        assert!(matches!(result, Err(CommandParsingError::UnableToParse)));
    }

    #[test]
    fn test_format_command_error_incomplete() {
        let result = format_command_error(CommandParsingError::Incomplete);
        assert!(result.is_some());
        assert!(result.unwrap().contains("Available commands"));
    }

    #[test]
    fn test_format_command_error_unable_to_parse() {
        let result = format_command_error(CommandParsingError::UnableToParse);
        assert!(result.is_none());
    }

    #[test]
    fn test_format_command_error_not_relay() {
        let result = format_command_error(CommandParsingError::NotRelay);
        assert!(result.is_none());
    }
}
