//! Command orchestration and execution.
//!
//! The [`Commander`] is the entry point for processing bot commands. It
//! parses raw message text into [`Command`] values, routes them to their
//! action handlers, and performs the delivery step for relayed notes.
//!
//! ```text
//! Matrix message → parse() → Command → execute() → reply text
//! ```

use command_parser::Parser;
use log::debug;

use crate::{
    commands::{
        CommandContext, CommandParseError, CommandResult,
        actions::{handle_help, handle_rooms, handle_send},
        command::{Command, format_command_error},
        notice_response::{format_accepted, format_delivery_failed},
    },
    matrix::Messenger,
    relay::RelayService,
};

/// Parses and executes bot commands.
///
/// All commands start with the `!relay` prefix. Messages without it are
/// silently ignored. The Commander itself is stateless; the relay state it
/// operates on is passed into [`Commander::execute`] by the caller, which
/// holds the lock for the duration of the call.
pub struct Commander {
    /// Command parser for processing user commands
    parser: Parser,
}

impl Commander {
    /// Creates a new Commander with a parser recognizing `!` commands.
    pub fn new() -> Self {
        let parser = Parser::new('!', '-');
        Commander { parser }
    }

    /// Parses a Matrix message body into a command.
    ///
    /// # Errors
    ///
    /// - [`CommandParseError::NotForBot`] - ordinary chat or another bot's
    ///   command; the caller should not respond
    /// - [`CommandParseError::InvalidCommand`] - a `!relay` invocation
    ///   missing its index or message; carries the usage text
    pub fn parse(&self, body: &str) -> Result<Command, CommandParseError> {
        match Command::parse(&self.parser, body) {
            Ok(command) => Ok(command),
            // Commands not meant for the bot fail silently, incomplete
            // relay commands get the usage text
            Err(error) => match format_command_error(error) {
                Some(message) => Err(CommandParseError::InvalidCommand(message)),
                None => Err(CommandParseError::NotForBot),
            },
        }
    }

    /// Executes a parsed command and returns the reply text.
    ///
    /// Relay outcomes are delivered through `messenger` before this returns:
    /// a successful send yields the accepted reply, a failed send yields the
    /// delivery-failed reply with the error's description embedded. The
    /// send is attempted once, never retried.
    ///
    /// The caller must hold the relay service lock across this call so the
    /// cooldown read-modify-write and the registry index lookup cannot
    /// interleave with another command.
    pub async fn execute<M: Messenger>(
        &self,
        command: &Command,
        context: &CommandContext,
        relay: &mut RelayService,
        messenger: &M,
    ) -> String {
        debug!(
            "executing command from {} in {}",
            context.user_id, context.room_id
        );

        let result = match command {
            Command::Help => handle_help(),
            Command::Rooms => handle_rooms(relay),
            Command::Send { index, message } => handle_send(relay, context, index, message),
        };

        match result {
            CommandResult::Reply(response) => response,
            CommandResult::Relay { room_id, body } => {
                match messenger.send_notice(&room_id, &body).await {
                    Ok(()) => format_accepted(),
                    Err(error) => format_delivery_failed(&room_id, &format!("{:#}", error)),
                }
            }
        }
    }
}
