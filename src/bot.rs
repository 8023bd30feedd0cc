//! Bot wiring between Matrix synchronization and the relay feature.
//!
//! The [`Bot`] owns the three long-lived pieces of the process and connects
//! them to the Matrix event stream:
//!
//! - the [`MatrixClient`] for receiving commands and sending notices
//! - the [`RelayService`] holding the room registry and cooldown table
//! - the [`Commander`] parsing and executing commands
//!
//! # Message processing flow
//!
//! ```text
//! Matrix message → parse → lock relay service → execute (throttle, index
//! lookup, delivery) → unlock → reply
//! ```
//!
//! Each incoming message is handled in its own task, so the relay service
//! sits behind a mutex: the cooldown read-modify-write and the registry
//! index lookup for one command must complete before the next command from
//! the same user can be checked, otherwise two near-simultaneous notes
//! could both pass the throttle.
//!
//! # Registration events
//!
//! The room registry is seeded after the initial sync and rebuilt wholesale
//! after every auto-join, each time from a fresh snapshot of the client's
//! joined rooms.

use std::{path::PathBuf, sync::Arc, time::Duration};

use tokio::sync::Mutex;

use crate::{
    Args,
    commands::{CommandContext, CommandParseError, Commander},
    config::Config,
    matrix::{MatrixClient, UserCredentials},
    relay::RelayService,
};

/// Context for processing a single Matrix message.
struct MessageContext {
    /// The message body text
    body: String,
    /// The Matrix room ID where the message was sent
    room_id: String,
    /// The Matrix user ID who sent the message
    sender_id: String,
    /// The Matrix event ID of the message
    event_id: String,
    /// Shared reference to the Matrix client
    matrix_client: Arc<MatrixClient>,
    /// Shared reference to the relay service
    relay: Arc<Mutex<RelayService>>,
    /// Shared reference to the command handler
    commander: Arc<Commander>,
}

/// Main bot structure tying the Matrix client to the relay service.
pub struct Bot {
    /// Matrix client for receiving commands and sending notes and replies.
    matrix_client: Arc<MatrixClient>,

    /// Relay state: room registry and cooldown table.
    ///
    /// Behind a `Mutex` because message handling runs in concurrent tasks
    /// and every relay attempt is a read-modify-write against this state.
    relay: Arc<Mutex<RelayService>>,

    /// Command parser and executor. Stateless, safely shared.
    commander: Arc<Commander>,
}

impl Bot {
    /// Creates a new Bot from configuration and command line arguments.
    ///
    /// Logs in to Matrix (or restores the persisted session) and constructs
    /// an empty relay service; the room registry is populated once the sync
    /// starts.
    ///
    /// # Errors
    ///
    /// Returns an error if the Matrix client cannot be set up (bad
    /// credentials, unreachable homeserver, corrupted session store).
    pub async fn new(config: Config, args: Args) -> Result<Self, anyhow::Error> {
        let matrix_client = Arc::new(
            MatrixClient::new(
                &UserCredentials {
                    user_id: config.matrix.user_id,
                    password: config.matrix.password,
                    passphrase: config.matrix.passphrase,
                },
                &session_path(&args.data),
            )
            .await?,
        );

        let relay = Arc::new(Mutex::new(RelayService::new(Duration::from_secs(
            config.relay.cooldown_secs,
        ))));

        let commander = Arc::new(Commander::new());

        Ok(Bot {
            matrix_client,
            relay,
            commander,
        })
    }

    /// Starts the bot and processes messages until the process terminates.
    ///
    /// # Panics
    ///
    /// Panics if the Matrix sync loop fails to start or encounters an
    /// unrecoverable error.
    pub async fn start(self) {
        let matrix_client = Arc::clone(&self.matrix_client);
        let relay = Arc::clone(&self.relay);
        let commander = Arc::clone(&self.commander);

        // Message handler: package the message with shared state and hand
        // it off to its own task
        let on_message =
            move |body: String, room_id: String, sender_id: String, event_id: String| {
                let ctx = MessageContext {
                    body,
                    room_id,
                    sender_id,
                    event_id,
                    matrix_client: Arc::clone(&matrix_client),
                    relay: Arc::clone(&relay),
                    commander: Arc::clone(&commander),
                };
                Self::handle_matrix_message(ctx)
            };

        // Registration events replace the room registry wholesale
        let relay_for_registry = Arc::clone(&self.relay);
        let on_rooms_changed = move |rooms: Vec<String>| {
            let relay = Arc::clone(&relay_for_registry);
            tokio::spawn(async move {
                relay.lock().await.set_rooms(rooms);
            });
        };

        self.matrix_client
            .sync(on_message, on_rooms_changed)
            .await
            .unwrap();
    }

    /// Handles an incoming Matrix message in its own task.
    ///
    /// Messages that are not `!relay` commands are dropped silently.
    /// Malformed commands get the usage text without touching the relay
    /// state; everything else runs through [`Commander::execute`] under the
    /// relay service lock, and the resulting reply is sent back as a
    /// threaded notice.
    fn handle_matrix_message(ctx: MessageContext) {
        tokio::spawn(async move {
            let command = match ctx.commander.parse(&ctx.body) {
                Ok(command) => command,
                Err(e) => match e {
                    // Return silently if the message is not for the bot
                    CommandParseError::NotForBot => return,
                    // Send the usage text if the command is incomplete
                    CommandParseError::InvalidCommand(message) => {
                        ctx.matrix_client
                            .send_reply(&ctx.room_id, &ctx.sender_id, &ctx.event_id, &message)
                            .await;
                        return;
                    }
                },
            };

            let context = CommandContext {
                room_id: ctx.room_id.clone(),
                user_id: ctx.sender_id.clone(),
            };

            // The lock is held across the whole execution, delivery
            // included: the cooldown slot must be recorded before any other
            // command from the same user gets its turn
            let mut relay = ctx.relay.lock().await;
            let response = ctx
                .commander
                .execute(&command, &context, &mut relay, &*ctx.matrix_client)
                .await;
            drop(relay);

            ctx.matrix_client
                .send_reply(&ctx.room_id, &ctx.sender_id, &ctx.event_id, &response)
                .await;
        });
    }
}

/// Session directory under the bot's data path.
fn session_path(data_path: &str) -> String {
    let path: PathBuf = [data_path, "session"].iter().collect();
    path.to_string_lossy().into_owned()
}
