//! Matrix client wrapper for bot messaging and synchronization.

use anyhow::Context;
use log::{error, info};
use matrix_sdk::{
    Client,
    ruma::{
        EventId, RoomId, UserId,
        events::room::message::{
            AddMentions, ForwardThread, ReplyMetadata, RoomMessageEventContent,
        },
    },
};
use mockall::automock;

use crate::matrix::{
    UserCredentials, encryption::setup_client, session::SessionStore, sync::MatrixSync,
};

/// Outbound messaging interface.
///
/// The one call the command pipeline makes against the transport, abstracted
/// behind a trait so command execution can be tested with a mock. The error
/// carries the transport's description of the failure; it is surfaced to the
/// sender verbatim.
#[automock]
pub trait Messenger {
    /// Sends `body` as a plain `m.notice` to the given room.
    async fn send_notice(&self, room_id: &str, body: &str) -> Result<(), anyhow::Error>;
}

/// High-level Matrix client for the bot.
///
/// Owns the authenticated SDK client and the synchronization service, and
/// provides the messaging operations the bot needs: notices into target
/// rooms, threaded replies to commands, and the joined-room snapshot.
pub struct MatrixClient {
    /// Synchronization service for handling real-time events
    matrix_sync: MatrixSync,
    /// Underlying Matrix SDK client
    client: Client,
}

impl MatrixClient {
    /// Creates and initializes a new Matrix client.
    ///
    /// Opens (or creates) the session store under `session_path`, performs
    /// the login-or-restore flow with full encryption setup, and sets the
    /// bot's display name.
    ///
    /// # Errors
    ///
    /// Returns an error if the session store cannot be opened or the client
    /// setup fails (login, encryption bootstrap, session restore).
    pub async fn new(
        user_credentials: &UserCredentials,
        session_path: &str,
    ) -> Result<Self, anyhow::Error> {
        let session_store = SessionStore::new(session_path)
            .await
            .context("failed to open session store")?;

        let client = setup_client(user_credentials, &session_store)
            .await
            .context("failed to set up matrix client")?;

        client.account().set_display_name(Some("Pigeon")).await?;

        let matrix_sync = MatrixSync::new(&client, &session_store);

        Ok(MatrixClient {
            matrix_sync,
            client,
        })
    }

    /// Starts the Matrix synchronization loop.
    ///
    /// Runs indefinitely under normal operation. `on_message` is invoked
    /// with `(body, room_id, sender_id, event_id)` for each text message in
    /// a joined room; `on_rooms_changed` is invoked with the fresh list of
    /// joined room IDs after the initial sync and after each auto-join.
    pub async fn sync<F, R>(&self, on_message: F, on_rooms_changed: R) -> Result<(), anyhow::Error>
    where
        F: Fn(String, String, String, String) + Send + Sync + 'static + Clone,
        R: Fn(Vec<String>) + Send + Sync + 'static + Clone,
    {
        match self.matrix_sync.sync(on_message, on_rooms_changed).await {
            Ok(_) => info!("matrix sync ended successfully"),
            Err(e) => error!("matrix sync ended with error: {:?}", e),
        }

        Ok(())
    }

    /// Sends a threaded notice reply to a specific message.
    ///
    /// Used for every reply to a command. Failures are logged and dropped:
    /// if the reply itself cannot be sent there is no channel left to report
    /// on.
    pub async fn send_reply(&self, room_id: &str, sender_id: &str, event_id: &str, body: &str) {
        // Both come from the sync stream, already validated
        let sender = UserId::parse(sender_id).unwrap();
        let event = EventId::parse(event_id).unwrap();

        let content = RoomMessageEventContent::notice_plain(body).make_reply_to(
            ReplyMetadata::new(&event, &sender, None),
            ForwardThread::No,
            AddMentions::No,
        );

        let room_id = RoomId::parse(room_id).unwrap();
        if let Some(room) = self.client.get_room(&room_id)
            && let Err(e) = room.send(content).await
        {
            error!("failed to send reply: {:?}", e);
        }
    }
}

impl Messenger for MatrixClient {
    /// Delivers a note into the target room.
    ///
    /// Unlike [`MatrixClient::send_reply`], errors propagate: the relay
    /// handler turns them into the delivery-failed reply.
    async fn send_notice(&self, room_id: &str, body: &str) -> Result<(), anyhow::Error> {
        let room_id = RoomId::parse(room_id)?;

        let room = self
            .client
            .get_room(&room_id)
            .ok_or_else(|| anyhow::anyhow!("not a member of {}", room_id))?;

        room.send(RoomMessageEventContent::notice_plain(body))
            .await?;

        Ok(())
    }
}
