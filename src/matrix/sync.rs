//! Matrix synchronization and event handling.
//!
//! [`MatrixSync::sync`] drives the bot's whole runtime:
//!
//! 1. An initial `sync_once` drains events received while the bot was
//!    offline, so pending invitations get honored but stale commands are
//!    not replayed
//! 2. The joined-room snapshot is pushed to the caller (the first
//!    registration event for the room registry)
//! 3. The message handler is installed and the continuous sync loop runs,
//!    persisting the sync token after every pass
//!
//! Room invitations are accepted automatically at any point; each
//! successful join pushes a fresh room snapshot.

use std::sync::Arc;

use anyhow::Result;
use log::{error, info, warn};
use matrix_sdk::{
    Client, LoopCtrl, Room, RoomState,
    config::SyncSettings,
    ruma::{
        api::client::filter::FilterDefinition,
        events::room::{
            member::StrippedRoomMemberEvent,
            message::{MessageType, OriginalSyncRoomMessageEvent},
        },
    },
};
use tokio::time::{Duration, sleep};

use crate::matrix::session::SessionStore;

/// Manages Matrix client synchronization and event processing.
pub struct MatrixSync {
    /// The matrix client
    client: Client,
    /// The session store for sync-token persistence
    session_store: SessionStore,
}

impl MatrixSync {
    /// Creates a new MatrixSync. Call [`MatrixSync::sync`] to start syncing.
    pub fn new(client: &Client, session_store: &SessionStore) -> Self {
        MatrixSync {
            client: client.to_owned(),
            session_store: session_store.to_owned(),
        }
    }

    /// Starts the synchronization process and runs until the process ends.
    ///
    /// # Arguments
    ///
    /// * `on_message` - invoked with `(body, room_id, sender_id, event_id)`
    ///   for each text message in a joined room
    /// * `on_rooms_changed` - invoked with the current joined-room IDs after
    ///   the initial sync and after each auto-join
    ///
    /// # Errors
    ///
    /// Returns an error only if the continuous sync loop fails fatally.
    /// Sync-token persistence failures are logged and skipped.
    pub async fn sync<F, R>(&self, on_message: F, on_rooms_changed: R) -> Result<()>
    where
        F: Fn(String, String, String, String) + Send + Sync + 'static + Clone,
        R: Fn(Vec<String>) + Send + Sync + 'static + Clone,
    {
        info!("start syncing");

        // Auto join rooms when invited
        self.client.add_event_handler({
            let client = self.client.clone();
            let on_rooms_changed = on_rooms_changed.clone();
            move |event: StrippedRoomMemberEvent, room: Room| {
                let client = client.clone();
                let on_rooms_changed = on_rooms_changed.clone();
                async move { auto_join_room(event, client, room, on_rooms_changed) }
            }
        });

        // Enable room members lazy-loading
        // See <https://spec.matrix.org/v1.6/client-server-api/#lazy-loading-room-members>.
        let filter = FilterDefinition::with_lazy_loading();
        let mut sync_settings = SyncSettings::default().filter(filter.into());

        // Resume from the last persisted sync position if there is one
        if let Some(sync_token) = self.session_store.sync_token() {
            sync_settings = sync_settings.token(sync_token);
        }

        // First sync to process invitations received while the bot was offline
        loop {
            match self.client.sync_once(sync_settings.clone()).await {
                Ok(response) => {
                    sync_settings = sync_settings.token(response.next_batch.clone());
                    if let Err(err) = self
                        .session_store
                        .persist_sync_token(response.next_batch)
                        .await
                    {
                        error!("failed to persist sync token: {:?}", err);
                    }
                    break;
                }
                Err(err) => {
                    error!("an error occurred during initial sync: {err}");
                    error!("trying again…");
                }
            }
        }

        // Membership is now known; seed the room registry
        on_rooms_changed(joined_room_ids(&self.client));

        // Listen to incoming room messages. Because we are listening after the
        // initial sync, we only get new messages.
        let on_message = Arc::new(on_message);
        self.client.add_event_handler({
            let on_message = Arc::clone(&on_message);
            move |event: OriginalSyncRoomMessageEvent, room: Room| {
                let on_message = Arc::clone(&on_message);
                async move { on_room_message(event, room, &on_message) }
            }
        });

        self.client
            .sync_with_result_callback(sync_settings, |sync_result| async move {
                let response = sync_result?;

                // Persist the token each time to be able to resume the session
                if let Err(err) = self
                    .session_store
                    .persist_sync_token(response.next_batch)
                    .await
                {
                    error!("failed to persist sync token: {:?}", err);
                }

                Ok(LoopCtrl::Continue)
            })
            .await?;

        Ok(())
    }
}

/// IDs of the rooms the client has joined, as plain strings.
fn joined_room_ids(client: &Client) -> Vec<String> {
    client
        .joined_rooms()
        .iter()
        .map(|room| room.room_id().to_string())
        .collect()
}

/// Joins a room when the bot receives an invitation.
///
/// The join is retried with backoff because Synapse can deliver the invite
/// before the invited user is allowed to join, see
/// <https://github.com/matrix-org/synapse/issues/4345>. After a successful
/// join the fresh room snapshot is pushed through `on_rooms_changed`.
fn auto_join_room<R>(
    event: StrippedRoomMemberEvent,
    client: Client,
    room: Room,
    on_rooms_changed: R,
) where
    R: Fn(Vec<String>) + Send + Sync + 'static,
{
    let Some(user_id) = client.user_id() else {
        warn!("could not get user id from client");
        return;
    };

    // Ignore if the invite is not for us
    if event.state_key != user_id {
        return;
    }

    tokio::spawn(async move {
        info!("auto joining room {}", room.room_id());
        let mut delay = 2;

        while let Err(err) = room.join().await {
            error!(
                "failed to join room {} ({err:?}), retrying in {delay}s",
                room.room_id()
            );

            sleep(Duration::from_secs(delay)).await;
            delay *= 2;

            if delay > 3600 {
                error!("can't join room {} ({err:?})", room.room_id());
                return;
            }
        }

        info!("joined room {}", room.room_id());

        // Joining changed the set of rooms notes can be relayed to
        on_rooms_changed(joined_room_ids(&client));
    });
}

/// Forwards text messages from joined rooms to the message callback.
///
/// Non-text messages (images, notices, files) are ignored, which also keeps
/// the bot's own relayed notes from feeding back into command handling.
fn on_room_message<F>(event: OriginalSyncRoomMessageEvent, room: Room, on_message: &Arc<F>)
where
    F: Fn(String, String, String, String) + Send + Sync + 'static,
{
    // Ignore messages from non-joined rooms
    if room.state() != RoomState::Joined {
        return;
    }

    // Only handle text messages
    let MessageType::Text(text_content) = event.content.msgtype else {
        return;
    };

    on_message(
        text_content.body,
        room.room_id().to_string(),
        event.sender.to_string(),
        event.event_id.to_string(),
    );
}
