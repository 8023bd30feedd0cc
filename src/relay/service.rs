//! Relay state and the per-user throttle.

use std::{
    collections::HashMap,
    time::{Duration, Instant},
};

use log::{debug, info};

/// Outcome of a relay attempt, decided before any delivery is tried.
///
/// The caller is responsible for turning each variant into a user-facing
/// reply and, for [`RelayDecision::Deliver`], for performing the actual send.
#[derive(Debug, PartialEq, Eq)]
pub enum RelayDecision {
    /// The user sent a note too recently and must wait.
    Throttled,
    /// The index did not name a room in the registry. The caller answers
    /// with the room listing so the user can pick a valid index.
    UnknownRoom,
    /// The note may be delivered to the contained room ID.
    Deliver(String),
}

/// Room registry and cooldown table for the relay command.
///
/// One instance is constructed per bot and shared behind a mutex. The room
/// registry is only ever replaced wholesale by [`RelayService::set_rooms`]
/// (a registration event); it is never merged or edited in place, so indices
/// shown by a listing stay valid until the next registration event.
pub struct RelayService {
    /// Rooms the bot occupies, sorted so indices survive restarts.
    rooms: Vec<String>,
    /// Timestamp of each user's last attempt that passed the cooldown check.
    last_note: HashMap<String, Instant>,
    /// Minimum time between two accepted attempts from the same user.
    cooldown: Duration,
}

impl RelayService {
    /// Creates an empty relay service with the given cooldown window.
    pub fn new(cooldown: Duration) -> Self {
        RelayService {
            rooms: Vec::new(),
            last_note: HashMap::new(),
            cooldown,
        }
    }

    /// Replaces the room registry with a fresh snapshot of joined rooms.
    ///
    /// Called on registration events: once after the initial sync, and again
    /// whenever the bot joins a room. The snapshot is sorted so the numeric
    /// indices users see are deterministic.
    pub fn set_rooms(&mut self, mut rooms: Vec<String>) {
        rooms.sort();
        info!("room registry rebuilt, {} rooms", rooms.len());
        self.rooms = rooms;
    }

    /// The current room registry, in listing order.
    pub fn rooms(&self) -> &[String] {
        &self.rooms
    }

    /// Runs the cooldown check and the index lookup for a relay attempt.
    ///
    /// The steps happen in a fixed order:
    ///
    /// 1. If `user_id` sent a note less than one cooldown window before
    ///    `now`, the attempt is [`RelayDecision::Throttled`]. Throttled
    ///    attempts do not refresh the user's timestamp.
    /// 2. Otherwise the attempt consumes the user's cooldown slot
    ///    immediately. This happens before the index is even parsed: a
    ///    malformed index or a later delivery failure still counts against
    ///    the throttle.
    /// 3. `index_arg` is parsed as a non-negative integer and bounds-checked
    ///    against the registry as it is *now*; the registry may have been
    ///    replaced since the user last listed it.
    pub fn begin_relay(&mut self, user_id: &str, index_arg: &str, now: Instant) -> RelayDecision {
        if let Some(last) = self.last_note.get(user_id)
            && now < *last + self.cooldown
        {
            debug!("note from {} rejected by cooldown", user_id);
            return RelayDecision::Throttled;
        }

        self.last_note.insert(user_id.to_owned(), now);

        // Sweep entries whose window has passed, so the table only ever
        // holds users throttled right now.
        let cooldown = self.cooldown;
        self.last_note.retain(|_, last| now < *last + cooldown);

        let Some(room_id) = index_arg
            .parse::<usize>()
            .ok()
            .and_then(|index| self.rooms.get(index))
        else {
            debug!("no room at index '{}'", index_arg);
            return RelayDecision::UnknownRoom;
        };

        RelayDecision::Deliver(room_id.clone())
    }
}
