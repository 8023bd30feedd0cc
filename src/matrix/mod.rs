//! Matrix protocol integration for the bot.
//!
//! Wraps the Matrix SDK behind the small surface the relay feature needs:
//!
//! - **Sending**: plain `m.notice` messages into target rooms (the
//!   [`Messenger`] trait, implemented by [`MatrixClient`]) and threaded
//!   notice replies to commands
//! - **Room membership**: the list of joined rooms that seeds the relay
//!   room registry, refreshed on startup and on auto-join
//! - **Session**: login or restore with end-to-end encryption, persisted
//!   under the bot's data directory
//! - **Sync**: the event loop feeding commands to the bot

mod client;
mod encryption;
mod session;
mod sync;

pub use crate::matrix::client::{MatrixClient, Messenger};
#[cfg(test)]
pub use crate::matrix::client::MockMessenger;

/// User credentials for a Matrix account
#[derive(Debug, Clone)]
pub struct UserCredentials {
    /// User ID of the matrix account
    pub user_id: String,
    /// Password of the matrix account
    pub password: String,
    /// Passphrase to recover the matrix account secrets
    pub passphrase: String,
}
