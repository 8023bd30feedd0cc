//! Anonymous note relay.
//!
//! This module owns the two pieces of state behind the relay feature:
//!
//! - the **room registry**: the ordered list of rooms the bot currently
//!   occupies, addressed by numeric index in `!relay` commands
//! - the **cooldown table**: the timestamp of each user's last accepted
//!   note, used to throttle senders
//!
//! Both live in a [`RelayService`] instance owned by the bot and shared with
//! the command pipeline behind a mutex; see [`crate::bot`] for the locking
//! discipline.

mod service;

pub use crate::relay::service::{RelayDecision, RelayService};
