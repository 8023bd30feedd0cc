//! Command action handlers.
//!
//! One handler per bot command. Handlers decide the outcome of a command and
//! return a [`CommandResult`](crate::commands::CommandResult); they never
//! send anything themselves. Delivery of a relayed note is performed by the
//! [`Commander`](crate::commands::Commander) so the handlers stay easy to
//! test.

mod help;
mod rooms;
mod send;

pub use crate::commands::actions::{help::handle_help, rooms::handle_rooms, send::handle_send};
