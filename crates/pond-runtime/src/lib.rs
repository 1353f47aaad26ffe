#![deny(warnings)]

//! Simulation runtime for the fish pond.
//!
//! [`PondSession`] owns a player's pond and drives it on a virtual clock:
//! growth and hunger, wandering and pellet chasing, net casting, and the
//! deferred effects those actions schedule. State is saved through a
//! [`persistence::KvStore`] after every mutation.

pub mod capture;
pub mod growth;
pub mod movement;
pub mod pellets;
pub mod scheduler;
mod session;

pub use session::{FeedAll, FeedReceipt, PondSession};
