//! Parley Core - Shared domain types for the chat relay
//!
//! This crate provides the types shared between the wire protocol
//! (parley-protocol) and the relay daemon (parleyd): connection
//! identities, display names, formatted chat lines and the history log.
//!
//! All code follows the panic-free policy: no `.unwrap()`, `.expect()`,
//! `panic!()`, `unreachable!()`, `todo!()`, or direct indexing `[i]`.

pub mod history;
pub mod id;
pub mod line;
pub mod name;

// Re-exports for convenience
pub use history::History;
pub use id::ClientId;
pub use line::{ChatLine, Presence, TIMESTAMP_FORMAT};
pub use name::DisplayName;
