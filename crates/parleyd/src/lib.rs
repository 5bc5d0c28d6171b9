//! Parley Daemon - Chat room and relay server
//!
//! This crate provides the core infrastructure for the parley relay:
//! - `room` - Room actor owning the member roster and chat history
//! - `server` - TCP server and per-connection handlers
//! - `config` - Settings loaded from defaults, file, environment and flags
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                       parleyd                               │
//! ├─────────────────────────────────────────────────────────────┤
//! │                                                             │
//! │  ┌─────────────────┐     ┌─────────────────────────────┐   │
//! │  │   ChatServer    │────▶│         RoomActor           │   │
//! │  │ (TcpListener)   │     │ (roster + history owner)    │   │
//! │  └────────┬────────┘     └──────────────┬──────────────┘   │
//! │           │                             │                   │
//! │           │ connections                 │ lines / events    │
//! │           ▼                             ▼                   │
//! │  ┌─────────────────┐     ┌─────────────────────────────┐   │
//! │  │ConnectionHandler│     │  member sockets, event log  │   │
//! │  │  (per client)   │     │                             │   │
//! │  └─────────────────┘     └─────────────────────────────┘   │
//! │                                                             │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Panic-Free Guarantees
//!
//! All production code in this crate follows the panic-free policy:
//! - No `.unwrap()`, `.expect()`, `panic!()`, `unreachable!()`, `todo!()`
//! - All fallible operations return `Result` or `Option`
//! - Channel operations handle closure gracefully

pub mod config;
pub mod room;
pub mod server;
