//! # Game Client Library
//!
//! Client side of the multiplayer game: it keeps a local copy of the
//! server-authoritative world over one TCP connection and forwards local
//! input back to the server.
//!
//! ## Architecture Overview
//!
//! Two activities run concurrently and share nothing but the store and a
//! shutdown flag:
//!
//! - A **receiver thread** blocks on the socket, reads length-prefixed JSON
//!   frames, and applies each packet to the store in arrival order.
//! - The **foreground loop** samples the keyboard once per tick, sends at most
//!   one movement packet, and draws the store under its read lock.
//!
//! The server is authoritative. A full-state snapshot replaces the local
//! player list wholesale, and that is how any drift gets corrected.
//!
//! ## Module Organization
//!
//! ### Config Module (`config`)
//! Player name, server address and window settings.
//!
//! ### Game Module (`game`)
//! The lock-guarded store: players, enemies, fruits, and session metadata.
//!
//! ### Dispatch Module (`dispatch`)
//! Maps each packet type onto the store. Nothing in it can fail the receiver.
//!
//! ### Network Module (`network`)
//! Connection setup, the receiver loop, the send lock, orderly shutdown, and
//! the `Client` context that drives a session.
//!
//! ### Input Module (`input`)
//! Turns key states into movement and debug spawn packets.
//!
//! ### Rendering Module (`rendering`)
//! Draws the store with macroquad.
//!
//! ## Usage Example
//!
//! ```no_run
//! use client::config::ClientConfig;
//! use client::network::Client;
//!
//! # async fn run() -> Result<(), client::network::ClientError> {
//! let client = Client::connect(ClientConfig::default())?;
//! client.run().await;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod dispatch;
pub mod game;
pub mod input;
pub mod network;
pub mod rendering;
