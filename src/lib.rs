#![cfg_attr(not(test), deny(clippy::panic))]
#![allow(
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::module_name_repetitions,
    clippy::too_many_lines,
    clippy::similar_names
)]

//! # VoiceLink Server
//!
//! An in-memory matchmaking and WebRTC signaling server for anonymous,
//! time-boxed one-to-one voice conversations.
//!
//! Participants connect over WebSocket, declare optional interests and are
//! paired with the best-scoring waiting partner. The server relays offer,
//! answer and ICE candidate payloads between the pair and never touches media.

/// Server configuration and environment variables
pub mod config;

/// Matchmaking, room lifecycle, moderation and relay logic
pub mod coordination;

/// Structured logging configuration
pub mod logging;

/// Metrics collection and reporting
pub mod metrics;

/// WebSocket message protocol definitions
pub mod protocol;

/// Main server orchestration
pub mod server;

/// WebSocket connection handling
pub mod websocket;
