//! Shared domain types for Samvad.
//!
//! This crate contains the core domain types used across the Samvad live
//! consultation platform: sessions, connections, chat messages, typing
//! signals, the wire frame vocabulary, and their associated error types.
//!
//! Zero infrastructure dependencies -- only serde, uuid, chrono, thiserror.

pub mod config;
pub mod connection;
pub mod error;
pub mod frame;
pub mod message;
pub mod session;
pub mod signal;
