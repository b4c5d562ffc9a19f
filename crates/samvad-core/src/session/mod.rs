//! Live session machinery.
//!
//! Each session runs as one serialized actor task ([`actor::SessionActor`])
//! owning all per-session state: the lifecycle [`coordinator::Coordinator`],
//! the connection [`roster::Roster`], the message [`sequencer::Sequencer`],
//! and the [`presence::PresenceTracker`]. The process-global
//! [`registry::SessionRegistry`] spawns actors on demand and routes
//! commands to them. Sessions never share locks; all cross-session
//! parallelism lives above the actor boundary.

pub mod actor;
pub mod command;
pub mod coordinator;
pub mod presence;
pub mod registry;
pub mod roster;
pub mod sequencer;
