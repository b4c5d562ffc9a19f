//! Per-session connection roster.
//!
//! Tracks the 0-2 live transport attachments of one session. At most one
//! connection per role: attaching a new connection for a role silently
//! supersedes the prior one (its outbound sender is dropped, which closes
//! the socket on the gateway side) without touching session state. This
//! tolerates flaky mobile networks -- a reconnect replaces the old socket
//! instead of ending a billed session.
//!
//! Outbound delivery is best-effort over bounded queues: `try_send` only.
//! A connection whose queue is full or closed is reported back to the
//! caller for force-detach rather than stalling the session's serialized
//! processor.

use samvad_types::connection::PartyRole;
use samvad_types::frame::ServerFrame;
use tokio::sync::mpsc;
use tokio::time::Instant;
use uuid::Uuid;

use std::time::Duration;

/// One live attachment.
#[derive(Debug)]
pub struct ConnectionEntry {
    pub id: Uuid,
    pub role: PartyRole,
    pub outbound: mpsc::Sender<ServerFrame>,
    pub attached_at: Instant,
    pub last_seen: Instant,
}

impl ConnectionEntry {
    pub fn new(id: Uuid, role: PartyRole, outbound: mpsc::Sender<ServerFrame>, now: Instant) -> Self {
        Self {
            id,
            role,
            outbound,
            attached_at: now,
            last_seen: now,
        }
    }
}

/// The set of currently attached connections for one session.
#[derive(Debug, Default)]
pub struct Roster {
    entries: Vec<ConnectionEntry>,
}

impl Roster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a connection, superseding any prior connection of the same
    /// role. Returns the superseded entry so the caller can log it; the
    /// returned entry's outbound sender closes when dropped.
    pub fn attach(&mut self, entry: ConnectionEntry) -> Option<ConnectionEntry> {
        let superseded = self
            .entries
            .iter()
            .position(|e| e.role == entry.role)
            .map(|idx| self.entries.remove(idx));
        self.entries.push(entry);
        superseded
    }

    /// Remove a connection by identity.
    pub fn detach(&mut self, connection_id: &Uuid) -> Option<ConnectionEntry> {
        self.entries
            .iter()
            .position(|e| e.id == *connection_id)
            .map(|idx| self.entries.remove(idx))
    }

    /// Refresh a connection's liveness window. Returns false for unknown
    /// identities (e.g., a heartbeat racing its own detach).
    pub fn heartbeat(&mut self, connection_id: &Uuid, now: Instant) -> bool {
        match self.entries.iter_mut().find(|e| e.id == *connection_id) {
            Some(entry) => {
                entry.last_seen = now;
                true
            }
            None => false,
        }
    }

    /// Connections silent for longer than the liveness window.
    pub fn stale_connections(&self, now: Instant, window: Duration) -> Vec<Uuid> {
        self.entries
            .iter()
            .filter(|e| now.saturating_duration_since(e.last_seen) > window)
            .map(|e| e.id)
            .collect()
    }

    /// Deliver a frame to every attached connection, optionally excluding
    /// one role. Returns the identities whose queue was full or closed;
    /// the caller must force-detach those.
    pub fn broadcast(&self, frame: &ServerFrame, exclude: Option<PartyRole>) -> Vec<Uuid> {
        let mut dead = Vec::new();
        for entry in &self.entries {
            if Some(entry.role) == exclude {
                continue;
            }
            if entry.outbound.try_send(frame.clone()).is_err() {
                dead.push(entry.id);
            }
        }
        dead
    }

    /// Deliver a frame to one connection. Returns false if the identity is
    /// unknown or its queue was full/closed.
    pub fn send_to(&self, connection_id: &Uuid, frame: ServerFrame) -> bool {
        self.entries
            .iter()
            .find(|e| e.id == *connection_id)
            .is_some_and(|e| e.outbound.try_send(frame).is_ok())
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Drop every attachment (terminal transition: sockets close as the
    /// outbound senders drop).
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(role: PartyRole, buffer: usize) -> (ConnectionEntry, mpsc::Receiver<ServerFrame>) {
        let (tx, rx) = mpsc::channel(buffer);
        (
            ConnectionEntry::new(Uuid::now_v7(), role, tx, Instant::now()),
            rx,
        )
    }

    fn test_frame() -> ServerFrame {
        ServerFrame::TypingIndicator {
            sender_role: PartyRole::Customer,
            is_typing: true,
        }
    }

    #[test]
    fn test_attach_both_roles() {
        let mut roster = Roster::new();
        let (customer, _rx1) = entry(PartyRole::Customer, 4);
        let (provider, _rx2) = entry(PartyRole::Provider, 4);
        assert!(roster.attach(customer).is_none());
        assert!(roster.attach(provider).is_none());
        assert_eq!(roster.len(), 2);
    }

    #[test]
    fn test_attach_supersedes_same_role() {
        let mut roster = Roster::new();
        let (first, _rx1) = entry(PartyRole::Customer, 4);
        let first_id = first.id;
        roster.attach(first);

        let (second, _rx2) = entry(PartyRole::Customer, 4);
        let superseded = roster.attach(second).unwrap();
        assert_eq!(superseded.id, first_id);
        assert_eq!(roster.len(), 1);
    }

    #[test]
    fn test_detach_then_empty() {
        let mut roster = Roster::new();
        let (customer, _rx) = entry(PartyRole::Customer, 4);
        let id = customer.id;
        roster.attach(customer);

        assert!(roster.detach(&id).is_some());
        assert!(roster.is_empty());
        assert!(roster.detach(&id).is_none());
    }

    #[test]
    fn test_broadcast_excludes_sender_role() {
        let mut roster = Roster::new();
        let (customer, mut customer_rx) = entry(PartyRole::Customer, 4);
        let (provider, mut provider_rx) = entry(PartyRole::Provider, 4);
        roster.attach(customer);
        roster.attach(provider);

        let dead = roster.broadcast(&test_frame(), Some(PartyRole::Customer));
        assert!(dead.is_empty());
        assert!(provider_rx.try_recv().is_ok());
        assert!(customer_rx.try_recv().is_err());
    }

    #[test]
    fn test_broadcast_reports_overflow() {
        let mut roster = Roster::new();
        let (customer, _customer_rx) = entry(PartyRole::Customer, 1);
        let customer_id = customer.id;
        roster.attach(customer);

        // First frame fills the queue, second overflows.
        assert!(roster.broadcast(&test_frame(), None).is_empty());
        let dead = roster.broadcast(&test_frame(), None);
        assert_eq!(dead, vec![customer_id]);
    }

    #[test]
    fn test_broadcast_reports_closed_receiver() {
        let mut roster = Roster::new();
        let (customer, customer_rx) = entry(PartyRole::Customer, 4);
        let customer_id = customer.id;
        roster.attach(customer);
        drop(customer_rx);

        let dead = roster.broadcast(&test_frame(), None);
        assert_eq!(dead, vec![customer_id]);
    }

    #[test]
    fn test_heartbeat_refreshes_last_seen() {
        let mut roster = Roster::new();
        let (customer, _rx) = entry(PartyRole::Customer, 4);
        let id = customer.id;
        roster.attach(customer);

        let later = Instant::now() + Duration::from_secs(60);
        assert!(roster.heartbeat(&id, later));

        // Refreshed just now: not stale within a 30s window at `later`.
        assert!(roster
            .stale_connections(later, Duration::from_secs(30))
            .is_empty());
        // 31s after the refresh it is.
        let stale = roster.stale_connections(
            later + Duration::from_secs(31),
            Duration::from_secs(30),
        );
        assert_eq!(stale, vec![id]);
    }

    #[test]
    fn test_heartbeat_unknown_connection() {
        let mut roster = Roster::new();
        assert!(!roster.heartbeat(&Uuid::now_v7(), Instant::now()));
    }
}
