//! Per-session sequence assignment and idempotent dedup.
//!
//! Sequence numbers start at 1 and are strictly increasing with no gaps.
//! The token map records every (idempotency token -> seq) assignment made
//! in this process life; the durable store backs it across restarts (the
//! actor consults `MessageRepository::find_by_token` on a map miss and
//! caches the hit).
//!
//! Assignment is two-phase: `peek_next` names the candidate sequence for
//! the write-ahead persist, `commit` consumes it only after the store
//! accepted the message. A failed persist therefore consumes nothing and
//! the gap-free guarantee holds.

use std::collections::HashMap;

/// Sequence and dedup state for one session.
#[derive(Debug)]
pub struct Sequencer {
    next_seq: u64,
    tokens: HashMap<String, u64>,
}

impl Sequencer {
    /// Start after the highest persisted sequence (0 when the session has
    /// no messages yet).
    pub fn new(max_persisted_seq: u64) -> Self {
        Self {
            next_seq: max_persisted_seq + 1,
            tokens: HashMap::new(),
        }
    }

    /// Sequence previously assigned to this token, if known in-process.
    pub fn known(&self, token: &str) -> Option<u64> {
        self.tokens.get(token).copied()
    }

    /// The sequence the next committed message will receive.
    pub fn peek_next(&self) -> u64 {
        self.next_seq
    }

    /// Consume the next sequence for a token. Call only after the message
    /// was durably persisted under `peek_next()`.
    pub fn commit(&mut self, token: &str) -> u64 {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.tokens.insert(token.to_string(), seq);
        seq
    }

    /// Record an assignment discovered in the durable store (restart
    /// hydration path).
    pub fn cache(&mut self, token: &str, seq: u64) {
        self.tokens.insert(token.to_string(), seq);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sequences_start_at_one() {
        let mut seq = Sequencer::new(0);
        assert_eq!(seq.peek_next(), 1);
        assert_eq!(seq.commit("a"), 1);
        assert_eq!(seq.commit("b"), 2);
        assert_eq!(seq.commit("c"), 3);
    }

    #[test]
    fn test_no_gaps_for_distinct_tokens() {
        let mut seq = Sequencer::new(0);
        let assigned: Vec<u64> = (0..100).map(|i| seq.commit(&format!("tok-{i}"))).collect();
        for (i, s) in assigned.iter().enumerate() {
            assert_eq!(*s, i as u64 + 1);
        }
    }

    #[test]
    fn test_known_token_returns_original() {
        let mut seq = Sequencer::new(0);
        let first = seq.commit("a1");
        assert_eq!(seq.known("a1"), Some(first));
        assert_eq!(seq.known("a2"), None);
        // Dedup never consumed a sequence.
        assert_eq!(seq.peek_next(), first + 1);
    }

    #[test]
    fn test_failed_persist_consumes_nothing() {
        let mut seq = Sequencer::new(0);
        // peek without commit models a rejected store write
        assert_eq!(seq.peek_next(), 1);
        assert_eq!(seq.peek_next(), 1);
        assert_eq!(seq.commit("a"), 1);
    }

    #[test]
    fn test_resumes_after_persisted_history() {
        let mut seq = Sequencer::new(41);
        assert_eq!(seq.commit("x"), 42);
    }

    #[test]
    fn test_cache_hydrates_restart_lookup() {
        let mut seq = Sequencer::new(7);
        seq.cache("old-token", 3);
        assert_eq!(seq.known("old-token"), Some(3));
        assert_eq!(seq.peek_next(), 8);
    }
}
