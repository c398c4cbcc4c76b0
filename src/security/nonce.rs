//! Single-use nonce ledger.
//!
//! # Responsibilities
//! - Reject malformed nonces before any state is touched
//! - Accept each nonce value exactly once
//! - Bound storage by sweeping entries older than the TTL
//!
//! # Design Decisions
//! - Check-and-mark is one `DashMap::entry` call, which holds the shard
//!   lock for the whole decision; two racing requests see exactly one
//!   vacant entry
//! - A seen nonce stays rejected until the sweeper removes it

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::time::{Duration, Instant};

use crate::observability::metrics;

/// Syntactic nonce rules: length bounds and `[A-Za-z0-9._-]`.
#[derive(Debug, Clone, Copy)]
pub struct NonceFormat {
    pub min_len: usize,
    pub max_len: usize,
}

impl NonceFormat {
    pub fn new(min_len: usize, max_len: usize) -> Self {
        Self { min_len, max_len }
    }

    pub fn is_valid(&self, nonce: &str) -> bool {
        (self.min_len..=self.max_len).contains(&nonce.len())
            && nonce
                .bytes()
                .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b'.'))
    }
}

impl Default for NonceFormat {
    fn default() -> Self {
        Self::new(16, 128)
    }
}

/// Storage contract for nonce consumption.
pub trait NonceStore: Send + Sync {
    /// Returns true exactly once per nonce value; false on any reuse.
    fn consume(&self, nonce: &str) -> bool;
}

/// Process-local nonce store.
pub struct InMemoryNonceStore {
    seen: DashMap<String, Instant>,
    ttl: Duration,
}

impl InMemoryNonceStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            seen: DashMap::new(),
            ttl,
        }
    }

    /// Consume with an explicit clock reading.
    pub fn consume_at(&self, nonce: &str, now: Instant) -> bool {
        match self.seen.entry(nonce.to_string()) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(now);
                true
            }
        }
    }

    /// Drop entries first seen more than `ttl` before `now`. Returns how many were removed.
    pub fn purge_expired(&self, now: Instant) -> usize {
        let before = self.seen.len();
        self.seen
            .retain(|_, first_seen| now.saturating_duration_since(*first_seen) < self.ttl);
        let removed = before.saturating_sub(self.seen.len());
        metrics::record_nonce_store_size(self.seen.len());
        removed
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}

impl NonceStore for InMemoryNonceStore {
    fn consume(&self, nonce: &str) -> bool {
        self.consume_at(nonce, Instant::now())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Barrier};

    #[test]
    fn test_format_rules() {
        let format = NonceFormat::default();
        assert!(format.is_valid("nonce-123456789012"));
        assert!(format.is_valid("a.b_c-d.e_f-g.h_i"));
        assert!(!format.is_valid("short"));
        assert!(!format.is_valid("nonce with spaces!"));
        assert!(!format.is_valid("nonce-123456789012\n"));
        assert!(!format.is_valid(&"x".repeat(129)));
        assert!(format.is_valid(&"x".repeat(128)));
    }

    #[test]
    fn test_consume_once() {
        let store = InMemoryNonceStore::new(Duration::from_secs(60));
        assert!(store.consume("nonce-unique-123456"));
        assert!(!store.consume("nonce-unique-123456"));
        assert!(store.consume("nonce-unique-654321"));
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_purge_expired_keeps_fresh_entries() {
        let store = InMemoryNonceStore::new(Duration::from_secs(60));
        let start = Instant::now();
        assert!(store.consume_at("nonce-old-0000000001", start));
        assert!(store.consume_at("nonce-new-0000000001", start + Duration::from_secs(50)));

        let removed = store.purge_expired(start + Duration::from_secs(61));
        assert_eq!(removed, 1);
        assert!(!store.consume_at("nonce-new-0000000001", start + Duration::from_secs(62)));
    }

    #[test]
    fn test_expired_entry_still_rejected_until_swept() {
        let store = InMemoryNonceStore::new(Duration::from_secs(1));
        let start = Instant::now();
        assert!(store.consume_at("nonce-stale-00000001", start));
        assert!(!store.consume_at("nonce-stale-00000001", start + Duration::from_secs(10)));
    }

    #[test]
    fn test_concurrent_consume_single_acceptance() {
        let store = Arc::new(InMemoryNonceStore::new(Duration::from_secs(60)));
        let accepted = Arc::new(AtomicUsize::new(0));
        let threads = 16;
        let barrier = Arc::new(Barrier::new(threads));

        let handles: Vec<_> = (0..threads)
            .map(|_| {
                let store = store.clone();
                let accepted = accepted.clone();
                let barrier = barrier.clone();
                std::thread::spawn(move || {
                    barrier.wait();
                    if store.consume("nonce-race-00000001") {
                        accepted.fetch_add(1, Ordering::SeqCst);
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(accepted.load(Ordering::SeqCst), 1);
    }
}
