//! In-memory result cache for processed images.
//!
//! Decode, resize, and encode dominate request latency. This module lets the
//! thumbnail pipeline skip all three when an identical request has already
//! been served.
//!
//! # Design
//!
//! The store is **keyed on transform parameters**: a [`CacheKey`] is derived
//! from every [`TransformRequest`](crate::request::TransformRequest) field that
//! affects the output. Two requests that differ in any field never share an
//! entry.
//!
//! ## Budget and eviction
//!
//! The summed payload size of resident entries never exceeds `max_bytes`.
//! When a `put` would overflow the budget, expired entries are swept first,
//! then least-recently-used entries are evicted until the new payload fits.
//! A payload larger than the whole budget is rejected outright.
//!
//! Recency is a monotonically increasing access counter, so two entries can
//! never tie: an entry that was inserted earlier and not read since is always
//! evicted first.
//!
//! ## Expiry
//!
//! An entry becomes unreachable once its age reaches the TTL. Expiry is
//! checked lazily on `get` and swept on `put`; either path removes the entry
//! and frees its bytes in the same critical section. A hit only moves the TTL
//! origin when `refresh_on_access` is set.
//!
//! ## Concurrency
//!
//! All state sits behind one [`Mutex`]. Every operation holds it for a bounded
//! amount of bookkeeping and never across I/O or image work. Payloads are
//! [`Bytes`], so a hit hands out a reference-counted view instead of copying.

use crate::config::CacheConfig;
use crate::request::CacheKey;
use bytes::Bytes;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum CacheError {
    #[error("entry of {size} bytes exceeds the {budget} byte cache budget")]
    EntryTooLarge { size: u64, budget: u64 },
}

/// A stored result. Immutable after insertion.
#[derive(Debug)]
pub struct CacheEntry {
    pub key: CacheKey,
    pub payload: Bytes,
    pub content_type: String,
    pub size_bytes: u64,
    pub created_at: Instant,
}

/// Counters and occupancy snapshot, served by `GET /cache/stats`.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub entry_count: usize,
    pub total_bytes: u64,
    pub evictions: u64,
    pub expirations: u64,
    pub max_bytes: u64,
}

impl CacheStats {
    pub fn lookups(&self) -> u64 {
        self.hits + self.misses
    }
}

impl fmt::Display for CacheStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} entries, {}/{} bytes",
            self.entry_count, self.total_bytes, self.max_bytes
        )?;
        if self.lookups() > 0 {
            write!(
                f,
                ", {} hits, {} misses ({} total)",
                self.hits,
                self.misses,
                self.lookups()
            )?;
        }
        if self.evictions > 0 || self.expirations > 0 {
            write!(
                f,
                ", {} evicted, {} expired",
                self.evictions, self.expirations
            )?;
        }
        Ok(())
    }
}

struct Slot {
    entry: Arc<CacheEntry>,
    last_access: u64,
    /// TTL is measured from here.
    origin: Instant,
}

#[derive(Default)]
struct Inner {
    slots: HashMap<CacheKey, Slot>,
    /// access tick → key, oldest first.
    recency: BTreeMap<u64, CacheKey>,
    total_bytes: u64,
    tick: u64,
    hits: u64,
    misses: u64,
    evictions: u64,
    expirations: u64,
}

impl Inner {
    fn next_tick(&mut self) -> u64 {
        self.tick += 1;
        self.tick
    }

    fn remove(&mut self, key: &CacheKey) -> Option<Slot> {
        let slot = self.slots.remove(key)?;
        self.recency.remove(&slot.last_access);
        self.total_bytes -= slot.entry.size_bytes;
        Some(slot)
    }

    fn sweep_expired(&mut self, now: Instant, ttl: Duration) {
        let expired: Vec<CacheKey> = self
            .slots
            .iter()
            .filter(|(_, slot)| is_expired(slot, now, ttl))
            .map(|(key, _)| key.clone())
            .collect();
        for key in expired {
            self.remove(&key);
            self.expirations += 1;
        }
    }

    fn evict_lru(&mut self) -> bool {
        let Some((_, key)) = self.recency.pop_first() else {
            return false;
        };
        if let Some(slot) = self.slots.remove(&key) {
            self.total_bytes -= slot.entry.size_bytes;
            self.evictions += 1;
            tracing::info!(key = %key, bytes = slot.entry.size_bytes, "evicted cache entry");
        }
        true
    }
}

fn is_expired(slot: &Slot, now: Instant, ttl: Duration) -> bool {
    now.saturating_duration_since(slot.origin) >= ttl
}

/// Size- and time-bounded LRU store. Share it as `Arc<CacheStore>`.
pub struct CacheStore {
    max_bytes: u64,
    ttl: Duration,
    refresh_on_access: bool,
    inner: Mutex<Inner>,
}

impl CacheStore {
    pub fn new(max_bytes: u64, ttl: Duration, refresh_on_access: bool) -> Self {
        Self {
            max_bytes,
            ttl,
            refresh_on_access,
            inner: Mutex::new(Inner::default()),
        }
    }

    pub fn from_config(config: &CacheConfig) -> Self {
        Self::new(
            config.max_bytes,
            Duration::from_secs(config.ttl_secs),
            config.refresh_on_access,
        )
    }

    pub fn max_bytes(&self) -> u64 {
        self.max_bytes
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    // A panic while holding the lock leaves the maps consistent (every
    // mutation is a complete remove/insert pair), so poisoning is ignored.
    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Look up a live entry. A hit refreshes recency.
    pub fn get(&self, key: &CacheKey) -> Option<Arc<CacheEntry>> {
        self.get_at(key, Instant::now())
    }

    /// [`get`](Self::get) with an explicit clock reading.
    pub fn get_at(&self, key: &CacheKey, now: Instant) -> Option<Arc<CacheEntry>> {
        let mut inner = self.lock();

        let expired = match inner.slots.get(key) {
            None => {
                inner.misses += 1;
                return None;
            }
            Some(slot) => is_expired(slot, now, self.ttl),
        };
        if expired {
            inner.remove(key);
            inner.expirations += 1;
            inner.misses += 1;
            tracing::debug!(key = %key, "cache entry expired");
            return None;
        }

        let tick = inner.next_tick();
        let refresh = self.refresh_on_access;
        let Inner {
            slots, recency, ..
        } = &mut *inner;
        let slot = slots.get_mut(key)?;
        recency.remove(&slot.last_access);
        recency.insert(tick, key.clone());
        slot.last_access = tick;
        if refresh {
            slot.origin = now;
        }
        let entry = Arc::clone(&slot.entry);
        inner.hits += 1;
        Some(entry)
    }

    /// Insert or replace an entry, evicting as needed to stay within budget.
    pub fn put(
        &self,
        key: CacheKey,
        payload: Bytes,
        content_type: impl Into<String>,
    ) -> Result<Arc<CacheEntry>, CacheError> {
        self.put_at(key, payload, content_type, Instant::now())
    }

    /// [`put`](Self::put) with an explicit clock reading.
    pub fn put_at(
        &self,
        key: CacheKey,
        payload: Bytes,
        content_type: impl Into<String>,
        now: Instant,
    ) -> Result<Arc<CacheEntry>, CacheError> {
        let size = payload.len() as u64;
        if size > self.max_bytes {
            return Err(CacheError::EntryTooLarge {
                size,
                budget: self.max_bytes,
            });
        }

        let entry = Arc::new(CacheEntry {
            key: key.clone(),
            payload,
            content_type: content_type.into(),
            size_bytes: size,
            created_at: now,
        });

        let mut inner = self.lock();
        inner.remove(&key);
        if inner.total_bytes + size > self.max_bytes {
            inner.sweep_expired(now, self.ttl);
        }
        while inner.total_bytes + size > self.max_bytes {
            if !inner.evict_lru() {
                break;
            }
        }

        let tick = inner.next_tick();
        inner.recency.insert(tick, key.clone());
        inner.total_bytes += size;
        inner.slots.insert(
            key,
            Slot {
                entry: Arc::clone(&entry),
                last_access: tick,
                origin: now,
            },
        );
        Ok(entry)
    }

    /// Counters and live occupancy. Expired entries are reclaimed first, so
    /// `entry_count` and `total_bytes` never include them.
    pub fn stats(&self) -> CacheStats {
        self.stats_at(Instant::now())
    }

    /// [`stats`](Self::stats) with an explicit clock reading.
    pub fn stats_at(&self, now: Instant) -> CacheStats {
        let mut inner = self.lock();
        inner.sweep_expired(now, self.ttl);
        CacheStats {
            hits: inner.hits,
            misses: inner.misses,
            entry_count: inner.slots.len(),
            total_bytes: inner.total_bytes,
            evictions: inner.evictions,
            expirations: inner.expirations,
            max_bytes: self.max_bytes,
        }
    }

    #[cfg(test)]
    fn assert_consistent(&self) {
        let inner = self.lock();
        let summed: u64 = inner.slots.values().map(|s| s.entry.size_bytes).sum();
        assert_eq!(summed, inner.total_bytes);
        assert!(inner.total_bytes <= self.max_bytes);
        assert_eq!(inner.recency.len(), inner.slots.len());
        for (tick, key) in &inner.recency {
            assert_eq!(inner.slots[key].last_access, *tick);
        }
    }
}
