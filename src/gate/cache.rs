//! Short-lived cache of reverse DNS results, keyed by client address.

use dashmap::DashMap;
use std::{
    net::IpAddr,
    sync::Arc,
    time::{Duration, Instant},
};

#[derive(Clone)]
pub struct DnsCache {
    entries: Arc<DashMap<IpAddr, CachedName>>,
    ttl: Duration,
    capacity: usize,
}

#[derive(Clone)]
struct CachedName {
    /// `None` records a lookup that completed without a name.
    hostname: Option<String>,
    expires_at: Instant,
}

impl DnsCache {
    pub fn new(ttl: Duration, capacity: usize) -> Self {
        Self {
            entries: Arc::new(DashMap::new()),
            ttl,
            capacity: capacity.max(1),
        }
    }

    /// Cached outcome for `ip`, if one is still fresh.
    pub fn get(&self, ip: IpAddr) -> Option<Option<String>> {
        let now = Instant::now();
        if let Some(entry) = self.entries.get(&ip) {
            if now < entry.expires_at {
                return Some(entry.hostname.clone());
            }
        }
        self.entries.remove_if(&ip, |_, entry| entry.expires_at <= now);
        None
    }

    /// Record `hostname` for `ip`. Once concurrent inserts return, the cache
    /// holds at most `capacity` entries.
    pub fn insert(&self, ip: IpAddr, hostname: Option<String>) {
        if self.ttl.is_zero() {
            return;
        }
        let now = Instant::now();
        if !self.entries.contains_key(&ip) && self.entries.len() >= self.capacity {
            self.shrink_to(now, self.capacity - 1);
        }
        self.entries.insert(
            ip,
            CachedName {
                hostname,
                expires_at: now + self.ttl,
            },
        );
        // Another insert may have raced past the check above.
        if self.entries.len() > self.capacity {
            self.shrink_to(now, self.capacity);
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Drop expired entries, then evict those closest to expiry until at
    /// most `limit` remain.
    fn shrink_to(&self, now: Instant, limit: usize) {
        self.entries.retain(|_, entry| entry.expires_at > now);
        while self.entries.len() > limit {
            let oldest = self
                .entries
                .iter()
                .min_by_key(|entry| entry.expires_at)
                .map(|entry| *entry.key());
            match oldest {
                Some(ip) => {
                    self.entries.remove(&ip);
                }
                None => break,
            }
        }
    }
}
