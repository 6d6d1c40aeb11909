// src/cache/mod.rs
//! In-process, TTL-keyed store of fetched entity collections, partitioned by
//! entity type and, for vessels, additionally by region key.
//!
//! Staleness is checked lazily on read; a stale entry reads as a miss and is
//! overwritten by the next successful fetch. Nothing here spawns background
//! eviction work. Collections are handed out as `Arc<Vec<T>>` snapshots:
//! callers share them read-only and never mutate in place.

use dashmap::DashMap;
use log::debug;
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tokio::time::Instant;

use crate::config::Config;
use crate::models::{Port, Refinery, VesselConnection, VesselPosition};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Vessels,
    Ports,
    Refineries,
    Connections,
}

/// Per-entity TTLs. Vessel positions move continuously so their TTL is
/// short; port and refinery metadata is near-static.
#[derive(Debug, Clone)]
pub struct CacheTtls {
    pub vessels: Duration,
    pub connections: Duration,
    pub ports: Duration,
    pub refineries: Duration,
}

impl CacheTtls {
    pub fn from_config(config: &Config) -> Self {
        Self {
            vessels: Duration::from_secs(config.vessel_cache_ttl_secs),
            connections: Duration::from_secs(config.connection_cache_ttl_secs),
            ports: Duration::from_secs(config.port_cache_ttl_secs),
            refineries: Duration::from_secs(config.refinery_cache_ttl_secs),
        }
    }

    fn for_kind(&self, kind: EntityKind) -> Duration {
        match kind {
            EntityKind::Vessels => self.vessels,
            EntityKind::Connections => self.connections,
            EntityKind::Ports => self.ports,
            EntityKind::Refineries => self.refineries,
        }
    }
}

impl Default for CacheTtls {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

#[derive(Debug, Clone)]
struct CacheEntry<T> {
    data: Arc<Vec<T>>,
    fetched_at: Instant,
}

impl<T> CacheEntry<T> {
    fn new(data: Vec<T>) -> Self {
        Self {
            data: Arc::new(data),
            fetched_at: Instant::now(),
        }
    }

    /// Fresh iff `now - fetched_at < ttl`; an entry exactly at its TTL is
    /// already stale.
    fn is_fresh(&self, ttl: Duration) -> bool {
        self.fetched_at.elapsed() < ttl
    }
}

/// The shared cache for the feed pipeline. Constructed once and owned by the
/// controller rather than living as a module-level global.
pub struct RegionalCache {
    ttls: CacheTtls,
    vessels_global: RwLock<Option<CacheEntry<VesselPosition>>>,
    vessels_by_region: DashMap<String, CacheEntry<VesselPosition>>,
    ports: RwLock<Option<CacheEntry<Port>>>,
    refineries: RwLock<Option<CacheEntry<Refinery>>>,
    connections: RwLock<Option<CacheEntry<VesselConnection>>>,
}

impl RegionalCache {
    pub fn new(ttls: CacheTtls) -> Self {
        Self {
            ttls,
            vessels_global: RwLock::new(None),
            vessels_by_region: DashMap::new(),
            ports: RwLock::new(None),
            refineries: RwLock::new(None),
            connections: RwLock::new(None),
        }
    }

    fn read_slot<T: Clone>(
        slot: &RwLock<Option<CacheEntry<T>>>,
        ttl: Duration,
        what: &str,
    ) -> Option<Arc<Vec<T>>> {
        let guard = slot.read().expect("cache lock poisoned");
        match guard.as_ref() {
            Some(entry) if entry.is_fresh(ttl) => {
                debug!("Cache HIT for {}", what);
                Some(Arc::clone(&entry.data))
            }
            Some(_) => {
                debug!("Cache STALE for {}", what);
                None
            }
            None => {
                debug!("Cache MISS for {}", what);
                None
            }
        }
    }

    /// Vessel collection for a region key, or the global collection when
    /// `region` is `None`. Stale or absent entries read as `None`.
    pub fn vessels(&self, region: Option<&str>) -> Option<Arc<Vec<VesselPosition>>> {
        match region {
            Some(key) => {
                let entry = self.vessels_by_region.get(key)?;
                if entry.is_fresh(self.ttls.vessels) {
                    debug!("Cache HIT for vessels:{}", key);
                    Some(Arc::clone(&entry.data))
                } else {
                    debug!("Cache STALE for vessels:{}", key);
                    None
                }
            }
            None => Self::read_slot(&self.vessels_global, self.ttls.vessels, "vessels"),
        }
    }

    /// Overwrites a vessel collection wholesale and resets its fetch
    /// timestamp. Writing the global collection invalidates every regional
    /// sub-cache: regional data is a derived view, and a stale sub-cache
    /// could contradict the newly fetched global truth.
    pub fn set_vessels(&self, region: Option<&str>, vessels: Vec<VesselPosition>) {
        match region {
            Some(key) => {
                debug!("Cache SET vessels:{} ({} entries)", key, vessels.len());
                self.vessels_by_region
                    .insert(key.to_string(), CacheEntry::new(vessels));
            }
            None => {
                debug!(
                    "Cache SET vessels global ({} entries), clearing {} regional partitions",
                    vessels.len(),
                    self.vessels_by_region.len()
                );
                let mut guard = self.vessels_global.write().expect("cache lock poisoned");
                *guard = Some(CacheEntry::new(vessels));
                self.vessels_by_region.clear();
            }
        }
    }

    pub fn ports(&self) -> Option<Arc<Vec<Port>>> {
        Self::read_slot(&self.ports, self.ttls.ports, "ports")
    }

    pub fn set_ports(&self, ports: Vec<Port>) {
        debug!("Cache SET ports ({} entries)", ports.len());
        *self.ports.write().expect("cache lock poisoned") = Some(CacheEntry::new(ports));
    }

    pub fn refineries(&self) -> Option<Arc<Vec<Refinery>>> {
        Self::read_slot(&self.refineries, self.ttls.refineries, "refineries")
    }

    pub fn set_refineries(&self, refineries: Vec<Refinery>) {
        debug!("Cache SET refineries ({} entries)", refineries.len());
        *self.refineries.write().expect("cache lock poisoned") = Some(CacheEntry::new(refineries));
    }

    pub fn connections(&self) -> Option<Arc<Vec<VesselConnection>>> {
        Self::read_slot(&self.connections, self.ttls.connections, "connections")
    }

    pub fn set_connections(&self, connections: Vec<VesselConnection>) {
        debug!("Cache SET connections ({} entries)", connections.len());
        *self.connections.write().expect("cache lock poisoned") =
            Some(CacheEntry::new(connections));
    }

    /// True when a vessel entry exists for the given region scope but its
    /// TTL has elapsed. Used by the controller to tell "stale" apart from
    /// "never fetched".
    pub fn vessels_stale(&self, region: Option<&str>) -> bool {
        match region {
            Some(key) => self
                .vessels_by_region
                .get(key)
                .map(|e| !e.is_fresh(self.ttls.vessels))
                .unwrap_or(false),
            None => self
                .vessels_global
                .read()
                .expect("cache lock poisoned")
                .as_ref()
                .map(|e| !e.is_fresh(self.ttls.vessels))
                .unwrap_or(false),
        }
    }

    /// Drops one entity type's cache, or everything when `kind` is `None`.
    pub fn clear(&self, kind: Option<EntityKind>) {
        match kind {
            Some(EntityKind::Vessels) => {
                *self.vessels_global.write().expect("cache lock poisoned") = None;
                self.vessels_by_region.clear();
            }
            Some(EntityKind::Ports) => {
                *self.ports.write().expect("cache lock poisoned") = None;
            }
            Some(EntityKind::Refineries) => {
                *self.refineries.write().expect("cache lock poisoned") = None;
            }
            Some(EntityKind::Connections) => {
                *self.connections.write().expect("cache lock poisoned") = None;
            }
            None => {
                for k in [
                    EntityKind::Vessels,
                    EntityKind::Ports,
                    EntityKind::Refineries,
                    EntityKind::Connections,
                ] {
                    self.clear(Some(k));
                }
            }
        }
        debug!("Cache CLEAR {:?}", kind);
    }

    pub fn ttl_for(&self, kind: EntityKind) -> Duration {
        self.ttls.for_kind(kind)
    }
}

impl Default for RegionalCache {
    fn default() -> Self {
        Self::new(CacheTtls::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn ttls(vessel_secs: u64) -> CacheTtls {
        CacheTtls {
            vessels: Duration::from_secs(vessel_secs),
            connections: Duration::from_secs(600),
            ports: Duration::from_secs(3600),
            refineries: Duration::from_secs(3600),
        }
    }

    fn vessel(id: u64) -> VesselPosition {
        VesselPosition {
            id,
            lat: 25.0,
            lng: -90.0,
            ..Default::default()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn set_then_get_returns_identical_content() {
        let cache = RegionalCache::new(ttls(120));
        cache.set_vessels(None, vec![vessel(1), vessel(2)]);

        let got = cache.vessels(None).expect("fresh entry");
        assert_eq!(got.len(), 2);
        assert_eq!(got[0], vessel(1));
    }

    #[tokio::test(start_paused = true)]
    async fn entry_reads_as_miss_after_ttl() {
        let cache = RegionalCache::new(ttls(1));
        cache.set_vessels(None, vec![vessel(1)]);
        assert!(cache.vessels(None).is_some());

        tokio::time::advance(Duration::from_secs(2)).await;
        assert!(cache.vessels(None).is_none());
        assert!(cache.vessels_stale(None));
    }

    #[tokio::test(start_paused = true)]
    async fn global_write_invalidates_regional_partitions() {
        let cache = RegionalCache::new(ttls(120));
        cache.set_vessels(Some("north-america"), vec![vessel(1)]);
        assert!(cache.vessels(Some("north-america")).is_some());

        cache.set_vessels(None, vec![vessel(1), vessel(2)]);
        assert!(cache.vessels(Some("north-america")).is_none());
        assert!(cache.vessels(None).is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn regional_write_leaves_global_untouched() {
        let cache = RegionalCache::new(ttls(120));
        cache.set_vessels(None, vec![vessel(1)]);
        cache.set_vessels(Some("europe"), vec![vessel(2)]);

        assert_eq!(cache.vessels(None).unwrap().len(), 1);
        assert_eq!(cache.vessels(Some("europe")).unwrap()[0].id, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn per_entity_ttls_are_independent() {
        let cache = RegionalCache::new(ttls(1));
        cache.set_vessels(None, vec![vessel(1)]);
        cache.set_ports(vec![Port {
            id: 1,
            name: "Rotterdam".to_string(),
            country: "NL".to_string(),
            region: "europe".to_string(),
            lat: 51.95,
            lng: 4.1,
            port_type: None,
        }]);

        tokio::time::advance(Duration::from_secs(2)).await;
        assert!(cache.vessels(None).is_none());
        assert!(cache.ports().is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn clear_scopes_to_entity_kind() {
        let cache = RegionalCache::new(ttls(120));
        cache.set_vessels(None, vec![vessel(1)]);
        cache.set_connections(vec![]);

        cache.clear(Some(EntityKind::Vessels));
        assert!(cache.vessels(None).is_none());
        assert!(cache.connections().is_some());

        cache.clear(None);
        assert!(cache.connections().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn overwrite_resets_fetch_timestamp() {
        let cache = RegionalCache::new(ttls(10));
        cache.set_vessels(None, vec![vessel(1)]);

        tokio::time::advance(Duration::from_secs(8)).await;
        cache.set_vessels(None, vec![vessel(2)]);

        tokio::time::advance(Duration::from_secs(8)).await;
        // 16s after the first write but only 8s after the overwrite.
        let got = cache.vessels(None).expect("still fresh");
        assert_eq!(got[0].id, 2);
    }
}
