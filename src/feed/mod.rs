// src/feed/mod.rs
//! The vessel feed controller: the single source of truth the presentation
//! layer reads. It orchestrates the stream client, the regional cache and
//! the REST fallback into one stable, paginated view of the fleet.

use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;
use tokio::task::JoinHandle;

use crate::api::{ApiClient, VesselQuery};
use crate::cache::RegionalCache;
use crate::config::Config;
use crate::error::FeedError;
use crate::models::{FeedPage, Port, Refinery, VesselConnection, VesselPosition};
use crate::proximity;
use crate::websocket::{
    ConnectionState, StreamClient, StreamEvent, StreamRequestPatch,
};

/// How the feed is currently being served. Surfaced so the UI can show a
/// degraded-mode indicator without the user manually retrying.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionType {
    WebSocket,
    Rest,
}

impl std::fmt::Display for ConnectionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConnectionType::WebSocket => write!(f, "websocket"),
            ConnectionType::Rest => write!(f, "rest"),
        }
    }
}

/// A point-in-time copy of everything the presentation layer renders.
#[derive(Debug, Clone)]
pub struct FeedSnapshot {
    pub vessels: Vec<VesselPosition>,
    pub connection_status: ConnectionState,
    pub connection_type: ConnectionType,
    pub error: Option<String>,
    pub last_updated: Option<DateTime<Utc>>,
    pub total_count: usize,
    pub page: usize,
    pub page_size: usize,
}

impl FeedSnapshot {
    pub fn total_pages(&self) -> usize {
        total_pages(self.total_count, self.page_size)
    }
}

fn total_pages(total_count: usize, page_size: usize) -> usize {
    let size = page_size.max(1);
    total_count.div_ceil(size).max(1)
}

struct FeedState {
    collection: Vec<VesselPosition>,
    connection_status: ConnectionState,
    connection_type: ConnectionType,
    error: Option<String>,
    last_updated: Option<DateTime<Utc>>,
    total_count: usize,
    page: usize,
    page_size: usize,
}

struct FeedInner {
    config: Arc<Config>,
    client: Arc<StreamClient>,
    cache: Arc<RegionalCache>,
    api: ApiClient,
    state: RwLock<FeedState>,
    disposed: AtomicBool,
    poll_task: Mutex<Option<JoinHandle<()>>>,
    refetch_in_flight: AtomicBool,
}

pub struct VesselFeedController {
    inner: Arc<FeedInner>,
    ingest_task: Mutex<Option<JoinHandle<()>>>,
}

impl VesselFeedController {
    pub fn new(
        config: Arc<Config>,
        client: Arc<StreamClient>,
        cache: Arc<RegionalCache>,
    ) -> Result<Self, FeedError> {
        let api = ApiClient::new(&config)?;
        let inner = Arc::new(FeedInner {
            state: RwLock::new(FeedState {
                collection: Vec::new(),
                connection_status: client.state(),
                connection_type: ConnectionType::WebSocket,
                error: None,
                last_updated: None,
                total_count: 0,
                page: 1,
                page_size: config.page_size.max(1),
            }),
            config,
            client,
            cache,
            api,
            disposed: AtomicBool::new(false),
            poll_task: Mutex::new(None),
            refetch_in_flight: AtomicBool::new(false),
        });
        Ok(Self {
            inner,
            ingest_task: Mutex::new(None),
        })
    }

    /// Seeds state from the cache when fresh data exists, registers with the
    /// stream and starts the connection. The UI can render the cached fleet
    /// immediately instead of blocking on network latency.
    pub fn start(&self) {
        self.seed_from_cache();

        let subscription = self.inner.client.subscribe();
        let inner = Arc::clone(&self.inner);
        *self.ingest_task.lock().expect("task lock poisoned") =
            Some(tokio::spawn(run_ingest(inner, subscription.receiver)));

        self.inner.client.connect();
    }

    /// Loads a fresh cached collection into state, if one exists.
    pub fn seed_from_cache(&self) {
        let region = self.inner.config.region.as_deref();
        if let Some(cached) = self.inner.cache.vessels(region) {
            info!("Seeding feed from cache ({} vessels)", cached.len());
            let mut state = self.inner.state.write().expect("state lock poisoned");
            state.collection = cached.as_ref().clone();
            state.total_count = cached.len();
        }
    }

    /// Current vessel page. When the backing cache entry has gone stale and
    /// no live stream is feeding us, this also kicks the refetch path —
    /// stale data is returned for rendering but never silently left to age.
    pub fn vessels(&self) -> Vec<VesselPosition> {
        let region = self.inner.config.region.as_deref();
        if self.inner.cache.vessels_stale(region)
            && self.inner.client.state() != ConnectionState::Connected
        {
            debug!("Cached vessels are stale; triggering refetch");
            self.inner.client.reconnect();
            spawn_rest_fetch(&self.inner, false);
        }
        self.page().vessels
    }

    /// The current page as a view-model. Recomputed on every call from the
    /// live collection; never persisted.
    pub fn page(&self) -> FeedPage {
        let state = self.inner.state.read().expect("state lock poisoned");
        let pages = total_pages(state.total_count, state.page_size);

        // A stream update carries the whole collection for the active
        // filters and is sliced locally; a REST response is already the
        // requested page and passes through.
        let vessels = if state.collection.len() > state.page_size {
            let start = (state.page - 1) * state.page_size;
            state
                .collection
                .iter()
                .skip(start)
                .take(state.page_size)
                .cloned()
                .collect()
        } else {
            state.collection.clone()
        };

        FeedPage {
            vessels,
            total_count: state.total_count,
            page: state.page,
            page_size: state.page_size,
            total_pages: pages,
        }
    }

    pub fn snapshot(&self) -> FeedSnapshot {
        let state = self.inner.state.read().expect("state lock poisoned");
        FeedSnapshot {
            vessels: state.collection.clone(),
            connection_status: state.connection_status,
            connection_type: state.connection_type,
            error: state.error.clone(),
            last_updated: state.last_updated,
            total_count: state.total_count,
            page: state.page,
            page_size: state.page_size,
        }
    }

    pub fn connection_status(&self) -> ConnectionState {
        self.inner.state.read().expect("state lock poisoned").connection_status
    }

    pub fn connection_type(&self) -> ConnectionType {
        self.inner.state.read().expect("state lock poisoned").connection_type
    }

    pub fn error(&self) -> Option<String> {
        self.inner.state.read().expect("state lock poisoned").error.clone()
    }

    pub fn last_updated(&self) -> Option<DateTime<Utc>> {
        self.inner.state.read().expect("state lock poisoned").last_updated
    }

    /// Moves to page `n`. A no-op when `n` is outside `[1, total_pages]`.
    pub fn go_to_page(&self, n: usize) {
        let out_of_range = {
            let state = self.inner.state.read().expect("state lock poisoned");
            n < 1 || n > total_pages(state.total_count, state.page_size)
        };
        if out_of_range {
            debug!("Ignoring go_to_page({}): out of range", n);
            return;
        }

        {
            let mut state = self.inner.state.write().expect("state lock poisoned");
            state.page = n;
        }
        self.inner.client.update_config(StreamRequestPatch {
            page: Some(n),
            ..Default::default()
        });
        if self.in_fallback() {
            spawn_rest_fetch(&self.inner, false);
        }
    }

    /// Changes the page size and resets to page 1 so the view can never
    /// land on a page that no longer exists.
    pub fn change_page_size(&self, n: usize) {
        let size = n.max(1);
        {
            let mut state = self.inner.state.write().expect("state lock poisoned");
            state.page_size = size;
            state.page = 1;
        }
        self.inner.client.update_config(StreamRequestPatch {
            page: Some(1),
            page_size: Some(size),
            ..Default::default()
        });
        if self.in_fallback() {
            spawn_rest_fetch(&self.inner, false);
        }
    }

    /// Forces a fresh REST fetch irrespective of cache freshness. This is
    /// the explicit bypass behind user-triggered refresh actions.
    pub async fn refresh_data(&self) -> Result<(), FeedError> {
        fetch_via_rest(&self.inner, false).await
    }

    /// Manual reconnect: clears the surfaced error and restarts the stream
    /// connect cycle. The remedy for an exhausted fallback.
    pub fn reconnect(&self) {
        {
            let mut state = self.inner.state.write().expect("state lock poisoned");
            state.error = None;
        }
        self.inner.client.reconnect();
    }

    /// Ports for the active region, read through the cache.
    pub async fn ports(&self) -> Result<Arc<Vec<Port>>, FeedError> {
        if let Some(cached) = self.inner.cache.ports() {
            return Ok(cached);
        }
        let region = self.inner.config.region.clone();
        let ports = self.inner.api.fetch_ports(region.as_deref()).await?;
        self.inner.cache.set_ports(ports);
        self.inner
            .cache
            .ports()
            .ok_or_else(|| FeedError::Cache("port cache write not visible".to_string()))
    }

    /// Refineries for the active region, read through the cache.
    pub async fn refineries(&self) -> Result<Arc<Vec<Refinery>>, FeedError> {
        if let Some(cached) = self.inner.cache.refineries() {
            return Ok(cached);
        }
        let region = self.inner.config.region.clone();
        let refineries = self.inner.api.fetch_refineries(region.as_deref()).await?;
        self.inner.cache.set_refineries(refineries);
        self.inner
            .cache
            .refineries()
            .ok_or_else(|| FeedError::Cache("refinery cache write not visible".to_string()))
    }

    /// Vessel-to-shore route lines for the current collection, derived on
    /// demand and cached under their own (medium) TTL.
    pub async fn connections(&self, radius_km: f64) -> Result<Arc<Vec<VesselConnection>>, FeedError> {
        if let Some(cached) = self.inner.cache.connections() {
            return Ok(cached);
        }
        let ports = self.ports().await?;
        let refineries = self.refineries().await?;
        let vessels = {
            let state = self.inner.state.read().expect("state lock poisoned");
            state.collection.clone()
        };
        let connections = proximity::connections_for(&vessels, &ports, &refineries, radius_km);
        self.inner.cache.set_connections(connections);
        self.inner
            .cache
            .connections()
            .ok_or_else(|| FeedError::Cache("connection cache write not visible".to_string()))
    }

    fn in_fallback(&self) -> bool {
        self.inner.state.read().expect("state lock poisoned").connection_type
            == ConnectionType::Rest
    }

    /// Tears the controller down: stops ingest and polling, disconnects the
    /// stream. Late async responses are dropped via the disposed flag.
    pub fn shutdown(&self) {
        self.inner.disposed.store(true, Ordering::SeqCst);
        if let Some(task) = self.ingest_task.lock().expect("task lock poisoned").take() {
            task.abort();
        }
        if let Some(task) = self
            .inner
            .poll_task
            .lock()
            .expect("task lock poisoned")
            .take()
        {
            task.abort();
        }
        self.inner.client.disconnect();
        info!("Vessel feed controller shut down");
    }
}

impl Drop for VesselFeedController {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Drains stream events into feed state until teardown.
async fn run_ingest(
    inner: Arc<FeedInner>,
    mut receiver: tokio::sync::mpsc::UnboundedReceiver<StreamEvent>,
) {
    while let Some(event) = receiver.recv().await {
        if inner.disposed.load(Ordering::SeqCst) {
            return;
        }
        match event {
            StreamEvent::Data(positions) => apply_stream_data(&inner, positions),
            StreamEvent::StatusChange(status) => {
                {
                    let mut state = inner.state.write().expect("state lock poisoned");
                    state.connection_status = status;
                    if status == ConnectionState::Connected {
                        state.connection_type = ConnectionType::WebSocket;
                        state.error = None;
                    }
                }
                match status {
                    ConnectionState::UsingFallback | ConnectionState::Errored => {
                        start_fallback(&inner);
                    }
                    _ => {}
                }
            }
            StreamEvent::Error(message) => {
                warn!("Stream error surfaced to feed: {}", message);
                let mut state = inner.state.write().expect("state lock poisoned");
                state.error = Some(message);
            }
        }
    }
}

/// Applies a live data update: water-classification filtering, wholesale
/// cache overwrite, state publish.
fn apply_stream_data(inner: &Arc<FeedInner>, positions: Vec<VesselPosition>) {
    let before = positions.len();
    let valid: Vec<VesselPosition> = positions
        .into_iter()
        .filter(|p| proximity::is_valid_position(p))
        .collect();
    if valid.len() < before {
        debug!(
            "Filtered {} implausible positions from stream update",
            before - valid.len()
        );
    }

    inner
        .cache
        .set_vessels(inner.config.region.as_deref(), valid.clone());

    let mut state = inner.state.write().expect("state lock poisoned");
    state.total_count = valid.len();
    state.collection = valid;
    state.last_updated = Some(Utc::now());
    // A shrinking fleet must not leave the view on a page that no longer
    // exists.
    let pages = total_pages(state.total_count, state.page_size);
    if state.page > pages {
        state.page = pages;
    }
}

/// Switches the feed to REST mode: immediate fetch, then a polling loop
/// that runs until the stream recovers or the controller shuts down.
fn start_fallback(inner: &Arc<FeedInner>) {
    if inner.disposed.load(Ordering::SeqCst) {
        return;
    }
    {
        let mut state = inner.state.write().expect("state lock poisoned");
        if state.connection_type != ConnectionType::Rest {
            info!("Stream unavailable; switching feed to REST fallback");
            state.connection_type = ConnectionType::Rest;
        }
    }

    spawn_rest_fetch(inner, true);

    let mut poll_task = inner.poll_task.lock().expect("task lock poisoned");
    let running = poll_task.as_ref().map(|t| !t.is_finished()).unwrap_or(false);
    if running {
        return;
    }

    let poll_inner = Arc::clone(inner);
    *poll_task = Some(tokio::spawn(async move {
        let period = Duration::from_secs(poll_inner.config.rest_poll_interval_secs.max(1));
        let mut ticker = tokio::time::interval(period);
        ticker.tick().await; // immediate first tick; the fetch above covered it
        loop {
            ticker.tick().await;
            if poll_inner.disposed.load(Ordering::SeqCst) {
                return;
            }
            if poll_inner.client.state() == ConnectionState::Connected {
                info!("Stream recovered; stopping REST polling");
                return;
            }
            if let Err(e) = fetch_via_rest(&poll_inner, true).await {
                warn!("REST poll failed: {}", e);
            }
        }
    }));
}

/// Spawns a one-shot REST fetch, deduplicating concurrent triggers.
fn spawn_rest_fetch(inner: &Arc<FeedInner>, mark_fallback: bool) {
    if inner.disposed.load(Ordering::SeqCst) {
        return;
    }
    if inner
        .refetch_in_flight
        .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
        .is_err()
    {
        return;
    }
    let inner = Arc::clone(inner);
    tokio::spawn(async move {
        let result = fetch_via_rest(&inner, mark_fallback).await;
        inner.refetch_in_flight.store(false, Ordering::SeqCst);
        if let Err(e) = result {
            warn!("Background REST fetch failed: {}", e);
        }
    });
}

/// Fetches the current view over REST and publishes it. When the stream is
/// also down and this fails, the feed surfaces a terminal error; that is
/// the one condition a user sees.
async fn fetch_via_rest(inner: &Arc<FeedInner>, mark_fallback: bool) -> Result<(), FeedError> {
    let query = {
        let state = inner.state.read().expect("state lock poisoned");
        VesselQuery {
            region: inner.config.region.clone(),
            page: state.page,
            page_size: state.page_size,
            vessel_type: inner.config.vessel_type.clone(),
        }
    };

    match inner.api.fetch_vessels(&query).await {
        Ok(listing) => {
            if inner.disposed.load(Ordering::SeqCst) {
                return Ok(());
            }
            let valid: Vec<VesselPosition> = listing
                .vessels
                .into_iter()
                .filter(|p| proximity::is_valid_position(p))
                .collect();
            inner
                .cache
                .set_vessels(inner.config.region.as_deref(), valid.clone());

            let mut state = inner.state.write().expect("state lock poisoned");
            state.total_count = listing.total_count.max(valid.len());
            state.collection = valid;
            state.last_updated = Some(Utc::now());
            state.error = None;
            if mark_fallback {
                state.connection_type = ConnectionType::Rest;
            }
            Ok(())
        }
        Err(e) => {
            if inner.disposed.load(Ordering::SeqCst) {
                return Ok(());
            }
            let stream_down = !matches!(
                inner.client.state(),
                ConnectionState::Connected | ConnectionState::Connecting
            );
            if stream_down {
                let err = FeedError::FallbackExhausted(format!(
                    "stream unavailable and REST fetch failed: {}",
                    e
                ));
                let mut state = inner.state.write().expect("state lock poisoned");
                state.error = Some(err.to_string());
                state.connection_status = ConnectionState::Errored;
                Err(err)
            } else {
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::CacheTtls;
    use crate::websocket::{StreamClientSettings, StreamRequest};
    use pretty_assertions::assert_eq;

    fn test_config() -> Arc<Config> {
        Arc::new(Config {
            // Unroutable endpoints: tests never hit the network on purpose.
            api_base_url: "http://127.0.0.1:9".to_string(),
            ws_url: "ws://127.0.0.1:9".to_string(),
            page_size: 10,
            rest_max_retries: 0,
            rest_retry_delay_ms: 1,
            ..Default::default()
        })
    }

    fn controller_with(config: Arc<Config>) -> VesselFeedController {
        let client = Arc::new(StreamClient::new(
            StreamClientSettings::from_config(&config),
            StreamRequest::default(),
        ));
        let cache = Arc::new(RegionalCache::new(CacheTtls::from_config(&config)));
        VesselFeedController::new(config, client, cache).unwrap()
    }

    fn vessel(id: u64) -> VesselPosition {
        VesselPosition {
            id,
            lat: 25.0,
            lng: -90.0,
            ..Default::default()
        }
    }

    fn seed(controller: &VesselFeedController, count: u64) {
        let vessels: Vec<VesselPosition> = (1..=count).map(vessel).collect();
        controller.inner.cache.set_vessels(None, vessels);
        controller.seed_from_cache();
    }

    #[tokio::test]
    async fn pagination_bounds_are_no_ops() {
        let controller = controller_with(test_config());
        seed(&controller, 25); // page_size 10 -> 3 pages

        assert_eq!(controller.page().total_pages, 3);

        controller.go_to_page(0);
        assert_eq!(controller.page().page, 1);

        controller.go_to_page(4);
        assert_eq!(controller.page().page, 1);

        controller.go_to_page(3);
        assert_eq!(controller.page().page, 3);
    }

    #[tokio::test]
    async fn change_page_size_resets_to_first_page() {
        let controller = controller_with(test_config());
        seed(&controller, 25);

        controller.go_to_page(2);
        assert_eq!(controller.page().page, 2);

        controller.change_page_size(5);
        let page = controller.page();
        assert_eq!(page.page, 1);
        assert_eq!(page.page_size, 5);
        assert_eq!(page.total_pages, 5);
    }

    #[tokio::test]
    async fn total_pages_is_at_least_one() {
        let controller = controller_with(test_config());
        assert_eq!(controller.page().total_pages, 1);
        assert_eq!(controller.page().page, 1);
        assert!(controller.page().vessels.is_empty());
    }

    #[tokio::test]
    async fn page_slices_full_collection_locally() {
        let controller = controller_with(test_config());
        seed(&controller, 25);

        let page1 = controller.page();
        assert_eq!(page1.vessels.len(), 10);
        assert_eq!(page1.vessels[0].id, 1);
        assert_eq!(page1.total_count, 25);

        controller.go_to_page(3);
        let page3 = controller.page();
        assert_eq!(page3.vessels.len(), 5);
        assert_eq!(page3.vessels[0].id, 21);
    }

    #[tokio::test]
    async fn stream_data_filters_implausible_positions() {
        let controller = controller_with(test_config());
        let positions = vec![
            vessel(1),
            VesselPosition {
                id: 2,
                lat: 23.0, // mid Sahara: in range but on land
                lng: 10.0,
                ..Default::default()
            },
        ];
        apply_stream_data(&controller.inner, positions);

        let page = controller.page();
        assert_eq!(page.total_count, 1);
        assert_eq!(page.vessels[0].id, 1);
        assert!(controller.last_updated().is_some());
    }

    #[tokio::test]
    async fn shrinking_collection_clamps_current_page() {
        let controller = controller_with(test_config());
        seed(&controller, 25);
        controller.go_to_page(3);

        apply_stream_data(&controller.inner, (1..=5).map(vessel).collect());
        assert_eq!(controller.page().page, 1);
    }

    #[tokio::test]
    async fn seeded_state_comes_from_cache_without_network() {
        let controller = controller_with(test_config());
        seed(&controller, 7);

        let snapshot = controller.snapshot();
        assert_eq!(snapshot.total_count, 7);
        assert_eq!(snapshot.vessels.len(), 7);
    }

    #[tokio::test]
    async fn fallback_exhaustion_surfaces_terminal_error() {
        let controller = controller_with(test_config());
        // Stream is Disconnected and the API endpoint is unroutable, so a
        // forced refresh is the both-paths-down scenario.
        let result = controller.refresh_data().await;
        assert!(matches!(result, Err(FeedError::FallbackExhausted(_))));

        let snapshot = controller.snapshot();
        assert!(snapshot.error.is_some());
        assert_eq!(snapshot.connection_status, ConnectionState::Errored);

        // Manual reconnect clears the surfaced error.
        controller.reconnect();
        assert_eq!(controller.error(), None);
        controller.shutdown();
    }
}
