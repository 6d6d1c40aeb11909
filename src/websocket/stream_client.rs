//! Persistent client connection to the live vessel stream.
//!
//! The client owns the connection-state machine, an automatic reconnect
//! policy with bounded exponential backoff, and a token-based pub/sub
//! fan-out. All deferred work (backoff sleeps, keepalive pings) lives inside
//! a single connection task, so teardown is one abort and there is never
//! more than one outstanding timer.

use futures_util::{SinkExt, StreamExt};
use log::{debug, info, warn};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, watch, Notify};
use tokio::task::JoinHandle;
use tokio::time::{interval, sleep, timeout};
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};
use url::Url;
use uuid::Uuid;

use crate::config::Config;
use crate::models::{StreamMetrics, VesselPosition};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Connection lifecycle. Owned exclusively by the stream client; consumers
/// learn of changes only through `StreamEvent::StatusChange`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    /// Reconnect attempts are exhausted; the controller is expected to poll
    /// over REST until a manual retry or config change restarts the cycle.
    UsingFallback,
    Errored,
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Connected => "connected",
            ConnectionState::UsingFallback => "using-fallback",
            ConnectionState::Errored => "errored",
        };
        write!(f, "{}", s)
    }
}

/// Events fanned out to subscribers, in subscription order.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    Data(Vec<VesselPosition>),
    StatusChange(ConnectionState),
    Error(String),
}

/// The request parameters the server is currently serving for this client.
/// Sent as the subscribe message on connect and re-sent in-band on change.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamRequest {
    pub region: Option<String>,
    pub page: usize,
    pub page_size: usize,
    pub vessel_type: Option<String>,
}

impl StreamRequest {
    fn subscribe_message(&self) -> String {
        let mut value = serde_json::to_value(self).expect("request serializes");
        value["type"] = serde_json::Value::from("subscribe");
        value.to_string()
    }
}

impl Default for StreamRequest {
    fn default() -> Self {
        Self {
            region: None,
            page: 1,
            page_size: 50,
            vessel_type: None,
        }
    }
}

/// Partial update merged into the live request. `None` leaves a field
/// unchanged; the latest merge wins (superseding, never queued).
#[derive(Debug, Clone, Default)]
pub struct StreamRequestPatch {
    pub region: Option<Option<String>>,
    pub page: Option<usize>,
    pub page_size: Option<usize>,
    pub vessel_type: Option<Option<String>>,
}

#[derive(Debug, Clone)]
pub struct StreamClientSettings {
    pub url: String,
    pub reconnect_delay: Duration,
    pub max_reconnect_delay: Duration,
    pub max_reconnect_attempts: u32,
    pub connect_timeout: Duration,
    pub ping_interval: Duration,
}

impl StreamClientSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            url: config.ws_url.clone(),
            reconnect_delay: Duration::from_millis(config.ws_reconnect_delay_ms),
            max_reconnect_delay: Duration::from_millis(config.ws_max_reconnect_delay_ms),
            max_reconnect_attempts: config.ws_max_reconnect_attempts,
            connect_timeout: Duration::from_secs(config.ws_connect_timeout_secs),
            ping_interval: Duration::from_millis(config.ws_ping_interval_ms),
        }
    }
}

/// Handle returned from `subscribe`. Dropping the receiver is a valid way to
/// stop listening; `unsubscribe` with the id removes the slot eagerly.
pub struct StreamSubscription {
    pub id: Uuid,
    pub receiver: mpsc::UnboundedReceiver<StreamEvent>,
}

/// Inbound wire envelope. Heartbeats and connection confirmations are
/// consumed here and never reach subscribers.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum Envelope {
    Heartbeat {
        #[serde(default)]
        #[allow(dead_code)]
        timestamp: Option<u64>,
    },
    Connected {
        #[serde(default)]
        #[allow(dead_code)]
        data: Option<serde_json::Value>,
    },
    Error {
        #[serde(default)]
        data: Option<serde_json::Value>,
    },
    Data {
        data: Vec<VesselPosition>,
    },
}

struct Shared {
    state: RwLock<ConnectionState>,
    subscribers: Mutex<Vec<(Uuid, mpsc::UnboundedSender<StreamEvent>)>>,
    metrics: Mutex<StreamMetrics>,
    disposed: AtomicBool,
}

impl Shared {
    /// Delivers an event to every live subscriber in subscription order. A
    /// subscriber whose receiver is gone is pruned and never blocks the
    /// rest. Nothing is delivered after disposal.
    fn publish(&self, event: StreamEvent) {
        if self.disposed.load(Ordering::SeqCst) {
            return;
        }
        let mut subs = self.subscribers.lock().expect("subscriber lock poisoned");
        subs.retain(|(_, tx)| tx.send(event.clone()).is_ok());
    }

    fn set_state(&self, next: ConnectionState) {
        let changed = {
            let mut state = self.state.write().expect("state lock poisoned");
            if *state == next {
                false
            } else {
                *state = next;
                true
            }
        };
        if changed {
            debug!("Stream connection state -> {}", next);
            self.publish(StreamEvent::StatusChange(next));
        }
    }

    fn state(&self) -> ConnectionState {
        *self.state.read().expect("state lock poisoned")
    }
}

pub struct StreamClient {
    settings: StreamClientSettings,
    shared: Arc<Shared>,
    request_tx: watch::Sender<StreamRequest>,
    retry: Arc<Notify>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl StreamClient {
    pub fn new(settings: StreamClientSettings, request: StreamRequest) -> Self {
        let (request_tx, _) = watch::channel(request);
        Self {
            settings,
            shared: Arc::new(Shared {
                state: RwLock::new(ConnectionState::Disconnected),
                subscribers: Mutex::new(Vec::new()),
                metrics: Mutex::new(StreamMetrics::default()),
                disposed: AtomicBool::new(false),
            }),
            request_tx,
            retry: Arc::new(Notify::new()),
            task: Mutex::new(None),
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.shared.state()
    }

    pub fn metrics(&self) -> StreamMetrics {
        self.shared.metrics.lock().expect("metrics lock poisoned").clone()
    }

    pub fn current_request(&self) -> StreamRequest {
        self.request_tx.borrow().clone()
    }

    pub fn subscribe(&self) -> StreamSubscription {
        let (tx, rx) = mpsc::unbounded_channel();
        let id = Uuid::new_v4();
        self.shared
            .subscribers
            .lock()
            .expect("subscriber lock poisoned")
            .push((id, tx));
        StreamSubscription { id, receiver: rx }
    }

    pub fn unsubscribe(&self, id: Uuid) {
        self.shared
            .subscribers
            .lock()
            .expect("subscriber lock poisoned")
            .retain(|(sub_id, _)| *sub_id != id);
    }

    /// Starts the connection task. Idempotent: a no-op while already
    /// connecting or connected; wakes a parked task when reconnect attempts
    /// were exhausted.
    pub fn connect(&self) {
        if self.shared.disposed.load(Ordering::SeqCst) {
            return;
        }
        if matches!(
            self.state(),
            ConnectionState::Connecting | ConnectionState::Connected
        ) {
            return;
        }

        let mut task = self.task.lock().expect("task lock poisoned");
        if let Some(handle) = task.as_ref() {
            if !handle.is_finished() {
                // Task is parked in fallback or mid-backoff; nudge it.
                self.retry.notify_one();
                return;
            }
        }

        info!("Starting vessel stream connection to {}", self.settings.url);
        *task = Some(tokio::spawn(run_connection(
            self.settings.clone(),
            Arc::clone(&self.shared),
            self.request_tx.subscribe(),
            Arc::clone(&self.retry),
        )));
    }

    /// Manual retry: restarts the connect cycle from `UsingFallback` or
    /// `Errored`, or starts it if it was never running.
    pub fn reconnect(&self) {
        self.connect();
        self.retry.notify_one();
    }

    /// Merges the patch into the live request. While connected the new
    /// request is re-sent in-band on the open socket; while disconnected it
    /// becomes the request of the next (re)connect, superseding anything
    /// that was in flight.
    pub fn update_config(&self, patch: StreamRequestPatch) {
        if self.shared.disposed.load(Ordering::SeqCst) {
            return;
        }
        self.request_tx.send_modify(|request| {
            if let Some(region) = patch.region {
                request.region = region;
            }
            if let Some(page) = patch.page {
                request.page = page;
            }
            if let Some(page_size) = patch.page_size {
                request.page_size = page_size;
            }
            if let Some(vessel_type) = patch.vessel_type {
                request.vessel_type = vessel_type;
            }
        });
    }

    /// Tears the client down: closes the transport, cancels the pending
    /// backoff timer (both die with the task), leaves the state at
    /// `Disconnected` and guarantees no subscriber sees another event.
    pub fn disconnect(&self) {
        self.shared.disposed.store(true, Ordering::SeqCst);
        if let Some(handle) = self.task.lock().expect("task lock poisoned").take() {
            handle.abort();
        }
        *self.shared.state.write().expect("state lock poisoned") = ConnectionState::Disconnected;
        info!("Vessel stream client disconnected");
    }
}

impl Drop for StreamClient {
    fn drop(&mut self) {
        self.shared.disposed.store(true, Ordering::SeqCst);
        if let Some(handle) = self.task.lock().expect("task lock poisoned").take() {
            handle.abort();
        }
    }
}

/// The single connection task: connect, drive, back off, repeat.
async fn run_connection(
    settings: StreamClientSettings,
    shared: Arc<Shared>,
    mut request_rx: watch::Receiver<StreamRequest>,
    retry: Arc<Notify>,
) {
    let url = match Url::parse(&settings.url) {
        Ok(url) => url,
        Err(e) => {
            warn!("Invalid stream URL {}: {}", settings.url, e);
            shared.publish(StreamEvent::Error(format!("invalid stream URL: {}", e)));
            shared.set_state(ConnectionState::Errored);
            return;
        }
    };

    let mut attempts: u32 = 0;
    loop {
        if shared.disposed.load(Ordering::SeqCst) {
            return;
        }
        shared.set_state(ConnectionState::Connecting);

        match timeout(settings.connect_timeout, connect_async(url.clone())).await {
            Ok(Ok((ws, response))) => {
                info!("Connected to vessel stream ({})", response.status());
                attempts = 0;
                // The Connected status change is published before the first
                // message is read, so it always precedes the first Data.
                shared.set_state(ConnectionState::Connected);
                // Mark the current request seen so the drive loop only
                // reacts to changes made after this subscribe.
                let _ = request_rx.borrow_and_update();
                drive_connection(&settings, &shared, &mut request_rx, ws).await;
                if shared.disposed.load(Ordering::SeqCst) {
                    return;
                }
                shared.set_state(ConnectionState::Disconnected);
            }
            Ok(Err(e)) => {
                warn!("Stream connect failed: {}", e);
            }
            Err(_) => {
                warn!(
                    "Stream connect timed out after {:?}",
                    settings.connect_timeout
                );
            }
        }

        attempts += 1;
        {
            let mut metrics = shared.metrics.lock().expect("metrics lock poisoned");
            metrics.reconnect_attempts = metrics.reconnect_attempts.saturating_add(1);
        }

        if attempts > settings.max_reconnect_attempts {
            warn!(
                "Reconnect attempts exhausted ({}), switching to fallback",
                settings.max_reconnect_attempts
            );
            shared.set_state(ConnectionState::UsingFallback);
            // Park until a manual retry or a config change restarts the
            // cycle. No timers are outstanding while parked.
            tokio::select! {
                _ = retry.notified() => {}
                result = request_rx.changed() => {
                    if result.is_err() {
                        return;
                    }
                }
            }
            attempts = 0;
            continue;
        }

        let exp = settings
            .reconnect_delay
            .saturating_mul(1u32.checked_shl(attempts - 1).unwrap_or(u32::MAX));
        let jitter = Duration::from_millis(rand::thread_rng().gen_range(0..250));
        let delay = exp.min(settings.max_reconnect_delay) + jitter;
        debug!(
            "Reconnecting in {:?} (attempt {}/{})",
            delay, attempts, settings.max_reconnect_attempts
        );
        tokio::select! {
            _ = sleep(delay) => {}
            _ = retry.notified() => {}
            result = request_rx.changed() => {
                if result.is_err() {
                    return;
                }
            }
        }
    }
}

/// Drives one open connection until it closes or errors.
async fn drive_connection(
    settings: &StreamClientSettings,
    shared: &Arc<Shared>,
    request_rx: &mut watch::Receiver<StreamRequest>,
    mut ws: WsStream,
) {
    let subscribe = request_rx.borrow().subscribe_message();
    if let Err(e) = ws.send(Message::Text(subscribe)).await {
        warn!("Failed to send subscribe request: {}", e);
        return;
    }

    let mut ping = interval(settings.ping_interval);
    ping.tick().await; // first tick fires immediately; consume it

    loop {
        tokio::select! {
            message = ws.next() => {
                match message {
                    Some(Ok(Message::Text(text))) => handle_text(shared, &text),
                    Some(Ok(Message::Ping(payload))) => {
                        let _ = ws.send(Message::Pong(payload)).await;
                    }
                    Some(Ok(Message::Pong(_))) => {}
                    Some(Ok(Message::Close(frame))) => {
                        warn!("Stream closed by server: {:?}", frame);
                        return;
                    }
                    Some(Ok(Message::Binary(data))) => {
                        debug!("Ignoring binary stream message ({} bytes)", data.len());
                    }
                    Some(Ok(Message::Frame(_))) => {}
                    Some(Err(e)) => {
                        warn!("Stream transport error: {}", e);
                        return;
                    }
                    None => {
                        warn!("Stream ended");
                        return;
                    }
                }
            }
            _ = ping.tick() => {
                if let Err(e) = ws.send(Message::Ping(Vec::new())).await {
                    warn!("Keepalive ping failed: {}", e);
                    return;
                }
            }
            result = request_rx.changed() => {
                if result.is_err() {
                    return;
                }
                // In-band re-request: no reconnect needed, the transport
                // supports reconfiguration on the open socket.
                let subscribe = request_rx.borrow_and_update().subscribe_message();
                debug!("Re-requesting stream with updated config");
                if let Err(e) = ws.send(Message::Text(subscribe)).await {
                    warn!("Failed to send updated request: {}", e);
                    return;
                }
            }
        }
    }
}

/// Parses one text frame and fans out whatever it carries. A malformed
/// payload is logged and dropped; it never tears the connection down.
fn handle_text(shared: &Arc<Shared>, text: &str) {
    {
        let mut metrics = shared.metrics.lock().expect("metrics lock poisoned");
        metrics.messages_received += 1;
        metrics.last_message_timestamp = Some(chrono::Utc::now().timestamp_millis() as u64);
    }

    match serde_json::from_str::<Envelope>(text) {
        Ok(Envelope::Heartbeat { .. }) => {
            let mut metrics = shared.metrics.lock().expect("metrics lock poisoned");
            metrics.heartbeats += 1;
        }
        Ok(Envelope::Connected { .. }) => {
            debug!("Stream confirmed connection");
        }
        Ok(Envelope::Error { data }) => {
            let message = data
                .and_then(|d| d.as_str().map(str::to_string).or_else(|| Some(d.to_string())))
                .unwrap_or_else(|| "upstream error".to_string());
            warn!("Stream error envelope: {}", message);
            shared.publish(StreamEvent::Error(message));
        }
        Ok(Envelope::Data { data }) => publish_positions(shared, data),
        Err(envelope_err) => {
            // Backward compatibility: a raw array payload is a direct
            // vessel-list update with no envelope.
            match serde_json::from_str::<Vec<VesselPosition>>(text) {
                Ok(positions) => publish_positions(shared, positions),
                Err(_) => {
                    warn!(
                        "Dropping malformed stream message ({}): {:.120}",
                        envelope_err, text
                    );
                    let mut metrics = shared.metrics.lock().expect("metrics lock poisoned");
                    metrics.malformed_messages += 1;
                }
            }
        }
    }
}

/// Range-checks positions before fan-out. A report with out-of-range
/// coordinates never reaches a subscriber.
fn publish_positions(shared: &Arc<Shared>, positions: Vec<VesselPosition>) {
    let before = positions.len();
    let valid: Vec<VesselPosition> = positions
        .into_iter()
        .filter(VesselPosition::has_valid_coordinates)
        .collect();

    let dropped = before - valid.len();
    {
        let mut metrics = shared.metrics.lock().expect("metrics lock poisoned");
        metrics.data_updates += 1;
        metrics.invalid_positions_dropped += dropped as u64;
    }
    if dropped > 0 {
        debug!("Dropped {} out-of-range positions from update", dropped);
    }

    shared.publish(StreamEvent::Data(valid));
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn test_settings() -> StreamClientSettings {
        StreamClientSettings {
            // Port 9 (discard) is unassigned on loopback; connects fail fast.
            url: "ws://127.0.0.1:9".to_string(),
            reconnect_delay: Duration::from_millis(1),
            max_reconnect_delay: Duration::from_millis(5),
            max_reconnect_attempts: 5,
            connect_timeout: Duration::from_millis(500),
            ping_interval: Duration::from_secs(30),
        }
    }

    fn shared() -> Arc<Shared> {
        Arc::new(Shared {
            state: RwLock::new(ConnectionState::Disconnected),
            subscribers: Mutex::new(Vec::new()),
            metrics: Mutex::new(StreamMetrics::default()),
            disposed: AtomicBool::new(false),
        })
    }

    #[test]
    fn subscribe_message_format() {
        let request = StreamRequest {
            region: Some("north-america".to_string()),
            page: 2,
            page_size: 25,
            vessel_type: None,
        };
        let msg = request.subscribe_message();
        let value: serde_json::Value = serde_json::from_str(&msg).unwrap();
        assert_eq!(value["type"], "subscribe");
        assert_eq!(value["region"], "north-america");
        assert_eq!(value["page"], 2);
        assert_eq!(value["pageSize"], 25);
    }

    #[test]
    fn envelope_data_parses() {
        let text = r#"{"type":"data","data":[{"id":1,"lat":25.0,"lng":-90.0}]}"#;
        let envelope: Envelope = serde_json::from_str(text).unwrap();
        assert!(matches!(envelope, Envelope::Data { data } if data.len() == 1));
    }

    #[test]
    fn heartbeat_is_consumed_not_forwarded() {
        let shared = shared();
        let (tx, mut rx) = mpsc::unbounded_channel();
        shared
            .subscribers
            .lock()
            .unwrap()
            .push((Uuid::new_v4(), tx));

        handle_text(&shared, r#"{"type":"heartbeat","timestamp":1700000000}"#);
        handle_text(&shared, r#"{"type":"connected"}"#);

        assert!(rx.try_recv().is_err());
        assert_eq!(shared.metrics.lock().unwrap().heartbeats, 1);
    }

    #[test]
    fn bare_array_is_treated_as_data_update() {
        let shared = shared();
        let (tx, mut rx) = mpsc::unbounded_channel();
        shared
            .subscribers
            .lock()
            .unwrap()
            .push((Uuid::new_v4(), tx));

        handle_text(&shared, r#"[{"id":4,"lat":30.0,"lng":-40.0}]"#);

        match rx.try_recv().unwrap() {
            StreamEvent::Data(positions) => {
                assert_eq!(positions.len(), 1);
                assert_eq!(positions[0].id, 4);
            }
            other => panic!("expected data event, got {:?}", other),
        }
    }

    #[test]
    fn malformed_message_is_dropped_silently() {
        let shared = shared();
        let (tx, mut rx) = mpsc::unbounded_channel();
        shared
            .subscribers
            .lock()
            .unwrap()
            .push((Uuid::new_v4(), tx));

        handle_text(&shared, "{not json at all");

        assert!(rx.try_recv().is_err());
        assert_eq!(shared.metrics.lock().unwrap().malformed_messages, 1);
    }

    #[test]
    fn out_of_range_positions_never_reach_subscribers() {
        let shared = shared();
        let (tx, mut rx) = mpsc::unbounded_channel();
        shared
            .subscribers
            .lock()
            .unwrap()
            .push((Uuid::new_v4(), tx));

        handle_text(
            &shared,
            r#"{"type":"data","data":[
                {"id":1,"lat":25.0,"lng":-90.0},
                {"id":2,"lat":95.0,"lng":-90.0},
                {"id":3,"lat":25.0,"lng":181.0}
            ]}"#,
        );

        match rx.try_recv().unwrap() {
            StreamEvent::Data(positions) => {
                assert_eq!(positions.len(), 1);
                assert_eq!(positions[0].id, 1);
            }
            other => panic!("expected data event, got {:?}", other),
        }
        assert_eq!(shared.metrics.lock().unwrap().invalid_positions_dropped, 2);
    }

    #[test]
    fn delivery_continues_past_dead_subscribers() {
        let shared = shared();
        let (tx_dead, rx_dead) = mpsc::unbounded_channel();
        let (tx_live, mut rx_live) = mpsc::unbounded_channel();
        drop(rx_dead);
        shared
            .subscribers
            .lock()
            .unwrap()
            .push((Uuid::new_v4(), tx_dead));
        shared
            .subscribers
            .lock()
            .unwrap()
            .push((Uuid::new_v4(), tx_live));

        shared.publish(StreamEvent::StatusChange(ConnectionState::Connected));

        assert_eq!(
            rx_live.try_recv().unwrap(),
            StreamEvent::StatusChange(ConnectionState::Connected)
        );
        // The dead subscriber was pruned.
        assert_eq!(shared.subscribers.lock().unwrap().len(), 1);
    }

    #[test]
    fn no_events_after_disposal() {
        let shared = shared();
        let (tx, mut rx) = mpsc::unbounded_channel();
        shared
            .subscribers
            .lock()
            .unwrap()
            .push((Uuid::new_v4(), tx));

        shared.disposed.store(true, Ordering::SeqCst);
        shared.publish(StreamEvent::StatusChange(ConnectionState::Connected));
        handle_text(&shared, r#"[{"id":4,"lat":30.0,"lng":-40.0}]"#);

        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn reconnect_storm_reaches_fallback_without_leaking_timers() {
        let client = StreamClient::new(test_settings(), StreamRequest::default());
        let mut sub = client.subscribe();
        client.connect();

        // Every connect is refused; after max_reconnect_attempts the client
        // must land in UsingFallback without panicking.
        let deadline = tokio::time::Instant::now() + Duration::from_secs(10);
        let mut reached_fallback = false;
        while tokio::time::Instant::now() < deadline {
            match timeout(Duration::from_secs(5), sub.receiver.recv()).await {
                Ok(Some(StreamEvent::StatusChange(ConnectionState::UsingFallback))) => {
                    reached_fallback = true;
                    break;
                }
                Ok(Some(_)) => continue,
                _ => break,
            }
        }
        assert!(reached_fallback, "never reached UsingFallback");
        assert_eq!(client.state(), ConnectionState::UsingFallback);
        assert!(client.metrics().reconnect_attempts >= 5);

        client.disconnect();
        assert_eq!(client.state(), ConnectionState::Disconnected);

        // Teardown: no further events are delivered.
        while let Ok(Some(event)) = timeout(Duration::from_millis(50), sub.receiver.recv()).await {
            assert!(
                !matches!(event, StreamEvent::StatusChange(ConnectionState::Connected)),
                "event after teardown"
            );
        }
    }

    #[tokio::test]
    async fn connect_is_idempotent() {
        let client = StreamClient::new(test_settings(), StreamRequest::default());
        client.connect();
        client.connect();
        client.connect();
        // One task only; no panic on repeated calls.
        assert!(client.task.lock().unwrap().is_some());
        client.disconnect();
    }

    #[test]
    fn update_config_merges_partially() {
        let client = StreamClient::new(test_settings(), StreamRequest::default());
        client.update_config(StreamRequestPatch {
            page: Some(3),
            ..Default::default()
        });
        client.update_config(StreamRequestPatch {
            region: Some(Some("europe".to_string())),
            ..Default::default()
        });

        let request = client.current_request();
        assert_eq!(request.page, 3);
        assert_eq!(request.region.as_deref(), Some("europe"));
        assert_eq!(request.page_size, 50);
    }

    #[test]
    fn unsubscribe_removes_by_token() {
        let client = StreamClient::new(test_settings(), StreamRequest::default());
        let sub_a = client.subscribe();
        let _sub_b = client.subscribe();
        assert_eq!(client.shared.subscribers.lock().unwrap().len(), 2);

        client.unsubscribe(sub_a.id);
        assert_eq!(client.shared.subscribers.lock().unwrap().len(), 1);
    }
}
