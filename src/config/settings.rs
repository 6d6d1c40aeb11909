use std::env;

#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL of the dashboard REST API, e.g. "https://tracker.example.com".
    pub api_base_url: String,
    /// Fallback base URLs tried in order when the primary is unreachable.
    pub api_fallback_urls: Option<Vec<String>>,
    /// WebSocket endpoint for the live vessel stream.
    pub ws_url: String,

    /// Region bucket the feed is scoped to, e.g. "north-america".
    pub region: Option<String>,
    /// Optional vessel-type filter forwarded to the upstream API.
    pub vessel_type: Option<String>,
    pub page_size: usize,

    // Cache TTLs. Vessels move continuously so their TTL is short; port and
    // refinery metadata is near-static.
    pub vessel_cache_ttl_secs: u64,
    pub connection_cache_ttl_secs: u64,
    pub port_cache_ttl_secs: u64,
    pub refinery_cache_ttl_secs: u64,

    // Stream reconnect policy.
    pub ws_reconnect_delay_ms: u64,
    pub ws_max_reconnect_delay_ms: u64,
    pub ws_max_reconnect_attempts: u32,
    pub ws_connect_timeout_secs: u64,
    pub ws_ping_interval_ms: u64,

    // REST fallback policy.
    pub rest_poll_interval_secs: u64,
    pub rest_max_retries: usize,
    pub rest_retry_delay_ms: u64,
    pub rest_request_timeout_secs: u64,
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

impl Config {
    pub fn from_env() -> Self {
        Config {
            api_base_url: env::var("API_BASE_URL")
                .unwrap_or_else(|_| "http://127.0.0.1:5000".to_string()),
            api_fallback_urls: env::var("API_FALLBACK_URLS")
                .ok()
                .map(|s| s.split(',').map(|u| u.trim().to_string()).collect()),
            ws_url: env::var("WS_URL")
                .unwrap_or_else(|_| "ws://127.0.0.1:5000/ws/vessels".to_string()),
            region: env::var("REGION").ok().filter(|r| !r.is_empty()),
            vessel_type: env::var("VESSEL_TYPE").ok().filter(|t| !t.is_empty()),
            page_size: env_parse("PAGE_SIZE", 50),
            vessel_cache_ttl_secs: env_parse("VESSEL_CACHE_TTL_SECS", 120),
            connection_cache_ttl_secs: env_parse("CONNECTION_CACHE_TTL_SECS", 600),
            port_cache_ttl_secs: env_parse("PORT_CACHE_TTL_SECS", 3600),
            refinery_cache_ttl_secs: env_parse("REFINERY_CACHE_TTL_SECS", 3600),
            ws_reconnect_delay_ms: env_parse("WS_RECONNECT_DELAY_MS", 1000),
            ws_max_reconnect_delay_ms: env_parse("WS_MAX_RECONNECT_DELAY_MS", 30_000),
            ws_max_reconnect_attempts: env_parse("WS_MAX_RECONNECT_ATTEMPTS", 5),
            ws_connect_timeout_secs: env_parse("WS_CONNECT_TIMEOUT_SECS", 10),
            ws_ping_interval_ms: env_parse("WS_PING_INTERVAL_MS", 30_000),
            rest_poll_interval_secs: env_parse("REST_POLL_INTERVAL_SECS", 30),
            rest_max_retries: env_parse("REST_MAX_RETRIES", 3),
            rest_retry_delay_ms: env_parse("REST_RETRY_DELAY_MS", 500),
            rest_request_timeout_secs: env_parse("REST_REQUEST_TIMEOUT_SECS", 15),
        }
    }

    pub fn validate_and_log(&self) {
        log::info!("Feed configuration loaded: {:?}", self);
        if self.api_base_url.is_empty() {
            log::error!("API_BASE_URL cannot be empty.");
        }
        if self.ws_url.is_empty() {
            log::error!("WS_URL cannot be empty.");
        }
        if self.page_size == 0 {
            log::warn!("PAGE_SIZE of 0 is invalid; pagination will clamp to 1.");
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        // Defaults mirror from_env() with no environment set.
        Config {
            api_base_url: "http://127.0.0.1:5000".to_string(),
            api_fallback_urls: None,
            ws_url: "ws://127.0.0.1:5000/ws/vessels".to_string(),
            region: None,
            vessel_type: None,
            page_size: 50,
            vessel_cache_ttl_secs: 120,
            connection_cache_ttl_secs: 600,
            port_cache_ttl_secs: 3600,
            refinery_cache_ttl_secs: 3600,
            ws_reconnect_delay_ms: 1000,
            ws_max_reconnect_delay_ms: 30_000,
            ws_max_reconnect_attempts: 5,
            ws_connect_timeout_secs: 10,
            ws_ping_interval_ms: 30_000,
            rest_poll_interval_secs: 30,
            rest_max_retries: 3,
            rest_retry_delay_ms: 500,
            rest_request_timeout_secs: 15,
        }
    }
}
