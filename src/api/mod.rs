// src/api/mod.rs
//! REST client for the dashboard API. This is the request/response side of
//! the pipeline: the initial port/refinery loads and the vessel fallback
//! path when the stream is down.

pub mod http_utils;

use log::{debug, info};
use reqwest::Client;
use std::time::Duration;

use crate::config::Config;
use crate::error::FeedError;
use crate::models::{Port, Refinery, VesselListResponse};
use http_utils::HttpRetryPolicy;

/// Query parameters for the vessel listing endpoint. Mirrors the live
/// stream's request config so fallback fetches return the same view.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VesselQuery {
    pub region: Option<String>,
    pub page: usize,
    pub page_size: usize,
    pub vessel_type: Option<String>,
}

pub struct ApiClient {
    http: Client,
    base_url: String,
    retry: HttpRetryPolicy,
}

impl ApiClient {
    pub fn new(config: &Config) -> Result<Self, FeedError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.rest_request_timeout_secs))
            .build()
            .map_err(|e| FeedError::Config(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            retry: HttpRetryPolicy::new(
                config.rest_max_retries,
                Duration::from_millis(config.rest_retry_delay_ms),
                config.api_fallback_urls.clone().unwrap_or_default(),
            ),
        })
    }

    /// `GET /api/vessels[?region=&page=&pageSize=&vesselType=]`
    pub async fn fetch_vessels(&self, query: &VesselQuery) -> Result<VesselListResponse, FeedError> {
        debug!("Fetching vessels over REST: {:?}", query);
        let response = self
            .retry
            .get_with_backoff(&self.base_url, |base| {
                let mut req = self
                    .http
                    .get(format!("{}/api/vessels", base))
                    .query(&[("page", query.page), ("pageSize", query.page_size)]);
                if let Some(region) = &query.region {
                    req = req.query(&[("region", region)]);
                }
                if let Some(vessel_type) = &query.vessel_type {
                    req = req.query(&[("vesselType", vessel_type)]);
                }
                req
            })
            .await
            .map_err(|e| FeedError::Http(e.to_string()))?;

        let listing: VesselListResponse = response.json().await?;
        info!(
            "REST vessel fetch returned {} of {} vessels",
            listing.vessels.len(),
            listing.total_count
        );
        Ok(listing)
    }

    /// `GET /api/ports[?region=]`
    pub async fn fetch_ports(&self, region: Option<&str>) -> Result<Vec<Port>, FeedError> {
        let response = self
            .retry
            .get_with_backoff(&self.base_url, |base| {
                let mut req = self.http.get(format!("{}/api/ports", base));
                if let Some(region) = region {
                    req = req.query(&[("region", region)]);
                }
                req
            })
            .await
            .map_err(|e| FeedError::Http(e.to_string()))?;

        let ports: Vec<Port> = response.json().await?;
        debug!("REST port fetch returned {} ports", ports.len());
        Ok(ports)
    }

    /// `GET /api/refineries[?region=]`
    pub async fn fetch_refineries(&self, region: Option<&str>) -> Result<Vec<Refinery>, FeedError> {
        let response = self
            .retry
            .get_with_backoff(&self.base_url, |base| {
                let mut req = self.http.get(format!("{}/api/refineries", base));
                if let Some(region) = region {
                    req = req.query(&[("region", region)]);
                }
                req
            })
            .await
            .map_err(|e| FeedError::Http(e.to_string()))?;

        let refineries: Vec<Refinery> = response.json().await?;
        debug!("REST refinery fetch returned {} refineries", refineries.len());
        Ok(refineries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_is_normalized() {
        let config = Config {
            api_base_url: "http://tracker.local/".to_string(),
            ..Default::default()
        };
        let client = ApiClient::new(&config).unwrap();
        assert_eq!(client.base_url, "http://tracker.local");
    }
}
