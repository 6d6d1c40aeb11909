//! Async HTTP plumbing for the dashboard API: request spacing, bounded
//! retry with exponential backoff, and fallback base URLs.

use anyhow::{anyhow, Result};
use log::warn;
use reqwest::{RequestBuilder, Response};
use std::time::Duration;
use tokio::sync::{Mutex, Semaphore};
use tokio::time::sleep;

/// Retry/backoff policy shared by all REST calls of one client.
pub struct HttpRetryPolicy {
    max_retries: usize,
    base_backoff: Duration,
    min_spacing: Duration,
    fallback_bases: Vec<String>,
    inflight: Semaphore,
    last_request: Mutex<std::time::Instant>,
}

impl HttpRetryPolicy {
    pub fn new(
        max_retries: usize,
        base_backoff: Duration,
        fallback_bases: Vec<String>,
    ) -> Self {
        Self {
            max_retries,
            base_backoff,
            min_spacing: Duration::from_millis(50),
            fallback_bases,
            inflight: Semaphore::new(4),
            last_request: Mutex::new(std::time::Instant::now()),
        }
    }

    /// Issues a GET built by `build_req` against the primary base URL, then
    /// each fallback base in order. Each base gets `max_retries + 1`
    /// attempts with exponential backoff between them. The first 2xx
    /// response wins.
    pub async fn get_with_backoff(
        &self,
        primary_base: &str,
        build_req: impl Fn(&str) -> RequestBuilder,
    ) -> Result<Response> {
        let bases = std::iter::once(primary_base).chain(self.fallback_bases.iter().map(String::as_str));

        for base in bases {
            for attempt in 0..=self.max_retries {
                if attempt > 0 {
                    // 1x, 2x, 4x... the base backoff, saturating on overflow.
                    let factor = 1u32.checked_shl(attempt as u32 - 1).unwrap_or(u32::MAX);
                    sleep(self.base_backoff.saturating_mul(factor)).await;
                }

                let _permit = self.inflight.acquire().await?;
                self.pace().await;

                match build_req(base).send().await {
                    Ok(resp) if resp.status().is_success() => return Ok(resp),
                    Ok(resp) => {
                        warn!(
                            "HTTP {} from {} (attempt {}/{})",
                            resp.status(),
                            base,
                            attempt + 1,
                            self.max_retries + 1
                        );
                    }
                    Err(e) => {
                        warn!(
                            "Request to {} failed (attempt {}/{}): {}",
                            base,
                            attempt + 1,
                            self.max_retries + 1,
                            e
                        );
                    }
                }
            }
            if !self.fallback_bases.is_empty() {
                warn!("Exhausted retries for {}, trying next fallback base", base);
            }
        }

        Err(anyhow!(
            "all API endpoints failed: {} (+{} fallbacks)",
            primary_base,
            self.fallback_bases.len()
        ))
    }

    /// Keeps a minimum spacing between outgoing requests so a retry storm
    /// cannot hammer the upstream.
    async fn pace(&self) {
        let mut last = self.last_request.lock().await;
        let elapsed = last.elapsed();
        if elapsed < self.min_spacing {
            sleep(self.min_spacing - elapsed).await;
        }
        *last = std::time::Instant::now();
    }
}
