//! HTTP client for the vessel track service.
//!
//! This module provides track fetching with:
//! - Connection pooling and request timeouts
//! - Dispatch rate limiting (spaces out request starts)
//! - Parallel fetching of several vessels with bounded concurrency
//! - Automatic retry with exponential backoff on 429 and transport errors
//!
//! Retries live here only; the segmentation core never retries anything.

use log::{debug, info, warn};
use reqwest::Client;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

use crate::error::{Result, TrackError};
use crate::parse::parse_track_xml_bytes;
use crate::sample_set::SampleSet;

/// Track endpoint; the MMSI is appended.
pub const DEFAULT_TRACK_URL: &str = "http://www.marinetraffic.com/ais/gettrackxml.aspx?mmsi=";

const DISPATCH_INTERVAL_MS: u64 = 250;
const MAX_CONCURRENCY: usize = 4;
const MAX_RETRIES: u32 = 3;

/// Result of fetching one vessel's track in a batch
#[derive(Debug, Clone)]
pub struct VesselTrackResult {
    pub mmsi: u32,
    pub samples: Option<SampleSet>,
    pub success: bool,
    pub error: Option<String>,
}

impl VesselTrackResult {
    fn from_result(mmsi: u32, result: Result<SampleSet>) -> Self {
        match result {
            Ok(samples) => Self {
                mmsi,
                samples: Some(samples),
                success: true,
                error: None,
            },
            Err(e) => Self {
                mmsi,
                samples: None,
                success: false,
                error: Some(e.to_string()),
            },
        }
    }
}

/// Progress callback type: (completed, total)
pub type ProgressCallback = Arc<dyn Fn(u32, u32) + Send + Sync>;

/// Dispatch rate limiter - spaces out when requests START
struct DispatchRateLimiter {
    interval: Duration,
    next_dispatch: Mutex<Instant>,
    dispatched_count: AtomicU32,
    consecutive_429s: AtomicU32,
}

impl DispatchRateLimiter {
    fn new(interval: Duration) -> Self {
        Self {
            interval,
            next_dispatch: Mutex::new(Instant::now()),
            dispatched_count: AtomicU32::new(0),
            consecutive_429s: AtomicU32::new(0),
        }
    }

    /// Wait for our dispatch slot. Each caller gets a unique slot
    /// spaced `interval` apart.
    async fn wait_for_dispatch_slot(&self) -> u32 {
        let (wait_duration, dispatch_num) = {
            let mut next = self.next_dispatch.lock().await;
            let now = Instant::now();

            let dispatch_at = if *next > now { *next } else { now };

            // Reserve the next slot for the next caller
            *next = dispatch_at + self.interval;

            let num = self.dispatched_count.fetch_add(1, Ordering::Relaxed) + 1;

            let wait = if dispatch_at > now {
                dispatch_at - now
            } else {
                Duration::ZERO
            };

            (wait, num)
        };

        // Wait outside the lock
        if wait_duration > Duration::from_millis(5) {
            debug!("[Dispatch #{}] Waiting {:?} for slot", dispatch_num, wait_duration);
            tokio::time::sleep(wait_duration).await;
        }

        dispatch_num
    }

    fn record_success(&self) {
        self.consecutive_429s.store(0, Ordering::Relaxed);
    }

    fn record_429(&self) -> Duration {
        let count = self.consecutive_429s.fetch_add(1, Ordering::Relaxed) + 1;
        // Exponential backoff: 1s, 2s, 4s, 8s max
        let backoff = Duration::from_millis(500 * (1 << count.min(4)));
        warn!("[DispatchRateLimiter] Got 429! Consecutive: {}, backing off {:?}", count, backoff);
        backoff
    }
}

/// Fetches vessel position tracks by MMSI
pub struct TrackFetcher {
    client: Client,
    base_url: String,
    rate_limiter: Arc<DispatchRateLimiter>,
}

impl TrackFetcher {
    /// Create a fetcher for the default track endpoint
    pub fn new() -> Result<Self> {
        Self::with_base_url(DEFAULT_TRACK_URL)
    }

    /// Create a fetcher for another endpoint. The MMSI is appended to `base_url`.
    pub fn with_base_url(base_url: &str) -> Result<Self> {
        let client = Client::builder()
            .pool_max_idle_per_host(MAX_CONCURRENCY * 2)
            .pool_idle_timeout(Duration::from_secs(60))
            .tcp_keepalive(Duration::from_secs(30))
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| TrackError::Transport {
                message: format!("Failed to create HTTP client: {}", e),
                status_code: None,
            })?;

        Ok(Self {
            client,
            base_url: base_url.to_string(),
            rate_limiter: Arc::new(DispatchRateLimiter::new(Duration::from_millis(
                DISPATCH_INTERVAL_MS,
            ))),
        })
    }

    fn track_url(&self, mmsi: u32) -> String {
        format!("{}{}", self.base_url, mmsi)
    }

    /// Download and parse one vessel's track
    pub async fn fetch_track(&self, mmsi: u32) -> Result<SampleSet> {
        let body = self.fetch_track_body(mmsi).await?;
        let samples = parse_track_xml_bytes(&body)?;
        info!("[TrackFetcher] MMSI {}: {} positions", mmsi, samples.len());
        Ok(samples)
    }

    /// Download one vessel's raw track XML
    pub async fn fetch_track_xml(&self, mmsi: u32) -> Result<String> {
        let body = self.fetch_track_body(mmsi).await?;
        String::from_utf8(body).map_err(|e| TrackError::SourceData {
            message: format!("track body is not UTF-8: {}", e),
        })
    }

    /// Fetch several vessels' tracks in parallel, one result per MMSI
    pub async fn fetch_tracks(
        &self,
        mmsis: Vec<u32>,
        on_progress: Option<ProgressCallback>,
    ) -> Vec<VesselTrackResult> {
        use futures::stream::{self, StreamExt};

        let total = mmsis.len() as u32;
        let completed = Arc::new(AtomicU32::new(0));

        info!(
            "[TrackFetcher] Starting fetch of {} tracks (dispatch interval: {}ms, max concurrent: {})",
            total, DISPATCH_INTERVAL_MS, MAX_CONCURRENCY
        );

        let start = Instant::now();

        let results: Vec<VesselTrackResult> = stream::iter(mmsis)
            .map(|mmsi| {
                let rate_limiter = &self.rate_limiter;
                let completed = Arc::clone(&completed);
                let callback = on_progress.clone();

                async move {
                    let dispatch_num = rate_limiter.wait_for_dispatch_slot().await;
                    debug!("[TrackFetcher] MMSI {} dispatched as #{}", mmsi, dispatch_num);

                    let result = VesselTrackResult::from_result(mmsi, self.fetch_track(mmsi).await);

                    let done = completed.fetch_add(1, Ordering::Relaxed) + 1;
                    if let Some(ref cb) = callback {
                        cb(done, total);
                    }

                    result
                }
            })
            .buffer_unordered(MAX_CONCURRENCY)
            .collect()
            .await;

        let success_count = results.iter().filter(|r| r.success).count();
        info!(
            "[TrackFetcher] DONE: {}/{} success in {:.2}s",
            success_count,
            total,
            start.elapsed().as_secs_f64()
        );

        results
    }

    async fn fetch_track_body(&self, mmsi: u32) -> Result<Vec<u8>> {
        let url = self.track_url(mmsi);
        let mut retries = 0;
        let req_start = Instant::now();

        loop {
            let response = self.client.get(&url).send().await;

            match response {
                Ok(resp) => {
                    let status = resp.status();

                    if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                        retries += 1;
                        if retries > MAX_RETRIES {
                            return Err(TrackError::Transport {
                                message: "Max retries exceeded (429)".to_string(),
                                status_code: Some(status.as_u16()),
                            });
                        }

                        let wait = self.rate_limiter.record_429();
                        warn!(
                            "[Fetch {}] 429 Too Many Requests, retry {} with {:?} backoff",
                            mmsi, retries, wait
                        );
                        tokio::time::sleep(wait).await;
                        continue;
                    }

                    self.rate_limiter.record_success();

                    if !status.is_success() {
                        return Err(TrackError::Transport {
                            message: status
                                .canonical_reason()
                                .unwrap_or("unexpected status")
                                .to_string(),
                            status_code: Some(status.as_u16()),
                        });
                    }

                    let bytes = resp.bytes().await.map_err(|e| TrackError::Transport {
                        message: format!("Body download error: {}", e),
                        status_code: None,
                    })?;

                    debug!(
                        "[Fetch {}] {:.1}KB in {:?}",
                        mmsi,
                        bytes.len() as f64 / 1024.0,
                        req_start.elapsed()
                    );

                    return Ok(bytes.to_vec());
                }
                Err(e) => {
                    retries += 1;
                    if retries > MAX_RETRIES {
                        return Err(TrackError::Transport {
                            message: format!("Request error: {}", e),
                            status_code: e.status().map(|s| s.as_u16()),
                        });
                    }

                    let wait = Duration::from_millis(200 * (1 << retries));
                    warn!("[Fetch {}] Error: {}, retry {} after {:?}", mmsi, e, retries, wait);
                    tokio::time::sleep(wait).await;
                }
            }
        }
    }
}

/// Synchronous wrapper for FFI - runs the async fetch on its own tokio runtime
#[cfg(feature = "ffi")]
pub fn fetch_track_sync(mmsi: u32) -> Result<SampleSet> {
    use tokio::runtime::Builder;

    info!("[FFI] fetch_track_sync called for MMSI {}", mmsi);

    let rt = Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| TrackError::Transport {
            message: format!("Runtime error: {}", e),
            status_code: None,
        })?;

    let fetcher = TrackFetcher::new()?;
    rt.block_on(fetcher.fetch_track(mmsi))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_dispatch_rate_limiter() {
        let limiter = DispatchRateLimiter::new(Duration::from_millis(50));

        // First request should not wait
        let start = Instant::now();
        let num = limiter.wait_for_dispatch_slot().await;
        assert_eq!(num, 1);
        assert!(start.elapsed() < Duration::from_millis(10));

        // Second request should wait ~50ms
        let start2 = Instant::now();
        let num2 = limiter.wait_for_dispatch_slot().await;
        assert_eq!(num2, 2);
        let elapsed = start2.elapsed();
        assert!(elapsed >= Duration::from_millis(40), "Expected ~50ms wait, got {:?}", elapsed);
    }

    #[test]
    fn test_backoff_grows_and_resets() {
        let limiter = DispatchRateLimiter::new(Duration::from_millis(50));
        let first = limiter.record_429();
        let second = limiter.record_429();
        assert!(second > first);

        limiter.record_success();
        assert_eq!(limiter.record_429(), first);
    }

    #[test]
    fn test_track_url() {
        let fetcher = TrackFetcher::with_base_url("http://localhost:8888/track?mmsi=").unwrap();
        assert_eq!(fetcher.track_url(244660000), "http://localhost:8888/track?mmsi=244660000");
    }

    #[tokio::test]
    async fn test_unreachable_host_is_transport_error() {
        // Port 9 (discard) on localhost is closed in test environments
        let fetcher = TrackFetcher::with_base_url("http://127.0.0.1:9/track?mmsi=").unwrap();
        match fetcher.fetch_track(244660000).await {
            Err(TrackError::Transport { .. }) => {}
            other => panic!("expected transport error, got {:?}", other),
        }
    }

    #[test]
    fn test_result_record() {
        let ok = VesselTrackResult::from_result(1, Ok(SampleSet::default()));
        assert!(ok.success && ok.error.is_none());

        let err = VesselTrackResult::from_result(
            2,
            Err(TrackError::Transport {
                message: "timeout".to_string(),
                status_code: None,
            }),
        );
        assert!(!err.success);
        assert!(err.samples.is_none());
        assert_eq!(err.error.as_deref(), Some("HTTP error: timeout"));
    }
}
