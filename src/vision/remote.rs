//! Network camera frame source
//!
//! Fetches a still from `http://{host}/capture?t={nonce}` on demand. Only one
//! request may be outstanding; a poll that arrives while one is in flight
//! returns `None` without touching the network. Failures are absorbed and
//! the next poll simply tries again.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use reqwest::{Client, StatusCode};
use tracing::debug;

use crate::vision::frame::Frame;
use crate::vision::source::FrameSource;

/// Why a fetch produced no frame
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("A capture request is already in flight")]
    Busy,
    #[error("Capture request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("Camera returned status {0}")]
    Status(StatusCode),
    #[error("Capture timed out after {0:?}")]
    Timeout(Duration),
}

/// Holds the in-flight flag for the lifetime of one request
struct FlightGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> FlightGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self { flag })
    }
}

impl Drop for FlightGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

/// Single-flight still-image fetcher for a network camera
pub struct RemoteFrameSource {
    client: Client,
    host: String,
    timeout: Duration,
    in_flight: AtomicBool,
    sequence: AtomicU64,
}

impl RemoteFrameSource {
    pub fn new(host: impl Into<String>, timeout: Duration) -> Self {
        // Cameras live on the local network; never route them through a proxy
        let client = Client::builder().no_proxy().build().unwrap_or_default();

        Self {
            client,
            host: host.into(),
            timeout,
            in_flight: AtomicBool::new(false),
            sequence: AtomicU64::new(0),
        }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    /// Whether a request is currently outstanding
    pub fn is_fetching(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    pub fn capture_url(&self, nonce: &str) -> String {
        format!("http://{}/capture?t={}", self.host, nonce)
    }

    /// Cache-busting token, unique per request
    fn next_nonce(&self) -> String {
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or(0);
        let seq = self.sequence.fetch_add(1, Ordering::Relaxed);
        format!("{}-{}", millis, seq)
    }

    /// Fetch one frame, bounded by the configured timeout
    pub async fn fetch(&self) -> Result<Frame, FetchError> {
        let _guard = FlightGuard::acquire(&self.in_flight).ok_or(FetchError::Busy)?;
        let url = self.capture_url(&self.next_nonce());

        tokio::time::timeout(self.timeout, self.request(&url))
            .await
            .map_err(|_| FetchError::Timeout(self.timeout))?
    }

    async fn request(&self, url: &str) -> Result<Frame, FetchError> {
        let response = self.client.get(url).send().await?;

        if !response.status().is_success() {
            return Err(FetchError::Status(response.status()));
        }

        let body = response.bytes().await?;
        Ok(Frame::encoded(body.to_vec()))
    }
}

impl FrameSource for RemoteFrameSource {
    async fn poll(&self) -> Option<Frame> {
        match self.fetch().await {
            Ok(frame) => Some(frame),
            Err(FetchError::Busy) => None,
            Err(e) => {
                debug!("No frame from {}: {}", self.host, e);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Arc;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    const JPEG: &[u8] = &[0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10];

    /// Minimal camera stand-in that answers every request after `delay`
    struct FakeCamera {
        addr: String,
        requests: Arc<AtomicUsize>,
        concurrent_max: Arc<AtomicUsize>,
        paths: Arc<parking_lot::Mutex<Vec<String>>>,
    }

    async fn fake_camera(status: &'static str, delay: Duration) -> FakeCamera {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        let requests = Arc::new(AtomicUsize::new(0));
        let active = Arc::new(AtomicUsize::new(0));
        let concurrent_max = Arc::new(AtomicUsize::new(0));
        let paths = Arc::new(parking_lot::Mutex::new(Vec::new()));

        let (req, act, max, seen) = (
            requests.clone(),
            active.clone(),
            concurrent_max.clone(),
            paths.clone(),
        );
        tokio::spawn(async move {
            loop {
                let Ok((mut socket, _)) = listener.accept().await else {
                    return;
                };
                let (req, act, max, seen) = (req.clone(), act.clone(), max.clone(), seen.clone());
                tokio::spawn(async move {
                    let mut buf = Vec::new();
                    let mut chunk = [0u8; 1024];
                    while !buf.windows(4).any(|w| w == b"\r\n\r\n") {
                        match socket.read(&mut chunk).await {
                            Ok(0) | Err(_) => return,
                            Ok(n) => buf.extend_from_slice(&chunk[..n]),
                        }
                    }
                    req.fetch_add(1, Ordering::SeqCst);
                    let now = act.fetch_add(1, Ordering::SeqCst) + 1;
                    max.fetch_max(now, Ordering::SeqCst);

                    let head = String::from_utf8_lossy(&buf).to_string();
                    if let Some(path) = head.split_whitespace().nth(1) {
                        seen.lock().push(path.to_string());
                    }

                    tokio::time::sleep(delay).await;
                    let response = format!(
                        "HTTP/1.1 {}\r\nContent-Type: image/jpeg\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                        status,
                        JPEG.len()
                    );
                    let _ = socket.write_all(response.as_bytes()).await;
                    let _ = socket.write_all(JPEG).await;
                    act.fetch_sub(1, Ordering::SeqCst);
                });
            }
        });

        FakeCamera {
            addr,
            requests,
            concurrent_max,
            paths,
        }
    }

    #[test]
    fn test_capture_url() {
        let source = RemoteFrameSource::new("192.168.4.1", Duration::from_secs(1));
        assert_eq!(source.host(), "192.168.4.1");
        assert_eq!(
            source.capture_url("123-0"),
            "http://192.168.4.1/capture?t=123-0"
        );
    }

    #[test]
    fn test_nonce_unique() {
        let source = RemoteFrameSource::new("cam", Duration::from_secs(1));
        let a = source.next_nonce();
        let b = source.next_nonce();
        assert_ne!(a, b);
    }

    #[test]
    fn test_flight_guard_releases_on_drop() {
        let flag = AtomicBool::new(false);
        {
            let _guard = FlightGuard::acquire(&flag).unwrap();
            assert!(FlightGuard::acquire(&flag).is_none());
        }
        assert!(FlightGuard::acquire(&flag).is_some());
    }

    #[tokio::test]
    async fn test_poll_returns_frame() {
        let camera = fake_camera("200 OK", Duration::ZERO).await;
        let source = RemoteFrameSource::new(camera.addr.clone(), Duration::from_secs(5));

        let frame = source.poll().await.expect("frame");
        assert_eq!(&frame.data[..], JPEG);
        assert!(!source.is_fetching());

        let paths = camera.paths.lock().clone();
        assert_eq!(paths.len(), 1);
        assert!(paths[0].starts_with("/capture?t="));
    }

    #[tokio::test]
    async fn test_single_flight() {
        let camera = fake_camera("200 OK", Duration::from_millis(200)).await;
        let source = RemoteFrameSource::new(camera.addr.clone(), Duration::from_secs(5));

        let (first, second) = tokio::join!(source.poll(), source.poll());
        assert!(first.is_some());
        assert!(second.is_none());
        assert_eq!(camera.requests.load(Ordering::SeqCst), 1);
        assert_eq!(camera.concurrent_max.load(Ordering::SeqCst), 1);

        // Flag released: the next poll goes out again
        assert!(source.poll().await.is_some());
        assert_eq!(camera.requests.load(Ordering::SeqCst), 2);

        let paths = camera.paths.lock().clone();
        assert_ne!(paths[0], paths[1]);
    }

    #[tokio::test]
    async fn test_error_status_is_no_frame() {
        let camera = fake_camera("500 Internal Server Error", Duration::ZERO).await;
        let source = RemoteFrameSource::new(camera.addr.clone(), Duration::from_secs(5));

        assert!(matches!(
            source.fetch().await,
            Err(FetchError::Status(StatusCode::INTERNAL_SERVER_ERROR))
        ));
        assert!(source.poll().await.is_none());
        assert!(!source.is_fetching());
    }

    #[tokio::test]
    async fn test_unreachable_camera_retries_every_poll() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        drop(listener);

        let source = RemoteFrameSource::new(addr, Duration::from_secs(5));
        for _ in 0..3 {
            assert!(source.poll().await.is_none());
            assert!(!source.is_fetching());
        }
    }

    #[tokio::test]
    async fn test_timeout_releases_flag() {
        let camera = fake_camera("200 OK", Duration::from_secs(2)).await;
        let source = RemoteFrameSource::new(camera.addr.clone(), Duration::from_millis(50));

        assert!(matches!(source.fetch().await, Err(FetchError::Timeout(_))));
        assert!(!source.is_fetching());
    }
}
