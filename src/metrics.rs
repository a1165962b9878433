//! Control loop statistics
//!
//! Counters are updated by the session every iteration and can be exposed
//! in Prometheus format on an optional listener.
//! Endpoint when enabled: http://localhost:{METRICS_PORT}/metrics

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::RwLock;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tracing::{debug, info};

/// Samples kept for iteration time percentiles
const HISTORY_LEN: usize = 600;

/// Metrics registry for the control loop
#[derive(Debug)]
pub struct Metrics {
    // Loop
    pub iterations: AtomicU64,
    pub iteration_time_us: AtomicU64,
    pub iteration_time_p95_us: AtomicU64,
    pub iteration_time_p99_us: AtomicU64,
    pub iteration_time_max_us: AtomicU64,

    // Frame acquisition
    pub frames_received: AtomicU64,
    pub frames_missed: AtomicU64,

    // Tracking
    pub faces_detected: AtomicU64,
    pub faces_missing: AtomicU64,
    pub inference_failures: AtomicU64,
    pub lane_changes: AtomicU64,

    // Simulation
    pub sim_ticks: AtomicU64,
    pub games_started: AtomicU64,
    pub crashes: AtomicU64,
    pub obstacles_spawned: AtomicU64,
    pub score: AtomicU64,

    start_time: Instant,

    // Rolling iteration times for percentile calculation
    iteration_history: RwLock<VecDeque<u64>>,
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            iterations: AtomicU64::new(0),
            iteration_time_us: AtomicU64::new(0),
            iteration_time_p95_us: AtomicU64::new(0),
            iteration_time_p99_us: AtomicU64::new(0),
            iteration_time_max_us: AtomicU64::new(0),
            frames_received: AtomicU64::new(0),
            frames_missed: AtomicU64::new(0),
            faces_detected: AtomicU64::new(0),
            faces_missing: AtomicU64::new(0),
            inference_failures: AtomicU64::new(0),
            lane_changes: AtomicU64::new(0),
            sim_ticks: AtomicU64::new(0),
            games_started: AtomicU64::new(0),
            crashes: AtomicU64::new(0),
            obstacles_spawned: AtomicU64::new(0),
            score: AtomicU64::new(0),
            start_time: Instant::now(),
            iteration_history: RwLock::new(VecDeque::with_capacity(HISTORY_LEN)),
        }
    }

    /// Record one loop iteration's duration and update percentiles
    pub fn record_iteration(&self, duration: Duration) {
        let us = duration.as_micros() as u64;
        self.iteration_time_us.store(us, Ordering::Relaxed);
        self.iterations.fetch_add(1, Ordering::Relaxed);

        let mut history = self.iteration_history.write();
        history.push_back(us);
        while history.len() > HISTORY_LEN {
            history.pop_front();
        }

        if history.len() >= 10 {
            let mut sorted: Vec<u64> = history.iter().copied().collect();
            sorted.sort_unstable();

            let p95_idx = (sorted.len() as f32 * 0.95) as usize;
            let p99_idx = (sorted.len() as f32 * 0.99) as usize;

            self.iteration_time_p95_us.store(sorted[p95_idx.min(sorted.len() - 1)], Ordering::Relaxed);
            self.iteration_time_p99_us.store(sorted[p99_idx.min(sorted.len() - 1)], Ordering::Relaxed);
            self.iteration_time_max_us.store(sorted.last().copied().unwrap_or(0), Ordering::Relaxed);
        }
    }

    #[inline]
    pub fn incr(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    /// Share of polls that produced a frame, in percent
    pub fn frame_hit_rate(&self) -> f64 {
        let hit = self.frames_received.load(Ordering::Relaxed);
        let miss = self.frames_missed.load(Ordering::Relaxed);
        if hit + miss == 0 {
            return 0.0;
        }
        hit as f64 * 100.0 / (hit + miss) as f64
    }

    /// One-line summary for the periodic log
    pub fn summary(&self) -> String {
        format!(
            "{} iterations, frames {:.1}% ({} missed), faces {}/{}, {} inference errors, {} ticks, {} crashes | p95 {}us",
            self.iterations.load(Ordering::Relaxed),
            self.frame_hit_rate(),
            self.frames_missed.load(Ordering::Relaxed),
            self.faces_detected.load(Ordering::Relaxed),
            self.faces_detected.load(Ordering::Relaxed) + self.faces_missing.load(Ordering::Relaxed),
            self.inference_failures.load(Ordering::Relaxed),
            self.sim_ticks.load(Ordering::Relaxed),
            self.crashes.load(Ordering::Relaxed),
            self.iteration_time_p95_us.load(Ordering::Relaxed),
        )
    }

    /// Generate Prometheus-format metrics output
    pub fn to_prometheus(&self) -> String {
        let mut output = String::with_capacity(2048);

        macro_rules! metric {
            ($name:expr, $help:expr, $type:expr, $value:expr) => {
                output.push_str(&format!(
                    "# HELP {} {}\n# TYPE {} {}\n{} {}\n",
                    $name, $help, $name, $type, $name, $value
                ));
            };
        }

        metric!("tilt_racer_iterations_total", "Control loop iterations", "counter",
            self.iterations.load(Ordering::Relaxed));
        metric!("tilt_racer_iteration_time_microseconds", "Last iteration time", "gauge",
            self.iteration_time_us.load(Ordering::Relaxed));
        metric!("tilt_racer_iteration_time_p95_microseconds", "95th percentile iteration time", "gauge",
            self.iteration_time_p95_us.load(Ordering::Relaxed));
        metric!("tilt_racer_iteration_time_p99_microseconds", "99th percentile iteration time", "gauge",
            self.iteration_time_p99_us.load(Ordering::Relaxed));
        metric!("tilt_racer_iteration_time_max_microseconds", "Maximum iteration time", "gauge",
            self.iteration_time_max_us.load(Ordering::Relaxed));

        metric!("tilt_racer_frames_received_total", "Polls that produced a frame", "counter",
            self.frames_received.load(Ordering::Relaxed));
        metric!("tilt_racer_frames_missed_total", "Polls without a frame", "counter",
            self.frames_missed.load(Ordering::Relaxed));

        metric!("tilt_racer_faces_detected_total", "Frames with a face", "counter",
            self.faces_detected.load(Ordering::Relaxed));
        metric!("tilt_racer_faces_missing_total", "Frames without a face", "counter",
            self.faces_missing.load(Ordering::Relaxed));
        metric!("tilt_racer_inference_failures_total", "Failed or timed out inference calls", "counter",
            self.inference_failures.load(Ordering::Relaxed));
        metric!("tilt_racer_lane_changes_total", "Player lane changes", "counter",
            self.lane_changes.load(Ordering::Relaxed));

        metric!("tilt_racer_sim_ticks_total", "Simulation ticks", "counter",
            self.sim_ticks.load(Ordering::Relaxed));
        metric!("tilt_racer_games_started_total", "Games started", "counter",
            self.games_started.load(Ordering::Relaxed));
        metric!("tilt_racer_crashes_total", "Games ended by collision", "counter",
            self.crashes.load(Ordering::Relaxed));
        metric!("tilt_racer_obstacles_spawned_total", "Obstacles spawned", "counter",
            self.obstacles_spawned.load(Ordering::Relaxed));
        metric!("tilt_racer_score", "Current score", "gauge",
            self.score.load(Ordering::Relaxed));
        metric!("tilt_racer_uptime_seconds", "Process uptime in seconds", "counter",
            self.uptime_seconds());

        output
    }

    /// Generate JSON format metrics
    pub fn to_json(&self) -> String {
        serde_json::json!({
            "loop": {
                "iterations": self.iterations.load(Ordering::Relaxed),
                "iteration_time_us": self.iteration_time_us.load(Ordering::Relaxed),
                "iteration_time_p95_us": self.iteration_time_p95_us.load(Ordering::Relaxed),
                "iteration_time_p99_us": self.iteration_time_p99_us.load(Ordering::Relaxed),
                "iteration_time_max_us": self.iteration_time_max_us.load(Ordering::Relaxed),
            },
            "frames": {
                "received": self.frames_received.load(Ordering::Relaxed),
                "missed": self.frames_missed.load(Ordering::Relaxed),
            },
            "tracking": {
                "faces_detected": self.faces_detected.load(Ordering::Relaxed),
                "faces_missing": self.faces_missing.load(Ordering::Relaxed),
                "inference_failures": self.inference_failures.load(Ordering::Relaxed),
                "lane_changes": self.lane_changes.load(Ordering::Relaxed),
            },
            "game": {
                "ticks": self.sim_ticks.load(Ordering::Relaxed),
                "games_started": self.games_started.load(Ordering::Relaxed),
                "crashes": self.crashes.load(Ordering::Relaxed),
                "obstacles_spawned": self.obstacles_spawned.load(Ordering::Relaxed),
                "score": self.score.load(Ordering::Relaxed),
            },
            "uptime_seconds": self.uptime_seconds(),
        })
        .to_string()
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Start the metrics HTTP server
pub async fn start_metrics_server(metrics: Arc<Metrics>, port: u16) -> anyhow::Result<()> {
    let addr = format!("0.0.0.0:{}", port);
    let listener = TcpListener::bind(&addr).await?;

    info!("Metrics server listening on http://{}/metrics", addr);

    loop {
        let (mut socket, peer) = listener.accept().await?;
        let metrics = metrics.clone();

        tokio::spawn(async move {
            let mut buffer = [0u8; 1024];

            match socket.read(&mut buffer).await {
                Ok(n) if n > 0 => {
                    let request = String::from_utf8_lossy(&buffer[..n]);

                    // JSON first: "/metrics" is a prefix of "/metrics/json"
                    let response = if request.starts_with("GET /metrics/json") {
                        let body = metrics.to_json();
                        format!(
                            "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                            body.len(),
                            body
                        )
                    } else if request.starts_with("GET /metrics") {
                        let body = metrics.to_prometheus();
                        format!(
                            "HTTP/1.1 200 OK\r\nContent-Type: text/plain; version=0.0.4\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                            body.len(),
                            body
                        )
                    } else if request.starts_with("GET /health") {
                        let body = "OK";
                        format!(
                            "HTTP/1.1 200 OK\r\nContent-Type: text/plain\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                            body.len(),
                            body
                        )
                    } else {
                        "HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\nConnection: close\r\n\r\n".to_string()
                    };

                    if let Err(e) = socket.write_all(response.as_bytes()).await {
                        debug!("Failed to write metrics response to {}: {}", peer, e);
                    }
                }
                Ok(_) => {}
                Err(e) => {
                    debug!("Failed to read from metrics socket {}: {}", peer, e);
                }
            }
        });
    }
}
