use std::io::BufRead;
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use tilt_racer::config::{GameConfig, SourceKind};
use tilt_racer::metrics::{self, Metrics};
use tilt_racer::render::Canvas;
use tilt_racer::session::{Command, Session};
use tilt_racer::tracking::http::HttpLandmarkEstimator;
use tilt_racer::tracking::{Estimator, NullEstimator};
use tilt_racer::vision::local::{capture_channel, TestPatternDevice};
use tilt_racer::vision::remote::RemoteFrameSource;
use tilt_racer::vision::Camera;

/// Read player commands from stdin, one per line.
///
/// Runs on a plain thread so a pending read never holds up runtime shutdown.
fn spawn_command_reader(tx: mpsc::Sender<Command>) {
    std::thread::spawn(move || {
        for line in std::io::stdin().lock().lines() {
            let line = match line {
                Ok(line) => line,
                Err(e) => {
                    error!("Failed to read command: {}", e);
                    return;
                }
            };
            if line.trim().is_empty() {
                continue;
            }
            match line.parse::<Command>() {
                Ok(command) => {
                    if tx.blocking_send(command).is_err() {
                        return;
                    }
                }
                Err(e) => warn!("{}", e),
            }
        }
    });
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .init();

    info!("Tilt Racer v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let config = GameConfig::load_or_default();
    config.validate().map_err(anyhow::Error::msg)?;
    info!(
        "Configuration loaded: source={}, sensitivity={}°, speed={}, invert={}, {} Hz",
        config.frame_source, config.sensitivity, config.speed, config.invert_tilt, config.refresh_hz
    );

    let metrics = Arc::new(Metrics::new());

    if let Some(port) = config.metrics_port {
        let metrics_clone = metrics.clone();
        tokio::spawn(async move {
            if let Err(e) = metrics::start_metrics_server(metrics_clone, port).await {
                error!("Metrics server error: {}", e);
            }
        });
    }

    // The game cannot start without its model
    let estimator = match &config.inference_url {
        Some(url) => match HttpLandmarkEstimator::connect(url, config.inference_timeout).await {
            Ok(estimator) => {
                info!("Face tracking via {}", estimator.base_url());
                Estimator::Http(estimator)
            }
            Err(e) => {
                error!("Error Loading AI: {}", e);
                return Err(e.into());
            }
        },
        None => {
            warn!("INFERENCE_URL not set, running without face tracking");
            Estimator::Null(NullEstimator)
        }
    };

    let camera = match config.frame_source {
        SourceKind::Remote => {
            let source = RemoteFrameSource::new(config.camera_host.clone(), config.fetch_timeout);
            info!("Polling camera at http://{}/capture", source.host());
            Camera::Remote(source)
        }
        SourceKind::Local => {
            let (feed, source) = capture_channel();
            let device = TestPatternDevice {
                fps: config.local_fps,
                ..Default::default()
            };
            device.spawn(feed);
            Camera::Local(source)
        }
    };

    info!("Using {} camera, {} estimator", camera.name(), estimator.name());
    info!("Commands: start | restart | stop | sens <2-20> | speed <1-10> | invert [on|off] | quit");

    let (tx, rx) = mpsc::channel(16);
    spawn_command_reader(tx);

    let session = Session::new(camera, estimator, Canvas::new(), &config, metrics.clone());

    // Shutdown signal handler
    let shutdown = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    let state = session.run(rx, config.frame_interval(), shutdown).await;

    info!("Final score: {}", state.score);
    info!("{}", metrics.summary());
    info!("Stopped");

    Ok(())
}
