//! Control loop
//!
//! One iteration, strictly in order:
//! 1. poll the frame source
//! 2. run landmark inference on the frame, if any
//! 3. classify the first face's tilt and move the player
//! 4. tick the simulation once, if running
//! 5. render and present
//!
//! Every suspension point is awaited before the next step, and the scheduler
//! never starts an iteration before the previous one has presented. Commands
//! are applied between iterations.

pub mod command;

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::{interval, Instant, MissedTickBehavior};
use tracing::{debug, info};

use crate::config::GameConfig;
use crate::game::constants::STOP_REASON;
use crate::game::simulation::{GameEvent, Simulation};
use crate::game::state::{GameState, Lane};
use crate::metrics::Metrics;
use crate::render::{render, Scene, Surface};
use crate::tracking::{EstimatorError, FacialLandmarks, LandmarkEstimator, TiltClassifier, TiltReading};
use crate::vision::{Frame, FrameSource};

pub use command::Command;

/// Seconds between loop statistics log lines
const STATS_INTERVAL_SECS: u64 = 30;

/// Whether the loop should keep going after a command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

/// What happened during one iteration
#[derive(Debug, Clone, PartialEq)]
pub struct StepReport {
    pub frame: bool,
    pub face: bool,
    pub tilt: Option<TiltReading>,
    pub ticked: bool,
    pub events: Vec<GameEvent>,
}

/// Owns the game state and drives every stage of the loop
pub struct Session<S, E, U> {
    source: S,
    estimator: E,
    surface: U,
    simulation: Simulation,
    state: GameState,
    classifier: TiltClassifier,
    /// Last classified tilt; kept when no face is found
    tilt: Option<TiltReading>,
    inference_timeout: Duration,
    metrics: Arc<Metrics>,
}

impl<S, E, U> Session<S, E, U>
where
    S: FrameSource,
    E: LandmarkEstimator,
    U: Surface,
{
    pub fn new(source: S, estimator: E, surface: U, config: &GameConfig, metrics: Arc<Metrics>) -> Self {
        Self {
            source,
            estimator,
            surface,
            simulation: Simulation::new(),
            state: GameState::new(config.speed),
            classifier: TiltClassifier::new(config.sensitivity, config.invert_tilt),
            tilt: None,
            inference_timeout: config.inference_timeout,
            metrics,
        }
    }

    /// Replace the simulation (e.g. a seeded one)
    pub fn with_simulation(mut self, simulation: Simulation) -> Self {
        self.simulation = simulation;
        self
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }

    pub fn tilt(&self) -> Option<&TiltReading> {
        self.tilt.as_ref()
    }

    pub fn classifier(&self) -> &TiltClassifier {
        &self.classifier
    }

    pub fn surface(&self) -> &U {
        &self.surface
    }

    /// Apply a player command
    pub fn apply(&mut self, command: Command) -> Flow {
        match command {
            Command::Start => {
                self.state.start();
                Metrics::incr(&self.metrics.games_started);
                info!("Game started (speed {}, sensitivity {}°)", self.state.speed, self.classifier.threshold_deg);
            }
            Command::Stop => {
                if self.state.is_running() {
                    self.state.end(STOP_REASON);
                    info!("Game stopped at score {}", self.state.score);
                }
            }
            Command::Sensitivity(degrees) => {
                self.classifier.threshold_deg = degrees as f32;
                info!("Sensitivity set to {}°", degrees);
            }
            Command::Speed(speed) => {
                self.state.set_speed(speed);
                info!("Speed set to {}", self.state.speed);
            }
            Command::Invert(flag) => {
                self.classifier.invert = flag.unwrap_or(!self.classifier.invert);
                info!("Tilt inversion {}", if self.classifier.invert { "on" } else { "off" });
            }
            Command::Quit => return Flow::Quit,
        }
        Flow::Continue
    }

    /// First face in `frame`, with failures and timeouts treated as no face
    async fn detect(&self, frame: &Frame) -> Option<FacialLandmarks> {
        let result = tokio::time::timeout(self.inference_timeout, self.estimator.estimate(frame))
            .await
            .unwrap_or(Err(EstimatorError::Timeout(self.inference_timeout)));

        match result {
            Ok(faces) => faces.into_iter().next(),
            Err(e) => {
                debug!("Inference skipped this frame: {}", e);
                Metrics::incr(&self.metrics.inference_failures);
                None
            }
        }
    }

    /// Run exactly one loop iteration
    pub async fn step(&mut self) -> StepReport {
        let started = Instant::now();

        let frame = self.source.poll().await;
        if frame.is_some() {
            Metrics::incr(&self.metrics.frames_received);
        } else {
            Metrics::incr(&self.metrics.frames_missed);
        }

        let face = match &frame {
            Some(frame) => self.detect(frame).await,
            None => None,
        };

        // Classification lands before the tick reads the lane
        let mut reading = None;
        if let Some((left, right)) = face.as_ref().and_then(FacialLandmarks::eye_corners) {
            let tilt = self.classifier.classify(left, right);
            self.move_player(tilt.lane);
            self.tilt = Some(tilt);
            reading = Some(tilt);
            Metrics::incr(&self.metrics.faces_detected);
        } else if frame.is_some() {
            Metrics::incr(&self.metrics.faces_missing);
        }

        let ticked = self.state.is_running();
        let events = self.simulation.tick(&mut self.state);
        if ticked {
            self.record_tick(&events);
        }

        let commands = render(&Scene {
            frame: frame.as_ref(),
            face: face.as_ref(),
            state: &self.state,
            tilt: self.tilt.as_ref(),
        });
        self.surface.present(&commands);

        self.metrics.record_iteration(started.elapsed());

        StepReport {
            frame: frame.is_some(),
            face: reading.is_some(),
            tilt: reading,
            ticked,
            events,
        }
    }

    fn move_player(&mut self, lane: Lane) {
        if lane != self.state.player_lane {
            debug!("Lane {} -> {}", self.state.player_lane.index(), lane.index());
            Metrics::incr(&self.metrics.lane_changes);
            self.state.player_lane = lane;
        }
    }

    fn record_tick(&self, events: &[GameEvent]) {
        Metrics::incr(&self.metrics.sim_ticks);
        self.metrics
            .score
            .store(self.state.score, std::sync::atomic::Ordering::Relaxed);

        for event in events {
            match event {
                GameEvent::ObstacleSpawned { .. } => Metrics::incr(&self.metrics.obstacles_spawned),
                GameEvent::Crashed { .. } => Metrics::incr(&self.metrics.crashes),
                GameEvent::ObstaclesCleared { .. } => {}
            }
        }
    }

    /// Drive the loop at `period` until `shutdown` resolves or a quit command
    /// arrives. Returns the final game state.
    pub async fn run<F>(mut self, mut commands: mpsc::Receiver<Command>, period: Duration, shutdown: F) -> GameState
    where
        F: Future<Output = ()>,
    {
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        tokio::pin!(shutdown);

        info!("Control loop started at {:.0} Hz", 1.0 / period.as_secs_f64());
        let mut last_stats = Instant::now();

        loop {
            tokio::select! {
                biased;
                _ = &mut shutdown => {
                    info!("Shutdown signal received");
                    break;
                }
                Some(command) = commands.recv() => {
                    if self.apply(command) == Flow::Quit {
                        info!("Quit requested");
                        break;
                    }
                }
                _ = ticker.tick() => {
                    self.step().await;

                    if last_stats.elapsed() >= Duration::from_secs(STATS_INTERVAL_SECS) {
                        last_stats = Instant::now();
                        info!("Loop: {}", self.metrics.summary());
                    }
                }
            }
        }

        self.state
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::constants::CRASH_REASON;
    use crate::game::state::{Obstacle, Phase};
    use crate::render::DrawCommand;
    use crate::tracking::landmarks::mesh_with_eyes;
    use parking_lot::Mutex;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Hands out queued frames, then "no signal"
    #[derive(Default)]
    struct ScriptedSource {
        frames: Mutex<VecDeque<Option<Frame>>>,
        polls: AtomicUsize,
    }

    impl ScriptedSource {
        fn always() -> Self {
            let source = Self::default();
            source.frames.lock().extend((0..64).map(|_| Some(Frame::encoded(vec![0xFF]))));
            source
        }
    }

    impl FrameSource for ScriptedSource {
        async fn poll(&self) -> Option<Frame> {
            self.polls.fetch_add(1, Ordering::SeqCst);
            self.frames.lock().pop_front().flatten()
        }
    }

    /// Returns queued results, then no faces
    #[derive(Default)]
    struct ScriptedEstimator {
        results: Mutex<VecDeque<Result<Vec<FacialLandmarks>, EstimatorError>>>,
        calls: AtomicUsize,
        delay: Option<Duration>,
    }

    impl ScriptedEstimator {
        fn faces(list: Vec<Vec<FacialLandmarks>>) -> Self {
            let estimator = Self::default();
            estimator.results.lock().extend(list.into_iter().map(Ok));
            estimator
        }
    }

    impl LandmarkEstimator for ScriptedEstimator {
        async fn estimate(&self, _frame: &Frame) -> Result<Vec<FacialLandmarks>, EstimatorError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            self.results.lock().pop_front().unwrap_or(Ok(Vec::new()))
        }
    }

    #[derive(Default)]
    struct RecordingSurface {
        presented: Vec<Vec<DrawCommand>>,
    }

    impl Surface for RecordingSurface {
        fn present(&mut self, commands: &[DrawCommand]) {
            self.presented.push(commands.to_vec());
        }
    }

    fn tilted_right() -> FacialLandmarks {
        // 30 degrees
        mesh_with_eyes((100.0, 200.0), (200.0, 257.735))
    }

    fn tilted_left() -> FacialLandmarks {
        mesh_with_eyes((100.0, 200.0), (200.0, 142.265))
    }

    fn level() -> FacialLandmarks {
        mesh_with_eyes((100.0, 200.0), (200.0, 201.0))
    }

    fn session(
        source: ScriptedSource,
        estimator: ScriptedEstimator,
    ) -> Session<ScriptedSource, ScriptedEstimator, RecordingSurface> {
        Session::new(
            source,
            estimator,
            RecordingSurface::default(),
            &GameConfig::default(),
            Arc::new(Metrics::new()),
        )
        .with_simulation(Simulation::with_seed(5))
    }

    #[tokio::test]
    async fn test_no_frame_skips_inference() {
        let mut s = session(ScriptedSource::default(), ScriptedEstimator::default());

        let report = s.step().await;
        assert!(!report.frame);
        assert!(!report.face);
        assert_eq!(s.estimator.calls.load(Ordering::SeqCst), 0);
        assert_eq!(s.surface().presented.len(), 1);
        assert!(s.surface().presented[0]
            .iter()
            .any(|c| c.text() == Some("Waiting for Camera...")));
    }

    #[tokio::test]
    async fn test_face_moves_player() {
        let mut s = session(
            ScriptedSource::always(),
            ScriptedEstimator::faces(vec![vec![tilted_right()], vec![tilted_left()], vec![level()]]),
        );

        let report = s.step().await;
        assert!(report.face);
        assert_eq!(s.state().player_lane, Lane::Right);
        assert!((report.tilt.unwrap().angle_deg - 30.0).abs() < 0.01);

        s.step().await;
        assert_eq!(s.state().player_lane, Lane::Left);

        s.step().await;
        assert_eq!(s.state().player_lane, Lane::Center);
    }

    #[tokio::test]
    async fn test_missing_face_keeps_lane() {
        let mut s = session(
            ScriptedSource::always(),
            ScriptedEstimator::faces(vec![vec![tilted_left()], vec![]]),
        );

        s.step().await;
        assert_eq!(s.state().player_lane, Lane::Left);

        let report = s.step().await;
        assert!(report.frame);
        assert!(!report.face);
        assert_eq!(s.state().player_lane, Lane::Left);
        // HUD keeps the last angle
        assert!(s.tilt().unwrap().angle_deg < -29.0);
    }

    #[tokio::test]
    async fn test_only_first_face_used() {
        let mut s = session(
            ScriptedSource::always(),
            ScriptedEstimator::faces(vec![vec![tilted_left(), tilted_right()]]),
        );

        s.step().await;
        assert_eq!(s.state().player_lane, Lane::Left);
    }

    #[tokio::test]
    async fn test_inference_error_absorbed() {
        let estimator = ScriptedEstimator::default();
        estimator
            .results
            .lock()
            .push_back(Err(EstimatorError::Decode("bad".to_string())));
        let mut s = session(ScriptedSource::always(), estimator);
        s.state.player_lane = Lane::Right;

        let report = s.step().await;
        assert!(report.frame);
        assert!(!report.face);
        assert_eq!(s.state().player_lane, Lane::Right);
        assert_eq!(s.metrics.inference_failures.load(Ordering::Relaxed), 1);
    }

    #[tokio::test]
    async fn test_inference_timeout_is_no_face() {
        let estimator = ScriptedEstimator {
            delay: Some(Duration::from_millis(500)),
            ..Default::default()
        };
        estimator.results.lock().push_back(Ok(vec![tilted_right()]));
        let mut s = session(ScriptedSource::always(), estimator);
        s.inference_timeout = Duration::from_millis(20);

        let report = s.step().await;
        assert!(!report.face);
        assert_eq!(s.state().player_lane, Lane::Center);
        assert_eq!(s.metrics.inference_failures.load(Ordering::Relaxed), 1);
    }

    #[tokio::test]
    async fn test_classification_precedes_tick() {
        // Obstacle about to hit the right lane; only a same-iteration lane
        // change into it can cause the crash.
        let mut s = session(
            ScriptedSource::always(),
            ScriptedEstimator::faces(vec![vec![tilted_right()]]),
        );
        s.apply(Command::Start);
        s.state.obstacles.push(Obstacle { lane: Lane::Right, y: 370.0 });

        let report = s.step().await;
        assert!(report.ticked);
        assert_eq!(report.events, vec![GameEvent::Crashed { score: 1 }]);
        assert_eq!(s.state().game_over_reason(), Some(CRASH_REASON));
    }

    #[tokio::test]
    async fn test_idle_renders_without_ticking() {
        let mut s = session(ScriptedSource::always(), ScriptedEstimator::default());

        for _ in 0..3 {
            let report = s.step().await;
            assert!(!report.ticked);
        }
        assert_eq!(s.state().score, 0);
        assert_eq!(s.surface().presented.len(), 3);
        assert_eq!(s.source.polls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_game_over_keeps_polling_and_rendering() {
        let mut s = session(ScriptedSource::always(), ScriptedEstimator::default());
        s.apply(Command::Start);
        s.state.obstacles.push(Obstacle { lane: Lane::Center, y: 370.0 });

        s.step().await;
        assert!(matches!(s.state().phase, Phase::GameOver { .. }));

        for _ in 0..3 {
            let report = s.step().await;
            assert!(!report.ticked);
            assert!(report.frame);
        }
        assert_eq!(s.state().score, 1);
        assert_eq!(s.surface().presented.len(), 4);
    }

    #[tokio::test]
    async fn test_scores_and_spawns_while_running() {
        let mut s = session(ScriptedSource::default(), ScriptedEstimator::default());
        s.apply(Command::Start);

        for _ in 0..46 {
            s.step().await;
        }
        assert_eq!(s.state().score, 46);
        assert_eq!(s.state().obstacles.len(), 1);
        assert_eq!(s.metrics.obstacles_spawned.load(Ordering::Relaxed), 1);
        assert_eq!(s.metrics.sim_ticks.load(Ordering::Relaxed), 46);
    }

    #[tokio::test]
    async fn test_commands_adjust_settings() {
        let mut s = session(ScriptedSource::default(), ScriptedEstimator::default());

        assert_eq!(s.apply(Command::Sensitivity(15)), Flow::Continue);
        assert_eq!(s.classifier().threshold_deg, 15.0);

        s.apply(Command::Speed(9));
        assert_eq!(s.state().speed, 9);

        s.apply(Command::Invert(None));
        assert!(s.classifier().invert);
        s.apply(Command::Invert(Some(false)));
        assert!(!s.classifier().invert);

        assert_eq!(s.apply(Command::Quit), Flow::Quit);
    }

    #[tokio::test]
    async fn test_stop_and_restart() {
        let mut s = session(ScriptedSource::default(), ScriptedEstimator::default());

        // Stop does nothing unless running
        s.apply(Command::Stop);
        assert_eq!(s.state().phase, Phase::Idle);

        s.apply(Command::Start);
        s.step().await;
        s.step().await;
        s.apply(Command::Stop);
        assert_eq!(s.state().game_over_reason(), Some(STOP_REASON));
        assert_eq!(s.state().score, 2);

        s.apply(Command::Start);
        assert!(s.state().is_running());
        assert_eq!(s.state().score, 0);
    }

    #[tokio::test]
    async fn test_run_until_shutdown() {
        let s = session(ScriptedSource::default(), ScriptedEstimator::default());
        let (tx, rx) = mpsc::channel(4);
        tx.send(Command::Start).await.unwrap();

        let state = s
            .run(rx, Duration::from_millis(1), tokio::time::sleep(Duration::from_millis(100)))
            .await;
        assert!(state.is_running());
        assert!(state.score > 0);
    }

    #[tokio::test]
    async fn test_run_stops_on_quit() {
        let s = session(ScriptedSource::default(), ScriptedEstimator::default());
        let (tx, rx) = mpsc::channel(4);
        tx.send(Command::Start).await.unwrap();
        tx.send(Command::Quit).await.unwrap();

        let state = s.run(rx, Duration::from_millis(1), std::future::pending()).await;
        assert!(state.is_running());
    }
}
