//! Posture recording sessions
//!
//! Two sub-machines share the per-frame posture class:
//!
//! - poor: `Idle -> Recording -> (Idle | Cooldown)`. A short episode is
//!   discarded; one that outlasts the timeout raises the alarm, freezes
//!   capture and keeps the clip. `Cooldown` lasts until the next frame, which
//!   leaves it like `Idle` does.
//! - good: `Empty -> Buffering -> Empty`, one clip per window, only on ticks
//!   where the poor sub-machine is neither recording nor alarming.
//!
//! A sink exists exactly while its sub-machine is in an active state: the
//! session is the state's payload.

use alerting::Alarm;
use camera_capture::VideoFrame;
use chrono::{DateTime, Local};
use posture::{Overlay, PostureClass};
use serde::Serialize;
use std::fs;
use std::mem;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::{
    MjpegSinkFactory, RecorderConfig, RecorderError, RetentionManager, SinkFactory, VideoSink,
};

/// Which clip a frame went to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ClipKind {
    Poor,
    Good,
}

/// What the recorder did with one frame
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrameOutcome {
    /// Clip the frame was written to
    pub written: Option<ClipKind>,
    /// The alarm fired on this frame
    pub alarm: bool,
    /// Poor clip deleted after a short episode
    pub discarded: Option<PathBuf>,
    /// Clip closed and kept
    pub kept: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PoorPhase {
    Idle,
    Recording,
    Cooldown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum GoodPhase {
    Empty,
    Buffering,
}

/// Session counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RecorderStats {
    pub alarms: u64,
    pub poor_kept: u64,
    pub poor_discarded: u64,
    pub good_written: u64,
    pub good_evicted: u64,
}

struct Session {
    started_at: Instant,
    sink: Box<dyn VideoSink>,
}

impl Session {
    fn path(&self) -> PathBuf {
        self.sink.path().to_path_buf()
    }

    /// Close and keep the file
    fn close(self) -> PathBuf {
        let path = self.path();
        if let Err(e) = self.sink.finish() {
            warn!("Failed to finalize {}: {}", path.display(), e);
        }
        path
    }
}

enum PoorState {
    Idle,
    Recording(Session),
    Cooldown,
}

enum GoodState {
    Empty,
    Buffering(Session),
}

/// `<dir>/<YYYY-MM-DD__HH-MM-SS>.<ext>`, with `_N` appended while the name
/// is taken
pub fn clip_path(dir: &Path, extension: &str, at: DateTime<Local>) -> PathBuf {
    let stem = at.format("%Y-%m-%d__%H-%M-%S").to_string();
    let mut path = dir.join(format!("{}.{}", stem, extension));
    let mut n = 1;
    while path.exists() {
        path = dir.join(format!("{}_{}.{}", stem, n, extension));
        n += 1;
    }
    path
}

/// Dual-session posture recorder. Owned by the capture thread.
pub struct Recorder {
    config: RecorderConfig,
    sinks: Box<dyn SinkFactory>,
    alarm: Box<dyn Alarm>,
    overlay: Option<Overlay>,
    retention: RetentionManager,
    poor: PoorState,
    good: GoodState,
    stats: RecorderStats,
}

impl Recorder {
    /// Recorder writing Motion-JPEG clips. The overlay, when given, draws
    /// the alarm marker.
    pub fn new(
        config: RecorderConfig,
        alarm: Box<dyn Alarm>,
        overlay: Option<Overlay>,
    ) -> Result<Self, RecorderError> {
        let sinks = Box::new(MjpegSinkFactory::new(config.jpeg_quality));
        Self::with_sink_factory(config, sinks, alarm, overlay)
    }

    pub fn with_sink_factory(
        config: RecorderConfig,
        sinks: Box<dyn SinkFactory>,
        alarm: Box<dyn Alarm>,
        overlay: Option<Overlay>,
    ) -> Result<Self, RecorderError> {
        fs::create_dir_all(&config.poor_dir)?;
        fs::create_dir_all(&config.good_dir)?;
        info!(
            "Recorder ready: poor clips in {}, good clips in {} (keep {})",
            config.poor_dir.display(),
            config.good_dir.display(),
            config.retention_max
        );

        let retention = RetentionManager::new(config.good_dir.clone(), config.retention_max);
        Ok(Self {
            config,
            sinks,
            alarm,
            overlay,
            retention,
            poor: PoorState::Idle,
            good: GoodState::Empty,
            stats: RecorderStats::default(),
        })
    }

    pub fn config(&self) -> &RecorderConfig {
        &self.config
    }

    pub fn stats(&self) -> RecorderStats {
        self.stats
    }

    pub fn poor_phase(&self) -> PoorPhase {
        match self.poor {
            PoorState::Idle => PoorPhase::Idle,
            PoorState::Recording(_) => PoorPhase::Recording,
            PoorState::Cooldown => PoorPhase::Cooldown,
        }
    }

    pub fn good_phase(&self) -> GoodPhase {
        match self.good {
            GoodState::Empty => GoodPhase::Empty,
            GoodState::Buffering(_) => GoodPhase::Buffering,
        }
    }

    /// Path of the poor clip being recorded
    pub fn poor_clip(&self) -> Option<&Path> {
        match &self.poor {
            PoorState::Recording(session) => Some(session.sink.path()),
            _ => None,
        }
    }

    /// Path of the good clip being buffered
    pub fn good_clip(&self) -> Option<&Path> {
        match &self.good {
            GoodState::Buffering(session) => Some(session.sink.path()),
            GoodState::Empty => None,
        }
    }

    /// Feed one frame. `class` is `None` when no angle was measured.
    ///
    /// Blocks for the freeze period when the alarm fires.
    pub fn on_frame(
        &mut self,
        frame: &mut VideoFrame,
        class: Option<PostureClass>,
        now: Instant,
    ) -> FrameOutcome {
        let mut outcome = FrameOutcome::default();

        let poor = mem::replace(&mut self.poor, PoorState::Idle);
        self.poor = self.step_poor(poor, frame, class, now, &mut outcome);

        if matches!(self.poor, PoorState::Idle) && !outcome.alarm && outcome.written.is_none() {
            let good = mem::replace(&mut self.good, GoodState::Empty);
            self.good = self.step_good(good, frame, now, &mut outcome);
        }

        outcome
    }

    fn step_poor(
        &mut self,
        state: PoorState,
        frame: &mut VideoFrame,
        class: Option<PostureClass>,
        now: Instant,
        outcome: &mut FrameOutcome,
    ) -> PoorState {
        match (state, class) {
            (PoorState::Idle | PoorState::Cooldown, Some(PostureClass::Poor)) => {
                let dir = self.config.poor_dir.clone();
                match self.open_session(&dir, frame, now) {
                    Ok(session) => {
                        info!("Poor posture: recording {}", session.sink.path().display());
                        self.write_poor(session, frame, outcome)
                    }
                    Err(e) => {
                        warn!("Poor posture clip not started: {}", e);
                        PoorState::Idle
                    }
                }
            }
            (PoorState::Idle | PoorState::Cooldown, _) => PoorState::Idle,
            (PoorState::Recording(session), None) => self.write_poor(session, frame, outcome),
            (PoorState::Recording(session), Some(PostureClass::Good)) => {
                let path = session.close();
                match fs::remove_file(&path) {
                    Ok(()) => info!("Posture recovered, discarded {}", path.display()),
                    Err(e) => warn!("Failed to delete {}: {}", path.display(), e),
                }
                self.stats.poor_discarded += 1;
                outcome.discarded = Some(path);
                PoorState::Idle
            }
            (PoorState::Recording(session), Some(PostureClass::Poor)) => {
                let elapsed = now.saturating_duration_since(session.started_at);
                if elapsed > self.config.poor_timeout() {
                    self.raise_alarm(session, frame, outcome)
                } else {
                    self.write_poor(session, frame, outcome)
                }
            }
        }
    }

    fn raise_alarm(
        &mut self,
        mut session: Session,
        frame: &mut VideoFrame,
        outcome: &mut FrameOutcome,
    ) -> PoorState {
        if let Some(overlay) = &self.overlay {
            overlay.mark_alarm(frame);
        }
        match session.sink.write(frame) {
            Ok(()) => outcome.written = Some(ClipKind::Poor),
            Err(e) => warn!("Failed to write alarm frame: {}", e),
        }

        self.alarm.trigger();
        self.stats.alarms += 1;
        outcome.alarm = true;
        warn!("Sustained poor posture, pausing capture for {:?}", self.config.freeze());
        thread::sleep(self.config.freeze());

        let path = session.close();
        info!("Kept poor posture clip {}", path.display());
        self.stats.poor_kept += 1;
        outcome.kept = Some(path);
        PoorState::Cooldown
    }

    fn write_poor(
        &mut self,
        mut session: Session,
        frame: &VideoFrame,
        outcome: &mut FrameOutcome,
    ) -> PoorState {
        match session.sink.write(frame) {
            Ok(()) => {
                outcome.written = Some(ClipKind::Poor);
                PoorState::Recording(session)
            }
            Err(e) => {
                warn!("Poor posture clip closed after write failure: {}", e);
                let path = session.close();
                self.stats.poor_kept += 1;
                outcome.kept = Some(path);
                PoorState::Idle
            }
        }
    }

    fn step_good(
        &mut self,
        state: GoodState,
        frame: &VideoFrame,
        now: Instant,
        outcome: &mut FrameOutcome,
    ) -> GoodState {
        let mut session = match state {
            GoodState::Buffering(session) => session,
            GoodState::Empty => {
                self.enforce_retention();
                let dir = self.config.good_dir.clone();
                match self.open_session(&dir, frame, now) {
                    Ok(session) => {
                        debug!("Good posture: buffering {}", session.sink.path().display());
                        session
                    }
                    Err(e) => {
                        warn!("Good posture clip not started: {}", e);
                        return GoodState::Empty;
                    }
                }
            }
        };

        if let Err(e) = session.sink.write(frame) {
            warn!("Good posture clip closed after write failure: {}", e);
            outcome.kept = Some(session.close());
            self.stats.good_written += 1;
            return GoodState::Empty;
        }
        outcome.written = Some(ClipKind::Good);

        if now.saturating_duration_since(session.started_at) > self.config.good_window() {
            let path = session.close();
            debug!("Good posture clip complete: {}", path.display());
            self.stats.good_written += 1;
            outcome.kept = Some(path);
            GoodState::Empty
        } else {
            GoodState::Buffering(session)
        }
    }

    fn enforce_retention(&mut self) {
        match self.retention.enforce() {
            Ok(removed) => self.stats.good_evicted += removed.len() as u64,
            Err(e) => warn!("Retention pass failed: {}", e),
        }
    }

    fn open_session(
        &self,
        dir: &Path,
        frame: &VideoFrame,
        now: Instant,
    ) -> Result<Session, RecorderError> {
        let path = clip_path(dir, &self.config.extension, Local::now());
        let sink = self
            .sinks
            .open(&path, frame.width, frame.height, self.config.fps)?;
        Ok(Session {
            started_at: now,
            sink,
        })
    }

    /// Close any open clip without deleting it
    pub fn shutdown(&mut self) {
        if let PoorState::Recording(session) = mem::replace(&mut self.poor, PoorState::Idle) {
            let path = session.close();
            info!("Shutdown: kept poor posture clip {}", path.display());
            self.stats.poor_kept += 1;
        }
        if let GoodState::Buffering(session) = mem::replace(&mut self.good, GoodState::Empty) {
            let path = session.close();
            info!("Shutdown: kept good posture clip {}", path.display());
            self.stats.good_written += 1;
        }

        let s = self.stats;
        info!(
            "Recorder stats: {} alarms, poor clips {} kept / {} discarded, good clips {} written / {} evicted",
            s.alarms, s.poor_kept, s.poor_discarded, s.good_written, s.good_evicted
        );
    }
}
