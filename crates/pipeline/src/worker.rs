//! Capture worker
//!
//! Runs on its own thread. Per frame: detect, decode, estimate, annotate,
//! record, then offer the frame to the display queue. A full queue drops the
//! frame and backs off for one display interval.

use alerting::from_config as alarm_from_config;
use camera_capture::{FrameSource, VideoFrame};
use detector::{decode, DecoderConfig, Detector, RawDetectionOutput};
use display_queue::{FrameProducer, TrySendError};
use posture::{Overlay, PostureEstimator};
use recorder::{FrameOutcome, Recorder, RecorderStats};
use serde::Serialize;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

use crate::{AppConfig, CancellationToken, PipelineError};

/// Why a capture worker stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum WorkerExit {
    /// Cancellation token fired
    Cancelled,
    /// The source stopped producing frames
    SourceEnded,
    /// The display side of the queue is gone
    DisplayClosed,
}

/// Summary of one worker run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct WorkerReport {
    pub exit: WorkerExit,
    pub frames: u64,
    pub dropped: u64,
    pub recorder: RecorderStats,
}

/// Detection → posture → recording for a single frame
pub struct FrameProcessor {
    detector: Box<dyn Detector>,
    decoder: DecoderConfig,
    estimator: PostureEstimator,
    overlay: Option<Overlay>,
    recorder: Recorder,
}

impl FrameProcessor {
    pub fn new(detector: Box<dyn Detector>, config: &AppConfig) -> Result<Self, PipelineError> {
        let overlay = if config.posture.annotate {
            Some(Overlay::new(&config.posture)?)
        } else {
            None
        };
        let recorder = Recorder::new(
            config.recorder.clone(),
            alarm_from_config(&config.alarm),
            Some(Overlay::new(&config.posture)?),
        )?;

        info!("Frame processor ready (detector: {})", detector.name());
        Ok(Self {
            detector,
            decoder: config.decoder.clone(),
            estimator: PostureEstimator::new(config.posture.clone()),
            overlay,
            recorder,
        })
    }

    pub fn recorder(&self) -> &Recorder {
        &self.recorder
    }

    /// Process one frame in place. Inference failures count as "nothing
    /// detected".
    pub fn process(&mut self, frame: &mut VideoFrame, now: Instant) -> FrameOutcome {
        let output = match self.detector.infer(frame) {
            Ok(output) => output,
            Err(e) => {
                warn!("Inference failed on frame {}: {}", frame.sequence, e);
                RawDetectionOutput::default()
            }
        };

        let decoded = decode(&output, &self.decoder);
        let (sx, sy) = self.decoder.scale_to(frame.width, frame.height);
        let detections = decoded.detections_scaled(sx, sy);
        let sample = self.estimator.estimate(&detections);

        if let Some(overlay) = &self.overlay {
            overlay.annotate(frame, &detections, &sample);
        }

        let class = sample.class(self.estimator.config());
        debug!(
            "Frame {}: {} detections, angle {:?}, class {:?}",
            frame.sequence,
            detections.len(),
            sample.angle,
            class
        );

        self.recorder.on_frame(frame, class, now)
    }

    /// Close open clips
    pub fn shutdown(&mut self) -> RecorderStats {
        self.recorder.shutdown();
        self.recorder.stats()
    }
}

/// The capture loop and everything it owns
pub struct CaptureWorker {
    source: Box<dyn FrameSource>,
    processor: FrameProcessor,
    queue: FrameProducer<VideoFrame>,
    token: CancellationToken,
    backoff: Duration,
}

impl CaptureWorker {
    pub fn new(
        source: Box<dyn FrameSource>,
        processor: FrameProcessor,
        queue: FrameProducer<VideoFrame>,
        backoff: Duration,
    ) -> Self {
        Self {
            source,
            processor,
            queue,
            token: CancellationToken::new(),
            backoff,
        }
    }

    /// Token that stops this worker; also fired by the worker itself on exit
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    pub fn source_name(&self) -> &str {
        self.source.name()
    }

    /// Run until cancelled, the source ends or the display goes away
    pub fn run(mut self) -> WorkerReport {
        info!("Capture started on {}", self.source.name());
        let mut frames = 0u64;
        let mut dropped = 0u64;

        let exit = loop {
            if self.token.is_cancelled() {
                break WorkerExit::Cancelled;
            }

            let mut frame = match self.source.next_frame() {
                Ok(Some(frame)) => frame,
                Ok(None) => {
                    info!("Source {} ended", self.source.name());
                    break WorkerExit::SourceEnded;
                }
                Err(e) => {
                    error!("Source {} failed: {}", self.source.name(), e);
                    break WorkerExit::SourceEnded;
                }
            };

            self.processor.process(&mut frame, Instant::now());
            frames += 1;

            match self.queue.try_push(frame) {
                Ok(()) => {}
                Err(TrySendError::Full(_)) => {
                    dropped += 1;
                    thread::sleep(self.backoff);
                }
                Err(TrySendError::Disconnected(_)) => {
                    warn!("Display queue closed");
                    break WorkerExit::DisplayClosed;
                }
            }
        };

        self.token.cancel();
        let recorder = self.processor.shutdown();
        info!(
            "Capture stopped ({:?}): {} frames, {} dropped from display",
            exit, frames, dropped
        );

        WorkerReport {
            exit,
            frames,
            dropped,
            recorder,
        }
    }
}

/// Assemble a worker from configuration
pub fn build_worker(
    config: &AppConfig,
    source: Box<dyn FrameSource>,
    queue: FrameProducer<VideoFrame>,
) -> Result<CaptureWorker, PipelineError> {
    let detector = detector::from_config(&config.decoder)?;
    let processor = FrameProcessor::new(detector, config)?;
    Ok(CaptureWorker::new(
        source,
        processor,
        queue,
        config.display.interval(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use camera_capture::SyntheticSource;
    use display_queue::display_queue;
    use std::path::Path;

    fn config(root: &Path) -> AppConfig {
        let mut config = AppConfig::default();
        config.recorder.poor_dir = root.join("poor");
        config.recorder.good_dir = root.join("good");
        config.alarm.enabled = false;
        config.display.interval_ms = 1;
        config
    }

    #[test]
    fn test_source_end_stops_worker() {
        let root = tempfile::tempdir().unwrap();
        let config = config(root.path());
        let (tx, rx) = display_queue(2);
        let source = Box::new(SyntheticSource::new(32, 24).with_limit(5));
        let worker = build_worker(&config, source, tx).unwrap();
        let token = worker.token();

        let report = worker.run();
        assert_eq!(report.exit, WorkerExit::SourceEnded);
        assert_eq!(report.frames, 5);
        assert_eq!(report.dropped, 3);
        assert_eq!(rx.len(), 2);
        assert!(token.is_cancelled());
    }

    #[test]
    fn test_cancelled_before_start() {
        let root = tempfile::tempdir().unwrap();
        let (tx, _rx) = display_queue(2);
        let worker =
            build_worker(&config(root.path()), Box::new(SyntheticSource::new(8, 8)), tx).unwrap();
        worker.token().cancel();
        let report = worker.run();
        assert_eq!(report.exit, WorkerExit::Cancelled);
        assert_eq!(report.frames, 0);
    }

    #[test]
    fn test_display_gone_stops_worker() {
        let root = tempfile::tempdir().unwrap();
        let (tx, rx) = display_queue(2);
        drop(rx);
        let worker =
            build_worker(&config(root.path()), Box::new(SyntheticSource::new(8, 8)), tx).unwrap();
        assert_eq!(worker.run().exit, WorkerExit::DisplayClosed);
    }

    #[test]
    fn test_no_model_records_nothing() {
        let root = tempfile::tempdir().unwrap();
        let (tx, _rx) = display_queue(2);
        let source = Box::new(SyntheticSource::new(16, 16).with_limit(3));
        let report = build_worker(&config(root.path()), source, tx).unwrap().run();
        assert_eq!(report.recorder.alarms, 0);
        assert_eq!(report.recorder.poor_kept, 0);
    }
}
