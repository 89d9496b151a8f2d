//! Display tick
//!
//! Drains the display queue at a fixed period, at most one frame per tick.

use camera_capture::VideoFrame;
use display_queue::FrameConsumer;
use image::imageops::{self, FilterType};
use std::path::PathBuf;
use std::time::Duration;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, warn};

use crate::CancellationToken;

/// Where displayed frames go
pub trait FrameRenderer: Send {
    fn render(&mut self, frame: VideoFrame);
}

/// Downscaled live preview. Keeps the latest preview and optionally writes
/// it to an image file.
pub struct ScaledPreview {
    scale: u32,
    output: Option<PathBuf>,
    latest: Option<VideoFrame>,
    rendered: u64,
}

impl ScaledPreview {
    pub fn new(scale: u32, output: Option<PathBuf>) -> Self {
        Self {
            scale: scale.max(1),
            output,
            latest: None,
            rendered: 0,
        }
    }

    pub fn latest(&self) -> Option<&VideoFrame> {
        self.latest.as_ref()
    }

    pub fn rendered(&self) -> u64 {
        self.rendered
    }
}

impl FrameRenderer for ScaledPreview {
    fn render(&mut self, frame: VideoFrame) {
        let preview = if self.scale > 1 {
            let Some(img) = frame.to_image() else {
                warn!("Preview frame {} is malformed", frame.sequence);
                return;
            };
            let width = (frame.width / self.scale).max(1);
            let height = (frame.height / self.scale).max(1);
            let scaled = imageops::resize(&img, width, height, FilterType::CatmullRom);
            VideoFrame::from_image(scaled, frame.timestamp_ns, frame.sequence)
        } else {
            frame
        };

        if let Some(path) = &self.output {
            match preview.to_image() {
                Some(img) => {
                    if let Err(e) = img.save(path) {
                        warn!("Failed to write preview {}: {}", path.display(), e);
                    }
                }
                None => warn!("Preview frame {} is malformed", preview.sequence),
            }
        }

        self.rendered += 1;
        self.latest = Some(preview);
    }
}

/// Pops queued frames into a renderer
pub struct DisplayTicker<R: FrameRenderer> {
    queue: FrameConsumer<VideoFrame>,
    renderer: R,
}

impl<R: FrameRenderer> DisplayTicker<R> {
    pub fn new(queue: FrameConsumer<VideoFrame>, renderer: R) -> Self {
        Self { queue, renderer }
    }

    /// Render at most one frame. Never blocks.
    pub fn tick(&mut self) -> bool {
        match self.queue.pop() {
            Some(frame) => {
                self.renderer.render(frame);
                true
            }
            None => false,
        }
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    pub fn queue(&self) -> &FrameConsumer<VideoFrame> {
        &self.queue
    }
}

/// Tick every `period` until `token` is cancelled. Returns the number of
/// frames rendered.
pub async fn run_display<R: FrameRenderer>(
    ticker: &mut DisplayTicker<R>,
    period: Duration,
    token: &CancellationToken,
) -> u64 {
    let mut ticks = interval(period);
    ticks.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut rendered = 0;

    while !token.is_cancelled() {
        ticks.tick().await;
        if ticker.tick() {
            rendered += 1;
        }
    }

    debug!("Display loop finished after {} frames", rendered);
    rendered
}
