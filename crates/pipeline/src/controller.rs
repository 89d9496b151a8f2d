//! Capture worker lifecycle

use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{info, warn};

use crate::{CancellationToken, CaptureWorker, PipelineError, WorkerReport};

struct Running {
    token: CancellationToken,
    handle: JoinHandle<WorkerReport>,
}

/// Owns at most one capture thread at a time
pub struct CaptureController {
    running: Option<Running>,
    grace: Duration,
}

impl CaptureController {
    pub fn new(grace: Duration) -> Self {
        Self {
            running: None,
            grace,
        }
    }

    /// Spawn `worker` on a capture thread. Stops any running worker first.
    pub fn start(&mut self, worker: CaptureWorker) -> Result<(), PipelineError> {
        if self.running.is_some() {
            self.stop()?;
        }

        let token = worker.token();
        let name = format!("capture-{}", worker.source_name());
        let handle = thread::Builder::new().name(name).spawn(move || worker.run())?;
        self.running = Some(Running { token, handle });
        Ok(())
    }

    /// Cancel the running worker, wait the grace period, then start
    /// `worker`. Returns the previous worker's report.
    pub fn restart(&mut self, worker: CaptureWorker) -> Result<Option<WorkerReport>, PipelineError> {
        let previous = match self.running.take() {
            Some(running) => {
                info!("Restarting capture");
                running.token.cancel();
                thread::sleep(self.grace);
                if !running.handle.is_finished() {
                    warn!("Previous capture worker still busy after {:?}, waiting", self.grace);
                }
                Some(join(running)?)
            }
            None => None,
        };

        self.start(worker)?;
        Ok(previous)
    }

    /// Cancel and join the running worker
    pub fn stop(&mut self) -> Result<Option<WorkerReport>, PipelineError> {
        match self.running.take() {
            Some(running) => {
                running.token.cancel();
                join(running).map(Some)
            }
            None => Ok(None),
        }
    }

    /// True while a worker thread is alive
    pub fn is_running(&self) -> bool {
        self.running
            .as_ref()
            .map_or(false, |running| !running.handle.is_finished())
    }

    /// Token of the running worker
    pub fn token(&self) -> Option<CancellationToken> {
        self.running.as_ref().map(|running| running.token.clone())
    }
}

impl Drop for CaptureController {
    fn drop(&mut self) {
        if let Err(e) = self.stop() {
            warn!("Capture worker did not stop cleanly: {}", e);
        }
    }
}

fn join(running: Running) -> Result<WorkerReport, PipelineError> {
    running.handle.join().map_err(|_| PipelineError::WorkerPanicked)
}
