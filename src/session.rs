use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};

use log::{error, info};

use crate::error::{ReprojectError, Result};
use crate::pipeline::DepthPipeline;
use crate::source::DepthSource;

/// Owns one capture thread pumping a [`DepthSource`] into a [`DepthPipeline`].
///
/// The source moves into the thread on [`start`](CaptureSession::start) and
/// comes back when [`stop`](CaptureSession::stop) joins it, so a session can
/// be restarted, unless the thread panicked and took the source with it.
/// Dropping a running session stops it.
pub struct CaptureSession {
    source: Option<Box<dyn DepthSource>>,
    pipeline: Arc<DepthPipeline>,
    running: Arc<AtomicBool>,
    thread_handle: Option<JoinHandle<Box<dyn DepthSource>>>,
}

impl CaptureSession {
    pub fn new(source: Box<dyn DepthSource>, pipeline: Arc<DepthPipeline>) -> CaptureSession {
        CaptureSession {
            source: Some(source),
            pipeline,
            running: Arc::new(AtomicBool::new(false)),
            thread_handle: None,
        }
    }

    pub fn pipeline(&self) -> &Arc<DepthPipeline> {
        &self.pipeline
    }

    /// True while the capture thread is pumping. Turns false by itself once
    /// the source is exhausted or fails.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    pub fn start(&mut self) -> Result<()> {
        if self.thread_handle.is_some() {
            return Err(ReprojectError::AlreadyRunning);
        }
        let mut source = self.source.take().ok_or(ReprojectError::SourceLost)?;
        let name = source.name();
        let pipeline = self.pipeline.clone();
        let running = self.running.clone();
        running.store(true, Ordering::Release);

        let spawned = thread::Builder::new()
            .name("depth-capture".to_string())
            .spawn(move || {
                Self::capture_thread(source.as_mut(), &pipeline, &running);
                running.store(false, Ordering::Release);
                source
            });
        match spawned {
            Ok(handle) => {
                info!("capture started: {}", name);
                self.thread_handle = Some(handle);
                Ok(())
            }
            Err(e) => {
                // the closure, and the source with it, is gone
                self.running.store(false, Ordering::Release);
                Err(ReprojectError::ThreadSpawn(e))
            }
        }
    }

    fn capture_thread(
        source: &mut dyn DepthSource,
        pipeline: &DepthPipeline,
        running: &AtomicBool,
    ) {
        while running.load(Ordering::Acquire) {
            match source.process_events(pipeline) {
                Ok(true) => {}
                Ok(false) => {
                    info!("{} has no more frames", source.name());
                    break;
                }
                Err(e) => {
                    error!("{} failed: {}", source.name(), e);
                    break;
                }
            }
        }
    }

    /// Signals the capture thread and joins it. Returns the number of depth
    /// frames processed so far.
    pub fn stop(&mut self) -> Result<u64> {
        let handle = self.thread_handle.take().ok_or(ReprojectError::NotRunning)?;
        self.running.store(false, Ordering::Release);
        Ok(self.join(handle))
    }

    /// Blocks until the source runs dry, then joins the thread.
    pub fn wait(&mut self) -> Result<u64> {
        let handle = self.thread_handle.take().ok_or(ReprojectError::NotRunning)?;
        Ok(self.join(handle))
    }

    fn join(&mut self, handle: JoinHandle<Box<dyn DepthSource>>) -> u64 {
        match handle.join() {
            Ok(source) => self.source = Some(source),
            Err(_) => {
                self.running.store(false, Ordering::Release);
                error!("capture thread panicked, its source is gone");
            }
        }
        let engine = self.pipeline.engine();
        let frames = engine.frames_processed();
        info!(
            "capture stopped after {} frames (last pass {:?})",
            frames,
            engine.last_pass_duration()
        );
        frames
    }
}

impl Drop for CaptureSession {
    fn drop(&mut self) {
        if self.thread_handle.is_some() {
            let _ = self.stop();
        }
    }
}
