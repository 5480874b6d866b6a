//! Display-rate callback loop with a scoped lifetime.
//!
//! [`FrameLoop`] owns the task that calls back once per frame. The task is
//! aborted when the handle is stopped or dropped, so a loop can never outlive
//! the component that started it.

use std::ops::ControlFlow;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::debug;

use crate::frame::{Frame, FrameClock};

pub struct FrameLoop {
    task: Option<JoinHandle<()>>,
    frames: Arc<AtomicU64>,
}

impl FrameLoop {
    /// Starts calling `on_frame` at `rate_hz` until it returns
    /// `ControlFlow::Break`, or until the loop is stopped or dropped.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start<F>(rate_hz: f64, mut on_frame: F) -> Self
    where
        F: FnMut(Frame) -> ControlFlow<()> + Send + 'static,
    {
        let frames = Arc::new(AtomicU64::new(0));
        let counter = frames.clone();
        let mut clock = FrameClock::new(rate_hz);

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(clock.interval());
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                let frame = clock.tick();
                counter.fetch_add(1, Ordering::Relaxed);
                if on_frame(frame).is_break() {
                    debug!("frame loop finished at frame {}", frame.index);
                    break;
                }
            }
        });

        Self {
            task: Some(task),
            frames,
        }
    }

    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|t| !t.is_finished())
    }

    pub fn frames_run(&self) -> u64 {
        self.frames.load(Ordering::Relaxed)
    }

    /// Cancels the loop. Idempotent.
    pub fn stop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            debug!("frame loop cancelled after {} frames", self.frames_run());
        }
    }
}

impl Drop for FrameLoop {
    fn drop(&mut self) {
        self.stop();
    }
}
