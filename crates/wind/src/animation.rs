use std::ops::ControlFlow;
use std::sync::Arc;

use parking_lot::Mutex;
use runtime::frame_loop::FrameLoop;

use crate::animator::WindFieldAnimator;
use crate::field::WindVector;
use crate::render::RenderFrame;

pub type SharedAnimator = Arc<Mutex<WindFieldAnimator>>;

/// A running wind overlay: the animator plus the frame loop that ticks it.
///
/// Each frame ticks and renders under the animator lock, so a concurrent
/// [`reseed`](WindAnimation::reseed) is seen either entirely or not at all.
/// Dropping the value cancels the loop.
pub struct WindAnimation {
    animator: SharedAnimator,
    frame_loop: FrameLoop,
}

impl WindAnimation {
    /// Starts ticking at `rate_hz`, handing every rendered frame to `sink`.
    /// The loop ends early if `sink` returns `ControlFlow::Break`.
    pub fn start<F>(animator: WindFieldAnimator, rate_hz: f64, mut sink: F) -> Self
    where
        F: FnMut(RenderFrame) -> ControlFlow<()> + Send + 'static,
    {
        let animator = Arc::new(Mutex::new(animator));
        let shared = animator.clone();
        let frame_loop = FrameLoop::start(rate_hz, move |_frame| {
            let rendered = {
                let mut a = shared.lock();
                a.tick();
                a.render()
            };
            sink(rendered)
        });
        Self {
            animator,
            frame_loop,
        }
    }

    pub fn animator(&self) -> &SharedAnimator {
        &self.animator
    }

    pub fn reseed(&self, wind: WindVector) {
        self.animator.lock().reseed(wind);
    }

    pub fn is_running(&self) -> bool {
        self.frame_loop.is_running()
    }

    pub fn frames_run(&self) -> u64 {
        self.frame_loop.frames_run()
    }

    pub fn stop(&mut self) {
        self.frame_loop.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::WindAnimation;
    use crate::animator::{AnimatorConfig, WindFieldAnimator};
    use crate::field::WindVector;
    use foundation::bounds::Viewport;
    use std::ops::ControlFlow;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::time::Duration;

    fn animator() -> WindFieldAnimator {
        let config = AnimatorConfig {
            particles: 50,
            seed: Some(1),
            ..AnimatorConfig::default()
        };
        WindFieldAnimator::new(config, Viewport::new(200.0, 100.0), WindVector::new(10.0, 0.0))
    }

    #[tokio::test(start_paused = true)]
    async fn ticks_until_stopped() {
        let mut anim = WindAnimation::start(animator(), 50.0, |frame| {
            assert_eq!(frame.dots().count(), 50);
            ControlFlow::Continue(())
        });
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert!(anim.is_running());
        let ticked = anim.animator().lock().ticks();
        assert!(ticked >= 5, "only {ticked} ticks");

        anim.stop();
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(anim.animator().lock().ticks(), ticked);
    }

    #[tokio::test(start_paused = true)]
    async fn reseed_applies_to_running_field() {
        let anim = WindAnimation::start(animator(), 50.0, |_| ControlFlow::Continue(()));
        tokio::time::sleep(Duration::from_millis(50)).await;
        anim.reseed(WindVector::new(0.0, 0.0));
        assert!(anim.animator().lock().particles().iter().all(|p| p.vx == 0.0 && p.vy == 0.0));
    }

    #[tokio::test(start_paused = true)]
    async fn sink_can_end_the_animation() {
        let seen = Arc::new(AtomicU64::new(0));
        let counter = seen.clone();
        let anim = WindAnimation::start(animator(), 50.0, move |frame| {
            counter.store(frame.index, Ordering::SeqCst);
            if frame.index >= 3 {
                ControlFlow::Break(())
            } else {
                ControlFlow::Continue(())
            }
        });
        tokio::time::sleep(Duration::from_millis(500)).await;
        assert!(!anim.is_running());
        assert_eq!(seen.load(Ordering::SeqCst), 3);
    }
}
