use foundation::bounds::Viewport;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::debug;

use crate::field::WindVector;
use crate::particle::Particle;
use crate::render::{RenderCommand, RenderFrame, Rgba};

/// Particle colour; alpha is taken from each particle's remaining life.
pub const PARTICLE_RGB: (u8, u8, u8) = (59, 130, 246);
const MAX_ALPHA: f64 = 0.5;
const DOT_RADIUS: f64 = 2.0;

#[derive(Debug, Clone, PartialEq)]
pub struct AnimatorConfig {
    pub particles: usize,
    /// Divisor turning km/h into pixels per tick.
    pub speed_scale: f64,
    /// Lifetime in ticks.
    pub max_life: f64,
    /// Fixed RNG seed; `None` seeds from the OS.
    pub seed: Option<u64>,
}

impl Default for AnimatorConfig {
    fn default() -> Self {
        Self {
            particles: 300,
            speed_scale: 10.0,
            max_life: 100.0,
            seed: None,
        }
    }
}

/// Fixed-size particle pool advected by a uniform wind.
///
/// All particles share one velocity. Changing the wind only rewrites
/// velocities ([`reseed`](Self::reseed)); positions and lives carry over so
/// scrubbing the timeline does not make the field jump.
pub struct WindFieldAnimator {
    config: AnimatorConfig,
    viewport: Viewport,
    wind: WindVector,
    particles: Vec<Particle>,
    rng: StdRng,
    ticks: u64,
    recycled: u64,
}

impl WindFieldAnimator {
    pub fn new(config: AnimatorConfig, viewport: Viewport, wind: WindVector) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        let mut animator = Self {
            config,
            viewport,
            wind,
            particles: Vec::new(),
            rng,
            ticks: 0,
            recycled: 0,
        };
        animator.reinitialize();
        animator
    }

    pub fn config(&self) -> &AnimatorConfig {
        &self.config
    }

    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }

    pub fn wind(&self) -> WindVector {
        self.wind
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn recycled(&self) -> u64 {
        self.recycled
    }

    fn velocity(&self) -> (f64, f64) {
        self.wind.velocity(self.config.speed_scale)
    }

    fn random_position(&mut self) -> (f64, f64) {
        let x = self.rng.random::<f64>() * self.viewport.width;
        let y = self.rng.random::<f64>() * self.viewport.height;
        (x, y)
    }

    /// Rebuilds the whole pool: uniform positions, staggered lives in
    /// `[0, max_life)`.
    pub fn reinitialize(&mut self) {
        let (vx, vy) = self.velocity();
        let max_life = self.config.max_life;
        let mut particles = Vec::with_capacity(self.config.particles);
        for _ in 0..self.config.particles {
            let (x, y) = self.random_position();
            particles.push(Particle {
                x,
                y,
                vx,
                vy,
                life: self.rng.random::<f64>() * max_life,
                max_life,
            });
        }
        self.particles = particles;
        debug!(
            particles = self.particles.len(),
            speed = self.wind.speed,
            direction = self.wind.direction_deg,
            "wind field initialised"
        );
    }

    /// Applies a new wind to every particle in place.
    pub fn reseed(&mut self, wind: WindVector) {
        self.wind = wind;
        let (vx, vy) = self.velocity();
        for p in &mut self.particles {
            p.vx = vx;
            p.vy = vy;
        }
    }

    /// Tracks a resized surface. Particles now outside are recycled on the
    /// next tick.
    pub fn resize(&mut self, viewport: Viewport) {
        self.viewport = viewport;
    }

    pub fn tick(&mut self) {
        let viewport = self.viewport;
        for i in 0..self.particles.len() {
            if self.particles[i].advance(&viewport) {
                let (x, y) = self.random_position();
                let p = &mut self.particles[i];
                p.x = x;
                p.y = y;
                p.life = p.max_life;
                self.recycled += 1;
            }
        }
        self.ticks += 1;
    }

    pub fn render(&self) -> RenderFrame {
        let (r, g, b) = PARTICLE_RGB;
        let mut commands = Vec::with_capacity(self.particles.len() + 1);
        commands.push(RenderCommand::Clear);
        if self.viewport.is_empty() {
            return RenderFrame {
                index: self.ticks,
                commands,
            };
        }
        commands.extend(self.particles.iter().map(|p| RenderCommand::Dot {
            x: p.x,
            y: p.y,
            radius: DOT_RADIUS,
            color: Rgba {
                r,
                g,
                b,
                a: p.life_fraction() * MAX_ALPHA,
            },
        }));
        RenderFrame {
            index: self.ticks,
            commands,
        }
    }
}
