use foundation::bounds::Viewport;

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Particle {
    pub x: f64,
    pub y: f64,
    pub vx: f64,
    pub vy: f64,
    /// Remaining ticks, in `(0, max_life]` between ticks.
    pub life: f64,
    pub max_life: f64,
}

impl Particle {
    /// Moves one tick and ages by one. Returns true when the particle left
    /// the viewport or expired and must be recycled.
    pub fn advance(&mut self, viewport: &Viewport) -> bool {
        self.x += self.vx;
        self.y += self.vy;
        self.life -= 1.0;
        self.life <= 0.0 || !viewport.contains(self.x, self.y)
    }

    /// Remaining life as a fraction of `max_life`.
    pub fn life_fraction(&self) -> f64 {
        if self.max_life <= 0.0 {
            return 0.0;
        }
        (self.life / self.max_life).clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::Particle;
    use foundation::bounds::Viewport;

    fn particle(x: f64, vx: f64, life: f64) -> Particle {
        Particle {
            x,
            y: 5.0,
            vx,
            vy: 0.0,
            life,
            max_life: 100.0,
        }
    }

    #[test]
    fn leaving_viewport_needs_recycle() {
        let vp = Viewport::new(10.0, 10.0);
        let mut p = particle(9.5, 1.0, 50.0);
        assert!(p.advance(&vp));
    }

    #[test]
    fn expiry_needs_recycle() {
        let vp = Viewport::new(10.0, 10.0);
        let mut p = particle(5.0, 0.0, 1.0);
        assert!(p.advance(&vp));
        let mut q = particle(5.0, 0.0, 2.0);
        assert!(!q.advance(&vp));
        assert_eq!(q.life_fraction(), 0.01);
    }
}
