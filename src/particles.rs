//! Transient scene elements: drifting and burst particles, pulse rings and
//! the eased points of the match-density graph.

use crate::render_layers::palette;
use eframe::egui::{Color32, Pos2, Vec2, pos2, vec2};
use rand::Rng;
use std::f32::consts::TAU;

pub const AMBIENT_PARTICLE_COUNT: usize = 60;
pub const BURST_PARTICLE_COUNT: usize = 20;
pub const LIFE_DECAY_PER_FRAME: f32 = 0.015;
const PHASE_STEP: f32 = 0.05;
const AMBIENT_ALPHA: f32 = 0.6;

pub const RING_COUNT: usize = 3;
pub const RING_FLOOR: f32 = 30.0;
pub const RING_MAX_RADIUS: f32 = 150.0;
const RING_MAX_OPACITY: f32 = 0.4;

pub const DENSITY_SMOOTHING: f32 = 0.08;
pub const DENSITY_BASELINE: f32 = 0.2;
pub const DENSITY_RANGE: f32 = 0.6;

#[derive(Clone, Debug, PartialEq)]
pub struct Particle {
    pub pos: Pos2,
    pub vel: Vec2,
    pub size: f32,
    pub color: Color32,
    pub phase: f32,
    /// Only burst particles age; `None` lives forever.
    pub life: Option<f32>,
}

impl Particle {
    pub fn ambient<R: Rng + ?Sized>(rng: &mut R, bounds: Vec2) -> Self {
        let colors = palette::PARTICLE_COLORS;
        Self {
            pos: pos2(
                rng.gen_range(0.0..bounds.x.max(1.0)),
                rng.gen_range(0.0..bounds.y.max(1.0)),
            ),
            vel: vec2(rng.gen_range(-0.25..0.25), rng.gen_range(-0.25..0.25)),
            size: rng.gen_range(1.0..3.0),
            color: colors[rng.gen_range(0..colors.len())],
            phase: rng.gen_range(0.0..TAU),
            life: None,
        }
    }

    pub fn burst<R: Rng + ?Sized>(rng: &mut R, origin: Pos2) -> Self {
        Self {
            pos: origin,
            vel: vec2(rng.gen_range(-2.0..2.0), rng.gen_range(-2.0..2.0)),
            size: rng.gen_range(2.0..5.0),
            color: palette::CYAN,
            phase: 0.0,
            life: Some(1.0),
        }
    }

    pub fn is_burst(&self) -> bool {
        self.life.is_some()
    }

    /// Advances one frame. Returns `false` once a burst particle is exhausted.
    pub fn step(&mut self, bounds: Vec2) -> bool {
        self.pos += self.vel;
        self.phase += PHASE_STEP;

        if self.pos.x < 0.0 || self.pos.x > bounds.x {
            self.vel.x = -self.vel.x;
            self.pos.x = self.pos.x.clamp(0.0, bounds.x);
        }
        if self.pos.y < 0.0 || self.pos.y > bounds.y {
            self.vel.y = -self.vel.y;
            self.pos.y = self.pos.y.clamp(0.0, bounds.y);
        }

        if let Some(life) = self.life.as_mut() {
            *life -= LIFE_DECAY_PER_FRAME;
            if *life <= 0.0 {
                return false;
            }
        }
        true
    }

    pub fn display_size(&self) -> f32 {
        self.size * (0.8 + self.phase.sin() * 0.2)
    }

    pub fn alpha(&self) -> f32 {
        self.life.unwrap_or(AMBIENT_ALPHA)
    }
}

pub fn ambient_field<R: Rng + ?Sized>(rng: &mut R, bounds: Vec2) -> Vec<Particle> {
    (0..AMBIENT_PARTICLE_COUNT)
        .map(|_| Particle::ambient(rng, bounds))
        .collect()
}

pub fn burst<R: Rng + ?Sized>(rng: &mut R, origin: Pos2) -> Vec<Particle> {
    (0..BURST_PARTICLE_COUNT)
        .map(|_| Particle::burst(rng, origin))
        .collect()
}

pub fn step_particles(particles: &mut Vec<Particle>, bounds: Vec2) {
    particles.retain_mut(|p| p.step(bounds));
}

#[derive(Clone, Debug, PartialEq)]
pub struct PulseRing {
    pub radius: f32,
    pub max_radius: f32,
    pub speed: f32,
}

impl PulseRing {
    pub fn default_set() -> Vec<Self> {
        (0..RING_COUNT)
            .map(|i| Self {
                radius: 50.0 + i as f32 * 40.0,
                max_radius: RING_MAX_RADIUS,
                speed: 0.5 + i as f32 * 0.2,
            })
            .collect()
    }

    pub fn step(&mut self) {
        self.radius += self.speed;
        if self.radius > self.max_radius {
            self.radius = RING_FLOOR;
        }
    }

    pub fn progress(&self) -> f32 {
        if self.max_radius <= 0.0 {
            return 1.0;
        }
        (self.radius / self.max_radius).clamp(0.0, 1.0)
    }

    pub fn opacity(&self) -> f32 {
        RING_MAX_OPACITY * (1.0 - self.progress())
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct DataPoint {
    /// Horizontal position in `0..1`.
    pub x: f32,
    pub value: f32,
    pub target: f32,
}

impl DataPoint {
    pub fn ease(&mut self) {
        self.value += (self.target - self.value) * DENSITY_SMOOTHING;
    }
}

/// Density points start on the baseline and ease towards their normalized bucket height.
pub fn density_points(buckets: &[usize]) -> Vec<DataPoint> {
    let max = buckets.iter().copied().max().unwrap_or(0).max(1) as f32;
    let n = buckets.len().max(1) as f32;
    buckets
        .iter()
        .enumerate()
        .map(|(i, &count)| DataPoint {
            x: i as f32 / n,
            value: DENSITY_BASELINE,
            target: DENSITY_BASELINE + (count as f32 / max) * DENSITY_RANGE,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{SeedableRng, rngs::StdRng};

    const BOUNDS: Vec2 = vec2(400.0, 300.0);

    #[test]
    fn burst_particle_is_removed_after_exactly_67_frames() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut particles = vec![Particle::burst(&mut rng, pos2(200.0, 150.0))];
        for frame in 1..=66 {
            step_particles(&mut particles, BOUNDS);
            assert_eq!(particles.len(), 1, "gone too early at frame {frame}");
        }
        step_particles(&mut particles, BOUNDS);
        assert!(particles.is_empty());
    }

    #[test]
    fn ambient_particles_never_expire() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut particles = ambient_field(&mut rng, BOUNDS);
        for _ in 0..500 {
            step_particles(&mut particles, BOUNDS);
        }
        assert_eq!(particles.len(), AMBIENT_PARTICLE_COUNT);
        assert!(particles.iter().all(|p| !p.is_burst()));
    }

    #[test]
    fn particles_reflect_off_edges_and_stay_inside() {
        let mut p = Particle {
            pos: pos2(399.5, 10.0),
            vel: vec2(2.0, -20.0),
            size: 2.0,
            color: palette::VIOLET,
            phase: 0.0,
            life: None,
        };
        assert!(p.step(BOUNDS));
        assert_eq!(p.vel, vec2(-2.0, 20.0));
        assert_eq!(p.pos, pos2(400.0, 0.0));
        for _ in 0..1000 {
            p.step(BOUNDS);
            assert!((0.0..=400.0).contains(&p.pos.x));
            assert!((0.0..=300.0).contains(&p.pos.y));
        }
    }

    #[test]
    fn ambient_field_is_seeded_inside_bounds() {
        let mut rng = StdRng::seed_from_u64(3);
        let field = ambient_field(&mut rng, BOUNDS);
        assert_eq!(field.len(), 60);
        for p in &field {
            assert!(p.pos.x >= 0.0 && p.pos.x < 400.0);
            assert!(p.pos.y >= 0.0 && p.pos.y < 300.0);
            assert!(p.vel.x.abs() <= 0.25 && p.vel.y.abs() <= 0.25);
            assert!((1.0..3.0).contains(&p.size));
        }
    }

    #[test]
    fn burst_spawns_twenty_live_particles_at_origin() {
        let mut rng = StdRng::seed_from_u64(5);
        let origin = pos2(12.0, 34.0);
        let particles = burst(&mut rng, origin);
        assert_eq!(particles.len(), BURST_PARTICLE_COUNT);
        assert!(particles.iter().all(|p| p.pos == origin && p.life == Some(1.0)));
    }

    #[test]
    fn pulse_ring_grows_then_resets_to_floor() {
        let mut ring = PulseRing {
            radius: 149.5,
            max_radius: RING_MAX_RADIUS,
            speed: 0.4,
        };
        ring.step();
        assert!((ring.radius - 149.9).abs() < 1e-4);
        ring.step();
        assert_eq!(ring.radius, RING_FLOOR);
    }

    #[test]
    fn pulse_ring_opacity_falls_linearly() {
        let ring = |radius| PulseRing {
            radius,
            max_radius: 150.0,
            speed: 1.0,
        };
        assert!((ring(0.0).opacity() - 0.4).abs() < 1e-6);
        assert!((ring(75.0).opacity() - 0.2).abs() < 1e-6);
        assert!(ring(150.0).opacity().abs() < 1e-6);
    }

    #[test]
    fn default_ring_set() {
        let rings = PulseRing::default_set();
        assert_eq!(rings.len(), 3);
        assert_eq!(rings[2].radius, 130.0);
        assert!((rings[2].speed - 0.9).abs() < 1e-6);
    }

    #[test]
    fn density_points_ease_towards_target() {
        let mut buckets = vec![0; 100];
        buckets[1] = 2;
        buckets[99] = 1;
        let mut points = density_points(&buckets);
        assert_eq!(points.len(), 100);
        assert!((points[1].target - 0.8).abs() < 1e-6);
        assert!((points[99].target - 0.5).abs() < 1e-6);
        assert_eq!(points[0].target, DENSITY_BASELINE);

        points[1].ease();
        assert!((points[1].value - (0.2 + 0.6 * 0.08)).abs() < 1e-6);
        for _ in 0..200 {
            points[1].ease();
        }
        assert!((points[1].value - 0.8).abs() < 1e-3);
    }
}
