use rand::rngs::StdRng;
use rand::Rng;

use crate::render::Rgb;

/// Frames of flame build-up before the vehicle moves (~2 s at 30 fps).
pub(crate) const RAMP_FRAMES: u32 = 60;
const ACCEL: f32 = 0.02;
const MAX_VELOCITY: f32 = 0.9;
const MAX_PARTICLES: usize = 240;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum ParticleKind {
    Flame,
    Vent,
}

#[derive(Clone, Copy, Debug)]
pub(crate) struct ExhaustParticle {
    pub(crate) x: f32,
    pub(crate) y: f32,
    vx: f32,
    vy: f32,
    age: f32,
    lifetime: f32,
    pub(crate) kind: ParticleKind,
}

impl ExhaustParticle {
    pub(crate) fn age_ratio(&self) -> f32 {
        (self.age / self.lifetime).clamp(0.0, 1.0)
    }
}

/// Exhaust temperature gradient as a discrete palette keyed by age bucket:
/// young particles sit in the white core, old ones in the red fringe.
pub(crate) fn particle_color(p: &ExhaustParticle) -> Rgb {
    match p.kind {
        ParticleKind::Vent => Rgb::hex("#d8d8d8"),
        ParticleKind::Flame => {
            let r = p.age_ratio();
            if r < 0.25 {
                Rgb::hex("#ffffff")
            } else if r < 0.5 {
                Rgb::hex("#ffee66")
            } else if r < 0.75 {
                Rgb::hex("#ff8800")
            } else {
                Rgb::hex("#dd2200")
            }
        }
    }
}

/// What one animation tick produced, for the caller to act on.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) enum LiftoffStep {
    Inactive,
    /// Flame ramp; vehicle has not moved.
    Ramping,
    /// Vehicle moved up by `dy` this frame; translate the rocket tag.
    Rising { dy: f32 },
    /// Off-screen threshold crossed. Returned exactly once per start.
    Complete,
}

/// Two-phase liftoff sequence driven by a fixed-tick frame counter.
pub(crate) struct Liftoff {
    active: bool,
    frame: u32,
    velocity: f32,
    displacement: f32,
    intensity: f32,
    off_screen: f32,
    pad_x: f32,
    pad_y: f32,
    particles: Vec<ExhaustParticle>,
}

impl Liftoff {
    pub(crate) fn new() -> Self {
        Self {
            active: false,
            frame: 0,
            velocity: 0.0,
            displacement: 0.0,
            intensity: 0.0,
            off_screen: 0.0,
            pad_x: 0.0,
            pad_y: 0.0,
            particles: Vec::new(),
        }
    }

    /// Begin the sequence. Re-entry while active is a silent no-op.
    pub(crate) fn start(&mut self, pad_x: f32, pad_y: f32, off_screen: f32) {
        if self.active {
            return;
        }
        self.active = true;
        self.frame = 0;
        self.velocity = 0.0;
        self.displacement = 0.0;
        self.intensity = 0.0;
        self.off_screen = off_screen;
        self.pad_x = pad_x;
        self.pad_y = pad_y;
        self.particles.clear();
    }

    pub(crate) fn is_active(&self) -> bool {
        self.active
    }

    pub(crate) fn intensity(&self) -> f32 {
        self.intensity
    }

    /// Immediate cancel: clears exhaust and guarantees `Complete` is never
    /// reported for this run.
    pub(crate) fn stop(&mut self) {
        self.active = false;
        self.particles.clear();
    }

    pub(crate) fn step(&mut self, rng: &mut StdRng) -> LiftoffStep {
        if !self.active {
            return LiftoffStep::Inactive;
        }
        self.frame += 1;

        let nozzle_y = self.pad_y - self.displacement;
        self.advance_particles();

        if self.frame < RAMP_FRAMES {
            self.intensity = self.frame as f32 / RAMP_FRAMES as f32;
            self.emit(self.pad_x, nozzle_y, rng);
            return LiftoffStep::Ramping;
        }

        self.intensity = 1.0;
        self.velocity = (self.velocity + ACCEL).min(MAX_VELOCITY);
        self.displacement += self.velocity;
        self.emit(self.pad_x, self.pad_y - self.displacement, rng);

        if self.displacement > self.off_screen {
            self.active = false;
            self.particles.clear();
            return LiftoffStep::Complete;
        }
        LiftoffStep::Rising { dy: self.velocity }
    }

    fn emit(&mut self, x: f32, y: f32, rng: &mut StdRng) {
        let count = (1.0 + self.intensity * 6.0) as usize;
        for _ in 0..count {
            if self.particles.len() >= MAX_PARTICLES {
                break;
            }
            self.particles.push(ExhaustParticle {
                x: x + rng.gen_range(-1.5..1.5) * self.intensity.max(0.2),
                y: y + rng.gen_range(0.0..1.0),
                vx: rng.gen_range(-0.15..0.15),
                vy: rng.gen_range(0.2..0.6),
                age: 0.0,
                lifetime: rng.gen_range(6.0..14.0),
                kind: ParticleKind::Flame,
            });
        }
        // side venting puffs during the build-up
        if self.frame < RAMP_FRAMES && rng.gen::<f32>() < 0.4 {
            let side = if rng.gen_bool(0.5) { -1.0 } else { 1.0 };
            self.particles.push(ExhaustParticle {
                x: x + side * 2.0,
                y: y - rng.gen_range(2.0..5.0),
                vx: side * rng.gen_range(0.05..0.2),
                vy: rng.gen_range(-0.1..0.05),
                age: 0.0,
                lifetime: rng.gen_range(8.0..16.0),
                kind: ParticleKind::Vent,
            });
        }
    }

    fn advance_particles(&mut self) {
        for p in &mut self.particles {
            p.age += 1.0;
            p.x += p.vx;
            p.y += p.vy;
        }
        self.particles.retain(|p| p.age <= p.lifetime);
    }

    /// Live particles sorted by vertical position so later/nearer ones paint
    /// over the ones behind.
    pub(crate) fn particles_depth_sorted(&self) -> Vec<&ExhaustParticle> {
        let mut out: Vec<&ExhaustParticle> = self.particles.iter().collect();
        out.sort_by(|a, b| a.y.total_cmp(&b.y));
        out
    }

    #[cfg(test)]
    fn particle_count(&self) -> usize {
        self.particles.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn run_to_completion(l: &mut Liftoff, rng: &mut StdRng, max_frames: u32) -> u32 {
        let mut completions = 0;
        for _ in 0..max_frames {
            if l.step(rng) == LiftoffStep::Complete {
                completions += 1;
            }
        }
        completions
    }

    #[test]
    fn completes_exactly_once_and_only_after_threshold() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut l = Liftoff::new();
        l.start(74.0, 24.0, 40.0);

        let mut frames = 0u32;
        let mut completions = 0u32;
        loop {
            frames += 1;
            match l.step(&mut rng) {
                LiftoffStep::Complete => {
                    completions += 1;
                    break;
                }
                LiftoffStep::Ramping => assert!(frames < RAMP_FRAMES),
                LiftoffStep::Rising { dy } => {
                    assert!(dy > 0.0 && dy <= MAX_VELOCITY);
                }
                LiftoffStep::Inactive => panic!("went inactive mid-run"),
            }
            assert!(frames < 10_000, "never completed");
        }
        assert!(l.displacement > 40.0);
        assert_eq!(completions, 1);
        // further stepping stays inert
        assert_eq!(run_to_completion(&mut l, &mut rng, 100), 0);
    }

    #[test]
    fn stop_suppresses_completion_forever() {
        let mut rng = StdRng::seed_from_u64(2);
        let mut l = Liftoff::new();
        l.start(74.0, 24.0, 40.0);
        for _ in 0..30 {
            l.step(&mut rng);
        }
        l.stop();
        assert!(!l.is_active());
        assert_eq!(l.particle_count(), 0);
        assert_eq!(run_to_completion(&mut l, &mut rng, 10_000), 0);
    }

    #[test]
    fn start_while_active_is_a_no_op() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut l = Liftoff::new();
        l.start(74.0, 24.0, 40.0);
        for _ in 0..20 {
            l.step(&mut rng);
        }
        let frame_before = l.frame;
        l.start(74.0, 24.0, 40.0);
        assert_eq!(l.frame, frame_before, "restart must not rewind the run");
        // a single animation instance: still completes exactly once
        assert_eq!(run_to_completion(&mut l, &mut rng, 10_000), 1);
    }

    #[test]
    fn intensity_ramps_to_one_then_holds() {
        let mut rng = StdRng::seed_from_u64(4);
        let mut l = Liftoff::new();
        l.start(74.0, 24.0, 200.0);
        let mut last = 0.0f32;
        for _ in 0..(RAMP_FRAMES - 1) {
            l.step(&mut rng);
            assert!(l.intensity() >= last);
            assert!(l.intensity() < 1.0);
            last = l.intensity();
        }
        l.step(&mut rng);
        assert_eq!(l.intensity(), 1.0);
    }

    #[test]
    fn particle_pool_is_bounded_and_ages_out() {
        let mut rng = StdRng::seed_from_u64(5);
        let mut l = Liftoff::new();
        l.start(74.0, 24.0, 1000.0);
        for _ in 0..500 {
            l.step(&mut rng);
            assert!(l.particle_count() <= MAX_PARTICLES);
        }
        l.stop();
        assert_eq!(l.particle_count(), 0);
    }

    #[test]
    fn palette_buckets_by_age() {
        let mk = |age: f32| ExhaustParticle {
            x: 0.0,
            y: 0.0,
            vx: 0.0,
            vy: 0.0,
            age,
            lifetime: 10.0,
            kind: ParticleKind::Flame,
        };
        assert_eq!(particle_color(&mk(0.0)), Rgb::hex("#ffffff"));
        assert_eq!(particle_color(&mk(3.0)), Rgb::hex("#ffee66"));
        assert_eq!(particle_color(&mk(6.0)), Rgb::hex("#ff8800"));
        assert_eq!(particle_color(&mk(9.0)), Rgb::hex("#dd2200"));
    }
}
