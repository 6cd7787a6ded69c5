use rand::rngs::StdRng;
use rand::Rng;
use std::collections::VecDeque;

use crate::render::Rgb;

/* ----------------------------
   Birds
---------------------------- */

/// Vertical clearance kept between birds when (re)spawning.
const BIRD_MIN_SEPARATION: f32 = 3.0;
const BIRD_FLAP_TICKS: u32 = 8;

#[derive(Clone, Debug)]
pub(crate) struct Bird {
    pub(crate) x: f32,
    pub(crate) y: f32,
    pub(crate) vx: f32,
    pub(crate) vy: f32,
    pub(crate) min_y: f32,
    pub(crate) max_y: f32,
    pub(crate) flap_up: bool,
    flap_counter: u32,
}

fn bird_speeds(rng: &mut StdRng) -> (f32, f32) {
    (rng.gen_range(0.25..0.55), rng.gen_range(-0.06..0.06))
}

/// Pick a y at least [`BIRD_MIN_SEPARATION`] from every occupied y.
/// Rejection sampling; the band is wide enough that a handful of birds
/// always fits, but a bounded attempt count keeps this total.
fn separated_y(occupied: &[f32], min_y: f32, max_y: f32, rng: &mut StdRng) -> f32 {
    for _ in 0..64 {
        let y = rng.gen_range(min_y..max_y);
        if occupied
            .iter()
            .all(|o| (y - o).abs() >= BIRD_MIN_SEPARATION)
        {
            return y;
        }
    }
    rng.gen_range(min_y..max_y)
}

pub(crate) fn spawn_birds(count: usize, min_y: f32, max_y: f32, rng: &mut StdRng) -> Vec<Bird> {
    let mut birds: Vec<Bird> = Vec::with_capacity(count);
    for i in 0..count {
        let occupied: Vec<f32> = birds.iter().map(|b| b.y).collect();
        let y = separated_y(&occupied, min_y, max_y, rng);
        let (vx, vy) = bird_speeds(rng);
        birds.push(Bird {
            x: -8.0 - (i as f32) * 14.0,
            y,
            vx,
            vy,
            min_y,
            max_y,
            flap_up: true,
            flap_counter: 0,
        });
    }
    birds
}

/// One bird tick for the whole flock: flap, drift, bounce at the vertical
/// bounds, respawn off the left edge after leaving the right edge.
pub(crate) fn update_birds(birds: &mut [Bird], scene_w: f32, rng: &mut StdRng) {
    let n = birds.len();
    for i in 0..n {
        let b = &mut birds[i];
        b.flap_counter += 1;
        if b.flap_counter >= BIRD_FLAP_TICKS {
            b.flap_counter = 0;
            b.flap_up = !b.flap_up;
        }

        b.x += b.vx;
        b.y += b.vy;
        if b.y <= b.min_y || b.y >= b.max_y {
            b.y = b.y.clamp(b.min_y, b.max_y);
            b.vy = -b.vy;
        }

        if b.x > scene_w + 4.0 {
            let (min_y, max_y) = (b.min_y, b.max_y);
            let occupied: Vec<f32> = birds
                .iter()
                .enumerate()
                .filter(|(j, _)| *j != i)
                .map(|(_, o)| o.y)
                .collect();
            let y = separated_y(&occupied, min_y, max_y, rng);
            let (vx, vy) = bird_speeds(rng);
            let b = &mut birds[i];
            b.x = -4.0;
            b.y = y;
            b.vx = vx;
            b.vy = vy;
        }
    }
}

/* ----------------------------
   Cars and the visitor gate
---------------------------- */

pub(crate) const CAR_GAP: f32 = 7.0;
const CAR_COLORS: [&str; 5] = ["#3a7bc8", "#d44444", "#f5f5f5", "#2a2a2a", "#ffd93d"];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum CarState {
    Approaching,
    Waiting,
    Entering,
    Driving,
}

#[derive(Clone, Debug)]
pub(crate) struct Car {
    pub(crate) x: f32,
    pub(crate) speed: f32,
    pub(crate) color: Rgb,
    pub(crate) state: CarState,
    waiting_since: u64,
}

fn fresh_car(x: f32, rng: &mut StdRng) -> Car {
    Car {
        x,
        speed: rng.gen_range(0.25..0.55),
        color: Rgb::hex(CAR_COLORS[rng.gen_range(0..CAR_COLORS.len())]),
        state: CarState::Approaching,
        waiting_since: 0,
    }
}

pub(crate) fn spawn_cars(count: usize, rng: &mut StdRng) -> Vec<Car> {
    (0..count)
        .map(|i| fresh_car(-6.0 - (i as f32) * (CAR_GAP + 4.0), rng))
        .collect()
}

/// Advance every car one tick. Cars approach the gate at `gate_x`, queue up
/// behind the stop line keeping [`CAR_GAP`] to the car ahead, and exactly one
/// waiting car (the one waiting longest) is admitted when `gate_open` is set.
/// Cars past the gate drive off and respawn with fresh color and speed.
pub(crate) fn update_cars(
    cars: &mut [Car],
    gate_x: f32,
    scene_w: f32,
    gate_open: bool,
    tick: u64,
    rng: &mut StdRng,
) {
    // admission first so the freed slot opens up this same tick
    if gate_open {
        if let Some(idx) = cars
            .iter()
            .enumerate()
            .filter(|(_, c)| c.state == CarState::Waiting)
            .min_by_key(|(_, c)| c.waiting_since)
            .map(|(i, _)| i)
        {
            cars[idx].state = CarState::Entering;
        }
    }

    let stop_line = gate_x - 2.0;
    let n = cars.len();
    for i in 0..n {
        // nearest car ahead, before the gate
        let ahead = cars
            .iter()
            .enumerate()
            .filter(|(j, o)| {
                *j != i
                    && o.x > cars[i].x
                    && matches!(
                        o.state,
                        CarState::Approaching | CarState::Waiting | CarState::Entering
                    )
            })
            .min_by(|(_, a), (_, b)| a.x.total_cmp(&b.x))
            .map(|(_, o)| (o.x, o.state));

        let c = &mut cars[i];
        match c.state {
            CarState::Approaching => {
                // the stop line anchors the queue; a car only counts as
                // waiting once it is held by the line or by an already
                // waiting car, so admission order matches road order
                let mut limit = stop_line;
                let mut queue_block = true;
                if let Some((ax, astate)) = ahead {
                    if ax - CAR_GAP < limit {
                        limit = ax - CAR_GAP;
                        queue_block = astate == CarState::Waiting;
                    }
                }
                let next = c.x + c.speed;
                if next >= limit {
                    c.x = limit.max(c.x);
                    if queue_block {
                        c.state = CarState::Waiting;
                        c.waiting_since = tick;
                    }
                } else {
                    c.x = next;
                }
            }
            CarState::Waiting => {
                // creep forward as the queue compresses, never past the line
                let mut limit = stop_line;
                if let Some((ax, _)) = ahead {
                    limit = limit.min(ax - CAR_GAP);
                }
                if c.x + 0.01 < limit {
                    c.x = (c.x + c.speed).min(limit);
                }
            }
            CarState::Entering => {
                c.x += c.speed;
                if c.x > gate_x + 3.0 {
                    c.state = CarState::Driving;
                }
            }
            CarState::Driving => {
                c.x += c.speed;
                if c.x > scene_w + 6.0 {
                    *c = fresh_car(-6.0, rng);
                }
            }
        }
    }
}

/* ----------------------------
   Aircraft flyby
---------------------------- */

pub(crate) const TRAIL_MAX: usize = 30;
const FLYBY_MIN_SECS: f32 = 45.0;
const FLYBY_MAX_SECS: f32 = 60.0;

#[derive(Clone, Debug)]
pub(crate) struct Aircraft {
    pub(crate) active: bool,
    pub(crate) x: f32,
    pub(crate) y: f32,
    pub(crate) dir: f32,
    pub(crate) speed: f32,
    pub(crate) trail: VecDeque<(f32, f32)>,
    next_flyby_in: f32,
}

impl Aircraft {
    pub(crate) fn new(rng: &mut StdRng) -> Self {
        Self {
            active: false,
            x: 0.0,
            y: 0.0,
            dir: 1.0,
            speed: 14.0,
            trail: VecDeque::new(),
            next_flyby_in: rng.gen_range(FLYBY_MIN_SECS..FLYBY_MAX_SECS),
        }
    }

    pub(crate) fn update(&mut self, dt: f32, scene_w: f32, rng: &mut StdRng) {
        if !self.active {
            self.next_flyby_in -= dt;
            if self.next_flyby_in <= 0.0 {
                self.active = true;
                self.dir = if rng.gen_bool(0.5) { 1.0 } else { -1.0 };
                self.y = rng.gen_range(2.0..8.0);
                self.x = if self.dir > 0.0 { -10.0 } else { scene_w + 10.0 };
                self.trail.clear();
            }
            return;
        }

        self.x += self.speed * self.dir * dt;

        // occasional trail puff at the exhaust; oldest segment evicted first
        if rng.gen::<f32>() < 0.3 {
            self.trail.push_back((self.x - self.dir * 5.0, self.y));
            while self.trail.len() > TRAIL_MAX {
                self.trail.pop_front();
            }
        }

        let gone = if self.dir > 0.0 {
            self.x > scene_w + 10.0
        } else {
            self.x < -10.0
        };
        if gone {
            self.active = false;
            self.trail.clear();
            self.next_flyby_in = rng.gen_range(FLYBY_MIN_SECS..FLYBY_MAX_SECS);
        }
    }
}

/* ----------------------------
   Clouds
---------------------------- */

#[derive(Clone, Debug)]
pub(crate) struct Cloud {
    pub(crate) x: f32,
    pub(crate) y: f32,
    pub(crate) w: f32,
}

pub(crate) fn spawn_clouds(count: usize, scene_w: f32, rng: &mut StdRng) -> Vec<Cloud> {
    (0..count)
        .map(|_| Cloud {
            x: rng.gen_range(-10.0..scene_w),
            y: rng.gen_range(1.0..6.0),
            w: rng.gen_range(5.0..10.0),
        })
        .collect()
}

pub(crate) fn update_clouds(clouds: &mut [Cloud], scene_w: f32) {
    for c in clouds {
        c.x += 0.12;
        if c.x - c.w > scene_w {
            c.x = -c.w - 2.0;
        }
    }
}

/* ----------------------------
   Pond gator
---------------------------- */

const GATOR_CYCLE_SECS: u32 = 30;
const GATOR_VISIBLE_SECS: u32 = 5;

#[derive(Clone, Copy, Debug)]
pub(crate) struct Gator {
    phase: u32,
}

impl Gator {
    pub(crate) fn new() -> Self {
        Self { phase: 0 }
    }

    pub(crate) fn tick_second(&mut self) {
        self.phase = (self.phase + 1) % GATOR_CYCLE_SECS;
    }

    pub(crate) fn visible(&self) -> bool {
        self.phase < GATOR_VISIBLE_SECS
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn birds_stay_inside_vertical_bounds() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut birds = spawn_birds(3, 3.0, 12.0, &mut rng);
        for _ in 0..5000 {
            update_birds(&mut birds, 96.0, &mut rng);
            for b in &birds {
                assert!(b.y >= b.min_y && b.y <= b.max_y, "bird at y={}", b.y);
            }
        }
    }

    #[test]
    fn spawn_sampling_respects_separation() {
        let mut rng = StdRng::seed_from_u64(11);
        for _ in 0..200 {
            let occupied = vec![5.0];
            let y = separated_y(&occupied, 3.0, 12.0, &mut rng);
            assert!(occupied
                .iter()
                .all(|o| (y - o).abs() >= BIRD_MIN_SEPARATION));
        }
        let birds = spawn_birds(3, 3.0, 20.0, &mut rng);
        for i in 0..birds.len() {
            for j in (i + 1)..birds.len() {
                assert!((birds[i].y - birds[j].y).abs() >= BIRD_MIN_SEPARATION);
            }
        }
    }

    #[test]
    fn gate_admits_exactly_one_waiting_car_fifo() {
        let mut rng = StdRng::seed_from_u64(3);
        let gate_x = 40.0;
        let mut cars = spawn_cars(3, &mut rng);
        // drive everyone into the queue
        let mut tick = 0u64;
        for _ in 0..2000 {
            update_cars(&mut cars, gate_x, 96.0, false, tick, &mut rng);
            tick += 1;
        }
        assert!(cars.iter().all(|c| c.state == CarState::Waiting));
        let first = cars
            .iter()
            .enumerate()
            .min_by_key(|(_, c)| c.waiting_since)
            .map(|(i, _)| i)
            .unwrap();

        update_cars(&mut cars, gate_x, 96.0, true, tick, &mut rng);
        let entering: Vec<usize> = cars
            .iter()
            .enumerate()
            .filter(|(_, c)| c.state == CarState::Entering)
            .map(|(i, _)| i)
            .collect();
        assert_eq!(entering, vec![first]);
        assert_eq!(
            cars.iter().filter(|c| c.state == CarState::Waiting).count(),
            2
        );
    }

    #[test]
    fn queued_cars_keep_following_gap() {
        let mut rng = StdRng::seed_from_u64(5);
        let mut cars = spawn_cars(3, &mut rng);
        for tick in 0..2000 {
            update_cars(&mut cars, 40.0, 96.0, false, tick, &mut rng);
            let mut xs: Vec<f32> = cars
                .iter()
                .filter(|c| matches!(c.state, CarState::Approaching | CarState::Waiting))
                .map(|c| c.x)
                .collect();
            xs.sort_by(|a, b| a.partial_cmp(b).unwrap());
            for pair in xs.windows(2) {
                assert!(pair[1] - pair[0] >= CAR_GAP - 0.5, "gap collapsed: {pair:?}");
            }
        }
    }

    #[test]
    fn aircraft_trail_is_bounded_fifo() {
        let mut rng = StdRng::seed_from_u64(2);
        let mut a = Aircraft::new(&mut rng);
        // skip dormancy
        a.update(120.0, 96.0, &mut rng);
        assert!(a.active);
        let mut prev_oldest = None;
        while a.active {
            a.update(0.05, 96.0, &mut rng);
            assert!(a.trail.len() <= TRAIL_MAX);
            if let (Some(p), Some(&cur)) = (prev_oldest, a.trail.front()) {
                // the oldest segment only ever advances (eviction is front-first)
                let (px, _): (f32, f32) = p;
                let (cx, _) = cur;
                if a.dir > 0.0 {
                    assert!(cx >= px);
                }
            }
            prev_oldest = a.trail.front().copied();
        }
        assert!(a.trail.is_empty());
    }

    #[test]
    fn aircraft_reschedules_after_flyby() {
        let mut rng = StdRng::seed_from_u64(4);
        let mut a = Aircraft::new(&mut rng);
        a.update(120.0, 96.0, &mut rng);
        while a.active {
            a.update(0.05, 96.0, &mut rng);
        }
        assert!(a.next_flyby_in >= FLYBY_MIN_SECS && a.next_flyby_in <= FLYBY_MAX_SECS);
    }

    #[test]
    fn gator_surfaces_five_seconds_per_cycle() {
        let mut g = Gator::new();
        let mut visible_secs = 0;
        for _ in 0..GATOR_CYCLE_SECS {
            if g.visible() {
                visible_secs += 1;
            }
            g.tick_second();
        }
        assert_eq!(visible_secs, GATOR_VISIBLE_SECS);
    }
}
