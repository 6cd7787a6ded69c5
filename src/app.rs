use anyhow::Result;
use chrono::{Timelike, Utc};
use clap::Parser;
use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;

use crate::api::{self, LaunchRecord, WeatherState};
use crate::art;
use crate::config::{self, Cli, Settings};
use crate::countdown::Countdown;
use crate::entities::{self, Aircraft, Bird, Car, Cloud, Gator};
use crate::launch::{self, Liftoff, LiftoffStep};
use crate::machine::{Action, LaunchMachine, Phase};
use crate::render::{Renderer, Rgb, Terminal};
use crate::scene::{Handle, Scene, Sprite, SpriteCell, Tag};
use crate::scheduler::Ticker;
use crate::weatherfx::{self, Lightning, RainLayer, WeatherKind};

const COUNTDOWN_TICK: Duration = Duration::from_secs(1);
const BIRD_TICK: Duration = Duration::from_millis(50);
const CLOUD_TICK: Duration = Duration::from_millis(50);
const CAR_TICK: Duration = Duration::from_millis(60);
const AIRCRAFT_TICK: Duration = Duration::from_millis(50);
const SMOKE_TICK: Duration = Duration::from_millis(100);
const GATOR_TICK: Duration = Duration::from_secs(1);
const LIFTOFF_TICK: Duration = Duration::from_millis(33);
const RAIN_TICK: Duration = Duration::from_millis(50);
const GATE_INTERVAL: Duration = Duration::from_secs(4);

const DT_CLAMP: Duration = Duration::from_millis(250);

/// Results posted back to the render loop by fetch tasks. The loop never
/// awaits network I/O itself.
enum Cmd {
    Launches(Result<Vec<LaunchRecord>, String>),
    Weather(Result<WeatherState, String>),
    Recheck(Result<Option<LaunchRecord>, String>),
}

pub(crate) async fn run() -> Result<()> {
    let cli = Cli::parse();
    let paths = config::project_paths()?;
    let saved = config::load_settings(&paths.settings_path);
    let settings = config::effective_settings(&saved, &cli);

    let mut app = App::init(settings)?;
    let result = app.run().await;
    let _ = app.term.end();
    config::save_settings_atomic(&paths.settings_path, &saved)?;
    result
}

struct App {
    settings: Settings,
    term: Terminal,
    renderer: Renderer,
    scene: Scene,
    rng: StdRng,

    machine: LaunchMachine,
    liftoff: Liftoff,
    weather: WeatherState,
    last_error: Option<String>,

    birds: Vec<Bird>,
    cars: Vec<Car>,
    aircraft: Aircraft,
    clouds: Vec<Cloud>,
    gator: Gator,
    rain: RainLayer,
    lightning: Lightning,

    countdown_t: Ticker,
    bird_t: Ticker,
    cloud_t: Ticker,
    car_t: Ticker,
    aircraft_t: Ticker,
    smoke_t: Ticker,
    gator_t: Ticker,
    liftoff_t: Ticker,
    rain_t: Ticker,
    gate_t: Ticker,

    car_ticks: u64,
    gate_open_pending: bool,
    smoke_frame: u32,
    sky: Rgb,
    shown: Option<(i64, String)>,
    rocket_handle: Option<Handle>,
    show_help: bool,
    should_quit: bool,

    tx: mpsc::Sender<Cmd>,
    rx: mpsc::Receiver<Cmd>,
}

impl App {
    fn init(settings: Settings) -> Result<Self> {
        let term = Terminal::begin()?;
        let sky = weatherfx::sky_color(WeatherKind::Clear, local_hour());
        let renderer = Renderer::new(term.cols, term.rows, sky);
        let mut rng = StdRng::seed_from_u64(settings.seed);

        let mut scene = Scene::new();
        scene.push(Tag::Landscape, art::landscape());
        scene.push(Tag::Pond, art::pond());

        let birds = entities::spawn_birds(3, art::BIRD_MIN_Y, art::BIRD_MAX_Y, &mut rng);
        let cars = entities::spawn_cars(3, &mut rng);
        let aircraft = Aircraft::new(&mut rng);
        let clouds = entities::spawn_clouds(2, art::SCENE_W, &mut rng);

        let (tx, rx) = mpsc::channel::<Cmd>(16);

        Ok(Self {
            settings,
            term,
            renderer,
            scene,
            rng,
            machine: LaunchMachine::new(),
            liftoff: Liftoff::new(),
            weather: WeatherState::default(),
            last_error: None,
            birds,
            cars,
            aircraft,
            clouds,
            gator: Gator::new(),
            rain: RainLayer::new(),
            lightning: Lightning::new(),
            countdown_t: Ticker::new(COUNTDOWN_TICK),
            bird_t: Ticker::new(BIRD_TICK),
            cloud_t: Ticker::new(CLOUD_TICK),
            car_t: Ticker::new(CAR_TICK),
            aircraft_t: Ticker::new(AIRCRAFT_TICK),
            smoke_t: Ticker::new(SMOKE_TICK),
            gator_t: Ticker::new(GATOR_TICK),
            liftoff_t: Ticker::new(LIFTOFF_TICK),
            rain_t: Ticker::new(RAIN_TICK),
            gate_t: Ticker::new(GATE_INTERVAL),
            car_ticks: 0,
            gate_open_pending: false,
            smoke_frame: 0,
            sky,
            shown: None,
            rocket_handle: None,
            show_help: false,
            should_quit: false,
            tx,
            rx,
        })
    }

    async fn run(&mut self) -> Result<()> {
        spawn_launch_refresher(
            self.tx.clone(),
            Duration::from_secs(self.settings.launch_refresh_min * 60),
        );
        spawn_weather_refresher(
            self.tx.clone(),
            Duration::from_secs(self.settings.weather_refresh_min * 60),
        );

        let frame_dt = Duration::from_secs_f32(1.0 / self.settings.fps_cap.max(10) as f32);
        let mut last_frame = Instant::now();

        while !self.should_quit {
            if self.term.resize_if_needed()? {
                self.renderer.resize(self.term.cols, self.term.rows, self.sky);
            }

            while let Ok(cmd) = self.rx.try_recv() {
                self.handle_cmd(cmd);
            }

            self.handle_input()?;

            let now = Instant::now();
            let dt = now.saturating_duration_since(last_frame).min(DT_CLAMP);
            last_frame = now;

            self.advance(dt);
            self.sync_display();
            self.render_frame()?;

            spin_sleep(frame_dt, Instant::now());
        }
        Ok(())
    }

    fn handle_cmd(&mut self, cmd: Cmd) {
        let now = Utc::now();
        match cmd {
            Cmd::Launches(Ok(records)) => {
                self.last_error = None;
                self.machine.on_launches(&records);
            }
            Cmd::Launches(Err(e)) => self.last_error = Some(format!("launches: {e}")),
            Cmd::Weather(Ok(w)) => {
                if w.kind != self.weather.kind {
                    self.clouds = entities::spawn_clouds(
                        weatherfx::cloud_count(w.kind),
                        art::SCENE_W,
                        &mut self.rng,
                    );
                }
                self.weather = w;
            }
            Cmd::Weather(Err(e)) => self.last_error = Some(format!("weather: {e}")),
            Cmd::Recheck(Ok(fetched)) => {
                let action = self.machine.on_recheck(fetched, now);
                self.handle_action(action);
            }
            Cmd::Recheck(Err(e)) => {
                self.last_error = Some(format!("recheck: {e}"));
                self.machine.recheck_failed(now);
            }
        }
    }

    fn handle_action(&mut self, action: Action) {
        match action {
            Action::None => {}
            Action::StartLiftoff => {
                // rocket leaves the top of the scene plus a margin
                self.liftoff
                    .start(art::PAD_X, art::PAD_Y, art::PAD_Y + 14.0);
                // idle wisps give way to the exhaust; the chain resumes
                // after the animation ends
                self.smoke_t.cancel();
                self.scene.clear(Tag::Smoke);
            }
            Action::Recheck(id) => {
                let tx = self.tx.clone();
                tokio::spawn(async move {
                    let res = api::fetch_launch_by_id(id)
                        .await
                        .map_err(|e| format!("{e:#}"));
                    tx.send(Cmd::Recheck(res)).await.ok();
                });
            }
            Action::LoadNext => {
                let tx = self.tx.clone();
                tokio::spawn(async move {
                    let res = api::fetch_launches(5).await.map_err(|e| format!("{e:#}"));
                    tx.send(Cmd::Launches(res)).await.ok();
                });
            }
        }
    }

    fn handle_input(&mut self) -> Result<()> {
        while event::poll(Duration::from_millis(0))? {
            let ev = event::read()?;
            let Event::Key(k) = ev else { continue };
            if k.kind != KeyEventKind::Press {
                continue;
            }
            match k.code {
                KeyCode::Char('q') | KeyCode::Char('Q') | KeyCode::Esc => {
                    self.should_quit = true;
                }
                KeyCode::Char('l') | KeyCode::Char('L') => {
                    // force launch now, bypassing the countdown
                    let action = self.machine.force_launch();
                    self.handle_action(action);
                }
                KeyCode::Char('x') | KeyCode::Char('X') => {
                    if self.liftoff.is_active() {
                        self.liftoff.stop();
                        self.machine.abort_liftoff();
                        self.scene.clear(Tag::Flame);
                        self.scene.clear(Tag::Rocket);
                        self.smoke_t.resume();
                    }
                }
                KeyCode::Char('r') | KeyCode::Char('R') => {
                    self.handle_action(Action::LoadNext);
                    let tx = self.tx.clone();
                    tokio::spawn(async move {
                        let res = api::fetch_weather().await.map_err(|e| format!("{e:#}"));
                        tx.send(Cmd::Weather(res)).await.ok();
                    });
                }
                KeyCode::Char('c') | KeyCode::Char('C') => {
                    self.settings.enable_color = !self.settings.enable_color;
                }
                KeyCode::Char('h') | KeyCode::Char('H') | KeyCode::Char('?') => {
                    self.show_help = !self.show_help;
                }
                _ => {}
            }
        }
        Ok(())
    }

    /// Advance every subsystem by its own cadence. Updates for a kind always
    /// complete before that kind's redraw; kinds are independent of each
    /// other.
    fn advance(&mut self, dt: Duration) {
        let now = Utc::now();
        let hour = local_hour();

        for _ in 0..self.countdown_t.fire(dt) {
            let action = self.machine.tick(now);
            self.handle_action(action);
            self.redraw_countdown(now);
            self.refresh_sky(hour);
        }

        for _ in 0..self.bird_t.fire(dt) {
            entities::update_birds(&mut self.birds, art::SCENE_W, &mut self.rng);
        }
        self.redraw_birds();

        for _ in 0..self.cloud_t.fire(dt) {
            entities::update_clouds(&mut self.clouds, art::SCENE_W);
        }
        self.redraw_clouds(hour);

        if self.gate_t.fire(dt) > 0 {
            self.gate_open_pending = true;
        }
        for _ in 0..self.car_t.fire(dt) {
            self.car_ticks += 1;
            let open = std::mem::take(&mut self.gate_open_pending);
            entities::update_cars(
                &mut self.cars,
                art::GATE_X,
                art::SCENE_W,
                open,
                self.car_ticks,
                &mut self.rng,
            );
        }
        self.redraw_cars();

        for _ in 0..self.aircraft_t.fire(dt) {
            self.aircraft
                .update(AIRCRAFT_TICK.as_secs_f32(), art::SCENE_W, &mut self.rng);
        }
        self.redraw_aircraft();

        for _ in 0..self.smoke_t.fire(dt) {
            self.smoke_frame = self.smoke_frame.wrapping_add(1);
            self.redraw_smoke();
        }

        for _ in 0..self.gator_t.fire(dt) {
            self.gator.tick_second();
            self.redraw_gator();
        }

        for _ in 0..self.liftoff_t.fire(dt) {
            match self.liftoff.step(&mut self.rng) {
                LiftoffStep::Inactive => {}
                LiftoffStep::Ramping => {}
                LiftoffStep::Rising { dy } => {
                    self.scene.translate(Tag::Rocket, 0.0, -dy);
                }
                LiftoffStep::Complete => {
                    self.scene.clear(Tag::Rocket);
                    self.machine.liftoff_complete(Utc::now());
                    self.smoke_t.resume();
                }
            }
            self.redraw_flame();
        }

        for _ in 0..self.rain_t.fire(dt) {
            self.rain
                .tick(self.weather.kind, art::SCENE_W, art::SCENE_H, &mut self.rng);
            self.lightning.tick(self.weather.kind, &mut self.rng);
        }
        self.redraw_rain();
    }

    /// Keep the rocket and info sign in step with the displayed record. The
    /// rocket handle is re-queried every pass: a clear by the liftoff path
    /// (or the stop key) invalidates it, and the pad gets repainted.
    fn sync_display(&mut self) {
        let desired = self
            .machine
            .current()
            .map(|r| (r.id, r.vehicle.clone()));
        let show_rocket = matches!(self.machine.phase(), Phase::Idle | Phase::Countdown);

        if desired != self.shown {
            self.scene.clear(Tag::Sign);
            self.scene.clear(Tag::Rocket);
            if let Some(rec) = self.machine.current() {
                self.scene.push(Tag::Sign, art::info_sign(rec));
            }
            self.shown = desired;
        }

        let rocket_live = self
            .rocket_handle
            .map_or(false, |h| self.scene.contains(h));
        if show_rocket && !rocket_live {
            if let Some(rec) = self.machine.current() {
                let sprite = art::rocket(&rec.vehicle);
                self.rocket_handle = Some(self.scene.push(Tag::Rocket, sprite));
            }
        }
    }

    /* ---- per-kind redraws: clear the tag, then repopulate it ---- */

    fn redraw_birds(&mut self) {
        self.scene.clear(Tag::Birds);
        for b in &self.birds {
            self.scene.push(Tag::Birds, art::bird(b.x, b.y, b.flap_up));
        }
    }

    fn redraw_clouds(&mut self, hour: u32) {
        self.scene.clear(Tag::Clouds);
        let fg = weatherfx::cloud_color(self.weather.kind, hour);
        for c in &self.clouds {
            self.scene.push(Tag::Clouds, art::cloud(c.x, c.y, c.w, fg));
        }
    }

    fn redraw_cars(&mut self) {
        self.scene.clear(Tag::Cars);
        for c in &self.cars {
            self.scene.push(Tag::Cars, art::car(c.x, c.color));
        }
    }

    fn redraw_aircraft(&mut self) {
        self.scene.clear(Tag::Aircraft);
        self.scene.clear(Tag::AircraftTrail);
        if self.aircraft.active {
            for &(tx, ty) in &self.aircraft.trail {
                self.scene.push(Tag::AircraftTrail, art::trail_puff(tx, ty));
            }
            self.scene.push(
                Tag::Aircraft,
                art::aircraft(self.aircraft.x, self.aircraft.y, self.aircraft.dir),
            );
        }
    }

    fn redraw_smoke(&mut self) {
        self.scene.clear(Tag::Smoke);
        if self.smoke_t.is_active() && !self.scene.is_empty(Tag::Rocket) {
            self.scene.push(Tag::Smoke, art::pad_wisps(self.smoke_frame));
        }
    }

    fn redraw_gator(&mut self) {
        self.scene.clear(Tag::Pond);
        self.scene.clear(Tag::Gator);
        self.scene.push(Tag::Pond, art::pond());
        if self.gator.visible() {
            self.scene.push(Tag::Gator, art::gator());
        }
    }

    fn redraw_flame(&mut self) {
        self.scene.clear(Tag::Flame);
        if !self.liftoff.is_active() {
            return;
        }
        for p in self.liftoff.particles_depth_sorted() {
            let fg = launch::particle_color(p);
            let ch = match p.kind {
                launch::ParticleKind::Flame => '▓',
                launch::ParticleKind::Vent => '░',
            };
            let cell = SpriteCell {
                dx: 0,
                dy: 0,
                ch,
                fg,
            };
            self.scene
                .push(Tag::Flame, Sprite::at(p.x, p.y, vec![cell]));
        }
    }

    fn redraw_rain(&mut self) {
        self.scene.clear(Tag::Rain);
        for d in &self.rain.drops {
            self.scene.push(Tag::Rain, art::rain_drop(d.x, d.y));
        }
    }

    fn redraw_countdown(&mut self, now: chrono::DateTime<Utc>) {
        self.scene.clear(Tag::Countdown);
        let line = match (self.machine.phase(), self.machine.current()) {
            (Phase::Launching, _) => {
                if self.liftoff.intensity() < 1.0 {
                    "IGNITION".to_string()
                } else {
                    "LIFTOFF".to_string()
                }
            }
            (Phase::PostLaunchCheck, _) => "AWAITING CONFIRMATION".to_string(),
            (_, Some(rec)) => match rec.t0 {
                Some(t0) => Countdown::compute(t0, now).readout(),
                None => "SCHEDULE TBD".to_string(),
            },
            (_, None) => "NO LAUNCH DATA".to_string(),
        };
        let x = (art::SCENE_W as i32 / 2 - line.chars().count() as i32 / 2) as f32;
        self.scene.push(
            Tag::Countdown,
            art::text_sprite(x, 1.0, &[line], Rgb::hex("#ffd93d")),
        );
    }

    fn refresh_sky(&mut self, hour: u32) {
        self.sky = weatherfx::sky_color(self.weather.kind, hour);

        self.scene.clear(Tag::Stars);
        if weatherfx::show_stars(self.weather.kind, hour) {
            self.scene
                .push(Tag::Stars, art::stars(art::SCENE_W as i32, art::GROUND_Y - 12));
        }

        self.scene.clear(Tag::Overlay);
        if self.weather.kind == WeatherKind::Fog {
            self.scene.push(Tag::Overlay, fog_banks());
        }
    }

    fn render_frame(&mut self) -> Result<()> {
        let bg = if self.lightning.is_flashing() {
            Rgb::hex("#ffffff")
        } else {
            self.sky
        };
        self.renderer.clear_back(bg);

        let ox = (self.renderer.cols as i32 - art::SCENE_W as i32) / 2;
        let oy = self.renderer.rows as i32 - art::SCENE_H as i32 - 1;
        self.scene.rasterize(&mut self.renderer, ox, oy);

        self.draw_hud();
        if self.show_help {
            self.draw_help();
        }

        self.renderer
            .flush(&mut self.term.out, self.settings.enable_color)?;
        Ok(())
    }

    fn draw_hud(&mut self) {
        let hud_fg = Rgb::hex("#e8e8e8");
        let hud_bg = Rgb::hex("#101018");
        let w = self.renderer.cols as i32;

        for x in 0..w {
            self.renderer.set(x, 0, ' ', hud_fg, hud_bg);
        }
        let phase = match self.machine.phase() {
            Phase::Idle => "idle",
            Phase::Countdown => "countdown",
            Phase::Launching => "launching",
            Phase::PostLaunchCheck => "post-launch",
        };
        let mut line = format!(
            " launchpad | {} | {} {:.0}C wind {:.0} km/h cloud {:.0}% rh {:.0}%",
            phase,
            self.weather.kind.label(),
            self.weather.temp_c,
            self.weather.wind_kph,
            self.weather.cloud_pct,
            self.weather.humidity_pct,
        );
        if let Some(e) = &self.last_error {
            line.push_str(&format!(" | ERR {e}"));
        }
        self.renderer.put_str(0, 0, &line, hud_fg, hud_bg);

        let last = self.renderer.rows as i32 - 1;
        for x in 0..w {
            self.renderer.set(x, last, ' ', hud_fg, hud_bg);
        }
        self.renderer.put_str(
            0,
            last,
            " q quit  l launch now  x stop  r refresh  c color  h help \
| data rocketlaunch.live · weather open-meteo",
            Rgb::hex("#9aa0a6"),
            hud_bg,
        );
    }

    fn draw_help(&mut self) {
        let fg = Rgb::hex("#e8e8e8");
        let bg = Rgb::hex("#101018");
        let lines = [
            "launchpad",
            "",
            "Counts down to the next rocket launch over a",
            "pixel-art Cape. At T-0 the pad lights up.",
            "",
            "q / Esc  quit",
            "l        force launch now (debug)",
            "x        stop a running liftoff",
            "r        refresh schedule and weather",
            "c        toggle color",
            "h / ?    toggle this help",
        ];
        let bw = 50i32;
        let bh = lines.len() as i32 + 2;
        let x0 = (self.renderer.cols as i32 - bw) / 2;
        let y0 = (self.renderer.rows as i32 - bh) / 2;

        for y in 0..bh {
            for x in 0..bw {
                let border = x == 0 || x == bw - 1 || y == 0 || y == bh - 1;
                let ch = if border {
                    match (x, y) {
                        (0, 0) => '┌',
                        (x, 0) if x == bw - 1 => '┐',
                        (0, y) if y == bh - 1 => '└',
                        (x, y) if x == bw - 1 && y == bh - 1 => '┘',
                        (_, 0) => '─',
                        (_, y) if y == bh - 1 => '─',
                        _ => '│',
                    }
                } else {
                    ' '
                };
                self.renderer.set(x0 + x, y0 + y, ch, fg, bg);
            }
        }
        for (i, s) in lines.iter().enumerate() {
            self.renderer.put_str(x0 + 2, y0 + 1 + i as i32, s, fg, bg);
        }
    }
}

fn fog_banks() -> Sprite {
    let fg = Rgb::hex("#d8d8d8");
    let mut cells = Vec::new();
    for band in 0..5i16 {
        let y = band * 5;
        for x in 0..art::SCENE_W as i16 {
            if (x + band) % 2 == 0 {
                cells.push(SpriteCell {
                    dx: x,
                    dy: y,
                    ch: '░',
                    fg,
                });
            }
        }
    }
    Sprite::at(0.0, 2.0, cells)
}

fn local_hour() -> u32 {
    chrono::Local::now().hour()
}

fn spawn_launch_refresher(tx: mpsc::Sender<Cmd>, every: Duration) {
    tokio::spawn(async move {
        let mut t = tokio::time::interval(every);
        loop {
            t.tick().await;
            let res = api::fetch_launches(5).await.map_err(|e| format!("{e:#}"));
            if tx.send(Cmd::Launches(res)).await.is_err() {
                break;
            }
        }
    });
}

fn spawn_weather_refresher(tx: mpsc::Sender<Cmd>, every: Duration) {
    tokio::spawn(async move {
        let mut t = tokio::time::interval(every);
        loop {
            t.tick().await;
            let res = api::fetch_weather().await.map_err(|e| format!("{e:#}"));
            if tx.send(Cmd::Weather(res)).await.is_err() {
                break;
            }
        }
    });
}

/* -----------------------------
   Frame pacing helper
------------------------------ */

fn spin_sleep(target: Duration, now: Instant) {
    let end = now + target;
    loop {
        let t = Instant::now();
        if t >= end {
            break;
        }
        let left = end - t;
        if left > Duration::from_millis(2) {
            std::thread::sleep(Duration::from_millis(1));
        } else {
            std::hint::spin_loop();
        }
    }
}
