use rand::rngs::StdRng;
use rand::Rng;

use crate::render::Rgb;

/// Visual weather condition, bucketed from the forecast API's weather code.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum WeatherKind {
    Clear,
    Cloudy,
    Fog,
    LightRain,
    Rain,
    Thunderstorm,
}

impl WeatherKind {
    /// WMO weather codes as served by Open-Meteo.
    pub(crate) fn from_code(code: i32) -> Self {
        match code {
            0 => WeatherKind::Clear,
            1 | 2 | 3 => WeatherKind::Cloudy,
            45 | 48 => WeatherKind::Fog,
            51 | 53 | 55 | 56 | 57 | 61 | 66 | 80 => WeatherKind::LightRain,
            63 | 65 | 67 | 81 | 82 => WeatherKind::Rain,
            95 | 96 | 99 => WeatherKind::Thunderstorm,
            _ => WeatherKind::Clear,
        }
    }

    pub(crate) fn is_raining(self) -> bool {
        matches!(
            self,
            WeatherKind::LightRain | WeatherKind::Rain | WeatherKind::Thunderstorm
        )
    }

    pub(crate) fn label(self) -> &'static str {
        match self {
            WeatherKind::Clear => "clear",
            WeatherKind::Cloudy => "cloudy",
            WeatherKind::Fog => "fog",
            WeatherKind::LightRain => "light rain",
            WeatherKind::Rain => "rain",
            WeatherKind::Thunderstorm => "thunderstorm",
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Daylight {
    Day,
    Sunset,
    Sunrise,
    Night,
}

fn daylight(hour: u32) -> Daylight {
    match hour {
        10..=15 => Daylight::Day,
        16..=17 => Daylight::Sunset,
        6..=9 => Daylight::Sunrise,
        _ => Daylight::Night,
    }
}

/// Sky backdrop color for the local hour and condition.
pub(crate) fn sky_color(kind: WeatherKind, hour: u32) -> Rgb {
    let stormy = matches!(kind, WeatherKind::Rain | WeatherKind::Thunderstorm);
    match daylight(hour) {
        Daylight::Day => {
            if stormy {
                Rgb::hex("#5a6a7a")
            } else if kind == WeatherKind::Cloudy {
                Rgb::hex("#9ab8d3")
            } else if kind == WeatherKind::Fog {
                Rgb::hex("#b8c8d8")
            } else {
                Rgb::hex("#87ceeb")
            }
        }
        Daylight::Sunset => {
            if stormy {
                Rgb::hex("#6a5a4a")
            } else {
                Rgb::hex("#ff9933")
            }
        }
        Daylight::Sunrise => {
            if stormy {
                Rgb::hex("#7a6a5a")
            } else {
                Rgb::hex("#ff9966")
            }
        }
        Daylight::Night => {
            if stormy {
                Rgb::hex("#0a0a0a")
            } else {
                Rgb::hex("#0a0a1e")
            }
        }
    }
}

pub(crate) fn show_stars(kind: WeatherKind, hour: u32) -> bool {
    daylight(hour) == Daylight::Night && kind == WeatherKind::Clear
}

pub(crate) fn cloud_count(kind: WeatherKind) -> usize {
    match kind {
        WeatherKind::Clear => 2,
        WeatherKind::Cloudy | WeatherKind::LightRain => 6,
        WeatherKind::Rain | WeatherKind::Thunderstorm => 8,
        WeatherKind::Fog => 0,
    }
}

pub(crate) fn cloud_color(kind: WeatherKind, hour: u32) -> Rgb {
    match kind {
        WeatherKind::Rain | WeatherKind::Thunderstorm => Rgb::hex("#606060"),
        WeatherKind::Cloudy => Rgb::hex("#c8c8c8"),
        _ => match daylight(hour) {
            Daylight::Day => Rgb::hex("#ffffff"),
            Daylight::Sunset => Rgb::hex("#ffd9b3"),
            Daylight::Sunrise => Rgb::hex("#ffe5cc"),
            Daylight::Night => Rgb::hex("#d0d0d0"),
        },
    }
}

/* ----------------------------
   Rain particles
---------------------------- */

pub(crate) const MAX_DROPS: usize = 150;

#[derive(Clone, Copy, Debug)]
pub(crate) struct RainDrop {
    pub(crate) x: f32,
    pub(crate) y: f32,
    pub(crate) speed: f32,
}

pub(crate) struct RainLayer {
    pub(crate) drops: Vec<RainDrop>,
}

impl RainLayer {
    pub(crate) fn new() -> Self {
        Self { drops: Vec::new() }
    }

    /// One animation tick: spawn by condition, advance, cull below the floor.
    /// Switching to a dry condition clears the layer.
    pub(crate) fn tick(&mut self, kind: WeatherKind, w: f32, h: f32, rng: &mut StdRng) {
        if !kind.is_raining() {
            self.drops.clear();
            return;
        }
        let spawn = if kind == WeatherKind::LightRain { 3 } else { 8 };
        for _ in 0..spawn {
            if self.drops.len() >= MAX_DROPS {
                break;
            }
            self.drops.push(RainDrop {
                x: rng.gen_range(0.0..w),
                y: rng.gen_range(-3.0..0.0),
                speed: if kind == WeatherKind::LightRain {
                    rng.gen_range(0.7..1.2)
                } else {
                    rng.gen_range(1.2..2.0)
                },
            });
        }
        for d in &mut self.drops {
            d.y += d.speed;
            d.x -= 0.2;
        }
        self.drops.retain(|d| d.y < h);
    }
}

/* ----------------------------
   Lightning
---------------------------- */

pub(crate) struct Lightning {
    flashing: bool,
    timer: u32,
}

impl Lightning {
    pub(crate) fn new() -> Self {
        Self {
            flashing: false,
            timer: 0,
        }
    }

    /// Roll for a new flash and age the current one. A flash lasts two ticks.
    pub(crate) fn tick(&mut self, kind: WeatherKind, rng: &mut StdRng) {
        if kind != WeatherKind::Thunderstorm {
            self.flashing = false;
            self.timer = 0;
            return;
        }
        if self.flashing {
            self.timer += 1;
            if self.timer >= 2 {
                self.flashing = false;
                self.timer = 0;
            }
        } else if rng.gen::<f32>() < 0.02 {
            self.flashing = true;
            self.timer = 0;
        }
    }

    pub(crate) fn is_flashing(&self) -> bool {
        self.flashing
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn code_buckets() {
        assert_eq!(WeatherKind::from_code(0), WeatherKind::Clear);
        assert_eq!(WeatherKind::from_code(3), WeatherKind::Cloudy);
        assert_eq!(WeatherKind::from_code(45), WeatherKind::Fog);
        assert_eq!(WeatherKind::from_code(51), WeatherKind::LightRain);
        assert_eq!(WeatherKind::from_code(65), WeatherKind::Rain);
        assert_eq!(WeatherKind::from_code(95), WeatherKind::Thunderstorm);
        assert_eq!(WeatherKind::from_code(1234), WeatherKind::Clear);
    }

    #[test]
    fn rain_never_exceeds_cap_and_culls_below_floor() {
        let mut rng = StdRng::seed_from_u64(9);
        let mut rain = RainLayer::new();
        for _ in 0..500 {
            rain.tick(WeatherKind::Rain, 96.0, 32.0, &mut rng);
            assert!(rain.drops.len() <= MAX_DROPS);
            assert!(rain.drops.iter().all(|d| d.y < 32.0));
        }
        // drying out clears the layer entirely
        rain.tick(WeatherKind::Clear, 96.0, 32.0, &mut rng);
        assert!(rain.drops.is_empty());
    }

    #[test]
    fn stars_only_on_clear_nights() {
        assert!(show_stars(WeatherKind::Clear, 23));
        assert!(!show_stars(WeatherKind::Clear, 12));
        assert!(!show_stars(WeatherKind::Cloudy, 23));
    }

    #[test]
    fn lightning_only_in_thunderstorms() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut l = Lightning::new();
        for _ in 0..200 {
            l.tick(WeatherKind::Rain, &mut rng);
            assert!(!l.is_flashing());
        }
        // with a storm, some tick eventually flashes
        let mut saw_flash = false;
        for _ in 0..2000 {
            l.tick(WeatherKind::Thunderstorm, &mut rng);
            saw_flash |= l.is_flashing();
        }
        assert!(saw_flash);
    }
}
