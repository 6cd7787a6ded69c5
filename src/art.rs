use crate::api::LaunchRecord;
use crate::render::Rgb;
use crate::scene::{Sprite, SpriteCell};

/* ----------------------------
   Scene geometry (virtual cells)
---------------------------- */

pub(crate) const SCENE_W: f32 = 96.0;
pub(crate) const SCENE_H: f32 = 32.0;

pub(crate) const GROUND_Y: i32 = 26;
pub(crate) const ROAD_Y: f32 = 25.0;
pub(crate) const GATE_X: f32 = 40.0;
pub(crate) const PAD_X: f32 = 74.0;
pub(crate) const PAD_Y: f32 = 24.0;
pub(crate) const VAB_X: i32 = 8;
pub(crate) const POND_X: i32 = 52;
pub(crate) const POND_Y: i32 = 29;

pub(crate) const BIRD_MIN_Y: f32 = 3.0;
pub(crate) const BIRD_MAX_Y: f32 = 12.0;

fn cell(dx: i16, dy: i16, ch: char, fg: Rgb) -> SpriteCell {
    SpriteCell { dx, dy, ch, fg }
}

/// Lay a string out as cells starting at (dx, dy). Spaces are skipped by the
/// rasterizer, so text overlays only its glyphs.
fn text_cells(out: &mut Vec<SpriteCell>, dx: i16, dy: i16, s: &str, fg: Rgb) {
    for (i, ch) in s.chars().enumerate() {
        out.push(cell(dx + i as i16, dy, ch, fg));
    }
}

pub(crate) fn text_sprite(x: f32, y: f32, lines: &[String], fg: Rgb) -> Sprite {
    let mut cells = Vec::new();
    for (row, line) in lines.iter().enumerate() {
        text_cells(&mut cells, 0, row as i16, line, fg);
    }
    Sprite::at(x, y, cells)
}

/* ----------------------------
   Landscape
---------------------------- */

pub(crate) fn landscape() -> Sprite {
    let grass = Rgb::hex("#2e7d32");
    let sand = Rgb::hex("#c2b280");
    let asphalt = Rgb::hex("#4a4a4a");
    let vab_gray = Rgb::hex("#b0b4ba");
    let vab_dark = Rgb::hex("#7a8088");
    let flag_blue = Rgb::hex("#3a5fcd");
    let flag_red = Rgb::hex("#d62828");
    let tower_red = Rgb::hex("#c0392b");
    let booth = Rgb::hex("#d8cba8");

    let mut cells = Vec::new();

    // ground: grass over sand fill down to the bottom edge
    for y in GROUND_Y..SCENE_H as i32 {
        for x in 0..SCENE_W as i32 {
            let (ch, fg) = if y == GROUND_Y {
                ('▒', grass)
            } else {
                ('░', sand)
            };
            cells.push(cell(x as i16, y as i16, ch, fg));
        }
    }

    // access road along the car row
    for x in 0..SCENE_W as i32 {
        cells.push(cell(x as i16, ROAD_Y as i16, '▬', asphalt));
    }

    // Vehicle Assembly Building: the big gray box with the flag wall
    for dy in 0..8i16 {
        for dx in 0..14i16 {
            let fg = if dx >= 11 { vab_dark } else { vab_gray };
            cells.push(cell(VAB_X as i16 + dx, ROAD_Y as i16 - 1 - dy, '█', fg));
        }
    }
    for dy in 2..6i16 {
        cells.push(cell(VAB_X as i16 + 2, ROAD_Y as i16 - 1 - dy, '▌', flag_blue));
        cells.push(cell(VAB_X as i16 + 3, ROAD_Y as i16 - 1 - dy, '▌', flag_red));
    }
    text_cells(
        &mut cells,
        VAB_X as i16 + 6,
        ROAD_Y as i16 - 4,
        "VAB",
        Rgb::hex("#2a2a2a"),
    );

    // visitor gate: booth and barrier arm at the stop line
    let gx = GATE_X as i16;
    cells.push(cell(gx, ROAD_Y as i16 - 1, '█', booth));
    cells.push(cell(gx, ROAD_Y as i16 - 2, '▄', booth));
    cells.push(cell(gx - 1, ROAD_Y as i16 - 1, '─', tower_red));
    cells.push(cell(gx - 2, ROAD_Y as i16 - 1, '─', tower_red));

    // launch tower beside the pad
    let tx = PAD_X as i16 + 3;
    for dy in 1..10i16 {
        cells.push(cell(tx, PAD_Y as i16 - dy, '╫', tower_red));
    }
    cells.push(cell(tx, PAD_Y as i16 - 10, '╨', tower_red));

    // pad apron
    for dx in -3..=4i16 {
        cells.push(cell(PAD_X as i16 + dx, PAD_Y as i16 + 1, '▓', asphalt));
    }

    Sprite::at(0.0, 0.0, cells)
}

pub(crate) fn pond() -> Sprite {
    let water = Rgb::hex("#2f6f8f");
    let mut cells = Vec::new();
    for dx in -1..=4i16 {
        cells.push(cell(dx, 0, '≈', water));
    }
    for dx in 0..=3i16 {
        cells.push(cell(dx, 1, '≈', water));
    }
    Sprite::at(POND_X as f32, POND_Y as f32, cells)
}

pub(crate) fn gator() -> Sprite {
    let hide = Rgb::hex("#3d5a3d");
    let cells = vec![
        cell(0, 0, 'ᴥ', hide),
        cell(1, 0, '‿', hide),
        cell(2, 0, 'ᴥ', hide),
    ];
    Sprite::at(POND_X as f32 + 1.0, POND_Y as f32 - 1.0, cells)
}

pub(crate) fn stars(w: i32, horizon: i32) -> Sprite {
    let fg = Rgb::hex("#e8e8d8");
    let mut cells = Vec::new();
    // fixed constellation from a cheap hash; no RNG so the sky is stable
    let mut n: u32 = 0x9e3779b9;
    for _ in 0..26 {
        n ^= n << 13;
        n ^= n >> 17;
        n ^= n << 5;
        let x = (n % w as u32) as i16;
        let y = ((n >> 8) % horizon.max(1) as u32) as i16;
        let ch = if n & 0x10 == 0 { '·' } else { '✦' };
        cells.push(cell(x, y, ch, fg));
    }
    Sprite::at(0.0, 0.0, cells)
}

pub(crate) fn cloud(x: f32, y: f32, w: f32, fg: Rgb) -> Sprite {
    let mut cells = Vec::new();
    let w = w as i16;
    for dx in 0..w {
        cells.push(cell(dx, 0, '▒', fg));
    }
    for dx in 1..(w - 1).max(2) {
        cells.push(cell(dx, -1, '░', fg));
    }
    Sprite::at(x, y, cells)
}

/* ----------------------------
   Vehicles & critters
---------------------------- */

pub(crate) fn bird(x: f32, y: f32, flap_up: bool) -> Sprite {
    let fg = Rgb::hex("#2a2a2a");
    let cells = if flap_up {
        vec![cell(-1, 0, '\\', fg), cell(0, 0, '•', fg), cell(1, 0, '/', fg)]
    } else {
        vec![cell(-1, 0, '/', fg), cell(0, 0, '•', fg), cell(1, 0, '\\', fg)]
    };
    Sprite::at(x, y, cells)
}

pub(crate) fn car(x: f32, color: Rgb) -> Sprite {
    let tire = Rgb::hex("#1a1a1a");
    let cells = vec![
        cell(0, 0, '▄', color),
        cell(1, 0, '▄', color),
        cell(0, 1, '•', tire),
        cell(1, 1, '•', tire),
    ];
    Sprite::at(x, ROAD_Y - 1.0, cells)
}

pub(crate) fn aircraft(x: f32, y: f32, dir: f32) -> Sprite {
    let body = Rgb::hex("#f5f5f5");
    let accent = Rgb::hex("#4a7dc8");
    let cells = if dir > 0.0 {
        vec![
            cell(-3, -1, '▴', body),
            cell(-3, 0, '▬', accent),
            cell(-2, 0, '▬', body),
            cell(-1, 0, '▬', body),
            cell(0, 0, '►', body),
        ]
    } else {
        vec![
            cell(3, -1, '▴', body),
            cell(3, 0, '▬', accent),
            cell(2, 0, '▬', body),
            cell(1, 0, '▬', body),
            cell(0, 0, '◄', body),
        ]
    };
    Sprite::at(x, y, cells)
}

pub(crate) fn trail_puff(x: f32, y: f32) -> Sprite {
    Sprite::at(x, y, vec![cell(0, 0, '·', Rgb::hex("#d0d0d0"))])
}

pub(crate) fn rain_drop(x: f32, y: f32) -> Sprite {
    Sprite::at(x, y, vec![cell(0, 0, '╲', Rgb::hex("#a8b8c8"))])
}

/* ----------------------------
   Rockets
---------------------------- */

enum RocketClass {
    Small,
    Medium,
    Heavy,
}

fn rocket_class(vehicle: &str) -> RocketClass {
    let v = vehicle.to_ascii_lowercase();
    if v.contains("heavy") || v.contains("starship") || v.contains("sls") || v.contains("new glenn")
    {
        RocketClass::Heavy
    } else if v.contains("electron") || v.contains("alpha") || v.contains("minotaur") {
        RocketClass::Small
    } else {
        RocketClass::Medium
    }
}

/// Rocket on the pad, anchored at the nozzle row. Silhouette picked from the
/// vehicle name; unknown names get the medium two-stage shape.
pub(crate) fn rocket(vehicle: &str) -> Sprite {
    let hull = Rgb::hex("#e8e8e8");
    let shade = Rgb::hex("#b8b8b8");
    let nose = Rgb::hex("#d62828");
    let mut cells = Vec::new();

    match rocket_class(vehicle) {
        RocketClass::Small => {
            for dy in 1..=5i16 {
                cells.push(cell(0, -dy, '█', hull));
            }
            cells.push(cell(0, -6, '▲', nose));
            cells.push(cell(-1, 0, '▙', shade));
            cells.push(cell(1, 0, '▟', shade));
        }
        RocketClass::Medium => {
            for dy in 1..=8i16 {
                cells.push(cell(0, -dy, '█', hull));
                cells.push(cell(1, -dy, '█', if dy > 5 { shade } else { hull }));
            }
            cells.push(cell(0, -9, '▛', nose));
            cells.push(cell(1, -9, '▜', nose));
            cells.push(cell(-1, 0, '▙', shade));
            cells.push(cell(2, 0, '▟', shade));
        }
        RocketClass::Heavy => {
            for dy in 1..=9i16 {
                cells.push(cell(0, -dy, '█', hull));
                cells.push(cell(1, -dy, '█', hull));
            }
            for dy in 1..=6i16 {
                cells.push(cell(-1, -dy, '▐', shade));
                cells.push(cell(2, -dy, '▌', shade));
            }
            cells.push(cell(-1, -7, '▲', shade));
            cells.push(cell(2, -7, '▲', shade));
            cells.push(cell(0, -10, '▛', nose));
            cells.push(cell(1, -10, '▜', nose));
            cells.push(cell(-1, 0, '▙', shade));
            cells.push(cell(2, 0, '▟', shade));
        }
    }
    Sprite::at(PAD_X, PAD_Y, cells)
}

/// Idle vapor wisps at the rocket base, cycled by the smoke frame counter.
pub(crate) fn pad_wisps(frame: u32) -> Sprite {
    let vapor = Rgb::hex("#cfd8dc");
    let k = (frame % 4) as i16;
    let cells = vec![
        cell(-2 - (k % 2), -(k / 2), '░', vapor),
        cell(3 + (k % 2), -((k + 1) / 2 % 2), '░', vapor),
    ];
    Sprite::at(PAD_X, PAD_Y, cells)
}

/* ----------------------------
   Info sign
---------------------------- */

pub(crate) fn info_sign(rec: &LaunchRecord) -> Sprite {
    let frame_fg = Rgb::hex("#8d6e63");
    let text_fg = Rgb::hex("#ffd93d");
    let mut lines = vec![
        format!("┌{}┐", "─".repeat(26)),
        format!("│ {:<24} │", clip(&rec.name, 24)),
        format!("│ {:<24} │", clip(&format!("{} · {}", rec.vehicle, rec.provider), 24)),
        format!("│ {:<24} │", clip(&rec.pad, 24)),
        format!("└{}┘", "─".repeat(26)),
    ];
    let mut cells = Vec::new();
    for (row, line) in lines.drain(..).enumerate() {
        let fg = if row == 0 || row == 4 { frame_fg } else { text_fg };
        text_cells(&mut cells, 0, row as i16, &line, fg);
    }
    Sprite::at(2.0, 15.0, cells)
}

fn clip(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let mut out: String = s.chars().take(max.saturating_sub(1)).collect();
        out.push('…');
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::LaunchStatus;

    #[test]
    fn rocket_class_picks_by_name() {
        assert!(matches!(rocket_class("Falcon Heavy"), RocketClass::Heavy));
        assert!(matches!(rocket_class("Electron"), RocketClass::Small));
        assert!(matches!(rocket_class("Falcon 9"), RocketClass::Medium));
        assert!(matches!(rocket_class("Totally Unknown"), RocketClass::Medium));
    }

    #[test]
    fn rocket_sprites_sit_on_the_nozzle_row() {
        for name in ["Electron", "Falcon 9", "Starship"] {
            let s = rocket(name);
            assert!(s.cells.iter().all(|c| c.dy <= 0), "{name} dips below pad");
            assert!(s.cells.iter().any(|c| c.dy <= -5), "{name} has no stack");
        }
    }

    #[test]
    fn info_sign_clips_long_names() {
        let rec = LaunchRecord {
            id: 1,
            name: "A mission with an extremely long name that cannot fit".to_string(),
            vehicle: "Vehicle".to_string(),
            provider: "Provider".to_string(),
            pad: "Pad".to_string(),
            t0: None,
            status: LaunchStatus::Tbd,
        };
        let s = info_sign(&rec);
        // frame is 28 wide; nothing may stick out past it
        assert!(s.cells.iter().all(|c| c.dx < 28));
    }
}
