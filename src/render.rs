use anyhow::Result;
use crossterm::{
    cursor, execute, queue,
    style::{Color, Print, ResetColor, SetBackgroundColor, SetForegroundColor},
    terminal::{
        self, BeginSynchronizedUpdate, Clear, ClearType, DisableLineWrap, EnableLineWrap,
        EndSynchronizedUpdate, EnterAlternateScreen, LeaveAlternateScreen,
    },
};
use std::io::{self, Write};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Rgb {
    pub(crate) r: u8,
    pub(crate) g: u8,
    pub(crate) b: u8,
}

impl Rgb {
    pub(crate) const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Parse `#rrggbb`. Anything malformed comes back white.
    pub(crate) fn hex(s: &str) -> Self {
        let s = s.trim_start_matches('#');
        if s.len() != 6 {
            return Rgb::new(255, 255, 255);
        }
        let byte = |i: usize| u8::from_str_radix(&s[i..i + 2], 16).unwrap_or(255);
        Rgb::new(byte(0), byte(2), byte(4))
    }

    fn to_color(self, color_on: bool) -> Color {
        if color_on {
            Color::Rgb {
                r: self.r,
                g: self.g,
                b: self.b,
            }
        } else {
            // Monochrome fallback: quantize luma into a few grays.
            let luma =
                0.2126 * self.r as f32 + 0.7152 * self.g as f32 + 0.0722 * self.b as f32;
            if luma > 190.0 {
                Color::White
            } else if luma > 110.0 {
                Color::Grey
            } else if luma > 40.0 {
                Color::DarkGrey
            } else {
                Color::Black
            }
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Cell {
    pub(crate) ch: char,
    pub(crate) fg: Rgb,
    pub(crate) bg: Rgb,
}

impl Cell {
    pub(crate) fn blank(bg: Rgb) -> Self {
        Self { ch: ' ', fg: bg, bg }
    }
}

pub(crate) struct Renderer {
    pub(crate) cols: u16,
    pub(crate) rows: u16,
    back: Vec<Cell>,
    front: Vec<Cell>,
    full_redraw: bool,
}

impl Renderer {
    pub(crate) fn new(cols: u16, rows: u16, bg: Rgb) -> Self {
        let n = cols as usize * rows as usize;
        Self {
            cols,
            rows,
            back: vec![Cell::blank(bg); n],
            front: vec![Cell::blank(bg); n],
            full_redraw: true,
        }
    }

    pub(crate) fn resize(&mut self, cols: u16, rows: u16, bg: Rgb) {
        self.cols = cols;
        self.rows = rows;
        let n = cols as usize * rows as usize;
        self.back = vec![Cell::blank(bg); n];
        self.front = vec![Cell::blank(bg); n];
        self.full_redraw = true;
    }

    pub(crate) fn clear_back(&mut self, bg: Rgb) {
        self.back.fill(Cell::blank(bg));
    }

    pub(crate) fn set(&mut self, x: i32, y: i32, ch: char, fg: Rgb, bg: Rgb) {
        if x < 0 || y < 0 {
            return;
        }
        let (x, y) = (x as u16, y as u16);
        if x >= self.cols || y >= self.rows {
            return;
        }
        let i = y as usize * self.cols as usize + x as usize;
        self.back[i] = Cell { ch, fg, bg };
    }

    /// Overwrite the glyph/fg but keep whatever background is already there.
    pub(crate) fn set_over(&mut self, x: i32, y: i32, ch: char, fg: Rgb) {
        if x < 0 || y < 0 {
            return;
        }
        let (x, y) = (x as u16, y as u16);
        if x >= self.cols || y >= self.rows {
            return;
        }
        let i = y as usize * self.cols as usize + x as usize;
        let bg = self.back[i].bg;
        self.back[i] = Cell { ch, fg, bg };
    }

    pub(crate) fn put_str(&mut self, x: i32, y: i32, s: &str, fg: Rgb, bg: Rgb) {
        for (i, ch) in s.chars().enumerate() {
            self.set(x + i as i32, y, ch, fg, bg);
        }
    }

    pub(crate) fn flush(&mut self, out: &mut io::Stdout, color_on: bool) -> Result<()> {
        queue!(out, BeginSynchronizedUpdate)?;

        let mut last_fg: Option<Color> = None;
        let mut last_bg: Option<Color> = None;
        let cols = self.cols as usize;
        let rows = self.rows as usize;

        for y in 0..rows {
            let mut x = 0usize;
            while x < cols {
                let i = y * cols + x;
                if !self.full_redraw && self.back[i] == self.front[i] {
                    x += 1;
                    continue;
                }
                // emit the whole dirty run with one MoveTo
                let mut x2 = x + 1;
                while x2 < cols {
                    let j = y * cols + x2;
                    if !self.full_redraw && self.back[j] == self.front[j] {
                        break;
                    }
                    x2 += 1;
                }

                queue!(out, cursor::MoveTo(x as u16, y as u16))?;
                for xx in x..x2 {
                    let c = self.back[y * cols + xx];
                    let fg = c.fg.to_color(color_on);
                    let bg = c.bg.to_color(color_on);
                    if last_bg != Some(bg) {
                        queue!(out, SetBackgroundColor(bg))?;
                        last_bg = Some(bg);
                    }
                    if last_fg != Some(fg) {
                        queue!(out, SetForegroundColor(fg))?;
                        last_fg = Some(fg);
                    }
                    queue!(out, Print(c.ch))?;
                }
                self.front[i..(y * cols + x2)].copy_from_slice(&self.back[i..(y * cols + x2)]);
                x = x2;
            }
        }

        self.full_redraw = false;
        queue!(out, ResetColor, EndSynchronizedUpdate)?;
        out.flush()?;
        Ok(())
    }
}

pub(crate) struct Terminal {
    pub(crate) out: io::Stdout,
    pub(crate) cols: u16,
    pub(crate) rows: u16,
}

impl Terminal {
    pub(crate) fn begin() -> Result<Self> {
        let mut out = io::stdout();
        execute!(
            out,
            EnterAlternateScreen,
            cursor::Hide,
            DisableLineWrap,
            Clear(ClearType::All)
        )?;
        terminal::enable_raw_mode()?;
        let (cols, rows) = terminal::size()?;
        Ok(Self { out, cols, rows })
    }

    pub(crate) fn end(&mut self) -> Result<()> {
        queue!(
            self.out,
            ResetColor,
            Clear(ClearType::All),
            cursor::Show,
            EnableLineWrap,
            LeaveAlternateScreen
        )?;
        self.out.flush()?;
        terminal::disable_raw_mode()?;
        Ok(())
    }

    pub(crate) fn resize_if_needed(&mut self) -> Result<bool> {
        let (c, r) = terminal::size()?;
        if c == self.cols && r == self.rows {
            return Ok(false);
        }
        self.cols = c;
        self.rows = r;
        Ok(true)
    }
}
