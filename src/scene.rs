use crate::render::{Renderer, Rgb};

/// Symbolic groups of drawables. Every sprite in the scene belongs to exactly
/// one tag; bulk operations (clear, translate) address the whole group.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub(crate) enum Tag {
    Sky,
    Stars,
    Clouds,
    Landscape,
    Pond,
    Gator,
    Cars,
    Birds,
    AircraftTrail,
    Aircraft,
    Rocket,
    Smoke,
    Flame,
    Rain,
    Sign,
    Countdown,
    Overlay,
}

/// Raster order, lowest first. Within a layer, insertion order wins.
fn layer(tag: Tag) -> i8 {
    match tag {
        Tag::Sky => 0,
        Tag::Stars => 1,
        Tag::Clouds => 2,
        Tag::Landscape => 3,
        Tag::Pond => 4,
        Tag::Gator => 5,
        Tag::Rocket => 6,
        Tag::Smoke => 7,
        Tag::Flame => 8,
        Tag::Cars => 9,
        Tag::Birds => 10,
        Tag::AircraftTrail => 11,
        Tag::Aircraft => 12,
        Tag::Rain => 13,
        Tag::Sign => 14,
        Tag::Countdown => 15,
        Tag::Overlay => 16,
    }
}

#[derive(Clone, Copy, Debug)]
pub(crate) struct SpriteCell {
    pub(crate) dx: i16,
    pub(crate) dy: i16,
    pub(crate) ch: char,
    pub(crate) fg: Rgb,
}

/// One drawable: an anchored bundle of cells. Positions are fractional so a
/// rigid translation can move slower than a cell per tick.
#[derive(Clone, Debug)]
pub(crate) struct Sprite {
    pub(crate) x: f32,
    pub(crate) y: f32,
    pub(crate) cells: Vec<SpriteCell>,
}

impl Sprite {
    pub(crate) fn at(x: f32, y: f32, cells: Vec<SpriteCell>) -> Self {
        Self { x, y, cells }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Handle {
    tag: Tag,
    id: u64,
}

/// Retained registry of tagged sprites.
///
/// The contract callers rely on: clear a tag before redrawing it, and never
/// hold a `Handle` across ticks without re-checking it, since another
/// subsystem's clear may have removed the sprite. Operations on missing
/// handles or empty tags are silent no-ops.
pub(crate) struct Scene {
    items: Vec<(Tag, u64, Sprite)>,
    next_id: u64,
}

impl Scene {
    pub(crate) fn new() -> Self {
        Self {
            items: Vec::new(),
            next_id: 1,
        }
    }

    pub(crate) fn push(&mut self, tag: Tag, sprite: Sprite) -> Handle {
        let id = self.next_id;
        self.next_id += 1;
        self.items.push((tag, id, sprite));
        Handle { tag, id }
    }

    /// Remove every sprite under `tag`. Clearing an empty tag is a no-op.
    pub(crate) fn clear(&mut self, tag: Tag) {
        self.items.retain(|(t, _, _)| *t != tag);
    }

    /// Rigid move of every sprite under `tag`.
    pub(crate) fn translate(&mut self, tag: Tag, dx: f32, dy: f32) {
        for (t, _, s) in &mut self.items {
            if *t == tag {
                s.x += dx;
                s.y += dy;
            }
        }
    }

    pub(crate) fn is_empty(&self, tag: Tag) -> bool {
        !self.items.iter().any(|(t, _, _)| *t == tag)
    }

    #[cfg(test)]
    pub(crate) fn len(&self, tag: Tag) -> usize {
        self.items.iter().filter(|(t, _, _)| *t == tag).count()
    }

    /// Is this handle still live? Handles do not survive a clear of their
    /// tag, so callers re-query instead of caching across ticks.
    pub(crate) fn contains(&self, h: Handle) -> bool {
        self.items.iter().any(|(t, id, _)| *t == h.tag && *id == h.id)
    }

    /// Rasterize into the back buffer. `ox`/`oy` shift scene coordinates into
    /// terminal coordinates (the scene is centered in the terminal).
    pub(crate) fn rasterize(&self, r: &mut Renderer, ox: i32, oy: i32) {
        let mut order: Vec<usize> = (0..self.items.len()).collect();
        order.sort_by_key(|&i| (layer(self.items[i].0), self.items[i].1));
        for i in order {
            let (_, _, s) = &self.items[i];
            let bx = s.x.round() as i32 + ox;
            let by = s.y.round() as i32 + oy;
            for c in &s.cells {
                if c.ch == ' ' {
                    continue;
                }
                r.set_over(bx + c.dx as i32, by + c.dy as i32, c.ch, c.fg);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::Rgb;

    fn dot() -> Vec<SpriteCell> {
        vec![SpriteCell {
            dx: 0,
            dy: 0,
            ch: '*',
            fg: Rgb::new(255, 255, 255),
        }]
    }

    #[test]
    fn clear_removes_exactly_one_tag() {
        let mut sc = Scene::new();
        sc.push(Tag::Birds, Sprite::at(1.0, 1.0, dot()));
        sc.push(Tag::Birds, Sprite::at(2.0, 1.0, dot()));
        sc.push(Tag::Cars, Sprite::at(3.0, 1.0, dot()));
        sc.clear(Tag::Birds);
        assert!(sc.is_empty(Tag::Birds));
        assert_eq!(sc.len(Tag::Cars), 1);
    }

    #[test]
    fn clear_on_empty_tag_is_a_no_op() {
        let mut sc = Scene::new();
        sc.clear(Tag::Flame);
        sc.clear(Tag::Flame);
        assert!(sc.is_empty(Tag::Flame));
    }

    #[test]
    fn stale_handle_after_clear_is_gone() {
        let mut sc = Scene::new();
        let h = sc.push(Tag::Rocket, Sprite::at(0.0, 0.0, dot()));
        assert!(sc.contains(h));
        sc.clear(Tag::Rocket);
        assert!(!sc.contains(h));
        // a fresh push gets a new id, so the stale handle stays dead
        sc.push(Tag::Rocket, Sprite::at(0.0, 0.0, dot()));
        assert!(!sc.contains(h));
    }

    #[test]
    fn translate_moves_whole_tag_rigidly() {
        let mut sc = Scene::new();
        sc.push(Tag::Rocket, Sprite::at(10.0, 20.0, dot()));
        sc.push(Tag::Rocket, Sprite::at(11.0, 22.0, dot()));
        sc.push(Tag::Cars, Sprite::at(5.0, 5.0, dot()));
        sc.translate(Tag::Rocket, 0.0, -1.5);
        let ys: Vec<f32> = sc
            .items
            .iter()
            .filter(|(t, _, _)| *t == Tag::Rocket)
            .map(|(_, _, s)| s.y)
            .collect();
        assert_eq!(ys, vec![18.5, 20.5]);
        let car = sc
            .items
            .iter()
            .find(|(t, _, _)| *t == Tag::Cars)
            .map(|(_, _, s)| (s.x, s.y));
        assert_eq!(car, Some((5.0, 5.0)));
    }
}
