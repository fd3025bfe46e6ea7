use anyhow::Result;
use enigo::{Enigo, MouseButton, MouseControllable};
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use rand::Rng;

use crate::positions::Point;

static ENIGO: Lazy<Mutex<Enigo>> = Lazy::new(|| Mutex::new(Enigo::new()));

/// Applies an independent uniform offset in `[-radius, +radius]` to both
/// axes. A non-positive radius leaves the position untouched.
pub fn jittered(pos: Point, radius: i32, rng: &mut impl Rng) -> Point {
    if radius <= 0 {
        return pos;
    }
    Point::new(
        pos.x + rng.gen_range(-radius..=radius),
        pos.y + rng.gen_range(-radius..=radius),
    )
}

/// One simulated left click at an absolute screen position. This is where
/// the automation touches the host's input state; a click that lands on
/// nothing is indistinguishable from one that worked, so there is no retry.
pub trait Clicker: Send {
    fn click(&mut self, pos: Point) -> Result<()>;
}

/// Clicks through the process-wide enigo handle.
pub struct ScreenClicker;

impl Clicker for ScreenClicker {
    fn click(&mut self, pos: Point) -> Result<()> {
        let mut enigo = ENIGO.lock();
        enigo.mouse_move_to(pos.x, pos.y);
        enigo.mouse_click(MouseButton::Left);
        Ok(())
    }
}

#[derive(Clone, Copy, Debug)]
pub struct Bounds {
    pub min_x: i32,
    pub max_x: i32,
    pub min_y: i32,
    pub max_y: i32,
}

impl Bounds {
    pub fn width(&self) -> i32 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> i32 {
        self.max_y - self.min_y
    }

    pub fn is_valid(&self) -> bool {
        self.width() > 0 && self.height() > 0
    }

    pub fn contains(&self, p: Point) -> bool {
        p.x >= self.min_x && p.x < self.max_x && p.y >= self.min_y && p.y < self.max_y
    }
}

/// Union of all connected displays, in absolute screen coordinates. None if
/// the displays cannot be queried.
pub fn screen_bounds() -> Option<Bounds> {
    let displays = display_info::DisplayInfo::all().ok()?;
    let mut bounds: Option<Bounds> = None;
    for d in displays {
        let next = Bounds {
            min_x: d.x,
            max_x: d.x + d.width as i32,
            min_y: d.y,
            max_y: d.y + d.height as i32,
        };
        bounds = Some(match bounds {
            None => next,
            Some(acc) => Bounds {
                min_x: acc.min_x.min(next.min_x),
                max_x: acc.max_x.max(next.max_x),
                min_y: acc.min_y.min(next.min_y),
                max_y: acc.max_y.max(next.max_y),
            },
        });
    }
    bounds.filter(Bounds::is_valid)
}
