use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// An absolute screen position, persisted as a `[x, y]` JSON pair.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "(i32, i32)", into = "(i32, i32)")]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

impl From<(i32, i32)> for Point {
    fn from((x, y): (i32, i32)) -> Self {
        Self { x, y }
    }
}

impl From<Point> for (i32, i32) {
    fn from(p: Point) -> Self {
        (p.x, p.y)
    }
}

/// Expected length of the recorded enter flow.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Variant {
    #[default]
    Standard,
    Extended,
}

impl Variant {
    pub fn enter_steps(self) -> usize {
        match self {
            Variant::Standard => 7,
            Variant::Extended => 11,
        }
    }
}

#[derive(Debug, Error)]
pub enum PositionsError {
    #[error("{} not found; run the calibrate tool first", .path.display())]
    NotFound { path: PathBuf },
    #[error("failed to read {}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid positions file: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("enter_steps must contain {expected} points, found {found}")]
    EnterStepCount { expected: usize, found: usize },
}

/// On-disk schema written by the calibrate tool.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RawPositions {
    pub enter_steps: Vec<Point>,
    pub track_left: Point,
    pub track_right: Point,
    pub return_pos: Point,
}

impl RawPositions {
    pub fn load(path: &Path) -> Result<Self, PositionsError> {
        if !path.exists() {
            return Err(PositionsError::NotFound {
                path: path.to_path_buf(),
            });
        }
        let text = fs::read_to_string(path).map_err(|source| PositionsError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(serde_json::from_str(&text)?)
    }

    pub fn save(&self, path: &Path) -> Result<(), PositionsError> {
        let text = serde_json::to_string_pretty(self)?;
        fs::write(path, text).map_err(|source| PositionsError::Io {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Validated coordinate set: the recorded enter flow, the four track
/// positions derived from the recorded endpoints, and the return button.
/// Immutable for the lifetime of a run.
#[derive(Clone, Debug)]
pub struct Positions {
    enter_steps: Vec<Point>,
    tracks: [Point; 4],
    return_pos: Point,
}

impl Positions {
    pub fn load(path: &Path, variant: Variant) -> Result<Self, PositionsError> {
        Self::from_raw(RawPositions::load(path)?, variant)
    }

    /// Checks the enter-step arity and interpolates the four track positions
    /// evenly between the left and right endpoints. The tracks sit on a
    /// horizontal line, so all four take the left endpoint's y.
    pub fn from_raw(raw: RawPositions, variant: Variant) -> Result<Self, PositionsError> {
        let expected = variant.enter_steps();
        if raw.enter_steps.len() != expected {
            return Err(PositionsError::EnterStepCount {
                expected,
                found: raw.enter_steps.len(),
            });
        }

        let left = raw.track_left;
        let right = raw.track_right;
        let step = (right.x - left.x) as f64 / 3.0;
        let mut tracks = [Point::new(0, 0); 4];
        for (i, track) in tracks.iter_mut().enumerate() {
            *track = Point::new((left.x as f64 + i as f64 * step) as i32, left.y);
        }

        Ok(Self {
            enter_steps: raw.enter_steps,
            tracks,
            return_pos: raw.return_pos,
        })
    }

    pub fn enter_steps(&self) -> &[Point] {
        &self.enter_steps
    }

    pub fn tracks(&self) -> &[Point; 4] {
        &self.tracks
    }

    pub fn return_pos(&self) -> Point {
        self.return_pos
    }

    /// Every click target, recorded or derived.
    pub fn all_points(&self) -> impl Iterator<Item = Point> + '_ {
        self.enter_steps
            .iter()
            .copied()
            .chain(self.tracks.iter().copied())
            .chain(std::iter::once(self.return_pos))
    }
}
