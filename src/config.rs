use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Tunable run parameters, persisted between sessions. A missing file yields
/// the defaults; a partial file overrides only the keys present.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Seconds between clicks while walking the enter flow.
    pub click_interval_enter: f64,
    /// Wait after the enter flow while the game loads.
    pub load_time_before_game: f64,
    /// How long the play phase keeps sweeping the tracks.
    pub game_duration: f64,
    /// Wait before the results screen is clickable.
    pub load_time_after_game: f64,
    /// Seconds between the repeated return-button clicks.
    pub click_interval_return: f64,
    /// Base pause between track sweeps while playing.
    pub click_interval_in_game: f64,
    /// Pixel radius of the random offset applied to every click.
    pub click_jitter: i32,
    /// Seconds of random spread applied to the in-game pause.
    pub time_jitter: f64,
    /// Cycle limit; 0 runs until stopped.
    pub max_loops: u32,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            click_interval_enter: 0.7,
            load_time_before_game: 15.0,
            game_duration: 80.0,
            load_time_after_game: 12.0,
            click_interval_return: 1.5,
            click_interval_in_game: 0.167,
            click_jitter: 2,
            time_jitter: 0.005,
            max_loops: 10,
        }
    }
}

impl RunConfig {
    /// Loads the saved config, falling back to the defaults if the file is
    /// missing. A corrupt file is reported but never fatal.
    pub fn load(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }
        match fs::read_to_string(path) {
            Ok(text) => match serde_json::from_str(&text) {
                Ok(config) => config,
                Err(err) => {
                    log::warn!("ignoring corrupt config {}: {err}", path.display());
                    Self::default()
                }
            },
            Err(err) => {
                log::warn!("could not read config {}: {err}", path.display());
                Self::default()
            }
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let text = serde_json::to_string_pretty(self)?;
        fs::write(path, text)
            .with_context(|| format!("could not save config to {}", path.display()))
    }
}
