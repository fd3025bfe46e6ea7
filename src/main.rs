use std::path::PathBuf;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use eframe::egui::{self, Color32, RichText};

use rhythm_clicker::config::RunConfig;
use rhythm_clicker::input::screen_bounds;
use rhythm_clicker::positions::{Positions, Variant};
use rhythm_clicker::scheduler::{Cadence, Phase, SessionJob};

/// Replays recorded enter-play-return click cycles for a rhythm game.
#[derive(Parser)]
#[command(version, about)]
struct Args {
    /// Coordinate file produced by the calibrate tool.
    #[arg(long, default_value = "positions.json")]
    positions: PathBuf,
    /// Saved run parameters.
    #[arg(long, default_value = "config.json")]
    config: PathBuf,
    /// Expect the 11-step enter flow instead of the 7-step one.
    #[arg(long)]
    extended: bool,
}

// -------------- Parameter panel --------------

const PARAM_LABELS: [&str; 9] = [
    "Enter-flow click interval (s)",
    "Loading wait before play (s)",
    "Play duration (s)",
    "Wait before results screen (s)",
    "Return click interval (s)",
    "Pause between track sweeps (s)",
    "Click jitter (± px)",
    "Timing jitter (± s)",
    "Max cycles (0 = unlimited)",
];

fn buffers_from(config: &RunConfig) -> [String; 9] {
    [
        config.click_interval_enter.to_string(),
        config.load_time_before_game.to_string(),
        config.game_duration.to_string(),
        config.load_time_after_game.to_string(),
        config.click_interval_return.to_string(),
        config.click_interval_in_game.to_string(),
        config.click_jitter.to_string(),
        config.time_jitter.to_string(),
        config.max_loops.to_string(),
    ]
}

/// Parses every field, rejecting the whole batch if any entry is not a
/// finite number. Values are clamped to zero from below.
fn apply_params(buffers: &[String; 9], config: &mut RunConfig) -> Result<(), String> {
    let mut values = [0.0f64; 9];
    for (i, buffer) in buffers.iter().enumerate() {
        let value: f64 = buffer
            .trim()
            .parse()
            .map_err(|_| format!("{} must be a number", PARAM_LABELS[i]))?;
        if !value.is_finite() {
            return Err(format!("{} must be a number", PARAM_LABELS[i]));
        }
        values[i] = value;
    }
    let [enter, load_before, duration, load_after, ret, in_game, jitter_px, jitter_s, max_loops] =
        values;
    config.click_interval_enter = enter.max(0.0);
    config.load_time_before_game = load_before.max(0.0);
    config.game_duration = duration.max(0.0);
    config.load_time_after_game = load_after.max(0.0);
    config.click_interval_return = ret.max(0.0);
    config.click_interval_in_game = in_game.max(0.0);
    config.click_jitter = jitter_px.max(0.0) as i32;
    config.time_jitter = jitter_s.max(0.0);
    config.max_loops = max_loops.max(0.0) as u32;
    Ok(())
}

// -------------- UI State --------------

const TIPS: &str = "\
Keep the game window in the foreground while a run is active.
Coordinates are absolute; recalibrate after moving the window.
Stop takes effect within about a second.";

struct App {
    config_path: PathBuf,
    config: RunConfig,
    positions: Positions,
    param_buffers: [String; 9],
    error: Option<String>,
    job: Option<SessionJob>,
}

impl App {
    fn new(config_path: PathBuf, config: RunConfig, positions: Positions) -> Self {
        let param_buffers = buffers_from(&config);
        Self {
            config_path,
            config,
            positions,
            param_buffers,
            error: None,
            job: None,
        }
    }

    fn job_active(&self) -> bool {
        self.job.as_ref().is_some_and(SessionJob::is_active)
    }

    fn start(&mut self) {
        if self.job_active() {
            return;
        }
        if let Err(message) = apply_params(&self.param_buffers, &mut self.config) {
            self.error = Some(message);
            return;
        }
        self.error = None;
        if let Err(err) = self.config.save(&self.config_path) {
            log::warn!("{err:#}");
        }
        self.job = Some(SessionJob::spawn(
            self.config.clone(),
            self.positions.clone(),
            Cadence::default(),
        ));
    }

    fn stop(&mut self) {
        if let Some(job) = &self.job {
            job.stop();
        }
    }
}

impl eframe::App for App {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        egui::TopBottomPanel::top("top").show(ctx, |ui| {
            ui.heading("Rhythm Clicker");
        });

        egui::CentralPanel::default().show(ctx, |ui| {
            let active = self.job_active();

            ui.add_enabled_ui(!active, |ui| {
                ui.group(|ui| {
                    ui.label("Run parameters");
                    for (buffer, label) in self.param_buffers.iter_mut().zip(PARAM_LABELS) {
                        ui.horizontal(|ui| {
                            ui.add(egui::TextEdit::singleline(buffer).desired_width(70.0));
                            ui.label(label);
                        });
                    }
                });
            });

            ui.separator();
            ui.horizontal(|ui| {
                if ui.add_enabled(!active, egui::Button::new("Start")).clicked() {
                    self.start();
                }
                if ui.add_enabled(active, egui::Button::new("Stop")).clicked() {
                    self.stop();
                }
            });

            let (phase, info) = match &self.job {
                Some(job) => {
                    let status = job.status();
                    let minutes = status.elapsed_work().as_secs() / 60;
                    (
                        status.phase,
                        format!("cycle {} | worked {} min", status.loop_count, minutes),
                    )
                }
                None => (Phase::Idle, String::new()),
            };
            let color = match phase {
                Phase::Idle | Phase::Stopped => Color32::GRAY,
                Phase::Countdown => Color32::YELLOW,
                Phase::Resting => Color32::LIGHT_BLUE,
                _ => Color32::LIGHT_GREEN,
            };
            ui.label(RichText::new(format!("Status: {}", phase.label())).color(color));
            if !info.is_empty() {
                ui.monospace(info);
            }
            if let Some(error) = &self.error {
                ui.label(RichText::new(error).color(Color32::LIGHT_RED));
            }

            ui.separator();
            ui.label(RichText::new(TIPS).small());
        });

        // Keep the status line current while a job exists.
        if self.job.is_some() {
            ctx.request_repaint_after(Duration::from_millis(250));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn buffers_round_trip_through_apply() {
        let original = RunConfig {
            click_interval_enter: 0.45,
            game_duration: 92.5,
            click_jitter: 3,
            max_loops: 0,
            ..RunConfig::default()
        };
        let buffers = buffers_from(&original);
        let mut parsed = RunConfig::default();
        apply_params(&buffers, &mut parsed).unwrap();
        assert_eq!(parsed, original);
    }

    #[test]
    fn non_numeric_input_is_rejected() {
        let mut buffers = buffers_from(&RunConfig::default());
        buffers[2] = "fast".to_string();
        let mut config = RunConfig::default();
        let message = apply_params(&buffers, &mut config).unwrap_err();
        assert!(message.contains("Play duration"));
        // The batch is rejected wholesale; nothing was applied.
        assert_eq!(config, RunConfig::default());
    }

    #[test]
    fn non_finite_input_is_rejected() {
        let mut buffers = buffers_from(&RunConfig::default());
        buffers[0] = "inf".to_string();
        assert!(apply_params(&buffers, &mut RunConfig::default()).is_err());
    }

    #[test]
    fn negative_values_clamp_to_zero() {
        let mut buffers = buffers_from(&RunConfig::default());
        buffers[1] = "-4".to_string();
        buffers[8] = "-2".to_string();
        let mut config = RunConfig::default();
        apply_params(&buffers, &mut config).unwrap();
        assert_eq!(config.load_time_before_game, 0.0);
        assert_eq!(config.max_loops, 0);
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();
    let variant = if args.extended {
        Variant::Extended
    } else {
        Variant::Standard
    };

    let config = RunConfig::load(&args.config);
    let positions =
        Positions::load(&args.positions, variant).context("could not load click coordinates")?;
    if let Some(bounds) = screen_bounds() {
        let stray = positions
            .all_points()
            .filter(|p| !bounds.contains(*p))
            .count();
        if stray > 0 {
            log::warn!("{stray} recorded positions fall outside the visible screen area");
        }
    }

    let mut opts = eframe::NativeOptions::default();
    opts.viewport.inner_size = Some(egui::vec2(420.0, 560.0));
    opts.viewport.resizable = Some(false);

    eframe::run_native(
        "Rhythm Clicker",
        opts,
        Box::new(move |cc| {
            cc.egui_ctx.set_visuals(egui::Visuals::dark());
            Box::new(App::new(args.config, config, positions))
        }),
    )
    .map_err(|err| anyhow!("failed to start UI: {err}"))
}
