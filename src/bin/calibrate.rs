use std::path::PathBuf;
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::Parser;
use rdev::{Button, Event, EventType, Key};

use rhythm_clicker::input::screen_bounds;
use rhythm_clicker::positions::{Point, RawPositions, Variant};

/// Records the screen positions the runner clicks: the enter-flow steps,
/// the leftmost and rightmost track, and the return button.
#[derive(Parser)]
#[command(version, about)]
struct Args {
    /// Where to write the recorded coordinates.
    #[arg(long, default_value = "positions.json")]
    out: PathBuf,
    /// Record the 11-step enter flow instead of the 7-step one.
    #[arg(long)]
    extended: bool,
    /// Seconds to wait before capturing starts.
    #[arg(long, default_value_t = 5)]
    countdown: u64,
}

/// Capture prompts for the standard enter flow, in click order.
const STANDARD_PROMPTS: [&str; 7] = [
    "main menu: performance button",
    "solo performance",
    "left song list",
    "song entry",
    "easy difficulty",
    "confirm",
    "start playing",
];

fn prompts(variant: Variant) -> Vec<String> {
    let mut prompts: Vec<String> = match variant {
        Variant::Standard => STANDARD_PROMPTS.iter().map(|s| s.to_string()).collect(),
        Variant::Extended => (1..=variant.enter_steps())
            .map(|i| format!("enter-flow step {i}"))
            .collect(),
    };
    prompts.push("in game: leftmost track".to_string());
    prompts.push("in game: rightmost track".to_string());
    prompts.push("results screen: return-to-menu button".to_string());
    prompts
}

enum Capture {
    Click(Point),
    Abort,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();
    let variant = if args.extended {
        Variant::Extended
    } else {
        Variant::Standard
    };
    let prompts = prompts(variant);
    let total = prompts.len();

    println!("Recording {total} positions to {}", args.out.display());
    if let Some(bounds) = screen_bounds() {
        println!("Screen area: {}x{} px", bounds.width(), bounds.height());
    }
    println!();
    for (i, prompt) in prompts.iter().enumerate() {
        println!("  {:2}. {prompt}", i + 1);
    }
    println!();
    println!("Switch to the game window. Esc aborts without saving.");
    for remaining in (1..=args.countdown).rev() {
        println!("starting in {remaining}...");
        thread::sleep(Duration::from_secs(1));
    }
    println!("go - click the positions above in order");
    println!("  next: {}", prompts[0]);

    // rdev button events carry no coordinates, so the listener tracks the
    // pointer from move events and stamps each left press with the last
    // known position. The listener blocks its thread forever; captures come
    // back over the channel.
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let mut cursor = Point::new(0, 0);
        let result = rdev::listen(move |event: Event| match event.event_type {
            EventType::MouseMove { x, y } => {
                cursor = Point::new(x as i32, y as i32);
            }
            EventType::ButtonPress(Button::Left) => {
                let _ = tx.send(Capture::Click(cursor));
            }
            EventType::KeyPress(Key::Escape) => {
                let _ = tx.send(Capture::Abort);
            }
            _ => {}
        });
        if let Err(err) = result {
            eprintln!("input listener failed: {err:?}");
            std::process::exit(1);
        }
    });

    let mut points = Vec::with_capacity(total);
    while points.len() < total {
        match rx.recv().context("input listener stopped")? {
            Capture::Click(point) => {
                points.push(point);
                println!(
                    "  [{}/{}] recorded ({}, {})",
                    points.len(),
                    total,
                    point.x,
                    point.y
                );
                if points.len() < total {
                    println!("  next: {}", prompts[points.len()]);
                }
            }
            Capture::Abort => bail!("aborted before all positions were recorded"),
        }
    }

    let enter = total - 3;
    let raw = RawPositions {
        enter_steps: points[..enter].to_vec(),
        track_left: points[enter],
        track_right: points[enter + 1],
        return_pos: points[enter + 2],
    };
    raw.save(&args.out)?;
    println!("saved {total} positions to {}", args.out.display());
    Ok(())
}
