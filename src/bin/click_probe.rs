use anyhow::{anyhow, Result};
use rdev::{Button, Event, EventType, Key};

/// Prints the absolute screen coordinates of every left click. Esc exits.
fn main() -> Result<()> {
    println!("click anywhere to print coordinates; Esc exits");
    let mut cursor = (0.0, 0.0);
    rdev::listen(move |event: Event| match event.event_type {
        EventType::MouseMove { x, y } => cursor = (x, y),
        EventType::ButtonPress(Button::Left) => {
            println!("clicked at ({}, {})", cursor.0 as i32, cursor.1 as i32);
        }
        EventType::KeyPress(Key::Escape) => std::process::exit(0),
        _ => {}
    })
    .map_err(|err| anyhow!("input listener failed: {err:?}"))
}
