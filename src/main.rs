/// Entry point and game loop.

mod config;
mod domain;
mod sim;
mod ui;

use std::time::{Duration, Instant};

use crossterm::event::KeyCode;

use config::GameConfig;
use sim::event::GameEvent;
use sim::step::step;
use sim::world::{TilePlane, World};
use ui::input::InputState;
use ui::renderer::Renderer;

const FRAME_SLEEP: Duration = Duration::from_millis(5);

#[derive(Clone, Copy, PartialEq, Eq)]
enum Phase {
    Playing,
    Cleared,
}

fn main() {
    env_logger::init();
    let config = GameConfig::load();

    let mut world = demo_world(&config);
    let mut renderer = Renderer::new();

    if let Err(e) = renderer.init() {
        eprintln!("Terminal init failed: {e}");
        return;
    }

    let result = game_loop(&mut world, &mut renderer, &config);

    if let Err(e) = renderer.cleanup() {
        eprintln!("Terminal cleanup failed: {e}");
    }
    if let Err(e) = result {
        eprintln!("Game error: {e}");
    }
}

fn game_loop(
    world: &mut World,
    renderer: &mut Renderer,
    config: &GameConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut kb = InputState::new();
    let mut last_tick = Instant::now();
    let tick_rate = Duration::from_millis(config.timing.tick_rate_ms);

    let mut phase = Phase::Playing;
    let mut message = String::new();
    let mut message_timer: u32 = 0;

    loop {
        kb.drain_events();

        if kb.ctrl_c_pressed() || kb.key_seen(KeyCode::Esc) {
            break;
        }

        if last_tick.elapsed() >= tick_rate {
            match phase {
                Phase::Playing => {
                    let (vkeys, new_vkeys) = kb.read_pads();
                    let events = step(world, vkeys, new_vkeys);
                    for event in &events {
                        match event {
                            GameEvent::ItemPickup { .. } => {
                                set_message(&mut message, &mut message_timer, "Grapnel get!", 90);
                            }
                            GameEvent::RopeSnapped => {
                                set_message(&mut message, &mut message_timer, "Cable snapped!", 60);
                            }
                            GameEvent::LevelComplete => {
                                phase = Phase::Cleared;
                                set_message(
                                    &mut message,
                                    &mut message_timer,
                                    "Cleared!  [Enter] again",
                                    0,
                                );
                            }
                            GameEvent::PlayerLost => {
                                *world = demo_world(config);
                                set_message(&mut message, &mut message_timer, "Lost it...", 60);
                            }
                            _ => {}
                        }
                    }
                }
                Phase::Cleared => {
                    if kb.key_seen(KeyCode::Enter) || kb.key_seen(KeyCode::Char(' ')) {
                        *world = demo_world(config);
                        phase = Phase::Playing;
                        message.clear();
                        message_timer = 0;
                    }
                }
            }

            if message_timer > 0 {
                message_timer -= 1;
                if message_timer == 0 {
                    message.clear();
                }
            }

            last_tick = Instant::now();
        }

        let status = if message.is_empty() {
            format!(
                "{:?}  ({:>5.1},{:>5.1})  arrows move, Z tether, Esc quit",
                world.player.state, world.player.pos.x, world.player.pos.y,
            )
        } else {
            message.clone()
        };
        renderer.render(world, &status)?;
        std::thread::sleep(FRAME_SLEEP);
    }

    Ok(())
}

/// `duration` 0 keeps the message up until something replaces it.
fn set_message(message: &mut String, timer: &mut u32, text: &str, duration: u32) {
    *message = text.to_string();
    *timer = duration;
}

/// Built-in demo stage: tether item on the floor, a pushable crate, a
/// ladder up to a one-way platform, a swing pole, and the exit door.
fn demo_world(config: &GameConfig) -> World {
    let plane = TilePlane::from_rows(&[
        "",
        "",
        "",
        "              T",
        "",
        "          ---            #####",
        "",
        "",
        "   >=====",
        "   >                             d",
        "   >  *             B            D",
        "########################################",
    ]);
    let mut world = World::new(plane, config.tiles.clone());
    world.spawn_at(2, 10);
    world
}
