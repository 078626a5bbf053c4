/// Entry point and frame loop.

mod config;
mod domain;
mod sim;
mod ui;

use std::time::{Duration, Instant};

use crossterm::event::KeyCode;
use rand::Rng;

use config::GameConfig;
use domain::grid::MoveDir;
use domain::level::Viewport;
use sim::event::GameEvent;
use sim::step;
use sim::timer::Countdown;
use sim::world::{Phase, WorldState};
use ui::input::InputState;
use ui::renderer::Renderer;

const FRAME_SLEEP: Duration = Duration::from_millis(5);

/// Frames a transient status message stays on screen (~1.5 s).
const MESSAGE_FRAMES: u32 = 250;

fn main() {
    let config = GameConfig::load();

    let seed: u64 = rand::rng().random();
    let mut world = WorldState::new(seed);

    let mut renderer = Renderer::new();

    if let Err(e) = renderer.init() {
        eprintln!("Terminal init failed: {e}");
        return;
    }

    let (vw, vh) = renderer.viewport();
    world.viewport = Viewport { width: vw, height: vh };

    let result = game_loop(&mut world, &mut renderer, &config);

    if let Err(e) = renderer.cleanup() {
        eprintln!("Terminal cleanup failed: {e}");
    }

    if let Err(e) = result {
        eprintln!("Game error: {e}");
    }

    println!();
    println!("Thanks for playing Pop It!");
    if world.best_level > 0 {
        println!("Best level reached: {}", world.best_level);
    }
}

fn game_loop(
    world: &mut WorldState,
    renderer: &mut Renderer,
    config: &GameConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut input = InputState::new();
    let mut countdown = Countdown::new();

    loop {
        input.drain_events();

        if input.ctrl_c_pressed() {
            break;
        }

        // A confirm press that acknowledges a dialog must not double as a
        // tap on the level it just started; taps are honored only if the
        // frame began in Playing.
        let taps_live = world.phase == Phase::Playing && !world.paused;

        if handle_meta(world, &input, config) {
            break;
        }

        if world.phase == Phase::Playing && !world.paused {
            // Cursor movement
            if let Some(dir) = detect_movement(&input) {
                world.cursor = world.layout.step_cursor(world.cursor, dir);
            }

            // Taps land before ticks: a level cleared on its final second
            // beats the timeout racing it.
            if taps_live {
                for index in collect_taps(world, &input) {
                    let events = step::tap(world, index);
                    process_events(world, &events);
                }
            }

            for _ in 0..countdown.poll(Instant::now()) {
                let events = step::tick_second(world);
                process_events(world, &events);
            }
        }

        // Scoped countdown discipline: the schedule exists exactly while
        // the world is in Playing and unpaused.
        if world.phase == Phase::Playing && !world.paused {
            if !countdown.is_armed() {
                countdown.arm(Instant::now());
            }
        } else {
            countdown.cancel();
        }

        world.tick_message();
        renderer.render(world)?;
        std::thread::sleep(FRAME_SLEEP);
    }

    Ok(())
}

// ── Key Constants ──

const KEYS_LEFT: &[KeyCode] = &[KeyCode::Left, KeyCode::Char('a'), KeyCode::Char('A')];
const KEYS_RIGHT: &[KeyCode] = &[KeyCode::Right, KeyCode::Char('d'), KeyCode::Char('D')];
const KEYS_UP: &[KeyCode] = &[KeyCode::Up, KeyCode::Char('w'), KeyCode::Char('W')];
const KEYS_DOWN: &[KeyCode] = &[KeyCode::Down, KeyCode::Char('s'), KeyCode::Char('S')];
const KEYS_RESTART: &[KeyCode] = &[KeyCode::Char('r'), KeyCode::Char('R')];
const KEYS_QUIT: &[KeyCode] = &[KeyCode::Char('q'), KeyCode::Char('Q')];
const KEYS_CONFIRM: &[KeyCode] = &[KeyCode::Enter, KeyCode::Char(' ')];

fn detect_movement(input: &InputState) -> Option<MoveDir> {
    if input.any_pressed(KEYS_UP) {
        Some(MoveDir::Up)
    } else if input.any_pressed(KEYS_DOWN) {
        Some(MoveDir::Down)
    } else if input.any_pressed(KEYS_LEFT) {
        Some(MoveDir::Left)
    } else if input.any_pressed(KEYS_RIGHT) {
        Some(MoveDir::Right)
    } else {
        None
    }
}

/// Resolve this frame's input into cell taps: mouse clicks through the
/// grid hit-test, plus the confirm key on the cursor cell.
fn collect_taps(world: &WorldState, input: &InputState) -> Vec<usize> {
    let mut taps = vec![];
    for &(x, y) in input.clicks() {
        if let Some(index) = world.layout.hit_test(x as usize, y as usize) {
            taps.push(index);
        }
    }
    if input.any_pressed(KEYS_CONFIRM) {
        taps.push(world.cursor);
    }
    taps
}

/// Turn transition events into HUD feedback.
fn process_events(world: &mut WorldState, events: &[GameEvent]) {
    for event in events {
        match event {
            GameEvent::LevelStarted { level } => {
                let targets = world.remaining_targets();
                world.set_message(&format!("Level {level}: pop {targets} bubbles!"), MESSAGE_FRAMES);
            }
            GameEvent::BubblePopped { remaining, .. } if *remaining > 0 => {
                world.set_message(&format!("{remaining} to go"), MESSAGE_FRAMES);
            }
            _ => {}
        }
    }
}

/// Start a fresh run from level 1.
fn start_new_run(world: &mut WorldState, config: &GameConfig) {
    step::restart_run(world, config);
    let events = step::start_level(world, config);
    process_events(world, &events);
}

/// Back to the home screen. Best level survives; the run does not.
fn return_to_title(world: &mut WorldState) {
    world.phase = Phase::Title;
    world.paused = false;
    world.message.clear();
    world.message_timer = 0;
}

/// Screen navigation and dialog acknowledgements. Returns true to quit.
fn handle_meta(world: &mut WorldState, input: &InputState, config: &GameConfig) -> bool {
    let confirm = input.any_pressed(KEYS_CONFIRM);
    let esc = input.was_pressed(KeyCode::Esc);

    match world.phase {
        // ── Home Screen ──
        Phase::Title => {
            if confirm {
                start_new_run(world, config);
            } else if input.any_pressed(KEYS_QUIT) || esc {
                return true;
            }
        }

        // ── Playing ──
        Phase::Playing => {
            // F1: Pause / Resume
            if input.was_pressed(KeyCode::F(1)) {
                world.paused = !world.paused;
                // The pause overlay carries the resume hint; drop any
                // stale status message underneath it.
                world.message.clear();
                world.message_timer = 0;
                return false;
            }
            if world.paused {
                if esc {
                    return_to_title(world);
                }
                return false; // Block all other input while paused
            }
            if esc {
                return_to_title(world);
            } else if input.any_pressed(KEYS_RESTART) {
                start_new_run(world, config);
                world.set_message("Run restarted", MESSAGE_FRAMES);
            }
        }

        // ── Level Cleared dialog ──
        Phase::LevelCleared => {
            if confirm {
                let events = step::advance_level(world, config);
                process_events(world, &events);
            }
        }

        // ── Game Over dialog ──
        Phase::GameOver(_) => {
            if confirm {
                start_new_run(world, config);
            } else if esc {
                return_to_title(world);
            }
        }

        // ── Restarting ──
        Phase::Restarting => {
            // Transient: start_level follows in the same frame.
        }
    }

    false
}
