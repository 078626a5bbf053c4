/// State transitions: the only code that mutates game state.
///
/// Transition order within a frame is fixed by the caller: taps are
/// applied before countdown ticks, so a level cleared on its final
/// second beats the timeout racing it. Every function is a no-op
/// outside the phase it handles, which makes stale input and stale
/// ticks harmless.

use crate::config::GameConfig;
use crate::domain::grid::GridLayout;
use crate::domain::level;
use crate::domain::rules::{self, TapRuling};

use super::event::GameEvent;
use super::world::{GameOverReason, Phase, WorldState};

/// Generate and enter the current `world.level`.
///
/// Level, countdown, bubble size, and the target set are replaced
/// together; the popped set is cleared. Ends in `Playing`.
pub fn start_level(world: &mut WorldState, config: &GameConfig) -> Vec<GameEvent> {
    let params = level::generate(
        world.level,
        world.viewport,
        world.layout.columns,
        world.bubble_size,
        config,
        &mut world.rng,
    );

    world.bubble_size = params.bubble_size;
    world.time_left = params.time_limit;
    world.highlighted = params.highlighted;
    world.popped.clear();
    world.layout = params.layout;
    world.cursor = 0;
    world.best_level = world.best_level.max(world.level);
    world.phase = Phase::Playing;

    vec![GameEvent::LevelStarted { level: params.level }]
}

/// Tap on a cell index. Live only while `Playing` and unpaused.
pub fn tap(world: &mut WorldState, index: usize) -> Vec<GameEvent> {
    if world.phase != Phase::Playing || world.paused {
        return vec![];
    }

    match rules::classify_tap(
        &world.highlighted,
        &world.popped,
        world.layout.total_cells(),
        index,
    ) {
        TapRuling::Pop => {
            world.popped.insert(index);
            vec![GameEvent::BubblePopped {
                index,
                remaining: world.remaining_targets(),
            }]
        }
        TapRuling::ClearsLevel => {
            world.popped.insert(index);
            debug_assert!(rules::is_cleared(&world.highlighted, &world.popped));
            world.phase = Phase::LevelCleared;
            vec![
                GameEvent::BubblePopped { index, remaining: 0 },
                GameEvent::LevelCleared { level: world.level },
            ]
        }
        TapRuling::Miss => {
            world.phase = Phase::GameOver(GameOverReason::WrongTap);
            vec![GameEvent::GameOver {
                reason: GameOverReason::WrongTap,
            }]
        }
        TapRuling::AlreadyPopped | TapRuling::OutOfRange => vec![],
    }
}

/// One second elapsed. Live only while `Playing` and unpaused.
pub fn tick_second(world: &mut WorldState) -> Vec<GameEvent> {
    if world.phase != Phase::Playing || world.paused {
        return vec![];
    }

    world.time_left = world.time_left.saturating_sub(1);
    if world.time_left == 0 {
        world.phase = Phase::GameOver(GameOverReason::Timeout);
        return vec![GameEvent::GameOver {
            reason: GameOverReason::Timeout,
        }];
    }
    vec![]
}

/// Acknowledge the level-cleared dialog: next level.
pub fn advance_level(world: &mut WorldState, config: &GameConfig) -> Vec<GameEvent> {
    if world.phase != Phase::LevelCleared {
        return vec![];
    }
    world.level += 1;
    start_level(world, config)
}

/// Reset the run to level 1: counters, bubble size, and the column ramp
/// all return to their defaults. Leaves the world in `Restarting`; the
/// caller follows up with `start_level` to re-enter `Playing`.
pub fn restart_run(world: &mut WorldState, config: &GameConfig) {
    world.phase = Phase::Restarting;
    world.level = 1;
    world.highlighted.clear();
    world.popped.clear();
    world.bubble_size = config.bubble.start_size;
    world.time_left = config.timing.base_time_secs;
    world.layout = GridLayout::empty();
    world.cursor = 0;
    world.paused = false;
}

// ══════════════════════════════════════════════════════════════
// Unit tests
// ══════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::level::Viewport;
    use crate::sim::event::GameEvent;

    fn config() -> GameConfig {
        GameConfig::default()
    }

    /// A world mid-level with a hand-built 3x3 grid and fixed targets,
    /// bypassing the generator.
    fn playing_world(targets: &[usize]) -> WorldState {
        let mut w = WorldState::new(7);
        w.viewport = Viewport { width: 80, height: 24 };
        w.layout = GridLayout {
            columns: 3,
            rows: 3,
            bubble_w: 4,
            bubble_h: 2,
            margin: 1,
            origin_x: 0,
            origin_y: 3,
        };
        w.highlighted = targets.iter().copied().collect();
        w.time_left = 30;
        w.bubble_size = 7;
        w.phase = Phase::Playing;
        w
    }

    fn popped_subset_of_highlighted(w: &WorldState) -> bool {
        w.popped.is_subset(&w.highlighted)
    }

    // ── tap outcomes ──

    #[test]
    fn popping_all_targets_in_order_clears_level() {
        let mut w = playing_world(&[2, 5, 7]);
        assert!(matches!(tap(&mut w, 2)[..], [GameEvent::BubblePopped { index: 2, remaining: 2 }]));
        assert_eq!(w.phase, Phase::Playing);
        tap(&mut w, 5);
        assert_eq!(w.phase, Phase::Playing);
        let events = tap(&mut w, 7);
        assert_eq!(w.phase, Phase::LevelCleared);
        assert!(matches!(events[..], [
            GameEvent::BubblePopped { index: 7, .. },
            GameEvent::LevelCleared { level: 1 },
        ]));
        assert!(popped_subset_of_highlighted(&w));
    }

    #[test]
    fn any_order_clears_exactly_once() {
        let mut w = playing_world(&[2, 5, 7]);
        tap(&mut w, 7);
        tap(&mut w, 2);
        tap(&mut w, 5);
        assert_eq!(w.phase, Phase::LevelCleared);
        // further taps are inert: the dialog is up
        assert!(tap(&mut w, 2).is_empty());
        assert!(tap(&mut w, 0).is_empty());
        assert_eq!(w.phase, Phase::LevelCleared);
    }

    #[test]
    fn wrong_first_tap_ends_the_run() {
        let mut w = playing_world(&[2, 5, 7]);
        let events = tap(&mut w, 0);
        assert_eq!(w.phase, Phase::GameOver(GameOverReason::WrongTap));
        assert!(matches!(events[..], [GameEvent::GameOver { reason: GameOverReason::WrongTap }]));
        assert!(w.popped.is_empty());
    }

    #[test]
    fn wrong_tap_ends_the_run_regardless_of_progress() {
        let mut w = playing_world(&[2, 5, 7]);
        tap(&mut w, 2);
        tap(&mut w, 5);
        tap(&mut w, 3);
        assert_eq!(w.phase, Phase::GameOver(GameOverReason::WrongTap));
        assert!(popped_subset_of_highlighted(&w));
    }

    #[test]
    fn popped_and_out_of_range_taps_are_noops() {
        let mut w = playing_world(&[2, 5, 7]);
        tap(&mut w, 2);
        assert!(tap(&mut w, 2).is_empty());
        assert!(tap(&mut w, 9).is_empty());
        assert!(tap(&mut w, 1000).is_empty());
        assert_eq!(w.phase, Phase::Playing);
        assert_eq!(w.popped.len(), 1);
    }

    #[test]
    fn taps_ignored_while_paused() {
        let mut w = playing_world(&[2, 5, 7]);
        w.paused = true;
        assert!(tap(&mut w, 2).is_empty());
        assert!(w.popped.is_empty());
    }

    #[test]
    fn taps_ignored_outside_playing() {
        let mut w = playing_world(&[2]);
        w.phase = Phase::Title;
        assert!(tap(&mut w, 2).is_empty());
        w.phase = Phase::Restarting;
        assert!(tap(&mut w, 2).is_empty());
    }

    // ── countdown ──

    #[test]
    fn countdown_ticks_down() {
        let mut w = playing_world(&[2]);
        w.time_left = 3;
        assert!(tick_second(&mut w).is_empty());
        assert_eq!(w.time_left, 2);
        assert_eq!(w.phase, Phase::Playing);
    }

    #[test]
    fn reaching_zero_times_out() {
        let mut w = playing_world(&[2]);
        w.time_left = 1;
        let events = tick_second(&mut w);
        assert_eq!(w.phase, Phase::GameOver(GameOverReason::Timeout));
        assert!(matches!(events[..], [GameEvent::GameOver { reason: GameOverReason::Timeout }]));
    }

    #[test]
    fn no_timeout_after_level_cleared_on_same_tick() {
        let mut w = playing_world(&[2]);
        w.time_left = 1;
        tap(&mut w, 2);
        assert_eq!(w.phase, Phase::LevelCleared);
        // the tick that raced the clearing tap arrives late
        assert!(tick_second(&mut w).is_empty());
        assert_eq!(w.phase, Phase::LevelCleared);
    }

    #[test]
    fn ticks_ignored_while_paused() {
        let mut w = playing_world(&[2]);
        w.time_left = 1;
        w.paused = true;
        assert!(tick_second(&mut w).is_empty());
        assert_eq!(w.time_left, 1);
    }

    // ── level flow ──

    #[test]
    fn start_level_enters_playing_with_fresh_sets() {
        let mut w = WorldState::new(7);
        w.viewport = Viewport { width: 80, height: 24 };
        restart_run(&mut w, &config());
        let events = start_level(&mut w, &config());
        assert!(matches!(events[..], [GameEvent::LevelStarted { level: 1 }]));
        assert_eq!(w.phase, Phase::Playing);
        assert_eq!(w.time_left, 30);
        assert_eq!(w.layout.columns, 1);
        assert!(w.popped.is_empty());
        assert!(!w.highlighted.is_empty());
        assert!(w.highlighted.iter().all(|&i| i < w.layout.total_cells()));
    }

    #[test]
    fn advance_level_increments_and_regenerates() {
        let mut w = WorldState::new(7);
        w.viewport = Viewport { width: 80, height: 24 };
        restart_run(&mut w, &config());
        start_level(&mut w, &config());
        w.phase = Phase::LevelCleared;
        advance_level(&mut w, &config());
        assert_eq!(w.level, 2);
        assert_eq!(w.phase, Phase::Playing);
        assert_eq!(w.layout.columns, 2);
        assert_eq!(w.time_left, 29);
        assert!(w.popped.is_empty());
    }

    #[test]
    fn advance_level_only_from_cleared_dialog() {
        let mut w = playing_world(&[2]);
        advance_level(&mut w, &config());
        assert_eq!(w.level, 1);
        assert_eq!(w.phase, Phase::Playing);
    }

    #[test]
    fn restart_resets_everything_to_defaults() {
        let c = config();
        let mut w = WorldState::new(7);
        w.viewport = Viewport { width: 80, height: 24 };
        restart_run(&mut w, &c);
        start_level(&mut w, &c);

        // play up to level 6 so the ramp, clock, and bubble size all move
        for _ in 0..5 {
            w.phase = Phase::LevelCleared;
            advance_level(&mut w, &c);
        }
        assert_eq!(w.level, 6);
        assert!(w.layout.columns > 1);
        assert!(w.bubble_size < c.bubble.start_size);

        w.phase = Phase::GameOver(GameOverReason::Timeout);
        restart_run(&mut w, &c);
        assert_eq!(w.phase, Phase::Restarting);
        assert_eq!(w.level, 1);
        assert!(w.popped.is_empty());
        assert!(w.highlighted.is_empty());
        assert_eq!(w.bubble_size, c.bubble.start_size);
        assert_eq!(w.time_left, c.timing.base_time_secs);

        start_level(&mut w, &c);
        assert_eq!(w.phase, Phase::Playing);
        assert_eq!(w.layout.columns, 1); // ramp starts over
    }

    #[test]
    fn best_level_tracks_deepest_run() {
        let c = config();
        let mut w = WorldState::new(7);
        w.viewport = Viewport { width: 80, height: 24 };
        restart_run(&mut w, &c);
        start_level(&mut w, &c);
        for _ in 0..3 {
            w.phase = Phase::LevelCleared;
            advance_level(&mut w, &c);
        }
        assert_eq!(w.best_level, 4);
        restart_run(&mut w, &c);
        start_level(&mut w, &c);
        assert_eq!(w.best_level, 4);
    }

    #[test]
    fn bubble_shrinks_entering_level_five() {
        let c = config();
        let mut w = WorldState::new(7);
        w.viewport = Viewport { width: 80, height: 24 };
        restart_run(&mut w, &c);
        start_level(&mut w, &c);
        for _ in 0..3 {
            w.phase = Phase::LevelCleared;
            advance_level(&mut w, &c);
        }
        assert_eq!(w.level, 4);
        assert_eq!(w.bubble_size, c.bubble.start_size);
        w.phase = Phase::LevelCleared;
        advance_level(&mut w, &c);
        assert_eq!(w.level, 5);
        assert_eq!(w.bubble_size, c.bubble.start_size - c.bubble.shrink_step);
    }
}
