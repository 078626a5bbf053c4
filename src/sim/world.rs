/// WorldState: the complete snapshot of a running game.
///
/// One explicit state struct owned by the state machine. All mutation
/// goes through the transition functions in `sim::step` (plus the meta
/// handling in `main`); the renderer and input layers only read, except
/// for the measured viewport which the renderer refreshes each frame.
///
/// Invariant: `popped ⊆ highlighted`. A miss ends the run before
/// anything is inserted, and both sets are replaced together whenever
/// the level changes.

use std::collections::BTreeSet;

use rand::SeedableRng;
use rand_pcg::Pcg32;

use crate::domain::grid::GridLayout;
use crate::domain::level::Viewport;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum GameOverReason {
    WrongTap,
    Timeout,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Phase {
    /// Home screen.
    Title,
    /// Countdown armed, taps live.
    Playing,
    /// Blocking dialog: all targets popped, waiting for acknowledge.
    LevelCleared,
    /// Blocking dialog: run over, waiting for acknowledge.
    GameOver(GameOverReason),
    /// Counters reset, next `start_level` re-enters Playing.
    Restarting,
}

/// Visual state of a single grid cell, as consumed by the renderer.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum CellState {
    Normal,
    Highlighted,
    Popped,
}

pub struct WorldState {
    pub phase: Phase,

    // ── Level ──
    pub level: u32,
    pub bubble_size: usize,
    pub time_left: u32,
    pub highlighted: BTreeSet<usize>,
    pub popped: BTreeSet<usize>,
    pub layout: GridLayout,

    // ── Meta ──
    pub best_level: u32,
    pub rng: Pcg32,

    // ── UI ──
    pub cursor: usize,
    pub viewport: Viewport,
    pub paused: bool,
    pub message: String,
    pub message_timer: u32,
}

impl WorldState {
    pub fn new(seed: u64) -> Self {
        WorldState {
            phase: Phase::Title,
            level: 1,
            bubble_size: 0,
            time_left: 0,
            highlighted: BTreeSet::new(),
            popped: BTreeSet::new(),
            layout: GridLayout::empty(),
            best_level: 0,
            rng: Pcg32::seed_from_u64(seed),
            cursor: 0,
            viewport: Viewport { width: 0, height: 0 },
            paused: false,
            message: String::new(),
            message_timer: 0,
        }
    }

    /// Per-cell visual state for the renderer.
    pub fn cell_state(&self, index: usize) -> CellState {
        if self.popped.contains(&index) {
            CellState::Popped
        } else if self.highlighted.contains(&index) {
            CellState::Highlighted
        } else {
            CellState::Normal
        }
    }

    /// Targets still unpopped this level.
    pub fn remaining_targets(&self) -> usize {
        self.highlighted.difference(&self.popped).count()
    }

    pub fn set_message(&mut self, msg: &str, frames: u32) {
        self.message = msg.to_string();
        self.message_timer = frames;
    }

    /// Age the status message by one frame. Duration 0 means sticky.
    pub fn tick_message(&mut self) {
        if self.message_timer > 0 {
            self.message_timer -= 1;
            if self.message_timer == 0 {
                self.message.clear();
            }
        }
    }
}
