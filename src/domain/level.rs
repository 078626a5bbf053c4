/// Level parameter generation.
///
/// All per-level arithmetic lives here: how fast the countdown decays,
/// when bubbles shrink, how the grid ramps up, and which cells become
/// targets. The formulas are:
///
///   countdown = max(min_time, base_time - level / 2)
///   columns   = min(previous columns + 1, columns that fit the viewport)
///   shrink    = entering a level divisible by `shrink_every`, bubble
///               width steps down by `shrink_step`, clamped to `min_size`
///   targets   = level + 2 uniform draws over the grid
///
/// Target draws are independent, so the same cell can be drawn twice;
/// duplicates collapse in the set and simply mean one target fewer.

use std::collections::BTreeSet;

use rand::Rng;

use crate::config::GameConfig;
use crate::domain::grid::{bubble_height, GridLayout};

/// Terminal viewport in character cells.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Viewport {
    pub width: usize,
    pub height: usize,
}

/// Everything a fresh level needs, computed atomically.
#[derive(Clone, Debug)]
pub struct LevelParams {
    pub level: u32,
    pub layout: GridLayout,
    pub bubble_size: usize,
    pub time_limit: u32,
    pub highlighted: BTreeSet<usize>,
}

/// Seconds on the clock for a level.
pub fn time_limit_for(level: u32, config: &GameConfig) -> u32 {
    config
        .timing
        .base_time_secs
        .saturating_sub(level / 2)
        .max(config.timing.min_time_secs)
}

/// Bubble width for a level, given the previous level's width.
pub fn bubble_size_for(level: u32, prev_size: usize, config: &GameConfig) -> usize {
    if level % config.bubble.shrink_every == 0 {
        prev_size
            .saturating_sub(config.bubble.shrink_step)
            .max(config.bubble.min_size)
    } else {
        prev_size
    }
}

/// How many bubble columns fit the viewport. Never zero, even on a
/// viewport narrower than one bubble.
pub fn max_columns(viewport_w: usize, bubble_size: usize, margin: usize) -> usize {
    (viewport_w / (bubble_size + margin).max(1)).max(1)
}

/// How many bubble rows fit below the HUD. Never zero.
pub fn rows_for(viewport_h: usize, bubble_size: usize, margin: usize, reserved_rows: usize) -> usize {
    let step = bubble_height(bubble_size) + margin;
    (viewport_h.saturating_sub(reserved_rows) / step.max(1)).max(1)
}

/// Number of target draws for a level.
pub fn target_count(level: u32) -> usize {
    level as usize + 2
}

/// Draw `count` independent uniform cell indices into a set.
pub fn draw_targets<R: Rng>(rng: &mut R, count: usize, total_cells: usize) -> BTreeSet<usize> {
    let mut targets = BTreeSet::new();
    for _ in 0..count {
        targets.insert(rng.random_range(0..total_cells.max(1)));
    }
    targets
}

/// Compute a complete parameter set for `level`.
///
/// `prev_columns` is the previous level's column count (0 at the start of
/// a run, restarting the ramp) and `prev_size` the previous bubble width.
pub fn generate<R: Rng>(
    level: u32,
    viewport: Viewport,
    prev_columns: usize,
    prev_size: usize,
    config: &GameConfig,
    rng: &mut R,
) -> LevelParams {
    let bubble_size = bubble_size_for(level, prev_size, config);
    let margin = config.bubble.margin;

    let columns = (prev_columns + 1).min(max_columns(viewport.width, bubble_size, margin));
    let rows = rows_for(viewport.height, bubble_size, margin, config.grid.reserved_rows);

    let layout = GridLayout::centered(
        columns,
        rows,
        bubble_size,
        margin,
        viewport.width,
        config.grid.reserved_rows,
    );

    let highlighted = draw_targets(rng, target_count(level), layout.total_cells());

    LevelParams {
        level,
        layout,
        bubble_size,
        time_limit: time_limit_for(level, config),
        highlighted,
    }
}

// ══════════════════════════════════════════════════════════════
// Unit tests
// ══════════════════════════════════════════════════════════════
