/// Presentation layer: double-buffered, diff-based terminal renderer.
///
/// How it works:
///   1. Build the next frame into `front` buffer (array of Cell)
///   2. Compare each cell with `back` buffer (previous frame)
///   3. Only emit terminal commands for cells that changed
///   4. All commands are batched with `queue!`, flushed once at the end
///   5. Swap front/back
///
/// This eliminates flicker caused by full-screen redraws, which matters
/// here because most frames only change the countdown digits.

use std::io::{self, BufWriter, Write};

use crossterm::{
    cursor::{self, MoveTo},
    event::{DisableMouseCapture, EnableMouseCapture},
    execute, queue,
    style::{Color, Print, ResetColor, SetBackgroundColor, SetForegroundColor},
    terminal::{self, Clear, ClearType},
};

use crate::sim::world::{CellState, GameOverReason, Phase, WorldState};

// ── Cell: the unit of the back-buffer ──

#[derive(Clone, Copy, PartialEq, Eq)]
struct Cell {
    ch: char,
    fg: Color,
    bg: Color,
}

impl Cell {
    /// Explicit dark background for all "empty" terminal cells. Using the
    /// SAME color for Clear and every cell keeps VTE inter-row gap pixels
    /// from showing as horizontal lines.
    const BASE_BG: Color = Color::Rgb { r: 16, g: 22, b: 38 };

    const BLANK: Cell = Cell {
        ch: ' ',
        fg: Color::White,
        bg: Cell::BASE_BG,
    };

    /// Sentinel cell used to invalidate the back buffer.
    /// Different from any real cell, so every position will be diff'd.
    const INVALID: Cell = Cell {
        ch: '?',
        fg: Color::Magenta,
        bg: Color::Magenta,
    };
}

// ── Palette ──

const BUBBLE_NORMAL: Color = Color::Rgb { r: 97, g: 218, b: 251 };
const BUBBLE_TARGET: Color = Color::Rgb { r: 255, g: 215, b: 0 };
const BUBBLE_POPPED: Color = Color::Rgb { r: 106, g: 110, b: 118 };
const TIMER_FG: Color = Color::Rgb { r: 255, g: 69, b: 0 };
const HINT_FG: Color = Color::Rgb { r: 130, g: 138, b: 156 };
const CURSOR_FG: Color = Color::White;

// ── FrameBuffer: a 2D grid of Cells ──

struct FrameBuffer {
    w: usize,
    h: usize,
    cells: Vec<Cell>,
}

impl FrameBuffer {
    fn new(w: usize, h: usize) -> Self {
        FrameBuffer {
            w,
            h,
            cells: vec![Cell::BLANK; w * h],
        }
    }

    fn resize(&mut self, w: usize, h: usize) {
        self.w = w;
        self.h = h;
        self.cells = vec![Cell::BLANK; w * h];
    }

    fn clear(&mut self) {
        self.cells.fill(Cell::BLANK);
    }

    fn set(&mut self, x: usize, y: usize, cell: Cell) {
        if x < self.w && y < self.h {
            self.cells[y * self.w + x] = cell;
        }
    }

    /// Write a string starting at (x, y), clipped to the buffer.
    fn text(&mut self, x: usize, y: usize, s: &str, fg: Color, bg: Color) {
        for (i, ch) in s.chars().enumerate() {
            self.set(x + i, y, Cell { ch, fg, bg });
        }
    }

    fn text_centered(&mut self, y: usize, s: &str, fg: Color, bg: Color) {
        let len = s.chars().count();
        let x = self.w.saturating_sub(len) / 2;
        self.text(x, y, s, fg, bg);
    }
}

// ── Renderer ──

pub struct Renderer {
    writer: BufWriter<io::Stdout>,
    front: FrameBuffer,
    back: FrameBuffer,
    term_w: usize,
    term_h: usize,
    last_phase: Option<Phase>,
}

impl Renderer {
    pub fn new() -> Self {
        Renderer {
            writer: BufWriter::with_capacity(16384, io::stdout()),
            front: FrameBuffer::new(0, 0),
            back: FrameBuffer::new(0, 0),
            term_w: 0,
            term_h: 0,
            last_phase: None,
        }
    }

    pub fn init(&mut self) -> io::Result<()> {
        terminal::enable_raw_mode()?;
        execute!(
            self.writer,
            terminal::EnterAlternateScreen,
            EnableMouseCapture,
            cursor::Hide,
            SetBackgroundColor(Cell::BASE_BG),
            Clear(ClearType::All)
        )?;

        let (tw, th) = terminal::size().unwrap_or((80, 24));
        self.term_w = tw as usize;
        self.term_h = th as usize;
        self.front.resize(self.term_w, self.term_h);
        self.back.resize(self.term_w, self.term_h);
        // Force full repaint on first frame: back ≠ front for every cell.
        self.back.cells.fill(Cell::INVALID);

        Ok(())
    }

    pub fn cleanup(&mut self) -> io::Result<()> {
        execute!(
            self.writer,
            ResetColor,
            cursor::Show,
            DisableMouseCapture,
            terminal::LeaveAlternateScreen
        )?;
        terminal::disable_raw_mode()
    }

    /// Terminal size in cells, as measured at the last init/render.
    pub fn viewport(&self) -> (usize, usize) {
        (self.term_w, self.term_h)
    }

    pub fn render(&mut self, world: &mut WorldState) -> io::Result<()> {
        // Detect terminal resize
        let (tw, th) = terminal::size().unwrap_or((80, 24));
        if tw as usize != self.term_w || th as usize != self.term_h {
            self.term_w = tw as usize;
            self.term_h = th as usize;
            self.front.resize(self.term_w, self.term_h);
            self.back.resize(self.term_w, self.term_h);
            // Force full repaint after resize.
            self.back.cells.fill(Cell::INVALID);
            queue!(self.writer, SetBackgroundColor(Cell::BASE_BG), Clear(ClearType::All))?;
        }

        // The state machine reads the viewport at level generation time;
        // keep the measurement fresh.
        world.viewport.width = self.term_w;
        world.viewport.height = self.term_h;

        // Detect phase change → clear for clean transition
        let phase_changed = self.last_phase != Some(world.phase);
        if phase_changed {
            self.back.cells.fill(Cell::INVALID);
            queue!(self.writer, SetBackgroundColor(Cell::BASE_BG), Clear(ClearType::All))?;
            self.last_phase = Some(world.phase);
        }

        // Build front buffer
        self.front.clear();

        match world.phase {
            Phase::Title => self.compose_title(world),
            Phase::Playing | Phase::Restarting => self.compose_game(world),
            Phase::LevelCleared => {
                self.compose_game(world);
                self.compose_level_cleared(world);
            }
            Phase::GameOver(reason) => {
                self.compose_game(world);
                self.compose_game_over(world, reason);
            }
        }

        // Pause overlay (drawn on top of the game)
        if world.paused {
            self.compose_modal(&[
                ("PAUSED", BUBBLE_TARGET),
                ("", Color::White),
                ("[F1] Resume", HINT_FG),
            ]);
        }

        // Diff and emit
        self.flush_diff()?;

        // Swap: current front becomes next back
        std::mem::swap(&mut self.front, &mut self.back);

        Ok(())
    }

    // ── Composers ──

    fn compose_title(&mut self, world: &WorldState) {
        let mid = self.term_h / 2;
        let top = mid.saturating_sub(5);

        self.front.text_centered(top, "╭─────────────────────────╮", BUBBLE_NORMAL, Cell::BASE_BG);
        self.front.text_centered(top + 1, "│       P O P   I T !     │", BUBBLE_TARGET, Cell::BASE_BG);
        self.front.text_centered(top + 2, "╰─────────────────────────╯", BUBBLE_NORMAL, Cell::BASE_BG);
        self.front.text_centered(top + 4, "Tap to Start", HINT_FG, Cell::BASE_BG);
        self.front.text_centered(
            top + 6,
            "Pop every glowing bubble before the clock runs out.",
            Color::White,
            Cell::BASE_BG,
        );
        self.front.text_centered(
            top + 7,
            "One wrong bubble and the run is over.",
            Color::White,
            Cell::BASE_BG,
        );
        if world.best_level > 0 {
            let best = format!("Best level: {}", world.best_level);
            self.front.text_centered(top + 9, &best, BUBBLE_TARGET, Cell::BASE_BG);
        }
        self.front.text_centered(
            self.term_h.saturating_sub(2),
            "[Enter] Start    [Q] Quit",
            HINT_FG,
            Cell::BASE_BG,
        );
    }

    fn compose_game(&mut self, world: &WorldState) {
        // ── HUD ──
        let hud = format!(" Level {}", world.level);
        self.front.text(1, 0, &hud, Color::White, Cell::BASE_BG);

        let clock = format!("Time Left: {}s ", world.time_left);
        let clock_x = self.term_w.saturating_sub(clock.chars().count() + 1);
        self.front.text(clock_x, 0, &clock, TIMER_FG, Cell::BASE_BG);

        if !world.message.is_empty() {
            self.front.text_centered(1, &world.message, BUBBLE_TARGET, Cell::BASE_BG);
        }

        // ── Bubbles ──
        for index in 0..world.layout.total_cells() {
            self.compose_bubble(world, index);
        }

        // ── Help line ──
        self.front.text_centered(
            self.term_h.saturating_sub(1),
            "[Click / Enter] Pop   [Arrows] Move   [F1] Pause   [R] Restart   [Esc] Title",
            HINT_FG,
            Cell::BASE_BG,
        );
    }

    fn compose_bubble(&mut self, world: &WorldState, index: usize) {
        let layout = &world.layout;
        let (ox, oy) = match layout.cell_origin(index) {
            Some(p) => p,
            None => return,
        };
        let w = layout.bubble_w;
        let h = layout.bubble_h;
        if w == 0 || h == 0 {
            return;
        }

        let state = world.cell_state(index);
        let mut fg = match state {
            CellState::Normal => BUBBLE_NORMAL,
            CellState::Highlighted => BUBBLE_TARGET,
            CellState::Popped => BUBBLE_POPPED,
        };
        if index == world.cursor && world.phase == Phase::Playing {
            fg = CURSOR_FG;
        }

        for row in 0..h {
            for col in 0..w {
                let ch = border_char(col, row, w, h);
                self.front.set(ox + col, oy + row, Cell { ch, fg, bg: Cell::BASE_BG });
            }
        }

        // Live targets carry a caption so they read even on mono themes.
        if state == CellState::Highlighted {
            let label = if w >= 6 && h >= 3 { "Pop!" } else { "!" };
            let len = label.chars().count();
            let lx = ox + (w.saturating_sub(len)) / 2;
            let ly = oy + h / 2;
            self.front.text(lx, ly, label, BUBBLE_TARGET, Cell::BASE_BG);
        }
    }

    fn compose_level_cleared(&mut self, world: &WorldState) {
        let title = format!("Level {} Complete!", world.level);
        self.compose_modal(&[
            (&title, BUBBLE_TARGET),
            ("Moving to the next level...", Color::White),
            ("", Color::White),
            ("[Enter] OK", HINT_FG),
        ]);
    }

    fn compose_game_over(&mut self, world: &WorldState, reason: GameOverReason) {
        let why = match reason {
            GameOverReason::WrongTap => "You popped the wrong bubble!",
            GameOverReason::Timeout => "You ran out of time!",
        };
        let best = format!("Best level this session: {}", world.best_level);
        self.compose_modal(&[
            ("GAME OVER", TIMER_FG),
            (why, Color::White),
            (&best, Color::White),
            ("", Color::White),
            ("[Enter] Restart    [Esc] Title", HINT_FG),
        ]);
    }

    /// Centered bordered dialog over whatever is already composed.
    /// The single action hint on the last line is the only way forward;
    /// everything underneath stays frozen until it is pressed.
    fn compose_modal(&mut self, lines: &[(&str, Color)]) {
        let inner_w = lines.iter().map(|(s, _)| s.chars().count()).max().unwrap_or(0) + 4;
        let box_w = inner_w + 2;
        let box_h = lines.len() + 2;
        let x0 = self.term_w.saturating_sub(box_w) / 2;
        let y0 = self.term_h.saturating_sub(box_h) / 2;

        let horiz: String = "─".repeat(inner_w);
        self.front.text(x0, y0, &format!("┌{horiz}┐"), Color::White, Cell::BASE_BG);
        for (i, (line, fg)) in lines.iter().enumerate() {
            let y = y0 + 1 + i;
            let blank = " ".repeat(inner_w);
            self.front.text(x0, y, "│", Color::White, Cell::BASE_BG);
            self.front.text(x0 + 1, y, &blank, Color::White, Cell::BASE_BG);
            let lx = x0 + 1 + (inner_w.saturating_sub(line.chars().count())) / 2;
            self.front.text(lx, y, line, *fg, Cell::BASE_BG);
            self.front.text(x0 + 1 + inner_w, y, "│", Color::White, Cell::BASE_BG);
        }
        self.front.text(x0, y0 + box_h - 1, &format!("└{horiz}┘"), Color::White, Cell::BASE_BG);
    }

    // ── Diff flush ──

    fn flush_diff(&mut self) -> io::Result<()> {
        let mut cur_fg: Option<Color> = None;
        let mut cur_bg: Option<Color> = None;
        // Next cell position the terminal cursor would land on by itself;
        // lets runs of changed cells skip redundant MoveTo commands.
        let mut cursor_at: Option<(usize, usize)> = None;

        for y in 0..self.front.h {
            for x in 0..self.front.w {
                let idx = y * self.front.w + x;
                let cell = self.front.cells[idx];
                if self.back.cells.get(idx) == Some(&cell) {
                    continue;
                }
                if cursor_at != Some((x, y)) {
                    queue!(self.writer, MoveTo(x as u16, y as u16))?;
                }
                if cur_fg != Some(cell.fg) {
                    queue!(self.writer, SetForegroundColor(cell.fg))?;
                    cur_fg = Some(cell.fg);
                }
                if cur_bg != Some(cell.bg) {
                    queue!(self.writer, SetBackgroundColor(cell.bg))?;
                    cur_bg = Some(cell.bg);
                }
                queue!(self.writer, Print(cell.ch))?;
                cursor_at = Some((x + 1, y));
            }
        }

        self.writer.flush()
    }
}

/// Rounded-box border character for position (col, row) in a w x h bubble.
fn border_char(col: usize, row: usize, w: usize, h: usize) -> char {
    if h == 1 {
        return match col {
            0 => '(',
            c if c == w - 1 => ')',
            _ => ' ',
        };
    }
    let top = row == 0;
    let bottom = row == h - 1;
    let left = col == 0;
    let right = col == w - 1;
    match (top, bottom, left, right) {
        (true, _, true, _) => '╭',
        (true, _, _, true) => '╮',
        (_, true, true, _) => '╰',
        (_, true, _, true) => '╯',
        (true, _, _, _) | (_, true, _, _) => '─',
        (_, _, true, _) | (_, _, _, true) => '│',
        _ => ' ',
    }
}

// ══════════════════════════════════════════════════════════════
// Unit tests
// ══════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn border_corners_and_edges() {
        // 4x2 bubble: corners only
        assert_eq!(border_char(0, 0, 4, 2), '╭');
        assert_eq!(border_char(3, 0, 4, 2), '╮');
        assert_eq!(border_char(0, 1, 4, 2), '╰');
        assert_eq!(border_char(3, 1, 4, 2), '╯');
        // 5x3: edges and interior
        assert_eq!(border_char(2, 0, 5, 3), '─');
        assert_eq!(border_char(0, 1, 5, 3), '│');
        assert_eq!(border_char(2, 1, 5, 3), ' ');
    }

    #[test]
    fn single_row_bubble_uses_parens() {
        assert_eq!(border_char(0, 0, 4, 1), '(');
        assert_eq!(border_char(3, 0, 4, 1), ')');
        assert_eq!(border_char(1, 0, 4, 1), ' ');
    }

    #[test]
    fn framebuffer_clips_out_of_bounds_writes() {
        let mut fb = FrameBuffer::new(4, 2);
        fb.text(2, 0, "abcdef", Color::White, Cell::BASE_BG);
        fb.set(0, 5, Cell::INVALID);
        assert_eq!(fb.cells[2].ch, 'a');
        assert_eq!(fb.cells[3].ch, 'b');
        // nothing wrapped onto the next row
        assert_eq!(fb.cells[4].ch, ' ');
    }
}
