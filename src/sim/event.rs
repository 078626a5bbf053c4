/// Events emitted by state transitions.
/// The outer loop consumes these for status messages and HUD feedback.

use super::world::GameOverReason;

#[derive(Clone, Debug)]
#[allow(dead_code)]
pub enum GameEvent {
    LevelStarted { level: u32 },
    BubblePopped { index: usize, remaining: usize },
    LevelCleared { level: u32 },
    GameOver { reason: GameOverReason },
}
