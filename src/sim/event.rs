/// Events emitted during a controller tick.
/// The presentation layer consumes these for sound.

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GameEvent {
    LevelStarted { index: usize },
    ItemCollected,
    SwitchPressed,
    PlayerKilled { lives_left: u32 },
    LevelCleared { index: usize },
    GameCompleted,
}
