//! UI スレッドからオーケストレータへのコマンド。
//!
//! コマンドは実行に必要な値をすべて自前で持つ。ワーカーは tick ごとにキューを
//! 丸ごと差し替えてから実行するので、ロックを握るのは差し替えの間だけ。
//! 実行中のハンドラが新しいコマンドを積んでも自己デッドロックしない。

use std::mem;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::clock::{LimitKind, TimeSettings};
use crate::types::Color;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlayerSpec {
    Human,
    /// `AppConfig::engines` の名前
    Engine { name: String },
}

/// 対局開始の条件。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameSetup {
    /// 省略時は平手
    #[serde(default)]
    pub root_sfen: Option<String>,
    pub black: PlayerSpec,
    pub white: PlayerSpec,
    #[serde(default)]
    pub black_time: TimeSettings,
    #[serde(default)]
    pub white_time: TimeSettings,
    #[serde(default)]
    pub engine_limit: LimitKind,
}

impl GameSetup {
    pub fn new(black: PlayerSpec, white: PlayerSpec) -> Self {
        Self {
            root_sfen: None,
            black,
            white,
            black_time: TimeSettings::unlimited(),
            white_time: TimeSettings::unlimited(),
            engine_limit: LimitKind::WallClock,
        }
    }

    pub fn with_time(mut self, time: TimeSettings) -> Self {
        self.black_time = time;
        self.white_time = time;
        self
    }

    pub fn player(&self, color: Color) -> &PlayerSpec {
        match color {
            Color::Black => &self.black,
            Color::White => &self.white,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    StartGame(GameSetup),
    /// 人間の指し手。手番でなければ無視される。
    SubmitMove { color: Color, mv: String },
    Resign { color: Color },
    DeclareWin { color: Color },
    Undo,
    /// 対局・検討の中断。エンジン同士の対局でも受け付ける。
    Interrupt,
    /// エンジンにすぐ指させる（`stop`）。
    MoveNow,
    SelectKifuIndex(usize),
    LoadKifuText(String),
    EnterConsideration { engine: String },
    EnterMultiConsideration { engines: Vec<String> },
    EnterConsiderationNoEngine,
    EnterMateSearch { engine: String },
    EnterBoardEdit,
    /// 盤面編集の結果を反映する。`BoardEdit` 中のみ。
    SetPosition { sfen: String },
    LeaveMode,
    SetMultiPv(u32),
    Shutdown,
}

/// 複数スレッドから積めるコマンドキュー。
#[derive(Debug, Clone, Default)]
pub struct CommandQueue {
    inner: Arc<Mutex<Vec<Command>>>,
}

impl CommandQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, command: Command) {
        self.inner.lock().push(command);
    }

    /// 積まれているコマンドを取り出し、空のキューと差し替える。
    pub fn take_all(&self) -> Vec<Command> {
        mem::take(&mut *self.inner.lock())
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn take_all_swaps_the_queue() {
        let queue = CommandQueue::new();
        let producer = queue.clone();
        producer.push(Command::Undo);
        producer.push(Command::MoveNow);
        let batch = queue.take_all();
        assert_eq!(batch, vec![Command::Undo, Command::MoveNow]);
        assert!(queue.is_empty());

        // 実行中に積まれたものは次の tick に回る
        for cmd in batch {
            if cmd == Command::Undo {
                queue.push(Command::LeaveMode);
            }
        }
        assert_eq!(queue.take_all(), vec![Command::LeaveMode]);
    }

    #[test]
    fn game_setup_from_toml() {
        let setup: GameSetup = toml::from_str(
            r#"
            black = "Human"
            white = { Engine = { name = "suisho" } }
            engine_limit = { depth = 8 }
            [black_time]
            main_ms = 600000
            byoyomi_ms = 10000
            "#,
        )
        .unwrap();
        assert_eq!(setup.player(Color::White), &PlayerSpec::Engine { name: "suisho".into() });
        assert_eq!(setup.black_time, TimeSettings::byoyomi(600_000, 10_000));
        assert_eq!(setup.white_time, TimeSettings::default());
        assert_eq!(setup.engine_limit, LimitKind::Depth(8));
    }
}
