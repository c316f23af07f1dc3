//! 手番と対局結果

use serde::{Deserialize, Serialize};

/// 手番（先手/後手）
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Color {
    #[default]
    Black = 0,
    White = 1,
}

impl Color {
    /// 手番の数
    pub const NUM: usize = 2;

    pub const ALL: [Color; 2] = [Color::Black, Color::White];

    /// 相手番を返す
    #[inline]
    pub const fn opponent(self) -> Color {
        match self {
            Color::Black => Color::White,
            Color::White => Color::Black,
        }
    }

    /// インデックスとして使用（配列アクセス用）
    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }

    pub const fn label(self) -> &'static str {
        match self {
            Color::Black => "black",
            Color::White => "white",
        }
    }
}

impl std::ops::Not for Color {
    type Output = Color;

    #[inline]
    fn not(self) -> Color {
        self.opponent()
    }
}

/// 対局の終わり方。棋譜の終局ノードにもそのまま記録する。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EndReason {
    Checkmate,
    Resign,
    TimeUp,
    /// 中断。エンジン異常による打ち切りもここに含める。
    Interrupt,
    IllegalMove,
    DeclaredWin,
    Repetition,
    /// 連続王手の千日手など、片方の勝ちになる千日手
    RepetitionWin,
    MaxMoves,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct GameResult {
    /// 引き分け・中断は `None`
    pub winner: Option<Color>,
    pub reason: EndReason,
    /// 終局の原因となった側（投了した側、反則した側など）
    pub by: Color,
    pub ply: usize,
}
