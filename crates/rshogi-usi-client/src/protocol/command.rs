//! GUI → エンジンのコマンド。

use std::fmt;

use serde::{Deserialize, Serialize};

/// 平手初期局面
pub const SFEN_HIRATE: &str = "lnsgkgsnl/1r5b1/ppppppppp/9/9/9/PPPPPPPPP/1B5R1/LNSGKGSNL b - 1";

/// 秒読みと加算（フィッシャー）は同時に送らない。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimeExtra {
    /// 秒読み（ms）。何も設定されていない場合は明示的に `byoyomi 0` を送る。
    Byoyomi(u64),
    Increment { binc: u64, winc: u64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MateLimit {
    Millis(u64),
    Infinite,
}

/// `go` コマンド。探索制限はちょうど 1 種類。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GoCommand {
    Infinite,
    Nodes(u64),
    Depth(u32),
    Time { btime: u64, wtime: u64, extra: TimeExtra },
    Mate(MateLimit),
}

impl GoCommand {
    pub fn is_mate_search(&self) -> bool {
        matches!(self, GoCommand::Mate(_))
    }
}

impl fmt::Display for GoCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GoCommand::Infinite => write!(f, "go infinite"),
            GoCommand::Nodes(n) => write!(f, "go nodes {n}"),
            GoCommand::Depth(d) => write!(f, "go depth {d}"),
            GoCommand::Time {
                btime,
                wtime,
                extra,
            } => {
                write!(f, "go btime {btime} wtime {wtime}")?;
                match extra {
                    TimeExtra::Byoyomi(ms) => write!(f, " byoyomi {ms}"),
                    TimeExtra::Increment { binc, winc } => write!(f, " binc {binc} winc {winc}"),
                }
            }
            GoCommand::Mate(MateLimit::Millis(ms)) => write!(f, "go mate {ms}"),
            GoCommand::Mate(MateLimit::Infinite) => write!(f, "go mate infinite"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameOverResult {
    Win,
    Lose,
    Draw,
}

impl fmt::Display for GameOverResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            GameOverResult::Win => "win",
            GameOverResult::Lose => "lose",
            GameOverResult::Draw => "draw",
        };
        write!(f, "gameover {s}")
    }
}

/// `position` 行を組み立てる。平手初期局面は `startpos` で送る。
pub fn position_command(root_sfen: &str, moves: &[String]) -> String {
    let root = root_sfen.trim();
    let mut cmd = if root == SFEN_HIRATE || root == "startpos" {
        "position startpos".to_string()
    } else {
        format!("position sfen {root}")
    };
    if !moves.is_empty() {
        cmd.push_str(" moves ");
        cmd.push_str(&moves.join(" "));
    }
    cmd
}
