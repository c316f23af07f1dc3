//! エンジン → GUI の 1 行を復号する。

use serde::Serialize;

use super::info::{InfoReport, parse_info};
use super::moves::is_usi_move;
use super::option::{EngineOption, parse_option_line};
use crate::error::ParseError;

/// `bestmove` の第 1 トークン。
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum BestMoveToken {
    /// 指し手文字列。合法性は呼び出し側が判定する。
    Move(String),
    Resign,
    /// 入玉宣言勝ち
    Win,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BestMove {
    pub mv: BestMoveToken,
    /// 予想応手。合法である保証はない。
    pub ponder: Option<String>,
}

impl BestMove {
    pub fn usi(&self) -> &str {
        match &self.mv {
            BestMoveToken::Move(m) => m,
            BestMoveToken::Resign => "resign",
            BestMoveToken::Win => "win",
        }
    }
}

/// `go mate` の応答。
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum MateResult {
    NoMate,
    NotImplemented,
    Timeout,
    Mate(Vec<String>),
}

impl MateResult {
    /// 詰み手順の手数。詰みがなければ `None`。
    pub fn plies(&self) -> Option<usize> {
        match self {
            MateResult::Mate(moves) => Some(moves.len()),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum EngineMessage {
    IdName(String),
    IdAuthor(String),
    Option(EngineOption),
    UsiOk,
    ReadyOk,
    Info(InfoReport),
    BestMove(BestMove),
    Checkmate(MateResult),
}

/// 1 行を解析する。前後の空白は無視する。
pub fn parse_engine_line(line: &str) -> Result<EngineMessage, ParseError> {
    let line = line.trim();
    let mut tokens = line.split_whitespace();
    let head = tokens.next().ok_or(ParseError::Empty)?;
    match head {
        "usiok" => Ok(EngineMessage::UsiOk),
        "readyok" => Ok(EngineMessage::ReadyOk),
        "id" => {
            let field = tokens.next();
            let rest = tokens.collect::<Vec<_>>().join(" ");
            match field {
                Some("name") => Ok(EngineMessage::IdName(rest)),
                Some("author") => Ok(EngineMessage::IdAuthor(rest)),
                _ => Err(ParseError::malformed("id", line)),
            }
        }
        "option" => parse_option_line(line).map(EngineMessage::Option),
        "info" => parse_info(line).map(EngineMessage::Info),
        "bestmove" => parse_bestmove(line).map(EngineMessage::BestMove),
        "checkmate" => Ok(EngineMessage::Checkmate(parse_checkmate(line))),
        _ => Err(ParseError::UnknownMessage(line.to_string())),
    }
}

fn parse_bestmove(line: &str) -> Result<BestMove, ParseError> {
    let mut tokens = line.split_whitespace().skip(1);
    let mv = match tokens.next() {
        Some("resign") => BestMoveToken::Resign,
        Some("win") => BestMoveToken::Win,
        Some(m) => BestMoveToken::Move(m.to_string()),
        None => return Err(ParseError::malformed("bestmove", line)),
    };
    let ponder = match tokens.next() {
        Some("ponder") => tokens.next().map(str::to_string),
        _ => None,
    };
    Ok(BestMove { mv, ponder })
}

/// 先頭が指し手として読めなければ不詰扱いにする。
fn parse_checkmate(line: &str) -> MateResult {
    let mut tokens = line.split_whitespace().skip(1).peekable();
    match tokens.peek().copied() {
        Some("nomate") | None => MateResult::NoMate,
        Some("notimplemented") => MateResult::NotImplemented,
        Some("timeout") => MateResult::Timeout,
        Some(_) => {
            let moves: Vec<String> =
                tokens.take_while(|t| is_usi_move(t)).map(str::to_string).collect();
            if moves.is_empty() {
                MateResult::NoMate
            } else {
                MateResult::Mate(moves)
            }
        }
    }
}
