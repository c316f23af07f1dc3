//! 結合テスト用の局面・棋譜コラボレータ。
//!
//! 盤面は持たず、指し手を USI 文字列の列として積むだけ。合法性・詰み・宣言勝ちなどは
//! テストから [`Flags`] で指定する。
#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use rshogi_gui_core::{
    CollabError, Color, EndReason, EnteringKingRule, GamePosition, GameRecord, SpecialTerminal,
};
use rshogi_usi_client::SFEN_HIRATE;
use rshogi_usi_client::protocol::is_usi_move;

#[derive(Debug)]
pub struct Flags {
    pub illegal: HashSet<String>,
    /// この手数で手番側に合法手がなくなる
    pub mated_at_ply: Option<usize>,
    pub declaration_ok: bool,
    pub mate_searchable: bool,
    /// `set_sfen` を失敗させる
    pub fail_set_sfen: bool,
}

impl Default for Flags {
    fn default() -> Self {
        Self {
            illegal: HashSet::new(),
            mated_at_ply: None,
            declaration_ok: false,
            mate_searchable: true,
            fail_set_sfen: false,
        }
    }
}

pub struct FakePosition {
    root: String,
    moves: Vec<String>,
    flags: Arc<Mutex<Flags>>,
}

impl FakePosition {
    pub fn new() -> (Self, Arc<Mutex<Flags>>) {
        let flags = Arc::new(Mutex::new(Flags::default()));
        (
            Self {
                root: SFEN_HIRATE.to_string(),
                moves: Vec::new(),
                flags: Arc::clone(&flags),
            },
            flags,
        )
    }
}

impl GamePosition for FakePosition {
    fn side_to_move(&self) -> Color {
        let root_side = match self.root.split_whitespace().nth(1) {
            Some("w") => Color::White,
            _ => Color::Black,
        };
        if self.moves.len() % 2 == 0 { root_side } else { !root_side }
    }

    fn is_legal(&self, mv: &str) -> bool {
        is_usi_move(mv) && !self.flags.lock().illegal.contains(mv)
    }

    fn apply(&mut self, mv: &str) -> Result<(), CollabError> {
        if !self.is_legal(mv) {
            return Err(CollabError::IllegalMove(mv.to_string()));
        }
        self.moves.push(mv.to_string());
        Ok(())
    }

    fn undo(&mut self) -> Result<(), CollabError> {
        self.moves.pop().map(|_| ()).ok_or(CollabError::NothingToUndo)
    }

    fn legal_moves(&self) -> Vec<String> {
        if self.flags.lock().mated_at_ply == Some(self.moves.len()) {
            Vec::new()
        } else {
            vec!["1g1f".to_string(), "9c9d".to_string()]
        }
    }

    fn validate_sfen(&self, sfen: &str) -> Result<(), CollabError> {
        if sfen.split_whitespace().count() < 3 || sfen.contains("invalid") {
            return Err(CollabError::InvalidSfen(sfen.to_string()));
        }
        Ok(())
    }

    fn set_sfen(&mut self, sfen: &str) -> Result<(), CollabError> {
        self.validate_sfen(sfen)?;
        if self.flags.lock().fail_set_sfen {
            return Err(CollabError::InvalidSfen(sfen.to_string()));
        }
        self.root = sfen.to_string();
        self.moves.clear();
        Ok(())
    }

    fn sfen(&self) -> String {
        if self.moves.is_empty() {
            self.root.clone()
        } else {
            format!("{} moves {}", self.root, self.moves.join(" "))
        }
    }

    fn declaration_win(&self, rule: EnteringKingRule) -> bool {
        rule != EnteringKingRule::None && self.flags.lock().declaration_ok
    }

    fn is_mate_searchable(&self) -> bool {
        self.flags.lock().mate_searchable
    }
}

#[derive(Debug, Default)]
pub struct RecordLog {
    pub root: String,
    pub moves: Vec<String>,
    pub spent: Vec<Duration>,
    pub cursor: usize,
    pub terminals: Vec<(EndReason, Color)>,
    /// この手数に達したら千日手
    pub repetition_at: Option<usize>,
    pub max_moves: Option<usize>,
}

/// 分岐なしの棋譜。待ったで戻した手は消える。
pub struct LinearRecord {
    log: Arc<Mutex<RecordLog>>,
}

impl LinearRecord {
    pub fn new() -> (Self, Arc<Mutex<RecordLog>>) {
        let log = Arc::new(Mutex::new(RecordLog {
            root: SFEN_HIRATE.to_string(),
            ..RecordLog::default()
        }));
        (
            Self {
                log: Arc::clone(&log),
            },
            log,
        )
    }
}

impl GameRecord for LinearRecord {
    fn reset(&mut self, root_sfen: &str) {
        let mut log = self.log.lock();
        let repetition_at = log.repetition_at;
        let max_moves = log.max_moves;
        *log = RecordLog {
            root: root_sfen.to_string(),
            repetition_at,
            max_moves,
            ..RecordLog::default()
        };
    }

    fn root_sfen(&self) -> String {
        self.log.lock().root.clone()
    }

    fn moves(&self) -> Vec<String> {
        let log = self.log.lock();
        log.moves[..log.cursor].to_vec()
    }

    fn append_move(&mut self, mv: &str, _sfen_after: &str, spent: Duration) {
        let mut log = self.log.lock();
        let cursor = log.cursor;
        log.moves.truncate(cursor);
        log.spent.truncate(cursor);
        log.moves.push(mv.to_string());
        log.spent.push(spent);
        log.cursor += 1;
    }

    fn append_terminal(&mut self, reason: EndReason, by: Color) {
        self.log.lock().terminals.push((reason, by));
    }

    fn undo(&mut self) -> bool {
        let mut log = self.log.lock();
        if log.cursor == 0 {
            return false;
        }
        log.cursor -= 1;
        let cursor = log.cursor;
        log.moves.truncate(cursor);
        log.spent.truncate(cursor);
        true
    }

    fn select(&mut self, index: usize) -> Result<(), CollabError> {
        let mut log = self.log.lock();
        if index > log.moves.len() {
            return Err(CollabError::IndexOutOfRange(index));
        }
        log.cursor = index;
        Ok(())
    }

    fn load_text(&mut self, text: &str) -> Result<(), CollabError> {
        let moves: Vec<String> = text.split_whitespace().map(str::to_string).collect();
        if let Some(bad) = moves.iter().find(|m| !is_usi_move(m)) {
            return Err(CollabError::Parse(format!("not a move: {bad}")));
        }
        let mut log = self.log.lock();
        log.root = SFEN_HIRATE.to_string();
        log.cursor = moves.len();
        log.spent = vec![Duration::ZERO; moves.len()];
        log.moves = moves;
        Ok(())
    }

    fn special_terminal(&self) -> Option<SpecialTerminal> {
        let log = self.log.lock();
        if log.repetition_at == Some(log.cursor) {
            Some(SpecialTerminal::RepetitionDraw)
        } else if log.max_moves == Some(log.cursor) {
            Some(SpecialTerminal::MaxMovesDraw)
        } else {
            None
        }
    }
}
