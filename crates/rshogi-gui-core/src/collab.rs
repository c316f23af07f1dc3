//! 局面と棋譜のコラボレータ。
//!
//! 盤面表現・合法手生成・棋譜ファイル形式はこの crate の外で実装する。
//! オーケストレータはここに定義した呼び出し契約だけを使い、指し手は USI 文字列で受け渡す。

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::CollabError;
use crate::types::{Color, EndReason};

/// 入玉宣言のルール。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EnteringKingRule {
    /// 宣言勝ちを認めない
    #[default]
    None,
    /// 24 点法
    Point24,
    /// 27 点法（CSA ルール）
    Point27,
    /// トライルール
    TryRule,
}

/// 棋譜側が検出する特殊な終局条件。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpecialTerminal {
    RepetitionDraw,
    /// 連続王手の千日手など。`winner` が勝ち。
    RepetitionWin { winner: Color },
    MaxMovesDraw,
}

pub trait GamePosition: Send {
    fn side_to_move(&self) -> Color;

    fn is_legal(&self, mv: &str) -> bool;

    fn apply(&mut self, mv: &str) -> Result<(), CollabError>;

    fn undo(&mut self) -> Result<(), CollabError>;

    /// 空なら手番側は詰んでいる。
    fn legal_moves(&self) -> Vec<String>;

    /// 局面を変更せずに SFEN の妥当性だけを確かめる。
    fn validate_sfen(&self, sfen: &str) -> Result<(), CollabError>;

    fn set_sfen(&mut self, sfen: &str) -> Result<(), CollabError>;

    fn sfen(&self) -> String;

    /// 手番側が `rule` の下で宣言勝ちの条件を満たしているか。
    fn declaration_win(&self, rule: EnteringKingRule) -> bool;

    /// 詰将棋探索にかけられる局面か（攻め方の玉がない局面なども含めて判定する）。
    fn is_mate_searchable(&self) -> bool;
}

/// 棋譜（本譜 1 本）のコラボレータ。分岐の扱いは実装側に任せる。
pub trait GameRecord: Send {
    fn reset(&mut self, root_sfen: &str);

    fn root_sfen(&self) -> String;

    /// 開始局面から現在ノードまでの指し手。
    fn moves(&self) -> Vec<String>;

    fn ply(&self) -> usize {
        self.moves().len()
    }

    /// `sfen_after` は千日手判定用。
    fn append_move(&mut self, mv: &str, sfen_after: &str, spent: Duration);

    fn append_terminal(&mut self, reason: EndReason, by: Color);

    /// 現在ノードを 1 手戻す。戻せなければ `false`。
    fn undo(&mut self) -> bool;

    fn select(&mut self, index: usize) -> Result<(), CollabError>;

    fn load_text(&mut self, text: &str) -> Result<(), CollabError>;

    /// 直前の `append_move` で特殊な終局条件が成立したか。
    fn special_terminal(&self) -> Option<SpecialTerminal>;
}

/// 棋譜の現在ノードまでを局面に再生する。
pub fn replay(position: &mut dyn GamePosition, record: &dyn GameRecord) -> Result<(), CollabError> {
    position.set_sfen(&record.root_sfen())?;
    for mv in record.moves() {
        position.apply(&mv)?;
    }
    Ok(())
}
