use rshogi_usi_client::SessionError;

use crate::mode::GameMode;

/// モード遷移が拒否・失敗した理由。いずれの場合もモードは遷移前のまま。
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransitionError {
    #[error("transition vetoed: {0}")]
    Vetoed(String),

    #[error("cannot change mode while in {0:?}")]
    Busy(GameMode),

    #[error("no engine named '{0}' in the configuration")]
    UnknownEngine(String),

    #[error("engine '{engine}' failed to start: {source}")]
    EngineStart {
        engine: String,
        #[source]
        source: SessionError,
    },
}

/// 局面・棋譜コラボレータが返すエラー。
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CollabError {
    #[error("invalid sfen: {0}")]
    InvalidSfen(String),

    #[error("illegal move: {0}")]
    IllegalMove(String),

    #[error("nothing to undo")]
    NothingToUndo,

    #[error("kifu index {0} is out of range")]
    IndexOutOfRange(usize),

    #[error("failed to parse kifu: {0}")]
    Parse(String),
}
