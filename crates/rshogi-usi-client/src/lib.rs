//! GUI 側の USI クライアント。
//!
//! 外部エンジンをサブプロセスとして起動し、USI ハンドシェイク・オプション表・
//! `info` テレメトリの解析を行う [`EngineSession`] と、同時に 1 探索しか走らせない
//! ことを保証する [`ThinkCoordinator`] を提供する。
//!
//! 局面や棋譜の表現は扱わない。指し手は USI 文字列のまま受け渡す。

pub mod config;
pub mod error;
pub mod protocol;
pub mod session;
pub mod think;
pub mod transport;

#[cfg(any(test, feature = "test-support"))]
pub mod testing;

pub use config::EngineConfig;
pub use error::{OptionError, ParseError, SessionError};
pub use protocol::{
    BestMove, BestMoveToken, EngineMessage, EngineOption, GameOverResult, GoCommand, InfoReport,
    MateLimit, MateResult, MateScore, OptionKind, OptionTable, SFEN_HIRATE, Score, ScoreBound,
    TimeExtra, position_command,
};
pub use session::{Connector, EngineSession, ProcessConnector, SessionEvent, SessionState};
pub use think::{ResultDisposition, SearchResult, ThinkCoordinator, ThinkEvent, ThinkOutcome, ThinkRequest};
pub use transport::{Poll, ProcessTransport, Transport};
