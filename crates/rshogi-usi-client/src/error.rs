use std::time::Duration;

use crate::session::SessionState;

/// セッション単位のエラー。
///
/// `ConnectionFailed` / `HandshakeTimeout` / `ProcessTerminated` はセッションにとって致命的で、
/// `EngineSession::fatal_error` に保持される。
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    #[error("failed to start engine {path}: {reason}")]
    ConnectionFailed { path: String, reason: String },

    #[error("engine did not send usiok within {0:?}")]
    HandshakeTimeout(Duration),

    #[error("engine did not send readyok within {0:?}")]
    ReadyTimeout(Duration),

    #[error("engine process terminated")]
    ProcessTerminated,

    #[error("failed to write to engine: {0}")]
    Io(String),

    #[error("engine is not connected")]
    NotConnected,

    #[error("engine is not ready to search (state: {0:?})")]
    NotReady(SessionState),
}

/// 1 行分の解析エラー。行ディスパッチャ内で消費され、外へは伝播しない。
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("empty line")]
    Empty,

    #[error("unknown message: {0}")]
    UnknownMessage(String),

    #[error("malformed {kind} line: {line}")]
    Malformed { kind: &'static str, line: String },

    #[error("unknown option type '{kind}' in: {line}")]
    UnknownOptionType { kind: String, line: String },
}

impl ParseError {
    pub(crate) fn malformed(kind: &'static str, line: &str) -> Self {
        ParseError::Malformed {
            kind,
            line: line.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OptionError {
    #[error("engine does not declare option '{0}'")]
    Unknown(String),

    #[error("option '{name}': {value} is outside {min}..={max}")]
    OutOfRange {
        name: String,
        value: i64,
        min: i64,
        max: i64,
    },

    #[error("option '{name}': invalid value '{value}'")]
    InvalidValue { name: String, value: String },
}
