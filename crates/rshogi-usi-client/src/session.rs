//! エンジン 1 本分の USI セッション（プロトコル状態機械）。
//!
//! 状態遷移: `Init → Connected → HandshakeOk → Ready → InGame`。
//! `ConnectionFailed` と `HandshakeTimeout` はそのセッションの終端状態。
//!
//! 入力は [`EngineSession::pump`] で 1 行ずつ解析する。壊れた行はログに残して読み飛ばし、
//! セッションを止めるのはプロセス終了とハンドシェイクのタイムアウトだけ。

use std::thread;
use std::time::{Duration, Instant};

use serde::Serialize;

use crate::config::EngineConfig;
use crate::error::{OptionError, ParseError, SessionError};
use crate::protocol::{
    BestMove, EngineMessage, GameOverResult, GoCommand, InfoReport, MateResult, OptionKind,
    OptionTable, parse_engine_line,
};
use crate::transport::{Poll, ProcessTransport, Transport};

pub const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(30);
pub const READY_POLL_INTERVAL: Duration = Duration::from_millis(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SessionState {
    Init,
    Connected,
    HandshakeOk,
    Ready,
    InGame,
    ConnectionFailed,
    HandshakeTimeout,
}

impl SessionState {
    pub fn can_search(self) -> bool {
        matches!(self, SessionState::Ready | SessionState::InGame)
    }

    pub fn is_failed(self) -> bool {
        matches!(self, SessionState::ConnectionFailed | SessionState::HandshakeTimeout)
    }
}

/// `pump` が上位に渡すイベント。識別情報やオプション宣言はセッション内で消費される。
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    Info(InfoReport),
    BestMove(BestMove),
    Checkmate(MateResult),
    Fatal(SessionError),
}

/// エンジンへの接続手段。テストではインメモリの実装に差し替える。
pub trait Connector: Send {
    fn open(&self, config: &EngineConfig, label: &str) -> Result<Box<dyn Transport>, SessionError>;
}

/// サブプロセスとして起動する。
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessConnector;

impl Connector for ProcessConnector {
    fn open(&self, config: &EngineConfig, label: &str) -> Result<Box<dyn Transport>, SessionError> {
        match ProcessTransport::spawn(config, label) {
            Ok(t) => Ok(Box::new(t)),
            Err(e) => Err(SessionError::ConnectionFailed {
                path: config.path.display().to_string(),
                reason: e.to_string(),
            }),
        }
    }
}

pub struct EngineSession {
    label: String,
    state: SessionState,
    transport: Option<Box<dyn Transport>>,
    options: OptionTable,
    name: Option<String>,
    author: Option<String>,
    fatal: Option<SessionError>,
    /// `fatal` を `SessionEvent::Fatal` として上位に渡したか。
    fatal_reported: bool,
    connected_at: Option<Instant>,
    handshake_timeout: Duration,
    /// `usiok` 受信後に送るオプション値。
    startup_options: Vec<(String, String)>,
}

impl EngineSession {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            state: SessionState::Init,
            transport: None,
            options: OptionTable::new(),
            name: None,
            author: None,
            fatal: None,
            fatal_reported: false,
            connected_at: None,
            handshake_timeout: HANDSHAKE_TIMEOUT,
            startup_options: Vec::new(),
        }
    }

    pub fn with_handshake_timeout(mut self, timeout: Duration) -> Self {
        self.handshake_timeout = timeout;
        self
    }

    /// 起動して `usi` を送る。既存の接続があれば先に切断する。
    ///
    /// 起動に失敗した場合は `ConnectionFailed` に遷移し、原因を返す。
    pub fn connect(
        &mut self,
        config: &EngineConfig,
        connector: &dyn Connector,
    ) -> Result<(), SessionError> {
        self.disconnect();
        self.startup_options = config.option_values();
        match connector.open(config, &self.label) {
            Ok(transport) => self.attach(transport),
            Err(e) => {
                log::error!("{}: {e}", self.label);
                self.state = SessionState::ConnectionFailed;
                self.fatal = Some(e.clone());
                self.fatal_reported = true;
                Err(e)
            }
        }
    }

    /// 構築済みの transport で接続する。
    pub fn connect_with(
        &mut self,
        transport: Box<dyn Transport>,
        startup_options: Vec<(String, String)>,
    ) -> Result<(), SessionError> {
        self.disconnect();
        self.startup_options = startup_options;
        self.attach(transport)
    }

    fn attach(&mut self, transport: Box<dyn Transport>) -> Result<(), SessionError> {
        self.options.clear();
        self.name = None;
        self.author = None;
        self.fatal = None;
        self.fatal_reported = false;
        self.transport = Some(transport);
        self.state = SessionState::Connected;
        self.connected_at = Some(Instant::now());
        self.send("usi");
        match &self.fatal {
            Some(e) => Err(e.clone()),
            None => Ok(()),
        }
    }

    /// 丁寧に `quit` を送ってから transport を閉じる。
    pub fn disconnect(&mut self) {
        if let Some(mut transport) = self.transport.take() {
            if self.state != SessionState::Init {
                log::debug!("{}> quit", self.label);
                let _ = transport.send_line("quit");
            }
            transport.close();
        }
        if !self.state.is_failed() {
            self.state = SessionState::Init;
        }
        self.connected_at = None;
    }

    /// バッファ済みの行をすべて解析し、上位向けのイベントを返す。
    ///
    /// 致命的エラーは、どこで起きたもの（書き込み失敗を含む）でも最初の 1 回だけ
    /// `SessionEvent::Fatal` として末尾に載せる。
    pub fn pump(&mut self) -> Vec<SessionEvent> {
        let mut events = Vec::new();
        loop {
            let polled = match self.transport.as_mut() {
                Some(t) => t.poll_line(),
                None => break,
            };
            match polled {
                Poll::Line(line) => {
                    log::debug!("{}< {}", self.label, line.trim_end());
                    self.dispatch(&line, &mut events);
                }
                Poll::Empty => break,
                Poll::Closed => {
                    self.set_fatal(SessionError::ProcessTerminated);
                    break;
                }
            }
        }

        if self.state == SessionState::Connected && self.fatal.is_none() {
            let expired = self
                .connected_at
                .is_some_and(|at| at.elapsed() >= self.handshake_timeout);
            if expired {
                self.state = SessionState::HandshakeTimeout;
                self.set_fatal(SessionError::HandshakeTimeout(self.handshake_timeout));
            }
        }

        if let Some(e) = self.take_unreported_fatal() {
            events.push(SessionEvent::Fatal(e));
        }
        events
    }

    /// まだ上位に渡していない致命的エラーを取り出す。以後は報告済みとして扱う。
    pub fn take_unreported_fatal(&mut self) -> Option<SessionError> {
        if self.fatal_reported {
            return None;
        }
        let e = self.fatal.clone()?;
        self.fatal_reported = true;
        Some(e)
    }

    fn dispatch(&mut self, line: &str, events: &mut Vec<SessionEvent>) {
        let msg = match parse_engine_line(line) {
            Ok(msg) => msg,
            Err(ParseError::Empty) => return,
            Err(e) => {
                log::warn!("{}: skipping line: {e}", self.label);
                return;
            }
        };
        match msg {
            EngineMessage::IdName(name) => self.name = Some(name),
            EngineMessage::IdAuthor(author) => self.author = Some(author),
            EngineMessage::Option(opt) => {
                if self.state != SessionState::Connected {
                    log::warn!("{}: option '{}' declared after usiok", self.label, opt.name);
                }
                self.options.upsert(opt);
            }
            EngineMessage::UsiOk => {
                if self.state == SessionState::Connected {
                    self.state = SessionState::HandshakeOk;
                    self.apply_startup_options();
                    self.send("isready");
                } else {
                    log::warn!("{}: unexpected usiok in state {:?}", self.label, self.state);
                }
            }
            EngineMessage::ReadyOk => {
                if self.state == SessionState::HandshakeOk {
                    self.state = SessionState::Ready;
                } else {
                    log::warn!("{}: unexpected readyok in state {:?}", self.label, self.state);
                }
            }
            EngineMessage::Info(report) => events.push(SessionEvent::Info(report)),
            EngineMessage::BestMove(bm) => events.push(SessionEvent::BestMove(bm)),
            EngineMessage::Checkmate(result) => events.push(SessionEvent::Checkmate(result)),
        }
    }

    fn apply_startup_options(&mut self) {
        let pending = std::mem::take(&mut self.startup_options);
        for (name, value) in &pending {
            if self.options.is_empty() {
                // 宣言がないエンジンにはそのまま送る
                self.send(&crate::protocol::option::setoption_line(name, Some(value)));
                continue;
            }
            if let Err(e) = self.set_option(name, value) {
                log::warn!("{}: {e}", self.label);
            }
        }
        self.startup_options = pending;
    }

    /// 送信は best-effort。書き込みに失敗したら致命的エラーとして記録する。
    pub fn send(&mut self, line: &str) {
        let result = match self.transport.as_mut() {
            Some(t) => {
                log::debug!("{}> {line}", self.label);
                t.send_line(line)
            }
            None => {
                log::debug!("{}: not connected, dropping '{line}'", self.label);
                return;
            }
        };
        if let Err(e) = result {
            self.set_fatal(SessionError::Io(e.to_string()));
        }
    }

    fn set_fatal(&mut self, err: SessionError) {
        if self.fatal.is_none() {
            log::error!("{}: {err}", self.label);
            self.fatal = Some(err);
        }
    }

    /// `Ready`（または `InGame`）になるまで pump し続ける。
    pub fn wait_until_ready(&mut self, timeout: Duration) -> Result<(), SessionError> {
        let start = Instant::now();
        loop {
            if let Some(e) = &self.fatal {
                return Err(e.clone());
            }
            for ev in self.pump() {
                match ev {
                    SessionEvent::Fatal(e) => return Err(e),
                    other => log::debug!("{}: ignoring {other:?} during handshake", self.label),
                }
            }
            if self.state.can_search() {
                return Ok(());
            }
            if self.transport.is_none() {
                return Err(SessionError::NotConnected);
            }
            if start.elapsed() >= timeout {
                return Err(SessionError::ReadyTimeout(timeout));
            }
            thread::sleep(READY_POLL_INTERVAL);
        }
    }

    /// オプション表に照らして値を検証し、`setoption` を送る。
    pub fn set_option(&mut self, name: &str, value: &str) -> Result<(), OptionError> {
        let opt = self
            .options
            .get(name)
            .ok_or_else(|| OptionError::Unknown(name.to_string()))?;
        let normalized = opt.validate(value)?;
        let line = opt.setoption_command(Some(&normalized));
        let is_button = opt.kind == OptionKind::Button;
        self.send(&line);
        if let Some(opt) = self.options.get_mut(name) {
            opt.current = if is_button { None } else { Some(normalized) };
        }
        Ok(())
    }

    pub fn new_game(&mut self) -> Result<(), SessionError> {
        match self.state {
            SessionState::Ready => {
                self.send("usinewgame");
                self.state = SessionState::InGame;
                Ok(())
            }
            SessionState::InGame => Ok(()),
            other => Err(SessionError::NotReady(other)),
        }
    }

    pub fn game_over(&mut self, result: GameOverResult) {
        if self.state == SessionState::InGame {
            self.send(&result.to_string());
            self.state = SessionState::Ready;
        }
    }

    /// `position` と `go` を送る。探索の多重化は呼び出し側（ThinkCoordinator）が防ぐ。
    pub fn start_search(&mut self, position: &str, go: &GoCommand) -> Result<(), SessionError> {
        if let Some(e) = &self.fatal {
            return Err(e.clone());
        }
        if !self.state.can_search() {
            return Err(SessionError::NotReady(self.state));
        }
        self.send(position);
        self.send(&go.to_string());
        match &self.fatal {
            Some(e) => Err(e.clone()),
            None => Ok(()),
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn author(&self) -> Option<&str> {
        self.author.as_deref()
    }

    pub fn options(&self) -> &OptionTable {
        &self.options
    }

    pub fn fatal_error(&self) -> Option<&SessionError> {
        self.fatal.as_ref()
    }

    pub fn is_connected(&self) -> bool {
        self.transport.is_some()
    }
}

impl Drop for EngineSession {
    fn drop(&mut self) {
        self.disconnect();
    }
}
