//! テスト用のインメモリ transport。
//!
//! [`ScriptedTransport`] はエンジン側の振る舞いを [`FakeEngine`] の応答規則か、
//! [`ScriptHandle::push_line`] による手動注入で再現する。

use std::collections::{HashMap, VecDeque};
use std::io;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::config::EngineConfig;
use crate::error::SessionError;
use crate::session::Connector;
use crate::transport::{Poll, Transport};

/// 送られた 1 行に対してエンジンが返す行を決める。
pub type Responder = Box<dyn FnMut(&str) -> Vec<String> + Send>;

#[derive(Default)]
struct Shared {
    inbound: VecDeque<String>,
    sent: Vec<String>,
    closed: bool,
    eof: bool,
    fail_writes: bool,
    responder: Option<Responder>,
}

pub struct ScriptedTransport {
    shared: Arc<Mutex<Shared>>,
}

/// テスト側から transport を操作・観察するためのハンドル。
#[derive(Clone)]
pub struct ScriptHandle {
    shared: Arc<Mutex<Shared>>,
}

impl ScriptedTransport {
    pub fn new() -> (Self, ScriptHandle) {
        let shared = Arc::new(Mutex::new(Shared::default()));
        (
            Self {
                shared: Arc::clone(&shared),
            },
            ScriptHandle { shared },
        )
    }
}

impl Transport for ScriptedTransport {
    fn send_line(&mut self, line: &str) -> io::Result<()> {
        let mut shared = self.shared.lock();
        if shared.fail_writes || shared.closed || shared.eof {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "scripted engine is gone"));
        }
        shared.sent.push(line.to_string());
        if let Some(responder) = shared.responder.as_mut() {
            let replies = responder(line);
            shared.inbound.extend(replies);
        }
        Ok(())
    }

    fn poll_line(&mut self) -> Poll {
        let mut shared = self.shared.lock();
        match shared.inbound.pop_front() {
            Some(line) => Poll::Line(line),
            None if shared.eof => Poll::Closed,
            None => Poll::Empty,
        }
    }

    fn close(&mut self) {
        self.shared.lock().closed = true;
    }
}

impl ScriptHandle {
    pub fn push_line(&self, line: &str) {
        self.shared.lock().inbound.push_back(line.to_string());
    }

    pub fn push_lines(&self, lines: &[&str]) {
        let mut shared = self.shared.lock();
        shared.inbound.extend(lines.iter().map(|l| l.to_string()));
    }

    /// プロセス終了を模す。バッファ済みの行を読み切ると `Closed` になる。
    pub fn exit(&self) {
        self.shared.lock().eof = true;
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.shared.lock().fail_writes = fail;
    }

    pub fn set_responder(&self, responder: Responder) {
        self.shared.lock().responder = Some(responder);
    }

    pub fn sent(&self) -> Vec<String> {
        self.shared.lock().sent.clone()
    }

    pub fn count_prefix(&self, prefix: &str) -> usize {
        self.shared
            .lock()
            .sent
            .iter()
            .filter(|l| l.starts_with(prefix))
            .count()
    }

    pub fn clear_sent(&self) {
        self.shared.lock().sent.clear();
    }

    pub fn is_closed(&self) -> bool {
        self.shared.lock().closed
    }
}

/// ハンドシェイクに素直に応じる擬似エンジン。
#[derive(Debug, Clone, Default)]
pub struct FakeEngine {
    name: Option<String>,
    options: Vec<String>,
    go_replies: VecDeque<Vec<String>>,
    stop_reply: Option<String>,
}

impl FakeEngine {
    pub fn new(name: &str) -> Self {
        Self {
            name: Some(name.to_string()),
            ..Self::default()
        }
    }

    /// 何にも応答しない。
    pub fn silent() -> Self {
        Self::default()
    }

    pub fn option(mut self, line: &str) -> Self {
        self.options.push(line.to_string());
        self
    }

    /// `go` を受けるたびに先頭から 1 組ずつ返す。
    pub fn reply_to_go(mut self, lines: &[&str]) -> Self {
        self.go_replies
            .push_back(lines.iter().map(|l| l.to_string()).collect());
        self
    }

    /// `stop` を受けたら返す行。
    pub fn reply_to_stop(mut self, line: &str) -> Self {
        self.stop_reply = Some(line.to_string());
        self
    }

    pub fn into_responder(self) -> Responder {
        let FakeEngine {
            name,
            options,
            mut go_replies,
            stop_reply,
        } = self;
        Box::new(move |line: &str| {
            let Some(name) = name.as_ref() else {
                return Vec::new();
            };
            let head = line.split_whitespace().next().unwrap_or("");
            match head {
                "usi" => {
                    let mut out = vec![format!("id name {name}"), "id author test".to_string()];
                    out.extend(options.iter().cloned());
                    out.push("usiok".to_string());
                    out
                }
                "isready" => vec!["readyok".to_string()],
                "go" => go_replies.pop_front().unwrap_or_default(),
                "stop" => stop_reply.iter().cloned().collect(),
                _ => Vec::new(),
            }
        })
    }
}

type EngineFactory = Box<dyn Fn() -> FakeEngine + Send>;

#[derive(Default)]
struct ConnectorState {
    engines: HashMap<String, EngineFactory>,
    opened: Vec<(String, ScriptHandle)>,
}

/// `EngineConfig::name` ごとに擬似エンジンを払い出す connector。
/// 未登録の名前は起動失敗として扱う。
#[derive(Clone, Default)]
pub struct ScriptedConnector {
    inner: Arc<Mutex<ConnectorState>>,
}

impl ScriptedConnector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, name: &str, factory: impl Fn() -> FakeEngine + Send + 'static) {
        self.inner
            .lock()
            .engines
            .insert(name.to_string(), Box::new(factory));
    }

    pub fn handles(&self, name: &str) -> Vec<ScriptHandle> {
        self.inner
            .lock()
            .opened
            .iter()
            .filter(|(n, _)| n == name)
            .map(|(_, h)| h.clone())
            .collect()
    }

    pub fn last_handle(&self, name: &str) -> Option<ScriptHandle> {
        self.handles(name).pop()
    }

    pub fn open_count(&self) -> usize {
        self.inner.lock().opened.len()
    }
}

impl Connector for ScriptedConnector {
    fn open(&self, config: &EngineConfig, _label: &str) -> Result<Box<dyn Transport>, SessionError> {
        let mut inner = self.inner.lock();
        let Some(factory) = inner.engines.get(&config.name) else {
            return Err(SessionError::ConnectionFailed {
                path: config.path.display().to_string(),
                reason: "no such engine".to_string(),
            });
        };
        let engine = factory();
        let (transport, handle) = ScriptedTransport::new();
        handle.set_responder(engine.into_responder());
        inner.opened.push((config.name.clone(), handle));
        Ok(Box::new(transport))
    }
}
