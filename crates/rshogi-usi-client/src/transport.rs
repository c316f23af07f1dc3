//! エンジンとの行単位の入出力。
//!
//! 標準出力は専用スレッドで読み取り、チャネル経由で受け取る。呼び出し側は
//! [`Transport::poll_line`] でブロックせずに 1 行ずつ取り出す。

use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::process::{Child, ChildStdin, Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, TryRecvError};

use crate::config::EngineConfig;

pub const ENGINE_QUIT_TIMEOUT: Duration = Duration::from_millis(300);
pub const ENGINE_QUIT_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// `poll_line` の結果。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Poll {
    Line(String),
    /// 今は読める行がない。
    Empty,
    /// 相手側が閉じた（プロセス終了）。バッファ済みの行はすべて返した後に報告される。
    Closed,
}

pub trait Transport: Send {
    fn send_line(&mut self, line: &str) -> io::Result<()>;
    fn poll_line(&mut self) -> Poll;
    /// 入力を閉じ、相手の終了を待つ。二度呼んでもよい。
    fn close(&mut self);
}

/// 1 本のエンジンプロセスに対する入出力をカプセル化する。
pub struct ProcessTransport {
    child: Child,
    stdin: Option<BufWriter<ChildStdin>>,
    rx: Receiver<String>,
    label: String,
    closed: bool,
}

impl ProcessTransport {
    pub fn spawn(cfg: &EngineConfig, label: &str) -> io::Result<Self> {
        let mut cmd = Command::new(&cfg.path);
        if !cfg.args.is_empty() {
            cmd.args(&cfg.args);
        }
        if let Some(dir) = cfg.effective_working_dir() {
            cmd.current_dir(dir);
        }
        let mut child = cmd.stdin(Stdio::piped()).stdout(Stdio::piped()).spawn()?;
        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| io::Error::new(io::ErrorKind::BrokenPipe, "no stdin"))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| io::Error::new(io::ErrorKind::BrokenPipe, "no stdout"))?;

        let (tx, rx) = crossbeam_channel::unbounded::<String>();
        let reader_label = label.to_string();
        let spawned = thread::Builder::new().name(format!("usi-reader-{label}")).spawn(move || {
            let reader = BufReader::new(stdout);
            for line in reader.lines() {
                match line {
                    Ok(l) => {
                        if tx.send(l).is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        log::debug!("{reader_label}: stdout read error: {e}");
                        break;
                    }
                }
            }
            log::debug!("{reader_label}: stdout reader exiting");
        });
        if let Err(e) = spawned {
            let _ = child.kill();
            let _ = child.wait();
            return Err(e);
        }

        Ok(Self {
            child,
            stdin: Some(BufWriter::new(stdin)),
            rx,
            label: label.to_string(),
            closed: false,
        })
    }
}

impl Transport for ProcessTransport {
    fn send_line(&mut self, line: &str) -> io::Result<()> {
        let stdin = self
            .stdin
            .as_mut()
            .ok_or_else(|| io::Error::new(io::ErrorKind::BrokenPipe, "stdin already closed"))?;
        stdin.write_all(line.as_bytes())?;
        stdin.write_all(b"\n")?;
        stdin.flush()
    }

    fn poll_line(&mut self) -> Poll {
        match self.rx.try_recv() {
            Ok(line) => Poll::Line(line),
            Err(TryRecvError::Empty) => Poll::Empty,
            Err(TryRecvError::Disconnected) => Poll::Closed,
        }
    }

    fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        // stdin を閉じると EOF を見て終了するエンジンもある
        self.stdin = None;
        let deadline = Instant::now() + ENGINE_QUIT_TIMEOUT;
        while Instant::now() < deadline {
            if let Ok(Some(_)) = self.child.try_wait() {
                return;
            }
            thread::sleep(ENGINE_QUIT_POLL_INTERVAL);
        }
        log::warn!("{}: engine did not exit after quit, killing", self.label);
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

impl Drop for ProcessTransport {
    fn drop(&mut self) {
        self.close();
    }
}
