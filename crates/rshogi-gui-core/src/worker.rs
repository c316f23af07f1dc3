//! オーケストレータを専用スレッドで回す。
//!
//! UI スレッドは [`OrchestratorHandle`] 経由でコマンドを積み、スナップショットと
//! 通知ストリームを読むだけ。状態を書き換えるのはワーカースレッドだけ。

use std::io;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Instant;

use rshogi_usi_client::Connector;

use crate::collab::{GamePosition, GameRecord};
use crate::command::{Command, CommandQueue};
use crate::config::AppConfig;
use crate::events::{EventStreams, GameSnapshot, SnapshotCell, channels};
use crate::orchestrator::Orchestrator;

pub struct OrchestratorHandle {
    queue: CommandQueue,
    snapshot: SnapshotCell,
    thread: Option<JoinHandle<()>>,
}

/// 通知チャネルを作り、ワーカーを起動する。
pub fn start(
    config: Arc<AppConfig>,
    position: Box<dyn GamePosition>,
    record: Box<dyn GameRecord>,
    connector: Box<dyn Connector>,
) -> io::Result<(OrchestratorHandle, EventStreams)> {
    let (notifier, streams) = channels(config.telemetry_capacity);
    let orchestrator = Orchestrator::new(config, position, record, connector, notifier);
    Ok((spawn(orchestrator)?, streams))
}

pub fn spawn(mut orchestrator: Orchestrator) -> io::Result<OrchestratorHandle> {
    let queue = orchestrator.queue();
    let snapshot = orchestrator.snapshot_cell();
    let tick = orchestrator.tick_interval();
    let thread = thread::Builder::new()
        .name("gui-orchestrator".to_string())
        .spawn(move || {
            log::debug!("orchestrator worker started (tick {tick:?})");
            while orchestrator.tick(Instant::now()) {
                thread::sleep(tick);
            }
            log::debug!("orchestrator worker stopped");
        })?;
    Ok(OrchestratorHandle {
        queue,
        snapshot,
        thread: Some(thread),
    })
}

impl OrchestratorHandle {
    pub fn send(&self, command: Command) {
        self.queue.push(command);
    }

    pub fn queue(&self) -> CommandQueue {
        self.queue.clone()
    }

    pub fn snapshot(&self) -> GameSnapshot {
        self.snapshot.lock().clone()
    }

    /// `Shutdown` を積み、ワーカーの終了を待つ。
    pub fn shutdown(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        if let Some(thread) = self.thread.take() {
            self.queue.push(Command::Shutdown);
            if thread.join().is_err() {
                log::error!("orchestrator worker panicked");
            }
        }
    }
}

impl Drop for OrchestratorHandle {
    fn drop(&mut self) {
        self.stop();
    }
}
