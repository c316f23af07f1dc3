//! オーケストレータから UI への通知。
//!
//! 種類ごとに別チャネルにする。UI 通知は取りこぼさないよう無制限、
//! テレメトリは量が多いので有限容量で、溢れたら捨てる。

use std::sync::Arc;

use crossbeam_channel::{Receiver, Sender, TrySendError};
use parking_lot::Mutex;
use rshogi_usi_client::{BestMove, InfoReport, MateResult};
use serde::Serialize;

use crate::mode::GameMode;
use crate::types::{Color, GameResult};

#[derive(Debug, Clone, PartialEq)]
pub enum UiEvent {
    ModeChanged(GameMode),
    TurnChanged {
        color: Color,
        ply: usize,
        human_turn: bool,
    },
    ClockDisplay {
        black: String,
        white: String,
    },
    GameOver(GameResult),
    MateResult {
        engine: String,
        result: MateResult,
    },
    BestMove {
        engine: String,
        instance: u32,
        best: BestMove,
    },
    /// モード遷移の拒否やエンジン異常など。
    Error(String),
}

/// 検討表示向けの読み筋。
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TelemetryEvent {
    pub engine: String,
    pub instance: u32,
    pub root_sfen: String,
    pub report: InfoReport,
}

/// UI から読む状態のスナップショット。
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GameSnapshot {
    pub mode: GameMode,
    pub side_to_move: Color,
    pub ply: usize,
    pub sfen: String,
    pub clocks: [String; Color::NUM],
    pub human_turn: bool,
    pub thinking: [bool; Color::NUM],
    pub analyzing: bool,
    pub last_result: Option<GameResult>,
}

pub type SnapshotCell = Arc<Mutex<GameSnapshot>>;

#[derive(Debug, Clone)]
pub struct Notifier {
    ui: Sender<UiEvent>,
    telemetry: Sender<TelemetryEvent>,
}

/// UI 側の受信口。
#[derive(Debug, Clone)]
pub struct EventStreams {
    pub ui: Receiver<UiEvent>,
    pub telemetry: Receiver<TelemetryEvent>,
}

pub fn channels(telemetry_capacity: usize) -> (Notifier, EventStreams) {
    let (ui_tx, ui_rx) = crossbeam_channel::unbounded();
    let (tele_tx, tele_rx) = crossbeam_channel::bounded(telemetry_capacity.max(1));
    (
        Notifier {
            ui: ui_tx,
            telemetry: tele_tx,
        },
        EventStreams {
            ui: ui_rx,
            telemetry: tele_rx,
        },
    )
}

impl Notifier {
    pub fn ui(&self, event: UiEvent) {
        if self.ui.send(event).is_err() {
            log::debug!("ui receiver dropped");
        }
    }

    pub fn error(&self, message: impl Into<String>) {
        let message = message.into();
        log::warn!("{message}");
        self.ui(UiEvent::Error(message));
    }

    pub fn telemetry(&self, event: TelemetryEvent) {
        match self.telemetry.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                log::debug!("telemetry channel full, dropping report");
            }
            Err(TrySendError::Disconnected(_)) => {}
        }
    }
}
