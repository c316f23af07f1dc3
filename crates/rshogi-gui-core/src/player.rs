//! 手番ごとのプレイヤー（人間 / エンジン）。

use std::time::Duration;

use rshogi_usi_client::{
    BestMove, BestMoveToken, Connector, EngineConfig, EngineSession, SessionError,
    ThinkCoordinator, ThinkRequest,
};

use crate::error::TransitionError;

/// 手番側が出した指し手の候補。オーケストレータが検証してから適用する。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Candidate {
    Move(String),
    Resign,
    Interrupt,
    TimeUp,
    DeclareWin,
}

impl From<&BestMove> for Candidate {
    fn from(best: &BestMove) -> Self {
        match &best.mv {
            BestMoveToken::Move(mv) => Candidate::Move(mv.clone()),
            BestMoveToken::Resign => Candidate::Resign,
            BestMoveToken::Win => Candidate::DeclareWin,
        }
    }
}

/// 起動済みのエンジン 1 本。
pub struct EnginePlayer {
    pub name: String,
    /// 同じエンジンを複数起動したときの識別番号（1 始まり）
    pub instance: u32,
    pub think: ThinkCoordinator,
    /// 現在の探索の開始局面。テレメトリに添える。
    pub root_sfen: String,
    /// 結果を待っている探索の context
    pub awaiting: Option<u64>,
}

impl EnginePlayer {
    /// 起動してハンドシェイクを終えるまで待つ。
    pub fn launch(
        config: &EngineConfig,
        instance: u32,
        connector: &dyn Connector,
        handshake_timeout: Duration,
    ) -> Result<Self, TransitionError> {
        let label = format!("{}#{instance}", config.name);
        let start_error = |source: SessionError| TransitionError::EngineStart {
            engine: config.name.clone(),
            source,
        };
        let mut session = EngineSession::new(label).with_handshake_timeout(handshake_timeout);
        session.connect(config, connector).map_err(start_error)?;
        session
            .wait_until_ready(handshake_timeout)
            .map_err(start_error)?;
        session.new_game().map_err(start_error)?;
        log::info!(
            "engine '{}' ready: {} ({} options)",
            config.name,
            session.name().unwrap_or("(unnamed)"),
            session.options().len()
        );
        Ok(Self {
            name: config.name.clone(),
            instance,
            think: ThinkCoordinator::new(session),
            root_sfen: String::new(),
            awaiting: None,
        })
    }

    pub fn request(&mut self, request: ThinkRequest, root_sfen: String) -> Result<(), SessionError> {
        let context = request.context;
        self.think.request_think(request)?;
        self.root_sfen = root_sfen;
        self.awaiting = Some(context);
        Ok(())
    }

    pub fn abandon(&mut self) {
        self.awaiting = None;
        self.think.abandon();
    }

    pub fn shutdown(&mut self) {
        self.abandon();
        self.think.session_mut().disconnect();
    }
}

pub enum PlayerKind {
    Human,
    Engine(Box<EnginePlayer>),
}

pub struct PlayerSlot {
    pub kind: PlayerKind,
    /// 次の tick で検証される候補
    pub staged: Option<Candidate>,
}

impl PlayerSlot {
    pub fn human() -> Self {
        Self {
            kind: PlayerKind::Human,
            staged: None,
        }
    }

    pub fn engine(player: EnginePlayer) -> Self {
        Self {
            kind: PlayerKind::Engine(Box::new(player)),
            staged: None,
        }
    }

    pub fn is_human(&self) -> bool {
        matches!(self.kind, PlayerKind::Human)
    }

    pub fn engine_mut(&mut self) -> Option<&mut EnginePlayer> {
        match &mut self.kind {
            PlayerKind::Engine(player) => Some(player),
            PlayerKind::Human => None,
        }
    }

    pub fn engine_ref(&self) -> Option<&EnginePlayer> {
        match &self.kind {
            PlayerKind::Engine(player) => Some(player),
            PlayerKind::Human => None,
        }
    }

    pub fn is_thinking(&self) -> bool {
        self.engine_ref().is_some_and(|p| p.think.is_thinking())
    }
}
