//! 対局・検討の状態を書き換える唯一の主体。
//!
//! [`Orchestrator::tick`] は 1 回ごとに次の順で処理する:
//! 1. 起動中の全エンジンを pump する
//! 2. コマンドキューを差し替えて実行する
//! 3. 手番側の指し手候補を検証して適用する
//! 4. 時間切れを判定し、手番側の時間切れとして処理する
//!
//! 候補として受け付けるのは合法手、投了、中断、時計が認めた時間切れ、
//! 入玉ルールを満たす宣言勝ちだけ。それ以外は反則として棋譜に記録し、対局を終える。

use std::mem;
use std::sync::Arc;
use std::time::{Duration, Instant};

use rshogi_usi_client::{
    Connector, GameOverResult, SFEN_HIRATE, SearchResult, ThinkEvent, ThinkRequest,
    position_command,
};

use crate::clock::{ClockManager, LimitKind};
use crate::collab::{GamePosition, GameRecord, SpecialTerminal, replay};
use crate::command::{Command, CommandQueue, GameSetup, PlayerSpec};
use crate::config::AppConfig;
use crate::error::{CollabError, TransitionError};
use crate::events::{GameSnapshot, Notifier, SnapshotCell, TelemetryEvent, UiEvent};
use crate::mode::GameMode;
use crate::player::{Candidate, EnginePlayer, PlayerSlot};
use crate::types::{Color, EndReason, GameResult};

pub struct Orchestrator {
    config: Arc<AppConfig>,
    connector: Box<dyn Connector>,
    position: Box<dyn GamePosition>,
    record: Box<dyn GameRecord>,
    clock: ClockManager,
    mode: GameMode,
    players: [PlayerSlot; Color::NUM],
    /// 検討・詰み探索用のエンジン
    analysts: Vec<EnginePlayer>,
    engine_limit: LimitKind,
    queue: CommandQueue,
    notifier: Notifier,
    snapshot: SnapshotCell,
    next_context: u64,
    multipv: u32,
    last_result: Option<GameResult>,
    last_clocks: [String; Color::NUM],
    running: bool,
}

impl Orchestrator {
    pub fn new(
        config: Arc<AppConfig>,
        position: Box<dyn GamePosition>,
        record: Box<dyn GameRecord>,
        connector: Box<dyn Connector>,
        notifier: Notifier,
    ) -> Self {
        let multipv = config.consideration.multipv;
        Self {
            config,
            connector,
            position,
            record,
            clock: ClockManager::default(),
            mode: GameMode::Uninitialized,
            players: [PlayerSlot::human(), PlayerSlot::human()],
            analysts: Vec::new(),
            engine_limit: LimitKind::WallClock,
            queue: CommandQueue::new(),
            notifier,
            snapshot: SnapshotCell::default(),
            next_context: 1,
            multipv,
            last_result: None,
            last_clocks: Default::default(),
            running: true,
        }
    }

    pub fn queue(&self) -> CommandQueue {
        self.queue.clone()
    }

    pub fn snapshot_cell(&self) -> SnapshotCell {
        Arc::clone(&self.snapshot)
    }

    pub fn tick_interval(&self) -> Duration {
        self.config.tick()
    }

    pub fn mode(&self) -> GameMode {
        self.mode
    }

    pub fn last_result(&self) -> Option<GameResult> {
        self.last_result
    }

    pub fn position(&self) -> &dyn GamePosition {
        self.position.as_ref()
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// 1 tick 分の処理。`Shutdown` を実行した後は `false` を返す。
    pub fn tick(&mut self, now: Instant) -> bool {
        self.pump_engines(now);
        for command in self.queue.take_all() {
            self.execute(command, now);
        }
        if self.mode == GameMode::InGame {
            self.check_move(now);
        }
        if self.mode == GameMode::InGame {
            self.check_time_up(now);
        }
        self.publish(now);
        self.running
    }

    fn next_context(&mut self) -> u64 {
        let context = self.next_context;
        self.next_context += 1;
        context
    }

    // ------------------------------------------------------------------
    // エンジン入力
    // ------------------------------------------------------------------

    fn pump_engines(&mut self, now: Instant) {
        let mut staged = Vec::new();
        let mut failures = Vec::new();
        for color in Color::ALL {
            let Some(player) = self.players[color.index()].engine_mut() else {
                continue;
            };
            for event in player.think.pump() {
                match event {
                    ThinkEvent::Info { report, .. } => self.notifier.telemetry(TelemetryEvent {
                        engine: player.name.clone(),
                        instance: player.instance,
                        root_sfen: player.root_sfen.clone(),
                        report,
                    }),
                    ThinkEvent::Finished { context } => {
                        if player.awaiting != Some(context) {
                            continue;
                        }
                        player.awaiting = None;
                        match player.think.take_result().map(|o| o.result) {
                            Some(SearchResult::BestMove(best)) => {
                                staged.push((color, Candidate::from(&best)));
                            }
                            Some(SearchResult::Checkmate(r)) => {
                                log::warn!("{}: unexpected checkmate reply in game: {r:?}", player.name);
                            }
                            None => {}
                        }
                    }
                    ThinkEvent::Fatal(e) => failures.push((color, player.name.clone(), e)),
                }
            }
        }
        for (color, candidate) in staged {
            self.players[color.index()].staged = Some(candidate);
        }
        if let Some((color, name, e)) = failures.into_iter().next() {
            self.notifier
                .error(format!("engine '{name}' ({}) failed: {e}", color.label()));
            let ply = self.record.ply();
            self.end_game(
                GameResult {
                    winner: None,
                    reason: EndReason::Interrupt,
                    by: color,
                    ply,
                },
                now,
            );
        }

        let mut failed = None;
        for player in &mut self.analysts {
            for event in player.think.pump() {
                match event {
                    ThinkEvent::Info { report, .. } => self.notifier.telemetry(TelemetryEvent {
                        engine: player.name.clone(),
                        instance: player.instance,
                        root_sfen: player.root_sfen.clone(),
                        report,
                    }),
                    ThinkEvent::Finished { context } => {
                        if player.awaiting != Some(context) {
                            continue;
                        }
                        player.awaiting = None;
                        match player.think.take_result().map(|o| o.result) {
                            Some(SearchResult::BestMove(best)) => self.notifier.ui(UiEvent::BestMove {
                                engine: player.name.clone(),
                                instance: player.instance,
                                best,
                            }),
                            Some(SearchResult::Checkmate(result)) => {
                                self.notifier.ui(UiEvent::MateResult {
                                    engine: player.name.clone(),
                                    result,
                                })
                            }
                            None => {}
                        }
                    }
                    ThinkEvent::Fatal(e) => {
                        failed.get_or_insert(format!("engine '{}' failed: {e}", player.name));
                    }
                }
            }
        }
        if let Some(message) = failed {
            self.notifier.error(message);
            self.queue.push(Command::LeaveMode);
        }
    }

    // ------------------------------------------------------------------
    // コマンド
    // ------------------------------------------------------------------

    fn execute(&mut self, command: Command, now: Instant) {
        log::debug!("command: {command:?}");
        match command {
            Command::StartGame(setup) => {
                if let Err(e) = self.start_game(setup, now) {
                    self.notifier.error(e.to_string());
                }
            }
            Command::SubmitMove { color, mv } => self.submit_move(color, mv),
            Command::Resign { color } => self.stage_human(color, Candidate::Resign),
            Command::DeclareWin { color } => self.stage_human(color, Candidate::DeclareWin),
            Command::Undo => self.undo(now),
            Command::Interrupt => self.interrupt(),
            Command::MoveNow => self.move_now(),
            Command::SelectKifuIndex(index) => self.navigate(|record| record.select(index)),
            Command::LoadKifuText(text) => self.navigate(|record| record.load_text(&text)),
            Command::EnterConsideration { engine } => {
                self.enter_mode(GameMode::ConsiderationOneEngine, vec![engine])
            }
            Command::EnterMultiConsideration { engines } => {
                self.enter_mode(GameMode::ConsiderationMultiEngine, engines)
            }
            Command::EnterConsiderationNoEngine => {
                self.enter_mode(GameMode::ConsiderationNoEngine, Vec::new())
            }
            Command::EnterMateSearch { engine } => {
                self.enter_mode(GameMode::ConsiderationMateEngine, vec![engine])
            }
            Command::EnterBoardEdit => self.enter_mode(GameMode::BoardEdit, Vec::new()),
            Command::SetPosition { sfen } => self.set_position(&sfen),
            Command::LeaveMode => self.leave_mode(now),
            Command::SetMultiPv(n) => self.set_multipv(n),
            Command::Shutdown => {
                self.leave_mode(now);
                self.running = false;
            }
        }
    }

    fn start_game(&mut self, setup: GameSetup, now: Instant) -> Result<(), TransitionError> {
        if self.mode == GameMode::InGame {
            return Err(TransitionError::Busy(self.mode));
        }
        let root = setup
            .root_sfen
            .clone()
            .unwrap_or_else(|| SFEN_HIRATE.to_string());
        self.position
            .validate_sfen(&root)
            .map_err(|e| TransitionError::Vetoed(e.to_string()))?;

        // エンジンを先に起動し、失敗したら何も変えずに戻る
        let mut slots = [PlayerSlot::human(), PlayerSlot::human()];
        for color in Color::ALL {
            if let PlayerSpec::Engine { name } = setup.player(color) {
                let config = self
                    .config
                    .engine(name)
                    .ok_or_else(|| TransitionError::UnknownEngine(name.clone()))?;
                let instance = if color == Color::White && setup.black == setup.white {
                    2
                } else {
                    1
                };
                let player = EnginePlayer::launch(
                    config,
                    instance,
                    self.connector.as_ref(),
                    self.config.handshake_timeout(),
                )?;
                slots[color.index()] = PlayerSlot::engine(player);
            }
        }

        // 局面を設定できなければ起動したエンジンは破棄され、検討モードはそのまま残る
        self.position
            .set_sfen(&root)
            .map_err(|e| TransitionError::Vetoed(e.to_string()))?;
        self.teardown_analysts();
        self.record.reset(&root);
        self.players = slots;
        self.clock = ClockManager::new(setup.black_time, setup.white_time);
        self.engine_limit = setup.engine_limit;
        self.last_result = None;
        self.set_mode(GameMode::InGame);
        log::info!("game started: {:?} vs {:?}", setup.black, setup.white);
        self.begin_turn(now);
        Ok(())
    }

    fn submit_move(&mut self, color: Color, mv: String) {
        if self.mode == GameMode::InGame {
            self.stage_human(color, Candidate::Move(mv));
            return;
        }
        if !self.mode.allows_free_moves() {
            log::debug!("ignoring move {mv} in {:?}", self.mode);
            return;
        }
        if self.position.side_to_move() != color || !self.position.is_legal(&mv) {
            log::debug!("ignoring move {mv} from {}", color.label());
            return;
        }
        if let Err(e) = self.position.apply(&mv) {
            self.notifier.error(e.to_string());
            return;
        }
        let sfen = self.position.sfen();
        self.record.append_move(&mv, &sfen, Duration::ZERO);
        self.analyze();
    }

    /// 人間の手番にだけ候補を置く。手番でなければ何もしない。
    fn stage_human(&mut self, color: Color, candidate: Candidate) {
        if self.mode != GameMode::InGame {
            log::debug!("ignoring {candidate:?}: no game in progress");
            return;
        }
        if self.position.side_to_move() != color {
            log::debug!("ignoring {candidate:?} from {}: not their turn", color.label());
            return;
        }
        let slot = &mut self.players[color.index()];
        if !slot.is_human() {
            log::debug!("ignoring {candidate:?}: {} is an engine", color.label());
            return;
        }
        slot.staged = Some(candidate);
    }

    fn interrupt(&mut self) {
        match self.mode {
            GameMode::InGame => {
                let color = self.position.side_to_move();
                let slot = &mut self.players[color.index()];
                if let Some(player) = slot.engine_mut() {
                    player.abandon();
                }
                slot.staged = Some(Candidate::Interrupt);
            }
            mode if mode.is_consideration() => {
                for player in &mut self.analysts {
                    player.abandon();
                }
            }
            _ => {}
        }
    }

    fn move_now(&mut self) {
        match self.mode {
            GameMode::InGame => {
                let color = self.position.side_to_move();
                if let Some(player) = self.players[color.index()].engine_mut() {
                    player.think.cancel();
                }
            }
            mode if mode.is_consideration() => {
                for player in &mut self.analysts {
                    player.think.cancel();
                }
            }
            _ => {}
        }
    }

    fn undo(&mut self, now: Instant) {
        if self.mode == GameMode::InGame {
            if !self.players.iter().any(PlayerSlot::is_human) {
                log::debug!("undo is not available between engines");
                return;
            }
            if self.record.ply() == 0 {
                return;
            }
            let mover = self.position.side_to_move();
            for slot in &mut self.players {
                slot.staged = None;
                if let Some(player) = slot.engine_mut() {
                    player.abandon();
                }
            }
            self.clock.cancel_turn(mover);
            // 人間の手番まで戻す
            while self.undo_ply() {
                let side = self.position.side_to_move();
                if self.players[side.index()].is_human() || self.record.ply() == 0 {
                    break;
                }
            }
            self.begin_turn(now);
        } else if self.mode.allows_free_moves() && self.undo_ply() {
            self.analyze();
        }
    }

    fn undo_ply(&mut self) -> bool {
        if !self.record.undo() {
            return false;
        }
        if let Err(e) = self.position.undo() {
            log::warn!("position undo failed ({e}), replaying record");
            if let Err(e) = replay(self.position.as_mut(), self.record.as_ref()) {
                self.notifier.error(format!("failed to rebuild position: {e}"));
            }
        }
        true
    }

    /// 棋譜の操作後に局面を作り直し、検討中なら解析し直す。
    fn navigate(&mut self, op: impl FnOnce(&mut dyn GameRecord) -> Result<(), CollabError>) {
        if !self.mode.allows_free_moves() {
            log::debug!("kifu navigation ignored in {:?}", self.mode);
            return;
        }
        if let Err(e) = op(self.record.as_mut()) {
            self.notifier.error(e.to_string());
            return;
        }
        if let Err(e) = replay(self.position.as_mut(), self.record.as_ref()) {
            self.notifier.error(format!("failed to rebuild position: {e}"));
            return;
        }
        self.analyze();
    }

    fn set_position(&mut self, sfen: &str) {
        if self.mode != GameMode::BoardEdit {
            log::debug!("set position ignored in {:?}", self.mode);
            return;
        }
        match self.position.set_sfen(sfen) {
            Ok(()) => self.record.reset(sfen),
            Err(e) => self.notifier.error(e.to_string()),
        }
    }

    fn set_multipv(&mut self, n: u32) {
        self.multipv = n;
        if self.mode == GameMode::ConsiderationMateEngine {
            return;
        }
        for player in &mut self.analysts {
            player.think.set_multipv(n);
        }
        // 次の探索開始で反映されるので、今の局面で探索し直す
        self.analyze();
    }

    // ------------------------------------------------------------------
    // モード遷移
    // ------------------------------------------------------------------

    fn enter_mode(&mut self, target: GameMode, engines: Vec<String>) {
        if let Err(e) = self.transition(target, &engines) {
            self.notifier.error(e.to_string());
        }
    }

    /// 新しいモードのエンジンを起動してから古いモードを片付ける。
    /// 拒否・失敗のときはモードも局面も変わらない。
    fn transition(&mut self, target: GameMode, engines: &[String]) -> Result<(), TransitionError> {
        if self.mode == GameMode::InGame {
            return Err(TransitionError::Busy(self.mode));
        }
        match target {
            GameMode::ConsiderationMateEngine if !self.position.is_mate_searchable() => {
                return Err(TransitionError::Vetoed(
                    "current position cannot be searched for mate".to_string(),
                ));
            }
            GameMode::ConsiderationOneEngine | GameMode::ConsiderationMateEngine
                if engines.len() != 1 =>
            {
                return Err(TransitionError::Vetoed(format!(
                    "{target:?} needs exactly one engine"
                )));
            }
            GameMode::ConsiderationMultiEngine if engines.len() < 2 => {
                return Err(TransitionError::Vetoed(
                    "multi-engine consideration needs at least two engines".to_string(),
                ));
            }
            GameMode::InGame | GameMode::Uninitialized => {
                return Err(TransitionError::Vetoed(format!("{target:?} is not entered directly")));
            }
            _ => {}
        }

        let launched = self.launch_analysts(target, engines)?;
        self.teardown_analysts();
        self.analysts = launched;
        self.set_mode(target);
        self.analyze();
        Ok(())
    }

    fn launch_analysts(
        &self,
        target: GameMode,
        names: &[String],
    ) -> Result<Vec<EnginePlayer>, TransitionError> {
        let profile_options = if target == GameMode::ConsiderationMateEngine {
            &self.config.mate_search.options
        } else {
            &self.config.consideration.options
        };
        let mut launched = Vec::with_capacity(names.len());
        for (i, name) in names.iter().enumerate() {
            let base = self
                .config
                .engine(name)
                .ok_or_else(|| TransitionError::UnknownEngine(name.clone()))?;
            let mut config = base.clone();
            config
                .options
                .extend(profile_options.iter().map(|(k, v)| (k.clone(), v.clone())));
            let instance = names[..i].iter().filter(|n| *n == name).count() as u32 + 1;
            let mut player = EnginePlayer::launch(
                &config,
                instance,
                self.connector.as_ref(),
                self.config.handshake_timeout(),
            )?;
            if target != GameMode::ConsiderationMateEngine {
                player.think.set_multipv(self.multipv);
            }
            launched.push(player);
        }
        Ok(launched)
    }

    fn teardown_analysts(&mut self) {
        for mut player in mem::take(&mut self.analysts) {
            player.shutdown();
        }
    }

    fn leave_mode(&mut self, now: Instant) {
        if self.mode == GameMode::InGame {
            let by = self.position.side_to_move();
            let ply = self.record.ply();
            self.end_game(
                GameResult {
                    winner: None,
                    reason: EndReason::Interrupt,
                    by,
                    ply,
                },
                now,
            );
        } else {
            self.teardown_analysts();
            self.set_mode(GameMode::Uninitialized);
        }
    }

    fn set_mode(&mut self, mode: GameMode) {
        if self.mode != mode {
            log::info!("mode: {:?} -> {mode:?}", self.mode);
            self.mode = mode;
            self.notifier.ui(UiEvent::ModeChanged(mode));
        }
    }

    /// 検討エンジンに現在局面を解析させる。探索中なら上書き要求になる。
    fn analyze(&mut self) {
        if self.analysts.is_empty() {
            return;
        }
        let mate = self.mode == GameMode::ConsiderationMateEngine;
        if mate && !self.position.is_mate_searchable() {
            for player in &mut self.analysts {
                player.abandon();
            }
            self.notifier
                .error("current position cannot be searched for mate");
            return;
        }
        let go = if mate {
            self.config.mate_search.go_command()
        } else {
            self.config.consideration.go_command()
        };
        let position = position_command(&self.record.root_sfen(), &self.record.moves());
        let root_sfen = self.position.sfen();
        let mut failed = None;
        for i in 0..self.analysts.len() {
            let context = self.next_context();
            let request = ThinkRequest {
                position: position.clone(),
                go,
                context,
            };
            let player = &mut self.analysts[i];
            if let Err(e) = player.request(request, root_sfen.clone()) {
                failed.get_or_insert(format!("engine '{}' failed: {e}", player.name));
            }
        }
        if let Some(message) = failed {
            self.notifier.error(message);
            self.queue.push(Command::LeaveMode);
        }
    }

    // ------------------------------------------------------------------
    // 対局
    // ------------------------------------------------------------------

    fn begin_turn(&mut self, now: Instant) {
        let color = self.position.side_to_move();
        let ply = self.record.ply();
        if self.position.legal_moves().is_empty() {
            self.end_game(
                GameResult {
                    winner: Some(!color),
                    reason: EndReason::Checkmate,
                    by: color,
                    ply,
                },
                now,
            );
            return;
        }
        self.clock.start_turn(color, now);
        let human = self.players[color.index()].is_human();
        if !human {
            let request = ThinkRequest {
                position: position_command(&self.record.root_sfen(), &self.record.moves()),
                go: self.clock.to_limit(color, self.engine_limit, now),
                context: self.next_context(),
            };
            let root_sfen = self.position.sfen();
            let result = match self.players[color.index()].engine_mut() {
                Some(player) => player.request(request, root_sfen),
                None => Ok(()),
            };
            if let Err(e) = result {
                self.notifier
                    .error(format!("engine for {} failed: {e}", color.label()));
                self.end_game(
                    GameResult {
                        winner: None,
                        reason: EndReason::Interrupt,
                        by: color,
                        ply,
                    },
                    now,
                );
                return;
            }
        }
        self.notifier.ui(UiEvent::TurnChanged {
            color,
            ply,
            human_turn: human,
        });
    }

    fn check_move(&mut self, now: Instant) {
        let color = self.position.side_to_move();
        if let Some(candidate) = self.players[color.index()].staged.take() {
            self.resolve(color, candidate, now);
        }
    }

    fn check_time_up(&mut self, now: Instant) {
        let color = self.position.side_to_move();
        if !self.clock.is_time_up(color, now) {
            return;
        }
        if let Some(player) = self.players[color.index()].engine_mut() {
            player.abandon();
        }
        self.players[color.index()].staged = None;
        self.resolve(color, Candidate::TimeUp, now);
    }

    fn resolve(&mut self, color: Color, candidate: Candidate, now: Instant) {
        let ply = self.record.ply();
        let result = move |winner: Option<Color>, reason: EndReason| GameResult {
            winner,
            reason,
            by: color,
            ply,
        };
        match candidate {
            Candidate::Move(mv) => {
                if !self.position.is_legal(&mv) {
                    self.reject(color, &mv, now);
                    return;
                }
                let spent = self.clock.stop_turn(color, false, now);
                if let Err(e) = self.position.apply(&mv) {
                    log::error!("legal move {mv} could not be applied: {e}");
                    self.reject(color, &mv, now);
                    return;
                }
                let sfen = self.position.sfen();
                self.record.append_move(&mv, &sfen, spent);
                log::info!("{} played {mv} ({} ms)", color.label(), spent.as_millis());
                if let Some(terminal) = self.record.special_terminal() {
                    let (winner, reason) = match terminal {
                        SpecialTerminal::RepetitionDraw => (None, EndReason::Repetition),
                        SpecialTerminal::RepetitionWin { winner } => {
                            (Some(winner), EndReason::RepetitionWin)
                        }
                        SpecialTerminal::MaxMovesDraw => (None, EndReason::MaxMoves),
                    };
                    let mut outcome = result(winner, reason);
                    outcome.ply = self.record.ply();
                    self.end_game(outcome, now);
                    return;
                }
                self.begin_turn(now);
            }
            Candidate::Resign => self.end_game(result(Some(!color), EndReason::Resign), now),
            Candidate::Interrupt => self.end_game(result(None, EndReason::Interrupt), now),
            Candidate::TimeUp => {
                if self.clock.is_time_up(color, now) {
                    self.end_game(result(Some(!color), EndReason::TimeUp), now);
                } else {
                    self.reject(color, "time-up claim", now);
                }
            }
            Candidate::DeclareWin => {
                if self.position.declaration_win(self.config.entering_king_rule) {
                    self.end_game(result(Some(color), EndReason::DeclaredWin), now);
                } else {
                    self.reject(color, "declaration", now);
                }
            }
        }
    }

    fn reject(&mut self, color: Color, what: &str, now: Instant) {
        log::warn!("illegal move by {}: {what}", color.label());
        let ply = self.record.ply();
        self.end_game(
            GameResult {
                winner: Some(!color),
                reason: EndReason::IllegalMove,
                by: color,
                ply,
            },
            now,
        );
    }

    /// 時計を止め、終局を記録し、エンジンに `gameover` を送って切断する。
    fn end_game(&mut self, result: GameResult, now: Instant) {
        if result.reason == EndReason::TimeUp {
            self.clock.stop_turn(result.by, true, now);
        }
        self.clock.stop_all(now);
        self.record.append_terminal(result.reason, result.by);

        let mut players = mem::replace(&mut self.players, [PlayerSlot::human(), PlayerSlot::human()]);
        for color in Color::ALL {
            if let Some(player) = players[color.index()].engine_mut() {
                player.abandon();
                let outcome = match result.winner {
                    None => GameOverResult::Draw,
                    Some(winner) if winner == color => GameOverResult::Win,
                    Some(_) => GameOverResult::Lose,
                };
                player.think.session_mut().game_over(outcome);
                player.shutdown();
            }
        }

        log::info!(
            "game over: {:?} by {} at ply {} (winner: {})",
            result.reason,
            result.by.label(),
            result.ply,
            result.winner.map_or("none", Color::label)
        );
        self.last_result = Some(result);
        self.notifier.ui(UiEvent::GameOver(result));
        self.set_mode(GameMode::Uninitialized);
    }

    // ------------------------------------------------------------------
    // 通知
    // ------------------------------------------------------------------

    fn publish(&mut self, now: Instant) {
        let clocks = [
            self.clock.remaining_display(Color::Black, now),
            self.clock.remaining_display(Color::White, now),
        ];
        if self.mode == GameMode::InGame && clocks != self.last_clocks {
            self.notifier.ui(UiEvent::ClockDisplay {
                black: clocks[0].clone(),
                white: clocks[1].clone(),
            });
        }
        self.last_clocks = clocks.clone();

        let side = self.position.side_to_move();
        let snapshot = GameSnapshot {
            mode: self.mode,
            side_to_move: side,
            ply: self.record.ply(),
            sfen: self.position.sfen(),
            clocks,
            human_turn: self.mode == GameMode::InGame && self.players[side.index()].is_human(),
            thinking: [self.players[0].is_thinking(), self.players[1].is_thinking()],
            analyzing: self.analysts.iter().any(|p| p.think.is_thinking()),
            last_result: self.last_result,
        };
        let mut current = self.snapshot.lock();
        if *current != snapshot {
            *current = snapshot;
        }
    }
}
