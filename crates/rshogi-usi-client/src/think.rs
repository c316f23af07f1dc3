//! 1 エンジンにつき同時に 1 探索だけを走らせる調停役。
//!
//! 探索中に新しい要求が来たら `stop` を 1 度だけ送り、要求は上書きスロット
//! （`pending`）に置く。スロットは 1 つしかないので、連続した要求は最後のものだけが残る。
//! 旧探索の `bestmove` が届いた時点でスロットの要求を開始する。

use serde::Serialize;

use crate::error::SessionError;
use crate::protocol::{BestMove, GoCommand, InfoReport, MateResult};
use crate::session::{EngineSession, SessionEvent};

/// 探索要求。`context` は呼び出し側が結果を突き合わせるための番号。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThinkRequest {
    /// `position ...` 行そのもの。
    pub position: String,
    pub go: GoCommand,
    pub context: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum SearchResult {
    BestMove(BestMove),
    Checkmate(MateResult),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ThinkOutcome {
    pub context: u64,
    pub result: SearchResult,
}

/// 届いた結果をどう扱ったか。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultDisposition {
    Accepted,
    /// 上書き要求があったため捨てた。
    Superseded,
    /// `abandon` 済み、または探索していないのに届いた。
    Discarded,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ThinkEvent {
    Info { context: u64, report: InfoReport },
    /// 結果が確定した。[`ThinkCoordinator::take_result`] で取り出す。
    Finished { context: u64 },
    Fatal(SessionError),
}

#[derive(Debug, Clone, Copy)]
struct InFlight {
    context: u64,
    stop_sent: bool,
    abandoned: bool,
}

pub struct ThinkCoordinator {
    session: EngineSession,
    in_flight: Option<InFlight>,
    pending: Option<ThinkRequest>,
    last: Option<ThinkOutcome>,
    /// 次の探索開始時に送る MultiPV。
    pending_multipv: Option<u32>,
}

impl ThinkCoordinator {
    pub fn new(session: EngineSession) -> Self {
        Self {
            session,
            in_flight: None,
            pending: None,
            last: None,
            pending_multipv: None,
        }
    }

    /// 探索を要求する。探索中なら上書きスロットに置き、`stop` を（まだなら）送る。
    pub fn request_think(&mut self, request: ThinkRequest) -> Result<(), SessionError> {
        if self.in_flight.is_some() {
            if let Some(old) = self.pending.replace(request) {
                log::debug!("{}: dropping queued request {}", self.session.label(), old.context);
            }
            self.send_stop();
            return Ok(());
        }
        self.start(request).inspect_err(|_| {
            // 呼び出し側がエラーとして受け取るので pump では報告しない
            self.session.take_unreported_fatal();
        })
    }

    fn start(&mut self, request: ThinkRequest) -> Result<(), SessionError> {
        if let Some(n) = self.pending_multipv.take() {
            if self.session.options().contains("MultiPV") {
                if let Err(e) = self.session.set_option("MultiPV", &n.to_string()) {
                    log::warn!("{}: {e}", self.session.label());
                }
            } else {
                log::debug!("{}: engine has no MultiPV option", self.session.label());
            }
        }
        self.last = None;
        self.session.start_search(&request.position, &request.go)?;
        self.in_flight = Some(InFlight {
            context: request.context,
            stop_sent: false,
            abandoned: false,
        });
        Ok(())
    }

    fn send_stop(&mut self) {
        if let Some(flight) = self.in_flight.as_mut() {
            if !flight.stop_sent {
                flight.stop_sent = true;
                self.session.send("stop");
            }
        }
    }

    /// 現在の探索を止める。探索していない、または `stop` 送信済みなら何もしない。
    ///
    /// 上書き要求はそのまま残り、旧探索の結果は `Superseded` として捨てられる。
    pub fn cancel(&mut self) {
        self.send_stop();
    }

    /// 現在の探索を止め、その結果を捨てる。
    pub fn abandon(&mut self) {
        self.pending = None;
        self.last = None;
        if let Some(flight) = self.in_flight.as_mut() {
            flight.abandoned = true;
        }
        self.send_stop();
    }

    /// 探索結果を 1 件処理する。上書き要求があればここで開始する。
    pub fn on_result(&mut self, result: SearchResult) -> ResultDisposition {
        let Some(flight) = self.in_flight.take() else {
            log::warn!("{}: result without a search in flight", self.session.label());
            return ResultDisposition::Discarded;
        };
        let disposition = if flight.abandoned {
            ResultDisposition::Discarded
        } else if self.pending.is_some() {
            ResultDisposition::Superseded
        } else {
            self.last = Some(ThinkOutcome {
                context: flight.context,
                result,
            });
            ResultDisposition::Accepted
        };
        if let Some(next) = self.pending.take() {
            if let Err(e) = self.start(next) {
                log::warn!("{}: could not start queued search: {e}", self.session.label());
            }
        }
        disposition
    }

    pub fn pump(&mut self) -> Vec<ThinkEvent> {
        let mut events = Vec::new();
        for ev in self.session.pump() {
            match ev {
                SessionEvent::Info(report) => {
                    // 上書き待ちの間は旧探索の読み筋なので流さない
                    if let Some(flight) = self.in_flight {
                        if !flight.abandoned && self.pending.is_none() {
                            events.push(ThinkEvent::Info {
                                context: flight.context,
                                report,
                            });
                        }
                    }
                }
                SessionEvent::BestMove(bm) => self.finish(SearchResult::BestMove(bm), &mut events),
                SessionEvent::Checkmate(r) => self.finish(SearchResult::Checkmate(r), &mut events),
                SessionEvent::Fatal(e) => self.fail(e, &mut events),
            }
        }
        // 上書き要求の開始時に書き込みが失敗した場合など、pump 後に起きたものも拾う
        if let Some(e) = self.session.take_unreported_fatal() {
            self.fail(e, &mut events);
        }
        events
    }

    fn fail(&mut self, e: SessionError, events: &mut Vec<ThinkEvent>) {
        self.in_flight = None;
        self.pending = None;
        events.push(ThinkEvent::Fatal(e));
    }

    fn finish(&mut self, result: SearchResult, events: &mut Vec<ThinkEvent>) {
        let context = self.in_flight.map(|f| f.context);
        if let (ResultDisposition::Accepted, Some(context)) = (self.on_result(result), context) {
            events.push(ThinkEvent::Finished { context });
        }
    }

    /// MultiPV の変更は次の探索開始時に反映する。
    pub fn set_multipv(&mut self, n: u32) {
        self.pending_multipv = Some(n);
    }

    fn settled(&self) -> Option<&ThinkOutcome> {
        if self.pending.is_some() {
            return None;
        }
        self.last.as_ref()
    }

    pub fn best_move(&self) -> Option<&BestMove> {
        match self.settled().map(|o| &o.result) {
            Some(SearchResult::BestMove(bm)) => Some(bm),
            _ => None,
        }
    }

    pub fn ponder_move(&self) -> Option<&str> {
        self.best_move().and_then(|bm| bm.ponder.as_deref())
    }

    pub fn mate_result(&self) -> Option<&MateResult> {
        match self.settled().map(|o| &o.result) {
            Some(SearchResult::Checkmate(r)) => Some(r),
            _ => None,
        }
    }

    pub fn take_result(&mut self) -> Option<ThinkOutcome> {
        if self.pending.is_some() {
            return None;
        }
        self.last.take()
    }

    pub fn is_thinking(&self) -> bool {
        self.in_flight.is_some()
    }

    pub fn current_context(&self) -> Option<u64> {
        self.in_flight.map(|f| f.context)
    }

    pub fn has_pending_override(&self) -> bool {
        self.pending.is_some()
    }

    pub fn session(&self) -> &EngineSession {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut EngineSession {
        &mut self.session
    }
}
