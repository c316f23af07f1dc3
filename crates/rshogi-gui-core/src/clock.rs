//! 対局時計と `go` の時間制限の組み立て。
//!
//! 消費規則:
//! - 持ち時間が残っている間は経過時間を持ち時間から引く
//! - 持ち時間を使い切った後は秒読みだけで指す。秒読みは繰り越さない
//! - 加算（フィッシャー）は指し終えた直後に持ち時間へ足す
//!
//! 手番開始時の持ち時間 + 秒読みを超えたら時間切れ。

use std::time::{Duration, Instant};

use rshogi_usi_client::{GoCommand, TimeExtra};
use serde::{Deserialize, Serialize};

use crate::types::Color;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeSettings {
    pub main_ms: u64,
    pub byoyomi_ms: u64,
    pub increment_ms: u64,
    /// 時間無制限。時間切れにならず、`go` には `infinite` を送る。
    pub unlimited: bool,
}

impl TimeSettings {
    pub fn byoyomi(main_ms: u64, byoyomi_ms: u64) -> Self {
        Self {
            main_ms,
            byoyomi_ms,
            ..Self::default()
        }
    }

    pub fn fischer(main_ms: u64, increment_ms: u64) -> Self {
        Self {
            main_ms,
            increment_ms,
            ..Self::default()
        }
    }

    pub fn unlimited() -> Self {
        Self {
            unlimited: true,
            ..Self::default()
        }
    }
}

/// エンジンに渡す探索制限の種類。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LimitKind {
    Infinite,
    #[default]
    WallClock,
    Nodes(u64),
    Depth(u32),
}

#[derive(Debug, Clone, Copy)]
struct SideClock {
    settings: TimeSettings,
    main_ms: u64,
    /// 手番開始時刻と、その時点の持ち時間
    turn: Option<(Instant, u64)>,
}

impl SideClock {
    fn new(settings: TimeSettings) -> Self {
        Self {
            settings,
            main_ms: settings.main_ms,
            turn: None,
        }
    }

    fn elapsed_ms(&self, now: Instant) -> u64 {
        self.turn
            .map(|(start, _)| now.saturating_duration_since(start).as_millis() as u64)
            .unwrap_or(0)
    }

    /// 表示用の残り持ち時間
    fn main_remaining(&self, now: Instant) -> u64 {
        match self.turn {
            Some((_, main_at_start)) => main_at_start.saturating_sub(self.elapsed_ms(now)),
            None => self.main_ms,
        }
    }

    /// 持ち時間切れ後の秒読み残り
    fn byoyomi_remaining(&self, now: Instant) -> u64 {
        match self.turn {
            Some((_, main_at_start)) => {
                let over = self.elapsed_ms(now).saturating_sub(main_at_start);
                self.settings.byoyomi_ms.saturating_sub(over)
            }
            None => self.settings.byoyomi_ms,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ClockManager {
    sides: [SideClock; Color::NUM],
}

impl Default for ClockManager {
    fn default() -> Self {
        Self::new(TimeSettings::unlimited(), TimeSettings::unlimited())
    }
}

impl ClockManager {
    pub fn new(black: TimeSettings, white: TimeSettings) -> Self {
        Self {
            sides: [SideClock::new(black), SideClock::new(white)],
        }
    }

    pub fn settings(&self, color: Color) -> TimeSettings {
        self.sides[color.index()].settings
    }

    pub fn is_running(&self, color: Color) -> bool {
        self.sides[color.index()].turn.is_some()
    }

    pub fn start_turn(&mut self, color: Color, now: Instant) {
        let side = &mut self.sides[color.index()];
        if side.turn.is_none() {
            side.turn = Some((now, side.main_ms));
        }
    }

    /// 手番を終え、消費時間を返す。
    pub fn stop_turn(&mut self, color: Color, was_time_up: bool, now: Instant) -> Duration {
        let side = &mut self.sides[color.index()];
        let Some((start, main_at_start)) = side.turn.take() else {
            return Duration::ZERO;
        };
        let elapsed = now.saturating_duration_since(start);
        if side.settings.unlimited {
            return elapsed;
        }
        if was_time_up {
            side.main_ms = 0;
        } else {
            let elapsed_ms = elapsed.as_millis() as u64;
            side.main_ms = main_at_start
                .saturating_sub(elapsed_ms)
                .saturating_add(side.settings.increment_ms);
        }
        elapsed
    }

    /// 消費せずに手番を取り消す（待ったなど）。
    pub fn cancel_turn(&mut self, color: Color) {
        let side = &mut self.sides[color.index()];
        if let Some((_, main_at_start)) = side.turn.take() {
            side.main_ms = main_at_start;
        }
    }

    pub fn stop_all(&mut self, now: Instant) {
        for color in Color::ALL {
            self.stop_turn(color, false, now);
        }
    }

    pub fn is_time_up(&self, color: Color, now: Instant) -> bool {
        let side = &self.sides[color.index()];
        if side.settings.unlimited {
            return false;
        }
        match side.turn {
            Some((_, main_at_start)) => {
                side.elapsed_ms(now) > main_at_start.saturating_add(side.settings.byoyomi_ms)
            }
            None => false,
        }
    }

    pub fn remaining_main_ms(&self, color: Color, now: Instant) -> u64 {
        self.sides[color.index()].main_remaining(now)
    }

    /// `H:MM:SS`。持ち時間を使い切ったら秒読みの残り秒数（切り上げ）を括弧で付ける。
    pub fn remaining_display(&self, color: Color, now: Instant) -> String {
        let side = &self.sides[color.index()];
        if side.settings.unlimited {
            return format_hms(side.elapsed_ms(now));
        }
        let main = side.main_remaining(now);
        let mut text = format_hms(main);
        if main == 0 && side.settings.byoyomi_ms > 0 {
            let secs = side.byoyomi_remaining(now).div_ceil(1000);
            text.push_str(&format!(" ({secs})"));
        }
        text
    }

    /// `side` の手番で送る `go` を組み立てる。
    pub fn to_limit(&self, side: Color, kind: LimitKind, now: Instant) -> GoCommand {
        match kind {
            LimitKind::Infinite => GoCommand::Infinite,
            LimitKind::Nodes(n) => GoCommand::Nodes(n),
            LimitKind::Depth(d) => GoCommand::Depth(d),
            LimitKind::WallClock => {
                if self.sides[side.index()].settings.unlimited {
                    return GoCommand::Infinite;
                }
                let black = &self.sides[Color::Black.index()];
                let white = &self.sides[Color::White.index()];
                let binc = black.settings.increment_ms;
                let winc = white.settings.increment_ms;
                let extra = if binc > 0 || winc > 0 {
                    TimeExtra::Increment { binc, winc }
                } else {
                    TimeExtra::Byoyomi(self.sides[side.index()].settings.byoyomi_ms)
                };
                GoCommand::Time {
                    btime: black.main_remaining(now),
                    wtime: white.main_remaining(now),
                    extra,
                }
            }
        }
    }
}

fn format_hms(ms: u64) -> String {
    let total = ms / 1000;
    format!("{}:{:02}:{:02}", total / 3600, total / 60 % 60, total % 60)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(base: Instant, ms: u64) -> Instant {
        base + Duration::from_millis(ms)
    }

    #[test]
    fn byoyomi_limit_is_emitted_without_increment() {
        let clock = ClockManager::new(
            TimeSettings::byoyomi(60_000, 5_000),
            TimeSettings::byoyomi(60_000, 5_000),
        );
        let go = clock.to_limit(Color::Black, LimitKind::WallClock, Instant::now());
        assert_eq!(go.to_string(), "go btime 60000 wtime 60000 byoyomi 5000");
    }

    #[test]
    fn increment_limit_has_no_byoyomi_token() {
        let clock = ClockManager::new(
            TimeSettings::fischer(0, 2_000),
            TimeSettings::fischer(0, 2_000),
        );
        let go = clock.to_limit(Color::White, LimitKind::WallClock, Instant::now());
        assert_eq!(go.to_string(), "go btime 0 wtime 0 binc 2000 winc 2000");
    }

    #[test]
    fn nothing_configured_sends_zero_byoyomi() {
        let clock = ClockManager::new(TimeSettings::default(), TimeSettings::default());
        let go = clock.to_limit(Color::Black, LimitKind::WallClock, Instant::now());
        assert_eq!(go.to_string(), "go btime 0 wtime 0 byoyomi 0");
        assert_eq!(
            clock.to_limit(Color::Black, LimitKind::Nodes(500), Instant::now()),
            GoCommand::Nodes(500)
        );
        assert_eq!(
            ClockManager::default().to_limit(Color::Black, LimitKind::WallClock, Instant::now()),
            GoCommand::Infinite
        );
    }

    #[test]
    fn elapsed_comes_out_of_main_then_byoyomi_without_carry_over() {
        let base = Instant::now();
        let mut clock = ClockManager::new(
            TimeSettings::byoyomi(10_000, 3_000),
            TimeSettings::byoyomi(10_000, 3_000),
        );
        clock.start_turn(Color::Black, base);
        assert_eq!(clock.stop_turn(Color::Black, false, at(base, 4_000)), Duration::from_secs(4));
        assert_eq!(clock.remaining_main_ms(Color::Black, base), 6_000);

        // 持ち時間を超えた分は秒読みから使う
        clock.start_turn(Color::Black, base);
        assert!(!clock.is_time_up(Color::Black, at(base, 9_000)));
        clock.stop_turn(Color::Black, false, at(base, 8_000));
        assert_eq!(clock.remaining_main_ms(Color::Black, base), 0);

        // 秒読みは毎手 3 秒に戻る
        clock.start_turn(Color::Black, base);
        assert!(!clock.is_time_up(Color::Black, at(base, 3_000)));
        assert!(clock.is_time_up(Color::Black, at(base, 3_001)));
        assert_eq!(clock.remaining_display(Color::Black, at(base, 1_200)), "0:00:00 (2)");
    }

    #[test]
    fn increment_is_credited_after_the_move() {
        let base = Instant::now();
        let mut clock = ClockManager::new(
            TimeSettings::fischer(5_000, 1_000),
            TimeSettings::fischer(5_000, 1_000),
        );
        clock.start_turn(Color::White, base);
        assert_eq!(clock.remaining_main_ms(Color::White, at(base, 4_000)), 1_000);
        clock.stop_turn(Color::White, false, at(base, 4_000));
        assert_eq!(clock.remaining_main_ms(Color::White, base), 2_000);

        clock.start_turn(Color::White, base);
        assert!(clock.is_time_up(Color::White, at(base, 2_001)));
        clock.stop_turn(Color::White, true, at(base, 2_001));
        assert_eq!(clock.remaining_main_ms(Color::White, base), 0);
    }

    #[test]
    fn unlimited_clock_never_expires() {
        let base = Instant::now();
        let mut clock = ClockManager::default();
        clock.start_turn(Color::Black, base);
        assert!(!clock.is_time_up(Color::Black, at(base, 86_400_000)));
        assert_eq!(clock.remaining_display(Color::Black, at(base, 3_661_000)), "1:01:01");
    }

    #[test]
    fn cancel_turn_restores_main_time() {
        let base = Instant::now();
        let mut clock = ClockManager::new(
            TimeSettings::byoyomi(10_000, 0),
            TimeSettings::byoyomi(10_000, 0),
        );
        clock.start_turn(Color::Black, base);
        clock.cancel_turn(Color::Black);
        assert!(!clock.is_running(Color::Black));
        assert_eq!(clock.remaining_main_ms(Color::Black, at(base, 5_000)), 10_000);
        assert_eq!(clock.remaining_display(Color::Black, base), "0:00:10");
    }

    #[test]
    fn time_settings_deserialize_with_defaults() {
        let s: TimeSettings = toml::from_str("main_ms = 600000\nbyoyomi_ms = 10000").unwrap();
        assert_eq!(s, TimeSettings::byoyomi(600_000, 10_000));
        #[derive(Deserialize)]
        struct Profile {
            limit: LimitKind,
        }
        let kind = toml::from_str::<Profile>("limit = { nodes = 1000 }").unwrap().limit;
        assert_eq!(kind, LimitKind::Nodes(1000));
        let kind = toml::from_str::<Profile>(r#"limit = "wall-clock""#).unwrap().limit;
        assert_eq!(kind, LimitKind::WallClock);
    }
}
