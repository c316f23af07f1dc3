//! USI ワイヤプロトコルの符号化・復号。
//!
//! - [`message`]: エンジン → GUI の 1 行を [`EngineMessage`] に復号する
//! - [`option`]: `option` 宣言と `setoption` 行
//! - [`info`]: `info` テレメトリ
//! - [`command`]: GUI → エンジンのコマンド（`position` / `go` / `gameover`）

pub mod command;
pub mod info;
pub mod message;
pub mod moves;
pub mod option;

pub use command::{GameOverResult, GoCommand, MateLimit, SFEN_HIRATE, TimeExtra, position_command};
pub use info::{InfoReport, MateScore, MateSign, Score, ScoreBound, parse_info};
pub use message::{BestMove, BestMoveToken, EngineMessage, MateResult, parse_engine_line};
pub use moves::{PV_SENTINELS, is_pv_sentinel, is_usi_move};
pub use option::{EngineOption, OptionKind, OptionTable, parse_option_line, parse_setoption_line};
