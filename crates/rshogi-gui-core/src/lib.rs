//! 将棋 GUI の対局・検討オーケストレーション。
//!
//! UI スレッドは [`Command`] を積み、ワーカースレッドの [`Orchestrator`] だけが
//! 局面・棋譜・時計・エンジンを操作する。局面と棋譜の実装は [`collab`] の
//! トレイトを通して外から与える。

pub mod clock;
pub mod collab;
pub mod command;
pub mod config;
pub mod error;
pub mod events;
pub mod mode;
pub mod orchestrator;
pub mod player;
pub mod types;
pub mod worker;

pub use clock::{ClockManager, LimitKind, TimeSettings};
pub use collab::{EnteringKingRule, GamePosition, GameRecord, SpecialTerminal};
pub use command::{Command, CommandQueue, GameSetup, PlayerSpec};
pub use config::{AppConfig, ConsiderationProfile, MateSearchProfile};
pub use error::{CollabError, TransitionError};
pub use events::{EventStreams, GameSnapshot, Notifier, TelemetryEvent, UiEvent, channels};
pub use mode::GameMode;
pub use orchestrator::Orchestrator;
pub use player::Candidate;
pub use types::{Color, EndReason, GameResult};
pub use worker::{OrchestratorHandle, spawn, start};
