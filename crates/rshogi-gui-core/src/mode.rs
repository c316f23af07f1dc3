use serde::Serialize;

/// GUI 全体のモード。同時に 1 つだけ。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
pub enum GameMode {
    #[default]
    Uninitialized,
    InGame,
    BoardEdit,
    ConsiderationNoEngine,
    ConsiderationOneEngine,
    ConsiderationMateEngine,
    ConsiderationMultiEngine,
}

impl GameMode {
    /// エンジンを起動するモードか。
    pub fn is_engine_backed(self) -> bool {
        matches!(
            self,
            GameMode::InGame
                | GameMode::ConsiderationOneEngine
                | GameMode::ConsiderationMateEngine
                | GameMode::ConsiderationMultiEngine
        )
    }

    /// 検討系のモード（エンジンなしの検討も含む）。
    pub fn is_consideration(self) -> bool {
        matches!(
            self,
            GameMode::ConsiderationNoEngine
                | GameMode::ConsiderationOneEngine
                | GameMode::ConsiderationMateEngine
                | GameMode::ConsiderationMultiEngine
        )
    }

    /// 盤上で自由に指し手を進められるモード。
    pub fn allows_free_moves(self) -> bool {
        self == GameMode::Uninitialized || self.is_consideration()
    }
}
