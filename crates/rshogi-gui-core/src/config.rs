//! アプリケーション設定。構築後は不変で、`Arc<AppConfig>` として共有する。
//!
//! ```toml
//! tick_ms = 10
//! handshake_timeout_secs = 30
//! entering_king_rule = "point27"
//!
//! [[engines]]
//! name = "suisho"
//! path = "/opt/engines/YaneuraOu"
//! [engines.options]
//! USI_Hash = 1024
//!
//! [consideration]
//! multipv = 3
//!
//! [mate_search]
//! time_limit_ms = 10000
//! ```

use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use rshogi_usi_client::{EngineConfig, GoCommand, MateLimit, TimeExtra};
use serde::{Deserialize, Serialize};

use crate::collab::EnteringKingRule;

const DEFAULT_TICK_MS: u64 = 10;
const DEFAULT_HANDSHAKE_TIMEOUT_SECS: u64 = 30;
const DEFAULT_TELEMETRY_CAPACITY: usize = 1024;

fn default_tick_ms() -> u64 {
    DEFAULT_TICK_MS
}

fn default_handshake_timeout_secs() -> u64 {
    DEFAULT_HANDSHAKE_TIMEOUT_SECS
}

fn default_telemetry_capacity() -> usize {
    DEFAULT_TELEMETRY_CAPACITY
}

fn default_multipv() -> u32 {
    1
}

/// 検討モードの設定。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsiderationProfile {
    #[serde(default = "default_multipv")]
    pub multipv: u32,
    /// 1 局面あたりの思考時間。未指定なら `go infinite`。
    #[serde(default)]
    pub time_limit_ms: Option<u64>,
    /// エンジン設定の options に上書きで追加する。
    #[serde(default)]
    pub options: BTreeMap<String, toml::Value>,
}

impl Default for ConsiderationProfile {
    fn default() -> Self {
        Self {
            multipv: default_multipv(),
            time_limit_ms: None,
            options: BTreeMap::new(),
        }
    }
}

impl ConsiderationProfile {
    pub fn go_command(&self) -> GoCommand {
        match self.time_limit_ms {
            Some(ms) => GoCommand::Time {
                btime: 0,
                wtime: 0,
                extra: TimeExtra::Byoyomi(ms),
            },
            None => GoCommand::Infinite,
        }
    }
}

/// 詰み探索モードの設定。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MateSearchProfile {
    /// 未指定なら `go mate infinite`。
    #[serde(default)]
    pub time_limit_ms: Option<u64>,
    #[serde(default)]
    pub options: BTreeMap<String, toml::Value>,
}

impl MateSearchProfile {
    pub fn go_command(&self) -> GoCommand {
        match self.time_limit_ms {
            Some(ms) => GoCommand::Mate(MateLimit::Millis(ms)),
            None => GoCommand::Mate(MateLimit::Infinite),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_tick_ms")]
    pub tick_ms: u64,
    #[serde(default = "default_handshake_timeout_secs")]
    pub handshake_timeout_secs: u64,
    #[serde(default)]
    pub entering_king_rule: EnteringKingRule,
    /// テレメトリチャネルの容量。溢れた分は捨てる。
    #[serde(default = "default_telemetry_capacity")]
    pub telemetry_capacity: usize,
    #[serde(default)]
    pub engines: Vec<EngineConfig>,
    #[serde(default)]
    pub consideration: ConsiderationProfile,
    #[serde(default)]
    pub mate_search: MateSearchProfile,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            tick_ms: DEFAULT_TICK_MS,
            handshake_timeout_secs: DEFAULT_HANDSHAKE_TIMEOUT_SECS,
            entering_king_rule: EnteringKingRule::default(),
            telemetry_capacity: DEFAULT_TELEMETRY_CAPACITY,
            engines: Vec::new(),
            consideration: ConsiderationProfile::default(),
            mate_search: MateSearchProfile::default(),
        }
    }
}

impl AppConfig {
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: AppConfig = toml::from_str(text).context("failed to parse app config")?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        Self::from_toml_str(&text).with_context(|| format!("invalid config: {}", path.display()))
    }

    fn validate(&self) -> Result<()> {
        if self.tick_ms == 0 {
            anyhow::bail!("tick_ms must be positive");
        }
        let mut seen = std::collections::HashSet::new();
        for engine in &self.engines {
            if !seen.insert(engine.name.as_str()) {
                anyhow::bail!("duplicate engine name '{}'", engine.name);
            }
        }
        Ok(())
    }

    pub fn engine(&self, name: &str) -> Option<&EngineConfig> {
        self.engines.iter().find(|e| e.name == name)
    }

    pub fn tick(&self) -> Duration {
        Duration::from_millis(self.tick_ms)
    }

    pub fn handshake_timeout(&self) -> Duration {
        Duration::from_secs(self.handshake_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_to_missing_fields() {
        let config = AppConfig::from_toml_str("").unwrap();
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.tick(), Duration::from_millis(10));
        assert_eq!(config.handshake_timeout(), Duration::from_secs(30));
        assert_eq!(config.consideration.go_command(), GoCommand::Infinite);
        assert_eq!(
            config.mate_search.go_command(),
            GoCommand::Mate(MateLimit::Infinite)
        );
    }

    #[test]
    fn loads_engines_and_profiles_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gui.toml");
        std::fs::write(
            &path,
            r#"
            entering_king_rule = "point27"
            [[engines]]
            name = "suisho"
            path = "/opt/engines/YaneuraOu"
            [engines.options]
            USI_Hash = 1024
            [consideration]
            multipv = 3
            time_limit_ms = 5000
            [mate_search]
            time_limit_ms = 10000
            "#,
        )
        .unwrap();
        let config = AppConfig::load(&path).unwrap();
        assert_eq!(config.entering_king_rule, EnteringKingRule::Point27);
        assert_eq!(config.engine("suisho").map(|e| e.option_values().len()), Some(1));
        assert!(config.engine("other").is_none());
        assert_eq!(config.consideration.multipv, 3);
        assert_eq!(
            config.consideration.go_command().to_string(),
            "go btime 0 wtime 0 byoyomi 5000"
        );
        assert_eq!(config.mate_search.go_command().to_string(), "go mate 10000");
    }

    #[test]
    fn rejects_duplicate_engine_names() {
        let err = AppConfig::from_toml_str(
            r#"
            [[engines]]
            name = "a"
            path = "x"
            [[engines]]
            name = "a"
            path = "y"
            "#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("duplicate engine name"));
    }
}
