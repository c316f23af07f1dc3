use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// エンジンプロセス起動時の設定。
///
/// TOML では次のように書く:
///
/// ```toml
/// [[engines]]
/// name = "suisho"
/// path = "/opt/engines/YaneuraOu"
/// args = []
/// [engines.options]
/// USI_Hash = 1024
/// Threads = 4
/// EvalDir = "eval/suisho5"
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    pub name: String,
    pub path: PathBuf,
    #[serde(default)]
    pub args: Vec<String>,
    /// 未指定ならエンジンバイナリのあるディレクトリで起動する。
    #[serde(default)]
    pub working_dir: Option<PathBuf>,
    /// ハンドシェイク直後に `setoption` で送る値。
    #[serde(default)]
    pub options: BTreeMap<String, toml::Value>,
}

impl EngineConfig {
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            ..Self::default()
        }
    }

    /// 起動ディレクトリ。明示指定がなければバイナリの親ディレクトリ。
    pub fn effective_working_dir(&self) -> Option<&Path> {
        if let Some(dir) = &self.working_dir {
            return Some(dir.as_path());
        }
        self.path.parent().filter(|p| !p.as_os_str().is_empty())
    }

    /// `options` を `setoption` 用の (名前, 値) 列に変換する。
    pub fn option_values(&self) -> Vec<(String, String)> {
        self.options
            .iter()
            .map(|(name, value)| (name.clone(), value_to_usi_text(value)))
            .collect()
    }
}

/// TOML 値を USI の値表現に変換する。文字列は引用符を外して送る。
pub fn value_to_usi_text(value: &toml::Value) -> String {
    match value {
        toml::Value::String(s) => s.clone(),
        toml::Value::Integer(i) => i.to_string(),
        toml::Value::Float(f) => f.to_string(),
        toml::Value::Boolean(b) => b.to_string(),
        other => other.to_string(),
    }
}
