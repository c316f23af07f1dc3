//! `info` 行（探索テレメトリ）の解析。

use serde::Serialize;

use super::moves::{is_pv_sentinel, is_usi_move};
use crate::error::ParseError;

/// 値の区切りとして扱う `info` のキーワード。
const KEYWORDS: [&str; 11] = [
    "depth", "seldepth", "time", "nodes", "nps", "hashfull", "currmove", "multipv", "score", "pv",
    "string",
];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub enum ScoreBound {
    #[default]
    Exact,
    Upper,
    Lower,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MateSign {
    Plus,
    Minus,
}

/// 詰みスコア。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MateScore {
    /// 手数つき。負値は手番側が詰まされる。
    Plies(i32),
    /// 手数不明。`mate +` / `mate -` は符号つき、それ以外の解釈できない値は `None`。
    ///
    /// 後者は名目上の書式から外れたエンジン出力を受け入れるための寛容な扱いで、
    /// 勝ち負けの向きは推測しない。
    Unknown(Option<MateSign>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Score {
    Cp { value: i32, bound: ScoreBound },
    Mate { mate: MateScore, bound: ScoreBound },
}

/// 1 行分の `info` を復号した結果。
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct InfoReport {
    /// エンジンによっては `12/30` のような接尾辞をつけるので文字列で保持する。
    pub depth: Option<String>,
    pub seldepth: Option<String>,
    pub time_ms: Option<u64>,
    pub nodes: Option<u64>,
    pub nps: Option<u64>,
    /// 置換表使用率（%）。USI の hashfull は千分率なので 10 で割った値。
    pub hashfull_percent: Option<f64>,
    pub currmove: Option<String>,
    pub multipv: Option<u32>,
    pub score: Option<Score>,
    pub pv: Vec<String>,
    /// 解釈できなかったトークンを空白区切りで連結したもの。
    pub suffix: Option<String>,
    /// `string` 以降の生テキスト。
    pub string: Option<String>,
}

impl InfoReport {
    /// MultiPV の第 1 候補（または MultiPV 指定なし）なら true。
    pub fn is_primary(&self) -> bool {
        self.multipv.is_none_or(|n| n <= 1)
    }
}

fn tokenize(line: &str) -> Vec<(usize, &str)> {
    let mut out = Vec::new();
    let mut start = None;
    for (idx, ch) in line.char_indices() {
        if ch.is_whitespace() {
            if let Some(s) = start.take() {
                out.push((s, &line[s..idx]));
            }
        } else if start.is_none() {
            start = Some(idx);
        }
    }
    if let Some(s) = start {
        out.push((s, &line[s..]));
    }
    out
}

/// `idx` 番目のトークンがキーワードでなければ値として返す。
fn value_token<'a>(tokens: &[(usize, &'a str)], idx: usize) -> Option<&'a str> {
    tokens.get(idx).map(|t| t.1).filter(|t| !KEYWORDS.contains(t))
}

fn parse_mate_value(token: Option<&str>) -> MateScore {
    match token {
        Some("+") => MateScore::Unknown(Some(MateSign::Plus)),
        Some("-") => MateScore::Unknown(Some(MateSign::Minus)),
        Some(t) => t.parse::<i32>().map(MateScore::Plies).unwrap_or(MateScore::Unknown(None)),
        None => MateScore::Unknown(None),
    }
}

/// `info ...` を解析する。
///
/// 1 つのフィールドが壊れていても行全体は捨てず、読めなかったトークンは
/// `suffix` に回す。`string` が現れたら残りをすべて取り込んで終了する。
pub fn parse_info(line: &str) -> Result<InfoReport, ParseError> {
    let tokens = tokenize(line);
    if tokens.first().map(|t| t.1) != Some("info") {
        return Err(ParseError::malformed("info", line));
    }

    let value_at = |idx: usize| value_token(&tokens, idx);

    let mut report = InfoReport::default();
    let mut suffix: Vec<&str> = Vec::new();
    let mut i = 1;
    while i < tokens.len() {
        let (offset, key) = tokens[i];
        match key {
            "string" => {
                report.string = Some(line[offset + key.len()..].trim().to_string());
                break;
            }
            "depth" | "seldepth" | "currmove" => {
                if let Some(v) = value_at(i + 1) {
                    let v = Some(v.to_string());
                    match key {
                        "depth" => report.depth = v,
                        "seldepth" => report.seldepth = v,
                        _ => report.currmove = v,
                    }
                    i += 1;
                }
            }
            "time" | "nodes" | "nps" => {
                if let Some(v) = value_at(i + 1) {
                    match v.parse::<u64>() {
                        Ok(n) => match key {
                            "time" => report.time_ms = Some(n),
                            "nodes" => report.nodes = Some(n),
                            _ => report.nps = Some(n),
                        },
                        Err(_) => suffix.push(v),
                    }
                    i += 1;
                }
            }
            "hashfull" => {
                if let Some(v) = value_at(i + 1) {
                    match v.parse::<u32>() {
                        Ok(permille) => report.hashfull_percent = Some(f64::from(permille) / 10.0),
                        Err(_) => suffix.push(v),
                    }
                    i += 1;
                }
            }
            "multipv" => {
                if let Some(v) = value_at(i + 1) {
                    match v.parse::<u32>() {
                        Ok(n) => report.multipv = Some(n),
                        Err(_) => suffix.push(v),
                    }
                    i += 1;
                }
            }
            "score" => {
                let kind = tokens.get(i + 1).map(|t| t.1);
                let (score, consumed) = match kind {
                    Some("cp") => match value_at(i + 2).and_then(|v| v.parse::<i32>().ok()) {
                        Some(value) => (
                            Some(Score::Cp {
                                value,
                                bound: ScoreBound::Exact,
                            }),
                            3,
                        ),
                        None => (None, 2),
                    },
                    Some("mate") => {
                        let raw = value_at(i + 2);
                        let consumed = if raw.is_some() { 3 } else { 2 };
                        (
                            Some(Score::Mate {
                                mate: parse_mate_value(raw),
                                bound: ScoreBound::Exact,
                            }),
                            consumed,
                        )
                    }
                    _ => (None, 1),
                };
                if score.is_none() {
                    suffix.extend(tokens[i..i + consumed].iter().map(|t| t.1));
                }
                i += consumed;
                let bound = match tokens.get(i).map(|t| t.1) {
                    Some("upperbound") => Some(ScoreBound::Upper),
                    Some("lowerbound") => Some(ScoreBound::Lower),
                    _ => None,
                };
                if bound.is_some() {
                    i += 1;
                }
                report.score = score.map(|s| match (s, bound) {
                    (Score::Cp { value, .. }, Some(b)) => Score::Cp { value, bound: b },
                    (Score::Mate { mate, .. }, Some(b)) => Score::Mate { mate, bound: b },
                    (s, None) => s,
                });
                continue;
            }
            "pv" => {
                let mut j = i + 1;
                while let Some(&(_, tok)) = tokens.get(j) {
                    if is_usi_move(tok) {
                        report.pv.push(tok.to_string());
                        j += 1;
                    } else if is_pv_sentinel(tok) {
                        report.pv.push(tok.to_string());
                        j += 1;
                        break;
                    } else {
                        break;
                    }
                }
                i = j;
                continue;
            }
            other => suffix.push(other),
        }
        i += 1;
    }

    if !suffix.is_empty() {
        report.suffix = Some(suffix.join(" "));
    }
    Ok(report)
}
