//! USI engine options
//!
//! エンジンが `usi` への応答として宣言する `option` 行と、GUI から送る
//! `setoption` 行を扱う。

use std::fmt;
use std::iter::Peekable;

use serde::Serialize;

use crate::error::{OptionError, ParseError};

/// `option` 行の中でオプション名・値の終端になる予約語。
const RESERVED: [&str; 5] = ["type", "default", "min", "max", "var"];

/// USI で空文字列を表すトークン。
const EMPTY_TOKEN: &str = "<empty>";

/// Engine option types
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum OptionKind {
    /// Checkbox option
    Check { default: Option<bool> },

    /// Spin (numeric) option
    Spin { default: Option<i64>, min: i64, max: i64 },

    /// Combo (dropdown) option
    Combo {
        default: Option<String>,
        vars: Vec<String>,
    },

    /// Button option (action trigger)
    Button,

    /// Free text option
    String { default: Option<String> },

    /// Filename option
    Filename { default: Option<String> },
}

impl OptionKind {
    fn type_name(&self) -> &'static str {
        match self {
            OptionKind::Check { .. } => "check",
            OptionKind::Spin { .. } => "spin",
            OptionKind::Combo { .. } => "combo",
            OptionKind::Button => "button",
            OptionKind::String { .. } => "string",
            OptionKind::Filename { .. } => "filename",
        }
    }

    /// 既定値を `setoption` に載せる文字列表現で返す。
    fn default_text(&self) -> Option<String> {
        match self {
            OptionKind::Check { default } => default.map(|b| b.to_string()),
            OptionKind::Spin { default, .. } => default.map(|v| v.to_string()),
            OptionKind::Combo { default, .. }
            | OptionKind::String { default }
            | OptionKind::Filename { default } => default.clone(),
            OptionKind::Button => None,
        }
    }
}

/// エンジンが宣言したオプション 1 件。`current` は GUI が最後に設定した値。
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EngineOption {
    pub name: String,
    pub kind: OptionKind,
    pub current: Option<String>,
}

impl EngineOption {
    pub fn new(name: impl Into<String>, kind: OptionKind) -> Self {
        let current = kind.default_text();
        Self {
            name: name.into(),
            kind,
            current,
        }
    }

    /// 値を検証し、送信用に正規化した文字列を返す。
    pub fn validate(&self, value: &str) -> Result<String, OptionError> {
        let invalid = || OptionError::InvalidValue {
            name: self.name.clone(),
            value: value.to_string(),
        };
        match &self.kind {
            OptionKind::Check { .. } => match value.to_ascii_lowercase().as_str() {
                "true" => Ok("true".to_string()),
                "false" => Ok("false".to_string()),
                _ => Err(invalid()),
            },
            OptionKind::Spin { min, max, .. } => {
                let v: i64 = value.trim().parse().map_err(|_| invalid())?;
                if v < *min || v > *max {
                    return Err(OptionError::OutOfRange {
                        name: self.name.clone(),
                        value: v,
                        min: *min,
                        max: *max,
                    });
                }
                Ok(v.to_string())
            }
            OptionKind::Combo { vars, .. } => {
                if vars.is_empty() || vars.iter().any(|v| v == value) {
                    Ok(value.to_string())
                } else {
                    Err(invalid())
                }
            }
            OptionKind::Button => Ok(String::new()),
            OptionKind::String { .. } | OptionKind::Filename { .. } => {
                if value.contains(['\n', '\r']) {
                    Err(invalid())
                } else {
                    Ok(value.to_string())
                }
            }
        }
    }

    /// `setoption` 行を組み立てる。button 型は値を付けない。
    pub fn setoption_command(&self, value: Option<&str>) -> String {
        match self.kind {
            OptionKind::Button => setoption_line(&self.name, None),
            _ => setoption_line(&self.name, value),
        }
    }
}

impl fmt::Display for EngineOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "option name {} type {}", self.name, self.kind.type_name())?;
        match &self.kind {
            OptionKind::Check { default } => {
                if let Some(d) = default {
                    write!(f, " default {d}")?;
                }
            }
            OptionKind::Spin { default, min, max } => {
                if let Some(d) = default {
                    write!(f, " default {d}")?;
                }
                write!(f, " min {min} max {max}")?;
            }
            OptionKind::Combo { default, vars } => {
                if let Some(d) = default {
                    write!(f, " default {}", text_or_empty(d))?;
                }
                for v in vars {
                    write!(f, " var {v}")?;
                }
            }
            OptionKind::Button => {}
            OptionKind::String { default } | OptionKind::Filename { default } => {
                if let Some(d) = default {
                    write!(f, " default {}", text_or_empty(d))?;
                }
            }
        }
        Ok(())
    }
}

fn text_or_empty(s: &str) -> &str {
    if s.is_empty() { EMPTY_TOKEN } else { s }
}

fn take_until_keyword<'a, I>(tokens: &mut Peekable<I>) -> String
where
    I: Iterator<Item = &'a str>,
{
    let mut parts = Vec::new();
    while let Some(next) = tokens.peek() {
        if RESERVED.contains(next) {
            break;
        }
        if let Some(tok) = tokens.next() {
            parts.push(tok);
        }
    }
    let joined = parts.join(" ");
    if joined == EMPTY_TOKEN { String::new() } else { joined }
}

/// `option name <name> type <kind> [default ..] [min ..] [max ..] [var ..]*` を解析する。
///
/// オプション名は空白を含みうるため、次の予約語が現れるまでを名前とみなす。
pub fn parse_option_line(line: &str) -> Result<EngineOption, ParseError> {
    let mut tokens = line.split_whitespace().peekable();
    if tokens.next() != Some("option") || tokens.next() != Some("name") {
        return Err(ParseError::malformed("option", line));
    }
    let name = take_until_keyword(&mut tokens);
    if name.is_empty() {
        return Err(ParseError::malformed("option", line));
    }

    let mut kind_name: Option<&str> = None;
    let mut default: Option<String> = None;
    let mut min: Option<i64> = None;
    let mut max: Option<i64> = None;
    let mut vars = Vec::new();

    while let Some(key) = tokens.next() {
        match key {
            "type" => {
                kind_name = Some(tokens.next().ok_or_else(|| ParseError::malformed("option", line))?);
            }
            "default" => default = Some(take_until_keyword(&mut tokens)),
            "min" | "max" => {
                let v = tokens
                    .next()
                    .and_then(|t| t.parse::<i64>().ok())
                    .ok_or_else(|| ParseError::malformed("option", line))?;
                if key == "min" {
                    min = Some(v);
                } else {
                    max = Some(v);
                }
            }
            "var" => vars.push(take_until_keyword(&mut tokens)),
            _ => return Err(ParseError::malformed("option", line)),
        }
    }

    let kind = match kind_name {
        Some("check") => {
            let default = match default.as_deref() {
                None => None,
                Some("true") => Some(true),
                Some("false") => Some(false),
                Some(_) => return Err(ParseError::malformed("option", line)),
            };
            OptionKind::Check { default }
        }
        Some("spin") => {
            let default = match default {
                None => None,
                Some(d) => {
                    Some(d.parse::<i64>().map_err(|_| ParseError::malformed("option", line))?)
                }
            };
            OptionKind::Spin {
                default,
                min: min.unwrap_or(i64::MIN),
                max: max.unwrap_or(i64::MAX),
            }
        }
        Some("combo") => OptionKind::Combo { default, vars },
        Some("button") => OptionKind::Button,
        Some("string") => OptionKind::String { default },
        Some("filename") => OptionKind::Filename { default },
        Some(other) => {
            return Err(ParseError::UnknownOptionType {
                kind: other.to_string(),
                line: line.to_string(),
            });
        }
        None => return Err(ParseError::malformed("option", line)),
    };
    Ok(EngineOption::new(name, kind))
}

pub fn setoption_line(name: &str, value: Option<&str>) -> String {
    match value {
        Some(v) => format!("setoption name {name} value {}", text_or_empty(v)),
        None => format!("setoption name {name}"),
    }
}

/// `setoption name <name> [value <value>]` を (名前, 値) に分解する。
///
/// 名前は最初の `value` トークンで打ち切る。名前に `value` という語を含むオプションは
/// 正しく分解できないので、宣言が分かっている場合は [`OptionTable::parse_setoption`] を使う。
pub fn parse_setoption_line(line: &str) -> Result<(String, Option<String>), ParseError> {
    let parts: Vec<&str> = line.split_whitespace().collect();
    if parts.len() < 3 || parts[0] != "setoption" || parts[1] != "name" {
        return Err(ParseError::malformed("setoption", line));
    }
    let value_pos = parts.iter().position(|&p| p == "value");
    let name = match value_pos {
        Some(pos) => parts[2..pos].join(" "),
        None => parts[2..].join(" "),
    };
    if name.is_empty() {
        return Err(ParseError::malformed("setoption", line));
    }
    let value = value_pos.map(|pos| {
        let v = parts[pos + 1..].join(" ");
        if v == EMPTY_TOKEN { String::new() } else { v }
    });
    Ok((name, value))
}

fn setoption_value(parts: &[&str]) -> String {
    let v = parts.join(" ");
    if v == EMPTY_TOKEN { String::new() } else { v }
}

/// 宣言順を保った名前 → オプションの表。同名の再宣言はその位置で置き換える。
#[derive(Debug, Clone, Default)]
pub struct OptionTable {
    entries: Vec<EngineOption>,
}

impl OptionTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// 追加または置換する。置換した場合は true。
    pub fn upsert(&mut self, option: EngineOption) -> bool {
        match self.entries.iter_mut().find(|o| o.name == option.name) {
            Some(slot) => {
                *slot = option;
                true
            }
            None => {
                self.entries.push(option);
                false
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<&EngineOption> {
        self.entries.iter().find(|o| o.name == name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut EngineOption> {
        self.entries.iter_mut().find(|o| o.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = &EngineOption> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// 宣言済みの名前に照らして `setoption` 行を分解する。
    ///
    /// 名前に `value` を含むオプションでも、宣言と一致する区切り位置を選ぶ。
    /// 複数の区切りが宣言と一致するときは長い名前を優先する。
    /// どれとも一致しなければ [`parse_setoption_line`] と同じ結果になる。
    pub fn parse_setoption(&self, line: &str) -> Result<(String, Option<String>), ParseError> {
        let parsed = parse_setoption_line(line)?;
        let parts: Vec<&str> = line.split_whitespace().collect();
        let whole = parts[2..].join(" ");
        if self.contains(&whole) {
            return Ok((whole, None));
        }
        for pos in (3..parts.len()).rev().filter(|&i| parts[i] == "value") {
            let name = parts[2..pos].join(" ");
            if self.contains(&name) {
                return Ok((name, Some(setoption_value(&parts[pos + 1..]))));
            }
        }
        Ok(parsed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DECLARATIONS: &[&str] = &[
        "option name USI_Hash type spin default 256 min 1 max 1024",
        "option name USI_Ponder type check default true",
        "option name Book File type filename default book/standard.db",
        "option name EvalDir type string default <empty>",
        "option name Clear Hash type button",
        "option name Style type combo default Normal var Solid var Normal var Risky Play",
        "option name Depth Limit type spin default 0 min 0 max 2147483647",
        "option name Note type string",
    ];

    #[test]
    fn option_name_may_contain_spaces() {
        let opt = parse_option_line("option name Book File type filename default a b").unwrap();
        assert_eq!(opt.name, "Book File");
        assert_eq!(
            opt.kind,
            OptionKind::Filename {
                default: Some("a b".to_string())
            }
        );
        assert_eq!(opt.current.as_deref(), Some("a b"));
    }

    #[test]
    fn combo_vars_may_contain_spaces() {
        let opt = parse_option_line(DECLARATIONS[5]).unwrap();
        assert_eq!(
            opt.kind,
            OptionKind::Combo {
                default: Some("Normal".to_string()),
                vars: vec!["Solid".into(), "Normal".into(), "Risky Play".into()],
            }
        );
    }

    #[test]
    fn declaration_round_trips_through_display() {
        for line in DECLARATIONS {
            let parsed = parse_option_line(line).unwrap();
            let reparsed = parse_option_line(&parsed.to_string()).unwrap();
            assert_eq!(parsed, reparsed, "{line}");
        }
    }

    #[test]
    fn setoption_round_trips_current_value() {
        for line in DECLARATIONS {
            let parsed = parse_option_line(line).unwrap();
            let cmd = parsed.setoption_command(parsed.current.as_deref());
            let (name, value) = parse_setoption_line(&cmd).unwrap();
            assert_eq!(name, parsed.name);
            if parsed.kind == OptionKind::Button {
                assert_eq!(value, None);
            } else {
                assert_eq!(value, parsed.current, "{cmd}");
            }
        }
    }

    #[test]
    fn option_names_containing_value_round_trip_through_the_table() {
        let mut table = OptionTable::new();
        table.upsert(parse_option_line("option name Eval value Scale type spin default 100 min 0 max 200").unwrap());
        table.upsert(parse_option_line("option name Clear value Cache type button").unwrap());
        table.upsert(parse_option_line("option name Eval type string default a").unwrap());

        let scale = table.get("Eval value Scale").unwrap();
        let cmd = scale.setoption_command(Some("150"));
        assert_eq!(cmd, "setoption name Eval value Scale value 150");
        assert_eq!(
            table.parse_setoption(&cmd).unwrap(),
            ("Eval value Scale".to_string(), Some("150".to_string()))
        );
        // 表を使わない分解は最初の value で切る
        assert_eq!(
            parse_setoption_line(&cmd).unwrap(),
            ("Eval".to_string(), Some("Scale value 150".to_string()))
        );

        let button = table.get("Clear value Cache").unwrap();
        let cmd = button.setoption_command(None);
        assert_eq!(table.parse_setoption(&cmd).unwrap(), ("Clear value Cache".to_string(), None));

        assert_eq!(
            table.parse_setoption("setoption name Eval value <empty>").unwrap(),
            ("Eval".to_string(), Some(String::new()))
        );
    }

    #[test]
    fn malformed_declarations_are_rejected() {
        assert!(parse_option_line("option type spin").is_err());
        assert!(parse_option_line("option name X type spin default abc").is_err());
        assert!(parse_option_line("option name X type spin min").is_err());
        assert!(matches!(
            parse_option_line("option name X type slider"),
            Err(ParseError::UnknownOptionType { .. })
        ));
    }

    #[test]
    fn validate_checks_bounds_and_vars() {
        let spin = parse_option_line(DECLARATIONS[0]).unwrap();
        assert_eq!(spin.validate("512").unwrap(), "512");
        assert!(matches!(spin.validate("0"), Err(OptionError::OutOfRange { .. })));
        assert!(matches!(spin.validate("x"), Err(OptionError::InvalidValue { .. })));

        let check = parse_option_line(DECLARATIONS[1]).unwrap();
        assert_eq!(check.validate("FALSE").unwrap(), "false");

        let combo = parse_option_line(DECLARATIONS[5]).unwrap();
        assert!(combo.validate("Risky Play").is_ok());
        assert!(combo.validate("Aggressive").is_err());
    }

    #[test]
    fn redeclaration_replaces_in_place() {
        let mut table = OptionTable::new();
        table.upsert(parse_option_line("option name A type check default true").unwrap());
        table.upsert(parse_option_line("option name B type check default true").unwrap());
        let replaced =
            table.upsert(parse_option_line("option name A type spin default 3 min 0 max 9").unwrap());
        assert!(replaced);
        let names: Vec<&str> = table.iter().map(|o| o.name.as_str()).collect();
        assert_eq!(names, ["A", "B"]);
        assert!(matches!(table.get("A").unwrap().kind, OptionKind::Spin { .. }));
    }
}
