//! USI エンジンを 1 本起動し、ハンドシェイク・オプション一覧・1 回の探索を確認するツール。
//!
//! # 使用例
//!
//! ```shell
//! cargo run -p rshogi-usi-client --release --bin usi-probe -- \
//!   --engine /opt/engines/YaneuraOu --option USI_Hash=256 --option Threads=2 \
//!   --moves 7g7f 3c3d --byoyomi 1000 --multipv 3
//! ```
use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::{Context, Result, bail};
use clap::Parser as _;
use serde::Serialize;

use rshogi_usi_client::protocol::{SFEN_HIRATE, position_command};
use rshogi_usi_client::session::HANDSHAKE_TIMEOUT;
use rshogi_usi_client::{
    EngineConfig, EngineSession, GoCommand, InfoReport, MateLimit, ProcessConnector,
    SearchResult, ThinkCoordinator, ThinkEvent, ThinkRequest, TimeExtra,
};

#[derive(clap::Parser, Debug)]
#[command(about = "start a USI engine, list its options and run one search")]
struct Cli {
    /// Engine binary path
    #[arg(long)]
    engine: PathBuf,

    /// Extra arguments passed to the engine
    #[arg(long = "arg", num_args = 1, allow_hyphen_values = true)]
    args: Vec<String>,

    /// Engine option sent after usiok (Name=Value). Can be repeated.
    #[arg(long = "option", num_args = 1)]
    options: Vec<String>,

    /// Root position (defaults to the standard start position)
    #[arg(long)]
    sfen: Option<String>,

    /// Moves from the root position in USI notation
    #[arg(long, num_args = 1..)]
    moves: Vec<String>,

    /// Byoyomi in milliseconds
    #[arg(long, conflicts_with_all = ["nodes", "depth", "mate"])]
    byoyomi: Option<u64>,

    /// Node limit
    #[arg(long, conflicts_with_all = ["depth", "mate"])]
    nodes: Option<u64>,

    /// Depth limit
    #[arg(long, conflicts_with = "mate")]
    depth: Option<u32>,

    /// Run `go mate <ms>` instead of a normal search
    #[arg(long)]
    mate: Option<u64>,

    /// Milliseconds before stopping an unbounded search
    #[arg(long, default_value_t = 3000)]
    think_ms: u64,

    #[arg(long)]
    multipv: Option<u32>,

    /// Print the declared options and exit
    #[arg(long, default_value_t = false)]
    list_options: bool,

    /// Print the result as JSON
    #[arg(long, default_value_t = false)]
    json: bool,
}

#[derive(Serialize)]
struct ProbeReport<'a> {
    engine: Option<&'a str>,
    author: Option<&'a str>,
    position: &'a str,
    go: String,
    elapsed_ms: u64,
    last_info: Option<&'a InfoReport>,
    result: Option<&'a SearchResult>,
}

fn parse_option_arg(raw: &str) -> Result<(String, String)> {
    let (name, value) = raw
        .split_once('=')
        .with_context(|| format!("--option expects Name=Value, got '{raw}'"))?;
    if name.trim().is_empty() {
        bail!("--option has an empty name: '{raw}'");
    }
    Ok((name.trim().to_string(), value.trim().to_string()))
}

fn go_command(cli: &Cli) -> GoCommand {
    if let Some(ms) = cli.mate {
        GoCommand::Mate(MateLimit::Millis(ms))
    } else if let Some(ms) = cli.byoyomi {
        GoCommand::Time {
            btime: 0,
            wtime: 0,
            extra: TimeExtra::Byoyomi(ms),
        }
    } else if let Some(n) = cli.nodes {
        GoCommand::Nodes(n)
    } else if let Some(d) = cli.depth {
        GoCommand::Depth(d)
    } else {
        GoCommand::Infinite
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Stderr)
        .init();

    let cli = Cli::parse();

    let mut config = EngineConfig::new(
        cli.engine
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "engine".to_string()),
        &cli.engine,
    );
    config.args = cli.args.clone();
    for raw in &cli.options {
        let (name, value) = parse_option_arg(raw)?;
        config.options.insert(name, toml::Value::String(value));
    }

    let mut session = EngineSession::new(config.name.clone());
    session
        .connect(&config, &ProcessConnector)
        .with_context(|| format!("failed to start {}", cli.engine.display()))?;
    session
        .wait_until_ready(HANDSHAKE_TIMEOUT)
        .context("engine handshake failed")?;
    log::info!(
        "connected: {} by {}",
        session.name().unwrap_or("(unnamed)"),
        session.author().unwrap_or("(unknown)")
    );

    if cli.list_options {
        for opt in session.options().iter() {
            println!("{opt}");
        }
        return Ok(());
    }

    let root = cli.sfen.as_deref().unwrap_or(SFEN_HIRATE);
    let position = position_command(root, &cli.moves);
    let go = go_command(&cli);
    let bounded = !matches!(go, GoCommand::Infinite);

    let mut think = ThinkCoordinator::new(session);
    if let Some(n) = cli.multipv {
        think.set_multipv(n);
    }
    think.session_mut().new_game()?;
    think.request_think(ThinkRequest {
        position: position.clone(),
        go,
        context: 1,
    })?;

    let start = Instant::now();
    let stop_after = Duration::from_millis(cli.think_ms);
    let mut last_info: Option<InfoReport> = None;
    let mut finished = false;
    while !finished {
        for ev in think.pump() {
            match ev {
                ThinkEvent::Info { report, .. } => {
                    if !cli.json {
                        if let Some(s) = &report.string {
                            log::info!("info string {s}");
                        }
                    }
                    if report.is_primary() && !report.pv.is_empty() {
                        last_info = Some(report);
                    }
                }
                ThinkEvent::Finished { .. } => finished = true,
                ThinkEvent::Fatal(e) => bail!("engine failed during search: {e}"),
            }
        }
        if !bounded && start.elapsed() >= stop_after {
            think.cancel();
        }
        std::thread::sleep(Duration::from_millis(5));
    }
    let elapsed_ms = start.elapsed().as_millis() as u64;
    let outcome = think.take_result();

    let session = think.session();
    let report = ProbeReport {
        engine: session.name(),
        author: session.author(),
        position: &position,
        go: go.to_string(),
        elapsed_ms,
        last_info: last_info.as_ref(),
        result: outcome.as_ref().map(|o| &o.result),
    };
    if cli.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        match report.result {
            Some(SearchResult::BestMove(bm)) => match &bm.ponder {
                Some(p) => println!("bestmove {} ponder {p} ({elapsed_ms} ms)", bm.usi()),
                None => println!("bestmove {} ({elapsed_ms} ms)", bm.usi()),
            },
            Some(SearchResult::Checkmate(r)) => println!("checkmate {r:?} ({elapsed_ms} ms)"),
            None => println!("no result"),
        }
        if let Some(info) = report.last_info {
            println!("pv {}", info.pv.join(" "));
        }
    }
    Ok(())
}
