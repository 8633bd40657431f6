//! threadscope CLI - コマンドラインインターフェース
//!
//! メモリイメージ内のプロセスのスレッドを一覧表示します。

mod render;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use render::{render, RendererKind};
use std::io::{self, BufWriter};
use std::path::PathBuf;
use threadscope_core::parse::parse_pid_list;
use threadscope_core::{report, PidFilter, TreeGrid, THREAD_COLUMNS};
use threadscope_image::{KernelLayout, LinuxKernel};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// threadscope - Linux memory image thread lister
#[derive(Parser)]
#[command(name = "threadscope")]
#[command(version = "0.1.0")]
#[command(about = "Lists the threads of processes in a Linux memory image", long_about = None)]
struct Cli {
    /// Path to the raw memory image
    #[arg(short, long)]
    image: PathBuf,

    /// Kernel layout profile (TOML)
    #[arg(short, long)]
    profile: PathBuf,

    /// Filter on specific process IDs (repeatable, comma-separated)
    #[arg(long = "pid", value_name = "PID[,PID...]")]
    pids: Vec<String>,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = RendererKind::Quick)]
    renderer: RendererKind,

    /// Log level (overridden by RUST_LOG)
    #[arg(long, value_enum, default_value_t = LogLevel::Warn)]
    log_level: LogLevel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    fn as_directive(self) -> &'static str {
        match self {
            LogLevel::Off => "off",
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.log_level);
    run(cli)
}

/// ログ出力を初期化する（標準エラー出力へ）
fn setup_logging(level: LogLevel) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.as_directive()));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(true)
        .init();
}

/// プロファイルとイメージを読み込み、スレッド一覧を出力する
fn run(cli: Cli) -> Result<()> {
    let layout = KernelLayout::load(&cli.profile)
        .with_context(|| format!("Failed to load profile {}", cli.profile.display()))?;
    let kernel = LinuxKernel::open(&cli.image, layout)?;

    let filter = pid_filter(&cli.pids)?;
    if !filter.is_unrestricted() {
        info!("Restricting report to pids {:?}", cli.pids);
    }

    let grid = TreeGrid::new(&THREAD_COLUMNS, report(&kernel, filter));
    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    let count = render(cli.renderer, grid.columns(), grid, &mut out)?;

    info!("Reported {} threads", count);
    Ok(())
}

/// `--pid` 引数からフィルタを構築する
///
/// 引数が無ければすべてのプロセスを対象にします。
fn pid_filter(args: &[String]) -> Result<PidFilter> {
    let mut pids = Vec::new();
    for arg in args {
        pids.extend(parse_pid_list(arg)?);
    }
    Ok(PidFilter::from((!args.is_empty()).then_some(pids)))
}
