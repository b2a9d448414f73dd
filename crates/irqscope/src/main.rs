//! irqscope - interrupt activity and CPU affinity inspector.
//!
//! Subcommands:
//! - `irqwatch` - periodically sample interrupt (or softirq) counters
//! - `irqaff` - list which CPUs every IRQ or softirq may run on
//! - `cpuaff` - list thread affinities of processes
//! - `cpulist` - expand a CPU list into one id per line

use std::error::Error;
use std::io::{self, Read, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use clap::{Args as ClapArgs, Parser, Subcommand};
use serde::Serialize;
use tracing::{Level, debug, error, info, warn};
use tracing_subscriber::EnvFilter;

use irqscope_core::collector::{
    IrqCollector, IrqInfo, PidInfo, ProcCollector, RealFs, SoftirqCollector, SoftirqInfo,
    SysCollector,
};
use irqscope_core::cpuset::CpuSet;
use irqscope_core::error::CollectError;
use irqscope_core::fmt::format_elapsed;
use irqscope_core::report::{OutputFormat, Reporter};
use irqscope_core::util::parse_duration;
use irqscope_core::watch::{StatsSource, WatchConfig, Watcher};

/// Selector used when neither `-C` nor sysfs tells us which CPUs exist.
const FALLBACK_CPULIST: &str = "0-16383";

type CmdResult = Result<(), Box<dyn Error>>;

/// Interrupt activity and CPU affinity inspector.
#[derive(Parser)]
#[command(name = "irqscope", about = "Interrupt activity and CPU affinity inspector", version = irqscope_core::VERSION)]
struct Args {
    /// CPUs to report on (e.g. "0-3,8"). Defaults to the online CPUs.
    #[arg(short = 'C', long, global = true, value_parser = parse_cpulist)]
    cpulist: Option<CpuSet>,

    /// Path to the proc filesystem.
    #[arg(short = 'P', long, global = true, default_value = "/proc")]
    procfs: String,

    /// Path to the sys filesystem.
    #[arg(short = 'S', long, global = true, default_value = "/sys")]
    sysfs: String,

    /// Output as JSON.
    #[arg(short = 'J', long, global = true)]
    json: bool,

    /// Enable debug logging.
    #[arg(short = 'D', long, global = true)]
    debug: bool,

    /// Quiet mode - only show errors.
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Watch interrupt counters and report per-CPU activity.
    Irqwatch(IrqwatchArgs),
    /// Show the CPUs IRQs and softirqs can run on.
    Irqaff(IrqaffArgs),
    /// Show the CPUs process threads can run on.
    Cpuaff(CpuaffArgs),
    /// Expand a CPU list, one CPU per line.
    Cpulist(CpulistArgs),
}

#[derive(ClapArgs)]
struct IrqwatchArgs {
    /// Sampling period (e.g. "500ms", "3s", "1m30s").
    #[arg(short = 'W', long, default_value = "1s", value_parser = parse_period)]
    period: Duration,

    /// Number of samples to take; negative runs until interrupted.
    #[arg(short = 'T', long, default_value_t = -1, allow_negative_numbers = true)]
    times: i64,

    /// Output level: 0 silent, 1 summary only, 2 every sample.
    #[arg(short, long, default_value_t = 1)]
    verbose: u8,

    /// Watch softirq counters instead of hardware interrupts.
    #[arg(short, long)]
    softirqs: bool,
}

#[derive(ClapArgs)]
struct IrqaffArgs {
    /// Use the effective affinity instead of the allowed one.
    #[arg(short = 'E', long)]
    effective: bool,

    /// Show softirqs instead of hardware IRQs.
    #[arg(short, long)]
    softirqs: bool,

    /// Also show IRQs without a source label.
    #[arg(short = 'e', long)]
    show_empty_source: bool,
}

#[derive(ClapArgs)]
struct CpuaffArgs {
    /// Only this process. Defaults to every process.
    #[arg(short, long)]
    pid: Option<u32>,
}

#[derive(ClapArgs)]
struct CpulistArgs {
    /// CPU list text to expand.
    #[arg(short = 'c', long, conflicts_with = "file")]
    cpus: Option<String>,

    /// Read the CPU list from a file ("-" for stdin).
    #[arg(short, long)]
    file: Option<PathBuf>,
}

fn parse_cpulist(s: &str) -> Result<CpuSet, String> {
    CpuSet::parse(s).map_err(|e| format!("invalid cpu list '{}': {}", s, e))
}

fn parse_period(s: &str) -> Result<Duration, String> {
    let period = parse_duration(s).map_err(|e| format!("invalid period '{}': {}", s, e))?;
    if period.is_zero() {
        return Err("period must be positive".to_string());
    }
    Ok(period)
}

/// Initializes the tracing subscriber on stderr.
/// Default level is WARN; -D raises it to DEBUG, -q lowers it to ERROR.
fn init_logging(debug: bool, quiet: bool) {
    let level = if quiet {
        Level::ERROR
    } else if debug {
        Level::DEBUG
    } else {
        Level::WARN
    };

    let mut filter = EnvFilter::from_default_env();
    for target in ["irqscope", "irqscope_core"] {
        if let Ok(directive) = format!("{}={}", target, level).parse() {
            filter = filter.add_directive(directive);
        }
    }

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();
}

/// Resolves the CPU selector: `-C`, then sysfs, then everything.
fn selected_cpus(args: &Args) -> CpuSet {
    if let Some(cpus) = &args.cpulist {
        return cpus.clone();
    }
    match SysCollector::new(RealFs::new(), &args.sysfs).online_cpus() {
        Ok(cpus) => cpus,
        Err(e) => {
            warn!("Cannot read online CPUs ({}), using {}", e, FALLBACK_CPULIST);
            CpuSet::parse(FALLBACK_CPULIST).unwrap_or_default()
        }
    }
}

fn output_format(args: &Args) -> OutputFormat {
    if args.json {
        OutputFormat::Json
    } else {
        OutputFormat::Text
    }
}

fn print_json<T: Serialize>(value: &T) -> CmdResult {
    let mut out = io::stdout().lock();
    serde_json::to_writer(&mut out, value)?;
    writeln!(out)?;
    Ok(())
}

fn main() {
    let args = Args::parse();
    init_logging(args.debug, args.quiet);

    debug!(
        "irqscope {}: procfs={}, sysfs={}",
        irqscope_core::VERSION,
        args.procfs,
        args.sysfs
    );

    let result = match &args.command {
        Command::Irqwatch(cmd) => run_irqwatch(&args, cmd),
        Command::Irqaff(cmd) => run_irqaff(&args, cmd),
        Command::Cpuaff(cmd) => run_cpuaff(&args, cmd),
        Command::Cpulist(cmd) => run_cpulist(&args, cmd),
    };

    if let Err(e) = result {
        error!("{}", e);
        std::process::exit(1);
    }
}

// ── irqwatch ─────────────────────────────────────────────────────────────────

fn run_irqwatch(args: &Args, cmd: &IrqwatchArgs) -> CmdResult {
    let cpus = selected_cpus(args);
    let config = WatchConfig {
        period: cmd.period,
        max_ticks: cmd.times,
    };

    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        info!("Received shutdown signal");
        r.store(false, Ordering::SeqCst);
    }) {
        warn!("Failed to set Ctrl-C handler: {}", e);
    }

    info!(
        "Watching {} on cpus {} every {}",
        if cmd.softirqs { "softirqs" } else { "interrupts" },
        cpus,
        format_elapsed(cmd.period)
    );

    let mut reporter = Reporter::new(output_format(args), cmd.verbose, cpus, io::stdout().lock());
    if cmd.softirqs {
        let collector = SoftirqCollector::new(RealFs::new(), &args.procfs);
        watch(collector, config, &mut reporter, &running)
    } else {
        let collector = IrqCollector::new(RealFs::new(), &args.procfs);
        watch(collector, config, &mut reporter, &running)
    }
}

fn watch<S: StatsSource, W: Write>(
    source: S,
    config: WatchConfig,
    reporter: &mut Reporter<W>,
    running: &AtomicBool,
) -> CmdResult {
    let outcome = Watcher::new(source, config).run(reporter, running)?;
    debug!(
        "Watch finished: {} samples in {}{}",
        outcome.ticks,
        format_elapsed(outcome.elapsed),
        if outcome.cancelled { " (interrupted)" } else { "" }
    );
    Ok(())
}

// ── irqaff ───────────────────────────────────────────────────────────────────

#[derive(Serialize)]
struct SoftirqUsage<'a> {
    name: &'a str,
    cpus: CpuSet,
}

fn run_irqaff(args: &Args, cmd: &IrqaffArgs) -> CmdResult {
    let cpus = selected_cpus(args);
    if cmd.softirqs {
        show_softirqs(args, &cpus)
    } else {
        show_irqs(args, cmd, &cpus)
    }
}

fn show_softirqs(args: &Args, cpus: &CpuSet) -> CmdResult {
    let info = SoftirqCollector::new(RealFs::new(), &args.procfs).read_info()?;
    let usage = softirq_usage(&info, cpus);

    if args.json {
        return print_json(&usage);
    }
    let mut out = io::stdout().lock();
    for entry in &usage {
        writeln!(out, "{:>8} = {}", entry.name, entry.cpus)?;
    }
    Ok(())
}

fn softirq_usage<'a>(info: &'a SoftirqInfo, cpus: &CpuSet) -> Vec<SoftirqUsage<'a>> {
    info.display_names()
        .into_iter()
        .map(|name| SoftirqUsage {
            name,
            cpus: info.used_cpus(name).intersection(cpus),
        })
        .collect()
}

fn show_irqs(args: &Args, cmd: &IrqaffArgs, cpus: &CpuSet) -> CmdResult {
    let shown = irq_listing(&args.procfs, cmd, cpus)?;

    if args.json {
        return print_json(&shown);
    }
    let mut out = io::stdout().lock();
    for info in &shown {
        let on = match (&info.effective_cpus, cmd.effective) {
            (Some(effective), true) => effective,
            _ => &info.cpus,
        };
        writeln!(
            out,
            "IRQ {:3} [{:>24}]: can run on {}",
            info.irq, info.source, on
        )?;
    }
    Ok(())
}

/// IRQs that can run on `cpus`, with both affinity sets narrowed to them.
fn irq_listing(
    procfs: &str,
    cmd: &IrqaffArgs,
    cpus: &CpuSet,
) -> Result<Vec<IrqInfo>, CollectError> {
    let infos = IrqCollector::new(RealFs::new(), procfs).read_info(cmd.effective)?;
    let shown: Vec<IrqInfo> = infos
        .iter()
        .filter(|info| cmd.show_empty_source || !info.source.is_empty())
        .filter_map(|info| info.restrict_to(cpus, cmd.effective))
        .collect();
    debug!("{} of {} IRQs match cpus {}", shown.len(), infos.len(), cpus);
    Ok(shown)
}

// ── cpuaff ───────────────────────────────────────────────────────────────────

fn run_cpuaff(args: &Args, cmd: &CpuaffArgs) -> CmdResult {
    let cpus = selected_cpus(args);
    let collector = ProcCollector::new(RealFs::new(), &args.procfs);

    let procs: Vec<PidInfo> = match cmd.pid {
        Some(pid) => vec![collector.read_pid(pid)?],
        None => collector.list_all()?.into_values().collect(),
    };

    let shown: Vec<PidInfo> = procs
        .into_iter()
        .filter_map(|mut info| {
            info.tids.retain(|_, tid| {
                tid.affinity = tid.affinity.intersection(&cpus);
                !tid.affinity.is_empty()
            });
            (!info.tids.is_empty()).then_some(info)
        })
        .collect();

    if args.json {
        return print_json(&shown);
    }
    let mut out = io::stdout().lock();
    for info in &shown {
        for tid in info.tids.values() {
            writeln!(
                out,
                "PID {:>7} TID {:>7} [{:>16}]: can run on {}",
                info.pid, tid.tid, tid.name, tid.affinity
            )?;
        }
    }
    Ok(())
}

// ── cpulist ──────────────────────────────────────────────────────────────────

fn run_cpulist(args: &Args, cmd: &CpulistArgs) -> CmdResult {
    let cpus = match (&cmd.cpus, &cmd.file) {
        (Some(text), _) => CpuSet::parse(text)?,
        (None, Some(path)) => {
            let text = if path.as_os_str() == "-" {
                let mut buf = String::new();
                io::stdin().read_to_string(&mut buf)?;
                buf
            } else {
                std::fs::read_to_string(path)
                    .map_err(|e| format!("failed to read {}: {}", path.display(), e))?
            };
            CpuSet::parse(&text)?
        }
        (None, None) => ProcCollector::new(RealFs::new(), &args.procfs)
            .read_self()?
            .affinity(),
    };

    if args.json {
        return print_json(&cpus.to_vec());
    }
    let mut out = io::stdout().lock();
    for cpu in cpus.iter() {
        writeln!(out, "{}", cpu)?;
    }
    Ok(())
}
