//! 场景运行器
//!
//! 从 JSON 场景文件或内置预设构建网络、安装 echo 应用，运行后打印流统计。

use clap::{Parser, ValueEnum};
use netsim_rs::app::EchoClientConfig;
use netsim_rs::error::ConfigError;
use netsim_rs::net::{DataRate, NetConfig};
use netsim_rs::runner::SimRunner;
use netsim_rs::scenario::ScenarioSpec;
use netsim_rs::sim::SimTime;
use netsim_rs::topo::{AssignmentOpts, ChainOpts, build_assignment_runner, build_chain};
use netsim_rs::viz::VizLogger;
use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Preset {
    /// 主机 A-G、路由器 R1-R4，A 向 E 发 120 个 256 字节请求
    Assignment,
    /// 作业拓扑的低速版本，10 个 1024 字节请求
    Lab,
    /// client - r1 - r2 - server，1Mbps 链路
    Chain,
}

#[derive(Debug, Parser)]
#[command(name = "netsim", about = "Run a discrete-event echo scenario and print per-flow statistics")]
struct Args {
    /// Path to scenario.json
    #[arg(long, conflicts_with = "preset")]
    scenario: Option<PathBuf>,

    /// Built-in scenario (used when --scenario is absent)
    #[arg(long, value_enum, default_value_t = Preset::Assignment)]
    preset: Preset,

    /// Override the error model seed
    #[arg(long)]
    seed: Option<u64>,

    /// Override the stop time (seconds)
    #[arg(long)]
    stop_s: Option<f64>,

    /// Override every link's error rate (presets only)
    #[arg(long)]
    error_rate: Option<f64>,

    /// Write the flow report as JSON
    #[arg(long)]
    report_json: Option<PathBuf>,

    /// Output viz JSON file
    #[arg(long)]
    viz_json: Option<PathBuf>,
}

fn build_chain_preset(seed: u64, error_rate: f64) -> Result<SimRunner, ConfigError> {
    let (topo, client, server) = build_chain(&ChainOpts {
        routers: 2,
        rate: DataRate::mbps(1),
        error_rate,
        ..ChainOpts::default()
    })?;
    let remote = topo
        .addr_of(server)
        .ok_or_else(|| ConfigError::UnknownNode(server.to_string()))?;
    let mut runner = SimRunner::new(
        topo,
        NetConfig {
            seed,
            ..NetConfig::default()
        },
    );
    let (sim, net) = runner.parts_mut();
    net.install_echo_server(server, 9, sim, SimTime::from_secs(1), None)?;
    let cfg = EchoClientConfig::new(remote, 9)
        .with_max_packets(10)
        .with_interval(SimTime::from_secs(1))
        .with_packet_size(1024);
    net.install_echo_client(client, cfg, sim, SimTime::from_secs(2), None)?;
    runner.configure(seed, SimTime::from_secs(30));
    Ok(runner)
}

fn build_runner(args: &Args) -> Result<SimRunner, ConfigError> {
    let stop = args.stop_s.map(SimTime::try_from_secs_f64).transpose()?;

    if let Some(path) = &args.scenario {
        let raw = fs::read_to_string(path)
            .map_err(|e| ConfigError::InvalidScenario(format!("{}: {e}", path.display())))?;
        let mut spec: ScenarioSpec = serde_json::from_str(&raw)
            .map_err(|e| ConfigError::InvalidScenario(format!("{}: {e}", path.display())))?;
        if let Some(seed) = args.seed {
            spec.seed = seed;
        }
        if stop.is_some() {
            spec.stop_time = stop;
        }
        return spec.build();
    }

    let seed = args.seed.unwrap_or(1);
    let mut runner = match args.preset {
        Preset::Assignment | Preset::Lab => {
            let mut opts = if args.preset == Preset::Lab {
                AssignmentOpts::lab()
            } else {
                AssignmentOpts::default()
            };
            if let Some(r) = args.error_rate {
                opts.error_rate = r;
            }
            build_assignment_runner(&opts, seed)?.0
        }
        Preset::Chain => build_chain_preset(seed, args.error_rate.unwrap_or(0.0))?,
    };
    if let Some(stop) = stop {
        runner.configure(seed, stop);
    }
    Ok(runner)
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .with_file(true)
        .with_line_number(true)
        .with_target(true)
        .init();

    let args = Args::parse();
    let mut runner = match build_runner(&args) {
        Ok(r) => r,
        Err(e) => {
            error!(%e, "❌ 场景配置无效");
            eprintln!("error: {e}");
            return ExitCode::from(2);
        }
    };
    if args.viz_json.is_some() {
        runner.net_mut().viz = Some(VizLogger::default());
    }

    if let Err(e) = runner.run() {
        eprintln!("error: {e}");
        return ExitCode::FAILURE;
    }
    let report = match runner.report() {
        Ok(r) => r,
        Err(e) => {
            eprintln!("error: {e}");
            return ExitCode::FAILURE;
        }
    };
    print!("{report}");
    info!(
        flows = report.len(),
        tx = report.total_tx(),
        rx = report.total_rx(),
        lost = report.total_lost(),
        "📊 流统计完成"
    );

    if let Some(path) = &args.report_json {
        let json = serde_json::to_string_pretty(&report).expect("serialize flow report");
        fs::write(path, json).expect("write report json");
        eprintln!("wrote flow report to {}", path.display());
    }
    if let Some(path) = &args.viz_json {
        if let Some(v) = runner.net_mut().viz.take() {
            let json = serde_json::to_string_pretty(&v.events).expect("serialize viz events");
            fs::write(path, json).expect("write viz json");
            eprintln!("wrote viz events to {}", path.display());
        }
    }
    ExitCode::SUCCESS
}
