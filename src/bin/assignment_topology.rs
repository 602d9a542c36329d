//! 作业拓扑
//!
//! A-G 七台主机、R1-R4 四台路由器；主机 A 向主机 E 的 echo 服务器发请求，
//! 运行结束后打印每条流的统计。

use clap::Parser;
use netsim_rs::net::Route;
use netsim_rs::topo::{AssignmentOpts, build_assignment_runner};
use tracing::info;

#[derive(Debug, Parser)]
#[command(name = "assignment-topology", about = "A-G / R1-R4 echo topology with flow statistics")]
struct Args {
    /// 使用实验课版本（低速链路、无误码）
    #[arg(long)]
    lab: bool,

    /// 误码模型种子
    #[arg(long, default_value_t = 1)]
    seed: u64,

    /// 覆盖所有链路的错误率
    #[arg(long)]
    error_rate: Option<f64>,

    /// 打印 A 到 E 的路由路径
    #[arg(long)]
    show_route: bool,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_file(true)
        .with_line_number(true)
        .with_target(true)
        .init();

    let args = Args::parse();
    let mut opts = if args.lab {
        AssignmentOpts::lab()
    } else {
        AssignmentOpts::default()
    };
    if let Some(r) = args.error_rate {
        opts.error_rate = r;
    }

    let (mut runner, apps) = build_assignment_runner(&opts, args.seed).expect("build topology");
    info!(
        client = %apps.client_node,
        server = %apps.server_node,
        server_addr = %apps.server_addr,
        port = opts.server_port,
        "作业拓扑构建完成"
    );

    if args.show_route {
        let net = runner.net();
        let topo = net.topology();
        let path = net
            .routes()
            .path(apps.client_node, apps.server_node)
            .unwrap_or_default();
        let names: Vec<&str> = path
            .iter()
            .filter_map(|&n| topo.node(n).map(|node| node.name()))
            .collect();
        println!("route A -> E: {}", names.join(" -> "));
        if let Route::Via { cost, .. } = net.routes().route(apps.client_node, apps.server_node) {
            println!("route cost: {cost:?}");
        }
    }

    runner.run().expect("run");
    let report = runner.report().expect("flow report");
    print!("{report}");
}
