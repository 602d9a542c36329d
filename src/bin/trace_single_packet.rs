//! 单包追踪模式
//!
//! 在链式拓扑上只做一次 echo 往返，按时间顺序打印每个包的逐跳事件

use clap::Parser;
use netsim_rs::app::{EchoClient, EchoClientConfig};
use netsim_rs::net::{DataRate, NetConfig};
use netsim_rs::runner::SimRunner;
use netsim_rs::sim::SimTime;
use netsim_rs::topo::{ChainOpts, build_chain};
use netsim_rs::viz::{VizEventKind, VizLogger};
use tracing::{debug, info};

#[derive(Debug, Parser)]
#[command(name = "trace-single-packet", about = "单包追踪模式：只做一次 echo 往返，打印逐跳事件")]
struct Args {
    /// echo 负载字节数
    #[arg(long, default_value_t = 1024)]
    packet_size: u32,
    /// 中间路由器个数
    #[arg(long, default_value_t = 2)]
    routers: usize,
    #[arg(long, default_value_t = 10)]
    link_mbps: u64,
    /// 单向链路传播时延（微秒）
    #[arg(long, default_value_t = 1000)]
    link_latency_us: u64,
}

fn main() {
    // 初始化 tracing
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

    let opts = ChainOpts {
        routers: args.routers,
        rate: DataRate::mbps(args.link_mbps),
        delay: SimTime::from_micros(args.link_latency_us),
        ..ChainOpts::default()
    };
    let (topo, client, server) = build_chain(&opts).expect("build chain");
    let remote = topo.addr_of(server).expect("server address");
    info!(routers = args.routers, %remote, "构建链式拓扑: client -> r1 .. rN -> server");

    let mut runner = SimRunner::new(topo, NetConfig::default());
    runner.net_mut().viz = Some(VizLogger::default());
    let (sim, net) = runner.parts_mut();
    net.install_echo_server(server, 9, sim, SimTime::ZERO, None)
        .expect("install server");
    let cfg = EchoClientConfig::new(remote, 9).with_packet_size(args.packet_size);
    let cli = net
        .install_echo_client(client, cfg, sim, SimTime::ZERO, None)
        .expect("install client");

    info!("开始运行仿真直到所有事件完成");
    runner.run().expect("run");

    let events = runner
        .net()
        .viz
        .as_ref()
        .map(|v| v.events.as_slice())
        .unwrap_or_default();
    for ev in events {
        let Some(pkt_id) = ev.pkt_id else {
            continue;
        };
        let at = SimTime(ev.t_ns);
        match &ev.kind {
            VizEventKind::Send { src, dst, .. } => println!("[{at}] pkt {pkt_id} send {src} -> {dst}"),
            VizEventKind::Enqueue { link, q_len, .. } => {
                debug!(pkt_id, link, q_len, "入队");
            }
            VizEventKind::TxStart { link, arrive_ns, .. } => println!(
                "[{at}] pkt {pkt_id} tx on link {link}, arrives {}",
                SimTime(*arrive_ns)
            ),
            VizEventKind::Forward { node } => println!("[{at}] pkt {pkt_id} forward @ node {node}"),
            VizEventKind::Receive { node } => println!("[{at}] pkt {pkt_id} receive @ node {node}"),
            VizEventKind::Drop { node, reason } => {
                println!("[{at}] pkt {pkt_id} drop @ node {node} ({})", reason.as_str())
            }
            VizEventKind::Meta { .. } => {}
        }
    }

    let rtt = runner
        .net()
        .app::<EchoClient>(cli)
        .and_then(|c| c.rtts().first().copied());
    let st = runner.stats();
    println!(
        "done @ {}, rtt={}, delivered_pkts={}, delivered_bytes={}",
        runner.sim().now(),
        rtt.map(|t| t.to_string()).unwrap_or_else(|| "-".to_string()),
        st.delivered_pkts,
        st.delivered_bytes
    );
}
