use std::net::Ipv4Addr;

use crate::app::EchoClientConfig;
use crate::error::RunError;
use crate::flow::FlowId;
use crate::net::{DataRate, DropReason, LinkParams, NetConfig, NodeId, Topology};
use crate::runner::SimRunner;
use crate::sim::SimTime;
use crate::topo::{AssignmentOpts, ChainOpts, build_assignment_runner, build_chain};

/// client - r1 - r2 - server，1Mbps / 1ms；`middle_queue` 为 r1-r2 链路的队列容量
fn two_router_topology(middle_queue: usize) -> (Topology, NodeId, NodeId) {
    let mut topo = Topology::new();
    let client = topo.add_host("client");
    let r1 = topo.add_router("r1");
    let r2 = topo.add_router("r2");
    let server = topo.add_host("server");
    let params = LinkParams::new(DataRate::mbps(1), SimTime::from_millis(1));
    topo.add_link(client, r1, params.clone()).expect("link");
    topo.add_link(r1, r2, params.clone().with_queue(middle_queue))
        .expect("link");
    topo.add_link(r2, server, params).expect("link");
    (topo, client, server)
}

/// 服务器 1s 启动，客户端 2s 起每秒发 10 个 1024 字节请求，30s 停止
fn ten_request_runner(topo: Topology, client: NodeId, server: NodeId) -> (SimRunner, Ipv4Addr) {
    let remote = topo.addr_of(server).expect("server addr");
    let mut runner = SimRunner::new(topo, NetConfig::default());
    let (sim, net) = runner.parts_mut();
    net.install_echo_server(server, 9, sim, SimTime::from_secs(1), None)
        .expect("server");
    let cfg = EchoClientConfig::new(remote, 9)
        .with_max_packets(10)
        .with_interval(SimTime::from_secs(1))
        .with_packet_size(1024);
    net.install_echo_client(client, cfg, sim, SimTime::from_secs(2), None)
        .expect("client");
    runner.configure(1, SimTime::from_secs(30));
    (runner, remote)
}

#[test]
fn ten_requests_over_two_routers_all_arrive() {
    let (topo, client, server) = two_router_topology(100);
    let (mut runner, remote) = ten_request_runner(topo, client, server);
    runner.run().expect("run");

    let report = runner.report().expect("report");
    let req = report.flow(FlowId(1)).expect("request flow");
    assert_eq!(req.tuple.dst, remote);
    assert_eq!(req.tuple.dst_port, 9);
    assert_eq!((req.tx_packets, req.rx_packets, req.lost_packets), (10, 10, 0));
    assert_eq!(req.tx_bytes, 10 * 1052);
    assert_eq!(req.times_forwarded, 20);
    assert!(req.throughput_bps.expect("throughput") > 0.0);

    // 1054 字节 @ 1Mbps = 8.432ms，三跳各加 1ms
    let delay = req.mean_delay_s.expect("delay");
    assert!((delay - 0.028296).abs() < 1e-9, "delay = {delay}");
    assert_eq!(req.mean_jitter_s, Some(0.0));

    let reply = report.flow(FlowId(2)).expect("reply flow");
    assert_eq!(reply.tuple, req.tuple.reversed());
    assert_eq!((reply.tx_packets, reply.rx_packets, reply.lost_packets), (10, 10, 0));
    assert_eq!(runner.sim().now(), SimTime::from_secs(30));
}

#[test]
fn zero_capacity_queue_loses_every_request() {
    let (topo, client, server) = two_router_topology(0);
    let (mut runner, _) = ten_request_runner(topo, client, server);
    runner.run().expect("run");

    let report = runner.report().expect("report");
    assert_eq!(report.len(), 1, "没有请求到达，也就没有回包流");
    let req = report.flow(FlowId(1)).expect("request flow");
    assert_eq!((req.tx_packets, req.rx_packets, req.lost_packets), (10, 0, 10));
    assert_eq!(req.drops.get(&DropReason::QueueOverflow), Some(&10));
    assert_eq!(req.throughput_bps, None);
    assert_eq!(runner.stats().dropped_pkts, 10);
}

#[test]
fn same_seed_produces_identical_reports() {
    let run = |seed: u64| {
        let (mut runner, _) =
            build_assignment_runner(&AssignmentOpts::default(), seed).expect("assignment");
        runner.run().expect("run");
        serde_json::to_string(&runner.report().expect("report")).expect("json")
    };
    let a = run(42);
    let b = run(42);
    assert_eq!(a, b);
    assert!(a.contains("\"flow_id\":1"));
}

#[test]
fn certain_loss_error_model_drops_everything_on_first_hop() {
    let (topo, client, server) = build_chain(&ChainOpts {
        error_rate: 1.0,
        ..ChainOpts::default()
    })
    .expect("chain");
    let (mut runner, _) = ten_request_runner(topo, client, server);
    runner.run().expect("run");

    let report = runner.report().expect("report");
    let req = report.flow(FlowId(1)).expect("request flow");
    assert_eq!((req.tx_packets, req.rx_packets, req.lost_packets), (10, 0, 10));
    assert_eq!(req.drops.get(&DropReason::ErrorModel), Some(&10));
    assert_eq!(req.times_forwarded, 0);
}

#[test]
fn packets_in_flight_at_stop_are_not_counted_lost_before_the_deadline() {
    let (topo, client, server) = two_router_topology(100);
    let remote = topo.addr_of(server).expect("server addr");
    let mut runner = SimRunner::new(topo, NetConfig::default());
    let (sim, net) = runner.parts_mut();
    net.install_echo_server(server, 9, sim, SimTime::ZERO, None)
        .expect("server");
    net.install_echo_client(client, EchoClientConfig::new(remote, 9), sim, SimTime::ZERO, None)
        .expect("client");
    // 单程约 28ms，10ms 时请求还在路上
    runner.configure(7, SimTime::from_millis(10));
    runner.run().expect("run");

    let report = runner.report().expect("report");
    let req = report.flow(FlowId(1)).expect("request flow");
    assert_eq!((req.tx_packets, req.rx_packets, req.lost_packets), (1, 0, 0));
    assert_eq!(req.in_flight(), 1);
}

#[test]
fn expired_in_flight_packets_become_timeouts() {
    let (topo, client, server) = two_router_topology(100);
    let remote = topo.addr_of(server).expect("server addr");
    let mut runner = SimRunner::new(topo, NetConfig::default());
    let (sim, net) = runner.parts_mut();
    net.install_echo_client(client, EchoClientConfig::new(remote, 9), sim, SimTime::ZERO, None)
        .expect("client");
    runner.configure(7, SimTime::from_millis(10));
    runner.set_max_delay(SimTime::from_millis(5));
    runner.run().expect("run");

    let report = runner.report().expect("report");
    let req = report.flow(FlowId(1)).expect("request flow");
    assert_eq!(req.lost_packets, 1);
    assert_eq!(req.drops.get(&DropReason::Timeout), Some(&1));
}

#[test]
fn runner_runs_only_once() {
    let (topo, _, _) = build_chain(&ChainOpts::default()).expect("chain");
    let mut runner = SimRunner::new(topo, NetConfig::default());
    assert!(matches!(runner.report(), Err(RunError::NotFinished)));
    runner.run().expect("run");
    assert!(runner.is_finished());
    assert!(runner.report().expect("report").is_empty());
    assert!(matches!(runner.run(), Err(RunError::AlreadyRun)));
}
