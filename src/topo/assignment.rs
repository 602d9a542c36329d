//! 作业拓扑：7 台主机（A-G）+ 4 台路由器（R1-R4）
//!
//! ```text
//!   A   B         E   F
//!    \ /           \ /
//!    R1 --------- R2
//!    |             |
//!    R3 --------- R4
//!   / \            |
//!  C   D           G
//! ```
//!
//! 链路按 0..=10 的顺序添加，第 i 条链路使用 10.1.(i+1).0/24，
//! 因此主机 E 的地址是 10.1.5.1。

use std::net::Ipv4Addr;

use crate::app::{AppId, EchoClientConfig};
use crate::error::ConfigError;
use crate::net::{DataRate, LinkParams, NetConfig, NodeId, Position, Topology};
use crate::runner::SimRunner;
use crate::sim::SimTime;

/// 作业拓扑与应用配置
#[derive(Debug, Clone)]
pub struct AssignmentOpts {
    /// 主机接入链路速率（主机 D 除外）
    pub host_rate: DataRate,
    /// 主机 D 接入链路速率
    pub host_d_rate: DataRate,
    pub r1_r2_rate: DataRate,
    pub r1_r3_rate: DataRate,
    pub r3_r4_rate: DataRate,
    pub r2_r4_rate: DataRate,
    pub delay: SimTime,
    pub queue_pkts: usize,
    pub error_rate: f64,

    pub server_port: u16,
    pub max_packets: u32,
    pub interval: SimTime,
    pub packet_size: u32,
    pub server_start: SimTime,
    pub server_stop: SimTime,
    pub client_start: SimTime,
    pub client_stop: SimTime,
    pub stop_time: SimTime,
}

impl Default for AssignmentOpts {
    fn default() -> Self {
        Self {
            host_rate: DataRate::mbps(10),
            host_d_rate: DataRate::mbps(15),
            r1_r2_rate: DataRate::mbps(20),
            r1_r3_rate: DataRate::mbps(25),
            r3_r4_rate: DataRate::mbps(30),
            r2_r4_rate: DataRate::mbps(20),
            delay: SimTime::from_millis(1),
            queue_pkts: 100,
            error_rate: 0.005,
            server_port: 9,
            max_packets: 120,
            interval: SimTime::from_millis(500),
            packet_size: 256,
            server_start: SimTime::from_secs(1),
            server_stop: SimTime::from_secs(60),
            client_start: SimTime::from_secs(2),
            client_stop: SimTime::from_secs(60),
            stop_time: SimTime::from_secs(60),
        }
    }
}

impl AssignmentOpts {
    /// 实验课版本：低速链路、无误码、10 个 1024 字节请求
    pub fn lab() -> Self {
        Self {
            host_rate: DataRate::mbps(1),
            host_d_rate: DataRate::mbps(1),
            r1_r2_rate: DataRate::mbps(3),
            r1_r3_rate: DataRate::mbps(3),
            r3_r4_rate: DataRate::mbps(3),
            r2_r4_rate: DataRate::mbps(1),
            error_rate: 0.0,
            max_packets: 10,
            interval: SimTime::from_secs(1),
            packet_size: 1024,
            server_stop: SimTime::from_secs(30),
            client_stop: SimTime::from_secs(30),
            stop_time: SimTime::from_secs(30),
            ..Self::default()
        }
    }
}

/// 构建拓扑，返回 (拓扑, 主机 A-G, 路由器 R1-R4)
pub fn build_assignment(
    opts: &AssignmentOpts,
) -> Result<(Topology, Vec<NodeId>, Vec<NodeId>), ConfigError> {
    let mut topo = Topology::new();

    let hosts: Vec<NodeId> = ["A", "B", "C", "D", "E", "F", "G"]
        .iter()
        .map(|n| topo.add_host(*n))
        .collect();
    let routers: Vec<NodeId> = ["R1", "R2", "R3", "R4"]
        .iter()
        .map(|n| topo.add_router(*n))
        .collect();

    for (i, &h) in hosts.iter().enumerate() {
        topo.set_position(h, Position::new(10.0 * (i as f64 + 1.0), 20.0))?;
    }
    for (i, &r) in routers.iter().enumerate() {
        topo.set_position(r, Position::new(30.0 + 20.0 * i as f64, 50.0))?;
    }

    let params = |rate: DataRate| {
        LinkParams::new(rate, opts.delay)
            .with_queue(opts.queue_pkts)
            .with_error_rate(opts.error_rate)
    };
    let (r1, r2, r3, r4) = (routers[0], routers[1], routers[2], routers[3]);

    // 顺序决定子网编号
    let links = [
        (hosts[0], r1, opts.host_rate),
        (hosts[1], r1, opts.host_rate),
        (hosts[2], r3, opts.host_rate),
        (hosts[3], r3, opts.host_d_rate),
        (hosts[4], r2, opts.host_rate),
        (hosts[5], r2, opts.host_rate),
        (hosts[6], r4, opts.host_rate),
        (r1, r2, opts.r1_r2_rate),
        (r1, r3, opts.r1_r3_rate),
        (r3, r4, opts.r3_r4_rate),
        (r2, r4, opts.r2_r4_rate),
    ];
    for (a, b, rate) in links {
        topo.add_link(a, b, params(rate))?;
    }

    Ok((topo, hosts, routers))
}

/// 安装好的应用
#[derive(Debug, Clone, Copy)]
pub struct AssignmentApps {
    pub client: AppId,
    pub server: AppId,
    pub client_node: NodeId,
    pub server_node: NodeId,
    pub server_addr: Ipv4Addr,
}

/// 构建拓扑、安装 echo 服务器（主机 E）和客户端（主机 A），并配置好停止时间
pub fn build_assignment_runner(
    opts: &AssignmentOpts,
    seed: u64,
) -> Result<(SimRunner, AssignmentApps), ConfigError> {
    let (topo, hosts, _routers) = build_assignment(opts)?;
    let (client_node, server_node) = (hosts[0], hosts[4]);
    let server_addr = topo
        .addr_of(server_node)
        .ok_or_else(|| ConfigError::UnknownNode(server_node.to_string()))?;

    let cfg = NetConfig {
        seed,
        ..NetConfig::default()
    };
    let mut runner = SimRunner::new(topo, cfg);
    let client_cfg = EchoClientConfig::new(server_addr, opts.server_port)
        .with_max_packets(opts.max_packets)
        .with_interval(opts.interval)
        .with_packet_size(opts.packet_size);

    let (sim, net) = runner.parts_mut();
    let server = net.install_echo_server(
        server_node,
        opts.server_port,
        sim,
        opts.server_start,
        Some(opts.server_stop),
    )?;
    let client = net.install_echo_client(
        client_node,
        client_cfg,
        sim,
        opts.client_start,
        Some(opts.client_stop),
    )?;
    runner.configure(seed, opts.stop_time);

    Ok((
        runner,
        AssignmentApps {
            client,
            server,
            client_node,
            server_node,
            server_addr,
        },
    ))
}
