//! 场景描述（JSON）
//!
//! 一个场景 = 拓扑 + echo 应用 + 运行参数。节点按名字引用；
//! 客户端的 `remote` 既可以是 IPv4 地址，也可以是节点名（取该节点的第一个接口地址）。

use std::collections::HashSet;
use std::net::Ipv4Addr;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::app::EchoClientConfig;
use crate::error::ConfigError;
use crate::net::{
    DataRate, ErrorUnit, LinkParams, NetConfig, NodeId, NodeKind, Position, RoutingMetric,
    Topology, parse_addr,
};
use crate::queue::QueueSize;
use crate::runner::SimRunner;
use crate::sim::SimTime;
use crate::topo::{AssignmentOpts, ChainOpts, build_assignment, build_chain};

pub const SCENARIO_SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioSpec {
    pub schema_version: u32,
    #[serde(default)]
    pub meta: Option<ScenarioMeta>,
    #[serde(default)]
    pub seed: u64,
    /// 不设置则运行到事件队列为空
    #[serde(default)]
    pub stop_time: Option<SimTime>,
    #[serde(default)]
    pub routing: RoutingMetric,
    #[serde(default)]
    pub error_unit: ErrorUnit,
    pub topology: TopologySpec,
    #[serde(default)]
    pub echo_servers: Vec<EchoServerSpec>,
    #[serde(default)]
    pub echo_clients: Vec<EchoClientSpec>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScenarioMeta {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TopologySpec {
    /// 显式列出节点和链路
    Custom {
        #[serde(default)]
        address_base: Option<String>,
        #[serde(default)]
        defaults: Option<LinkDefaults>,
        nodes: Vec<NodeSpec>,
        links: Vec<LinkSpec>,
    },
    /// client - r1 - ... - rN - server
    Chain {
        #[serde(default)]
        routers: Option<usize>,
        #[serde(default)]
        data_rate: Option<DataRate>,
        #[serde(default)]
        delay: Option<SimTime>,
        #[serde(default)]
        queue: Option<QueueSize>,
        #[serde(default)]
        error_rate: Option<f64>,
    },
    /// 主机 A-G、路由器 R1-R4 的作业拓扑
    Assignment {
        #[serde(default)]
        lab: bool,
        #[serde(default)]
        error_rate: Option<f64>,
    },
}

/// 自定义拓扑里链路字段的缺省值
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LinkDefaults {
    #[serde(default)]
    pub data_rate: Option<DataRate>,
    #[serde(default)]
    pub delay: Option<SimTime>,
    #[serde(default)]
    pub queue: Option<QueueSize>,
    #[serde(default)]
    pub error_rate: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeSpec {
    pub name: String,
    #[serde(default)]
    pub kind: NodeKind,
    #[serde(default)]
    pub position: Option<Position>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkSpec {
    pub a: String,
    pub b: String,
    #[serde(default)]
    pub data_rate: Option<DataRate>,
    #[serde(default)]
    pub delay: Option<SimTime>,
    #[serde(default)]
    pub queue: Option<QueueSize>,
    #[serde(default)]
    pub error_rate: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EchoServerSpec {
    pub node: String,
    pub port: u16,
    #[serde(default)]
    pub start: Option<SimTime>,
    #[serde(default)]
    pub stop: Option<SimTime>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EchoClientSpec {
    pub node: String,
    /// IPv4 地址或节点名
    pub remote: String,
    pub port: u16,
    #[serde(default = "default_max_packets")]
    pub max_packets: u32,
    #[serde(default = "default_interval")]
    pub interval: SimTime,
    #[serde(default = "default_packet_size")]
    pub packet_size: u32,
    #[serde(default)]
    pub start: Option<SimTime>,
    #[serde(default)]
    pub stop: Option<SimTime>,
}

fn default_max_packets() -> u32 {
    1
}

fn default_interval() -> SimTime {
    SimTime::from_secs(1)
}

fn default_packet_size() -> u32 {
    1024
}

impl ScenarioSpec {
    /// 构建拓扑、安装应用，返回已配置好的 `SimRunner`
    pub fn build(&self) -> Result<SimRunner, ConfigError> {
        if self.schema_version != SCENARIO_SCHEMA_VERSION {
            return Err(ConfigError::UnsupportedSchema(self.schema_version));
        }
        let topo = build_topology(&self.topology)?;
        debug!(
            nodes = topo.node_count(),
            links = topo.links().len(),
            "场景拓扑构建完成"
        );

        // 先解析所有节点名/地址，再创建网络
        let servers = self
            .echo_servers
            .iter()
            .map(|s| -> Result<_, ConfigError> {
                Ok((resolve_node(&topo, &s.node)?, s))
            })
            .collect::<Result<Vec<_>, ConfigError>>()?;
        let clients = self
            .echo_clients
            .iter()
            .map(|c| -> Result<_, ConfigError> {
                let node = resolve_node(&topo, &c.node)?;
                let remote = resolve_remote(&topo, &c.remote)?;
                let cfg = EchoClientConfig::new(remote, c.port)
                    .with_max_packets(c.max_packets)
                    .with_interval(c.interval)
                    .with_packet_size(c.packet_size);
                cfg.validate()?;
                // 不限包数的客户端必须有停止时刻，否则事件队列永远不会空
                if c.max_packets == 0 && c.stop.is_none() && self.stop_time.is_none() {
                    return Err(ConfigError::UnboundedEchoClient(c.node.clone()));
                }
                Ok((node, cfg, c))
            })
            .collect::<Result<Vec<_>, ConfigError>>()?;

        let cfg = NetConfig {
            seed: self.seed,
            metric: self.routing,
            error_unit: self.error_unit,
        };
        let mut runner = SimRunner::new(topo, cfg);
        {
            let (sim, net) = runner.parts_mut();
            for (node, s) in servers {
                let start = s.start.unwrap_or(SimTime::ZERO);
                net.install_echo_server(node, s.port, sim, start, s.stop)?;
            }
            for (node, cfg, c) in clients {
                let start = c.start.unwrap_or(SimTime::ZERO);
                net.install_echo_client(node, cfg, sim, start, c.stop)?;
            }
        }
        if let Some(stop) = self.stop_time {
            runner.configure(self.seed, stop);
        }
        Ok(runner)
    }
}

fn resolve_node(topo: &Topology, name: &str) -> Result<NodeId, ConfigError> {
    topo.find_node(name)
        .ok_or_else(|| ConfigError::UnknownNode(name.to_string()))
}

fn resolve_remote(topo: &Topology, remote: &str) -> Result<Ipv4Addr, ConfigError> {
    if let Some(node) = topo.find_node(remote) {
        return topo
            .addr_of(node)
            .ok_or_else(|| ConfigError::InvalidAddress(remote.to_string()));
    }
    parse_addr(remote)
}

fn build_topology(spec: &TopologySpec) -> Result<Topology, ConfigError> {
    match spec {
        TopologySpec::Custom {
            address_base,
            defaults,
            nodes,
            links,
        } => {
            let mut topo = match address_base {
                Some(base) => Topology::with_address_base(parse_addr(base)?),
                None => Topology::new(),
            };
            let mut seen = HashSet::new();
            for n in nodes {
                if !seen.insert(n.name.as_str()) {
                    return Err(ConfigError::DuplicateNodeName(n.name.clone()));
                }
                let id = match n.kind {
                    NodeKind::Host => topo.add_host(n.name.clone()),
                    NodeKind::Router => topo.add_router(n.name.clone()),
                };
                if let Some(pos) = n.position {
                    topo.set_position(id, pos)?;
                }
            }
            let defaults = defaults.clone().unwrap_or_default();
            let base = LinkParams::default();
            for l in links {
                let a = resolve_node(&topo, &l.a)?;
                let b = resolve_node(&topo, &l.b)?;
                let params = LinkParams {
                    rate: l.data_rate.or(defaults.data_rate).unwrap_or(base.rate),
                    delay: l.delay.or(defaults.delay).unwrap_or(base.delay),
                    queue: l.queue.or(defaults.queue).unwrap_or(base.queue),
                    error_rate: l
                        .error_rate
                        .or(defaults.error_rate)
                        .unwrap_or(base.error_rate),
                };
                topo.add_link(a, b, params)?;
            }
            Ok(topo)
        }
        TopologySpec::Chain {
            routers,
            data_rate,
            delay,
            queue,
            error_rate,
        } => {
            let d = ChainOpts::default();
            let opts = ChainOpts {
                routers: routers.unwrap_or(d.routers),
                rate: data_rate.unwrap_or(d.rate),
                delay: delay.unwrap_or(d.delay),
                queue_pkts: queue.map(|q| q.packets).unwrap_or(d.queue_pkts),
                error_rate: error_rate.unwrap_or(d.error_rate),
            };
            let (topo, _, _) = build_chain(&opts)?;
            Ok(topo)
        }
        TopologySpec::Assignment { lab, error_rate } => {
            let mut opts = if *lab {
                AssignmentOpts::lab()
            } else {
                AssignmentOpts::default()
            };
            if let Some(r) = error_rate {
                opts.error_rate = *r;
            }
            let (topo, _, _) = build_assignment(&opts)?;
            Ok(topo)
        }
    }
}
