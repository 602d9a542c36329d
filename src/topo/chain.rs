//! 链式拓扑构建

use crate::error::ConfigError;
use crate::net::{DataRate, LinkParams, NodeId, Topology};
use crate::sim::SimTime;

/// 链式拓扑配置选项
#[derive(Debug, Clone)]
pub struct ChainOpts {
    /// 中间路由器个数（0 表示客户端与服务器直连）
    pub routers: usize,
    pub rate: DataRate,
    pub delay: SimTime,
    pub queue_pkts: usize,
    pub error_rate: f64,
}

impl Default for ChainOpts {
    fn default() -> Self {
        Self {
            routers: 2,
            rate: DataRate::mbps(10),
            delay: SimTime::from_millis(1),
            queue_pkts: 100,
            error_rate: 0.0,
        }
    }
}

/// 构建链式拓扑
///
/// 拓扑结构：client <-> r1 <-> ... <-> rN <-> server
/// 返回：(拓扑, 客户端节点, 服务器节点)
pub fn build_chain(opts: &ChainOpts) -> Result<(Topology, NodeId, NodeId), ConfigError> {
    let mut topo = Topology::new();
    let params = LinkParams::new(opts.rate, opts.delay)
        .with_queue(opts.queue_pkts)
        .with_error_rate(opts.error_rate);

    let client = topo.add_host("client");
    let mut prev = client;
    for i in 0..opts.routers {
        let r = topo.add_router(format!("r{}", i + 1));
        topo.add_link(prev, r, params.clone())?;
        prev = r;
    }
    let server = topo.add_host("server");
    topo.add_link(prev, server, params)?;
    Ok((topo, client, server))
}
