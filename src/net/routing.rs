//! 静态最短路路由
//!
//! 拓扑构建完成后一次性计算每个 (节点, 目的节点) 的下一跳链路，整个运行期间不变。
//!
//! 链路无向且两个方向权重相同，因此以每个节点为根各跑一次 Dijkstra，
//! 得到的 "根到各点" 距离也就是 "各点到根" 的距离；
//! 再对每个节点，在落在最短路上的邻居中选下一跳。
//! 等价下一跳按邻居 NodeId 最小、再按 LinkId 最小选取，保证输出确定。
//! 不可达的节点对显式记为 `Route::Unreachable`。

use std::cmp::Reverse;
use std::collections::BinaryHeap;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::id::{LinkId, NodeId};
use super::topology::Topology;

/// 路由代价的度量方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoutingMetric {
    /// 跳数优先，传播时延作为次级比较
    #[default]
    HopCount,
    /// 传播时延优先，跳数作为次级比较
    Delay,
}

/// 路径代价：(主键, 次键)，按字典序比较
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Cost(pub u64, pub u64);

impl Cost {
    pub const ZERO: Cost = Cost(0, 0);

    fn add(self, other: Cost) -> Cost {
        Cost(self.0.saturating_add(other.0), self.1.saturating_add(other.1))
    }
}

/// 一条路由表项
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Route {
    /// 目的就是本节点
    Local,
    /// 经 `link` 转发给 `next_hop`；`cost` 为到目的的总代价
    Via {
        link: LinkId,
        next_hop: NodeId,
        cost: Cost,
    },
    /// 目的不可达（拓扑分区）
    Unreachable,
}

#[derive(Debug, Clone, Default)]
pub struct RoutingTable {
    metric: RoutingMetric,
    /// routes[node][dst]
    routes: Vec<Vec<Route>>,
}

impl RoutingTable {
    /// 基于拓扑构建完整路由表
    #[tracing::instrument(skip(topo), fields(nodes = topo.node_count(), links = topo.links().len()))]
    pub fn build(topo: &Topology, metric: RoutingMetric) -> RoutingTable {
        let n = topo.node_count();
        let mut routes = vec![vec![Route::Unreachable; n]; n];

        for root_idx in 0..n {
            let root = NodeId(root_idx);
            let dist = shortest_costs(topo, root, metric);

            for from_idx in 0..n {
                let from = NodeId(from_idx);
                if from == root {
                    routes[from_idx][root_idx] = Route::Local;
                    continue;
                }
                let Some(df) = dist[from_idx] else {
                    continue; // unreachable
                };

                // 候选：cost(link) + dist[nbr] == dist[from]；取 (邻居 id, 链路 id) 最小者
                let mut best: Option<(NodeId, LinkId)> = None;
                for (link, nbr) in topo.neighbors(from) {
                    if nbr == from {
                        continue;
                    }
                    let Some(dn) = dist[nbr.0] else {
                        continue;
                    };
                    let Some(l) = topo.link(link) else {
                        continue;
                    };
                    if dn.add(edge_cost(l.delay.0, metric)) != df {
                        continue;
                    }
                    if best.is_none_or(|b| (nbr, link) < b) {
                        best = Some((nbr, link));
                    }
                }
                if let Some((next_hop, link)) = best {
                    routes[from_idx][root_idx] = Route::Via {
                        link,
                        next_hop,
                        cost: df,
                    };
                }
            }
        }

        let table = RoutingTable { metric, routes };
        let unreachable = table.unreachable_pairs().count();
        if unreachable > 0 {
            warn!(unreachable, "拓扑存在不可达的节点对");
        }
        debug!(?metric, "路由表构建完成");
        table
    }

    pub fn metric(&self) -> RoutingMetric {
        self.metric
    }

    /// (node, dst) 的路由表项；任一节点越界时视为不可达
    pub fn route(&self, node: NodeId, dst: NodeId) -> Route {
        self.routes
            .get(node.0)
            .and_then(|row| row.get(dst.0))
            .copied()
            .unwrap_or(Route::Unreachable)
    }

    /// 下一跳链路（本地或不可达时为 None）
    pub fn next_hop(&self, node: NodeId, dst: NodeId) -> Option<LinkId> {
        match self.route(node, dst) {
            Route::Via { link, .. } => Some(link),
            Route::Local | Route::Unreachable => None,
        }
    }

    /// 所有不可达的 (from, dst)
    pub fn unreachable_pairs(&self) -> impl Iterator<Item = (NodeId, NodeId)> + '_ {
        self.routes.iter().enumerate().flat_map(|(from, row)| {
            row.iter()
                .enumerate()
                .filter(|(_, r)| matches!(r, Route::Unreachable))
                .map(move |(dst, _)| (NodeId(from), NodeId(dst)))
        })
    }

    /// 沿路由表走出的节点序列（含两端）；不可达时为 None
    pub fn path(&self, src: NodeId, dst: NodeId) -> Option<Vec<NodeId>> {
        let mut path = vec![src];
        let mut at = src;
        while at != dst {
            match self.route(at, dst) {
                Route::Via { next_hop, .. } => {
                    at = next_hop;
                    path.push(at);
                }
                Route::Local | Route::Unreachable => return None,
            }
            // 路由表无环；这里只防御越界输入
            if path.len() > self.routes.len() {
                return None;
            }
        }
        Some(path)
    }
}

fn edge_cost(delay_ns: u64, metric: RoutingMetric) -> Cost {
    match metric {
        RoutingMetric::HopCount => Cost(1, delay_ns),
        RoutingMetric::Delay => Cost(delay_ns, 1),
    }
}

/// 以 `root` 为源的 Dijkstra，返回每个节点的最小代价（不可达为 None）
fn shortest_costs(topo: &Topology, root: NodeId, metric: RoutingMetric) -> Vec<Option<Cost>> {
    let n = topo.node_count();
    let mut dist: Vec<Option<Cost>> = vec![None; n];
    let mut heap: BinaryHeap<Reverse<(Cost, NodeId)>> = BinaryHeap::new();

    dist[root.0] = Some(Cost::ZERO);
    heap.push(Reverse((Cost::ZERO, root)));

    while let Some(Reverse((d, v))) = heap.pop() {
        if dist[v.0].is_some_and(|best| d > best) {
            continue;
        }
        for (link, nbr) in topo.neighbors(v) {
            let Some(l) = topo.link(link) else {
                continue;
            };
            let nd = d.add(edge_cost(l.delay.0, metric));
            if dist[nbr.0].is_none_or(|cur| nd < cur) {
                dist[nbr.0] = Some(nd);
                heap.push(Reverse((nd, nbr)));
            }
        }
    }
    dist
}
