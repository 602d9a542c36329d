//! Visualization hooks for the network.

use crate::viz::{VizEvent, VizEventKind, VizLinkInfo, VizNodeInfo};

use super::Network;

impl Network {
    /// 输出拓扑元信息（节点、坐标、链路参数），作为 t=0 的第一条事件
    pub fn emit_viz_meta(&mut self) {
        if self.viz.is_none() {
            return;
        }
        let topo = self.topology();
        let nodes = topo
            .nodes()
            .iter()
            .map(|n| VizNodeInfo {
                id: n.id().0,
                name: n.name().to_string(),
                kind: n.kind(),
                position: n.position(),
                addrs: n.addrs().iter().map(|a| a.to_string()).collect(),
            })
            .collect::<Vec<_>>();
        let links = topo
            .links()
            .iter()
            .enumerate()
            .map(|(id, l)| VizLinkInfo {
                id,
                a: l.a.0,
                b: l.b.0,
                bandwidth_bps: l.rate.bits_per_sec(),
                latency_ns: l.delay.0,
                q_cap_pkts: l.queue.packets,
                error_rate: l.error_rate,
            })
            .collect::<Vec<_>>();
        if let Some(v) = &mut self.viz {
            v.push(VizEvent {
                t_ns: 0,
                pkt_id: None,
                pkt_bytes: None,
                kind: VizEventKind::Meta { nodes, links },
            });
        }
    }
}
