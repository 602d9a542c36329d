use serde::{Deserialize, Serialize};

use crate::net::{Direction, DropReason, LinkId, NodeId, NodeKind, Packet, PacketObserver, Position};
use crate::sim::SimTime;

/// 可视化事件类型
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum VizEventKind {
    /// 仿真/拓扑元信息（作为 t=0 的第一条事件）
    Meta {
        nodes: Vec<VizNodeInfo>,
        links: Vec<VizLinkInfo>,
    },
    /// 应用把包交给源节点网络层
    Send {
        node: usize,
        src: String,
        dst: String,
        src_port: u16,
        dst_port: u16,
    },
    /// packet 入队（发生在某条链路某个方向的队列上）
    Enqueue {
        link: usize,
        dir: Direction,
        q_len: usize,
    },
    /// packet 出队并开始发送（链路序列化开始）
    TxStart {
        link: usize,
        dir: Direction,
        depart_ns: u64,
        arrive_ns: u64,
    },
    /// 中间节点收到包并继续转发
    Forward { node: usize },
    /// 目的节点收到包
    Receive { node: usize },
    /// 丢包
    Drop { node: usize, reason: DropReason },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VizNodeInfo {
    pub id: usize,
    pub name: String,
    pub kind: NodeKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<Position>,
    pub addrs: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VizLinkInfo {
    pub id: usize,
    pub a: usize,
    pub b: usize,
    /// 链路带宽（bps，两个方向各自独立）
    pub bandwidth_bps: u64,
    /// 单向传播时延（ns）
    pub latency_ns: u64,
    /// 每个方向的队列容量（包）
    pub q_cap_pkts: usize,
    pub error_rate: f64,
}

/// 一个可回放的事件（JSON）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VizEvent {
    /// 仿真时间（纳秒，和 `SimTime.0` 同口径）
    pub t_ns: u64,
    pub pkt_id: Option<u64>,
    pub pkt_bytes: Option<u32>,
    #[serde(flatten)]
    pub kind: VizEventKind,
}

/// 一个简单的事件收集器（存内存，仿真结束由调用方写 JSON 文件）
#[derive(Debug, Default)]
pub struct VizLogger {
    pub events: Vec<VizEvent>,
}

impl VizLogger {
    pub fn push(&mut self, ev: VizEvent) {
        self.events.push(ev);
    }

    fn push_pkt(&mut self, t: SimTime, pkt: &Packet, kind: VizEventKind) {
        self.push(VizEvent {
            t_ns: t.0,
            pkt_id: Some(pkt.id),
            pkt_bytes: Some(pkt.size_bytes()),
            kind,
        });
    }
}

impl PacketObserver for VizLogger {
    fn on_send(&mut self, node: NodeId, pkt: &Packet, t: SimTime) {
        let kind = VizEventKind::Send {
            node: node.0,
            src: pkt.tuple.src.to_string(),
            dst: pkt.tuple.dst.to_string(),
            src_port: pkt.tuple.src_port,
            dst_port: pkt.tuple.dst_port,
        };
        self.push_pkt(t, pkt, kind);
    }

    fn on_forward(&mut self, node: NodeId, pkt: &Packet, t: SimTime) {
        self.push_pkt(t, pkt, VizEventKind::Forward { node: node.0 });
    }

    fn on_receive(&mut self, node: NodeId, pkt: &Packet, t: SimTime) {
        self.push_pkt(t, pkt, VizEventKind::Receive { node: node.0 });
    }

    fn on_drop(&mut self, node: NodeId, pkt: &Packet, reason: DropReason, t: SimTime) {
        self.push_pkt(t, pkt, VizEventKind::Drop { node: node.0, reason });
    }

    fn on_enqueue(&mut self, link: LinkId, dir: Direction, pkt: &Packet, q_len: usize, t: SimTime) {
        self.push_pkt(t, pkt, VizEventKind::Enqueue { link: link.0, dir, q_len });
    }

    fn on_tx_start(
        &mut self,
        link: LinkId,
        dir: Direction,
        pkt: &Packet,
        depart: SimTime,
        arrive: SimTime,
        t: SimTime,
    ) {
        let kind = VizEventKind::TxStart {
            link: link.0,
            dir,
            depart_ns: depart.0,
            arrive_ns: arrive.0,
        };
        self.push_pkt(t, pkt, kind);
    }
}
