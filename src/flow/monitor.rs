//! 流统计观察者

use std::collections::{BTreeMap, HashMap};

use tracing::{debug, trace};

use super::classifier::{FlowClassifier, FlowId};
use super::report::{FlowReport, FlowSummary};
use crate::net::{DropReason, NodeId, Packet, PacketObserver};
use crate::sim::SimTime;

/// 在途超过该时长的包在 `check_for_lost_packets` 中判为丢失
pub const DEFAULT_MAX_PER_HOP_DELAY: SimTime = SimTime(10_000_000_000);

/// 单条流的原始计数
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FlowStats {
    pub tx_packets: u64,
    pub tx_bytes: u64,
    pub rx_packets: u64,
    pub rx_bytes: u64,
    pub lost_packets: u64,
    pub times_forwarded: u64,
    pub first_tx: Option<SimTime>,
    pub last_tx: Option<SimTime>,
    pub first_rx: Option<SimTime>,
    pub last_rx: Option<SimTime>,
    /// 所有已接收包端到端时延之和
    pub delay_sum: SimTime,
    /// 相邻两个已接收包时延差的绝对值之和
    pub jitter_sum: SimTime,
    pub last_delay: Option<SimTime>,
    pub drops: BTreeMap<DropReason, u64>,
}

#[derive(Debug, Clone, Copy)]
struct InFlight {
    flow: FlowId,
    sent_at: SimTime,
}

/// 按五元组聚合发送/接收/丢弃事件
#[derive(Debug, Default)]
pub struct FlowMonitor {
    classifier: FlowClassifier,
    flows: BTreeMap<FlowId, FlowStats>,
    in_flight: HashMap<u64, InFlight>,
}

impl FlowMonitor {
    pub fn classifier(&self) -> &FlowClassifier {
        &self.classifier
    }

    pub fn stats(&self, id: FlowId) -> Option<&FlowStats> {
        self.flows.get(&id)
    }

    /// 当前仍在途（已发送、未接收也未丢弃）的包数
    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }

    /// 把在途时间超过 `max_delay` 的包记为丢失（原因 `Timeout`）
    pub fn check_for_lost_packets(&mut self, now: SimTime, max_delay: SimTime) {
        let mut expired: Vec<u64> = self
            .in_flight
            .iter()
            .filter(|(_, f)| now.saturating_sub(f.sent_at) > max_delay)
            .map(|(&id, _)| id)
            .collect();
        expired.sort_unstable();
        for pkt_id in expired {
            if let Some(f) = self.in_flight.remove(&pkt_id) {
                trace!(pkt_id, flow = %f.flow, "在途超时，记为丢失");
                self.record_loss(f.flow, DropReason::Timeout);
            }
        }
    }

    fn record_loss(&mut self, flow: FlowId, reason: DropReason) {
        let st = self.flows.entry(flow).or_default();
        st.lost_packets += 1;
        *st.drops.entry(reason).or_insert(0) += 1;
    }

    /// 汇总报告；流按 id（首次出现顺序）排列
    pub fn report(&self) -> FlowReport {
        let flows = self
            .flows
            .iter()
            .filter_map(|(&id, st)| {
                let tuple = self.classifier.tuple(id)?;
                Some(FlowSummary::from_stats(id, *tuple, st))
            })
            .collect();
        FlowReport { flows }
    }
}

impl PacketObserver for FlowMonitor {
    fn on_send(&mut self, _node: NodeId, pkt: &Packet, t: SimTime) {
        let flow = self.classifier.classify(&pkt.tuple);
        let st = self.flows.entry(flow).or_default();
        st.tx_packets += 1;
        st.tx_bytes += pkt.size_bytes() as u64;
        st.first_tx.get_or_insert(t);
        st.last_tx = Some(t);
        self.in_flight.insert(pkt.id, InFlight { flow, sent_at: t });
    }

    fn on_forward(&mut self, _node: NodeId, pkt: &Packet, _t: SimTime) {
        if let Some(f) = self.in_flight.get(&pkt.id) {
            if let Some(st) = self.flows.get_mut(&f.flow) {
                st.times_forwarded += 1;
            }
        }
    }

    fn on_receive(&mut self, _node: NodeId, pkt: &Packet, t: SimTime) {
        let Some(f) = self.in_flight.remove(&pkt.id) else {
            debug!(pkt_id = pkt.id, "收到未登记发送的包，忽略");
            return;
        };
        let st = self.flows.entry(f.flow).or_default();
        let delay = t.saturating_sub(f.sent_at);
        st.rx_packets += 1;
        st.rx_bytes += pkt.size_bytes() as u64;
        st.first_rx.get_or_insert(t);
        st.last_rx = Some(t);
        st.delay_sum = st.delay_sum.saturating_add(delay);
        if let Some(prev) = st.last_delay {
            let diff = delay.as_nanos().abs_diff(prev.as_nanos());
            st.jitter_sum = st.jitter_sum.saturating_add(SimTime(diff));
        }
        st.last_delay = Some(delay);
    }

    fn on_drop(&mut self, _node: NodeId, pkt: &Packet, reason: DropReason, _t: SimTime) {
        let Some(f) = self.in_flight.remove(&pkt.id) else {
            return;
        };
        self.record_loss(f.flow, reason);
    }
}
