//! 流统计报告

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::classifier::FlowId;
use super::monitor::FlowStats;
use crate::net::{DropReason, FiveTuple};
use crate::sim::SimTime;

/// `Display` 中 "Mbps" 的换算基数
pub const BITS_PER_PRINTED_MBIT: f64 = 1024.0 * 1024.0;

/// 一条流的汇总
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowSummary {
    pub flow_id: FlowId,
    pub tuple: FiveTuple,
    pub tx_packets: u64,
    pub rx_packets: u64,
    pub lost_packets: u64,
    pub tx_bytes: u64,
    pub rx_bytes: u64,
    pub times_forwarded: u64,
    pub first_tx: Option<SimTime>,
    pub last_rx: Option<SimTime>,
    /// rx_bytes * 8 / (last_rx - first_tx)，单位 bit/s；没有收到包时省略
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub throughput_bps: Option<f64>,
    /// 平均端到端时延（秒）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mean_delay_s: Option<f64>,
    /// 平均抖动（秒），至少收到两个包时才有
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mean_jitter_s: Option<f64>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub drops: BTreeMap<DropReason, u64>,
}

impl FlowSummary {
    pub(crate) fn from_stats(flow_id: FlowId, tuple: FiveTuple, st: &FlowStats) -> Self {
        let throughput_bps = match (st.first_tx, st.last_rx) {
            (Some(first), Some(last)) if st.rx_packets > 0 && last > first => {
                let secs = last.saturating_sub(first).as_secs_f64();
                Some(st.rx_bytes as f64 * 8.0 / secs)
            }
            _ => None,
        };
        let mean_delay_s =
            (st.rx_packets > 0).then(|| st.delay_sum.as_secs_f64() / st.rx_packets as f64);
        let mean_jitter_s = (st.rx_packets > 1)
            .then(|| st.jitter_sum.as_secs_f64() / (st.rx_packets - 1) as f64);

        Self {
            flow_id,
            tuple,
            tx_packets: st.tx_packets,
            rx_packets: st.rx_packets,
            lost_packets: st.lost_packets,
            tx_bytes: st.tx_bytes,
            rx_bytes: st.rx_bytes,
            times_forwarded: st.times_forwarded,
            first_tx: st.first_tx,
            last_rx: st.last_rx,
            throughput_bps,
            mean_delay_s,
            mean_jitter_s,
            drops: st.drops.clone(),
        }
    }

    /// 已发送但既未收到也未判定丢失的包（运行结束时仍在途）
    pub fn in_flight(&self) -> u64 {
        self.tx_packets
            .saturating_sub(self.rx_packets)
            .saturating_sub(self.lost_packets)
    }
}

/// 所有流的汇总，按流 id 排序
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FlowReport {
    pub flows: Vec<FlowSummary>,
}

impl FlowReport {
    pub fn get(&self, tuple: &FiveTuple) -> Option<&FlowSummary> {
        self.flows.iter().find(|f| &f.tuple == tuple)
    }

    pub fn flow(&self, id: FlowId) -> Option<&FlowSummary> {
        self.flows.iter().find(|f| f.flow_id == id)
    }

    pub fn len(&self) -> usize {
        self.flows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.flows.is_empty()
    }

    pub fn total_tx(&self) -> u64 {
        self.flows.iter().map(|f| f.tx_packets).sum()
    }

    pub fn total_rx(&self) -> u64 {
        self.flows.iter().map(|f| f.rx_packets).sum()
    }

    pub fn total_lost(&self) -> u64 {
        self.flows.iter().map(|f| f.lost_packets).sum()
    }
}

impl fmt::Display for FlowReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== Flow Statistics ===")?;
        for s in &self.flows {
            writeln!(
                f,
                "Flow {} ({}:{} -> {}:{})",
                s.flow_id, s.tuple.src, s.tuple.src_port, s.tuple.dst, s.tuple.dst_port
            )?;
            writeln!(f, "  Tx Packets: {}", s.tx_packets)?;
            writeln!(f, "  Rx Packets: {}", s.rx_packets)?;
            writeln!(f, "  Lost Packets: {}", s.lost_packets)?;
            if let Some(bps) = s.throughput_bps {
                // 打印口径沿用 ns-3 脚本：除以 1024 * 1024
                writeln!(f, "  Throughput: {:.6} Mbps", bps / BITS_PER_PRINTED_MBIT)?;
            }
            if let Some(d) = s.mean_delay_s {
                writeln!(f, "  End-to-End Delay: {d:.9} seconds")?;
            }
            if let Some(j) = s.mean_jitter_s {
                writeln!(f, "  Jitter: {j:.9} seconds")?;
            }
        }
        Ok(())
    }
}
