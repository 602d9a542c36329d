//! 误码/丢包模型
//!
//! 每经过一跳单向信道，在接收端判定一次是否丢弃。随机数发生器的种子来自运行配置，
//! 相同种子得到完全相同的丢包序列。

use std::collections::HashSet;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use super::id::LinkId;
use super::packet::Packet;
use super::topology::Topology;

/// 接收端丢包判定
pub trait ErrorModel: std::fmt::Debug + Send {
    fn should_drop(&mut self, link: LinkId, pkt: &Packet) -> bool;

    /// 以新种子重置随机状态；确定性模型不需要实现
    fn reseed(&mut self, _seed: u64) {}
}

/// 错误率的计量单位（与 ns-3 `RateErrorModel::ErrorUnit` 对应）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorUnit {
    /// 每个包一次独立伯努利试验
    #[default]
    Packet,
    /// 每个字节独立出错：丢包概率 `1 - (1 - rate)^bytes`
    Byte,
    /// 每个比特独立出错：丢包概率 `1 - (1 - rate)^bits`
    Bit,
}

/// 按链路错误率丢包
#[derive(Debug, Clone)]
pub struct RateErrorModel {
    rates: Vec<f64>,
    unit: ErrorUnit,
    rng: ChaCha8Rng,
}

impl RateErrorModel {
    /// 从拓扑快照每条链路的错误率
    pub fn new(topo: &Topology, seed: u64) -> Self {
        Self::with_unit(topo, seed, ErrorUnit::Packet)
    }

    pub fn with_unit(topo: &Topology, seed: u64, unit: ErrorUnit) -> Self {
        Self {
            rates: topo.links().iter().map(|l| l.error_rate).collect(),
            unit,
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    pub fn unit(&self) -> ErrorUnit {
        self.unit
    }

    fn drop_probability(&self, rate: f64, pkt: &Packet) -> f64 {
        let n = match self.unit {
            ErrorUnit::Packet => return rate,
            ErrorUnit::Byte => pkt.size_bytes() as f64,
            ErrorUnit::Bit => pkt.size_bytes() as f64 * 8.0,
        };
        1.0 - (1.0 - rate).powf(n)
    }
}

impl ErrorModel for RateErrorModel {
    fn should_drop(&mut self, link: LinkId, pkt: &Packet) -> bool {
        let rate = self.rates.get(link.0).copied().unwrap_or(0.0);
        if rate <= 0.0 {
            return false;
        }
        if rate >= 1.0 {
            return true;
        }
        let p = self.drop_probability(rate, pkt);
        self.rng.gen_bool(p)
    }

    fn reseed(&mut self, seed: u64) {
        self.rng = ChaCha8Rng::seed_from_u64(seed);
    }
}

/// 丢弃指定 id 的包（与链路无关），用于构造确定性的丢包场景
#[derive(Debug, Clone, Default)]
pub struct ListErrorModel {
    ids: HashSet<u64>,
}

impl ListErrorModel {
    pub fn new(ids: impl IntoIterator<Item = u64>) -> Self {
        Self {
            ids: ids.into_iter().collect(),
        }
    }
}

impl ErrorModel for ListErrorModel {
    fn should_drop(&mut self, _link: LinkId, pkt: &Packet) -> bool {
        self.ids.contains(&pkt.id)
    }
}
