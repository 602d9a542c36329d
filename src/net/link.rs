//! 链路类型
//!
//! 一条点到点链路连接两个节点，内含两个单向信道（每个方向一个发送队列）。

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::id::NodeId;
use crate::error::ConfigError;
use crate::queue::{DropTailQueue, PacketQueue, QueueSize};
use crate::sim::{SimTime, split_unit};

/// 数据速率（bit/s）
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DataRate(pub u64);

impl DataRate {
    pub fn bps(bps: u64) -> Self {
        DataRate(bps)
    }
    pub fn kbps(k: u64) -> Self {
        DataRate(k.saturating_mul(1_000))
    }
    pub fn mbps(m: u64) -> Self {
        DataRate(m.saturating_mul(1_000_000))
    }
    pub fn gbps(g: u64) -> Self {
        DataRate(g.saturating_mul(1_000_000_000))
    }

    pub fn bits_per_sec(self) -> u64 {
        self.0
    }

    /// 序列化 `bytes` 字节所需时间，向上取整到纳秒
    pub fn tx_time(self, bytes: u32) -> SimTime {
        // ceil(bytes*8 / bps) 秒 -> 纳秒
        if self.0 == 0 {
            return SimTime(u64::MAX / 4);
        }
        let bits = (bytes as u128).saturating_mul(8);
        let nanos = (bits.saturating_mul(1_000_000_000u128) + (self.0 as u128 - 1)) / self.0 as u128;
        SimTime(nanos.min(u64::MAX as u128) as u64)
    }
}

impl fmt::Display for DataRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let bps = self.0;
        if bps != 0 && bps % 1_000_000_000 == 0 {
            write!(f, "{}Gbps", bps / 1_000_000_000)
        } else if bps != 0 && bps % 1_000_000 == 0 {
            write!(f, "{}Mbps", bps / 1_000_000)
        } else if bps != 0 && bps % 1_000 == 0 {
            write!(f, "{}kbps", bps / 1_000)
        } else {
            write!(f, "{bps}bps")
        }
    }
}

impl FromStr for DataRate {
    type Err = ConfigError;

    /// 支持 `10Mbps`、`1Gbps`、`500kbps`、`64bps`、`1Mb/s`、`2MB/s` 等写法（SI 前缀）。
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (num, unit) = split_unit(s.trim());
        if unit.is_empty() {
            return Err(ConfigError::InvalidDataRate(s.to_string()));
        }
        let value: f64 = num
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidDataRate(s.to_string()))?;
        if !value.is_finite() || value < 0.0 {
            return Err(ConfigError::InvalidDataRate(s.to_string()));
        }
        let mult = match unit.trim() {
            "bps" | "b/s" => 1.0,
            "kbps" | "Kbps" | "kb/s" | "Kb/s" => 1e3,
            "Mbps" | "Mb/s" => 1e6,
            "Gbps" | "Gb/s" => 1e9,
            "Bps" | "B/s" => 8.0,
            "kBps" | "KBps" | "kB/s" | "KB/s" => 8e3,
            "MBps" | "MB/s" => 8e6,
            "GBps" | "GB/s" => 8e9,
            _ => return Err(ConfigError::InvalidDataRate(s.to_string())),
        };
        let bps = (value * mult).round();
        if bps >= u64::MAX as f64 {
            return Err(ConfigError::InvalidDataRate(s.to_string()));
        }
        Ok(DataRate(bps as u64))
    }
}

impl TryFrom<String> for DataRate {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<DataRate> for String {
    fn from(value: DataRate) -> Self {
        value.to_string()
    }
}

/// 链路参数
#[derive(Debug, Clone, PartialEq)]
pub struct LinkParams {
    pub rate: DataRate,
    pub delay: SimTime,
    pub queue: QueueSize,
    pub error_rate: f64,
}

impl LinkParams {
    pub fn new(rate: DataRate, delay: SimTime) -> Self {
        Self {
            rate,
            delay,
            ..Self::default()
        }
    }

    pub fn with_queue(mut self, packets: usize) -> Self {
        self.queue = QueueSize::packets(packets);
        self
    }

    pub fn with_error_rate(mut self, rate: f64) -> Self {
        self.error_rate = rate;
        self
    }

    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        if self.rate.0 == 0 {
            return Err(ConfigError::ZeroDataRate);
        }
        if !(0.0..=1.0).contains(&self.error_rate) {
            // NaN 也落在这里
            return Err(ConfigError::InvalidErrorRate(self.error_rate));
        }
        Ok(())
    }
}

impl Default for LinkParams {
    fn default() -> Self {
        Self {
            rate: DataRate::mbps(10),
            delay: SimTime::from_millis(1),
            queue: QueueSize::default(),
            error_rate: 0.0,
        }
    }
}

/// 单向信道的方向
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    AtoB,
    BtoA,
}

impl Direction {
    pub fn index(self) -> usize {
        match self {
            Direction::AtoB => 0,
            Direction::BtoA => 1,
        }
    }
}

/// 单向信道：一个发送队列 + 忙闲状态
#[derive(Debug)]
pub struct Channel {
    pub from: NodeId,
    pub to: NodeId,
    pub busy: bool,
    pub queue: Box<dyn PacketQueue>,
}

impl Channel {
    fn new(from: NodeId, to: NodeId, capacity: QueueSize) -> Self {
        Self {
            from,
            to,
            busy: false,
            queue: Box::new(DropTailQueue::new(capacity.packets)),
        }
    }
}

/// 网络链路（双向，属性只读）
#[derive(Debug, Clone, PartialEq)]
pub struct Link {
    pub a: NodeId,
    pub b: NodeId,
    pub rate: DataRate,
    pub delay: SimTime,
    pub queue: QueueSize,
    pub error_rate: f64,
}

impl Link {
    /// 创建新链路
    pub fn new(a: NodeId, b: NodeId, params: &LinkParams) -> Self {
        Self {
            a,
            b,
            rate: params.rate,
            delay: params.delay,
            queue: params.queue,
            error_rate: params.error_rate,
        }
    }

    /// 从 `from` 出发的方向；`from` 不是端点时返回 None
    pub fn direction_from(&self, from: NodeId) -> Option<Direction> {
        if from == self.a {
            Some(Direction::AtoB)
        } else if from == self.b {
            Some(Direction::BtoA)
        } else {
            None
        }
    }

    /// 给定一端，返回另一端
    pub fn other_end(&self, node: NodeId) -> Option<NodeId> {
        self.direction_from(node).map(|d| self.endpoints(d).1)
    }

    /// 方向对应的 (发送端, 接收端)
    pub fn endpoints(&self, dir: Direction) -> (NodeId, NodeId) {
        match dir {
            Direction::AtoB => (self.a, self.b),
            Direction::BtoA => (self.b, self.a),
        }
    }

    /// 该链路的两个单向信道（按 `Direction::index` 排列）
    pub fn make_channels(&self) -> [Channel; 2] {
        [
            Channel::new(self.a, self.b, self.queue),
            Channel::new(self.b, self.a, self.queue),
        ]
    }

    /// 计算传输指定字节数所需的时间
    pub(crate) fn tx_time(&self, bytes: u32) -> SimTime {
        self.rate.tx_time(bytes)
    }
}
