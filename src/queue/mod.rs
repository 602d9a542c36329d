//! 队列策略（Queue disciplines）
//!
//! 目前只提供 DropTail（尾丢弃）队列：容量按包数计，满时新到达的包直接丢弃，不阻塞。

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::net::Packet;

mod drop_tail;

pub use drop_tail::DropTailQueue;

/// 默认队列容量（包），与 ns-3 DropTailQueue 的 `100p` 一致
pub const DEFAULT_QUEUE_PKTS: usize = 100;

/// 队列容量（包数），字符串形式为 `"100p"` 或 `"100"`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct QueueSize {
    pub packets: usize,
}

impl QueueSize {
    pub fn packets(packets: usize) -> Self {
        Self { packets }
    }
}

impl Default for QueueSize {
    fn default() -> Self {
        Self::packets(DEFAULT_QUEUE_PKTS)
    }
}

impl fmt::Display for QueueSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}p", self.packets)
    }
}

impl FromStr for QueueSize {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = s.trim();
        let num = raw.strip_suffix('p').unwrap_or(raw);
        num.trim()
            .parse::<usize>()
            .map(QueueSize::packets)
            .map_err(|_| ConfigError::InvalidQueueSize(s.to_string()))
    }
}

impl TryFrom<String> for QueueSize {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<QueueSize> for String {
    fn from(value: QueueSize) -> Self {
        value.to_string()
    }
}

/// Packet 队列抽象
pub trait PacketQueue: fmt::Debug + Send {
    /// 入队：成功返回 Ok；若被丢弃则返回 Err(pkt)
    fn enqueue(&mut self, pkt: Packet) -> Result<(), Packet>;
    /// 出队：按队列策略返回下一个 packet
    fn dequeue(&mut self) -> Option<Packet>;

    fn len(&self) -> usize;
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
    fn bytes(&self) -> u64;
    fn capacity_pkts(&self) -> usize;
}
