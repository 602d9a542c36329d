//! 数据包观察者
//!
//! 转发路径在发送/转发/接收/丢弃等时刻通知所有已注册的观察者；
//! 流统计与可视化记录都是观察者，外部追踪器也可以注册自己的实现。

use serde::{Deserialize, Serialize};

use super::id::{LinkId, NodeId};
use super::link::Direction;
use super::packet::Packet;
use crate::sim::SimTime;

/// 丢包原因
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DropReason {
    /// 发送队列已满
    QueueOverflow,
    /// 误码模型判定丢弃
    ErrorModel,
    /// 没有到目的地址的路由
    NoRoute,
    /// 在途时间超过上限（流统计判定）
    Timeout,
}

impl DropReason {
    pub fn as_str(self) -> &'static str {
        match self {
            DropReason::QueueOverflow => "queue_overflow",
            DropReason::ErrorModel => "error_model",
            DropReason::NoRoute => "no_route",
            DropReason::Timeout => "timeout",
        }
    }
}

/// 转发路径事件的观察者；所有方法默认为空实现
#[allow(unused_variables)]
pub trait PacketObserver: Send {
    /// 包在源节点交给网络层
    fn on_send(&mut self, node: NodeId, pkt: &Packet, t: SimTime) {}

    /// 包到达中间节点、即将继续转发
    fn on_forward(&mut self, node: NodeId, pkt: &Packet, t: SimTime) {}

    /// 包到达目的节点
    fn on_receive(&mut self, node: NodeId, pkt: &Packet, t: SimTime) {}

    /// 包在 `node` 被丢弃
    fn on_drop(&mut self, node: NodeId, pkt: &Packet, reason: DropReason, t: SimTime) {}

    /// 包进入某个单向信道的发送队列；`q_len` 为入队后的队长
    fn on_enqueue(&mut self, link: LinkId, dir: Direction, pkt: &Packet, q_len: usize, t: SimTime) {}

    /// 包开始在信道上序列化
    fn on_tx_start(
        &mut self,
        link: LinkId,
        dir: Direction,
        pkt: &Packet,
        depart: SimTime,
        arrive: SimTime,
        t: SimTime,
    ) {
    }
}
