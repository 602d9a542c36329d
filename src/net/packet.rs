//! 数据包类型
//!
//! 数据包创建后不再修改：逐跳转发时，到达事件持有同一个包值，而不是新包。

use serde::{Deserialize, Serialize};

use super::addr::FiveTuple;
use crate::sim::SimTime;

/// UDP 头部字节数
pub const UDP_HEADER_BYTES: u32 = 8;
/// IPv4 头部字节数
pub const IPV4_HEADER_BYTES: u32 = 20;
/// 点到点链路（PPP）头部字节数
pub const PPP_HEADER_BYTES: u32 = 2;

/// 应用层标签
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PacketKind {
    /// echo 请求，`seq` 为客户端发送序号（从 0 开始）
    EchoRequest { seq: u64 },
    /// echo 回包，`request_id` 为被回显的请求包 id
    EchoReply { request_id: u64, seq: u64 },
}

/// 网络数据包
#[derive(Debug, Clone, PartialEq)]
pub struct Packet {
    pub id: u64,
    pub tuple: FiveTuple,
    pub payload_bytes: u32,
    pub created_at: SimTime,
    pub kind: PacketKind,
}

impl Packet {
    pub fn new(
        id: u64,
        tuple: FiveTuple,
        payload_bytes: u32,
        created_at: SimTime,
        kind: PacketKind,
    ) -> Self {
        Self {
            id,
            tuple,
            payload_bytes,
            created_at,
            kind,
        }
    }

    /// IP 层大小（负载 + UDP 头 + IPv4 头），流统计按此计字节
    pub fn size_bytes(&self) -> u32 {
        self.payload_bytes
            .saturating_add(UDP_HEADER_BYTES)
            .saturating_add(IPV4_HEADER_BYTES)
    }

    /// 链路上实际序列化的字节数（含 PPP 头）
    pub fn wire_bytes(&self) -> u32 {
        self.size_bytes().saturating_add(PPP_HEADER_BYTES)
    }

    pub fn is_reply(&self) -> bool {
        matches!(self.kind, PacketKind::EchoReply { .. })
    }
}
