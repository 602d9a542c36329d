//! 地址与五元组
//!
//! 每条点到点链路分配一个 /24 子网：端点 `a` 取 `.1`，端点 `b` 取 `.2`。

use std::fmt;
use std::net::Ipv4Addr;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// 默认地址基：第 0 条链路使用 10.1.1.0/24
pub const DEFAULT_ADDRESS_BASE: Ipv4Addr = Ipv4Addr::new(10, 1, 1, 0);

/// 第一个临时端口（ns-3 从 49152 起分配，首个分配值为 49153）
pub const FIRST_EPHEMERAL_PORT: u16 = 49153;

/// IP 协议号
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Protocol {
    Udp,
    Tcp,
}

impl Protocol {
    pub fn number(self) -> u8 {
        match self {
            Protocol::Udp => 17,
            Protocol::Tcp => 6,
        }
    }
}

/// 流的五元组（也是流统计的 key）
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct FiveTuple {
    pub src: Ipv4Addr,
    pub dst: Ipv4Addr,
    pub protocol: Protocol,
    pub src_port: u16,
    pub dst_port: u16,
}

impl FiveTuple {
    /// 反方向的五元组（echo 回包）
    pub fn reversed(&self) -> FiveTuple {
        FiveTuple {
            src: self.dst,
            dst: self.src,
            protocol: self.protocol,
            src_port: self.dst_port,
            dst_port: self.src_port,
        }
    }
}

impl fmt::Display for FiveTuple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{} -> {}:{} ({})",
            self.src,
            self.src_port,
            self.dst,
            self.dst_port,
            self.protocol.number()
        )
    }
}

/// 解析 IPv4 地址字符串
pub fn parse_addr(s: &str) -> Result<Ipv4Addr, ConfigError> {
    s.trim()
        .parse()
        .map_err(|_| ConfigError::InvalidAddress(s.to_string()))
}

/// 按链路序号分配子网
#[derive(Debug, Clone)]
pub struct AddressAllocator {
    base: u32,
}

impl Default for AddressAllocator {
    fn default() -> Self {
        Self::new(DEFAULT_ADDRESS_BASE)
    }
}

impl AddressAllocator {
    pub fn new(base: Ipv4Addr) -> Self {
        Self {
            base: u32::from(base) & 0xFFFF_FF00,
        }
    }

    /// 第 `index` 条链路两端的地址 `(a, b)`
    pub fn link_pair(&self, index: usize) -> Result<(Ipv4Addr, Ipv4Addr), ConfigError> {
        let offset = u32::try_from(index)
            .ok()
            .and_then(|i| i.checked_mul(256))
            .ok_or(ConfigError::AddressSpaceExhausted(index))?;
        let net = self
            .base
            .checked_add(offset)
            .ok_or(ConfigError::AddressSpaceExhausted(index))?;
        Ok((Ipv4Addr::from(net + 1), Ipv4Addr::from(net + 2)))
    }
}
