//! UDP echo 客户端
//!
//! 启动后立即发送第一个请求，之后每隔 `interval` 发送一个，直到发满 `max_packets`
//! 或者应用被停止。停止会取消尚未触发的发送定时器。
//!
//! 状态机：`Idle → Sending → WaitingResponse → Sending | Idle`。

use std::collections::HashMap;
use std::net::Ipv4Addr;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::{AppId, AppTimer, Application};
use crate::error::ConfigError;
use crate::net::{FiveTuple, Network, NodeId, Packet, PacketKind, Protocol};
use crate::sim::{EventHandle, SimTime, Simulator};

/// echo 客户端配置
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EchoClientConfig {
    /// 服务器地址
    pub remote: Ipv4Addr,
    pub remote_port: u16,
    /// 最多发送的请求数；0 表示不限
    pub max_packets: u32,
    /// 发送间隔
    pub interval: SimTime,
    /// 每个请求的负载字节数
    pub packet_size: u32,
}

impl EchoClientConfig {
    pub fn new(remote: Ipv4Addr, remote_port: u16) -> Self {
        Self {
            remote,
            remote_port,
            max_packets: 1,
            interval: SimTime::from_secs(1),
            packet_size: 1024,
        }
    }

    pub fn with_max_packets(mut self, n: u32) -> Self {
        self.max_packets = n;
        self
    }

    pub fn with_interval(mut self, interval: SimTime) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_packet_size(mut self, bytes: u32) -> Self {
        self.packet_size = bytes;
        self
    }

    /// 多于一个请求时，间隔必须为正（否则同一时刻会无限发送）
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.interval == SimTime::ZERO && self.max_packets != 1 {
            return Err(ConfigError::ZeroInterval);
        }
        Ok(())
    }
}

/// 客户端状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ClientState {
    #[default]
    Idle,
    /// 正在发送；`remaining` 为包括当前这个在内还能发送的请求数（None 表示不限）
    Sending { remaining: Option<u32> },
    /// 已发出请求，等待回包或下一次发送定时器
    WaitingResponse { remaining: Option<u32> },
}

#[derive(Debug)]
pub struct EchoClient {
    node: NodeId,
    port: u16,
    cfg: EchoClientConfig,
    id: Option<AppId>,
    state: ClientState,
    next_send: Option<EventHandle>,
    /// 请求序号 -> 发送时间
    outstanding: HashMap<u64, SimTime>,
    sent: u64,
    replies: u64,
    rtts: Vec<SimTime>,
}

impl EchoClient {
    pub fn new(node: NodeId, port: u16, cfg: EchoClientConfig) -> Result<Self, ConfigError> {
        cfg.validate()?;
        Ok(Self {
            node,
            port,
            cfg,
            id: None,
            state: ClientState::Idle,
            next_send: None,
            outstanding: HashMap::new(),
            sent: 0,
            replies: 0,
            rtts: Vec::new(),
        })
    }

    pub fn config(&self) -> &EchoClientConfig {
        &self.cfg
    }

    pub fn state(&self) -> ClientState {
        self.state
    }

    /// 已发送的请求数
    pub fn sent(&self) -> u64 {
        self.sent
    }

    /// 已收到的回包数
    pub fn replies(&self) -> u64 {
        self.replies
    }

    /// 每个回包的往返时间（按到达顺序）
    pub fn rtts(&self) -> &[SimTime] {
        &self.rtts
    }

    fn send_one(&mut self, remaining: Option<u32>, sim: &mut Simulator, net: &mut Network) {
        let now = sim.now();
        let src = net
            .source_addr_for(self.node, self.cfg.remote)
            .unwrap_or_else(|| {
                warn!(node = %self.node, "节点没有接口地址，使用 0.0.0.0 作为源地址");
                Ipv4Addr::UNSPECIFIED
            });
        let tuple = FiveTuple {
            src,
            dst: self.cfg.remote,
            protocol: Protocol::Udp,
            src_port: self.port,
            dst_port: self.cfg.remote_port,
        };
        let seq = self.sent;
        let pkt = net.make_packet(
            tuple,
            self.cfg.packet_size,
            PacketKind::EchoRequest { seq },
            now,
        );
        info!(
            t = %now,
            pkt_id = pkt.id,
            seq,
            bytes = self.cfg.packet_size,
            to = %self.cfg.remote,
            "📤 Packet Sent"
        );
        self.sent += 1;
        self.outstanding.insert(seq, now);
        net.send_from(self.node, pkt, sim);

        let remaining = remaining.map(|r| r.saturating_sub(1));
        self.state = ClientState::WaitingResponse { remaining };
        if remaining == Some(0) {
            self.next_send = None;
            return;
        }
        if let Some(id) = self.id {
            self.next_send = Some(sim.schedule(self.cfg.interval, AppTimer { app: id }));
        }
    }

    fn settle_if_done(&mut self) {
        if let ClientState::WaitingResponse { remaining: Some(0) } = self.state {
            if self.outstanding.is_empty() {
                debug!(node = %self.node, "所有请求都已收到回包");
                self.state = ClientState::Idle;
            }
        }
    }
}

impl Application for EchoClient {
    fn name(&self) -> &str {
        "echo_client"
    }

    fn node(&self) -> NodeId {
        self.node
    }

    fn port(&self) -> u16 {
        self.port
    }

    fn start(&mut self, id: AppId, sim: &mut Simulator, net: &mut Network) {
        self.id = Some(id);
        let remaining = match self.cfg.max_packets {
            0 => None,
            n => Some(n),
        };
        debug!(node = %self.node, port = self.port, ?remaining, "echo 客户端启动");
        self.state = ClientState::Sending { remaining };
        self.send_one(remaining, sim, net);
    }

    fn stop(&mut self, sim: &mut Simulator, _net: &mut Network) {
        if let Some(h) = self.next_send.take() {
            sim.cancel(&h);
        }
        debug!(
            node = %self.node,
            sent = self.sent,
            replies = self.replies,
            "echo 客户端停止"
        );
        self.state = ClientState::Idle;
    }

    fn on_timer(&mut self, sim: &mut Simulator, net: &mut Network) {
        self.next_send = None;
        let ClientState::WaitingResponse { remaining } = self.state else {
            return;
        };
        self.state = ClientState::Sending { remaining };
        self.send_one(remaining, sim, net);
    }

    fn on_packet(&mut self, pkt: Packet, sim: &mut Simulator, _net: &mut Network) {
        let PacketKind::EchoReply { seq, .. } = pkt.kind else {
            debug!(pkt_id = pkt.id, "客户端收到非回包，忽略");
            return;
        };
        let now = sim.now();
        self.replies += 1;
        if let Some(sent_at) = self.outstanding.remove(&seq) {
            self.rtts.push(now.saturating_sub(sent_at));
        }
        info!(
            t = %now,
            pkt_id = pkt.id,
            seq,
            bytes = pkt.payload_bytes,
            from = %pkt.tuple.src,
            "📥 Received reply"
        );
        self.settle_if_done();
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}
