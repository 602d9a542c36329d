//! UDP echo 服务器
//!
//! 运行期间把收到的每个请求原样（相同负载大小）回给请求的源地址与端口；
//! 停止后到达的包只计数、不回显。

use tracing::{debug, info};

use super::{AppId, Application};
use crate::net::{Network, NodeId, Packet, PacketKind};
use crate::sim::Simulator;

#[derive(Debug)]
pub struct EchoServer {
    node: NodeId,
    port: u16,
    running: bool,
    received: u64,
    echoed: u64,
    ignored: u64,
}

impl EchoServer {
    pub fn new(node: NodeId, port: u16) -> Self {
        Self {
            node,
            port,
            running: false,
            received: 0,
            echoed: 0,
            ignored: 0,
        }
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// 运行期间收到的请求数
    pub fn received(&self) -> u64 {
        self.received
    }

    pub fn echoed(&self) -> u64 {
        self.echoed
    }

    /// 未启动或已停止时到达、被忽略的包数
    pub fn ignored(&self) -> u64 {
        self.ignored
    }
}

impl Application for EchoServer {
    fn name(&self) -> &str {
        "echo_server"
    }

    fn node(&self) -> NodeId {
        self.node
    }

    fn port(&self) -> u16 {
        self.port
    }

    fn start(&mut self, _id: AppId, _sim: &mut Simulator, _net: &mut Network) {
        debug!(node = %self.node, port = self.port, "echo 服务器启动");
        self.running = true;
    }

    fn stop(&mut self, _sim: &mut Simulator, _net: &mut Network) {
        debug!(
            node = %self.node,
            received = self.received,
            echoed = self.echoed,
            "echo 服务器停止"
        );
        self.running = false;
    }

    fn on_packet(&mut self, pkt: Packet, sim: &mut Simulator, net: &mut Network) {
        if !self.running {
            self.ignored += 1;
            debug!(pkt_id = pkt.id, "echo 服务器未运行，忽略");
            return;
        }
        let PacketKind::EchoRequest { seq } = pkt.kind else {
            self.ignored += 1;
            return;
        };
        let now = sim.now();
        self.received += 1;
        info!(
            t = %now,
            pkt_id = pkt.id,
            seq,
            bytes = pkt.payload_bytes,
            from = %pkt.tuple.src,
            "📥 Received request"
        );

        let reply = net.make_packet(
            pkt.tuple.reversed(),
            pkt.payload_bytes,
            PacketKind::EchoReply {
                request_id: pkt.id,
                seq,
            },
            now,
        );
        self.echoed += 1;
        net.send_from(self.node, reply, sim);
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}
