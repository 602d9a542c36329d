//! 数据包到达事件
//!
//! 定义网络模拟中的数据包到达（交付给某个节点）事件。

use super::id::{LinkId, NodeId};
use super::link::Direction;
use super::net_world::NetWorld;
use super::packet::Packet;
use crate::sim::{Event, Simulator, World};
use tracing::{debug, trace};

/// 事件：把一个 packet 交给某个节点处理。
///
/// `via` 为刚经过的单向信道；本机交付（发给自己）时为 None，不经过误码模型。
#[derive(Debug)]
pub struct DeliverPacket {
    pub to: NodeId,
    pub via: Option<(LinkId, Direction)>,
    pub pkt: Packet,
}

impl Event for DeliverPacket {
    #[tracing::instrument(skip(self, sim, world), fields(pkt_id = self.pkt.id, to = %self.to))]
    fn execute(self: Box<Self>, sim: &mut Simulator, world: &mut dyn World) {
        let DeliverPacket { to, via, pkt } = *self;

        debug!(
            pkt_id = pkt.id,
            size_bytes = pkt.size_bytes(),
            dst = %pkt.tuple.dst,
            via = ?via,
            now = ?sim.now(),
            "📨 数据包到达节点"
        );

        let w = world
            .as_any_mut()
            .downcast_mut::<NetWorld>()
            .expect("world must be NetWorld");
        w.net.deliver(to, via, pkt, sim);

        trace!("DeliverPacket::execute 完成");
    }
}
