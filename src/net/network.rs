//! 网络转发
//!
//! `Network` 持有只读拓扑、静态路由表、各单向信道的队列状态、误码模型、应用表和观察者，
//! 负责逐跳转发：
//!
//! 1. 到达目的节点：通知 `on_receive`，交给绑定目的端口的应用；
//! 2. 否则查路由：不可达则丢弃（`NoRoute`）；
//! 3. 入队出方向信道：队满丢弃（`QueueOverflow`）；信道空闲则立即开始发送，
//!    `depart = now + 序列化时间`（触发 `LinkReady`），`arrive = depart + 传播时延`（触发 `DeliverPacket`）；
//! 4. 到达接收端时先问误码模型（`ErrorModel`），再继续第 1 步。

use std::collections::HashMap;
use std::net::Ipv4Addr;

use super::addr::{FIRST_EPHEMERAL_PORT, FiveTuple};
use super::deliver_packet::DeliverPacket;
use super::error_model::{ErrorModel, ErrorUnit, RateErrorModel};
use super::id::{LinkId, NodeId};
use super::link::{Channel, Direction};
use super::link_ready::LinkReady;
use super::observer::{DropReason, PacketObserver};
use super::packet::{Packet, PacketKind};
use super::routing::{Route, RoutingMetric, RoutingTable};
use super::stats::Stats;
use super::topology::Topology;
use crate::app::{AppId, AppTable, Application, EchoClient, EchoClientConfig, EchoServer};
use crate::error::ConfigError;
use crate::flow::FlowMonitor;
use crate::sim::{SimTime, Simulator};
use crate::viz::VizLogger;
use tracing::{debug, info, trace};

/// 网络层的运行配置
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct NetConfig {
    /// 误码模型随机种子
    pub seed: u64,
    pub metric: RoutingMetric,
    pub error_unit: ErrorUnit,
}

/// 网络拓扑 + 转发状态
pub struct Network {
    topo: Topology,
    routes: RoutingTable,
    channels: Vec<[Channel; 2]>,
    error_model: Box<dyn ErrorModel>,
    next_pkt_id: u64,
    next_port: HashMap<NodeId, u16>,
    pub(crate) apps: AppTable,
    observers: Vec<Box<dyn PacketObserver>>,
    pub stats: Stats,
    /// 按流统计（默认开启）
    pub flow_monitor: Option<FlowMonitor>,
    /// 结构化事件记录（默认关闭）
    pub viz: Option<VizLogger>,
}

impl Network {
    /// 基于拓扑构建网络：一次性计算路由表、为每条链路创建两个信道
    pub fn new(topo: Topology, cfg: NetConfig) -> Self {
        let routes = RoutingTable::build(&topo, cfg.metric);
        let channels = topo.links().iter().map(|l| l.make_channels()).collect();
        let error_model = Box::new(RateErrorModel::with_unit(&topo, cfg.seed, cfg.error_unit));
        Self {
            topo,
            routes,
            channels,
            error_model,
            next_pkt_id: 0,
            next_port: HashMap::new(),
            apps: AppTable::default(),
            observers: Vec::new(),
            stats: Stats::default(),
            flow_monitor: Some(FlowMonitor::default()),
            viz: None,
        }
    }

    pub fn topology(&self) -> &Topology {
        &self.topo
    }

    pub fn routes(&self) -> &RoutingTable {
        &self.routes
    }

    /// 替换误码模型（例如换成 `ListErrorModel`）
    pub fn set_error_model(&mut self, model: Box<dyn ErrorModel>) {
        self.error_model = model;
    }

    /// 以新种子重置误码模型的随机状态
    pub fn reseed_error_model(&mut self, seed: u64) {
        self.error_model.reseed(seed);
    }

    /// 注册外部观察者
    pub fn add_observer(&mut self, obs: Box<dyn PacketObserver>) {
        self.observers.push(obs);
    }

    /// 某个单向信道当前队长
    pub fn queue_len(&self, link: LinkId, dir: Direction) -> usize {
        self.channels
            .get(link.0)
            .map(|c| c[dir.index()].queue.len())
            .unwrap_or(0)
    }

    /// 为节点分配一个临时端口
    pub fn alloc_ephemeral_port(&mut self, node: NodeId) -> u16 {
        let next = self.next_port.entry(node).or_insert(FIRST_EPHEMERAL_PORT);
        let port = *next;
        *next = next.checked_add(1).unwrap_or(FIRST_EPHEMERAL_PORT);
        port
    }

    /// 安装应用：绑定端口，并在 `start` / `stop` 时刻调度启动、停止事件
    pub fn install_app(
        &mut self,
        app: Box<dyn Application>,
        sim: &mut Simulator,
        start: SimTime,
        stop: Option<SimTime>,
    ) -> Result<AppId, ConfigError> {
        if self.topo.node(app.node()).is_none() {
            return Err(ConfigError::UnknownNode(app.node().to_string()));
        }
        if let Some(stop) = stop.filter(|&s| s < start) {
            return Err(ConfigError::StopBeforeStart {
                start: start.to_string(),
                stop: stop.to_string(),
            });
        }
        let name = app.name().to_string();
        let id = self.apps.insert(app)?;
        crate::app::schedule_lifecycle(id, sim, start, stop);
        info!(app = %name, app_id = id.0, %start, stop = ?stop.map(|s| s.to_string()), "安装应用");
        Ok(id)
    }

    /// 在 `node` 上安装 echo 客户端，本地端口自动分配
    pub fn install_echo_client(
        &mut self,
        node: NodeId,
        cfg: EchoClientConfig,
        sim: &mut Simulator,
        start: SimTime,
        stop: Option<SimTime>,
    ) -> Result<AppId, ConfigError> {
        let port = self.alloc_ephemeral_port(node);
        let client = EchoClient::new(node, port, cfg)?;
        self.install_app(Box::new(client), sim, start, stop)
    }

    /// 在 `node` 的 `port` 上安装 echo 服务器
    pub fn install_echo_server(
        &mut self,
        node: NodeId,
        port: u16,
        sim: &mut Simulator,
        start: SimTime,
        stop: Option<SimTime>,
    ) -> Result<AppId, ConfigError> {
        self.install_app(Box::new(EchoServer::new(node, port)), sim, start, stop)
    }

    /// 读取具体类型的应用（用于读取应用层计数）
    pub fn app<A: Application>(&self, id: AppId) -> Option<&A> {
        self.apps.get(id)?.as_any().downcast_ref::<A>()
    }

    /// 从 `node` 发往 `dst` 时使用的源地址：出方向链路上的接口地址
    pub fn source_addr_for(&self, node: NodeId, dst: Ipv4Addr) -> Option<Ipv4Addr> {
        let via = self
            .topo
            .node_of_addr(dst)
            .and_then(|d| self.routes.next_hop(node, d))
            .and_then(|l| self.topo.interface_addr(l, node));
        via.or_else(|| self.topo.addr_of(node))
    }

    /// 创建数据包（id 单调递增）
    pub fn make_packet(
        &mut self,
        tuple: FiveTuple,
        payload_bytes: u32,
        kind: PacketKind,
        now: SimTime,
    ) -> Packet {
        let id = self.next_pkt_id;
        self.next_pkt_id = self.next_pkt_id.wrapping_add(1);
        Packet::new(id, tuple, payload_bytes, now, kind)
    }

    fn notify(&mut self, mut f: impl FnMut(&mut dyn PacketObserver)) {
        if let Some(m) = &mut self.flow_monitor {
            f(m);
        }
        if let Some(v) = &mut self.viz {
            f(v);
        }
        for o in &mut self.observers {
            f(o.as_mut());
        }
    }

    fn drop_packet(&mut self, at: NodeId, pkt: &Packet, reason: DropReason, now: SimTime) {
        debug!(pkt_id = pkt.id, node = %at, reason = reason.as_str(), "🗑️ 丢包");
        self.stats.record_drop(reason);
        self.notify(|o| o.on_drop(at, pkt, reason, now));
    }

    /// 应用层把包交给源节点的网络层
    #[tracing::instrument(skip(self, sim, pkt), fields(pkt_id = pkt.id, flow = %pkt.tuple))]
    pub fn send_from(&mut self, node: NodeId, pkt: Packet, sim: &mut Simulator) {
        let now = sim.now();
        self.stats.sent_pkts += 1;
        self.notify(|o| o.on_send(node, &pkt, now));
        self.forward_from(node, pkt, sim);
    }

    /// 从指定节点转发数据包
    #[tracing::instrument(skip(self, sim, pkt), fields(pkt_id = pkt.id, from = %from))]
    pub fn forward_from(&mut self, from: NodeId, pkt: Packet, sim: &mut Simulator) {
        let now = sim.now();
        let Some(dst) = self.topo.node_of_addr(pkt.tuple.dst) else {
            self.drop_packet(from, &pkt, DropReason::NoRoute, now);
            return;
        };

        match self.routes.route(from, dst) {
            Route::Local => {
                // 发给本机：下一刻交付，不经过链路
                trace!("目的为本节点，直接调度交付");
                sim.schedule(SimTime::ZERO, DeliverPacket { to: from, via: None, pkt });
            }
            Route::Unreachable => self.drop_packet(from, &pkt, DropReason::NoRoute, now),
            Route::Via { link, next_hop, .. } => {
                let Some(dir) = self.topo.link(link).and_then(|l| l.direction_from(from)) else {
                    self.drop_packet(from, &pkt, DropReason::NoRoute, now);
                    return;
                };
                debug!(link = %link, next_hop = %next_hop, "🚀 选择下一跳");
                self.enqueue(link, dir, pkt, sim);
            }
        }
    }

    fn enqueue(&mut self, link: LinkId, dir: Direction, pkt: Packet, sim: &mut Simulator) {
        let now = sim.now();
        let ch = &mut self.channels[link.0][dir.index()];
        let from = ch.from;
        match ch.queue.enqueue(pkt.clone()) {
            Ok(()) => {
                let q_len = ch.queue.len();
                let busy = ch.busy;
                trace!(q_len, busy, "入队");
                self.notify(|o| o.on_enqueue(link, dir, &pkt, q_len, now));
                if !busy {
                    self.start_tx(link, dir, sim);
                }
            }
            Err(dropped) => self.drop_packet(from, &dropped, DropReason::QueueOverflow, now),
        }
    }

    /// 信道空闲时出队一个包并开始序列化
    fn start_tx(&mut self, link: LinkId, dir: Direction, sim: &mut Simulator) {
        let ch = &mut self.channels[link.0][dir.index()];
        let Some(pkt) = ch.queue.dequeue() else {
            return;
        };
        let to = ch.to;
        ch.busy = true;

        let now = sim.now();
        let l = &self.topo.links()[link.0];
        let tx_time = l.tx_time(pkt.wire_bytes());
        let depart = now.saturating_add(tx_time);
        let arrive = depart.saturating_add(l.delay);

        trace!(
            pkt_id = pkt.id,
            now = ?now,
            tx_time = ?tx_time,
            depart = ?depart,
            arrive = ?arrive,
            "计算传输时间"
        );
        self.notify(|o| o.on_tx_start(link, dir, &pkt, depart, arrive, now));

        sim.schedule_at(depart, LinkReady { link_id: link, dir });
        sim.schedule_at(
            arrive,
            DeliverPacket {
                to,
                via: Some((link, dir)),
                pkt,
            },
        );
    }

    /// 一次序列化完成：信道转为空闲，队列非空则继续发送
    pub(crate) fn on_link_ready(&mut self, link: LinkId, dir: Direction, sim: &mut Simulator) {
        let ch = &mut self.channels[link.0][dir.index()];
        ch.busy = false;
        if !ch.queue.is_empty() {
            self.start_tx(link, dir, sim);
        }
    }

    /// 包到达节点 `to`；`via` 为经过的信道（本机交付时为 None）
    #[tracing::instrument(skip(self, sim, pkt), fields(pkt_id = pkt.id, to = %to))]
    pub fn deliver(
        &mut self,
        to: NodeId,
        via: Option<(LinkId, Direction)>,
        pkt: Packet,
        sim: &mut Simulator,
    ) {
        let now = sim.now();
        let corrupted = match via {
            Some((link, _)) => self.error_model.should_drop(link, &pkt),
            None => false,
        };
        if corrupted {
            self.drop_packet(to, &pkt, DropReason::ErrorModel, now);
            return;
        }

        let is_local = self
            .topo
            .node(to)
            .is_some_and(|n| n.owns_addr(pkt.tuple.dst));
        if is_local {
            self.on_delivered(to, pkt, sim);
        } else {
            debug!("未到达目的地，继续转发");
            self.stats.forwarded_pkts += 1;
            self.notify(|o| o.on_forward(to, &pkt, now));
            self.forward_from(to, pkt, sim);
        }
    }

    /// 数据包送达目的节点：更新统计，交给绑定端口的应用
    fn on_delivered(&mut self, at: NodeId, pkt: Packet, sim: &mut Simulator) {
        let now = sim.now();
        info!(pkt_id = pkt.id, node = %at, bytes = pkt.size_bytes(), "✅ 数据包送达目的地");
        self.stats.delivered_pkts += 1;
        self.stats.delivered_bytes += pkt.size_bytes() as u64;
        self.notify(|o| o.on_receive(at, &pkt, now));

        let Some(app_id) = self.apps.bound(at, pkt.tuple.dst_port) else {
            debug!(port = pkt.tuple.dst_port, "目的端口没有应用监听");
            return;
        };
        // 暂时把应用取出来，避免 &mut self 与 &mut app 的重叠借用。
        if let Some(mut app) = self.apps.take(app_id) {
            app.on_packet(pkt, sim, self);
            self.apps.put(app_id, app);
        }
    }

    /// 以 `app_id` 对应的应用执行 `f`（取出 -> 调用 -> 放回）
    pub(crate) fn with_app<R>(
        &mut self,
        app_id: AppId,
        sim: &mut Simulator,
        f: impl FnOnce(&mut dyn Application, &mut Simulator, &mut Network) -> R,
    ) -> Option<R> {
        let mut app = self.apps.take(app_id)?;
        let r = f(app.as_mut(), sim, self);
        self.apps.put(app_id, app);
        Some(r)
    }
}
