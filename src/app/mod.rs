//! 应用层
//!
//! 应用安装在节点上、绑定一个端口；启动/停止/定时器都是调度器事件，
//! 执行时把应用从 `AppTable` 里取出、调用、再放回。

mod echo_client;
mod echo_server;

use std::any::Any;
use std::collections::HashMap;
use std::fmt;

pub use echo_client::{ClientState, EchoClient, EchoClientConfig};
pub use echo_server::EchoServer;

use crate::error::ConfigError;
use crate::net::{NetWorld, Network, NodeId, Packet};
use crate::sim::{Event, SimTime, Simulator, World};

/// 应用标识符（`AppTable` 下标）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AppId(pub usize);

/// 安装在节点上的应用
pub trait Application: fmt::Debug + Send + Any {
    fn name(&self) -> &str;

    /// 所在节点
    fn node(&self) -> NodeId;

    /// 绑定的本地端口
    fn port(&self) -> u16;

    fn start(&mut self, id: AppId, sim: &mut Simulator, net: &mut Network);

    fn stop(&mut self, sim: &mut Simulator, net: &mut Network);

    /// 发给本应用端口的包到达
    fn on_packet(&mut self, pkt: Packet, sim: &mut Simulator, net: &mut Network);

    /// 应用自己调度的定时器到期
    fn on_timer(&mut self, _sim: &mut Simulator, _net: &mut Network) {}

    fn as_any(&self) -> &dyn Any;
}

/// 应用表：按 `AppId` 存放，并维护 (节点, 端口) -> 应用 的绑定
#[derive(Debug, Default)]
pub struct AppTable {
    slots: Vec<Option<Box<dyn Application>>>,
    bindings: HashMap<(NodeId, u16), AppId>,
}

impl AppTable {
    pub(crate) fn insert(&mut self, app: Box<dyn Application>) -> Result<AppId, ConfigError> {
        let key = (app.node(), app.port());
        if self.bindings.contains_key(&key) {
            return Err(ConfigError::PortInUse {
                node: key.0.0,
                port: key.1,
            });
        }
        let id = AppId(self.slots.len());
        self.slots.push(Some(app));
        self.bindings.insert(key, id);
        Ok(id)
    }

    pub(crate) fn bound(&self, node: NodeId, port: u16) -> Option<AppId> {
        self.bindings.get(&(node, port)).copied()
    }

    pub(crate) fn get(&self, id: AppId) -> Option<&dyn Application> {
        self.slots.get(id.0)?.as_deref()
    }

    pub(crate) fn take(&mut self, id: AppId) -> Option<Box<dyn Application>> {
        self.slots.get_mut(id.0)?.take()
    }

    pub(crate) fn put(&mut self, id: AppId, app: Box<dyn Application>) {
        if let Some(slot) = self.slots.get_mut(id.0) {
            *slot = Some(app);
        }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

/// 在 `start` 调度启动事件，`stop` 存在时调度停止事件
pub(crate) fn schedule_lifecycle(
    app: AppId,
    sim: &mut Simulator,
    start: SimTime,
    stop: Option<SimTime>,
) {
    let start = start.max(sim.now());
    sim.schedule_at(start, StartApp { app });
    if let Some(stop) = stop {
        sim.schedule_at(stop.max(start), StopApp { app });
    }
}

fn with_app_in_world(
    world: &mut dyn World,
    app: AppId,
    sim: &mut Simulator,
    f: impl FnOnce(&mut dyn Application, &mut Simulator, &mut Network),
) {
    let w = world
        .as_any_mut()
        .downcast_mut::<NetWorld>()
        .expect("world must be NetWorld");
    w.net.with_app(app, sim, f);
}

/// 事件：启动应用
#[derive(Debug)]
pub struct StartApp {
    pub app: AppId,
}

impl Event for StartApp {
    fn execute(self: Box<Self>, sim: &mut Simulator, world: &mut dyn World) {
        let app = self.app;
        with_app_in_world(world, app, sim, |a, sim, net| a.start(app, sim, net));
    }
}

/// 事件：停止应用
#[derive(Debug)]
pub struct StopApp {
    pub app: AppId,
}

impl Event for StopApp {
    fn execute(self: Box<Self>, sim: &mut Simulator, world: &mut dyn World) {
        with_app_in_world(world, self.app, sim, |a, sim, net| a.stop(sim, net));
    }
}

/// 事件：应用定时器
#[derive(Debug)]
pub struct AppTimer {
    pub app: AppId,
}

impl Event for AppTimer {
    fn execute(self: Box<Self>, sim: &mut Simulator, world: &mut dyn World) {
        with_app_in_world(world, self.app, sim, |a, sim, net| a.on_timer(sim, net));
    }
}
