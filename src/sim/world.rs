//! 世界 trait
//!
//! 定义仿真世界接口：事件通过 `as_any_mut` 向下转型拿到具体的业务状态。

use super::simulator::Simulator;
use std::any::Any;

/// 仿真世界：由业务层实现（例如网络拓扑/路由/流统计等）。
pub trait World: Any {
    fn as_any_mut(&mut self) -> &mut dyn Any;
    fn as_any(&self) -> &dyn Any;

    /// 每个（未被取消的）事件执行后回调
    fn on_tick(&mut self, _sim: &mut Simulator) {}
}
