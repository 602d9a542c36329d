//! 事件 trait
//!
//! 定义仿真事件接口。事件一旦入队即归调度器所有，直到执行或被取消跳过。

use super::simulator::Simulator;
use super::world::World;

/// 事件：可被调度执行。使用 `self: Box<Self>` 以支持 move/所有权转移。
pub trait Event: Send + 'static {
    fn execute(self: Box<Self>, sim: &mut Simulator, world: &mut dyn World);

    /// 日志里显示的事件名
    fn label(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}
