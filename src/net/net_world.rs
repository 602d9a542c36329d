//! 网络世界实现
//!
//! 定义网络仿真的世界（World）实现，持有网络。

use super::network::Network;
use crate::sim::World;
use std::any::Any;

/// 网络世界：事件通过向下转型拿到其中的 `Network`。
pub struct NetWorld {
    pub net: Network,
}

impl NetWorld {
    pub fn new(net: Network) -> Self {
        Self { net }
    }
}

impl World for NetWorld {
    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
