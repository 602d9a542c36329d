//! 节点类型
//!
//! 节点只记录身份与连接关系：挂接的链路（按挂接顺序）、各接口地址、
//! 以及可选的坐标（只透传给外部可视化，核心不使用）。

use std::net::Ipv4Addr;

use serde::{Deserialize, Serialize};

use super::id::{LinkId, NodeId};

/// 节点类型（主机/路由器只在命名与可视化上有区别，转发逻辑相同）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    #[default]
    Host,
    Router,
}

/// 节点坐标
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
    #[serde(default)]
    pub z: f64,
}

impl Position {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y, z: 0.0 }
    }
}

/// 网络节点
#[derive(Debug, Clone)]
pub struct Node {
    id: NodeId,
    name: String,
    kind: NodeKind,
    pub(crate) position: Option<Position>,
    pub(crate) links: Vec<LinkId>,
    pub(crate) addrs: Vec<Ipv4Addr>,
}

impl Node {
    pub fn new(id: NodeId, name: impl Into<String>, kind: NodeKind) -> Self {
        Self {
            id,
            name: name.into(),
            kind,
            position: None,
            links: Vec::new(),
            addrs: Vec::new(),
        }
    }

    /// 获取节点标识符
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// 获取节点名称
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    pub fn position(&self) -> Option<Position> {
        self.position
    }

    /// 挂接的链路（按挂接顺序；自环会出现两次）
    pub fn links(&self) -> &[LinkId] {
        &self.links
    }

    /// 接口地址（与 `links` 一一对应）
    pub fn addrs(&self) -> &[Ipv4Addr] {
        &self.addrs
    }

    pub fn owns_addr(&self, addr: Ipv4Addr) -> bool {
        self.addrs.contains(&addr)
    }
}
