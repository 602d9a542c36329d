//! 拓扑模型
//!
//! 节点与点到点链路组成的无向多重图（允许自环和平行链路）。
//! 构建完成后交给 `Network`，之后只读。

use std::collections::HashMap;
use std::net::Ipv4Addr;

use tracing::debug;

use super::addr::AddressAllocator;
use super::id::{LinkId, NodeId};
use super::link::{Link, LinkParams};
use super::node::{Node, NodeKind, Position};
use crate::error::ConfigError;

#[derive(Debug, Clone, Default)]
pub struct Topology {
    nodes: Vec<Node>,
    links: Vec<Link>,
    /// 每条链路两端地址 (a 端, b 端)
    link_addrs: Vec<(Ipv4Addr, Ipv4Addr)>,
    addr_owner: HashMap<Ipv4Addr, NodeId>,
    alloc: AddressAllocator,
}

impl Topology {
    pub fn new() -> Self {
        Self::default()
    }

    /// 使用自定义地址基（第 0 条链路的 /24 子网）
    pub fn with_address_base(base: Ipv4Addr) -> Self {
        Self {
            alloc: AddressAllocator::new(base),
            ..Self::default()
        }
    }

    /// 添加匿名节点（主机）
    pub fn add_node(&mut self) -> NodeId {
        let name = format!("n{}", self.nodes.len());
        self.push_node(name, NodeKind::Host)
    }

    /// 添加主机节点
    pub fn add_host(&mut self, name: impl Into<String>) -> NodeId {
        self.push_node(name.into(), NodeKind::Host)
    }

    /// 添加路由器节点
    pub fn add_router(&mut self, name: impl Into<String>) -> NodeId {
        self.push_node(name.into(), NodeKind::Router)
    }

    fn push_node(&mut self, name: String, kind: NodeKind) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node::new(id, name, kind));
        id
    }

    pub fn set_position(&mut self, node: NodeId, pos: Position) -> Result<(), ConfigError> {
        let n = self
            .nodes
            .get_mut(node.0)
            .ok_or_else(|| ConfigError::UnknownNode(node.to_string()))?;
        n.position = Some(pos);
        Ok(())
    }

    /// 连接两个节点（一条双向点到点链路），并为两端分配接口地址
    pub fn add_link(
        &mut self,
        a: NodeId,
        b: NodeId,
        params: LinkParams,
    ) -> Result<LinkId, ConfigError> {
        for n in [a, b] {
            if n.0 >= self.nodes.len() {
                return Err(ConfigError::UnknownNode(n.to_string()));
            }
        }
        params.validate()?;

        let id = LinkId(self.links.len());
        let (addr_a, addr_b) = self.alloc.link_pair(id.0)?;

        self.links.push(Link::new(a, b, &params));
        self.link_addrs.push((addr_a, addr_b));
        self.addr_owner.insert(addr_a, a);
        self.addr_owner.insert(addr_b, b);

        let na = &mut self.nodes[a.0];
        na.links.push(id);
        na.addrs.push(addr_a);
        let nb = &mut self.nodes[b.0];
        nb.links.push(id);
        nb.addrs.push(addr_b);

        debug!(
            link = %id,
            a = %a,
            b = %b,
            %addr_a,
            %addr_b,
            rate = %params.rate,
            delay = %params.delay,
            queue = %params.queue,
            error_rate = params.error_rate,
            "添加链路"
        );
        Ok(id)
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0)
    }

    pub fn link(&self, id: LinkId) -> Option<&Link> {
        self.links.get(id.0)
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn links(&self) -> &[Link] {
        &self.links
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn find_node(&self, name: &str) -> Option<NodeId> {
        self.nodes.iter().find(|n| n.name() == name).map(Node::id)
    }

    /// `node` 的所有 (链路, 邻居)，按挂接顺序
    pub fn neighbors(&self, node: NodeId) -> impl Iterator<Item = (LinkId, NodeId)> + '_ {
        self.nodes
            .get(node.0)
            .map(|n| n.links.as_slice())
            .unwrap_or(&[])
            .iter()
            .filter_map(move |&l| Some((l, self.links[l.0].other_end(node)?)))
    }

    /// 地址所属节点
    pub fn node_of_addr(&self, addr: Ipv4Addr) -> Option<NodeId> {
        self.addr_owner.get(&addr).copied()
    }

    /// 节点的首个接口地址（应用层默认源地址）
    pub fn addr_of(&self, node: NodeId) -> Option<Ipv4Addr> {
        self.nodes.get(node.0)?.addrs.first().copied()
    }

    /// `node` 在 `link` 上的接口地址
    pub fn interface_addr(&self, link: LinkId, node: NodeId) -> Option<Ipv4Addr> {
        let l = self.links.get(link.0)?;
        let (addr_a, addr_b) = self.link_addrs[link.0];
        if node == l.a {
            Some(addr_a)
        } else if node == l.b {
            Some(addr_b)
        } else {
            None
        }
    }
}
