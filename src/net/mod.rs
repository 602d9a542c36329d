//! 网络模拟模块
//!
//! 此模块包含网络模拟的核心组件：拓扑（节点、链路、地址）、误码模型、静态路由、
//! 逐跳转发以及转发路径上的观察者接口。

// 子模块声明
mod addr;
mod deliver_packet;
mod error_model;
mod id;
mod link;
mod link_ready;
mod net_world;
mod network;
mod network_viz;
mod node;
mod observer;
mod packet;
mod routing;
mod stats;
mod topology;

// 重新导出公共接口
pub use addr::{
    AddressAllocator, DEFAULT_ADDRESS_BASE, FIRST_EPHEMERAL_PORT, FiveTuple, Protocol, parse_addr,
};
pub use deliver_packet::DeliverPacket;
pub use error_model::{ErrorModel, ErrorUnit, ListErrorModel, RateErrorModel};
pub use id::{LinkId, NodeId};
pub use link::{Channel, DataRate, Direction, Link, LinkParams};
pub use link_ready::LinkReady;
pub use net_world::NetWorld;
pub use network::{NetConfig, Network};
pub use node::{Node, NodeKind, Position};
pub use observer::{DropReason, PacketObserver};
pub use packet::{IPV4_HEADER_BYTES, PPP_HEADER_BYTES, Packet, PacketKind, UDP_HEADER_BYTES};
pub use routing::{Cost, Route, RoutingMetric, RoutingTable};
pub use stats::Stats;
pub use topology::Topology;
