//! 预置拓扑
//!
//! 只负责构建拓扑和安装应用；运行与统计由 `SimRunner` 完成。

pub mod assignment;
pub mod chain;

pub use assignment::{AssignmentApps, AssignmentOpts, build_assignment, build_assignment_runner};
pub use chain::{ChainOpts, build_chain};
