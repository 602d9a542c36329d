//! 按流统计
//!
//! 以五元组区分流；`FlowMonitor` 作为转发路径的观察者记录每个包的发送、转发、接收与丢弃，
//! 仿真结束后由 `report()` 汇总出每条流的吞吐、时延与抖动。

mod classifier;
mod monitor;
mod report;

pub use classifier::{FlowClassifier, FlowId};
pub use monitor::{DEFAULT_MAX_PER_HOP_DELAY, FlowMonitor, FlowStats};
pub use report::{FlowReport, FlowSummary};
