//! 结构化事件记录（供外部动画/追踪工具离线回放）
//!
//! 设计目标：
//! - **结构化**：用 JSON 事件而不是解析文本日志
//! - **轻量**：只收集在内存里，写文件由调用方决定
//! - **可回放**：带拓扑元信息与逐包的发送/排队/转发/接收/丢弃事件

mod types;

pub use types::{VizEvent, VizEventKind, VizLinkInfo, VizLogger, VizNodeInfo};
