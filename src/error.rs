//! 错误类型
//!
//! 配置错误在构建期立即返回（不做静默截断）；运行控制错误用于约束调用顺序。
//! 丢包与路由缺失是正常仿真结果，不在这里表达。

use thiserror::Error;

/// 拓扑/场景配置错误
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("invalid data rate `{0}`")]
    InvalidDataRate(String),

    #[error("data rate must be positive")]
    ZeroDataRate,

    #[error("invalid time `{0}`")]
    InvalidTime(String),

    #[error("invalid queue size `{0}`")]
    InvalidQueueSize(String),

    #[error("error rate must lie in [0, 1], got {0}")]
    InvalidErrorRate(f64),

    #[error("invalid IPv4 address `{0}`")]
    InvalidAddress(String),

    #[error("address space exhausted after {0} links")]
    AddressSpaceExhausted(usize),

    #[error("unknown node {0}")]
    UnknownNode(String),

    #[error("duplicate node name `{0}`")]
    DuplicateNodeName(String),

    #[error("port {port} already bound on node {node}")]
    PortInUse { node: usize, port: u16 },

    #[error("echo client interval must be positive when sending more than one packet")]
    ZeroInterval,

    #[error("application stop time {stop} precedes start time {start}")]
    StopBeforeStart { start: String, stop: String },

    #[error("unsupported scenario schema version {0}")]
    UnsupportedSchema(u32),

    #[error("echo client on `{0}` sends without limit but has no stop time and the scenario has no stop_time")]
    UnboundedEchoClient(String),

    #[error("invalid scenario: {0}")]
    InvalidScenario(String),
}

/// 运行控制错误
#[derive(Debug, Error)]
pub enum RunError {
    #[error("flow report requested before the run finished")]
    NotFinished,

    #[error("simulation already ran; build a new runner to run again")]
    AlreadyRun,

    #[error(transparent)]
    Config(#[from] ConfigError),
}
