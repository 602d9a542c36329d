//! 事件句柄
//!
//! 调度事件时返回，用于取消尚未触发的事件（惰性删除）。

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use super::time::SimTime;

/// 已调度事件的句柄。
///
/// 取消只是设置共享标记；事件在出队时被跳过，不会提前从队列中移除。
/// 对已执行的事件取消是 no-op，重复取消是幂等的。
#[derive(Debug, Clone)]
pub struct EventHandle {
    seq: u64,
    at: SimTime,
    cancelled: Arc<AtomicBool>,
}

impl EventHandle {
    pub(crate) fn new(seq: u64, at: SimTime) -> (Self, Arc<AtomicBool>) {
        let flag = Arc::new(AtomicBool::new(false));
        (
            Self {
                seq,
                at,
                cancelled: Arc::clone(&flag),
            },
            flag,
        )
    }

    /// 插入序列号（同一时间戳内的确定性排序依据）
    pub fn seq(&self) -> u64 {
        self.seq
    }

    /// 计划执行时间
    pub fn at(&self) -> SimTime {
        self.at
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }
}
