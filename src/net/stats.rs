//! 统计信息
//!
//! 全网汇总计数；按流的统计见 `crate::flow`。

use serde::Serialize;

use super::observer::DropReason;

/// 网络统计信息
#[derive(Debug, Default, Clone, Serialize)]
pub struct Stats {
    pub sent_pkts: u64,
    pub forwarded_pkts: u64,
    pub delivered_pkts: u64,
    pub delivered_bytes: u64,
    pub dropped_pkts: u64,
    pub dropped_queue: u64,
    pub dropped_error: u64,
    pub dropped_no_route: u64,
}

impl Stats {
    pub(crate) fn record_drop(&mut self, reason: DropReason) {
        self.dropped_pkts += 1;
        match reason {
            DropReason::QueueOverflow => self.dropped_queue += 1,
            DropReason::ErrorModel => self.dropped_error += 1,
            DropReason::NoRoute => self.dropped_no_route += 1,
            DropReason::Timeout => {}
        }
    }
}
