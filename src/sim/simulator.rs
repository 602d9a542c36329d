//! 仿真器
//!
//! 定义事件驱动仿真器，维护当前时间与事件队列。
//!
//! 事件按 `(时间戳, 插入序列号)` 全序执行，相同输入保证相同的执行顺序。
//! 取消采用惰性删除：只设置标记，出队时跳过。

use super::event::Event;
use super::handle::EventHandle;
use super::scheduled_event::ScheduledEvent;
use super::time::SimTime;
use super::world::World;
use std::collections::BinaryHeap;
use tracing::{debug, info, trace};

/// 事件驱动仿真器：维护当前时间与事件队列。
#[derive(Default)]
pub struct Simulator {
    now: SimTime,
    next_seq: u64,
    q: BinaryHeap<ScheduledEvent>,
    stop_requested: bool,
    executed: u64,
    skipped: u64,
}

impl Simulator {
    /// 获取当前仿真时间
    pub fn now(&self) -> SimTime {
        self.now
    }

    /// 在 `now + delay` 时刻调度事件
    pub fn schedule<E: Event>(&mut self, delay: SimTime, ev: E) -> EventHandle {
        let at = self.now.saturating_add(delay);
        self.schedule_at(at, ev)
    }

    /// 调度事件在指定（绝对）时间执行
    ///
    /// # Panics
    ///
    /// `at` 早于当前时间时 panic：调度到过去等价于负时延，属于调用方 bug。
    #[tracing::instrument(skip(self, ev), fields(event_type = std::any::type_name::<E>(), schedule_at = ?at))]
    pub fn schedule_at<E: Event>(&mut self, at: SimTime, ev: E) -> EventHandle {
        assert!(
            at >= self.now,
            "cannot schedule {} at {:?}: earlier than now ({:?})",
            std::any::type_name::<E>(),
            at,
            self.now
        );
        let seq = self.next_seq;
        trace!(now = ?self.now, seq, "调度事件");

        self.next_seq = self.next_seq.wrapping_add(1);
        let (handle, cancelled) = EventHandle::new(seq, at);
        self.q.push(ScheduledEvent {
            at,
            seq,
            cancelled,
            ev: Box::new(ev),
        });

        debug!(queue_size = self.q.len(), "事件已加入队列");
        handle
    }

    /// 取消事件；已执行或已取消的事件上调用为 no-op。
    pub fn cancel(&mut self, handle: &EventHandle) {
        if !handle.is_cancelled() {
            trace!(seq = handle.seq(), at = ?handle.at(), "取消事件");
        }
        handle.cancel();
    }

    /// 请求停止：当前正在执行的事件结束后，运行循环退出。
    pub fn stop(&mut self) {
        debug!(now = ?self.now, "请求停止仿真");
        self.stop_requested = true;
    }

    /// 队列中尚未取消的事件数
    pub fn pending(&self) -> usize {
        self.q.iter().filter(|e| !e.is_cancelled()).count()
    }

    /// 已请求停止，或没有任何待执行事件
    pub fn is_finished(&self) -> bool {
        self.stop_requested || self.q.iter().all(|e| e.is_cancelled())
    }

    /// 已执行的事件数
    pub fn executed(&self) -> u64 {
        self.executed
    }

    /// 因取消而被跳过的事件数
    pub fn skipped(&self) -> u64 {
        self.skipped
    }

    /// 运行直到事件队列为空或到达 `until`（恰好在 `until` 的事件会执行）。
    #[tracing::instrument(skip(self, world))]
    pub fn run_until(&mut self, until: SimTime, world: &mut dyn World) {
        debug!(now = ?self.now, queue_size = self.q.len(), "开始运行直到 until");
        while !self.stop_requested {
            match self.q.peek() {
                Some(top) if top.at <= until => {}
                _ => break,
            }
            let item = self.q.pop().expect("peek then pop");
            self.dispatch(item, world);
        }
        if !self.stop_requested {
            self.now = self.now.max(until);
        }
    }

    /// 运行所有事件直到队列为空（或被 `stop` 打断）。
    #[tracing::instrument(skip(self, world))]
    pub fn run(&mut self, world: &mut dyn World) {
        info!("▶️  开始运行仿真");
        debug!(now = ?self.now, queue_size = self.q.len(), "初始状态");

        while !self.stop_requested {
            let Some(item) = self.q.pop() else {
                break;
            };
            self.dispatch(item, world);
        }

        info!(
            total_events = self.executed,
            skipped_events = self.skipped,
            final_time = ?self.now,
            "✅ 仿真完成"
        );
    }

    fn dispatch(&mut self, item: ScheduledEvent, world: &mut dyn World) {
        if item.is_cancelled() {
            self.skipped += 1;
            trace!(seq = item.seq, at = ?item.at, "跳过已取消事件");
            return;
        }
        self.now = item.at;
        self.executed += 1;

        debug!(
            event_num = self.executed,
            now = ?self.now,
            seq = item.seq,
            event_type = item.ev.label(),
            remaining_queue = self.q.len(),
            "执行事件"
        );

        item.ev.execute(self, world);
        world.on_tick(self);
    }
}
