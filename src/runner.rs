//! 运行控制
//!
//! `SimRunner` 把调度器和网络世界绑在一起：先安装应用，再 `configure` 种子与停止时间，
//! `run` 一次，最后取流统计报告。报告只能在运行结束后获取。

use tracing::info;

use crate::error::RunError;
use crate::flow::{DEFAULT_MAX_PER_HOP_DELAY, FlowReport};
use crate::net::{NetConfig, NetWorld, Network, Stats, Topology};
use crate::sim::{SimTime, Simulator};

pub struct SimRunner {
    sim: Simulator,
    world: NetWorld,
    seed: u64,
    stop_time: Option<SimTime>,
    max_delay: SimTime,
    finished: bool,
}

impl SimRunner {
    pub fn new(topo: Topology, cfg: NetConfig) -> Self {
        Self::from_network(Network::new(topo, cfg), cfg.seed)
    }

    pub fn from_network(net: Network, seed: u64) -> Self {
        Self {
            sim: Simulator::default(),
            world: NetWorld::new(net),
            seed,
            stop_time: None,
            max_delay: DEFAULT_MAX_PER_HOP_DELAY,
            finished: false,
        }
    }

    /// 设置误码模型种子与停止时间（停止时刻恰好到期的事件仍会执行）
    pub fn configure(&mut self, seed: u64, stop_time: SimTime) -> &mut Self {
        self.seed = seed;
        self.stop_time = Some(stop_time);
        self.world.net.reseed_error_model(seed);
        self
    }

    /// 运行结束时判定丢失所用的在途时长上限
    pub fn set_max_delay(&mut self, max_delay: SimTime) -> &mut Self {
        self.max_delay = max_delay;
        self
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn stop_time(&self) -> Option<SimTime> {
        self.stop_time
    }

    pub fn sim(&self) -> &Simulator {
        &self.sim
    }

    pub fn net(&self) -> &Network {
        &self.world.net
    }

    pub fn net_mut(&mut self) -> &mut Network {
        &mut self.world.net
    }

    /// 同时借出调度器和网络（安装应用时需要）
    pub fn parts_mut(&mut self) -> (&mut Simulator, &mut Network) {
        (&mut self.sim, &mut self.world.net)
    }

    pub fn stats(&self) -> &Stats {
        &self.world.net.stats
    }

    /// 运行一次：有停止时间则运行到该时间，否则运行到事件队列为空
    pub fn run(&mut self) -> Result<(), RunError> {
        if self.finished {
            return Err(RunError::AlreadyRun);
        }
        info!(seed = self.seed, stop = ?self.stop_time.map(|t| t.to_string()), "▶️  开始运行场景");

        self.world.net.emit_viz_meta();
        match self.stop_time {
            Some(stop) => self.sim.run_until(stop, &mut self.world),
            None => self.sim.run(&mut self.world),
        }

        let now = self.sim.now();
        let max_delay = self.max_delay;
        if let Some(m) = &mut self.world.net.flow_monitor {
            m.check_for_lost_packets(now, max_delay);
        }
        self.finished = true;

        let st = &self.world.net.stats;
        info!(
            now = %now,
            sent = st.sent_pkts,
            delivered = st.delivered_pkts,
            dropped = st.dropped_pkts,
            pending_events = self.sim.pending(),
            "✅ 场景运行结束"
        );
        Ok(())
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// 流统计报告；运行结束前调用返回 `RunError::NotFinished`
    pub fn report(&self) -> Result<FlowReport, RunError> {
        if !self.finished {
            return Err(RunError::NotFinished);
        }
        Ok(self
            .world
            .net
            .flow_monitor
            .as_ref()
            .map(|m| m.report())
            .unwrap_or_default())
    }
}
