//! 仿真时间类型
//!
//! 定义仿真时间及其单位转换、字符串解析（如 `"1ms"`、`"0.5s"`）。

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// 仿真时间（纳秒）。
///
/// 无符号表示：负的时间/时延在类型层面无法构造。
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(try_from = "String", into = "String")]
pub struct SimTime(pub u64);

impl SimTime {
    pub const ZERO: SimTime = SimTime(0);
    pub const MAX: SimTime = SimTime(u64::MAX);

    pub fn from_nanos(ns: u64) -> SimTime {
        SimTime(ns)
    }
    pub fn from_micros(us: u64) -> SimTime {
        SimTime(us.saturating_mul(1_000))
    }
    pub fn from_millis(ms: u64) -> SimTime {
        SimTime(ms.saturating_mul(1_000_000))
    }
    pub fn from_secs(s: u64) -> SimTime {
        SimTime(s.saturating_mul(1_000_000_000))
    }

    /// 从浮点秒构造。
    ///
    /// 负数或非有限值属于调用方错误，直接 panic。
    pub fn from_secs_f64(s: f64) -> SimTime {
        assert!(
            s.is_finite() && s >= 0.0,
            "simulation time must be finite and non-negative, got {s}"
        );
        let ns = (s * 1e9).round();
        if ns >= u64::MAX as f64 {
            SimTime::MAX
        } else {
            SimTime(ns as u64)
        }
    }

    /// 同 `from_secs_f64`，但把负数/非有限值作为配置错误返回
    pub fn try_from_secs_f64(s: f64) -> Result<SimTime, ConfigError> {
        if !s.is_finite() || s < 0.0 {
            return Err(ConfigError::InvalidTime(s.to_string()));
        }
        Ok(SimTime::from_secs_f64(s))
    }

    pub fn as_nanos(self) -> u64 {
        self.0
    }

    pub fn as_secs_f64(self) -> f64 {
        self.0 as f64 / 1e9
    }

    pub fn saturating_add(self, rhs: SimTime) -> SimTime {
        SimTime(self.0.saturating_add(rhs.0))
    }

    pub fn saturating_sub(self, rhs: SimTime) -> SimTime {
        SimTime(self.0.saturating_sub(rhs.0))
    }
}

impl fmt::Display for SimTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ns = self.0;
        if ns == 0 {
            write!(f, "0s")
        } else if ns % 1_000_000_000 == 0 {
            write!(f, "{}s", ns / 1_000_000_000)
        } else if ns % 1_000_000 == 0 {
            write!(f, "{}ms", ns / 1_000_000)
        } else if ns % 1_000 == 0 {
            write!(f, "{}us", ns / 1_000)
        } else {
            write!(f, "{ns}ns")
        }
    }
}

/// 拆出末尾的单位后缀（字母和 `/`），数字部分可以带指数，如 `1e-3s`
pub(crate) fn split_unit(raw: &str) -> (&str, &str) {
    let num_len = raw
        .trim_end_matches(|c: char| c.is_ascii_alphabetic() || c == '/')
        .len();
    raw.split_at(num_len)
}

impl FromStr for SimTime {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (num, unit) = split_unit(s.trim());
        let value: f64 = num
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidTime(s.to_string()))?;
        if !value.is_finite() || value < 0.0 {
            return Err(ConfigError::InvalidTime(s.to_string()));
        }
        // 无单位时按秒处理（与 ns-3 的 Time 字符串一致）
        let scale = match unit.trim() {
            "" | "s" => 1e9,
            "ms" => 1e6,
            "us" => 1e3,
            "ns" => 1.0,
            "min" => 60e9,
            "h" => 3_600e9,
            _ => return Err(ConfigError::InvalidTime(s.to_string())),
        };
        Ok(SimTime::from_secs_f64(value * scale / 1e9))
    }
}

impl TryFrom<String> for SimTime {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<SimTime> for String {
    fn from(value: SimTime) -> Self {
        value.to_string()
    }
}
