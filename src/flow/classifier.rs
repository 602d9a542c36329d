//! 五元组 -> 流 id

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::net::FiveTuple;

/// 流标识符，按首次出现的顺序从 1 开始分配
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct FlowId(pub u32);

impl fmt::Display for FlowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Default)]
pub struct FlowClassifier {
    ids: HashMap<FiveTuple, FlowId>,
    tuples: Vec<FiveTuple>,
}

impl FlowClassifier {
    /// 查找或分配流 id
    pub fn classify(&mut self, tuple: &FiveTuple) -> FlowId {
        if let Some(&id) = self.ids.get(tuple) {
            return id;
        }
        let id = FlowId(self.tuples.len() as u32 + 1);
        self.ids.insert(*tuple, id);
        self.tuples.push(*tuple);
        id
    }

    /// 只查找，不分配
    pub fn find(&self, tuple: &FiveTuple) -> Option<FlowId> {
        self.ids.get(tuple).copied()
    }

    pub fn tuple(&self, id: FlowId) -> Option<&FiveTuple> {
        let idx = (id.0 as usize).checked_sub(1)?;
        self.tuples.get(idx)
    }

    pub fn len(&self) -> usize {
        self.tuples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tuples.is_empty()
    }
}
