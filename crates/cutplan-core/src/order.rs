//! 訂單模型

use std::collections::BTreeMap;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// 客戶訂單
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    /// 訂單ID
    pub id: String,

    /// 各尺碼需求件數
    pub demand: BTreeMap<String, u32>,

    /// 交期
    pub deadline: NaiveDateTime,
}

impl Order {
    /// 創建新的訂單
    pub fn new(id: String, deadline: NaiveDateTime) -> Self {
        Self {
            id,
            demand: BTreeMap::new(),
            deadline,
        }
    }

    /// 建構器模式：設置某尺碼需求
    pub fn with_demand(mut self, size: &str, quantity: u32) -> Self {
        self.demand.insert(size.to_string(), quantity);
        self
    }

    /// 建構器模式：一次設置多個尺碼需求
    pub fn with_demands<I, S>(mut self, demands: I) -> Self
    where
        I: IntoIterator<Item = (S, u32)>,
        S: Into<String>,
    {
        self.demand
            .extend(demands.into_iter().map(|(size, qty)| (size.into(), qty)));
        self
    }

    /// 某尺碼需求件數（未列出的尺碼為 0）
    pub fn demand_for(&self, size: &str) -> u32 {
        self.demand.get(size).copied().unwrap_or(0)
    }

    /// 總需求件數
    pub fn total_pieces(&self) -> u64 {
        self.demand.values().map(|&q| u64::from(q)).sum()
    }
}
