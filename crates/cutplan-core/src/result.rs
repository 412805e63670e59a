//! 單一訂單的最佳化結果

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// 求解狀態
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SolveStatus {
    /// 已證明最佳
    Optimal,
    /// 時間上限內找到的可行解
    Feasible,
}

/// 成本明細
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CostBreakdown {
    pub total: f64,
    pub setup: f64,
    pub material: f64,
    pub cutting: f64,
    pub laying: f64,
    pub waste: f64,
    pub overproduction_penalty: f64,
}

impl CostBreakdown {
    /// 依各項重新加總 `total`
    pub fn with_total(mut self) -> Self {
        self.total = self.setup
            + self.material
            + self.cutting
            + self.laying
            + self.waste
            + self.overproduction_penalty;
        self
    }

    /// 生產成本（不含準備成本與懲罰）
    pub fn production(&self) -> f64 {
        self.material + self.cutting + self.laying + self.waste
    }
}

/// 最佳化結果（建立後不再修改）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizationResult {
    /// 訂單ID
    pub order_id: String,

    /// 各方案使用層數（只列出層數 > 0）
    pub layers: BTreeMap<String, u32>,

    /// 使用到的方案（依目錄順序）
    pub used_plans: Vec<String>,

    /// 各尺碼實際產出
    pub production: BTreeMap<String, u32>,

    /// 各尺碼超出需求的件數
    pub overproduction: BTreeMap<String, f64>,

    /// 各尺碼超出允許範圍、被懲罰的件數
    pub penalized_excess: BTreeMap<String, f64>,

    /// 成本明細
    pub costs: CostBreakdown,

    /// 廢料面積（平方公尺）
    pub waste_area: f64,

    /// 耗用布料長度（公尺）
    pub fabric_meters: f64,

    /// 裁剪總周長（公尺）
    pub cut_perimeter: f64,

    /// 鋪布工時
    pub laying_hours: f64,

    /// 裁剪工時
    pub cutting_hours: f64,

    /// 套用的鬆弛係數
    pub relaxation_factor: f64,

    /// 套用的長度上限（公尺）
    pub length_cap: f64,

    /// 模型啟用的鋪布機
    pub engaged_laying: Vec<String>,

    /// 模型啟用的裁剪機
    pub engaged_cutting: Vec<String>,

    /// 求解狀態
    pub status: SolveStatus,

    /// 產出低於需求的尺碼（DemandUnmet）
    pub unmet_sizes: Vec<String>,
}

impl OptimizationResult {
    /// 創建空白結果（無任何層數）
    pub fn new(order_id: String, relaxation_factor: f64) -> Self {
        Self {
            order_id,
            layers: BTreeMap::new(),
            used_plans: Vec::new(),
            production: BTreeMap::new(),
            overproduction: BTreeMap::new(),
            penalized_excess: BTreeMap::new(),
            costs: CostBreakdown::default(),
            waste_area: 0.0,
            fabric_meters: 0.0,
            cut_perimeter: 0.0,
            laying_hours: 0.0,
            cutting_hours: 0.0,
            relaxation_factor,
            length_cap: 0.0,
            engaged_laying: Vec::new(),
            engaged_cutting: Vec::new(),
            status: SolveStatus::Optimal,
            unmet_sizes: Vec::new(),
        }
    }

    /// 建構器模式：設置工時
    pub fn with_hours(mut self, laying_hours: f64, cutting_hours: f64) -> Self {
        self.laying_hours = laying_hours;
        self.cutting_hours = cutting_hours;
        self
    }

    /// 建構器模式：設置成本
    pub fn with_costs(mut self, costs: CostBreakdown) -> Self {
        self.costs = costs;
        self
    }

    /// 總工時
    pub fn total_hours(&self) -> f64 {
        self.laying_hours + self.cutting_hours
    }

    /// 是否滿足所有尺碼需求
    pub fn demand_met(&self) -> bool {
        self.unmet_sizes.is_empty()
    }

    /// 總產出件數
    pub fn total_pieces(&self) -> u64 {
        self.production.values().map(|&q| u64::from(q)).sum()
    }
}
