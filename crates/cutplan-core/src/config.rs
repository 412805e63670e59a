//! 排產參數配置

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{CutPlanError, Result};

/// 訂單排序準則（數值越小越先排程）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriorityCriterion {
    /// 距離交期的天數
    Deadline,
    /// 訂單總成本
    TotalCost,
    /// 依機台數與效率調整後的生產工時
    ProductionTime,
}

impl FromStr for PriorityCriterion {
    type Err = CutPlanError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "deadline" => Ok(Self::Deadline),
            "total_cost" => Ok(Self::TotalCost),
            "production_time" => Ok(Self::ProductionTime),
            other => Err(CutPlanError::InvalidCriterion(other.to_string())),
        }
    }
}

/// 鬆弛係數序列（嚴格遞增）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelaxationSchedule {
    pub start: f64,
    pub end: f64,
    pub step: f64,
}

impl Default for RelaxationSchedule {
    fn default() -> Self {
        Self {
            start: 1.0,
            end: 2.0,
            step: 0.1,
        }
    }
}

/// 單一序列允許的最大係數數量
pub const MAX_RELAXATION_FACTORS: usize = 1000;

impl RelaxationSchedule {
    /// 區間內的步數，步長無法整除時向下取整
    fn steps(&self) -> f64 {
        ((self.end - self.start) / self.step + 1e-9).floor()
    }

    /// 展開為係數列表，例如 `[1.0, 1.1, …, 2.0]`
    ///
    /// 不會產生大於 `end` 的係數，數量上限為 [`MAX_RELAXATION_FACTORS`]。
    pub fn factors(&self) -> Vec<f64> {
        let steps = self.steps();
        if !steps.is_finite() || steps < 0.0 {
            return vec![self.start];
        }
        let count = (steps as usize).min(MAX_RELAXATION_FACTORS - 1) + 1;
        (0..count)
            .map(|i| {
                let factor = self.start + self.step * i as f64;
                // 消除 0.1 累加的浮點殘差
                (factor * 1e9).round() / 1e9
            })
            .filter(|&factor| factor <= self.end + 1e-9)
            .collect()
    }

    fn validate(&self) -> Result<()> {
        let finite = self.start.is_finite() && self.end.is_finite() && self.step.is_finite();
        if !finite || self.start <= 0.0 || self.end < self.start || self.step <= 0.0 {
            return Err(CutPlanError::Configuration(format!(
                "無效的鬆弛係數範圍: {} 至 {}，步長 {}",
                self.start, self.end, self.step
            )));
        }
        let steps = self.steps();
        if !steps.is_finite() || steps + 1.0 > MAX_RELAXATION_FACTORS as f64 {
            return Err(CutPlanError::Configuration(format!(
                "鬆弛步長 {} 過小，係數數量超過 {MAX_RELAXATION_FACTORS}",
                self.step
            )));
        }
        Ok(())
    }
}

/// 排產配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlanningConfig {
    /// 訂單排序準則
    pub criterion: PriorityCriterion,

    /// 鋪布桌長度（公尺）
    pub table_length: f64,

    /// 每個排料圖的最大層數
    pub max_layers_per_plan: u32,

    /// 允許的超量生產比例（0.05 = 5%）
    pub overproduction_percentage: f64,

    /// 超出允許範圍的每件懲罰成本
    pub overproduction_penalty: f64,

    /// 每個班次週期的可用生產工時
    pub production_hours: f64,

    /// 布幅容差
    pub width_tolerance: f64,

    /// 是否啟用鬆弛搜尋
    pub relaxation_enabled: bool,

    /// 鬆弛係數序列
    pub relaxation: RelaxationSchedule,

    /// 單次求解時間上限（秒）
    pub solver_time_limit_secs: u64,

    /// 排料圖模式：已使用排料圖總長度上限（公尺）
    pub max_total_length: f64,

    /// 排料圖模式：每平方公尺廢料成本
    pub waste_cost_per_m2: f64,

    /// 並行求解的執行緒數（0 = 依 CPU 自動決定）
    pub worker_threads: usize,
}

impl Default for PlanningConfig {
    fn default() -> Self {
        Self {
            criterion: PriorityCriterion::Deadline,
            table_length: 12.0,
            max_layers_per_plan: 30,
            overproduction_percentage: 0.05,
            overproduction_penalty: 10.0,
            production_hours: 24.0,
            width_tolerance: 0.05,
            relaxation_enabled: true,
            relaxation: RelaxationSchedule::default(),
            solver_time_limit_secs: 600,
            max_total_length: 100.0,
            waste_cost_per_m2: 0.1,
            worker_threads: 0,
        }
    }
}

impl PlanningConfig {
    /// 創建預設配置
    pub fn new() -> Self {
        Self::default()
    }

    /// 從 JSON 載入配置
    ///
    /// 先解析排序準則，未知名稱直接回傳 `InvalidCriterion`，不會退回預設值。
    pub fn from_json_str(json: &str) -> Result<Self> {
        let value: serde_json::Value = serde_json::from_str(json)?;
        if let Some(criterion) = value.get("criterion") {
            let name = criterion
                .as_str()
                .ok_or_else(|| CutPlanError::InvalidCriterion(criterion.to_string()))?;
            name.parse::<PriorityCriterion>()?;
        }
        let config: Self = serde_json::from_value(value)?;
        config.validate()?;
        Ok(config)
    }

    /// 建構器模式：設置排序準則
    pub fn with_criterion(mut self, criterion: PriorityCriterion) -> Self {
        self.criterion = criterion;
        self
    }

    /// 建構器模式：設置鋪布桌長度
    pub fn with_table_length(mut self, length: f64) -> Self {
        self.table_length = length;
        self
    }

    /// 建構器模式：設置每個排料圖的最大層數
    pub fn with_max_layers_per_plan(mut self, layers: u32) -> Self {
        self.max_layers_per_plan = layers;
        self
    }

    /// 建構器模式：設置超量生產比例與懲罰
    pub fn with_overproduction(mut self, percentage: f64, penalty: f64) -> Self {
        self.overproduction_percentage = percentage;
        self.overproduction_penalty = penalty;
        self
    }

    /// 建構器模式：設置班次週期工時
    pub fn with_production_hours(mut self, hours: f64) -> Self {
        self.production_hours = hours;
        self
    }

    /// 建構器模式：設置布幅容差
    pub fn with_width_tolerance(mut self, tolerance: f64) -> Self {
        self.width_tolerance = tolerance;
        self
    }

    /// 建構器模式：啟用或停用鬆弛搜尋
    pub fn with_relaxation(mut self, enabled: bool) -> Self {
        self.relaxation_enabled = enabled;
        self
    }

    /// 建構器模式：設置鬆弛係數序列
    pub fn with_relaxation_schedule(mut self, schedule: RelaxationSchedule) -> Self {
        self.relaxation = schedule;
        self
    }

    /// 建構器模式：設置求解時間上限
    pub fn with_solver_time_limit_secs(mut self, secs: u64) -> Self {
        self.solver_time_limit_secs = secs;
        self
    }

    /// 建構器模式：設置排料圖總長度上限
    pub fn with_max_total_length(mut self, length: f64) -> Self {
        self.max_total_length = length;
        self
    }

    /// 建構器模式：設置並行執行緒數
    pub fn with_worker_threads(mut self, threads: usize) -> Self {
        self.worker_threads = threads;
        self
    }

    /// 本次求解要嘗試的鬆弛係數
    pub fn relaxation_factors(&self) -> Vec<f64> {
        if self.relaxation_enabled {
            self.relaxation.factors()
        } else {
            vec![1.0]
        }
    }

    /// 驗證配置
    pub fn validate(&self) -> Result<()> {
        let positive = [
            ("table_length", self.table_length),
            ("production_hours", self.production_hours),
            ("max_total_length", self.max_total_length),
        ];
        for (name, value) in positive {
            if !(value.is_finite() && value > 0.0) {
                return Err(CutPlanError::Configuration(format!("{name} 必須為正數: {value}")));
            }
        }

        let non_negative = [
            ("overproduction_percentage", self.overproduction_percentage),
            ("overproduction_penalty", self.overproduction_penalty),
            ("width_tolerance", self.width_tolerance),
            ("waste_cost_per_m2", self.waste_cost_per_m2),
        ];
        for (name, value) in non_negative {
            if !(value.is_finite() && value >= 0.0) {
                return Err(CutPlanError::Configuration(format!("{name} 不可為負數: {value}")));
            }
        }

        if self.max_layers_per_plan == 0 {
            return Err(CutPlanError::Configuration(
                "max_layers_per_plan 至少為 1".to_string(),
            ));
        }
        if self.solver_time_limit_secs == 0 {
            return Err(CutPlanError::Configuration(
                "solver_time_limit_secs 至少為 1".to_string(),
            ));
        }

        self.relaxation.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_default_config_is_valid() {
        let config = PlanningConfig::new();
        assert!(config.validate().is_ok());
        assert_eq!(config.criterion, PriorityCriterion::Deadline);
        assert!(config.relaxation_enabled);
    }

    #[test]
    fn test_config_builder() {
        let config = PlanningConfig::new()
            .with_criterion(PriorityCriterion::TotalCost)
            .with_table_length(8.0)
            .with_max_layers_per_plan(20)
            .with_overproduction(0.1, 5.0)
            .with_relaxation(false);

        assert_eq!(config.criterion, PriorityCriterion::TotalCost);
        assert_eq!(config.table_length, 8.0);
        assert_eq!(config.max_layers_per_plan, 20);
        assert_eq!(config.overproduction_percentage, 0.1);
        assert_eq!(config.relaxation_factors(), vec![1.0]);
    }

    #[test]
    fn test_default_relaxation_factors() {
        let factors = RelaxationSchedule::default().factors();
        assert_eq!(factors.len(), 11);
        assert_eq!(factors[0], 1.0);
        assert_eq!(factors[1], 1.1);
        assert_eq!(factors[3], 1.3);
        assert_eq!(factors[10], 2.0);
        assert!(factors.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_uneven_step_never_passes_end() {
        let schedule = RelaxationSchedule {
            start: 1.0,
            end: 2.0,
            step: 0.4,
        };
        assert!(schedule.validate().is_ok());
        assert_eq!(schedule.factors(), vec![1.0, 1.4, 1.8]);

        let single = RelaxationSchedule {
            start: 1.5,
            end: 1.5,
            step: 0.1,
        };
        assert_eq!(single.factors(), vec![1.5]);
    }

    #[test]
    fn test_tiny_step_is_rejected_up_front() {
        let schedule = RelaxationSchedule {
            start: 1.0,
            end: 2.0,
            step: 1e-300,
        };
        assert!(matches!(schedule.validate(), Err(CutPlanError::Configuration(_))));
        // 未經驗證也不會溢位
        assert_eq!(schedule.factors().len(), MAX_RELAXATION_FACTORS);

        let config = PlanningConfig::new().with_relaxation_schedule(schedule);
        assert!(matches!(config.validate(), Err(CutPlanError::Configuration(_))));
    }

    #[rstest]
    #[case("deadline", PriorityCriterion::Deadline)]
    #[case("total_cost", PriorityCriterion::TotalCost)]
    #[case("production_time", PriorityCriterion::ProductionTime)]
    fn test_parse_criterion(#[case] name: &str, #[case] expected: PriorityCriterion) {
        assert_eq!(name.parse::<PriorityCriterion>().unwrap(), expected);
    }

    #[test]
    fn test_unknown_criterion_is_not_defaulted() {
        let err = "fastest".parse::<PriorityCriterion>().unwrap_err();
        assert!(matches!(err, CutPlanError::InvalidCriterion(name) if name == "fastest"));

        let err = PlanningConfig::from_json_str(r#"{"criterion": "fastest"}"#).unwrap_err();
        assert!(matches!(err, CutPlanError::InvalidCriterion(_)));
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config = PlanningConfig::from_json_str(
            r#"{"criterion": "production_time", "table_length": 9.5, "relaxation_enabled": false}"#,
        )
        .unwrap();

        assert_eq!(config.criterion, PriorityCriterion::ProductionTime);
        assert_eq!(config.table_length, 9.5);
        assert!(!config.relaxation_enabled);
        assert_eq!(config.max_layers_per_plan, 30);
    }

    #[rstest]
    #[case(PlanningConfig::new().with_table_length(0.0))]
    #[case(PlanningConfig::new().with_production_hours(-1.0))]
    #[case(PlanningConfig::new().with_max_layers_per_plan(0))]
    #[case(PlanningConfig::new().with_overproduction(-0.1, 1.0))]
    #[case(PlanningConfig::new().with_relaxation_schedule(RelaxationSchedule {
        start: 1.0,
        end: 0.5,
        step: 0.1,
    }))]
    #[case(PlanningConfig::new().with_solver_time_limit_secs(0))]
    fn test_invalid_config(#[case] config: PlanningConfig) {
        assert!(matches!(config.validate(), Err(CutPlanError::Configuration(_))));
    }
}
