//! 訂單優先順序

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use cutplan_core::{
    CutPlanError, OptimizationResult, Order, PriorityCriterion, ResourceCategory, ResourcePool,
    Result,
};

const SECONDS_PER_DAY: i64 = 86_400;

/// 排序後的訂單
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedOrder {
    pub order_id: String,
    /// 分數越小越先排程
    pub score: f64,
}

/// 優先權計算器
pub struct PriorityRanker<'a> {
    criterion: PriorityCriterion,
    planning_start: NaiveDateTime,
    resources: &'a ResourcePool,
}

impl<'a> PriorityRanker<'a> {
    pub fn new(
        criterion: PriorityCriterion,
        planning_start: NaiveDateTime,
        resources: &'a ResourcePool,
    ) -> Self {
        Self {
            criterion,
            planning_start,
            resources,
        }
    }

    /// 計算單一訂單的分數
    pub fn rank(&self, order: &Order, result: &OptimizationResult) -> Result<f64> {
        match self.criterion {
            PriorityCriterion::Deadline => {
                let seconds = (order.deadline - self.planning_start).num_seconds();
                Ok(seconds.div_euclid(SECONDS_PER_DAY) as f64)
            }
            PriorityCriterion::TotalCost => Ok(result.costs.total),
            PriorityCriterion::ProductionTime => {
                let laying = self.category_throughput(ResourceCategory::Laying)?;
                let cutting = self.category_throughput(ResourceCategory::Cutting)?;
                Ok(result.laying_hours / laying + result.cutting_hours / cutting)
            }
        }
    }

    /// 依分數遞增排序，同分維持輸入順序
    pub fn sequence(&self, items: &[(&Order, &OptimizationResult)]) -> Result<Vec<RankedOrder>> {
        let mut ranked = items
            .iter()
            .map(|(order, result)| {
                Ok(RankedOrder {
                    order_id: order.id.clone(),
                    score: self.rank(order, result)?,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        ranked.sort_by(|a, b| a.score.total_cmp(&b.score));

        tracing::debug!(
            "優先順序（{:?}）: {:?}",
            self.criterion,
            ranked.iter().map(|r| r.order_id.as_str()).collect::<Vec<_>>()
        );
        Ok(ranked)
    }

    /// 台數 × 平均效率
    fn category_throughput(&self, category: ResourceCategory) -> Result<f64> {
        let count = self.resources.count(category);
        let mean = self
            .resources
            .mean_efficiency(category)
            .ok_or_else(|| CutPlanError::Configuration(format!("沒有可用的{category}")))?;
        Ok(count as f64 * mean)
    }
}
