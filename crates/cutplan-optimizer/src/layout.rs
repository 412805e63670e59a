//! 排料圖模式的最佳化器
//!
//! 只考慮布幅相同且涵蓋訂單所有紙樣的排料圖，
//! 長度限制作用在已使用排料圖的長度總和。

use std::time::Duration;

use cutplan_core::{LayoutCatalog, LayoutOrder, PlanningConfig, ResourcePool, Result};

use crate::backend::GoodLpBackend;
use crate::formulation::{Formulation, LengthCap};
use crate::milp::MilpBackend;
use crate::outcome::{InfeasibleReason, SolveOutcome};
use crate::relaxation;

/// 排料圖最佳化器
#[derive(Debug, Clone)]
pub struct LayoutOptimizer<B = GoodLpBackend> {
    config: PlanningConfig,
    backend: B,
}

impl LayoutOptimizer<GoodLpBackend> {
    pub fn new(config: PlanningConfig) -> Self {
        Self::with_backend(config, GoodLpBackend::new())
    }
}

impl<B: MilpBackend> LayoutOptimizer<B> {
    pub fn with_backend(config: PlanningConfig, backend: B) -> Self {
        Self { config, backend }
    }

    pub fn config(&self) -> &PlanningConfig {
        &self.config
    }

    /// 以指定鬆弛係數求解一次
    pub fn solve(
        &self,
        order: &LayoutOrder,
        catalog: &LayoutCatalog,
        resources: &ResourcePool,
        factor: f64,
    ) -> Result<SolveOutcome> {
        let plans = catalog.plans_for(order, &self.config);
        if plans.is_empty() {
            tracing::warn!(
                "訂單 {} 沒有布幅 {} 且涵蓋所有紙樣的排料圖",
                order.id,
                order.fabric_width
            );
            return Ok(SolveOutcome::Infeasible(InfeasibleReason::NoCompatibleLayouts));
        }

        let demand = order.demand();
        let cap = LengthCap::UsedLength {
            max_length: order.max_length.unwrap_or(self.config.max_total_length),
        };
        let formulation = Formulation::build(
            &order.id,
            &demand,
            &plans,
            resources,
            &self.config,
            cap,
            factor,
        );

        formulation.solve(
            &self.backend,
            Duration::from_secs(self.config.solver_time_limit_secs),
        )
    }

    /// 依配置的鬆弛係數序列求解
    pub fn solve_with_relaxation(
        &self,
        order: &LayoutOrder,
        catalog: &LayoutCatalog,
        resources: &ResourcePool,
    ) -> Result<SolveOutcome> {
        let factors = self.config.relaxation_factors();
        relaxation::first_feasible(&factors, |factor| self.solve(order, catalog, resources, factor))
    }
}
