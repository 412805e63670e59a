//! 裁剪方案最佳化器
//!
//! 每張訂單獨立建立一個整數規劃模型：決定每個排料圖鋪幾層，
//! 在滿足需求、超量上限、鋪布長度與機台工時的前提下最小化總成本。

use std::time::Duration;

use cutplan_core::{Catalog, Order, PlanningConfig, ResourcePool, Result};

use crate::backend::GoodLpBackend;
use crate::formulation::{Formulation, LengthCap};
use crate::milp::MilpBackend;
use crate::outcome::SolveOutcome;
use crate::relaxation;

/// 裁剪方案最佳化器
#[derive(Debug, Clone)]
pub struct CuttingPlanOptimizer<B = GoodLpBackend> {
    config: PlanningConfig,
    backend: B,
}

impl CuttingPlanOptimizer<GoodLpBackend> {
    /// 使用預設求解器
    pub fn new(config: PlanningConfig) -> Self {
        Self::with_backend(config, GoodLpBackend::new())
    }
}

impl<B: MilpBackend> CuttingPlanOptimizer<B> {
    /// 指定求解器
    pub fn with_backend(config: PlanningConfig, backend: B) -> Self {
        Self { config, backend }
    }

    pub fn config(&self) -> &PlanningConfig {
        &self.config
    }

    /// 以指定鬆弛係數求解一次
    pub fn solve(
        &self,
        order: &Order,
        catalog: &Catalog,
        resources: &ResourcePool,
        factor: f64,
    ) -> Result<SolveOutcome> {
        let cap = LengthCap::LaidLength {
            table_length: self.config.table_length,
            max_layers: self.config.max_layers_per_plan,
        };
        let formulation = Formulation::build(
            &order.id,
            &order.demand,
            catalog.plans(),
            resources,
            &self.config,
            cap,
            factor,
        );

        let outcome = formulation.solve(&self.backend, self.time_limit())?;
        if let SolveOutcome::Feasible(result) = &outcome {
            tracing::debug!(
                "訂單 {}: 鬆弛係數 {:.2}, 使用 {} 個排料圖, 總成本 {:.2}",
                order.id,
                factor,
                result.used_plans.len(),
                result.costs.total
            );
        }
        Ok(outcome)
    }

    /// 依配置的鬆弛係數序列求解，第一個可行結果即回傳
    pub fn solve_with_relaxation(
        &self,
        order: &Order,
        catalog: &Catalog,
        resources: &ResourcePool,
    ) -> Result<SolveOutcome> {
        let factors = self.config.relaxation_factors();
        relaxation::first_feasible(&factors, |factor| self.solve(order, catalog, resources, factor))
    }

    fn time_limit(&self) -> Duration {
        Duration::from_secs(self.config.solver_time_limit_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::milp::{MilpModel, MilpSolution, MilpStatus};
    use crate::outcome::InfeasibleReason;
    use chrono::NaiveDate;
    use cutplan_core::{GradeSpec, Resource, SolveStatus};
    use std::collections::BTreeMap;

    fn deadline() -> chrono::NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 3, 10)
            .unwrap()
            .and_hms_opt(18, 0, 0)
            .unwrap()
    }

    /// 每層 2 件 P、每層成本 1、準備成本 5、鋪布長度 0.5 公尺
    fn unit_spec(id: &str, quantities: &[(&str, u32)]) -> GradeSpec {
        let sizes = ["P", "M"];
        GradeSpec {
            id: id.to_string(),
            quantities: quantities.iter().map(|(s, q)| (s.to_string(), *q)).collect(),
            utilization: 0.8,
            setup_cost: 5.0,
            piece_widths: sizes.iter().map(|s| (s.to_string(), 0.25)).collect(),
            piece_areas: sizes.iter().map(|s| (s.to_string(), 0.2)).collect(),
            piece_perimeters: sizes.iter().map(|s| (s.to_string(), 2.0)).collect(),
            fabric_width: 1.0,
            fabric_cost: 0.0,
            cutting_cost: 0.0,
            laying_fixed_cost: 1.0,
            laying_variable_cost: 0.0,
            laying_hours_per_meter: 0.5,
            cutting_hours_per_meter: 0.01,
            max_layers: Some(20),
        }
    }

    fn pool() -> ResourcePool {
        ResourcePool::from_resources([Resource::laying("E1", 1.0), Resource::cutting("C1", 1.0)])
    }

    #[test]
    fn test_single_plan_exact_demand() {
        let config = PlanningConfig::new().with_production_hours(24.0);
        let catalog = Catalog::normalize(&[unit_spec("A", &[("P", 2)])], 0.05, 30).unwrap();
        let order = Order::new("O1".to_string(), deadline()).with_demand("P", 10);

        let outcome = CuttingPlanOptimizer::new(config)
            .solve(&order, &catalog, &pool(), 1.0)
            .unwrap();
        let result = outcome.result().unwrap();

        assert_eq!(result.layers["A"], 5);
        assert_eq!(result.production["P"], 10);
        assert!((result.costs.total - 10.0).abs() < 1e-9);
        assert_eq!(result.overproduction["P"], 0.0);
        assert_eq!(result.status, SolveStatus::Optimal);
        assert!(result.demand_met());
    }

    #[test]
    fn test_cheaper_mix_is_chosen() {
        // A 一次產出 P 與 M，比分別使用 B、C 省下一次準備成本
        let specs = vec![
            unit_spec("A", &[("P", 1), ("M", 1)]),
            unit_spec("B", &[("P", 1)]),
            unit_spec("C", &[("M", 1)]),
        ];
        let catalog = Catalog::normalize(&specs, 0.05, 30).unwrap();
        let order = Order::new("O2".to_string(), deadline())
            .with_demand("P", 4)
            .with_demand("M", 4);

        let outcome = CuttingPlanOptimizer::new(PlanningConfig::new())
            .solve(&order, &catalog, &pool(), 1.0)
            .unwrap();
        let result = outcome.result().unwrap();

        assert_eq!(result.used_plans, vec!["A".to_string()]);
        assert_eq!(result.layers["A"], 4);
    }

    #[test]
    fn test_overproduction_within_allowance() {
        // 每層 3 件，需求 10：9 件不足、12 件超出 10.5 的允許上限並受懲罰
        let catalog = Catalog::normalize(&[unit_spec("A", &[("P", 3)])], 0.05, 30).unwrap();
        let order = Order::new("O3".to_string(), deadline()).with_demand("P", 10);
        let config = PlanningConfig::new().with_overproduction(0.05, 10.0);

        let outcome = CuttingPlanOptimizer::new(config)
            .solve(&order, &catalog, &pool(), 1.0)
            .unwrap();
        let result = outcome.result().unwrap();

        assert_eq!(result.production["P"], 12);
        assert_eq!(result.overproduction["P"], 2.0);
        assert!((result.penalized_excess["P"] - 1.5).abs() < 1e-9);
        assert!((result.costs.overproduction_penalty - 15.0).abs() < 1e-9);
    }

    #[test]
    fn test_relaxation_finds_smallest_factor() {
        // 需求 40 件 = 20 層 × 0.5 公尺 = 10 公尺；桌長 0.3 × 30 層 = 9 公尺
        let catalog = Catalog::normalize(&[unit_spec("A", &[("P", 2)])], 0.05, 30).unwrap();
        let order = Order::new("O4".to_string(), deadline()).with_demand("P", 40);
        let config = PlanningConfig::new().with_table_length(0.3);
        let optimizer = CuttingPlanOptimizer::new(config);

        assert!(!optimizer.solve(&order, &catalog, &pool(), 1.0).unwrap().is_feasible());

        let outcome = optimizer.solve_with_relaxation(&order, &catalog, &pool()).unwrap();
        let result = outcome.result().unwrap();
        assert_eq!(result.relaxation_factor, 1.2);
        assert!((result.length_cap - 10.8).abs() < 1e-9);
    }

    #[test]
    fn test_relaxation_disabled_only_tries_once() {
        let catalog = Catalog::normalize(&[unit_spec("A", &[("P", 2)])], 0.05, 30).unwrap();
        let order = Order::new("O5".to_string(), deadline()).with_demand("P", 40);
        let config = PlanningConfig::new().with_table_length(0.3).with_relaxation(false);

        let outcome = CuttingPlanOptimizer::new(config)
            .solve_with_relaxation(&order, &catalog, &pool())
            .unwrap();
        assert_eq!(
            outcome.infeasible_reason(),
            Some(InfeasibleReason::Exhausted {
                attempts: 1,
                timed_out: false
            })
        );
    }

    #[test]
    fn test_insufficient_machine_hours_is_infeasible() {
        // 20 層 × 0.25 小時 = 5 小時 > 1 台 × 1.0 × 4 小時
        let catalog = Catalog::normalize(&[unit_spec("A", &[("P", 2)])], 0.05, 30).unwrap();
        let order = Order::new("O6".to_string(), deadline()).with_demand("P", 40);
        let config = PlanningConfig::new().with_production_hours(4.0);

        let outcome = CuttingPlanOptimizer::new(config)
            .solve(&order, &catalog, &pool(), 1.0)
            .unwrap();
        assert_eq!(outcome.infeasible_reason(), Some(InfeasibleReason::Infeasible));
    }

    struct TimedOut;

    impl MilpBackend for TimedOut {
        fn name(&self) -> &str {
            "timed-out"
        }

        fn solve(&self, _model: &MilpModel, _time_limit: Duration) -> Result<MilpSolution> {
            Ok(MilpSolution::without_incumbent(MilpStatus::TimeLimit))
        }
    }

    #[test]
    fn test_timeout_without_incumbent_is_infeasible() {
        let catalog = Catalog::normalize(&[unit_spec("A", &[("P", 2)])], 0.05, 30).unwrap();
        let order = Order::new("O7".to_string(), deadline()).with_demand("P", 10);

        let outcome = CuttingPlanOptimizer::with_backend(PlanningConfig::new(), TimedOut)
            .solve(&order, &catalog, &pool(), 1.0)
            .unwrap();
        assert_eq!(outcome.infeasible_reason(), Some(InfeasibleReason::TimeLimit));
    }

    #[test]
    fn test_solve_is_idempotent() {
        let catalog = Catalog::normalize(
            &[unit_spec("A", &[("P", 1), ("M", 1)]), unit_spec("B", &[("P", 2)])],
            0.05,
            30,
        )
        .unwrap();
        let order = Order::new("O8".to_string(), deadline()).with_demands(BTreeMap::from([
            ("P".to_string(), 7),
            ("M".to_string(), 3),
        ]));
        let optimizer = CuttingPlanOptimizer::new(PlanningConfig::new());

        let first = optimizer.solve(&order, &catalog, &pool(), 1.0).unwrap();
        let second = optimizer.solve(&order, &catalog, &pool(), 1.0).unwrap();
        assert_eq!(first, second);
    }
}
