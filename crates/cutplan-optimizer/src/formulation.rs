//! 裁剪方案的整數規劃模型
//!
//! 排料圖模式與一般方案共用同一套變數與約束，差別只在長度限制：
//! 一般方案限制總鋪布長度，排料圖模式限制已使用排料圖的長度總和。

use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;

use cutplan_core::{
    CostBreakdown, CuttingPlan, OptimizationResult, PlanningConfig, ResourcePool, Result,
    SolveStatus,
};

use crate::milp::{
    LinearExpr, MilpBackend, MilpModel, MilpSolution, MilpStatus, Relation, VarId, VarKind,
};
use crate::outcome::{InfeasibleReason, SolveOutcome};

/// 啟用二元變數的判斷門檻
const BINARY_THRESHOLD: f64 = 0.5;

/// 長度限制
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LengthCap {
    /// `Σ lay_length × layers ≤ table_length × factor × max_layers`
    LaidLength { table_length: f64, max_layers: u32 },
    /// `Σ lay_length × used ≤ max_length × factor`
    UsedLength { max_length: f64 },
}

impl LengthCap {
    /// 套用鬆弛係數後的上限（公尺）
    pub fn limit(&self, factor: f64) -> f64 {
        match *self {
            LengthCap::LaidLength {
                table_length,
                max_layers,
            } => table_length * factor * f64::from(max_layers),
            LengthCap::UsedLength { max_length } => max_length * factor,
        }
    }
}

/// 單一訂單的模型與變數對照
pub struct Formulation<'a> {
    order_id: &'a str,
    demand: &'a BTreeMap<String, u32>,
    plans: &'a [CuttingPlan],
    resources: &'a ResourcePool,
    config: &'a PlanningConfig,
    factor: f64,
    length_limit: f64,
    sizes: BTreeSet<String>,
    model: MilpModel,
    layers: Vec<VarId>,
    laying_engaged: Vec<VarId>,
    cutting_engaged: Vec<VarId>,
}

impl<'a> Formulation<'a> {
    /// 建立模型
    pub fn build(
        order_id: &'a str,
        demand: &'a BTreeMap<String, u32>,
        plans: &'a [CuttingPlan],
        resources: &'a ResourcePool,
        config: &'a PlanningConfig,
        cap: LengthCap,
        factor: f64,
    ) -> Self {
        let mut model = MilpModel::new();

        let sizes: BTreeSet<String> = demand
            .keys()
            .cloned()
            .chain(plans.iter().flat_map(|p| p.quantities.keys().cloned()))
            .collect();

        let layers: Vec<VarId> = plans
            .iter()
            .map(|plan| {
                let cap = plan_layer_cap(plan, config);
                model.add_variable(
                    format!("layers_{}", plan.id),
                    VarKind::Integer,
                    0.0,
                    Some(f64::from(cap)),
                )
            })
            .collect();
        let used: Vec<VarId> = plans
            .iter()
            .map(|plan| model.add_variable(format!("used_{}", plan.id), VarKind::Binary, 0.0, None))
            .collect();
        let over: Vec<VarId> = sizes
            .iter()
            .map(|size| model.add_variable(format!("over_{size}"), VarKind::Continuous, 0.0, None))
            .collect();
        let laying_engaged: Vec<VarId> = resources
            .laying
            .iter()
            .map(|r| model.add_variable(format!("laying_{}", r.id), VarKind::Binary, 0.0, None))
            .collect();
        let cutting_engaged: Vec<VarId> = resources
            .cutting
            .iter()
            .map(|r| model.add_variable(format!("cutting_{}", r.id), VarKind::Binary, 0.0, None))
            .collect();

        // 層數只能用在已啟用的方案
        for (i, plan) in plans.iter().enumerate() {
            let cap = f64::from(plan_layer_cap(plan, config));
            model.add_constraint(
                format!("link_{}", plan.id),
                LinearExpr::new().with_term(layers[i], 1.0).with_term(used[i], -cap),
                Relation::LessEq,
                0.0,
            );
        }

        // 需求下限與超量上限
        for (size, &over_var) in sizes.iter().zip(&over) {
            let produced: LinearExpr = plans
                .iter()
                .zip(&layers)
                .map(|(plan, &var)| (var, f64::from(plan.pieces_per_layer(size))))
                .collect();
            let required = f64::from(demand.get(size).copied().unwrap_or(0));

            model.add_constraint(
                format!("demand_{size}"),
                produced.clone(),
                Relation::GreaterEq,
                required,
            );

            let mut capped = produced;
            capped.add_term(over_var, -1.0);
            model.add_constraint(
                format!("overproduction_{size}"),
                capped,
                Relation::LessEq,
                required * (1.0 + config.overproduction_percentage),
            );
        }

        let length_vars = match cap {
            LengthCap::LaidLength { .. } => &layers,
            LengthCap::UsedLength { .. } => &used,
        };
        let length_limit = cap.limit(factor);
        model.add_constraint(
            "length",
            plans
                .iter()
                .zip(length_vars)
                .map(|(plan, &var)| (var, plan.lay_length))
                .collect(),
            Relation::LessEq,
            length_limit,
        );

        // 工時不得超過啟用機台的有效產能
        let capacity_constraint = |model: &mut MilpModel,
                                   name: &str,
                                   hours: &dyn Fn(&CuttingPlan) -> f64,
                                   machines: &[cutplan_core::Resource],
                                   engaged: &[VarId]| {
            let mut expr: LinearExpr = plans
                .iter()
                .zip(&layers)
                .map(|(plan, &var)| (var, hours(plan)))
                .collect();
            for (machine, &var) in machines.iter().zip(engaged) {
                expr.add_term(var, -machine.efficiency * config.production_hours);
            }
            model.add_constraint(name, expr, Relation::LessEq, 0.0);
        };
        capacity_constraint(
            &mut model,
            "laying_hours",
            &|p: &CuttingPlan| p.laying_hours_per_layer,
            &resources.laying,
            &laying_engaged,
        );
        capacity_constraint(
            &mut model,
            "cutting_hours",
            &|p: &CuttingPlan| p.cutting_hours_per_layer,
            &resources.cutting,
            &cutting_engaged,
        );

        let mut objective = LinearExpr::new();
        for (i, plan) in plans.iter().enumerate() {
            objective.add_term(layers[i], plan.cost_per_layer);
            objective.add_term(used[i], plan.setup_cost);
        }
        for &var in &over {
            objective.add_term(var, config.overproduction_penalty);
        }
        model.set_objective(objective);

        Self {
            order_id,
            demand,
            plans,
            resources,
            config,
            factor,
            length_limit,
            sizes,
            model,
            layers,
            laying_engaged,
            cutting_engaged,
        }
    }

    pub fn model(&self) -> &MilpModel {
        &self.model
    }

    /// 交給求解器並轉成結果
    pub fn solve(&self, backend: &dyn MilpBackend, time_limit: Duration) -> Result<SolveOutcome> {
        let solution = backend.solve(&self.model, time_limit)?;

        if !solution.has_incumbent() {
            let reason = match solution.status {
                MilpStatus::Unbounded => InfeasibleReason::Unbounded,
                MilpStatus::TimeLimit => InfeasibleReason::TimeLimit,
                _ => InfeasibleReason::Infeasible,
            };
            tracing::debug!(
                "訂單 {} 在鬆弛係數 {:.2} 下無解: {}",
                self.order_id,
                self.factor,
                reason
            );
            return Ok(SolveOutcome::Infeasible(reason));
        }

        Ok(SolveOutcome::Feasible(self.extract(&solution)))
    }

    /// 由四捨五入後的層數重新計算所有數值
    fn extract(&self, solution: &MilpSolution) -> OptimizationResult {
        let mut result = OptimizationResult::new(self.order_id.to_string(), self.factor);
        result.length_cap = self.length_limit;
        result.status = match solution.status {
            MilpStatus::Optimal => SolveStatus::Optimal,
            _ => SolveStatus::Feasible,
        };

        let mut costs = CostBreakdown::default();
        let mut laying_hours = 0.0;
        let mut cutting_hours = 0.0;

        for (plan, &var) in self.plans.iter().zip(&self.layers) {
            let cap = plan_layer_cap(plan, self.config);
            let count = (solution.value(var).round().max(0.0) as u32).min(cap);
            if count == 0 {
                continue;
            }
            let n = f64::from(count);

            result.layers.insert(plan.id.clone(), count);
            result.used_plans.push(plan.id.clone());

            for (size, &qty) in &plan.quantities {
                let produced = result.production.entry(size.clone()).or_insert(0);
                *produced = produced.saturating_add(qty.saturating_mul(count));
            }

            costs.setup += plan.setup_cost;
            costs.material += plan.material_cost * n;
            costs.cutting += plan.cutting_cost * n;
            costs.laying += plan.laying_cost * n;
            costs.waste += plan.waste_cost * n;

            result.waste_area += plan.waste_area * n;
            result.fabric_meters += plan.lay_length * n;
            result.cut_perimeter += plan.perimeter_total * n;
            laying_hours += plan.laying_hours_per_layer * n;
            cutting_hours += plan.cutting_hours_per_layer * n;
        }

        for size in &self.sizes {
            let produced = result.production.get(size).copied().unwrap_or(0);
            let required = self.demand.get(size).copied().unwrap_or(0);
            let allowed = f64::from(required) * (1.0 + self.config.overproduction_percentage);

            if produced < required {
                result.unmet_sizes.push(size.clone());
            }
            result
                .overproduction
                .insert(size.clone(), f64::from(produced.saturating_sub(required)));
            let excess = (f64::from(produced) - allowed).max(0.0);
            result.penalized_excess.insert(size.clone(), excess);
            costs.overproduction_penalty += excess * self.config.overproduction_penalty;
        }

        result.engaged_laying =
            engaged_ids(&self.resources.laying, &self.laying_engaged, solution);
        result.engaged_cutting =
            engaged_ids(&self.resources.cutting, &self.cutting_engaged, solution);

        result.with_costs(costs.with_total()).with_hours(laying_hours, cutting_hours)
    }
}

/// 方案層數上限
pub(crate) fn plan_layer_cap(plan: &CuttingPlan, config: &PlanningConfig) -> u32 {
    plan.max_layers.min(config.max_layers_per_plan)
}

fn engaged_ids(
    machines: &[cutplan_core::Resource],
    vars: &[VarId],
    solution: &MilpSolution,
) -> Vec<String> {
    machines
        .iter()
        .zip(vars)
        .filter(|(_, var)| solution.value(**var) > BINARY_THRESHOLD)
        .map(|(machine, _)| machine.id.clone())
        .collect()
}
