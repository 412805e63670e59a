//! 整批排產入口
//!
//! 流程：正規化目錄 → 各訂單平行求解（含鬆弛搜尋）→ 排序 → 機台排程 → 彙總。

use std::collections::BTreeMap;

use chrono::NaiveDateTime;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use cutplan_core::{
    Catalog, CutPlanError, GradeSpec, LayoutCatalog, LayoutOrder, OptimizationResult, Order,
    PlanningConfig, ResourcePool, Result, ScheduleEntry, ShiftCalendar,
};
use cutplan_optimizer::{
    CuttingPlanOptimizer, GoodLpBackend, InfeasibleReason, LayoutOptimizer, MilpBackend,
    SolveOutcome,
};

use crate::aggregate::{aggregate, GlobalKpis};
use crate::priority::{PriorityRanker, RankedOrder};
use crate::scheduler::ResourceScheduler;
use crate::{PlanWarning, WarningSeverity};

/// 各紙樣、各尺碼產出（排料圖模式）
pub type PatternProduction = BTreeMap<String, BTreeMap<String, u32>>;

/// 整批排產結果
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductionPlan {
    /// 本次排產ID
    pub run_id: Uuid,

    pub plan_start: NaiveDateTime,

    /// 可行訂單的最佳化結果（依輸入順序）
    pub results: Vec<OptimizationResult>,

    /// 優先順序與分數
    pub priority: Vec<RankedOrder>,

    /// 機台排程（依優先順序）
    pub schedule: Vec<ScheduleEntry>,

    /// 無可行解的訂單
    pub infeasible_orders: Vec<String>,

    /// 排料圖模式：訂單 → 紙樣 → 尺碼 → 件數
    pub pattern_production: BTreeMap<String, PatternProduction>,

    pub kpis: GlobalKpis,

    pub warnings: Vec<PlanWarning>,

    /// 計算耗時（毫秒）
    pub calculation_time_ms: Option<u128>,
}

impl ProductionPlan {
    fn empty(plan_start: NaiveDateTime) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            plan_start,
            results: Vec::new(),
            priority: Vec::new(),
            schedule: Vec::new(),
            infeasible_orders: Vec::new(),
            pattern_production: BTreeMap::new(),
            kpis: GlobalKpis::default(),
            warnings: Vec::new(),
            calculation_time_ms: None,
        }
    }

    /// 添加警告
    pub fn add_warning(&mut self, warning: PlanWarning) {
        self.warnings.push(warning);
    }

    pub fn result(&self, order_id: &str) -> Option<&OptimizationResult> {
        self.results.iter().find(|r| r.order_id == order_id)
    }

    pub fn schedule_for(&self, order_id: &str) -> Option<&ScheduleEntry> {
        self.schedule.iter().find(|e| e.order_id == order_id)
    }

    /// 是否有錯誤等級的警告
    pub fn has_errors(&self) -> bool {
        self.warnings.iter().any(|w| w.severity == WarningSeverity::Error)
    }
}

/// 排產器
pub struct ProductionPlanner<B = GoodLpBackend> {
    config: PlanningConfig,
    calendar: ShiftCalendar,
    resources: ResourcePool,
    backend: B,
}

impl ProductionPlanner<GoodLpBackend> {
    /// 創建排產器，配置與資源池在此驗證
    pub fn new(
        config: PlanningConfig,
        calendar: ShiftCalendar,
        resources: ResourcePool,
    ) -> Result<Self> {
        Self::with_backend(config, calendar, resources, GoodLpBackend::new())
    }
}

impl<B: MilpBackend + Clone> ProductionPlanner<B> {
    /// 指定求解器
    pub fn with_backend(
        config: PlanningConfig,
        calendar: ShiftCalendar,
        resources: ResourcePool,
        backend: B,
    ) -> Result<Self> {
        config.validate()?;
        resources.validate()?;
        Ok(Self {
            config,
            calendar,
            resources,
            backend,
        })
    }

    pub fn config(&self) -> &PlanningConfig {
        &self.config
    }

    /// 一般排料圖模式
    pub fn plan(
        &self,
        orders: &[Order],
        grades: &[GradeSpec],
        plan_start: NaiveDateTime,
    ) -> Result<ProductionPlan> {
        tracing::info!(
            "開始排產：訂單 {} 筆，排料圖 {} 個，準則 {:?}",
            orders.len(),
            grades.len(),
            self.config.criterion
        );
        let start_time = std::time::Instant::now();

        let catalog = Catalog::normalize(
            grades,
            self.config.width_tolerance,
            self.config.max_layers_per_plan,
        )?;
        let optimizer =
            CuttingPlanOptimizer::with_backend(self.config.clone(), self.backend.clone());

        let outcomes = self.solve_all(orders, |order| {
            optimizer.solve_with_relaxation(order, &catalog, &self.resources)
        })?;

        let mut plan = ProductionPlan::empty(plan_start);
        self.finish(&mut plan, orders, outcomes)?;
        plan.calculation_time_ms = Some(start_time.elapsed().as_millis());

        tracing::info!(
            "排產完成：可行 {} 筆，無解 {} 筆，總成本 {:.2}，耗時 {:?}ms",
            plan.results.len(),
            plan.infeasible_orders.len(),
            plan.kpis.total_cost,
            plan.calculation_time_ms
        );
        Ok(plan)
    }

    /// 排料圖（紙樣）模式
    pub fn plan_layouts(
        &self,
        orders: &[LayoutOrder],
        catalog: &LayoutCatalog,
        plan_start: NaiveDateTime,
    ) -> Result<ProductionPlan> {
        tracing::info!(
            "開始排料圖排產：訂單 {} 筆，排料圖 {} 張",
            orders.len(),
            catalog.layouts().len()
        );
        let start_time = std::time::Instant::now();

        let optimizer = LayoutOptimizer::with_backend(self.config.clone(), self.backend.clone());
        let outcomes = self.solve_all(orders, |order| {
            optimizer.solve_with_relaxation(order, catalog, &self.resources)
        })?;

        let plain: Vec<Order> = orders.iter().map(LayoutOrder::to_order).collect();
        let mut plan = ProductionPlan::empty(plan_start);
        self.finish(&mut plan, &plain, outcomes)?;

        let pattern_production: BTreeMap<String, PatternProduction> = orders
            .iter()
            .filter_map(|order| {
                let result = plan.result(&order.id)?;
                Some((order.id.clone(), catalog.pattern_production(order, &result.layers)))
            })
            .collect();
        plan.pattern_production = pattern_production;
        plan.calculation_time_ms = Some(start_time.elapsed().as_millis());

        tracing::info!(
            "排料圖排產完成：可行 {} 筆，無解 {} 筆，耗時 {:?}ms",
            plan.results.len(),
            plan.infeasible_orders.len(),
            plan.calculation_time_ms
        );
        Ok(plan)
    }

    /// 在有上限的執行緒池中平行求解，結果維持輸入順序
    fn solve_all<T, F>(&self, items: &[T], solve: F) -> Result<Vec<Result<SolveOutcome>>>
    where
        T: Sync,
        F: Fn(&T) -> Result<SolveOutcome> + Sync,
    {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.config.worker_threads)
            .build()
            .map_err(|e| CutPlanError::Configuration(format!("無法建立執行緒池: {e}")))?;

        Ok(pool.install(|| items.par_iter().map(&solve).collect()))
    }

    /// 整理結果、排序、排程與彙總
    fn finish(
        &self,
        plan: &mut ProductionPlan,
        orders: &[Order],
        outcomes: Vec<Result<SolveOutcome>>,
    ) -> Result<()> {
        let mut accepted: Vec<(&Order, OptimizationResult)> = Vec::new();

        for (order, outcome) in orders.iter().zip(outcomes) {
            match outcome {
                Ok(SolveOutcome::Feasible(result)) => {
                    if !result.demand_met() {
                        tracing::warn!("訂單 {} 需求未滿足: {:?}", order.id, result.unmet_sizes);
                        plan.add_warning(PlanWarning::warning(
                            order.id.clone(),
                            format!("需求未滿足的尺碼: {}", result.unmet_sizes.join(", ")),
                        ));
                    }
                    if result.relaxation_factor > 1.0 {
                        plan.add_warning(PlanWarning::info(
                            order.id.clone(),
                            format!("使用鬆弛係數 {:.2}", result.relaxation_factor),
                        ));
                    }
                    accepted.push((order, result));
                }
                Ok(SolveOutcome::Infeasible(reason)) => {
                    let error = match reason {
                        InfeasibleReason::TimeLimit
                        | InfeasibleReason::Exhausted { timed_out: true, .. } => {
                            CutPlanError::SolverTimeout(order.id.clone())
                        }
                        _ => CutPlanError::InfeasibleOrder {
                            order_id: order.id.clone(),
                        },
                    };
                    tracing::warn!("{}（{}）", error, reason);
                    plan.add_warning(PlanWarning::warning(
                        order.id.clone(),
                        format!("{error}（{reason}）"),
                    ));
                    plan.infeasible_orders.push(order.id.clone());
                }
                Err(CutPlanError::Solver(message)) => {
                    tracing::warn!("訂單 {} 求解失敗: {}", order.id, message);
                    plan.add_warning(PlanWarning::error(order.id.clone(), message));
                    plan.infeasible_orders.push(order.id.clone());
                }
                Err(other) => return Err(other),
            }
        }

        let ranker = PriorityRanker::new(self.config.criterion, plan.plan_start, &self.resources);
        let items: Vec<(&Order, &OptimizationResult)> =
            accepted.iter().map(|(o, r)| (*o, r)).collect();
        plan.priority = ranker.sequence(&items)?;

        let by_id: BTreeMap<&str, &OptimizationResult> =
            accepted.iter().map(|(o, r)| (o.id.as_str(), r)).collect();
        let ordered: Vec<&OptimizationResult> = plan
            .priority
            .iter()
            .filter_map(|ranked| by_id.get(ranked.order_id.as_str()).copied())
            .collect();

        let scheduler = ResourceScheduler::new(&self.calendar, &self.resources)?;
        plan.schedule = scheduler.schedule(&ordered, plan.plan_start)?;

        plan.results = accepted.into_iter().map(|(_, r)| r).collect();
        plan.kpis = aggregate(&plan.results, &plan.schedule, orders, plan.plan_start);

        Ok(())
    }
}
