//! # Cutplan
//!
//! 裁剪排產：依訂單需求選擇排料圖與層數，再依班次排程到鋪布機與裁剪機。
//!
//! ```no_run
//! use chrono::NaiveDate;
//! use cutplan::{presets, Order, PlanningConfig, ProductionPlanner};
//!
//! # fn main() -> cutplan::Result<()> {
//! let planner = ProductionPlanner::new(
//!     PlanningConfig::new(),
//!     presets::three_shift_calendar(),
//!     presets::standard_resources(),
//! )?;
//! let start = NaiveDate::from_ymd_opt(2025, 3, 3).unwrap().and_hms_opt(6, 0, 0).unwrap();
//! let orders = vec![Order::new("PED-001".to_string(), start).with_demand("M", 40)];
//! let plan = planner.plan(&orders, &presets::standard_grades(), start)?;
//! println!("總成本 {:.2}", plan.kpis.total_cost);
//! # Ok(())
//! # }
//! ```

pub mod logging;

pub use cutplan_core::*;
pub use cutplan_optimizer::{
    CuttingPlanOptimizer, GoodLpBackend, InfeasibleReason, LayoutOptimizer, MilpBackend,
    SolveOutcome,
};
pub use cutplan_sched::{
    aggregate, GlobalKpis, PlanWarning, PriorityRanker, ProductionPlan, ProductionPlanner,
    RankedOrder, ResourceScheduler, WarningSeverity,
};
