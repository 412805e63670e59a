//! # Cutplan Core
//!
//! 裁剪排產的核心資料模型與類型定義

pub mod calendar;
pub mod catalog;
pub mod config;
pub mod layout;
pub mod order;
pub mod presets;
pub mod resource;
pub mod result;
pub mod schedule;

// Re-export 主要類型
pub use calendar::{ShiftCalendar, ShiftWindow};
pub use catalog::{Catalog, CuttingPlan, GradeSpec};
pub use config::{PlanningConfig, PriorityCriterion, RelaxationSchedule};
pub use layout::{FabricSpec, LayoutCatalog, LayoutOrder, LayoutPiece, LayoutSpec, PatternDemand};
pub use order::Order;
pub use resource::{Resource, ResourceCategory, ResourcePool};
pub use result::{CostBreakdown, OptimizationResult, SolveStatus};
pub use schedule::ScheduleEntry;

/// 裁剪排產錯誤類型
#[derive(Debug, thiserror::Error)]
pub enum CutPlanError {
    #[error("訂單 {order_id} 在所有鬆弛係數下皆無可行解")]
    InfeasibleOrder { order_id: String },

    #[error("求解逾時且沒有可行解: {0}")]
    SolverTimeout(String),

    #[error("無效的優先權準則: {0}")]
    InvalidCriterion(String),

    #[error("配置錯誤: {0}")]
    Configuration(String),

    #[error("求解器錯誤: {0}")]
    Solver(String),

    #[error("JSON 解析錯誤: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, CutPlanError>;
