//! # Cutplan Scheduling Engine
//!
//! 訂單排序、班次感知的機台排程與整批排產

pub mod aggregate;
pub mod planner;
pub mod priority;
pub mod scheduler;

// Re-export 主要類型
pub use aggregate::{aggregate, GlobalKpis};
pub use planner::{ProductionPlan, ProductionPlanner};
pub use priority::{PriorityRanker, RankedOrder};
pub use scheduler::ResourceScheduler;

use serde::{Deserialize, Serialize};

/// 排產警告
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanWarning {
    pub order_id: String,
    pub message: String,
    pub severity: WarningSeverity,
}

impl PlanWarning {
    pub fn new(order_id: String, message: String, severity: WarningSeverity) -> Self {
        Self {
            order_id,
            message,
            severity,
        }
    }

    pub fn info(order_id: String, message: String) -> Self {
        Self::new(order_id, message, WarningSeverity::Info)
    }

    pub fn warning(order_id: String, message: String) -> Self {
        Self::new(order_id, message, WarningSeverity::Warning)
    }

    pub fn error(order_id: String, message: String) -> Self {
        Self::new(order_id, message, WarningSeverity::Error)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WarningSeverity {
    Info,
    Warning,
    Error,
}
